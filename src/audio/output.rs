use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};

use crate::audio::config::EngineConfig;
use crate::audio::errors::PlaybackError;
use crate::audio::types::{AudioBlock, AudioBlockSource};

/// A running output stream on the default device.
///
/// The source is moved into the device callback, which pulls it one block
/// at a time. Dropping the `AudioOutput` stops the stream.
pub struct AudioOutput {
    stream: Stream,
    config: StreamConfig,
}

impl AudioOutput {
    /// Opens the default output device at the engine's rate and channel
    /// count, prepares `source` and starts pulling it.
    pub fn start<S: AudioBlockSource + 'static>(
        mut source: S,
        engine_config: &EngineConfig,
    ) -> Result<AudioOutput, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::OutputDeviceUnavailable)?;
        log::info!(
            "Audio Output: Using device '{}'",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let stream_config = find_stream_config(&device, engine_config)?;
        let channels = stream_config.channels as usize;
        let block_size = engine_config.block_size.max(1);

        source.prepare(block_size, engine_config.sample_rate as f64);
        let mut block = AudioBlock::new(engine_config.channel_count(), block_size);

        let data_callback = move |output: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            for chunk in output.chunks_mut(block_size * channels) {
                block.set_frames(chunk.len() / channels);
                source.pull(&mut block);
                write_interleaved(&block, chunk, channels);
            }
        };
        let error_callback = |err: cpal::StreamError| {
            log::error!("Audio Output: Stream error: {}", err);
        };

        let stream = device.build_output_stream(&stream_config, data_callback, error_callback, None)?;
        stream.play()?;
        log::info!(
            "Audio Output: Streaming {} channel(s) at {} Hz in {} frame blocks",
            stream_config.channels,
            stream_config.sample_rate.0,
            block_size
        );

        Ok(AudioOutput {
            stream,
            config: stream_config,
        })
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn pause(&self) -> Result<(), PlaybackError> {
        self.stream.pause()?;
        Ok(())
    }
}

fn find_stream_config(
    device: &cpal::Device,
    engine_config: &EngineConfig,
) -> Result<StreamConfig, PlaybackError> {
    let rate = SampleRate(engine_config.sample_rate);
    device
        .supported_output_configs()?
        .filter(|range| range.sample_format() == SampleFormat::F32)
        .filter(|range| range.channels() == engine_config.channels)
        .find(|range| range.min_sample_rate() <= rate && range.max_sample_rate() >= rate)
        .map(|range| range.with_sample_rate(rate).config())
        .ok_or(PlaybackError::UnsupportedOutputConfig {
            channels: engine_config.channels,
            sample_rate: engine_config.sample_rate,
        })
}

/// Interleaves a planar block into a device buffer. Device channels the
/// block does not have are written as silence.
pub(crate) fn write_interleaved(block: &AudioBlock, output: &mut [f32], channels: usize) {
    for (i, frame) in output.chunks_mut(channels).enumerate().take(block.frames()) {
        for (ch, sample) in frame.iter_mut().enumerate() {
            *sample = if ch < block.num_channels() {
                block.channel(ch)[i]
            } else {
                0.0
            };
        }
    }
}
