use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::{
    audio::{SampleBuffer, SignalSpec},
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use super::config;
use super::errors::AudioDecodingError;

/// Fully decoded PCM, one `Vec` per channel.
#[derive(Debug, Clone)]
pub(crate) struct DecodedAudio {
    pub(crate) channels: Vec<Vec<f32>>,
    pub(crate) sample_rate: u32,
}

fn open_format(path: &str) -> Result<Box<dyn FormatReader>, AudioDecodingError> {
    let file = File::open(path).map_err(|e| AudioDecodingError::FileOpenError {
        path: path.to_string(),
        source: e,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioDecodingError::FormatError {
            path: path.to_string(),
            source: e,
        })?;
    Ok(probed.format)
}

/// Reads the track length from container metadata without decoding.
/// Returns 0.0 when the container does not declare a frame count.
pub(crate) fn probe_duration_secs(path: &str) -> Result<f64, AudioDecodingError> {
    let format = open_format(path)?;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioDecodingError::NoSuitableTrack { path: path.to_string() })?;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioDecodingError::MissingSampleRate { path: path.to_string() })?;
    Ok(track
        .codec_params
        .n_frames
        .map(|frames| frames as f64 / sample_rate as f64)
        .unwrap_or(0.0))
}

/// Decodes an audio file to planar f32 with exactly `output_channels`
/// channels at `target_sample_rate`.
///
/// Mono sources are duplicated across outputs; sources with more channels
/// than requested keep the first ones. A container with no audio frames
/// decodes to zero-length channels.
pub(crate) fn decode_file(
    path: &str,
    target_sample_rate: u32,
    output_channels: usize,
) -> Result<DecodedAudio, AudioDecodingError> {
    let mut format = open_format(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| AudioDecodingError::NoSuitableTrack { path: path.to_string() })?;

    let track_id = track.id;
    let source_sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioDecodingError::MissingSampleRate { path: path.to_string() })?;
    let mut source_channels = track.codec_params.channels.map_or(0, |c| c.count());
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioDecodingError::DecoderCreationError {
            path: path.to_string(),
            source: e,
        })?;

    let mut channels: Vec<Vec<f32>> = (0..output_channels)
        .map(|_| Vec::with_capacity(config::DEFAULT_DECODE_CAPACITY))
        .collect();
    let mut sample_buf: Option<(SignalSpec, SampleBuffer<f32>)> = None;

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                match decoder.decode(&packet) {
                    Ok(audio_buf) => {
                        // Frame layout comes from the decoded buffer, not the
                        // container header.
                        let spec = *audio_buf.spec();
                        source_channels = spec.channels.count();
                        if source_channels == 0 {
                            return Err(AudioDecodingError::MissingChannelInfo {
                                path: path.to_string(),
                            });
                        }
                        let fits = sample_buf.as_ref().is_some_and(|(buf_spec, buf)| {
                            *buf_spec == spec
                                && buf.capacity() >= audio_buf.capacity() * source_channels
                        });
                        if !fits {
                            sample_buf = Some((
                                spec,
                                SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec),
                            ));
                        }
                        if let Some((_, buf)) = sample_buf.as_mut() {
                            buf.copy_interleaved_ref(audio_buf);
                            for frame in buf.samples().chunks_exact(source_channels) {
                                for (out_index, out) in channels.iter_mut().enumerate() {
                                    out.push(frame[out_index.min(source_channels - 1)]);
                                }
                            }
                        }
                    }
                    Err(SymphoniaError::DecodeError(err_desc)) => {
                        log::warn!("Central Decode: Ignoring decode error in '{}': {}", path, err_desc);
                    }
                    Err(e) => {
                        return Err(AudioDecodingError::FatalDecodeError {
                            path: path.to_string(),
                            source: e,
                        });
                    }
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                log::debug!("Central Decode: Reached EOF for '{}'", path);
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                log::warn!("Central Decode: Decoder reset required unexpectedly for '{}'", path);
                break;
            }
            Err(e) => {
                return Err(AudioDecodingError::PacketReadIoError {
                    path: path.to_string(),
                    source: e,
                });
            }
        }
    }

    decoder.finalize();
    let decoded_frames = channels.first().map_or(0, Vec::len);
    log::debug!(
        "Central Decode: Decoded {} frames x {} channels at {} Hz for '{}'",
        decoded_frames,
        source_channels,
        source_sample_rate,
        path
    );

    if source_sample_rate != target_sample_rate && decoded_frames > 0 {
        channels = convert_sample_rate(path, channels, source_sample_rate, target_sample_rate)?;
    }

    Ok(DecodedAudio {
        channels,
        sample_rate: target_sample_rate,
    })
}

/// One-shot sinc conversion of a whole decoded track.
fn convert_sample_rate(
    path: &str,
    channels: Vec<Vec<f32>>,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<Vec<f32>>, AudioDecodingError> {
    let map_err = |reason: String| AudioDecodingError::ResampleError {
        path: path.to_string(),
        from_rate,
        to_rate,
        reason,
    };

    let input_frames = channels.first().map_or(0, Vec::len);
    let ratio = to_rate as f64 / from_rate as f64;
    let expected_frames = (input_frames as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: config::LOAD_RESAMPLER_SINC_LEN,
        f_cutoff: config::LOAD_RESAMPLER_F_CUTOFF,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: config::LOAD_RESAMPLER_OVERSAMPLING,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, input_frames, channels.len())
        .map_err(|e| map_err(e.to_string()))?;
    let delay = resampler.output_delay();
    let mut converted = resampler
        .process(&channels, None)
        .map_err(|e| map_err(e.to_string()))?;
    // Flush the filter tail so the end of the track survives the delay trim.
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| map_err(e.to_string()))?;

    for (channel, tail) in converted.iter_mut().zip(tail) {
        channel.extend(tail);
        channel.drain(..delay.min(channel.len()));
        channel.resize(expected_frames, 0.0);
    }

    log::info!(
        "Central Decode: Converted '{}' from {} Hz to {} Hz ({} -> {} frames)",
        path,
        from_rate,
        to_rate,
        input_frames,
        expected_frames
    );
    Ok(converted)
}
