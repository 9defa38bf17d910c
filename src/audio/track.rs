use super::decoding;
use super::errors::AudioDecodingError;
use super::types::TrackInfo;

/// Decoded, rate-converted PCM held in memory for one deck.
///
/// Immutable once built; the transport shares it with the audio thread and
/// swaps whole tracks rather than editing one in place.
#[derive(Debug, Clone)]
pub struct TrackSource {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    path: Option<String>,
}

impl TrackSource {
    /// Decodes `path` to `channels` planar channels at `sample_rate`.
    pub fn load(path: &str, sample_rate: u32, channels: usize) -> Result<Self, AudioDecodingError> {
        let decoded = decoding::decode_file(path, sample_rate, channels)?;
        Ok(TrackSource {
            channels: decoded.channels,
            sample_rate: decoded.sample_rate,
            path: Some(path.to_string()),
        })
    }

    /// Wraps samples that are already at the engine rate. Channels shorter
    /// than the first are padded with silence.
    pub fn from_samples(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channels.first().map_or(0, Vec::len);
        for channel in channels.iter_mut() {
            channel.resize(frames, 0.0);
        }
        TrackSource {
            channels,
            sample_rate,
            path: None,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn length_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of `channel`. Requests past the last channel read the last
    /// one, so a mono track feeds every output.
    pub fn channel(&self, channel: usize) -> &[f32] {
        match self.channels.len() {
            0 => &[],
            n => &self.channels[channel.min(n - 1)],
        }
    }

    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            path: self.path.clone(),
            length_seconds: self.length_seconds(),
            sample_rate: self.sample_rate,
        }
    }
}
