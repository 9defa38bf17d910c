use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audio::config::{BAND_GAIN_MAX, BAND_GAIN_MIN, NEUTRAL_BAND_GAIN};

// --- Audio Blocks ---

/// Planar f32 buffer for one processing cycle.
///
/// Channel count and capacity are fixed at construction; `set_frames` only
/// changes how much of the capacity is in use, so it never allocates.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl AudioBlock {
    pub fn new(num_channels: usize, frames: usize) -> Self {
        AudioBlock {
            channels: (0..num_channels).map(|_| vec![0.0; frames]).collect(),
            frames,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Changes the number of frames in use. Values above the capacity are
    /// limited to it.
    pub fn set_frames(&mut self, frames: usize) {
        debug_assert!(
            frames <= self.capacity(),
            "AudioBlock::set_frames({frames}) exceeds capacity {}",
            self.capacity()
        );
        self.frames = frames.min(self.capacity());
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.frames]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let frames = self.frames;
        &mut self.channels[index][..frames]
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let frames = self.frames;
        self.channels.iter_mut().map(move |c| &mut c[..frames])
    }

    pub fn clear(&mut self) {
        for channel in self.channels_mut() {
            channel.fill(0.0);
        }
    }

    pub fn apply_gain(&mut self, gain: f32) {
        if gain == 1.0 {
            return;
        }
        for channel in self.channels_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Sums `other` into this block, channel by channel, over the frames both
    /// blocks have in use.
    pub fn add_from(&mut self, other: &AudioBlock) {
        let frames = self.frames.min(other.frames);
        for (dest, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dest[..frames].iter_mut().zip(src[..frames].iter()) {
                *d += *s;
            }
        }
    }
}

/// Anything the audio thread can pull blocks from.
///
/// `prepare` is called from the control side before streaming starts;
/// `pull` runs on the real-time thread and must not block or allocate.
pub trait AudioBlockSource: Send {
    fn prepare(&mut self, block_size: usize, sample_rate: f64);
    fn pull(&mut self, block: &mut AudioBlock);
}

impl<S: AudioBlockSource + ?Sized> AudioBlockSource for Box<S> {
    fn prepare(&mut self, block_size: usize, sample_rate: f64) {
        (**self).prepare(block_size, sample_rate)
    }

    fn pull(&mut self, block: &mut AudioBlock) {
        (**self).pull(block)
    }
}

// --- Decks ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckId {
    A,
    B,
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::A => write!(f, "A"),
            DeckId::B => write!(f, "B"),
        }
    }
}

// --- EQ Parameters ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Band {
    Low,
    Mid,
    High,
}

/// Linear per-band multipliers for the 3-band EQ. 1.0 is neutral.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BandGains {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for BandGains {
    fn default() -> Self {
        BandGains {
            low: NEUTRAL_BAND_GAIN,
            mid: NEUTRAL_BAND_GAIN,
            high: NEUTRAL_BAND_GAIN,
        }
    }
}

impl BandGains {
    /// Exact comparison: any gain even slightly off 1.0 engages the filters.
    pub fn is_neutral(&self) -> bool {
        self.low == NEUTRAL_BAND_GAIN && self.mid == NEUTRAL_BAND_GAIN && self.high == NEUTRAL_BAND_GAIN
    }

    pub fn get(&self, band: Band) -> f32 {
        match band {
            Band::Low => self.low,
            Band::Mid => self.mid,
            Band::High => self.high,
        }
    }
}

/// Band gains are limited rather than rejected.
pub fn clamp_band_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return BAND_GAIN_MIN;
    }
    gain.clamp(BAND_GAIN_MIN, BAND_GAIN_MAX)
}

// --- State Definitions ---

/// Returned by a successful load.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub path: Option<String>,
    pub length_seconds: f64,
    pub sample_rate: u32,
}

/// Polled telemetry for one deck.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeckStatus {
    pub deck_id: DeckId,
    pub has_track: bool,
    pub is_playing: bool,
    pub is_looping: bool,
    pub position_seconds: f64,
    pub length_seconds: f64,
    /// Already guarded: never NaN, always within [0, 1].
    pub position_relative: f64,
    pub master_gain: f32,
    pub speed: f64,
    pub band_gains: BandGains,
}
