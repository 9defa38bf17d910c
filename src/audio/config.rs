use serde::{Deserialize, Serialize};

// --- EQ Filter Constants ---
pub const LOW_CROSSOVER_HZ: f32 = 300.0;
pub const MID_CENTER_HZ: f32 = 1200.0;
pub const HIGH_CROSSOVER_HZ: f32 = 2500.0;
pub const MID_BAND_Q_FACTOR: f32 = 0.7;
// Q factor for the low-pass and high-pass bands (Butterworth)
pub const PASS_Q_FACTOR: f32 = std::f32::consts::FRAC_1_SQRT_2;

// --- Parameter Bounds ---
pub const MASTER_GAIN_MIN: f32 = 0.0;
pub const MASTER_GAIN_MAX: f32 = 1.0;
pub const SPEED_MIN: f64 = 0.0;
pub const SPEED_MAX: f64 = 10.0;
pub const BAND_GAIN_MIN: f32 = 0.0;
pub const BAND_GAIN_MAX: f32 = 2.0;

// -- Initial Values --
pub const INITIAL_MASTER_GAIN: f32 = 1.0;
pub const INITIAL_SPEED: f64 = 1.0;
pub const NEUTRAL_BAND_GAIN: f32 = 1.0;
pub const INITIAL_CROSSFADER: f32 = 0.5;

// --- Engine Defaults ---
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BLOCK_SIZE: usize = 512;
pub const DEFAULT_CHANNELS: u16 = 2;

// --- Resampler Constants ---
/// Frames of interpolation history kept around the read position
/// (one behind, two ahead, plus the frame under the read head).
pub const RESAMPLER_HISTORY_FRAMES: usize = 4;

// --- Load-time Sample Rate Conversion ---
pub const LOAD_RESAMPLER_SINC_LEN: usize = 256;
pub const LOAD_RESAMPLER_F_CUTOFF: f32 = 0.95;
pub const LOAD_RESAMPLER_OVERSAMPLING: usize = 256;

// --- Utility Constants --
pub const DEFAULT_DECODE_CAPACITY: usize = 1024 * 256;

// --- Telemetry Constants ---
/// Suggested interval for the collaborator's position polling (~60 Hz).
pub const TELEMETRY_POLL_INTERVAL_MS: u64 = 16;

/// Audio-thread session parameters fixed at prepare time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl EngineConfig {
    pub fn channel_count(&self) -> usize {
        self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_with_missing_fields_defaulted() {
        let config: EngineConfig = serde_json::from_str(r#"{ "sampleRate": 48000 }"#).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.channels, DEFAULT_CHANNELS);
    }
}
