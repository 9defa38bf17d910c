use crate::audio::config;
use crate::audio::errors::AudioEffectsError;
use crate::audio::types::{AudioBlock, BandGains};
use biquad::{Biquad as _, Coefficients, DirectForm1, ToHertz, Type};

/// Low-pass, band-pass and high-pass filters for one channel.
struct BandFilters {
    low: DirectForm1<f32>,
    mid: DirectForm1<f32>,
    high: DirectForm1<f32>,
}

/// Fixed 3-band split EQ.
///
/// Each channel is run through a low-pass, a band-pass and a high-pass in
/// parallel; the bands are scaled by their gains and summed back. When every
/// gain is exactly 1.0 (or the filters could not be built) samples pass
/// through untouched.
pub struct FilterStage {
    num_channels: usize,
    filters: Vec<BandFilters>,
    low_buf: Vec<f32>,
    mid_buf: Vec<f32>,
    high_buf: Vec<f32>,
}

impl FilterStage {
    pub fn new(num_channels: usize) -> Self {
        FilterStage {
            num_channels,
            filters: Vec::new(),
            low_buf: Vec::new(),
            mid_buf: Vec::new(),
            high_buf: Vec::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Builds fresh filters for `sample_rate`, discarding any filter state.
    /// On failure the stage is left unconfigured and bypasses.
    pub fn configure(&mut self, sample_rate: f64) {
        self.filters.clear();
        match build_band_coefficients(sample_rate as f32) {
            Ok((low, mid, high)) => {
                self.filters = (0..self.num_channels)
                    .map(|_| BandFilters {
                        low: DirectForm1::<f32>::new(low),
                        mid: DirectForm1::<f32>::new(mid),
                        high: DirectForm1::<f32>::new(high),
                    })
                    .collect();
                log::debug!(
                    "EQ: Configured {} channel(s) at {} Hz",
                    self.num_channels,
                    sample_rate
                );
            }
            Err(e) => {
                log::error!("EQ: {}. Filters bypassed at {} Hz.", e, sample_rate);
            }
        }
    }

    /// Sizes the band scratch buffers. Longer inputs are processed in chunks.
    pub fn prepare(&mut self, max_frames: usize) {
        let len = max_frames.max(1);
        self.low_buf.resize(len, 0.0);
        self.mid_buf.resize(len, 0.0);
        self.high_buf.resize(len, 0.0);
    }

    /// Filters one channel's samples in place.
    pub fn process(&mut self, channel: usize, samples: &mut [f32], gains: BandGains) {
        if gains.is_neutral() || channel >= self.filters.len() || self.low_buf.is_empty() {
            return;
        }
        let filters = &mut self.filters[channel];
        let chunk_len = self.low_buf.len();

        for chunk in samples.chunks_mut(chunk_len) {
            let n = chunk.len();
            let low = &mut self.low_buf[..n];
            let mid = &mut self.mid_buf[..n];
            let high = &mut self.high_buf[..n];
            low.copy_from_slice(chunk);
            mid.copy_from_slice(chunk);
            high.copy_from_slice(chunk);

            for s in low.iter_mut() {
                *s = filters.low.run(*s) * gains.low;
            }
            for s in mid.iter_mut() {
                *s = filters.mid.run(*s) * gains.mid;
            }
            for s in high.iter_mut() {
                *s = filters.high.run(*s) * gains.high;
            }

            for (i, out) in chunk.iter_mut().enumerate() {
                *out = low[i] + mid[i] + high[i];
            }
        }
    }

    pub fn process_block(&mut self, block: &mut AudioBlock, gains: BandGains) {
        if gains.is_neutral() {
            return;
        }
        for channel in 0..block.num_channels() {
            self.process(channel, block.channel_mut(channel), gains);
        }
    }
}

// --- Filter Calculation Helpers ---

fn build_band_coefficients(
    sample_rate: f32,
) -> Result<(Coefficients<f32>, Coefficients<f32>, Coefficients<f32>), AudioEffectsError> {
    Ok((
        calculate_low_pass(sample_rate)?,
        calculate_band_pass(sample_rate)?,
        calculate_high_pass(sample_rate)?,
    ))
}

fn calculate_low_pass(sample_rate: f32) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::LowPass,
        sample_rate.hz(),
        config::LOW_CROSSOVER_HZ.hz(),
        config::PASS_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("LowPass: {:?}", e),
    })
}

fn calculate_band_pass(sample_rate: f32) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::BandPass,
        sample_rate.hz(),
        config::MID_CENTER_HZ.hz(),
        config::MID_BAND_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("BandPass: {:?}", e),
    })
}

fn calculate_high_pass(sample_rate: f32) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::HighPass,
        sample_rate.hz(),
        config::HIGH_CROSSOVER_HZ.hz(),
        config::PASS_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("HighPass: {:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize) -> Vec<f32> {
        // Deterministic LCG so the test input is stable.
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    fn prepared_stage(channels: usize) -> FilterStage {
        let mut stage = FilterStage::new(channels);
        stage.configure(44_100.0);
        stage.prepare(256);
        stage
    }

    #[test]
    fn neutral_gains_are_bit_exact() {
        let mut stage = prepared_stage(2);
        let input = noise(1000);
        let mut samples = input.clone();
        stage.process(0, &mut samples, BandGains::default());
        assert_eq!(samples, input);
    }

    #[test]
    fn unconfigured_stage_bypasses() {
        let mut stage = FilterStage::new(1);
        stage.prepare(64);
        assert!(!stage.is_configured());
        let input = noise(64);
        let mut samples = input.clone();
        let gains = BandGains { low: 0.0, mid: 0.0, high: 0.0 };
        stage.process(0, &mut samples, gains);
        assert_eq!(samples, input);
    }

    #[test]
    fn filters_engage_when_any_gain_moves() {
        let mut stage = prepared_stage(1);
        let input = noise(512);
        let mut samples = input.clone();
        let gains = BandGains { low: 1.0, mid: 1.0, high: 0.999 };
        stage.process(0, &mut samples, gains);
        assert_ne!(samples, input);
    }

    #[test]
    fn boosted_low_band_doubles_dc() {
        let mut stage = prepared_stage(1);
        let mut samples = vec![0.5_f32; 44_100];
        let gains = BandGains { low: 2.0, mid: 1.0, high: 1.0 };
        stage.process(0, &mut samples, gains);
        // Band-pass and high-pass settle to zero on DC; low-pass passes it.
        let tail = samples[samples.len() - 1];
        assert!((tail - 1.0).abs() < 1e-3, "settled at {tail}");
    }

    #[test]
    fn channels_keep_independent_state() {
        let gains = BandGains { low: 0.5, mid: 1.5, high: 0.2 };
        let input = noise(700);

        let mut solo = prepared_stage(1);
        let mut expected = input.clone();
        solo.process(0, &mut expected, gains);

        let mut stereo = prepared_stage(2);
        let mut other = noise(700).into_iter().rev().collect::<Vec<_>>();
        let mut left = input.clone();
        stereo.process(1, &mut other, gains);
        stereo.process(0, &mut left, gains);
        assert_eq!(left, expected);
    }

    #[test]
    fn chunking_matches_single_pass() {
        let gains = BandGains { low: 1.2, mid: 0.0, high: 1.8 };
        let input = noise(1000);

        let mut small = FilterStage::new(1);
        small.configure(48_000.0);
        small.prepare(37);
        let mut chunked = input.clone();
        small.process(0, &mut chunked, gains);

        let mut large = FilterStage::new(1);
        large.configure(48_000.0);
        large.prepare(1000);
        let mut whole = input.clone();
        large.process(0, &mut whole, gains);

        assert_eq!(chunked, whole);
    }

    #[test]
    fn process_block_filters_every_channel() {
        let mut stage = prepared_stage(2);
        let mut block = AudioBlock::new(2, 128);
        block.channel_mut(0).copy_from_slice(&noise(128));
        block.channel_mut(1).copy_from_slice(&noise(128));
        let gains = BandGains { low: 0.0, mid: 0.0, high: 0.0 };
        stage.process_block(&mut block, gains);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));
        assert!(block.channel(1).iter().all(|s| *s == 0.0));
    }
}
