use crate::audio::config;
use crate::audio::errors::ParameterRangeError;
use crate::audio::types::{AudioBlock, AudioBlockSource};

/// Variable-rate playback stage.
///
/// Reads its upstream source at `ratio` input frames per output frame using
/// 4-point cubic interpolation. 1.0 passes input through unchanged, 2.0 plays
/// twice as fast, 0.0 holds and outputs silence.
pub struct Resampler<S: AudioBlockSource> {
    source: S,
    ratio: f64,
    /// Read position relative to `history[1]`, always in [0, 1) between blocks.
    position: f64,
    /// Per-channel input history. `history[0]` is the frame before the read head.
    history: Vec<Vec<f32>>,
    history_len: usize,
    input: AudioBlock,
    num_channels: usize,
}

impl<S: AudioBlockSource> Resampler<S> {
    pub fn new(source: S, num_channels: usize) -> Self {
        Resampler {
            source,
            ratio: 1.0,
            position: 0.0,
            history: vec![Vec::new(); num_channels],
            history_len: 0,
            input: AudioBlock::new(num_channels, 0),
            num_channels,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Sets the playback ratio. Out-of-range values are rejected and the
    /// previous ratio stays in effect.
    pub fn set_ratio(&mut self, ratio: f64) -> Result<(), ParameterRangeError> {
        ParameterRangeError::check("speed ratio", ratio, config::SPEED_MIN, config::SPEED_MAX)?;
        self.ratio = ratio;
        Ok(())
    }

    /// Drops interpolation history, e.g. after the upstream position jumped.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.history_len = 1.min(self.history.first().map_or(0, Vec::len));
        for channel in self.history.iter_mut() {
            if let Some(first) = channel.first_mut() {
                *first = 0.0;
            }
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn history_capacity(block_size: usize) -> usize {
        block_size * config::SPEED_MAX.ceil() as usize + 2 * config::RESAMPLER_HISTORY_FRAMES
    }

    #[inline]
    fn interpolate(y0: f32, y1: f32, y2: f32, y3: f32, frac: f32) -> f32 {
        let a = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
        let b = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
        let c = -0.5 * y0 + 0.5 * y2;
        let d = y1;
        ((a * frac + b) * frac + c) * frac + d
    }

    /// Pulls upstream until the history holds `needed` frames.
    fn fill_history(&mut self, needed: usize) {
        while self.history_len < needed {
            let want = (needed - self.history_len).min(self.input.capacity());
            if want == 0 {
                break;
            }
            self.input.set_frames(want);
            self.source.pull(&mut self.input);
            for (channel, history) in self.history.iter_mut().enumerate() {
                history[self.history_len..self.history_len + want]
                    .copy_from_slice(self.input.channel(channel));
            }
            self.history_len += want;
        }
    }
}

impl<S: AudioBlockSource> AudioBlockSource for Resampler<S> {
    fn prepare(&mut self, block_size: usize, sample_rate: f64) {
        let capacity = Self::history_capacity(block_size.max(1));
        for channel in self.history.iter_mut() {
            channel.clear();
            channel.resize(capacity, 0.0);
        }
        self.input = AudioBlock::new(self.num_channels, capacity);
        self.source.prepare(block_size, sample_rate);
        self.reset();
    }

    fn pull(&mut self, block: &mut AudioBlock) {
        let frames = block.frames();
        if frames == 0 {
            return;
        }
        if self.ratio == 0.0 || self.history_len == 0 {
            block.clear();
            return;
        }

        let capacity = self.history.first().map_or(0, Vec::len);
        let last = self.position + (frames - 1) as f64 * self.ratio;
        let advanced = self.position + frames as f64 * self.ratio;
        // Enough to interpolate the last output frame and to keep the frame
        // behind the next read head once this block is consumed.
        let needed = (last.floor() as usize + config::RESAMPLER_HISTORY_FRAMES)
            .max(advanced.floor() as usize + 1)
            .min(capacity);
        self.fill_history(needed);

        let max_index = self.history_len.saturating_sub(config::RESAMPLER_HISTORY_FRAMES);
        for (history, out) in self.history.iter().zip(block.channels_mut()) {
            for (k, sample) in out.iter_mut().enumerate() {
                let t = self.position + k as f64 * self.ratio;
                let i = (t.floor() as usize).min(max_index);
                let frac = (t - i as f64) as f32;
                *sample = Self::interpolate(
                    history[i],
                    history[i + 1],
                    history[i + 2],
                    history[i + 3],
                    frac,
                );
            }
        }

        let consumed = (advanced.floor() as usize).min(self.history_len);
        self.position = advanced - consumed as f64;
        for history in self.history.iter_mut() {
            history.copy_within(consumed..self.history_len, 0);
        }
        self.history_len -= consumed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits an ascending ramp on every channel and counts frames pulled.
    struct Ramp {
        next: f32,
        frames_pulled: usize,
    }

    impl AudioBlockSource for Ramp {
        fn prepare(&mut self, _block_size: usize, _sample_rate: f64) {}

        fn pull(&mut self, block: &mut AudioBlock) {
            let start = self.next;
            for channel in block.channels_mut() {
                for (i, s) in channel.iter_mut().enumerate() {
                    *s = start + i as f32;
                }
            }
            self.next += block.frames() as f32;
            self.frames_pulled += block.frames();
        }
    }

    fn ramp_resampler(block_size: usize) -> Resampler<Ramp> {
        let mut resampler = Resampler::new(Ramp { next: 0.0, frames_pulled: 0 }, 2);
        resampler.prepare(block_size, 44_100.0);
        resampler
    }

    #[test]
    fn rejects_out_of_range_ratio_and_keeps_previous() {
        let mut resampler = ramp_resampler(16);
        resampler.set_ratio(1.5).unwrap();
        assert!(resampler.set_ratio(10.5).is_err());
        assert!(resampler.set_ratio(-0.1).is_err());
        assert!(resampler.set_ratio(f64::NAN).is_err());
        assert_eq!(resampler.ratio(), 1.5);
        assert!(resampler.set_ratio(10.0).is_ok());
    }

    #[test]
    fn unit_ratio_passes_input_through() {
        let mut resampler = ramp_resampler(64);
        let mut block = AudioBlock::new(2, 64);
        for pass in 0..3 {
            resampler.pull(&mut block);
            for (i, s) in block.channel(1).iter().enumerate() {
                assert_eq!(*s, (pass * 64 + i) as f32);
            }
        }
    }

    #[test]
    fn zero_ratio_is_silent_and_holds_upstream() {
        let mut resampler = ramp_resampler(32);
        let mut block = AudioBlock::new(2, 32);
        resampler.pull(&mut block);
        let pulled = resampler.source().frames_pulled;

        resampler.set_ratio(0.0).unwrap();
        block.channel_mut(0).fill(9.0);
        resampler.pull(&mut block);
        assert!(block.channel(0).iter().all(|s| *s == 0.0));
        assert_eq!(resampler.source().frames_pulled, pulled);
    }

    #[test]
    fn half_ratio_interpolates_a_ramp() {
        let mut resampler = ramp_resampler(50);
        resampler.set_ratio(0.5).unwrap();
        let mut block = AudioBlock::new(2, 50);
        let mut output = Vec::new();
        for _ in 0..4 {
            resampler.pull(&mut block);
            output.extend_from_slice(block.channel(0));
        }
        // The first frames see the zero-padded history.
        for (k, s) in output.iter().enumerate().skip(2) {
            assert!((s - k as f32 * 0.5).abs() < 1e-3, "frame {k}: {s}");
        }
    }

    #[test]
    fn double_ratio_consumes_twice_the_input() {
        let mut resampler = ramp_resampler(100);
        resampler.set_ratio(2.0).unwrap();
        let mut block = AudioBlock::new(2, 100);
        resampler.pull(&mut block);
        resampler.pull(&mut block);
        assert_eq!(block.channel(0)[0], 200.0);
        assert_eq!(block.channel(0)[99], 398.0);
    }

    #[test]
    fn reset_restarts_from_fresh_input() {
        let mut resampler = ramp_resampler(8);
        let mut block = AudioBlock::new(2, 8);
        resampler.pull(&mut block);
        resampler.reset();
        resampler.pull(&mut block);
        // Lookahead pulled before the reset is discarded.
        assert_eq!(block.channel(0)[0], 10.0);
    }

    #[test]
    fn maximum_ratio_fits_history() {
        let mut resampler = ramp_resampler(512);
        resampler.set_ratio(10.0).unwrap();
        let mut block = AudioBlock::new(2, 512);
        resampler.pull(&mut block);
        resampler.pull(&mut block);
        assert_eq!(block.channel(0)[0], 5120.0);
    }
}
