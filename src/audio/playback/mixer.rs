use crate::audio::types::{AudioBlock, AudioBlockSource};

/// Sums any number of sources into one output block.
///
/// Inputs are owned by the mixer once added and are pulled in the order
/// they were added. Adding the same kind of source twice mixes it twice.
pub struct Mixer {
    inputs: Vec<Box<dyn AudioBlockSource>>,
    scratch: AudioBlock,
    num_channels: usize,
    /// Block size and rate from the last prepare, reused for late inputs.
    prepared: Option<(usize, f64)>,
}

impl Mixer {
    pub fn new(num_channels: usize) -> Self {
        Mixer {
            inputs: Vec::new(),
            scratch: AudioBlock::new(num_channels, 0),
            num_channels,
            prepared: None,
        }
    }

    /// Adds an input. Inputs added after streaming started are prepared
    /// here with the current settings.
    pub fn add_deck<S: AudioBlockSource + 'static>(&mut self, mut input: S) {
        if let Some((block_size, sample_rate)) = self.prepared {
            input.prepare(block_size, sample_rate);
        }
        self.inputs.push(Box::new(input));
        log::debug!("Mixer: {} deck(s) attached", self.inputs.len());
    }

    pub fn deck_count(&self) -> usize {
        self.inputs.len()
    }
}

impl AudioBlockSource for Mixer {
    fn prepare(&mut self, block_size: usize, sample_rate: f64) {
        self.scratch = AudioBlock::new(self.num_channels, block_size);
        for input in self.inputs.iter_mut() {
            input.prepare(block_size, sample_rate);
        }
        self.prepared = Some((block_size, sample_rate));
    }

    fn pull(&mut self, block: &mut AudioBlock) {
        block.clear();
        let capacity = self.scratch.capacity();
        if capacity == 0 {
            return;
        }

        // Blocks larger than the prepared size are mixed in pieces.
        let total = block.frames();
        let mut offset = 0;
        while offset < total {
            let n = (total - offset).min(capacity);
            self.scratch.set_frames(n);
            for input in self.inputs.iter_mut() {
                input.pull(&mut self.scratch);
                for (channel, out) in block.channels_mut().enumerate() {
                    if channel >= self.scratch.num_channels() {
                        break;
                    }
                    for (d, s) in out[offset..offset + n]
                        .iter_mut()
                        .zip(self.scratch.channel(channel))
                    {
                        *d += *s;
                    }
                }
            }
            offset += n;
        }
    }
}
