use std::sync::Arc;

use super::state::DeckShared;
use crate::audio::types::{AudioBlock, AudioBlockSource};

/// Audio-thread side of a deck's play head: copies frames of the loaded
/// track into the block and moves the shared cursor.
pub(crate) struct Transport {
    shared: Arc<DeckShared>,
}

impl Transport {
    pub(crate) fn new(shared: Arc<DeckShared>) -> Self {
        Transport { shared }
    }
}

impl AudioBlockSource for Transport {
    fn prepare(&mut self, _block_size: usize, _sample_rate: f64) {}

    fn pull(&mut self, block: &mut AudioBlock) {
        let frames = block.frames();
        let state = &self.shared.transport;
        let mut written = 0;

        while written < frames && state.is_playing() {
            // Head before track: a head from after a load implies its track.
            let head = state.head();
            let loaded = state.track();
            let Some(track) = (*loaded).as_ref() else {
                break;
            };
            let total = track.frames() as u64;
            let cursor = head.frame().min(total);
            if cursor >= total {
                if total == 0 {
                    state.stop();
                    break;
                }
                // A lost race means a seek landed; re-read the head.
                state.finish_pass(head);
                continue;
            }

            let start = cursor as usize;
            let n = (frames - written).min((total - cursor) as usize);
            for (channel, out) in block.channels_mut().enumerate() {
                out[written..written + n].copy_from_slice(&track.channel(channel)[start..start + n]);
            }
            if state.advance_cursor(head, cursor + n as u64) {
                written += n;
            }
        }

        for out in block.channels_mut() {
            out[written..].fill(0.0);
        }
    }
}
