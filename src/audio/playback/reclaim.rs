use basedrop::{Collector, Handle};

/// Owner of the deferred-free queue for track buffers.
///
/// Tracks are wrapped in `basedrop::Shared`, so the audio thread only
/// enqueues a pointer when it drops the last reference to a swapped-out
/// track. The memory is released when the control thread calls
/// [`Reclaimer::collect`].
pub struct Reclaimer {
    collector: Collector,
}

impl Reclaimer {
    pub fn new() -> Self {
        Reclaimer {
            collector: Collector::new(),
        }
    }

    /// Handle for allocating `Shared` values that report to this collector.
    pub fn handle(&self) -> Handle {
        self.collector.handle()
    }

    /// Frees everything queued since the last call.
    pub fn collect(&mut self) {
        let before = self.collector.alloc_count();
        self.collector.collect();
        let freed = before.saturating_sub(self.collector.alloc_count());
        if freed > 0 {
            log::debug!("Reclaimer: Freed {} deferred allocation(s)", freed);
        }
    }

    /// Live allocations still owned by this collector.
    pub fn live_allocations(&self) -> usize {
        self.collector.alloc_count()
    }
}

impl Default for Reclaimer {
    fn default() -> Self {
        Self::new()
    }
}
