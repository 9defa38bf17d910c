use std::sync::Arc;
use std::sync::atomic::Ordering;

use basedrop::Handle;

use super::state::DeckShared;
use super::time;
use super::transport::Transport;
use crate::audio::config::{self, EngineConfig};
use crate::audio::effects::FilterStage;
use crate::audio::errors::{AudioDecodingError, ParameterRangeError};
use crate::audio::resampler::Resampler;
use crate::audio::track::TrackSource;
use crate::audio::types::{
    AudioBlock, AudioBlockSource, Band, BandGains, DeckId, DeckStatus, TrackInfo, clamp_band_gain,
};

/// Audio-thread half of a deck: transport, then speed, then EQ, then gain.
pub struct DeckEngine {
    id: DeckId,
    shared: Arc<DeckShared>,
    resampler: Resampler<Transport>,
    filters: FilterStage,
    config: EngineConfig,
    last_seek_generation: u64,
    /// Output rate fixed by the last prepare; 0.0 until then.
    sample_rate: f64,
}

impl DeckEngine {
    pub fn new(id: DeckId, config: &EngineConfig, gc: Handle) -> Self {
        let shared = Arc::new(DeckShared::new(gc));
        let channels = config.channel_count();
        DeckEngine {
            id,
            resampler: Resampler::new(Transport::new(shared.clone()), channels),
            filters: FilterStage::new(channels),
            config: *config,
            last_seek_generation: shared.transport.seek_generation(),
            sample_rate: 0.0,
            shared,
        }
    }

    /// A control handle for this deck. Handles are cheap to clone and can
    /// live on any thread.
    pub fn handle(&self) -> DeckHandle {
        DeckHandle {
            id: self.id,
            shared: self.shared.clone(),
            config: self.config,
        }
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    /// Track frames consumed per output frame at unit speed. Tracks loaded
    /// from disk already match the output rate; decoded sources handed in
    /// directly may not.
    fn rate_ratio(&self) -> f64 {
        match self.shared.transport.track_sample_rate() {
            Some(rate) if rate > 0 && self.sample_rate > 0.0 => rate as f64 / self.sample_rate,
            _ => 1.0,
        }
    }
}

impl AudioBlockSource for DeckEngine {
    fn prepare(&mut self, block_size: usize, sample_rate: f64) {
        if sample_rate as u32 != self.config.sample_rate {
            log::warn!(
                "Deck {}: Prepared at {} Hz but configured for {} Hz; tracks will be decoded at {} Hz",
                self.id,
                sample_rate,
                self.config.sample_rate,
                sample_rate
            );
        }
        self.resampler.prepare(block_size, sample_rate);
        self.filters.configure(sample_rate);
        self.filters.prepare(block_size);
        self.shared
            .output_sample_rate
            .store(sample_rate as u32, Ordering::Relaxed);
        self.last_seek_generation = self.shared.transport.seek_generation();
        self.sample_rate = sample_rate;
        log::info!(
            "Deck {}: Prepared for {} frame blocks at {} Hz",
            self.id,
            block_size,
            sample_rate
        );
    }

    fn pull(&mut self, block: &mut AudioBlock) {
        // Stopped decks skip the resampler so its lookahead survives a pause.
        if self.sample_rate <= 0.0 || !self.shared.transport.is_playing() {
            block.clear();
            return;
        }

        let generation = self.shared.transport.seek_generation();
        if generation != self.last_seek_generation {
            self.resampler.reset();
            self.last_seek_generation = generation;
        }

        // Speed is range-checked on the control side; rate compensation can
        // still push the product past the resampler's limit.
        let ratio = (self.shared.speed.load() * self.rate_ratio())
            .clamp(config::SPEED_MIN, config::SPEED_MAX);
        if self.resampler.ratio() != ratio && self.resampler.set_ratio(ratio).is_err() {
            log::trace!("Deck {}: Ignoring ratio {}", self.id, ratio);
        }

        self.resampler.pull(block);
        self.filters.process_block(block, self.shared.band_gains());
        block.apply_gain(self.shared.master_gain.load());
    }
}

/// Control-thread half of a deck. Every setter takes effect on the next
/// audio block.
#[derive(Clone)]
pub struct DeckHandle {
    id: DeckId,
    shared: Arc<DeckShared>,
    config: EngineConfig,
}

impl DeckHandle {
    pub fn id(&self) -> DeckId {
        self.id
    }

    /// Decodes and swaps in a new track, converted to the rate the deck was
    /// prepared at (the configured rate before the first prepare). On
    /// failure the previous track stays loaded and nothing else changes.
    pub fn load_track(&self, path: &str) -> Result<TrackInfo, AudioDecodingError> {
        log::info!("Deck {}: Loading track '{}'", self.id, path);
        let target_rate = self.output_sample_rate().unwrap_or(self.config.sample_rate);
        let track = TrackSource::load(path, target_rate, self.config.channel_count())
            .inspect_err(|e| log::error!("Deck {}: Failed to load '{}': {}", self.id, path, e))?;
        Ok(self.load_source(track))
    }

    /// Swaps in an already decoded track. Playback stops, the play head
    /// returns to the start and the EQ is reset to neutral.
    pub fn load_source(&self, track: TrackSource) -> TrackInfo {
        let info = track.info();
        self.shared.transport.set_track(track);
        self.shared.reset_band_gains();
        log::info!(
            "Deck {}: Track ready ({:.2}s at {} Hz)",
            self.id,
            info.length_seconds,
            info.sample_rate
        );
        info
    }

    pub fn start(&self) {
        self.shared.transport.start();
        log::debug!("Deck {}: Play", self.id);
    }

    pub fn stop(&self) {
        self.shared.transport.stop();
        log::debug!("Deck {}: Stop", self.id);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.transport.is_playing()
    }

    /// With looping on, reaching the end restarts from 0 instead of stopping.
    pub fn set_looping(&self, looping: bool) {
        self.shared.transport.set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.shared.transport.is_looping()
    }

    pub fn has_track(&self) -> bool {
        self.shared.transport.has_track()
    }

    pub fn set_master_gain(&self, gain: f32) -> Result<(), ParameterRangeError> {
        ParameterRangeError::check(
            "master gain",
            gain as f64,
            config::MASTER_GAIN_MIN as f64,
            config::MASTER_GAIN_MAX as f64,
        )
        .inspect_err(|e| log::warn!("Deck {}: {}", self.id, e))?;
        self.shared.master_gain.store(gain);
        Ok(())
    }

    pub fn master_gain(&self) -> f32 {
        self.shared.master_gain.load()
    }

    pub fn set_speed(&self, ratio: f64) -> Result<(), ParameterRangeError> {
        ParameterRangeError::check("speed", ratio, config::SPEED_MIN, config::SPEED_MAX)
            .inspect_err(|e| log::warn!("Deck {}: {}", self.id, e))?;
        self.shared.speed.store(ratio);
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.shared.speed.load()
    }

    /// Seeks to `seconds`, limited to the track. Only NaN and infinities
    /// are rejected.
    pub fn set_position(&self, seconds: f64) -> Result<(), ParameterRangeError> {
        self.shared
            .transport
            .seek(seconds)
            .inspect_err(|e| log::warn!("Deck {}: {}", self.id, e))
    }

    pub fn set_position_relative(&self, fraction: f64) -> Result<(), ParameterRangeError> {
        self.shared
            .transport
            .seek_relative(fraction)
            .inspect_err(|e| log::warn!("Deck {}: {}", self.id, e))
    }

    pub fn position_seconds(&self) -> f64 {
        self.shared.transport.position_seconds()
    }

    pub fn length_seconds(&self) -> f64 {
        self.shared.transport.length_seconds()
    }

    /// Raw position over length: NaN with no track or an empty one.
    /// Use [`time::display_position`] before showing it.
    pub fn position_relative(&self) -> f64 {
        self.shared.transport.position_relative()
    }

    /// Stores a band gain limited to [0, 2] and returns the stored value.
    pub fn set_band_gain(&self, band: Band, gain: f32) -> f32 {
        let limited = clamp_band_gain(gain);
        self.shared.set_band_gain(band, limited);
        limited
    }

    pub fn set_low_gain(&self, gain: f32) -> f32 {
        self.set_band_gain(Band::Low, gain)
    }

    pub fn set_mid_gain(&self, gain: f32) -> f32 {
        self.set_band_gain(Band::Mid, gain)
    }

    pub fn set_high_gain(&self, gain: f32) -> f32 {
        self.set_band_gain(Band::High, gain)
    }

    pub fn band_gains(&self) -> BandGains {
        self.shared.band_gains()
    }

    pub fn reset_eq(&self) {
        self.shared.reset_band_gains();
    }

    /// Turning the EQ off resets every band to neutral. Turning it on
    /// changes nothing until a band is moved.
    pub fn set_eq_enabled(&self, enabled: bool) {
        if !enabled {
            self.reset_eq();
        }
    }

    /// Output rate the deck was last prepared at, if it has been.
    pub fn output_sample_rate(&self) -> Option<u32> {
        match self.shared.output_sample_rate.load(Ordering::Relaxed) {
            0 => None,
            rate => Some(rate),
        }
    }

    pub fn status(&self) -> DeckStatus {
        DeckStatus {
            deck_id: self.id,
            has_track: self.has_track(),
            is_playing: self.is_playing(),
            is_looping: self.is_looping(),
            position_seconds: self.position_seconds(),
            length_seconds: self.length_seconds(),
            position_relative: time::display_position(self.position_relative()),
            master_gain: self.master_gain(),
            speed: self.speed(),
            band_gains: self.band_gains(),
        }
    }
}
