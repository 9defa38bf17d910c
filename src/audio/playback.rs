use std::time::Duration;

use crate::audio::config::{self, EngineConfig};
use crate::audio::errors::PlaybackError;
use crate::audio::output::AudioOutput;
use crate::audio::types::{DeckId, DeckStatus, TrackInfo};
use crate::playlist::Playlist;

pub mod crossfade;
pub mod deck;
pub mod mixer;
pub mod reclaim;
mod state;
pub mod time;
mod transport;

use deck::{DeckEngine, DeckHandle};
use mixer::Mixer;
use reclaim::Reclaimer;

/// Two decks, a crossfader and a playlist, driven from the control thread.
///
/// The audio side (a [`Mixer`] holding both deck engines) either runs on the
/// default output device or is handed back to the caller to pull directly.
pub struct DjController {
    // Must drop before `reclaimer`.
    output: Option<AudioOutput>,
    deck_a: DeckHandle,
    deck_b: DeckHandle,
    crossfader: f32,
    playlist: Playlist,
    reclaimer: Reclaimer,
    config: EngineConfig,
}

impl DjController {
    /// Builds both decks and returns the mixer instead of opening a device.
    /// The caller prepares and pulls the mixer itself.
    pub fn detached(config: EngineConfig) -> (DjController, Mixer) {
        let reclaimer = Reclaimer::new();
        let engine_a = DeckEngine::new(DeckId::A, &config, reclaimer.handle());
        let engine_b = DeckEngine::new(DeckId::B, &config, reclaimer.handle());
        let deck_a = engine_a.handle();
        let deck_b = engine_b.handle();

        let mut mixer = Mixer::new(config.channel_count());
        mixer.add_deck(engine_a);
        mixer.add_deck(engine_b);

        let mut controller = DjController {
            output: None,
            deck_a,
            deck_b,
            crossfader: config::INITIAL_CROSSFADER,
            playlist: Playlist::new(),
            reclaimer,
            config,
        };
        controller.set_crossfader(config::INITIAL_CROSSFADER);
        (controller, mixer)
    }

    /// Builds both decks and starts streaming them to the default device.
    pub fn with_output(config: EngineConfig) -> Result<DjController, PlaybackError> {
        let (mut controller, mixer) = Self::detached(config);
        controller.output = Some(AudioOutput::start(mixer, &config)?);
        log::info!("Controller: Output running");
        Ok(controller)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn output(&self) -> Option<&AudioOutput> {
        self.output.as_ref()
    }

    pub fn deck(&self, id: DeckId) -> &DeckHandle {
        match id {
            DeckId::A => &self.deck_a,
            DeckId::B => &self.deck_b,
        }
    }

    /// Moves the crossfader and writes the resulting gains into both decks'
    /// master gain. Returns `(left, right)`.
    pub fn set_crossfader(&mut self, value: f32) -> (f32, f32) {
        let gains = crossfade::apply_crossfade(value, &self.deck_a, &self.deck_b);
        self.crossfader = gains.1;
        gains
    }

    pub fn crossfader(&self) -> f32 {
        self.crossfader
    }

    /// Frees swapped-out tracks and snapshots both decks. Meant to be called
    /// every [`DjController::poll_interval`].
    pub fn tick(&mut self) -> [DeckStatus; 2] {
        self.reclaimer.collect();
        [self.deck_a.status(), self.deck_b.status()]
    }

    pub fn poll_interval() -> Duration {
        Duration::from_millis(config::TELEMETRY_POLL_INTERVAL_MS)
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn playlist_mut(&mut self) -> &mut Playlist {
        &mut self.playlist
    }

    /// Loads playlist entry `index` into `deck`.
    pub fn load_playlist_entry(&self, index: usize, deck: DeckId) -> Result<TrackInfo, PlaybackError> {
        let entry = self
            .playlist
            .entry(index)
            .ok_or(PlaybackError::PlaylistIndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;
        self.deck(deck)
            .load_track(&entry.path)
            .map_err(|source| PlaybackError::TrackLoadError {
                deck_id: deck.to_string(),
                source,
            })
    }
}
