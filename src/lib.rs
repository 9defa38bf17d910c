pub mod audio;
pub mod playlist;

pub use audio::config::EngineConfig;
pub use audio::errors::{AudioDecodingError, ParameterRangeError, PlaybackError, PlaylistError};
pub use audio::output::AudioOutput;
pub use audio::playback::DjController;
pub use audio::playback::crossfade::crossfade_gains;
pub use audio::playback::deck::{DeckEngine, DeckHandle};
pub use audio::playback::mixer::Mixer;
pub use audio::playback::time::{display_position, format_time};
pub use audio::track::TrackSource;
pub use audio::types::{
    AudioBlock, AudioBlockSource, Band, BandGains, DeckId, DeckStatus, TrackInfo,
};
pub use playlist::{Playlist, PlaylistEntry};

/// Installs `env_logger` with `RUST_LOG` support, defaulting to `info`.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
