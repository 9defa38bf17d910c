pub mod config;
pub(crate) mod decoding;
pub mod effects;
pub mod errors;
pub mod output;
pub mod playback;
pub mod resampler;
pub mod track;
pub mod types;
