use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioEffectsError {
    #[error("Failed to calculate {filter_type} coefficients")]
    CoefficientCalculationError { filter_type: String },
}

/// A control value outside its documented bounds. The target keeps its
/// previous value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{parameter} must be between {min} and {max}, got {value}")]
pub struct ParameterRangeError {
    pub parameter: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl ParameterRangeError {
    /// Ok when `min <= value <= max`. NaN is always out of range.
    pub(crate) fn check(
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterRangeError> {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(ParameterRangeError {
                parameter,
                value,
                min,
                max,
            })
        }
    }
}

#[derive(Error, Debug)]
pub enum AudioDecodingError {
    #[error("Failed to open file '{path}': {source}")]
    FileOpenError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Symphonia probe/format error for '{path}': {source}")]
    FormatError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("No suitable audio track in '{path}'")]
    NoSuitableTrack { path: String },
    #[error("Sample rate missing in '{path}'")]
    MissingSampleRate { path: String },
    #[error("Channel info missing in '{path}'")]
    MissingChannelInfo { path: String },
    #[error("Failed to create decoder for '{path}': {source}")]
    DecoderCreationError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("Symphonia fatal decode error in '{path}': {source}")]
    FatalDecodeError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("Symphonia I/O error reading packet for '{path}': {source}")]
    PacketReadIoError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("Failed to convert '{path}' from {from_rate} Hz to {to_rate} Hz: {reason}")]
    ResampleError {
        path: String,
        from_rate: u32,
        to_rate: u32,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("No default audio output device available")]
    OutputDeviceUnavailable,
    #[error("Failed to query output configurations: {0}")]
    SupportedConfigsError(#[from] cpal::SupportedStreamConfigsError),
    #[error("Output device does not support {channels} channel(s) of f32 at {sample_rate} Hz")]
    UnsupportedOutputConfig { channels: u16, sample_rate: u32 },
    #[error("Failed to build output stream: {0}")]
    CpalBuildStreamError(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    CpalPlayStreamError(#[from] cpal::PlayStreamError),
    #[error("Failed to pause output stream: {0}")]
    CpalPauseStreamError(#[from] cpal::PauseStreamError),
    #[error("Loading track into deck {deck_id} failed: {source}")]
    TrackLoadError {
        deck_id: String,
        #[source]
        source: AudioDecodingError,
    },
    #[error("Playlist entry {index} does not exist (playlist has {len} entries)")]
    PlaylistIndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("File '{path}' does not exist")]
    FileNotFound { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_bounds_and_rejects_outside() {
        assert!(ParameterRangeError::check("gain", 0.0, 0.0, 1.0).is_ok());
        assert!(ParameterRangeError::check("gain", 1.0, 0.0, 1.0).is_ok());
        let err = ParameterRangeError::check("gain", 1.5, 0.0, 1.0).unwrap_err();
        assert_eq!(err.parameter, "gain");
        assert_eq!(err.value, 1.5);
        assert!(ParameterRangeError::check("gain", f64::NAN, 0.0, 1.0).is_err());
    }
}
