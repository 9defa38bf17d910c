use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use basedrop::{Handle, Shared, SharedCell};

use crate::audio::config;
use crate::audio::errors::ParameterRangeError;
use crate::audio::track::TrackSource;
use crate::audio::types::{Band, BandGains};

// --- Atomic Floats ---

/// f32 stored as its bit pattern so the audio thread can read it lock-free.
#[derive(Debug)]
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub(crate) fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    pub(crate) fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub(crate) fn new(value: f64) -> Self {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// --- Play Head ---

const FRAME_BITS: u32 = 40;
const FRAME_MASK: u64 = (1 << FRAME_BITS) - 1;
const GENERATION_MASK: u64 = (1 << (64 - FRAME_BITS)) - 1;

/// Read position and seek generation packed into one word, so a stale
/// advance from the audio thread can never land after a seek or load that
/// happens to leave the frame number unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlayHead(u64);

impl PlayHead {
    fn new(generation: u64, frame: u64) -> Self {
        PlayHead(((generation & GENERATION_MASK) << FRAME_BITS) | (frame & FRAME_MASK))
    }

    /// Next frame the audio thread will read.
    pub(crate) fn frame(self) -> u64 {
        self.0 & FRAME_MASK
    }

    pub(crate) fn generation(self) -> u64 {
        self.0 >> FRAME_BITS
    }

    /// Same generation, new frame: continuous playback.
    fn advanced_to(self, frame: u64) -> Self {
        PlayHead::new(self.generation(), frame)
    }

    /// Next generation: a discontinuity downstream stages must notice.
    fn jumped_to(self, frame: u64) -> Self {
        PlayHead::new(self.generation().wrapping_add(1), frame)
    }
}

// --- Transport State ---

/// Play head shared between a deck's control handle and its audio thread.
///
/// The loaded track sits behind a `SharedCell`, so a load is a single
/// pointer swap and the old buffer is freed by the collector, never by the
/// audio thread.
pub(crate) struct TransportState {
    track: SharedCell<Option<TrackSource>>,
    /// Packed [`PlayHead`]. The generation is bumped on every seek, load
    /// and end-of-track stop.
    head: AtomicU64,
    playing: AtomicBool,
    looping: AtomicBool,
    gc: Handle,
}

impl TransportState {
    pub(crate) fn new(gc: Handle) -> Self {
        TransportState {
            track: SharedCell::new(Shared::new(&gc, None)),
            head: AtomicU64::new(PlayHead::new(0, 0).0),
            playing: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            gc,
        }
    }

    /// Replaces the loaded track. Playback stops and the cursor returns to 0.
    /// The track is swapped before the head moves, so a reader that sees the
    /// new generation also sees the new track.
    pub(crate) fn set_track(&self, track: TrackSource) {
        self.playing.store(false, Ordering::SeqCst);
        self.track.set(Shared::new(&self.gc, Some(track)));
        self.move_cursor(0);
    }

    pub(crate) fn track(&self) -> Shared<Option<TrackSource>> {
        self.track.get()
    }

    fn with_track<R>(&self, f: impl FnOnce(Option<&TrackSource>) -> R) -> R {
        let track = self.track.get();
        f((*track).as_ref())
    }

    pub(crate) fn has_track(&self) -> bool {
        self.with_track(|t| t.is_some())
    }

    pub(crate) fn track_sample_rate(&self) -> Option<u32> {
        self.with_track(|t| t.map(TrackSource::sample_rate))
    }

    pub(crate) fn length_frames(&self) -> u64 {
        self.with_track(|t| t.map_or(0, |t| t.frames() as u64))
    }

    pub(crate) fn length_seconds(&self) -> f64 {
        self.with_track(|t| t.map_or(0.0, TrackSource::length_seconds))
    }

    pub(crate) fn head(&self) -> PlayHead {
        PlayHead(self.head.load(Ordering::Acquire))
    }

    pub(crate) fn cursor(&self) -> u64 {
        self.head().frame()
    }

    /// Moves the cursor from `observed` to `next` unless a seek or load
    /// changed the head first. Returns false when the audio thread lost
    /// that race.
    pub(crate) fn advance_cursor(&self, observed: PlayHead, next: u64) -> bool {
        self.head
            .compare_exchange(
                observed.0,
                observed.advanced_to(next).0,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn seek_generation(&self) -> u64 {
        self.head().generation()
    }

    fn move_cursor(&self, frame: u64) {
        let mut current = self.head.load(Ordering::Acquire);
        loop {
            let next = PlayHead(current).jumped_to(frame).0;
            match self
                .head
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Seeks to an absolute time, limited to `[0, length]`. Only NaN and
    /// infinite values are rejected.
    pub(crate) fn seek(&self, seconds: f64) -> Result<(), ParameterRangeError> {
        if !seconds.is_finite() {
            return Err(ParameterRangeError {
                parameter: "position",
                value: seconds,
                min: 0.0,
                max: self.length_seconds(),
            });
        }
        let seconds = seconds.max(0.0);
        let target = self.with_track(|t| {
            t.map(|t| ((seconds * t.sample_rate() as f64).floor() as u64).min(t.frames() as u64))
        });
        if let Some(frame) = target {
            self.move_cursor(frame);
        }
        Ok(())
    }

    /// Seeks to a fraction of the track length.
    pub(crate) fn seek_relative(&self, fraction: f64) -> Result<(), ParameterRangeError> {
        ParameterRangeError::check("relative position", fraction, 0.0, 1.0)?;
        let length = self.length_frames();
        if length == 0 {
            return Ok(());
        }
        let frame = (fraction * length as f64).floor() as u64;
        self.move_cursor(frame.min(length));
        Ok(())
    }

    /// Rewinds to the start after the last frame was played: keeps going
    /// when looping, otherwise stops.
    pub(crate) fn finish_pass(&self, observed: PlayHead) -> bool {
        let looping = self.looping.load(Ordering::Relaxed);
        let rewound = if looping {
            observed.advanced_to(0)
        } else {
            observed.jumped_to(0)
        };
        if self
            .head
            .compare_exchange(observed.0, rewound.0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if !looping {
            self.playing.store(false, Ordering::Release);
        }
        looping
    }

    pub(crate) fn start(&self) {
        self.playing.store(true, Ordering::Release);
    }

    pub(crate) fn stop(&self) {
        self.playing.store(false, Ordering::Release);
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(crate) fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }

    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    pub(crate) fn position_seconds(&self) -> f64 {
        self.with_track(|track| match track {
            Some(track) if track.sample_rate() > 0 => {
                self.cursor().min(track.frames() as u64) as f64 / track.sample_rate() as f64
            }
            _ => 0.0,
        })
    }

    /// Position over length. NaN when nothing (or an empty track) is loaded.
    pub(crate) fn position_relative(&self) -> f64 {
        self.with_track(|track| match track {
            Some(track) => self.cursor().min(track.frames() as u64) as f64 / track.frames() as f64,
            None => f64::NAN,
        })
    }
}

// --- Deck Parameters ---

/// Everything a deck's control handle and audio thread both touch.
pub(crate) struct DeckShared {
    pub(crate) transport: TransportState,
    pub(crate) master_gain: AtomicF32,
    pub(crate) speed: AtomicF64,
    low_gain: AtomicF32,
    mid_gain: AtomicF32,
    high_gain: AtomicF32,
    /// Output rate seen at the last prepare; 0 until then.
    pub(crate) output_sample_rate: AtomicU32,
}

impl DeckShared {
    pub(crate) fn new(gc: Handle) -> Self {
        DeckShared {
            transport: TransportState::new(gc),
            master_gain: AtomicF32::new(config::INITIAL_MASTER_GAIN),
            speed: AtomicF64::new(config::INITIAL_SPEED),
            low_gain: AtomicF32::new(config::NEUTRAL_BAND_GAIN),
            mid_gain: AtomicF32::new(config::NEUTRAL_BAND_GAIN),
            high_gain: AtomicF32::new(config::NEUTRAL_BAND_GAIN),
            output_sample_rate: AtomicU32::new(0),
        }
    }

    fn band(&self, band: Band) -> &AtomicF32 {
        match band {
            Band::Low => &self.low_gain,
            Band::Mid => &self.mid_gain,
            Band::High => &self.high_gain,
        }
    }

    pub(crate) fn set_band_gain(&self, band: Band, gain: f32) {
        self.band(band).store(gain);
    }

    pub(crate) fn band_gains(&self) -> BandGains {
        BandGains {
            low: self.low_gain.load(),
            mid: self.mid_gain.load(),
            high: self.high_gain.load(),
        }
    }

    pub(crate) fn reset_band_gains(&self) {
        for band in [Band::Low, Band::Mid, Band::High] {
            self.set_band_gain(band, config::NEUTRAL_BAND_GAIN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Collector;

    fn ramp_track(frames: usize, sample_rate: u32) -> TrackSource {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        TrackSource::from_samples(vec![samples.clone(), samples], sample_rate)
    }

    #[test]
    fn atomic_floats_round_trip_bits() {
        let a = AtomicF32::new(0.25);
        a.store(-1.5);
        assert_eq!(a.load(), -1.5);
        let b = AtomicF64::new(1.0);
        b.store(f64::NAN);
        assert!(b.load().is_nan());
    }

    #[test]
    fn empty_transport_reports_nan_relative_position() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        assert!(!state.has_track());
        assert!(state.position_relative().is_nan());
        assert_eq!(state.position_seconds(), 0.0);
        assert_eq!(state.length_seconds(), 0.0);
        assert!(state.seek_relative(0.5).is_ok());
        assert!(state.seek(3.0).is_ok());
    }

    #[test]
    fn seek_clamps_to_track_bounds() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(100, 100));

        state.seek(0.5).unwrap();
        assert_eq!(state.cursor(), 50);
        state.seek(30.0).unwrap();
        assert_eq!(state.cursor(), 100);
        state.seek(-1.0).unwrap();
        assert_eq!(state.cursor(), 0);

        state.seek(0.2).unwrap();
        assert!(state.seek(f64::NAN).is_err());
        assert!(state.seek(f64::NEG_INFINITY).is_err());
        assert_eq!(state.cursor(), 20);
    }

    #[test]
    fn relative_seek_rejects_outside_unit_range() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(200, 100));

        state.seek_relative(0.25).unwrap();
        assert_eq!(state.cursor(), 50);
        assert!((state.position_relative() - 0.25).abs() < 1e-9);
        assert!(state.seek_relative(1.2).is_err());
        assert!(state.seek_relative(-0.1).is_err());
        assert_eq!(state.cursor(), 50);
    }

    #[test]
    fn seeking_bumps_generation() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(10, 10));
        let before = state.seek_generation();
        state.seek(0.1).unwrap();
        assert!(state.seek_generation() > before);
    }

    #[test]
    fn loading_stops_and_rewinds() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(10, 10));
        state.seek(0.5).unwrap();
        state.start();

        state.set_track(ramp_track(20, 10));
        assert!(!state.is_playing());
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.length_frames(), 20);
    }

    #[test]
    fn zero_length_track_has_nan_relative_position() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(0, 44_100));
        assert!(state.has_track());
        assert!(state.position_relative().is_nan());
        assert!(state.seek_relative(0.5).is_ok());
    }

    #[test]
    fn cursor_advance_loses_to_a_concurrent_seek() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(100, 100));
        let observed = state.head();
        state.seek(0.7).unwrap();
        assert!(!state.advance_cursor(observed, observed.frame() + 10));
        assert_eq!(state.cursor(), 70);
    }

    #[test]
    fn stale_advance_loses_to_a_track_load() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(100, 100));
        state.start();
        let observed = state.head();
        assert_eq!(observed.frame(), 0);

        state.set_track(ramp_track(50, 100));
        assert!(!state.advance_cursor(observed, observed.frame() + 64));
        assert_eq!(state.cursor(), 0);
        assert!(!state.is_playing());
    }

    #[test]
    fn stale_advance_loses_to_a_seek_onto_the_same_frame() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(100, 100));
        state.seek(0.3).unwrap();
        let observed = state.head();

        state.seek(0.3).unwrap();
        assert_eq!(state.cursor(), observed.frame());
        assert!(!state.advance_cursor(observed, observed.frame() + 10));
        assert_eq!(state.cursor(), 30);
    }

    #[test]
    fn play_head_keeps_generation_apart_from_frame() {
        let head = PlayHead::new(7, 123_456);
        assert_eq!(head.generation(), 7);
        assert_eq!(head.frame(), 123_456);
        assert_eq!(head.advanced_to(9).generation(), 7);
        assert_eq!(head.jumped_to(9).generation(), 8);
        let wrapped = PlayHead::new(GENERATION_MASK, 5).jumped_to(5);
        assert_eq!(wrapped.generation(), 0);
        assert_eq!(wrapped.frame(), 5);
    }

    #[test]
    fn finishing_a_pass_loops_or_stops() {
        let collector = Collector::new();
        let state = TransportState::new(collector.handle());
        state.set_track(ramp_track(10, 10));
        state.start();
        state.seek(1.0).unwrap();

        state.set_looping(true);
        let generation = state.seek_generation();
        assert!(state.finish_pass(state.head()));
        assert!(state.is_playing());
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.seek_generation(), generation);

        state.seek(1.0).unwrap();
        state.set_looping(false);
        let generation = state.seek_generation();
        assert!(!state.finish_pass(state.head()));
        assert!(state.seek_generation() != generation);
        assert!(!state.is_playing());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn band_gains_reset_to_neutral() {
        let collector = Collector::new();
        let shared = DeckShared::new(collector.handle());
        shared.set_band_gain(Band::Mid, 0.0);
        assert_eq!(shared.band_gains().mid, 0.0);
        shared.reset_band_gains();
        assert!(shared.band_gains().is_neutral());
    }
}
