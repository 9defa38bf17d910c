use super::deck::DeckHandle;

/// Linear crossfade law: `(1 - v, v)` for the left and right decks.
/// `v` is limited to [0, 1]; NaN is treated as fully left.
pub fn crossfade_gains(value: f32) -> (f32, f32) {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (1.0 - v, v)
}

/// Writes the crossfade gains into both decks' master gain.
pub fn apply_crossfade(value: f32, left: &DeckHandle, right: &DeckHandle) -> (f32, f32) {
    let (left_gain, right_gain) = crossfade_gains(value);
    // Both gains are within [0, 1] so neither setter can reject them.
    if let Err(e) = left.set_master_gain(left_gain) {
        log::error!("Crossfader: {}", e);
    }
    if let Err(e) = right.set_master_gain(right_gain) {
        log::error!("Crossfader: {}", e);
    }
    (left_gain, right_gain)
}
