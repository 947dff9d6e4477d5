//! Metric time helpers. Time is measured in quarter notes.

/// Quarter notes per bar (4/4 only).
pub const QUARTERS_PER_BAR: f32 = 4.0;

/// Editing unit: a sixteenth note.
pub const QUARTERS_PER_UNIT: f32 = 0.25;

pub fn bar_to_time(bars: f32) -> f32 {
    bars * QUARTERS_PER_BAR
}

pub fn time_to_bar(time: f32) -> f32 {
    time / QUARTERS_PER_BAR
}

/// Length in quarter notes of `units` sixteenth notes.
pub fn units_to_time(units: i32) -> f32 {
    units as f32 * QUARTERS_PER_UNIT
}

/// Track length needed to hold material ending at `needed`.
///
/// The result is the smallest multiple of two bars that leaves at least one
/// full bar after `needed`. Saved songs depend on this exact rounding.
pub fn extended_track_length(needed: f32) -> f32 {
    let two_bars = bar_to_time(2.0);
    ((needed + bar_to_time(1.0)) / two_bars).ceil() * two_bars
}
