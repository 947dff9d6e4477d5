//! Pitch and control-voltage conversions.
//!
//! Pitches are carried as VCV-style control voltage: one volt per octave,
//! with 0V at C4. Every conversion between CV, octave/semitone pairs and
//! absolute semitone numbers goes through these helpers.

/// One semitone expressed in volts.
pub const SEMITONE: f32 = 1.0 / 12.0;

/// One octave expressed in volts.
pub const OCTAVE: f32 = 1.0;

/// Octave number that sits at 0V.
const CV_ZERO_OCTAVE: i32 = 4;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert an octave and a semitone within it to CV. `pitch_to_cv(4, 0)` is 0V.
pub fn pitch_to_cv(octave: i32, semi: i32) -> f32 {
    (octave - CV_ZERO_OCTAVE) as f32 + semi as f32 * SEMITONE
}

/// Split a CV into `(octave, semitone)`, rounding to the nearest semitone.
pub fn cv_to_pitch(cv: f32) -> (i32, i32) {
    let floor = cv.floor();
    let mut octave = floor as i32;
    let mut semi = ((cv - floor) * 12.0).round() as i32;
    if semi >= 12 {
        semi -= 12;
        octave += 1;
    }
    (octave + CV_ZERO_OCTAVE, semi)
}

/// Absolute semitone number of the nearest semitone (C4 = 48).
pub fn cv_to_semitone(cv: f32) -> i32 {
    let (octave, semi) = cv_to_pitch(cv);
    octave * 12 + semi
}

/// Inverse of [`cv_to_semitone`].
pub fn semitone_to_cv(semitone: i32) -> f32 {
    pitch_to_cv(semitone.div_euclid(12), semitone.rem_euclid(12))
}

/// Snap a CV onto the nearest semitone.
pub fn quantize_to_semitone(cv: f32) -> f32 {
    semitone_to_cv(cv_to_semitone(cv))
}

/// Human readable name such as `"C#3"`.
pub fn pitch_name(cv: f32) -> String {
    let (octave, semi) = cv_to_pitch(cv);
    format!("{}{}", NOTE_NAMES[semi as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c4_is_zero_volts() {
        assert_eq!(pitch_to_cv(4, 0), 0.0);
        assert_eq!(cv_to_pitch(0.0), (4, 0));
        assert_eq!(cv_to_semitone(0.0), 48);
    }

    #[test]
    fn octaves_are_one_volt_apart() {
        assert_eq!(pitch_to_cv(3, 0), -1.0);
        assert_eq!(pitch_to_cv(5, 0), 1.0);
        assert_eq!(cv_to_pitch(-1.0), (3, 0));
    }

    #[test]
    fn round_trip_every_semitone_in_range() {
        for octave in 0..9 {
            for semi in 0..12 {
                let cv = pitch_to_cv(octave, semi);
                assert_eq!(cv_to_pitch(cv), (octave, semi));
                assert_eq!(cv_to_semitone(cv), octave * 12 + semi);
            }
        }
    }

    #[test]
    fn small_offsets_quantize_to_same_semitone() {
        for semi in -24..24 {
            let v = semitone_to_cv(48 + semi);
            let base = cv_to_semitone(v);
            for eps in [0.9 * SEMITONE / 4.0, -0.9 * SEMITONE / 4.0, SEMITONE / 8.0] {
                assert_eq!(cv_to_semitone(v + eps), base);
            }
        }
    }

    #[test]
    fn past_half_semitone_flips_to_neighbour() {
        let v = pitch_to_cv(4, 5);
        assert_eq!(cv_to_semitone(v + 0.6 * SEMITONE), cv_to_semitone(v) + 1);
        assert_eq!(cv_to_semitone(v - 0.6 * SEMITONE), cv_to_semitone(v) - 1);
    }

    #[test]
    fn top_of_octave_carries() {
        // B3 plus a bit more than half a semitone lands on C4
        let cv = pitch_to_cv(3, 11) + 0.7 * SEMITONE;
        assert_eq!(cv_to_pitch(cv), (4, 0));
    }

    #[test]
    fn negative_semitones_convert_back() {
        assert_eq!(semitone_to_cv(47), pitch_to_cv(3, 11));
        assert!((quantize_to_semitone(0.01) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn names() {
        assert_eq!(pitch_name(0.0), "C4");
        assert_eq!(pitch_name(pitch_to_cv(3, 1)), "C#3");
    }
}
