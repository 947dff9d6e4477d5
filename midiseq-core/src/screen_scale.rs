//! Mapping between viewport coordinates (time, pitch CV) and screen pixels.

use midiseq_types::pitch::SEMITONE;

use crate::context::MidiEditorContext;

/// Pixel mapping for one viewport and one screen rectangle.
///
/// X grows with time from the left margin. Y grows downward, so the highest
/// pitch in the band sits at the top margin. Each pitch row is one semitone
/// tall and the band reserves a row for `pitch_hi` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteScreenScale {
    ax: f32,
    bx: f32,
    ay: f32,
    by: f32,
    start_time: f32,
    end_time: f32,
}

impl NoteScreenScale {
    pub fn new(
        context: &MidiEditorContext,
        screen_width: f32,
        screen_height: f32,
        h_margin: f32,
        top_margin: f32,
    ) -> Self {
        let time_width = context.end_time() - context.start_time();
        let pitch_height = context.pitch_hi() - context.pitch_low() + SEMITONE;
        let drawable_width = screen_width - 2.0 * h_margin;
        let drawable_height = screen_height - top_margin;
        assert!(time_width > 0.0, "empty viewport");
        assert!(
            drawable_width > 0.0 && drawable_height > 0.0,
            "margins leave no room to draw"
        );

        let ax = drawable_width / time_width;
        let bx = h_margin - ax * context.start_time();
        let ay = -drawable_height / pitch_height;
        let by = top_margin - ay * (context.pitch_hi() + SEMITONE);
        Self {
            ax,
            bx,
            ay,
            by,
            start_time: context.start_time(),
            end_time: context.end_time(),
        }
    }

    pub fn midi_time_to_x(&self, time: f32) -> f32 {
        self.ax * time + self.bx
    }

    pub fn x_to_midi_time(&self, x: f32) -> f32 {
        (x - self.bx) / self.ax
    }

    /// Width in pixels of a span of `duration` quarter notes.
    pub fn midi_time_to_dx(&self, duration: f32) -> f32 {
        self.ax * duration
    }

    /// Top edge of the row for `pitch_cv`.
    pub fn pitch_to_y(&self, pitch_cv: f32) -> f32 {
        self.ay * (pitch_cv + SEMITONE) + self.by
    }

    pub fn y_to_pitch(&self, y: f32) -> f32 {
        (y - self.by) / self.ay - SEMITONE
    }

    pub fn note_height(&self) -> f32 {
        -self.ay * SEMITONE
    }

    /// Horizontal pixel extent of `[start, end)` clipped to the viewport.
    ///
    /// Returns `None` when nothing of the span is visible.
    pub fn midi_time_to_h_bounds(&self, start: f32, end: f32) -> Option<(f32, f32)> {
        let start = start.max(self.start_time);
        let end = end.min(self.end_time);
        if start >= end {
            return None;
        }
        Some((self.midi_time_to_x(start), self.midi_time_to_x(end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn scale() -> NoteScreenScale {
        let mut ctx = MidiEditorContext::new();
        ctx.set_time_range(0.0, 8.0);
        ctx.set_pitch_range(0.0, 1.0);
        NoteScreenScale::new(&ctx, 820.0, 1300.0, 10.0, 0.0)
    }

    #[test]
    fn time_maps_across_width() {
        let s = scale();
        assert!(approx(s.midi_time_to_x(0.0), 10.0));
        assert!(approx(s.midi_time_to_x(8.0), 810.0));
        assert!(approx(s.midi_time_to_dx(1.0), 100.0));
        assert!(approx(s.x_to_midi_time(410.0), 4.0));
    }

    #[test]
    fn pitch_grows_upward() {
        let s = scale();
        // 13 rows of 100 px each.
        assert!(approx(s.note_height(), 100.0));
        assert!(approx(s.pitch_to_y(1.0), 0.0));
        assert!(approx(s.pitch_to_y(0.0), 1200.0));
        assert!(s.pitch_to_y(0.5) < s.pitch_to_y(0.25));
        assert!(approx(s.y_to_pitch(s.pitch_to_y(0.5)), 0.5));
    }

    #[test]
    fn h_bounds_clip_to_viewport() {
        let s = scale();
        let (x0, x1) = s.midi_time_to_h_bounds(-1.0, 2.0).unwrap();
        assert!(approx(x0, 10.0));
        assert!(approx(x1, 210.0));
        assert!(s.midi_time_to_h_bounds(8.0, 9.0).is_none());
    }
}
