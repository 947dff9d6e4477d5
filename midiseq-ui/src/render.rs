//! Text rendering of the editor viewport, one row per semitone.

use std::fmt::Write;

use midiseq_core::screen_scale::NoteScreenScale;
use midiseq_core::sequencer::MidiSequencer;
use midiseq_types::pitch::{self, SEMITONE};

const LABEL_WIDTH: usize = 4;

/// Draw the visible notes of the current track into a `columns` wide grid.
///
/// Selected notes are `#`, others `=`, the cursor cell is `+` (or `@` on a
/// note), and every quarter gets a `.` in empty cells.
pub fn render_viewport(seq: &MidiSequencer, columns: usize) -> String {
    let ctx = &seq.context;
    let rows = ((ctx.pitch_hi() - ctx.pitch_low()) / SEMITONE).round() as usize + 1;
    let scale = NoteScreenScale::new(ctx, columns as f32, rows as f32, 0.0, 0.0);
    let row_of = |cv: f32| -> Option<usize> {
        // pitch_to_y is the row's top edge, so this is the row number.
        let row = (scale.pitch_to_y(cv) / scale.note_height()).round() as i64;
        (0..rows as i64).contains(&row).then_some(row as usize)
    };
    let col_of = |time: f32| -> usize {
        (scale.midi_time_to_x(time).floor().max(0.0) as usize).min(columns - 1)
    };

    let mut grid = vec![vec![' '; columns]; rows];
    for row in grid.iter_mut() {
        let mut q = ctx.start_time().ceil();
        while q < ctx.end_time() {
            row[col_of(q)] = '.';
            q += 1.0;
        }
    }

    seq.with_track(|track| {
        for (id, note) in ctx.get_events(track) {
            let Some(row) = row_of(note.pitch_cv) else { continue };
            let Some((x0, x1)) = scale.midi_time_to_h_bounds(note.start_time, note.end_time()) else {
                continue;
            };
            let glyph = if seq.selection.is_selected(id) { '#' } else { '=' };
            let first = (x0.floor().max(0.0) as usize).min(columns - 1);
            let last = ((x1.ceil() as usize).max(first + 1)).min(columns);
            for cell in &mut grid[row][first..last] {
                *cell = glyph;
            }
        }
    });

    if let Some(row) = row_of(ctx.cursor_pitch()) {
        if ctx.cursor_in_viewport_time() {
            let cell = &mut grid[row][col_of(ctx.cursor_time())];
            *cell = if *cell == '#' || *cell == '=' { '@' } else { '+' };
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "track {}  [{:.2} .. {:.2})  cursor {:.2} {}  edit {:?}",
        ctx.track_number(),
        ctx.start_time(),
        ctx.end_time(),
        ctx.cursor_time(),
        pitch::pitch_name(ctx.cursor_pitch()),
        ctx.note_attribute,
    );
    for (i, row) in grid.iter().enumerate() {
        let cv = ctx.pitch_hi() - i as f32 * SEMITONE;
        let line: String = row.iter().collect();
        let _ = writeln!(out, "{:<width$}|{}", pitch::pitch_name(cv), line, width = LABEL_WIDTH);
    }
    out
}
