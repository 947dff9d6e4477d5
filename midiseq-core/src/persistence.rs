//! Songs on disk as SQLite files.
//!
//! One file holds every track of a song. Saving replaces the whole
//! contents inside one transaction, so a crash mid-save leaves the previous
//! song intact.

use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};

use midiseq_types::{MidiEvent, MidiSong, MidiTrack, SongTracks, TrackError};

/// Schema version written by this build.
pub const SCHEMA_VERSION: i32 = 1;

/// Highest track index a song file may use.
pub const MAX_TRACK_INDEX: usize = 1023;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tracks (
    track_index INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS events (
    track_index INTEGER NOT NULL REFERENCES tracks(track_index),
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    start_time REAL NOT NULL,
    pitch_cv REAL,
    duration REAL,
    value INTEGER,
    PRIMARY KEY (track_index, position)
);
";

const DELETE_ALL_SQL: &str = "
DELETE FROM events;
DELETE FROM tracks;
DELETE FROM schema_version;
";

#[derive(Debug)]
pub enum PersistenceError {
    Sql(rusqlite::Error),
    /// A stored track breaks a track invariant.
    InvalidTrack { index: usize, source: TrackError },
    /// The file was written by a newer schema.
    UnsupportedVersion(i32),
    /// An event row with a kind this build does not know.
    UnknownEventKind(String),
    /// A track index that is negative or past [`MAX_TRACK_INDEX`].
    InvalidTrackIndex(i64),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Sql(e) => write!(f, "SQLite error: {}", e),
            PersistenceError::InvalidTrack { index, source } => {
                write!(f, "track {} is invalid: {}", index, source)
            }
            PersistenceError::UnsupportedVersion(v) => write!(
                f,
                "song schema version {} is newer than supported ({})",
                v, SCHEMA_VERSION
            ),
            PersistenceError::UnknownEventKind(kind) => write!(f, "unknown event kind {:?}", kind),
            PersistenceError::InvalidTrackIndex(index) => {
                write!(f, "track index {} out of range 0..={}", index, MAX_TRACK_INDEX)
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Sql(e) => Some(e),
            PersistenceError::InvalidTrack { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Sql(e)
    }
}

/// Write every track of `song` to `path`, replacing what was there.
pub fn save_song(path: &Path, song: &MidiSong) -> Result<(), PersistenceError> {
    let tracks = song.snapshot();

    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute_batch(DELETE_ALL_SQL)?;
    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        params![SCHEMA_VERSION],
    )?;
    for (index, track) in tracks.iter() {
        save_track(&tx, index, track)?;
    }
    tx.commit()?;

    log::info!(
        target: "persistence",
        "saved {} track(s) to {}",
        tracks.iter().count(),
        path.display()
    );
    Ok(())
}

fn save_track(conn: &Connection, index: usize, track: &MidiTrack) -> Result<(), PersistenceError> {
    conn.execute(
        "INSERT INTO tracks (track_index) VALUES (?1)",
        params![index as i64],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO events (track_index, position, kind, start_time, pitch_cv, duration, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, (_, event)) in track.iter().enumerate() {
        let (kind, pitch_cv, duration, value) = match event {
            MidiEvent::Note(n) => ("note", Some(n.pitch_cv as f64), Some(n.duration as f64), None),
            MidiEvent::End(_) => ("end", None, None, None),
            MidiEvent::Test(t) => ("test", None, None, Some(t.value)),
        };
        stmt.execute(params![
            index as i64,
            position as i64,
            kind,
            event.start_time() as f64,
            pitch_cv,
            duration,
            value,
        ])?;
    }
    Ok(())
}

/// Read a song saved by [`save_song`]. Every track is validated.
pub fn load_song(path: &Path) -> Result<MidiSong, PersistenceError> {
    // Read-write without CREATE: a missing file is an error, and WAL files
    // can still be opened.
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;

    let version: i32 = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    if version > SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }

    let mut tracks = SongTracks::new();
    {
        let mut stmt = conn.prepare("SELECT track_index FROM tracks ORDER BY track_index")?;
        let indices = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        for index in indices {
            tracks.set_track(track_index(index?)?, MidiTrack::new());
        }
    }

    let mut stmt = conn.prepare(
        "SELECT track_index, kind, start_time, pitch_cv, duration, value
         FROM events ORDER BY track_index, position",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let index = track_index(row.get(0)?)?;
        let kind: String = row.get(1)?;
        let start_time = row.get::<_, f64>(2)? as f32;
        let event = match kind.as_str() {
            "note" => MidiEvent::note(
                start_time,
                row.get::<_, f64>(3)? as f32,
                row.get::<_, f64>(4)? as f32,
            ),
            "end" => MidiEvent::end(start_time),
            "test" => MidiEvent::test(start_time, row.get(5)?),
            _ => return Err(PersistenceError::UnknownEventKind(kind)),
        };
        match tracks.track_mut(index) {
            Some(track) => {
                track.insert_event(event);
            }
            None => {
                let mut track = MidiTrack::new();
                track.insert_event(event);
                tracks.set_track(index, track);
            }
        }
    }

    for (index, track) in tracks.iter() {
        track
            .validate()
            .map_err(|source| PersistenceError::InvalidTrack { index, source })?;
    }

    log::info!(
        target: "persistence",
        "loaded {} track(s) from {}",
        tracks.iter().count(),
        path.display()
    );
    Ok(MidiSong::from_tracks(tracks))
}

fn track_index(raw: i64) -> Result<usize, PersistenceError> {
    usize::try_from(raw)
        .ok()
        .filter(|&index| index <= MAX_TRACK_INDEX)
        .ok_or(PersistenceError::InvalidTrackIndex(raw))
}
