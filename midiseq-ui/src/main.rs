mod keys;
mod render;
mod session;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use midiseq_core::config::Config;
use midiseq_core::interaction_log::{self, InteractionLog};
use midiseq_core::persistence;
use midiseq_types::MidiSong;

use session::{LineOutcome, Session};

const VIEW_COLUMNS: usize = 64;

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("midiseq")
        .join("midiseq.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/midiseq.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            return;
        }
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("logging disabled: logger already set");
        return;
    }

    log::info!("midiseq starting (log level: {:?})", log_level);
}

fn arg_value(args: &[String], flag: &str) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let config = Config::load();
    let editor_settings = config.editor();
    let player_settings = config.player();

    let load_path = arg_value(&args, "--load");
    let song = match &load_path {
        Some(path) => match persistence::load_song(path) {
            Ok(song) => song,
            Err(e) => {
                eprintln!("could not load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => MidiSong::new(),
    };

    let mut session = Session::new(song, &editor_settings, &player_settings);
    if let Some(path) = arg_value(&args, "--save").or(load_path) {
        session = session.with_save_path(path);
    }
    if let Some(log) = InteractionLog::actions(player_settings.track) {
        session = session.with_log(log);
    } else {
        log::warn!(
            "could not open action log in {}",
            interaction_log::log_dir().display()
        );
    }

    if args.iter().any(|a| a == "--play") {
        session.handle_line(":play");
    }

    let input: Box<dyn BufRead> = match arg_value(&args, "--script") {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut out = io::stdout().lock();
    write!(out, "{}", render::render_viewport(session.sequencer(), VIEW_COLUMNS))?;
    for line in input.lines() {
        match session.handle_line(&line?) {
            LineOutcome::Quit => break,
            LineOutcome::Redraw => {
                write!(out, "{}", render::render_viewport(session.sequencer(), VIEW_COLUMNS))?;
            }
            LineOutcome::Message(msg) if !msg.is_empty() => writeln!(out, "{}", msg)?,
            LineOutcome::Message(_) => {}
        }
        out.flush()?;
    }

    session.close();
    log::info!("midiseq exiting");
    Ok(())
}
