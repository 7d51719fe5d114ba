// src/main.rs

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{self, Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use rand::seq::SliceRandom;
use tracing_subscriber::EnvFilter;

use driftwave::{EngineConfig, Player, Track, Visualizer, VisualizerKind};

const USAGE: &str = "usage: driftwave [--config FILE] [--viz NAME] [--shuffle] FILE...";

struct Args {
    config: Option<PathBuf>,
    visualizer: Option<VisualizerKind>,
    shuffle: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        visualizer: None,
        shuffle: false,
        files: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().context("--config needs a file")?;
                args.config = Some(PathBuf::from(path));
            }
            "--viz" => {
                let name = it.next().context("--viz needs a name")?;
                args.visualizer = Some(name.parse()?);
            }
            "--shuffle" => args.shuffle = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => args.files.push(PathBuf::from(arg)),
        }
    }
    if args.files.is_empty() {
        bail!("{USAGE}");
    }
    Ok(args)
}

fn init_tracing() {
    // stderr, so log lines don't tear through the visualizer on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Leaves raw mode even when the loop bails out early.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut out = io::stdout();
        queue!(out, Hide, Clear(ClearType::All))?;
        out.flush()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = queue!(out, Show, Print("\r\n"));
        let _ = out.flush();
        let _ = disable_raw_mode();
    }
}

enum Action {
    Continue,
    Next,
    Quit,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(kind) = args.visualizer {
        config.visualizer = kind;
    }

    let mut tracks: Vec<Track> = args.files.iter().map(|p| Track::from_path(p)).collect();
    if args.shuffle {
        tracks.shuffle(&mut rand::rng());
    }

    let mut viz = config.visualizer.create(config.band_count);
    let frame = Duration::from_secs_f64(1.0 / config.viz_fps as f64);

    let mut player = Player::new(config);
    player.start().context("opening audio output")?;

    let _raw = RawModeGuard::enable()?;

    'tracks: for track in &tracks {
        if let Err(e) = player.play_track(track) {
            tracing::warn!(path = %track.path.display(), "skipping track: {e}");
            continue;
        }

        loop {
            let tick = Instant::now();
            let action = poll_keys(&player, frame)?;
            match action {
                Action::Quit => break 'tracks,
                Action::Next => break,
                Action::Continue => {}
            }
            if player.is_stream_finished() {
                break;
            }

            let (rms, bands) = player.get_analysis();
            viz.update(rms, &bands);
            draw(&player, track, &*viz)?;

            if let Some(rest) = frame.checked_sub(tick.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    player.stop();
    Ok(())
}

fn poll_keys(player: &Player, budget: Duration) -> anyhow::Result<Action> {
    let deadline = Instant::now() + budget / 2;
    while event::poll(deadline.saturating_duration_since(Instant::now()))? {
        let Event::Key(ev) = event::read()? else {
            continue;
        };
        if ev.kind != KeyEventKind::Press {
            continue;
        }
        match ev.code {
            KeyCode::Char('c') if ev.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(Action::Quit);
            }
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Action::Quit),
            KeyCode::Char('n') => return Ok(Action::Next),
            KeyCode::Char(' ') => {
                player.toggle_pause();
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                player.volume_up();
            }
            KeyCode::Char('-') | KeyCode::Down => {
                player.volume_down();
            }
            _ => {}
        }
    }
    Ok(Action::Continue)
}

fn draw(player: &Player, track: &Track, viz: &dyn Visualizer) -> io::Result<()> {
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let width = (cols as usize).saturating_sub(2).max(1);
    let height = (rows as usize).saturating_sub(4).clamp(1, 12);

    let mut out = io::stdout();
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;

    let state = if player.is_playing() { "playing" } else { "paused " };
    let status = format!(
        "{state}  {}  {} / {}  vol {:>3.0}%",
        track.name,
        clock(player.position()),
        clock(player.duration()),
        player.volume() * 100.0,
    );
    queue!(out, Print(status), Print("\r\n\r\n"))?;

    for line in viz.render(width, height) {
        queue!(out, Print(' '), Print(line), Print("\r\n"))?;
    }
    queue!(out, Print("\r\n[space] pause  [+/-] volume  [n] next  [q] quit"))?;
    out.flush()
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
