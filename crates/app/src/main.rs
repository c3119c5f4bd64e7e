use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use sdl_scoped_core::{run_demo, DemoConfig, Event, HeadlessBackend, Result, Scene};
use tracing_subscriber::EnvFilter;

/// Frame cap used in headless mode when `--frames` is not given.
const HEADLESS_FRAMES: u64 = 120;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    tracing::info!(scene = %config.scene, headless = cli.headless, "starting demo");

    if cli.headless {
        run_headless(cli, &config)
    } else {
        run_native(cli, &config)
    }
}

fn load_config(cli: &Cli) -> Result<DemoConfig> {
    let mut config = match &cli.config {
        Some(path) => DemoConfig::from_json_file(path)?,
        None => DemoConfig::default(),
    };

    if let Some(scene) = cli.scene {
        config.scene = scene;
    }
    if let Some(image) = &cli.image {
        config.assets.image = image.clone();
    }
    if let Some(audio) = &cli.audio {
        config.assets.audio = Some(audio.clone());
    }
    if cli.no_audio {
        config.assets.audio = None;
    }
    config.validate()?;
    Ok(config)
}

fn run_headless(cli: &Cli, config: &DemoConfig) -> Result<()> {
    let backend = HeadlessBackend::new();
    if let Some(path) = &cli.events {
        let events: Vec<Event> = serde_json::from_str(&fs::read_to_string(path)?)?;
        tracing::info!(count = events.len(), path = %path.display(), "queued scripted events");
        backend.push_events(events);
    }

    let stats = run_demo(&backend, config, Some(cli.frames.unwrap_or(HEADLESS_FRAMES)))?;
    let leaked = backend.live_total();
    if leaked > 0 {
        tracing::warn!(leaked, "handles still alive after the demo");
    }
    tracing::info!(frames = stats.frames, quit = stats.quit, "headless run complete");
    Ok(())
}

#[cfg(feature = "sdl")]
fn run_native(cli: &Cli, config: &DemoConfig) -> Result<()> {
    let backend = sdl_scoped_core::SdlBackend::new()?;
    run_demo(&backend, config, cli.frames)?;
    Ok(())
}

#[cfg(not(feature = "sdl"))]
fn run_native(cli: &Cli, config: &DemoConfig) -> Result<()> {
    tracing::warn!("built without the `sdl` feature, running headless");
    run_headless(cli, config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scoped SDL2 resource demo", long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene to draw, e.g. `rects` or `bmp-viewport`.
    #[arg(short, long)]
    scene: Option<Scene>,

    /// Run without a display against the in-memory backend.
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames. Headless runs default to 120.
    #[arg(long)]
    frames: Option<u64>,

    /// Image loaded by the image and bitmap scenes.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Sound played on a loop.
    #[arg(long, conflicts_with = "no_audio")]
    audio: Option<PathBuf>,

    /// Keep the audio device closed.
    #[arg(long)]
    no_audio: bool,

    /// JSON list of input events fed to the headless backend.
    #[arg(long, requires = "headless")]
    events: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config() {
        let cli = Cli::try_parse_from([
            "sdl-scoped-demo",
            "--scene",
            "lines",
            "--image",
            "dog.bmp",
            "--no-audio",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.scene, Scene::Lines);
        assert_eq!(config.assets.image, PathBuf::from("dog.bmp"));
        assert_eq!(config.assets.audio, None);
    }

    #[test]
    fn unknown_scene_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["sdl-scoped-demo", "--scene", "tunnel"]).is_err());
    }

    #[test]
    fn audio_flags_conflict() {
        let parsed = Cli::try_parse_from(["sdl-scoped-demo", "--audio", "a.ogg", "--no-audio"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn headless_run_stops_on_scripted_quit() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.json");
        fs::write(&events, r#"[{"type":"key_down","keycode":27},{"type":"quit"}]"#).unwrap();

        let cli = Cli::try_parse_from([
            "sdl-scoped-demo",
            "--headless",
            "--scene",
            "surface-rect",
            "--no-audio",
            "--events",
            events.to_str().unwrap(),
        ])
        .unwrap();

        assert!(run(&cli).is_ok());
    }
}
