//! The demo driver: opens everything the configured scene needs, loops a
//! background sound, and renders until the window is closed.

use tracing::{info, warn};

use crate::{
    assets::SceneAssets,
    backend::Backend,
    config::DemoConfig,
    frame::{FrameLoop, FrameStats},
    guard::{CoreGuard, InitFlags},
    mixer::{AudioChunk, AudioDevice, MixerFlags, MixerGuard, RwStream},
    render::{Renderer, RendererFlags},
    ttf::TtfGuard,
    video::Window,
    Result,
};

/// Runs the demo on `backend` until a quit event, or until `max_frames`
/// frames were rendered. Every handle and guard is released on return,
/// successful or not, in reverse order of acquisition.
pub fn run_demo<B: Backend>(backend: &B, config: &DemoConfig, max_frames: Option<u64>) -> Result<FrameStats> {
    config.validate()?;
    let scene = config.scene;
    let frames = FrameLoop::new(config.frame_rate)?.with_frame_cap(max_frames);

    let core = CoreGuard::init(backend, InitFlags::VIDEO | InitFlags::AUDIO)?;
    let ttf = TtfGuard::init(&core)?;
    let mixer = MixerGuard::init(&core, MixerFlags::empty())?;

    let window = Window::new(&core, &config.window_spec())?;
    let renderer = if scene.uses_renderer() {
        Some(Renderer::new(&window, None, RendererFlags::ACCELERATED)?)
    } else {
        None
    };
    let assets = SceneAssets::load(scene, &core, &ttf, renderer.as_ref(), &config.assets)?;

    let device = match config.assets.audio {
        Some(_) => Some(AudioDevice::open(&mixer, config.audio)?),
        None => None,
    };
    let _music = match (&device, &config.assets.audio) {
        (Some(device), Some(path)) => {
            let stream = RwStream::from_file(&core, path, "rb")?;
            let chunk = AudioChunk::load(device, stream)?;
            let channel = chunk.play(None, -1)?;
            info!(path = %path.display(), channel, "looping background sound");
            Some(chunk)
        }
        _ => None,
    };

    info!(%scene, budget_ms = frames.budget_ms(), "entering frame loop");
    let stats = frames.run(&core, |_| match &renderer {
        Some(renderer) => scene.draw_renderer(renderer, &assets),
        None => scene.draw_surface(&window, &assets),
    })?;

    if !stats.quit && max_frames.is_none() {
        warn!("frame loop ended without a quit event");
    }
    info!(frames = stats.frames, events = stats.events, "demo finished");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        backend::{HeadlessBackend, ResourceKind},
        config::{AssetConfig, FontConfig},
        event::Event,
        scene::Scene,
        SdlError,
    };

    fn fixture(dir: &Path) -> DemoConfig {
        let image = dir.join("cat.bmp");
        image::RgbImage::from_pixel(64, 48, image::Rgb([200, 100, 50]))
            .save(&image)
            .unwrap();
        let audio = dir.join("test.ogg");
        std::fs::write(&audio, vec![1u8; 2048]).unwrap();
        let font = dir.join("font.ttf");
        std::fs::write(&font, b"font").unwrap();

        DemoConfig {
            assets: AssetConfig {
                image,
                audio: Some(audio),
                font: Some(FontConfig {
                    path: font,
                    point_size: 20,
                }),
            },
            ..DemoConfig::default()
        }
    }

    #[test]
    fn scripted_quit_ends_the_demo_and_releases_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let backend = HeadlessBackend::new();
        backend.push_events([
            Event::MouseMotion { x: 5, y: 5 },
            Event::KeyDown { keycode: 27 },
            Event::Quit,
        ]);

        let stats = run_demo(&backend, &config, None).unwrap();

        assert!(stats.quit);
        assert_eq!(stats.events, 3);
        assert_eq!(backend.live_total(), 0);
        assert!(backend.invalid_releases().is_empty());
        assert_eq!(backend.released(ResourceKind::Chunk), 1);
        assert_eq!(backend.released(ResourceKind::Stream), 1);
        assert_eq!(backend.released(ResourceKind::Renderer), 1);
        assert!(backend.initialised().is_empty());
        assert!(!backend.ttf_active());
        assert!(!backend.mixer_active());
        assert_eq!(backend.audio_spec(), None);
    }

    #[test]
    fn every_scene_renders_with_a_frame_cap() {
        let dir = tempfile::tempdir().unwrap();
        for scene in Scene::ALL {
            let config = DemoConfig {
                scene,
                ..fixture(dir.path())
            };
            let backend = HeadlessBackend::new();

            let stats = run_demo(&backend, &config, Some(3)).unwrap();

            assert_eq!(stats.frames, 3, "{scene}");
            assert_eq!(backend.live_total(), 0, "{scene}");
            assert!(backend.invalid_releases().is_empty(), "{scene}");
            assert_eq!(backend.created(ResourceKind::Renderer), usize::from(scene.uses_renderer()));
        }
    }

    #[test]
    fn missing_audio_file_unwinds_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture(dir.path());
        config.assets.audio = Some(dir.path().join("missing.ogg"));
        let backend = HeadlessBackend::new();

        let err = run_demo(&backend, &config, Some(1)).unwrap_err();

        assert_eq!(err.call(), Some("SDL_RWFromFile"));
        assert_eq!(backend.live_total(), 0);
        assert!(backend.invalid_releases().is_empty());
        assert!(backend.initialised().is_empty());
    }

    #[test]
    fn native_failure_mid_loop_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let config = DemoConfig {
            scene: Scene::Lines,
            ..fixture(dir.path())
        };
        let backend = HeadlessBackend::new();
        backend.fail_next("SDL_RenderDrawLines", "Renderer lost");

        let err = run_demo(&backend, &config, Some(10)).unwrap_err();

        assert!(matches!(err, SdlError::Native { call: "SDL_RenderDrawLines", .. }));
        assert_eq!(err.to_string(), "SDL_RenderDrawLines() failed, errMsg: Renderer lost");
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn audio_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixture(dir.path());
        config.assets.audio = None;
        let backend = HeadlessBackend::new();

        run_demo(&backend, &config, Some(2)).unwrap();

        assert_eq!(backend.created(ResourceKind::Chunk), 0);
        assert_eq!(backend.live_total(), 0);
    }
}
