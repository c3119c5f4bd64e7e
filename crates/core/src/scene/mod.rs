//! The demo's drawing routines, one [`Scene`] each.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    assets::SceneAssets,
    backend::Backend,
    geometry::{Color, Point, Rect},
    render::{BlendMode, Flip, Renderer},
    video::{blit_surface, AsSurface, Window},
    Result, SdlError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scene {
    /// White background with a green square, filled on the window surface.
    SurfaceRect,
    /// Image decoded by `IMG_Load`, blitted onto the window surface.
    SurfaceImage,
    /// BMP loaded by `SDL_LoadBMP`, blitted onto the window surface.
    SurfaceBmp,
    /// Blended text blitted onto the window surface.
    SurfaceText,
    /// Two translucent rectangles over a white background.
    Rects,
    /// An orange polyline.
    Lines,
    /// The BMP as a texture at its natural size.
    Bmp,
    /// The BMP at half scale, rotated 45 degrees and mirrored horizontally.
    BmpTransformed,
    /// The BMP drawn inside a 300x260 viewport.
    #[default]
    BmpViewport,
}

/// What a scene needs loaded before its first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetNeed {
    /// Any format SDL_image decodes.
    Image,
    Bmp,
    Font,
}

pub const TEXT: &str = "Hatsune Miku";
const TEXT_ORIGIN: Point = Point::new(30, 30);
const VIEWPORT: Rect = Rect::new(0, 0, 300, 260);

impl Scene {
    pub const ALL: [Scene; 9] = [
        Scene::SurfaceRect,
        Scene::SurfaceImage,
        Scene::SurfaceBmp,
        Scene::SurfaceText,
        Scene::Rects,
        Scene::Lines,
        Scene::Bmp,
        Scene::BmpTransformed,
        Scene::BmpViewport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scene::SurfaceRect => "surface-rect",
            Scene::SurfaceImage => "surface-image",
            Scene::SurfaceBmp => "surface-bmp",
            Scene::SurfaceText => "surface-text",
            Scene::Rects => "rects",
            Scene::Lines => "lines",
            Scene::Bmp => "bmp",
            Scene::BmpTransformed => "bmp-transformed",
            Scene::BmpViewport => "bmp-viewport",
        }
    }

    /// Renderer scenes draw through a [`Renderer`]; the others write to the
    /// window surface.
    pub fn uses_renderer(self) -> bool {
        !matches!(
            self,
            Scene::SurfaceRect | Scene::SurfaceImage | Scene::SurfaceBmp | Scene::SurfaceText
        )
    }

    pub fn asset(self) -> Option<AssetNeed> {
        match self {
            Scene::SurfaceRect | Scene::Rects | Scene::Lines => None,
            Scene::SurfaceImage => Some(AssetNeed::Image),
            Scene::SurfaceText => Some(AssetNeed::Font),
            Scene::SurfaceBmp | Scene::Bmp | Scene::BmpTransformed | Scene::BmpViewport => {
                Some(AssetNeed::Bmp)
            }
        }
    }

    /// Draws one frame of a window-surface scene and pushes it to the screen.
    pub fn draw_surface<B: Backend>(self, window: &Window<'_, B>, assets: &SceneAssets<'_, B>) -> Result<()> {
        let mut target = window.surface()?;
        match self {
            Scene::SurfaceRect => {
                let bounds = target.info()?.bounds();
                target.fill_rect(Some(bounds), Color::WHITE.to_argb())?;
                target.fill_rect(Some(Rect::new(10, 10, 30, 30)), Color::rgb(0, 255, 0).to_argb())?;
            }
            Scene::SurfaceImage | Scene::SurfaceBmp => {
                let source = match self {
                    Scene::SurfaceImage => assets.image(self)?,
                    _ => assets.bmp(self)?,
                };
                let rect = source.info()?.bounds();
                blit_surface(source, Some(rect), &mut target, Some(rect))?;
            }
            Scene::SurfaceText => {
                let text = assets.font(self)?.render_utf8_blended(TEXT, Color::WHITE)?;
                let size = text.info()?.bounds();
                let at = Rect::new(TEXT_ORIGIN.x, TEXT_ORIGIN.y, size.w, size.h);
                blit_surface(&text, Some(size), &mut target, Some(at))?;
            }
            _ => return Err(self.wrong_target("a renderer")),
        }

        window.update_surface()
    }

    /// Draws and presents one frame of a renderer scene.
    pub fn draw_renderer<B: Backend>(self, renderer: &Renderer<'_, B>, assets: &SceneAssets<'_, B>) -> Result<()> {
        if !self.uses_renderer() {
            return Err(self.wrong_target("the window surface"));
        }

        renderer.set_draw_color(Color::WHITE)?;
        renderer.clear()?;

        match self {
            Scene::Rects => {
                renderer.set_draw_blend_mode(BlendMode::Blend)?;
                renderer.set_draw_color(Color::rgba(57, 197, 187, 100))?;
                renderer.fill_rect(Some(Rect::new(0, 0, 100, 100)))?;
                renderer.set_draw_color(Color::rgba(198, 53, 63, 155))?;
                renderer.fill_rect(Some(Rect::new(50, 50, 100, 100)))?;
            }
            Scene::Lines => {
                renderer.set_draw_color(Color::rgb(255, 128, 0))?;
                renderer.draw_lines(&[Point::new(50, 50), Point::new(200, 200), Point::new(300, 400)])?;
            }
            Scene::Bmp => {
                let texture = assets.texture(self)?;
                let rect = texture.query()?.bounds();
                renderer.copy(texture, None, Some(rect))?;
            }
            Scene::BmpTransformed => {
                let texture = assets.texture(self)?;
                let rect = texture.query()?.bounds();
                renderer.set_scale(0.5, 0.5)?;
                renderer.copy_ex(texture, None, Some(rect), 45.0, None, Flip::HORIZONTAL)?;
            }
            Scene::BmpViewport => {
                let texture = assets.texture(self)?;
                let rect = texture.query()?.bounds();
                renderer.set_viewport(Some(VIEWPORT))?;
                renderer.copy(texture, None, Some(rect))?;
            }
            _ => return Err(self.wrong_target("the window surface")),
        }

        renderer.present();
        Ok(())
    }

    fn wrong_target(self, needed: &str) -> SdlError {
        SdlError::msg(format!("scene {self} draws through {needed}"))
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scene {
    type Err = SdlError;

    fn from_str(s: &str) -> Result<Self> {
        Scene::ALL
            .into_iter()
            .find(|scene| scene.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Scene::ALL.iter().map(|scene| scene.name()).collect();
                SdlError::InvalidArgument(format!(
                    "unknown scene `{s}`, expected one of: {}",
                    names.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{headless::DrawCommand, HeadlessBackend},
        guard::{CoreGuard, InitFlags},
        render::{RendererFlags, Texture},
        video::{Surface, WindowSpec},
    };

    fn bmp_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("cat.bmp");
        image::RgbImage::from_pixel(40, 20, image::Rgb([9, 8, 7]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for scene in Scene::ALL {
            assert_eq!(scene.name().parse::<Scene>().unwrap(), scene);
        }
        let err = "kaleidoscope".parse::<Scene>().unwrap_err();
        assert!(err.to_string().contains("bmp-viewport"));
        assert_eq!(Scene::default(), Scene::BmpViewport);
    }

    #[test]
    fn serde_uses_the_cli_names() {
        let scene: Scene = serde_json::from_str("\"bmp-transformed\"").unwrap();
        assert_eq!(scene, Scene::BmpTransformed);
        assert_eq!(serde_json::to_string(&Scene::SurfaceText).unwrap(), "\"surface-text\"");
    }

    #[test]
    fn surface_rect_fills_the_window_surface() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let assets = SceneAssets::new();

        Scene::SurfaceRect.draw_surface(&window, &assets).unwrap();

        let surface = window.surface().unwrap().raw();
        assert_eq!(backend.pixel(surface, 599, 479), Some(0xffffffff));
        assert_eq!(backend.pixel(surface, 10, 10), Some(0xff00ff00));
        assert_eq!(backend.pixel(surface, 40, 40), Some(0xffffffff));
        assert_eq!(backend.window_updates(window.raw().unwrap()), 1);
    }

    #[test]
    fn surface_bmp_blits_the_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let mut assets = SceneAssets::new();
        assets.bmp = Some(Surface::load_bmp(&core, bmp_file(&dir)).unwrap());

        Scene::SurfaceBmp.draw_surface(&window, &assets).unwrap();

        let surface = window.surface().unwrap().raw();
        assert_eq!(backend.pixel(surface, 39, 19), Some(0xff090807));
        assert_eq!(backend.pixel(surface, 40, 20), Some(0));
    }

    #[test]
    fn rects_scene_records_blended_fills() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();

        Scene::Rects.draw_renderer(&renderer, &SceneAssets::new()).unwrap();

        assert_eq!(
            backend.draw_log(renderer.raw().unwrap()),
            vec![
                DrawCommand::SetColor(Color::WHITE),
                DrawCommand::Clear,
                DrawCommand::SetBlendMode(BlendMode::Blend),
                DrawCommand::SetColor(Color::rgba(57, 197, 187, 100)),
                DrawCommand::FillRect(Some(Rect::new(0, 0, 100, 100))),
                DrawCommand::SetColor(Color::rgba(198, 53, 63, 155)),
                DrawCommand::FillRect(Some(Rect::new(50, 50, 100, 100))),
                DrawCommand::Present,
            ]
        );
    }

    #[test]
    fn viewport_scene_copies_the_texture_at_its_size() {
        let dir = tempfile::tempdir().unwrap();
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();
        let bmp = Surface::load_bmp(&core, bmp_file(&dir)).unwrap();
        let mut assets = SceneAssets::new();
        assets.texture = Some(Texture::from_surface(&renderer, &bmp).unwrap());

        Scene::BmpViewport.draw_renderer(&renderer, &assets).unwrap();

        let log = backend.draw_log(renderer.raw().unwrap());
        assert!(log.contains(&DrawCommand::SetViewport(Some(VIEWPORT))));
        assert!(log.iter().any(|command| matches!(
            command,
            DrawCommand::Copy { dst: Some(rect), .. } if *rect == Rect::sized(40, 20)
        )));
        assert_eq!(backend.presented(renderer.raw().unwrap()), 1);
    }

    #[test]
    fn missing_asset_is_reported_with_the_scene_name() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();

        let err = Scene::BmpTransformed
            .draw_renderer(&renderer, &SceneAssets::new())
            .unwrap_err();
        assert!(matches!(err, SdlError::Message(_)));
        assert!(err.to_string().contains("bmp-transformed"));
    }

    #[test]
    fn scenes_refuse_the_wrong_target() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();

        assert!(Scene::Lines
            .draw_surface(&window, &SceneAssets::new())
            .is_err());
    }
}
