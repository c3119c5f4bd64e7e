//! Assets a scene loads before the frame loop starts.

use std::fmt;

use tracing::info;

use crate::{
    backend::Backend,
    config::AssetConfig,
    guard::CoreGuard,
    img,
    render::{Renderer, Texture},
    scene::{AssetNeed, Scene},
    ttf::{Font, TtfGuard},
    video::Surface,
    Result, SdlError,
};

/// Resources a scene draws from. Every slot is optional; a scene that finds
/// its slot empty fails with a message naming the scene.
pub struct SceneAssets<'a, B: Backend> {
    pub image: Option<Surface<'a, B>>,
    pub bmp: Option<Surface<'a, B>>,
    pub font: Option<Font<'a, B>>,
    pub texture: Option<Texture<'a, B>>,
}

impl<'a, B: Backend> SceneAssets<'a, B> {
    pub fn new() -> Self {
        Self {
            image: None,
            bmp: None,
            font: None,
            texture: None,
        }
    }

    /// Loads what `scene` needs from the configured paths. Renderer scenes
    /// that draw the bitmap also get it uploaded as a texture, which needs
    /// `renderer`.
    pub fn load(
        scene: Scene,
        core: &'a CoreGuard<'_, B>,
        ttf: &'a TtfGuard<'_, B>,
        renderer: Option<&'a Renderer<'_, B>>,
        config: &AssetConfig,
    ) -> Result<Self> {
        let mut assets = Self::new();

        match scene.asset() {
            None => {}
            Some(AssetNeed::Image) => {
                info!(path = %config.image.display(), "loading image");
                assets.image = Some(img::load(core, &config.image)?);
            }
            Some(AssetNeed::Bmp) => {
                info!(path = %config.image.display(), "loading bitmap");
                let bmp = Surface::load_bmp(core, &config.image)?;
                if scene.uses_renderer() {
                    let renderer = renderer.ok_or_else(|| {
                        SdlError::msg(format!("scene {scene} needs a renderer for its texture"))
                    })?;
                    assets.texture = Some(Texture::from_surface(renderer, &bmp)?);
                }
                assets.bmp = Some(bmp);
            }
            Some(AssetNeed::Font) => {
                let font = config.font.as_ref().ok_or_else(|| {
                    SdlError::msg(format!("scene {scene} needs a font; set assets.font"))
                })?;
                info!(path = %font.path.display(), size = font.point_size, "opening font");
                assets.font = Some(Font::open(ttf, &font.path, font.point_size)?);
            }
        }

        Ok(assets)
    }

    pub fn image(&self, scene: Scene) -> Result<&Surface<'a, B>> {
        loaded(&self.image, "image", scene)
    }

    pub fn bmp(&self, scene: Scene) -> Result<&Surface<'a, B>> {
        loaded(&self.bmp, "bitmap", scene)
    }

    pub fn font(&self, scene: Scene) -> Result<&Font<'a, B>> {
        loaded(&self.font, "font", scene)
    }

    pub fn texture(&self, scene: Scene) -> Result<&Texture<'a, B>> {
        loaded(&self.texture, "texture", scene)
    }
}

impl<B: Backend> Default for SceneAssets<'_, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> fmt::Debug for SceneAssets<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneAssets")
            .field("image", &self.image)
            .field("bmp", &self.bmp)
            .field("font", &self.font)
            .field("texture", &self.texture)
            .finish()
    }
}

fn loaded<'s, T>(slot: &'s Option<T>, what: &str, scene: Scene) -> Result<&'s T> {
    slot.as_ref()
        .ok_or_else(|| SdlError::msg(format!("scene {scene} has no {what} loaded")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{HeadlessBackend, ResourceKind},
        config::FontConfig,
        guard::InitFlags,
        render::RendererFlags,
        video::{Window, WindowSpec},
    };

    fn config_with_bmp(dir: &tempfile::TempDir) -> AssetConfig {
        let image = dir.path().join("cat.bmp");
        image::RgbImage::new(16, 16).save(&image).unwrap();
        AssetConfig {
            image,
            audio: None,
            font: None,
        }
    }

    #[test]
    fn bitmap_scenes_get_a_texture() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_bmp(&dir);
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let ttf = TtfGuard::init(&core).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();

        let assets = SceneAssets::load(Scene::Bmp, &core, &ttf, Some(&renderer), &config).unwrap();
        assert!(assets.texture(Scene::Bmp).is_ok());
        assert!(assets.font(Scene::Bmp).is_err());

        drop(assets);
        assert_eq!(backend.released(ResourceKind::Texture), 1);
        assert_eq!(backend.released(ResourceKind::Surface), 1);
    }

    #[test]
    fn surface_scenes_skip_the_texture() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_bmp(&dir);
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let ttf = TtfGuard::init(&core).unwrap();

        let assets = SceneAssets::load(Scene::SurfaceBmp, &core, &ttf, None, &config).unwrap();
        assert!(assets.bmp.is_some());
        assert!(assets.texture.is_none());
        assert_eq!(backend.created(ResourceKind::Texture), 0);
    }

    #[test]
    fn text_scene_without_a_font_names_the_setting() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_bmp(&dir);
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let ttf = TtfGuard::init(&core).unwrap();

        let err = SceneAssets::load(Scene::SurfaceText, &core, &ttf, None, &config).unwrap_err();
        assert!(err.to_string().contains("assets.font"));

        let font_path = dir.path().join("font.ttf");
        std::fs::write(&font_path, b"font").unwrap();
        let config = AssetConfig {
            font: Some(FontConfig {
                path: font_path,
                point_size: 18,
            }),
            ..config
        };
        let assets = SceneAssets::load(Scene::SurfaceText, &core, &ttf, None, &config).unwrap();
        assert!(assets.font.is_some());
    }

    #[test]
    fn missing_bitmap_fails_in_the_native_loader() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let ttf = TtfGuard::init(&core).unwrap();
        let config = AssetConfig {
            image: "./does/not/exist.bmp".into(),
            audio: None,
            font: None,
        };

        let err = SceneAssets::load(Scene::SurfaceBmp, &core, &ttf, None, &config).unwrap_err();
        assert_eq!(err.call(), Some("SDL_LoadBMP"));
        assert!(err.to_string().contains("exist.bmp"));
    }
}
