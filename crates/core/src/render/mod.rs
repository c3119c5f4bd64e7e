//! Hardware renderer and textures.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    backend::Backend,
    geometry::{Color, Point, Rect},
    handle::{check, HandleKind, Owned},
    video::{AsSurface, WindowKind},
    Result, SdlError,
};

bitflags! {
    /// Flags passed to `SDL_CreateRenderer`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RendererFlags: u32 {
        const SOFTWARE = 0x0000_0001;
        const ACCELERATED = 0x0000_0002;
        const PRESENTVSYNC = 0x0000_0004;
        const TARGETTEXTURE = 0x0000_0008;
    }
}

bitflags! {
    /// Mirroring applied by [`Renderer::copy_ex`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flip: u32 {
        const HORIZONTAL = 0x0000_0001;
        const VERTICAL = 0x0000_0002;
    }
}

/// Blending used by draw operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    None,
    Blend,
    Add,
    Mod,
    Mul,
}

impl BlendMode {
    pub fn to_raw(self) -> i32 {
        match self {
            Self::None => 0x0,
            Self::Blend => 0x1,
            Self::Add => 0x2,
            Self::Mod => 0x4,
            Self::Mul => 0x8,
        }
    }
}

/// Result of `SDL_QueryTexture`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureInfo {
    pub format: u32,
    pub access: i32,
    pub width: u32,
    pub height: u32,
}

impl TextureInfo {
    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width as i32, self.height as i32)
    }
}

/// Marker for native renderers.
pub enum RendererKind {}

impl<B: Backend> HandleKind<B> for RendererKind {
    type Raw = B::Renderer;
    const NAME: &'static str = "renderer";

    fn release(backend: &B, raw: Self::Raw) {
        backend.destroy_renderer(raw);
    }
}

/// Marker for native textures.
pub enum TextureKind {}

impl<B: Backend> HandleKind<B> for TextureKind {
    type Raw = B::Texture;
    const NAME: &'static str = "texture";

    fn release(backend: &B, raw: Self::Raw) {
        backend.destroy_texture(raw);
    }
}

pub type Renderer<'a, B> = Owned<'a, B, RendererKind>;

/// A texture borrows the renderer that created it and cannot outlive it:
///
/// ```compile_fail
/// use sdl_scoped_core::{
///     CoreGuard, HeadlessBackend, InitFlags, Renderer, RendererFlags, Surface, Texture, Window,
///     WindowSpec,
/// };
///
/// let backend = HeadlessBackend::new();
/// let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
/// let window = Window::new(&core, &WindowSpec::new("w", 10, 10)).unwrap();
/// let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();
/// let surface = Surface::load_bmp(&core, "cat.bmp").unwrap();
/// let texture = Texture::from_surface(&renderer, &surface).unwrap();
/// drop(renderer);
/// drop(texture);
/// ```
pub type Texture<'a, B> = Owned<'a, B, TextureKind>;

impl<'a, B: Backend> Owned<'a, B, RendererKind> {
    /// Creates a renderer for `window`. `driver` selects a rendering driver by
    /// index; `None` picks the first one supporting `flags`.
    pub fn new(
        window: &'a Owned<'_, B, WindowKind>,
        driver: Option<u32>,
        flags: RendererFlags,
    ) -> Result<Self> {
        let backend = window.backend();
        let index = match driver {
            Some(index) => i32::try_from(index).map_err(|_| {
                SdlError::InvalidArgument(format!("driver index {index} is out of range"))
            })?,
            None => -1,
        };

        let raw = backend.create_renderer(window.require()?, index, flags);
        Self::create(backend, "SDL_CreateRenderer", raw)
    }

    pub fn set_draw_color(&self, color: Color) -> Result<()> {
        let status = self.backend().set_render_draw_color(self.require()?, color);
        check(self.backend(), "SDL_SetRenderDrawColor", status)
    }

    /// Clears the current target with the draw colour.
    pub fn clear(&self) -> Result<()> {
        let status = self.backend().render_clear(self.require()?);
        check(self.backend(), "SDL_RenderClear", status)
    }

    pub fn set_draw_blend_mode(&self, mode: BlendMode) -> Result<()> {
        let status = self
            .backend()
            .set_render_draw_blend_mode(self.require()?, mode);
        check(self.backend(), "SDL_SetRenderDrawBlendMode", status)
    }

    /// Fills `rect`, or the whole target for `None`.
    pub fn fill_rect(&self, rect: Option<Rect>) -> Result<()> {
        let status = self
            .backend()
            .render_fill_rect(self.require()?, rect.as_ref());
        check(self.backend(), "SDL_RenderFillRect", status)
    }

    /// Outlines `rect`, or the whole target for `None`.
    pub fn draw_rect(&self, rect: Option<Rect>) -> Result<()> {
        let status = self
            .backend()
            .render_draw_rect(self.require()?, rect.as_ref());
        check(self.backend(), "SDL_RenderDrawRect", status)
    }

    pub fn draw_line(&self, from: Point, to: Point) -> Result<()> {
        let status = self.backend().render_draw_line(self.require()?, from, to);
        check(self.backend(), "SDL_RenderDrawLine", status)
    }

    /// Draws a connected polyline through `points`.
    pub fn draw_lines(&self, points: &[Point]) -> Result<()> {
        if i32::try_from(points.len()).is_err() {
            return Err(SdlError::InvalidArgument(format!(
                "{} points exceed the native count range",
                points.len()
            )));
        }
        let status = self.backend().render_draw_lines(self.require()?, points);
        check(self.backend(), "SDL_RenderDrawLines", status)
    }

    /// Copies `src` of `texture` (all of it for `None`) into `dst` of the
    /// target (all of it for `None`).
    pub fn copy(&self, texture: &Texture<'_, B>, src: Option<Rect>, dst: Option<Rect>) -> Result<()> {
        let status = self.backend().render_copy(
            self.require()?,
            texture.require()?,
            src.as_ref(),
            dst.as_ref(),
        );
        check(self.backend(), "SDL_RenderCopy", status)
    }

    /// Like [`Self::copy`], rotating by `angle` degrees clockwise around
    /// `center` (the centre of `dst` for `None`) and mirroring by `flip`.
    pub fn copy_ex(
        &self,
        texture: &Texture<'_, B>,
        src: Option<Rect>,
        dst: Option<Rect>,
        angle: f64,
        center: Option<Point>,
        flip: Flip,
    ) -> Result<()> {
        let status = self.backend().render_copy_ex(
            self.require()?,
            texture.require()?,
            src.as_ref(),
            dst.as_ref(),
            angle,
            center.as_ref(),
            flip,
        );
        check(self.backend(), "SDL_RenderCopyEx", status)
    }

    pub fn set_scale(&self, scale_x: f32, scale_y: f32) -> Result<()> {
        let status = self
            .backend()
            .render_set_scale(self.require()?, scale_x, scale_y);
        check(self.backend(), "SDL_RenderSetScale", status)
    }

    /// Restricts drawing to `rect`; `None` resets to the whole target.
    pub fn set_viewport(&self, rect: Option<Rect>) -> Result<()> {
        let status = self
            .backend()
            .render_set_viewport(self.require()?, rect.as_ref());
        check(self.backend(), "SDL_RenderSetViewport", status)
    }

    /// Shows everything drawn since the last call. Cannot fail; an empty
    /// renderer presents nothing.
    pub fn present(&self) {
        if let Some(raw) = self.raw() {
            self.backend().render_present(raw);
        }
    }
}

impl<'a, B: Backend> Owned<'a, B, TextureKind> {
    /// Uploads `surface` to a texture owned by `renderer`.
    pub fn from_surface(
        renderer: &'a Owned<'_, B, RendererKind>,
        surface: &impl AsSurface<B>,
    ) -> Result<Self> {
        let backend = renderer.backend();
        let raw = backend.create_texture_from_surface(renderer.require()?, surface.surface_raw()?);
        Self::create(backend, "SDL_CreateTextureFromSurface", raw)
    }

    pub fn query(&self) -> Result<TextureInfo> {
        let mut info = TextureInfo::default();
        let status = self.backend().query_texture(self.require()?, &mut info);
        check(self.backend(), "SDL_QueryTexture", status)?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{headless::DrawCommand, HeadlessBackend, ResourceKind},
        guard::{CoreGuard, InitFlags},
        video::{Surface, Window, WindowSpec},
    };

    fn bmp_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("cat.bmp");
        image::RgbImage::new(40, 20).save(&path).unwrap();
        path
    }

    #[test]
    fn records_draw_calls_in_order() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();

        renderer.set_draw_color(Color::WHITE).unwrap();
        renderer.clear().unwrap();
        renderer.set_draw_blend_mode(BlendMode::Blend).unwrap();
        renderer.fill_rect(Some(Rect::sized(100, 100))).unwrap();
        renderer
            .draw_lines(&[Point::new(50, 50), Point::new(200, 200)])
            .unwrap();
        renderer.present();

        let raw = renderer.raw().unwrap();
        assert_eq!(
            backend.draw_log(raw),
            vec![
                DrawCommand::SetColor(Color::WHITE),
                DrawCommand::Clear,
                DrawCommand::SetBlendMode(BlendMode::Blend),
                DrawCommand::FillRect(Some(Rect::sized(100, 100))),
                DrawCommand::Lines(vec![Point::new(50, 50), Point::new(200, 200)]),
                DrawCommand::Present,
            ]
        );
        assert_eq!(backend.presented(raw), 1);
    }

    #[test]
    fn texture_reports_surface_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 600, 480)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();

        let surface = Surface::load_bmp(&core, bmp_file(&dir)).unwrap();
        let texture = Texture::from_surface(&renderer, &surface).unwrap();
        drop(surface);

        let info = texture.query().unwrap();
        assert_eq!(info.bounds(), Rect::sized(40, 20));

        renderer
            .copy_ex(
                &texture,
                None,
                Some(info.bounds()),
                45.0,
                None,
                Flip::HORIZONTAL,
            )
            .unwrap();
        assert!(backend
            .draw_log(renderer.raw().unwrap())
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::CopyEx { flip, .. } if *flip == Flip::HORIZONTAL)));
    }

    #[test]
    fn releases_texture_renderer_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        {
            let window = Window::new(&core, &WindowSpec::new("Rect", 60, 40)).unwrap();
            let renderer = Renderer::new(&window, None, RendererFlags::SOFTWARE).unwrap();
            let surface = Surface::load_bmp(&core, bmp_file(&dir)).unwrap();
            let _texture = Texture::from_surface(&renderer, &surface).unwrap();
        }

        for kind in [
            ResourceKind::Window,
            ResourceKind::Renderer,
            ResourceKind::Surface,
            ResourceKind::Texture,
        ] {
            assert_eq!(backend.created(kind), 1, "{kind:?}");
            assert_eq!(backend.released(kind), 1, "{kind:?}");
        }
        assert!(backend.invalid_releases().is_empty());
    }

    #[test]
    fn draw_failure_names_the_call() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 60, 40)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();
        backend.fail_next("SDL_RenderSetViewport", "Parameter 'rect' is invalid");

        let err = renderer.set_viewport(Some(Rect::sized(300, 260))).unwrap_err();
        assert_eq!(err.call(), Some("SDL_RenderSetViewport"));
        assert!(err.to_string().contains("Parameter 'rect' is invalid"));
    }

    #[test]
    fn empty_texture_is_not_passed_to_the_native_layer() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        let window = Window::new(&core, &WindowSpec::new("Rect", 60, 40)).unwrap();
        let renderer = Renderer::new(&window, None, RendererFlags::ACCELERATED).unwrap();
        let texture = Texture::empty(&backend);

        let err = renderer.copy(&texture, None, None).unwrap_err();
        assert!(matches!(err, SdlError::EmptyHandle("texture")));
        assert!(backend.draw_log(renderer.raw().unwrap()).is_empty());
    }
}
