//! SDL_ttf: font loading and text rendering.

use std::{ffi::CString, fmt, path::Path};

use crate::{
    backend::Backend,
    geometry::Color,
    guard::{acquire, relinquish, CoreGuard, Subsystem},
    handle::{HandleKind, Owned},
    video::{path_to_cstring, Surface},
    Result, SdlError,
};

/// Keeps SDL_ttf initialised (`TTF_Init` / `TTF_Quit`).
pub struct TtfGuard<'c, B: Backend> {
    backend: &'c B,
}

impl<'c, B: Backend> TtfGuard<'c, B> {
    pub fn init(core: &'c CoreGuard<'_, B>) -> Result<Self> {
        let backend = core.backend();
        acquire(backend, Subsystem::Ttf, || {
            if backend.ttf_init() < 0 {
                let message = backend.last_error();
                return Err(SdlError::native("TTF_Init", message));
            }
            Ok(())
        })?;

        Ok(Self { backend })
    }

    pub fn backend(&self) -> &'c B {
        self.backend
    }
}

impl<B: Backend> Drop for TtfGuard<'_, B> {
    fn drop(&mut self) {
        relinquish(self.backend, Subsystem::Ttf, || self.backend.ttf_quit());
    }
}

impl<B: Backend> fmt::Debug for TtfGuard<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtfGuard").finish()
    }
}

/// Marker for opened fonts.
pub enum FontKind {}

impl<B: Backend> HandleKind<B> for FontKind {
    type Raw = B::Font;
    const NAME: &'static str = "font";

    fn release(backend: &B, raw: Self::Raw) {
        backend.close_font(raw);
    }
}

pub type Font<'a, B> = Owned<'a, B, FontKind>;

impl<'a, B: Backend> Owned<'a, B, FontKind> {
    /// Opens a TrueType/OpenType font file at `point_size`.
    pub fn open(ttf: &'a TtfGuard<'_, B>, path: impl AsRef<Path>, point_size: u16) -> Result<Self> {
        let backend = ttf.backend();
        let path = path_to_cstring(path.as_ref())?;
        let raw = backend.open_font(&path, i32::from(point_size));
        Self::create(backend, "TTF_OpenFont", raw)
    }

    /// Renders UTF-8 `text` anti-aliased onto a new ARGB surface.
    pub fn render_utf8_blended(&self, text: &str, fg: Color) -> Result<Surface<'a, B>> {
        let text = CString::new(text)?;
        let raw = self.backend().render_utf8_blended(self.require()?, &text, fg);
        Surface::create(self.backend(), "TTF_RenderUTF8_Blended", raw)
    }

    /// Renders Latin-1 `text` without anti-aliasing onto a new 8-bit surface.
    pub fn render_text_solid(&self, text: &str, fg: Color) -> Result<Surface<'a, B>> {
        let text = CString::new(text)?;
        let raw = self.backend().render_text_solid(self.require()?, &text, fg);
        Surface::create(self.backend(), "TTF_RenderText_Solid", raw)
    }
}
