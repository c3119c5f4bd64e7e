//! Windows and software pixel surfaces.

use std::{ffi::CString, fmt, marker::PhantomData, path::Path};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    backend::{Backend, RawHandle},
    geometry::Rect,
    guard::CoreGuard,
    handle::{check, HandleKind, Owned},
    Result, SdlError,
};

bitflags! {
    /// Flags passed to `SDL_CreateWindow`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u32 {
        const FULLSCREEN = 0x0000_0001;
        const OPENGL = 0x0000_0002;
        const SHOWN = 0x0000_0004;
        const HIDDEN = 0x0000_0008;
        const BORDERLESS = 0x0000_0010;
        const RESIZABLE = 0x0000_0020;
        const MINIMIZED = 0x0000_0040;
        const MAXIMIZED = 0x0000_0080;
        const ALLOW_HIGHDPI = 0x0000_2000;
        const VULKAN = 0x1000_0000;
    }
}

/// Initial window coordinate along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPos {
    #[default]
    Centered,
    Undefined,
    At(i32),
}

impl WindowPos {
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Centered => 0x2FFF_0000,
            Self::Undefined => 0x1FFF_0000,
            Self::At(value) => value,
        }
    }
}

/// Everything `SDL_CreateWindow` needs.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub title: String,
    pub x: WindowPos,
    pub y: WindowPos,
    pub width: u32,
    pub height: u32,
    pub flags: WindowFlags,
}

impl WindowSpec {
    /// A centered window without extra flags.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            x: WindowPos::Centered,
            y: WindowPos::Centered,
            width,
            height,
            flags: WindowFlags::empty(),
        }
    }

    pub fn with_position(mut self, x: WindowPos, y: WindowPos) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Marker for native windows.
pub enum WindowKind {}

impl<B: Backend> HandleKind<B> for WindowKind {
    type Raw = B::Window;
    const NAME: &'static str = "window";

    fn release(backend: &B, raw: Self::Raw) {
        backend.destroy_window(raw);
    }
}

/// Marker for owned pixel surfaces.
pub enum SurfaceKind {}

impl<B: Backend> HandleKind<B> for SurfaceKind {
    type Raw = B::Surface;
    const NAME: &'static str = "surface";

    fn release(backend: &B, raw: Self::Raw) {
        backend.free_surface(raw);
    }
}

pub type Window<'a, B> = Owned<'a, B, WindowKind>;
pub type Surface<'a, B> = Owned<'a, B, SurfaceKind>;

impl<'a, B: Backend> Owned<'a, B, WindowKind> {
    pub fn new(core: &'a CoreGuard<'_, B>, spec: &WindowSpec) -> Result<Self> {
        let backend = core.backend();
        let title = CString::new(spec.title.as_str())?;
        let width = dimension("window width", spec.width)?;
        let height = dimension("window height", spec.height)?;

        let raw = backend.create_window(
            &title,
            spec.x.to_raw(),
            spec.y.to_raw(),
            width,
            height,
            spec.flags,
        );
        Self::create(backend, "SDL_CreateWindow", raw)
    }

    /// The window's own backing surface. It stays owned by the window, so the
    /// returned value borrows the window and never frees anything.
    pub fn surface(&self) -> Result<WindowSurface<'_, B>> {
        let backend = self.backend();
        let raw = backend.window_surface(self.require()?);
        if raw.is_null() {
            let message = backend.last_error();
            return Err(SdlError::native("SDL_GetWindowSurface", message));
        }

        Ok(WindowSurface {
            backend,
            raw,
            _window: PhantomData,
        })
    }

    /// Copies the window surface to the screen.
    pub fn update_surface(&self) -> Result<()> {
        let backend = self.backend();
        let status = backend.update_window_surface(self.require()?);
        check(backend, "SDL_UpdateWindowSurface", status)
    }
}

impl<'a, B: Backend> Owned<'a, B, SurfaceKind> {
    /// Loads a BMP file. Other formats go through [`crate::img::load`].
    pub fn load_bmp(core: &'a CoreGuard<'_, B>, path: impl AsRef<Path>) -> Result<Self> {
        let backend = core.backend();
        let path = path_to_cstring(path.as_ref())?;
        let raw = backend.load_bmp(&path);
        Self::create(backend, "SDL_LoadBMP", raw)
    }
}

/// Width, height and row pitch of a surface, read straight from the native
/// struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

impl SurfaceInfo {
    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width as i32, self.height as i32)
    }
}

/// Non-owning view of a window's backing surface.
pub struct WindowSurface<'w, B: Backend> {
    backend: &'w B,
    raw: B::Surface,
    _window: PhantomData<&'w ()>,
}

impl<B: Backend> WindowSurface<'_, B> {
    pub fn raw(&self) -> B::Surface {
        self.raw
    }
}

impl<B: Backend> fmt::Debug for WindowSurface<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowSurface")
            .field("raw", &self.raw)
            .finish()
    }
}

/// Anything that can stand in for an `SDL_Surface*`: owned surfaces and the
/// borrowed window surface.
pub trait AsSurface<B: Backend> {
    fn surface_backend(&self) -> &B;

    fn surface_raw(&self) -> Result<B::Surface>;

    /// Dimensions of the surface.
    fn info(&self) -> Result<SurfaceInfo> {
        let raw = self.surface_raw()?;
        Ok(self.surface_backend().surface_info(raw))
    }

    /// Fills `rect` (the whole surface for `None`) with a packed pixel value.
    fn fill_rect(&mut self, rect: Option<Rect>, color: u32) -> Result<()> {
        let raw = self.surface_raw()?;
        let backend = self.surface_backend();
        let status = backend.fill_rect(raw, rect.as_ref(), color);
        check(backend, "SDL_FillRect", status)
    }
}

impl<B: Backend> AsSurface<B> for Owned<'_, B, SurfaceKind> {
    fn surface_backend(&self) -> &B {
        self.backend()
    }

    fn surface_raw(&self) -> Result<B::Surface> {
        self.require()
    }
}

impl<B: Backend> AsSurface<B> for WindowSurface<'_, B> {
    fn surface_backend(&self) -> &B {
        self.backend
    }

    fn surface_raw(&self) -> Result<B::Surface> {
        Ok(self.raw)
    }
}

/// Copies `src_rect` of `src` onto `dst` at `dst_rect`. Returns the
/// destination rectangle after clipping, as written back by the native call.
pub fn blit_surface<B: Backend>(
    src: &impl AsSurface<B>,
    src_rect: Option<Rect>,
    dst: &mut impl AsSurface<B>,
    dst_rect: Option<Rect>,
) -> Result<Option<Rect>> {
    let src_raw = src.surface_raw()?;
    let dst_raw = dst.surface_raw()?;
    let backend = dst.surface_backend();

    let mut clipped = dst_rect;
    let status = backend.blit_surface(src_raw, src_rect.as_ref(), dst_raw, clipped.as_mut());
    check(backend, "SDL_BlitSurface", status)?;
    Ok(clipped)
}

pub(crate) fn dimension(what: &str, value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| SdlError::InvalidArgument(format!("{what} {value} is out of range")))
}

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString> {
    let text = path.to_str().ok_or_else(|| {
        SdlError::InvalidArgument(format!("path {} is not valid UTF-8", path.display()))
    })?;
    Ok(CString::new(text)?)
}
