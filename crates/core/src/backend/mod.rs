//! The native-layer seam.
//!
//! Every wrapper in this crate reaches the multimedia library through
//! [`Backend`]. Methods mirror the native entry points one to one and keep
//! their failure conventions: creation calls return a raw handle that may be
//! null, status calls return a negative value on failure, and the reason is
//! read afterwards from [`Backend::last_error`]. Translating those conventions
//! into [`crate::SdlError`] is the wrappers' job, not the backend's.

use std::{ffi::CStr, fmt};

use crate::{
    event::Event,
    geometry::{Color, Point, Rect},
    guard::{GuardSet, InitFlags},
    mixer::{AudioSpec, MixerFlags},
    render::{BlendMode, Flip, RendererFlags, TextureInfo},
    video::{SurfaceInfo, WindowFlags},
};

pub mod headless;
#[cfg(feature = "sdl")]
pub mod sdl;

pub use headless::{HeadlessBackend, ResourceKind};
#[cfg(feature = "sdl")]
pub use sdl::SdlBackend;

/// A raw native handle. The null value is the failure sentinel returned by
/// creation calls and the "nothing owned" state of an emptied wrapper.
pub trait RawHandle: Copy + PartialEq + fmt::Debug {
    fn is_null(&self) -> bool;
}

impl<T> RawHandle for *mut T {
    fn is_null(&self) -> bool {
        <*mut T>::is_null(*self)
    }
}

/// Callback driven by a native timer. Receives the current interval in
/// milliseconds and returns the next one; returning 0 cancels the timer.
pub type TimerCallback = Box<dyn FnMut(u32) -> u32 + Send + 'static>;

/// Native entry points of the SDL2 suite.
pub trait Backend {
    type Window: RawHandle;
    type Renderer: RawHandle;
    type Surface: RawHandle;
    type Texture: RawHandle;
    type Font: RawHandle;
    type Timer: RawHandle;
    type Chunk: RawHandle;
    type Stream: RawHandle;

    /// Claim flags for the process-lifetime guards of this backend.
    fn guards(&self) -> &GuardSet;

    /// Error string recorded by the most recent failing call.
    fn last_error(&self) -> String;

    fn init(&self, flags: InitFlags) -> i32;
    fn quit(&self);
    fn ttf_init(&self) -> i32;
    fn ttf_quit(&self);
    /// Returns the loader flags that are initialised after the call.
    fn mix_init(&self, flags: MixerFlags) -> MixerFlags;
    fn mix_quit(&self);
    fn open_audio(&self, spec: &AudioSpec) -> i32;
    fn close_audio(&self);

    fn create_window(
        &self,
        title: &CStr,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        flags: WindowFlags,
    ) -> Self::Window;
    fn destroy_window(&self, window: Self::Window);
    /// The returned surface belongs to the window and must never be freed.
    fn window_surface(&self, window: Self::Window) -> Self::Surface;
    fn update_window_surface(&self, window: Self::Window) -> i32;

    fn create_renderer(
        &self,
        window: Self::Window,
        index: i32,
        flags: RendererFlags,
    ) -> Self::Renderer;
    fn destroy_renderer(&self, renderer: Self::Renderer);

    fn load_bmp(&self, path: &CStr) -> Self::Surface;
    fn img_load(&self, path: &CStr) -> Self::Surface;
    fn free_surface(&self, surface: Self::Surface);
    fn surface_info(&self, surface: Self::Surface) -> SurfaceInfo;
    fn fill_rect(&self, surface: Self::Surface, rect: Option<&Rect>, color: u32) -> i32;
    fn blit_surface(
        &self,
        src: Self::Surface,
        src_rect: Option<&Rect>,
        dst: Self::Surface,
        dst_rect: Option<&mut Rect>,
    ) -> i32;

    fn create_texture_from_surface(
        &self,
        renderer: Self::Renderer,
        surface: Self::Surface,
    ) -> Self::Texture;
    fn destroy_texture(&self, texture: Self::Texture);
    fn query_texture(&self, texture: Self::Texture, info: &mut TextureInfo) -> i32;

    fn set_render_draw_color(&self, renderer: Self::Renderer, color: Color) -> i32;
    fn render_clear(&self, renderer: Self::Renderer) -> i32;
    fn set_render_draw_blend_mode(&self, renderer: Self::Renderer, mode: BlendMode) -> i32;
    fn render_fill_rect(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32;
    fn render_draw_rect(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32;
    fn render_draw_line(&self, renderer: Self::Renderer, from: Point, to: Point) -> i32;
    fn render_draw_lines(&self, renderer: Self::Renderer, points: &[Point]) -> i32;
    fn render_copy(
        &self,
        renderer: Self::Renderer,
        texture: Self::Texture,
        src: Option<&Rect>,
        dst: Option<&Rect>,
    ) -> i32;
    #[allow(clippy::too_many_arguments)]
    fn render_copy_ex(
        &self,
        renderer: Self::Renderer,
        texture: Self::Texture,
        src: Option<&Rect>,
        dst: Option<&Rect>,
        angle: f64,
        center: Option<&Point>,
        flip: Flip,
    ) -> i32;
    fn render_set_scale(&self, renderer: Self::Renderer, scale_x: f32, scale_y: f32) -> i32;
    fn render_set_viewport(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32;
    fn render_present(&self, renderer: Self::Renderer);

    fn open_font(&self, path: &CStr, point_size: i32) -> Self::Font;
    fn close_font(&self, font: Self::Font);
    fn render_utf8_blended(&self, font: Self::Font, text: &CStr, fg: Color) -> Self::Surface;
    fn render_text_solid(&self, font: Self::Font, text: &CStr, fg: Color) -> Self::Surface;

    fn rw_from_file(&self, path: &CStr, mode: &CStr) -> Self::Stream;
    fn rw_close(&self, stream: Self::Stream);
    /// With `free_src` set the stream is closed before returning, whether the
    /// load succeeded or not.
    fn load_wav_rw(&self, stream: Self::Stream, free_src: bool) -> Self::Chunk;
    fn free_chunk(&self, chunk: Self::Chunk);
    fn play_channel(&self, channel: i32, chunk: Self::Chunk, loops: i32) -> i32;

    /// On failure the callback is dropped before returning the null timer.
    fn add_timer(&self, interval: u32, callback: TimerCallback) -> Self::Timer;
    fn remove_timer(&self, timer: Self::Timer);

    fn poll_event(&self) -> Option<Event>;
    fn ticks(&self) -> u32;
    fn delay(&self, ms: u32);
}
