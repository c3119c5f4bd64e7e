//! The native backend: SDL2 and its satellite libraries, linked dynamically.

use std::{
    collections::BTreeMap,
    ffi::{c_int, c_void, CStr},
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
    ptr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::{debug, warn};

use super::{Backend, RawHandle, TimerCallback};
use crate::{
    event::Event,
    geometry::{Color, Point, Rect},
    guard::{GuardSet, InitFlags},
    mixer::{AudioSpec, MixerFlags},
    render::{BlendMode, Flip, RendererFlags, TextureInfo},
    video::{SurfaceInfo, WindowFlags},
    Result, SdlError,
};

mod ffi;

static INSTANCE: AtomicBool = AtomicBool::new(false);

type SharedCallback = Arc<Mutex<TimerCallback>>;

/// Callbacks of registered timers, keyed by the `param` handed to SDL.
static CALLBACKS: Mutex<BTreeMap<usize, SharedCallback>> = Mutex::new(BTreeMap::new());
static NEXT_CALLBACK: AtomicUsize = AtomicUsize::new(1);

fn callbacks() -> MutexGuard<'static, BTreeMap<usize, SharedCallback>> {
    CALLBACKS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn register_callback(callback: TimerCallback) -> usize {
    let key = NEXT_CALLBACK.fetch_add(1, Ordering::Relaxed);
    callbacks().insert(key, Arc::new(Mutex::new(callback)));
    key
}

fn unregister_callback(key: usize) -> Option<SharedCallback> {
    callbacks().remove(&key)
}

/// Runs the callback registered under `key`. An invocation already in flight
/// holds its own reference, so unregistering never frees a running callback;
/// an unknown key stops the timer.
fn fire(key: usize, interval: u32) -> u32 {
    let Some(callback) = callbacks().get(&key).cloned() else {
        return 0;
    };
    // Unwinding across the C frame is undefined; a panicking callback stops
    // its timer instead.
    let next = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
        (*callback)(interval)
    }));
    next.unwrap_or(0)
}

/// A registered timer and the registry key of its callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdlTimer {
    id: ffi::SDL_TimerID,
    key: usize,
}

impl SdlTimer {
    const NULL: SdlTimer = SdlTimer { id: 0, key: 0 };
}

impl RawHandle for SdlTimer {
    fn is_null(&self) -> bool {
        self.id == 0
    }
}

extern "C" fn timer_trampoline(interval: u32, param: *mut c_void) -> u32 {
    fire(param as usize, interval)
}

fn opt<T>(value: Option<&T>) -> *const T {
    value.map_or(ptr::null(), |value| value as *const T)
}

fn decode_event(event: &ffi::SDL_Event) -> Event {
    match event.u32_at(0) {
        ffi::SDL_QUIT => Event::Quit,
        ffi::SDL_KEYDOWN => Event::KeyDown {
            keycode: event.i32_at(ffi::KEY_SYM_OFFSET),
        },
        ffi::SDL_KEYUP => Event::KeyUp {
            keycode: event.i32_at(ffi::KEY_SYM_OFFSET),
        },
        ffi::SDL_MOUSEMOTION => Event::MouseMotion {
            x: event.i32_at(ffi::MOUSE_X_OFFSET),
            y: event.i32_at(ffi::MOUSE_Y_OFFSET),
        },
        ffi::SDL_MOUSEBUTTONDOWN => Event::MouseButtonDown {
            x: event.i32_at(ffi::MOUSE_X_OFFSET),
            y: event.i32_at(ffi::MOUSE_Y_OFFSET),
        },
        kind => Event::Other { kind },
    }
}

/// Backend calling into the system's SDL2 libraries.
///
/// The libraries keep process-global state, so at most one instance exists at
/// a time. The type is neither `Send` nor `Sync`: SDL's video functions must be
/// called from the thread that initialised them.
#[derive(Debug)]
pub struct SdlBackend {
    guards: GuardSet,
    _not_send: PhantomData<*const ()>,
}

impl SdlBackend {
    pub fn new() -> Result<Self> {
        if INSTANCE.swap(true, Ordering::SeqCst) {
            return Err(SdlError::msg("an SdlBackend is already alive in this process"));
        }

        debug!("native backend created");
        Ok(Self {
            guards: GuardSet::new(),
            _not_send: PhantomData,
        })
    }
}

impl Drop for SdlBackend {
    fn drop(&mut self) {
        INSTANCE.store(false, Ordering::SeqCst);
    }
}

impl Backend for SdlBackend {
    type Window = *mut ffi::SDL_Window;
    type Renderer = *mut ffi::SDL_Renderer;
    type Surface = *mut ffi::SDL_Surface;
    type Texture = *mut ffi::SDL_Texture;
    type Font = *mut ffi::TTF_Font;
    type Timer = SdlTimer;
    type Chunk = *mut ffi::Mix_Chunk;
    type Stream = *mut ffi::SDL_RWops;

    fn guards(&self) -> &GuardSet {
        &self.guards
    }

    fn last_error(&self) -> String {
        let message = unsafe { ffi::SDL_GetError() };
        if message.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }

    fn init(&self, flags: InitFlags) -> i32 {
        unsafe { ffi::SDL_Init(flags.bits()) }
    }

    fn quit(&self) {
        unsafe { ffi::SDL_Quit() }
    }

    fn ttf_init(&self) -> i32 {
        unsafe { ffi::TTF_Init() }
    }

    fn ttf_quit(&self) {
        unsafe { ffi::TTF_Quit() }
    }

    fn mix_init(&self, flags: MixerFlags) -> MixerFlags {
        let loaded = unsafe { ffi::Mix_Init(flags.bits() as c_int) };
        MixerFlags::from_bits_truncate(loaded as u32)
    }

    fn mix_quit(&self) {
        unsafe { ffi::Mix_Quit() }
    }

    fn open_audio(&self, spec: &AudioSpec) -> i32 {
        unsafe {
            ffi::Mix_OpenAudio(
                spec.frequency as c_int,
                spec.format.0,
                spec.channels as c_int,
                spec.chunk_size as c_int,
            )
        }
    }

    fn close_audio(&self) {
        unsafe { ffi::Mix_CloseAudio() }
    }

    fn create_window(
        &self,
        title: &CStr,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        flags: WindowFlags,
    ) -> Self::Window {
        unsafe { ffi::SDL_CreateWindow(title.as_ptr(), x, y, w, h, flags.bits()) }
    }

    fn destroy_window(&self, window: Self::Window) {
        unsafe { ffi::SDL_DestroyWindow(window) }
    }

    fn window_surface(&self, window: Self::Window) -> Self::Surface {
        unsafe { ffi::SDL_GetWindowSurface(window) }
    }

    fn update_window_surface(&self, window: Self::Window) -> i32 {
        unsafe { ffi::SDL_UpdateWindowSurface(window) }
    }

    fn create_renderer(&self, window: Self::Window, index: i32, flags: RendererFlags) -> Self::Renderer {
        unsafe { ffi::SDL_CreateRenderer(window, index, flags.bits()) }
    }

    fn destroy_renderer(&self, renderer: Self::Renderer) {
        unsafe { ffi::SDL_DestroyRenderer(renderer) }
    }

    fn load_bmp(&self, path: &CStr) -> Self::Surface {
        let stream = unsafe { ffi::SDL_RWFromFile(path.as_ptr(), b"rb\0".as_ptr().cast()) };
        if stream.is_null() {
            return ptr::null_mut();
        }
        unsafe { ffi::SDL_LoadBMP_RW(stream, 1) }
    }

    fn img_load(&self, path: &CStr) -> Self::Surface {
        unsafe { ffi::IMG_Load(path.as_ptr()) }
    }

    fn free_surface(&self, surface: Self::Surface) {
        unsafe { ffi::SDL_FreeSurface(surface) }
    }

    fn surface_info(&self, surface: Self::Surface) -> SurfaceInfo {
        if surface.is_null() {
            return SurfaceInfo::default();
        }
        let surface = unsafe { &*surface };
        SurfaceInfo {
            width: surface.w.max(0) as u32,
            height: surface.h.max(0) as u32,
            pitch: surface.pitch.max(0) as u32,
        }
    }

    fn fill_rect(&self, surface: Self::Surface, rect: Option<&Rect>, color: u32) -> i32 {
        unsafe { ffi::SDL_FillRect(surface, opt(rect), color) }
    }

    fn blit_surface(
        &self,
        src: Self::Surface,
        src_rect: Option<&Rect>,
        dst: Self::Surface,
        dst_rect: Option<&mut Rect>,
    ) -> i32 {
        let dst_rect = dst_rect.map_or(ptr::null_mut(), |rect| rect as *mut Rect);
        unsafe { ffi::SDL_UpperBlit(src, opt(src_rect), dst, dst_rect) }
    }

    fn create_texture_from_surface(&self, renderer: Self::Renderer, surface: Self::Surface) -> Self::Texture {
        unsafe { ffi::SDL_CreateTextureFromSurface(renderer, surface) }
    }

    fn destroy_texture(&self, texture: Self::Texture) {
        unsafe { ffi::SDL_DestroyTexture(texture) }
    }

    fn query_texture(&self, texture: Self::Texture, info: &mut TextureInfo) -> i32 {
        let (mut format, mut access, mut w, mut h) = (0u32, 0, 0, 0);
        let status = unsafe { ffi::SDL_QueryTexture(texture, &mut format, &mut access, &mut w, &mut h) };
        if status == 0 {
            *info = TextureInfo {
                format,
                access,
                width: w.max(0) as u32,
                height: h.max(0) as u32,
            };
        }
        status
    }

    fn set_render_draw_color(&self, renderer: Self::Renderer, color: Color) -> i32 {
        unsafe { ffi::SDL_SetRenderDrawColor(renderer, color.r, color.g, color.b, color.a) }
    }

    fn render_clear(&self, renderer: Self::Renderer) -> i32 {
        unsafe { ffi::SDL_RenderClear(renderer) }
    }

    fn set_render_draw_blend_mode(&self, renderer: Self::Renderer, mode: BlendMode) -> i32 {
        unsafe { ffi::SDL_SetRenderDrawBlendMode(renderer, mode.to_raw()) }
    }

    fn render_fill_rect(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32 {
        unsafe { ffi::SDL_RenderFillRect(renderer, opt(rect)) }
    }

    fn render_draw_rect(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32 {
        unsafe { ffi::SDL_RenderDrawRect(renderer, opt(rect)) }
    }

    fn render_draw_line(&self, renderer: Self::Renderer, from: Point, to: Point) -> i32 {
        unsafe { ffi::SDL_RenderDrawLine(renderer, from.x, from.y, to.x, to.y) }
    }

    fn render_draw_lines(&self, renderer: Self::Renderer, points: &[Point]) -> i32 {
        let Ok(count) = c_int::try_from(points.len()) else {
            return -1;
        };
        unsafe { ffi::SDL_RenderDrawLines(renderer, points.as_ptr(), count) }
    }

    fn render_copy(
        &self,
        renderer: Self::Renderer,
        texture: Self::Texture,
        src: Option<&Rect>,
        dst: Option<&Rect>,
    ) -> i32 {
        unsafe { ffi::SDL_RenderCopy(renderer, texture, opt(src), opt(dst)) }
    }

    fn render_copy_ex(
        &self,
        renderer: Self::Renderer,
        texture: Self::Texture,
        src: Option<&Rect>,
        dst: Option<&Rect>,
        angle: f64,
        center: Option<&Point>,
        flip: Flip,
    ) -> i32 {
        unsafe {
            ffi::SDL_RenderCopyEx(
                renderer,
                texture,
                opt(src),
                opt(dst),
                angle,
                opt(center),
                flip.bits() as c_int,
            )
        }
    }

    fn render_set_scale(&self, renderer: Self::Renderer, scale_x: f32, scale_y: f32) -> i32 {
        unsafe { ffi::SDL_RenderSetScale(renderer, scale_x, scale_y) }
    }

    fn render_set_viewport(&self, renderer: Self::Renderer, rect: Option<&Rect>) -> i32 {
        unsafe { ffi::SDL_RenderSetViewport(renderer, opt(rect)) }
    }

    fn render_present(&self, renderer: Self::Renderer) {
        unsafe { ffi::SDL_RenderPresent(renderer) }
    }

    fn open_font(&self, path: &CStr, point_size: i32) -> Self::Font {
        unsafe { ffi::TTF_OpenFont(path.as_ptr(), point_size) }
    }

    fn close_font(&self, font: Self::Font) {
        unsafe { ffi::TTF_CloseFont(font) }
    }

    fn render_utf8_blended(&self, font: Self::Font, text: &CStr, fg: Color) -> Self::Surface {
        unsafe { ffi::TTF_RenderUTF8_Blended(font, text.as_ptr(), fg) }
    }

    fn render_text_solid(&self, font: Self::Font, text: &CStr, fg: Color) -> Self::Surface {
        unsafe { ffi::TTF_RenderText_Solid(font, text.as_ptr(), fg) }
    }

    fn rw_from_file(&self, path: &CStr, mode: &CStr) -> Self::Stream {
        unsafe { ffi::SDL_RWFromFile(path.as_ptr(), mode.as_ptr()) }
    }

    fn rw_close(&self, stream: Self::Stream) {
        if unsafe { ffi::SDL_RWclose(stream) } < 0 {
            warn!(error = %self.last_error(), "SDL_RWclose failed");
        }
    }

    fn load_wav_rw(&self, stream: Self::Stream, free_src: bool) -> Self::Chunk {
        unsafe { ffi::Mix_LoadWAV_RW(stream, c_int::from(free_src)) }
    }

    fn free_chunk(&self, chunk: Self::Chunk) {
        unsafe { ffi::Mix_FreeChunk(chunk) }
    }

    fn play_channel(&self, channel: i32, chunk: Self::Chunk, loops: i32) -> i32 {
        unsafe { ffi::Mix_PlayChannelTimed(channel, chunk, loops, -1) }
    }

    fn add_timer(&self, interval: u32, callback: TimerCallback) -> Self::Timer {
        let key = register_callback(callback);
        let id = unsafe { ffi::SDL_AddTimer(interval, Some(timer_trampoline), key as *mut c_void) };
        if id == 0 {
            unregister_callback(key);
            return SdlTimer::NULL;
        }
        SdlTimer { id, key }
    }

    fn remove_timer(&self, timer: Self::Timer) {
        unsafe { ffi::SDL_RemoveTimer(timer.id) };
        unregister_callback(timer.key);
    }

    fn poll_event(&self) -> Option<Event> {
        let mut event = ffi::SDL_Event::zeroed();
        match unsafe { ffi::SDL_PollEvent(&mut event) } {
            1 => Some(decode_event(&event)),
            _ => None,
        }
    }

    fn ticks(&self) -> u32 {
        unsafe { ffi::SDL_GetTicks() }
    }

    fn delay(&self, ms: u32) {
        unsafe { ffi::SDL_Delay(ms) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(kind: u32, fields: &[(usize, i32)]) -> ffi::SDL_Event {
        let mut event = ffi::SDL_Event::zeroed();
        event.bytes[..4].copy_from_slice(&kind.to_ne_bytes());
        for (offset, value) in fields {
            event.bytes[*offset..*offset + 4].copy_from_slice(&value.to_ne_bytes());
        }
        event
    }

    #[test]
    fn decodes_keyboard_and_mouse_events() {
        let key = event_with(ffi::SDL_KEYDOWN, &[(ffi::KEY_SYM_OFFSET, 27)]);
        assert_eq!(decode_event(&key), Event::KeyDown { keycode: 27 });

        let motion = event_with(
            ffi::SDL_MOUSEMOTION,
            &[(ffi::MOUSE_X_OFFSET, 12), (ffi::MOUSE_Y_OFFSET, 34)],
        );
        assert_eq!(decode_event(&motion), Event::MouseMotion { x: 12, y: 34 });

        let quit = event_with(ffi::SDL_QUIT, &[]);
        assert!(decode_event(&quit).is_quit());

        let window = event_with(0x200, &[]);
        assert_eq!(decode_event(&window), Event::Other { kind: 0x200 });
    }

    #[test]
    fn unregistered_timer_callback_is_never_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let key = register_callback(Box::new(move |interval| {
            counter.fetch_add(1, Ordering::SeqCst);
            interval * 2
        }));

        assert_eq!(timer_trampoline(10, key as *mut c_void), 20);
        assert!(unregister_callback(key).is_some());
        assert_eq!(timer_trampoline(10, key as *mut c_void), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn running_callback_outlives_its_registration() {
        let own_key = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicBool::new(false));
        let (key_slot, removed_flag) = (Arc::clone(&own_key), Arc::clone(&removed));
        let key = register_callback(Box::new(move |interval| {
            // The owner drops the timer while this call is still running.
            let entry = unregister_callback(key_slot.load(Ordering::SeqCst));
            removed_flag.store(entry.is_some(), Ordering::SeqCst);
            interval + 1
        }));
        own_key.store(key, Ordering::SeqCst);

        assert_eq!(fire(key, 5), 6);
        assert!(removed.load(Ordering::SeqCst));
        assert!(!callbacks().contains_key(&key));
        assert_eq!(fire(key, 5), 0);
    }

    #[test]
    fn panicking_callback_stops_its_timer() {
        let key = register_callback(Box::new(|_| panic!("callback failed")));
        assert_eq!(fire(key, 5), 0);
        unregister_callback(key);
    }
}
