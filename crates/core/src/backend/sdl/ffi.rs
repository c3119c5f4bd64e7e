//! Raw declarations for the parts of SDL2, SDL2_image, SDL2_ttf and
//! SDL2_mixer used by [`super::SdlBackend`].
//!
//! Macros from the C headers are expressed through the functions they expand
//! to: `SDL_LoadBMP` is `SDL_LoadBMP_RW(SDL_RWFromFile(path, "rb"), 1)`,
//! `SDL_BlitSurface` is `SDL_UpperBlit`, `Mix_PlayChannel` is
//! `Mix_PlayChannelTimed(.., -1)`, and `TTF_GetError` / `Mix_GetError` are
//! `SDL_GetError`.

#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

use crate::geometry::{Color, Point, Rect};

#[repr(C)]
pub struct SDL_Window {
    _private: [u8; 0],
}

#[repr(C)]
pub struct SDL_Renderer {
    _private: [u8; 0],
}

#[repr(C)]
pub struct SDL_Texture {
    _private: [u8; 0],
}

#[repr(C)]
pub struct SDL_RWops {
    _private: [u8; 0],
}

#[repr(C)]
pub struct SDL_PixelFormat {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TTF_Font {
    _private: [u8; 0],
}

#[repr(C)]
pub struct Mix_Chunk {
    _private: [u8; 0],
}

/// Leading fields of `SDL_Surface`. Only ever read through a pointer handed
/// out by the library.
#[repr(C)]
pub struct SDL_Surface {
    pub flags: u32,
    pub format: *mut SDL_PixelFormat,
    pub w: c_int,
    pub h: c_int,
    pub pitch: c_int,
    pub pixels: *mut c_void,
}

/// `SDL_Event` is a 56 byte union; fields are decoded by offset.
#[repr(C, align(8))]
pub struct SDL_Event {
    pub bytes: [u8; 56],
}

impl SDL_Event {
    pub fn zeroed() -> Self {
        Self { bytes: [0; 56] }
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        let mut word = [0; 4];
        word.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_ne_bytes(word)
    }

    pub fn i32_at(&self, offset: usize) -> i32 {
        self.u32_at(offset) as i32
    }
}

pub const SDL_QUIT: u32 = 0x100;
pub const SDL_KEYDOWN: u32 = 0x300;
pub const SDL_KEYUP: u32 = 0x301;
pub const SDL_MOUSEMOTION: u32 = 0x400;
pub const SDL_MOUSEBUTTONDOWN: u32 = 0x401;

/// Offset of `SDL_KeyboardEvent::keysym.sym`.
pub const KEY_SYM_OFFSET: usize = 20;
/// Offsets of `x` and `y` in both `SDL_MouseMotionEvent` and
/// `SDL_MouseButtonEvent`.
pub const MOUSE_X_OFFSET: usize = 20;
pub const MOUSE_Y_OFFSET: usize = 24;

pub type SDL_TimerID = c_int;
pub type SDL_TimerCallback = Option<extern "C" fn(interval: u32, param: *mut c_void) -> u32>;

#[link(name = "SDL2")]
extern "C" {
    pub fn SDL_Init(flags: u32) -> c_int;
    pub fn SDL_Quit();
    pub fn SDL_GetError() -> *const c_char;

    pub fn SDL_CreateWindow(
        title: *const c_char,
        x: c_int,
        y: c_int,
        w: c_int,
        h: c_int,
        flags: u32,
    ) -> *mut SDL_Window;
    pub fn SDL_DestroyWindow(window: *mut SDL_Window);
    pub fn SDL_GetWindowSurface(window: *mut SDL_Window) -> *mut SDL_Surface;
    pub fn SDL_UpdateWindowSurface(window: *mut SDL_Window) -> c_int;

    pub fn SDL_CreateRenderer(window: *mut SDL_Window, index: c_int, flags: u32) -> *mut SDL_Renderer;
    pub fn SDL_DestroyRenderer(renderer: *mut SDL_Renderer);

    pub fn SDL_RWFromFile(file: *const c_char, mode: *const c_char) -> *mut SDL_RWops;
    pub fn SDL_RWclose(context: *mut SDL_RWops) -> c_int;
    pub fn SDL_LoadBMP_RW(src: *mut SDL_RWops, freesrc: c_int) -> *mut SDL_Surface;
    pub fn SDL_FreeSurface(surface: *mut SDL_Surface);
    pub fn SDL_FillRect(dst: *mut SDL_Surface, rect: *const Rect, color: u32) -> c_int;
    pub fn SDL_UpperBlit(
        src: *mut SDL_Surface,
        srcrect: *const Rect,
        dst: *mut SDL_Surface,
        dstrect: *mut Rect,
    ) -> c_int;

    pub fn SDL_CreateTextureFromSurface(
        renderer: *mut SDL_Renderer,
        surface: *mut SDL_Surface,
    ) -> *mut SDL_Texture;
    pub fn SDL_DestroyTexture(texture: *mut SDL_Texture);
    pub fn SDL_QueryTexture(
        texture: *mut SDL_Texture,
        format: *mut u32,
        access: *mut c_int,
        w: *mut c_int,
        h: *mut c_int,
    ) -> c_int;

    pub fn SDL_SetRenderDrawColor(renderer: *mut SDL_Renderer, r: u8, g: u8, b: u8, a: u8) -> c_int;
    pub fn SDL_RenderClear(renderer: *mut SDL_Renderer) -> c_int;
    pub fn SDL_SetRenderDrawBlendMode(renderer: *mut SDL_Renderer, mode: c_int) -> c_int;
    pub fn SDL_RenderFillRect(renderer: *mut SDL_Renderer, rect: *const Rect) -> c_int;
    pub fn SDL_RenderDrawRect(renderer: *mut SDL_Renderer, rect: *const Rect) -> c_int;
    pub fn SDL_RenderDrawLine(renderer: *mut SDL_Renderer, x1: c_int, y1: c_int, x2: c_int, y2: c_int) -> c_int;
    pub fn SDL_RenderDrawLines(renderer: *mut SDL_Renderer, points: *const Point, count: c_int) -> c_int;
    pub fn SDL_RenderCopy(
        renderer: *mut SDL_Renderer,
        texture: *mut SDL_Texture,
        srcrect: *const Rect,
        dstrect: *const Rect,
    ) -> c_int;
    pub fn SDL_RenderCopyEx(
        renderer: *mut SDL_Renderer,
        texture: *mut SDL_Texture,
        srcrect: *const Rect,
        dstrect: *const Rect,
        angle: f64,
        center: *const Point,
        flip: c_int,
    ) -> c_int;
    pub fn SDL_RenderSetScale(renderer: *mut SDL_Renderer, scale_x: f32, scale_y: f32) -> c_int;
    pub fn SDL_RenderSetViewport(renderer: *mut SDL_Renderer, rect: *const Rect) -> c_int;
    pub fn SDL_RenderPresent(renderer: *mut SDL_Renderer);

    pub fn SDL_AddTimer(interval: u32, callback: SDL_TimerCallback, param: *mut c_void) -> SDL_TimerID;
    pub fn SDL_RemoveTimer(id: SDL_TimerID) -> c_int;

    pub fn SDL_PollEvent(event: *mut SDL_Event) -> c_int;
    pub fn SDL_GetTicks() -> u32;
    pub fn SDL_Delay(ms: u32);
}

#[link(name = "SDL2_image")]
extern "C" {
    pub fn IMG_Load(file: *const c_char) -> *mut SDL_Surface;
}

#[link(name = "SDL2_ttf")]
extern "C" {
    pub fn TTF_Init() -> c_int;
    pub fn TTF_Quit();
    pub fn TTF_OpenFont(file: *const c_char, ptsize: c_int) -> *mut TTF_Font;
    pub fn TTF_CloseFont(font: *mut TTF_Font);
    pub fn TTF_RenderUTF8_Blended(font: *mut TTF_Font, text: *const c_char, fg: Color) -> *mut SDL_Surface;
    pub fn TTF_RenderText_Solid(font: *mut TTF_Font, text: *const c_char, fg: Color) -> *mut SDL_Surface;
}

#[link(name = "SDL2_mixer")]
extern "C" {
    pub fn Mix_Init(flags: c_int) -> c_int;
    pub fn Mix_Quit();
    pub fn Mix_OpenAudio(frequency: c_int, format: u16, channels: c_int, chunksize: c_int) -> c_int;
    pub fn Mix_CloseAudio();
    pub fn Mix_LoadWAV_RW(src: *mut SDL_RWops, freesrc: c_int) -> *mut Mix_Chunk;
    pub fn Mix_FreeChunk(chunk: *mut Mix_Chunk);
    pub fn Mix_PlayChannelTimed(channel: c_int, chunk: *mut Mix_Chunk, loops: c_int, ticks: c_int) -> c_int;
}
