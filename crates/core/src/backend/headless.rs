//! In-memory backend.
//!
//! Follows the native conventions of the real library (null handles, negative
//! status codes, a last-error string) without a display or audio hardware.
//! Surfaces hold real ARGB pixel buffers, renderers keep a log of the draw
//! calls they received, time is a virtual millisecond counter advanced by
//! `delay`, and timers fire synchronously while it advances.
//!
//! Every owning creation and every release is counted per [`ResourceKind`],
//! and releasing a handle that is unknown, of the wrong kind, or borrowed
//! (the window's own surface) is recorded in
//! [`HeadlessBackend::invalid_releases`] instead of being performed.

use std::{
    cell::{RefCell, RefMut},
    collections::{BTreeMap, HashMap, VecDeque},
    ffi::CStr,
    fmt, fs,
};

use tracing::trace;

use super::{Backend, RawHandle, TimerCallback};
use crate::{
    event::Event,
    geometry::{Color, Point, Rect},
    guard::{GuardSet, InitFlags},
    mixer::{AudioSpec, MixerFlags},
    render::{BlendMode, Flip, RendererFlags, TextureInfo},
    video::{SurfaceInfo, WindowFlags},
};

/// `SDL_PIXELFORMAT_ARGB8888`.
const PIXEL_FORMAT_ARGB8888: u32 = 0x1636_2004;

/// Mixing channels allocated by `Mix_OpenAudio`.
const MIX_CHANNELS: usize = 8;

/// What a mixing channel is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Playback {
    chunk: HeadlessHandle,
    forever: bool,
}

/// Raw handle of the headless backend. Zero is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlessHandle(u32);

impl HeadlessHandle {
    pub const NULL: HeadlessHandle = HeadlessHandle(0);

    pub fn id(self) -> u32 {
        self.0
    }
}

impl RawHandle for HeadlessHandle {
    fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Resource kinds tracked by the headless backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Window,
    Renderer,
    Surface,
    Texture,
    Font,
    Timer,
    Chunk,
    Stream,
}

/// One call recorded by a headless renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    SetColor(Color),
    Clear,
    SetBlendMode(BlendMode),
    FillRect(Option<Rect>),
    DrawRect(Option<Rect>),
    Line(Point, Point),
    Lines(Vec<Point>),
    Copy {
        texture: HeadlessHandle,
        src: Option<Rect>,
        dst: Option<Rect>,
    },
    CopyEx {
        texture: HeadlessHandle,
        src: Option<Rect>,
        dst: Option<Rect>,
        angle: f64,
        center: Option<Point>,
        flip: Flip,
    },
    SetScale(f32, f32),
    SetViewport(Option<Rect>),
    Present,
}

struct Pixels {
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
    data: Vec<u32>,
}

impl Pixels {
    fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
            data: vec![0; width as usize * height as usize],
        }
    }

    fn bounds(&self) -> Rect {
        Rect::sized(self.width as i32, self.height as i32)
    }

    fn info(&self) -> SurfaceInfo {
        let row = self.width * self.bytes_per_pixel;
        SurfaceInfo {
            width: self.width,
            height: self.height,
            pitch: (row + 3) & !3,
        }
    }

    fn get(&self, x: i32, y: i32) -> u32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    fn set(&mut self, x: i32, y: i32, value: u32) {
        let width = self.width as usize;
        self.data[y as usize * width + x as usize] = value;
    }

    fn fill(&mut self, rect: Rect, value: u32) {
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                self.set(x, y, value);
            }
        }
    }
}

enum Entry {
    Window {
        surface: HeadlessHandle,
        renderer: Option<HeadlessHandle>,
        updates: u64,
    },
    Renderer {
        window: HeadlessHandle,
        log: Vec<DrawCommand>,
        presented: u64,
    },
    Surface(Pixels),
    Texture {
        width: u32,
        height: u32,
    },
    Font {
        point_size: i32,
    },
    Stream {
        path: String,
        len: u64,
    },
    Chunk,
    Timer,
}

struct Slot {
    kind: ResourceKind,
    borrowed: bool,
    entry: Entry,
}

struct TimerSlot {
    interval: u32,
    next_fire: u32,
    callback: Option<TimerCallback>,
    active: bool,
}

struct State {
    next_id: u32,
    slots: HashMap<HeadlessHandle, Slot>,
    created: HashMap<ResourceKind, usize>,
    released: HashMap<ResourceKind, usize>,
    invalid_releases: Vec<String>,
    error: String,
    forced: HashMap<&'static str, String>,
    initialised: InitFlags,
    ttf: bool,
    decoders: MixerFlags,
    mixer: Option<MixerFlags>,
    audio: Option<AudioSpec>,
    channels: Vec<Option<Playback>>,
    events: VecDeque<Event>,
    ticks: u32,
    timers: BTreeMap<HeadlessHandle, TimerSlot>,
}

impl State {
    fn new() -> Self {
        Self {
            next_id: 1,
            slots: HashMap::new(),
            created: HashMap::new(),
            released: HashMap::new(),
            invalid_releases: Vec::new(),
            error: String::new(),
            forced: HashMap::new(),
            initialised: InitFlags::empty(),
            ttf: false,
            decoders: MixerFlags::all(),
            mixer: None,
            audio: None,
            channels: Vec::new(),
            events: VecDeque::new(),
            ticks: 0,
            timers: BTreeMap::new(),
        }
    }

    fn insert(&mut self, kind: ResourceKind, entry: Entry, borrowed: bool) -> HeadlessHandle {
        let handle = HeadlessHandle(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            handle,
            Slot {
                kind,
                borrowed,
                entry,
            },
        );
        if !borrowed {
            *self.created.entry(kind).or_default() += 1;
        }
        trace!(?kind, ?handle, borrowed, "headless handle created");
        handle
    }

    fn release(&mut self, kind: ResourceKind, handle: HeadlessHandle) -> Option<Entry> {
        match self.slots.get(&handle) {
            Some(slot) if slot.kind == kind && !slot.borrowed => {}
            Some(slot) if slot.borrowed => {
                self.invalid_releases
                    .push(format!("{kind:?} {} is borrowed", handle.0));
                return None;
            }
            Some(slot) => {
                self.invalid_releases.push(format!(
                    "{kind:?} {} is a {:?}",
                    handle.0, slot.kind
                ));
                return None;
            }
            None => {
                self.invalid_releases
                    .push(format!("{kind:?} {} is not alive", handle.0));
                return None;
            }
        }

        let slot = self.slots.remove(&handle)?;
        *self.released.entry(kind).or_default() += 1;
        trace!(?kind, ?handle, "headless handle released");
        Some(slot.entry)
    }

    fn entry(&mut self, kind: ResourceKind, handle: HeadlessHandle) -> Result<&mut Entry, String> {
        match self.slots.get_mut(&handle) {
            Some(slot) if slot.kind == kind => Ok(&mut slot.entry),
            _ => Err(format!("Invalid {}", kind_name(kind))),
        }
    }

    fn pixels(&mut self, handle: HeadlessHandle) -> Result<&mut Pixels, String> {
        match self.entry(ResourceKind::Surface, handle)? {
            Entry::Surface(pixels) => Ok(pixels),
            _ => Err("Invalid surface".to_string()),
        }
    }

    fn renderer_log(&mut self, handle: HeadlessHandle) -> Result<&mut Vec<DrawCommand>, String> {
        match self.entry(ResourceKind::Renderer, handle)? {
            Entry::Renderer { log, .. } => Ok(log),
            _ => Err("Invalid renderer".to_string()),
        }
    }

    fn texture_exists(&self, handle: HeadlessHandle) -> Result<(), String> {
        match self.slots.get(&handle) {
            Some(slot) if slot.kind == ResourceKind::Texture => Ok(()),
            _ => Err("Invalid texture".to_string()),
        }
    }

    fn decoded_surface(&mut self, image: ::image::DynamicImage) -> HeadlessHandle {
        let rgba = image.to_rgba8();
        let mut pixels = Pixels::new(rgba.width(), rgba.height(), 4);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            pixels.set(x as i32, y as i32, Color::rgba(r, g, b, a).to_argb());
        }
        self.insert(ResourceKind::Surface, Entry::Surface(pixels), false)
    }
}

fn kind_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Window => "window",
        ResourceKind::Renderer => "renderer",
        ResourceKind::Surface => "surface",
        ResourceKind::Texture => "texture",
        ResourceKind::Font => "font",
        ResourceKind::Timer => "timer",
        ResourceKind::Chunk => "chunk",
        ResourceKind::Stream => "RWops",
    }
}

fn text(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

fn read_file(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|_| format!("Couldn't open {path}"))
}

/// Clips a blit of `src_rect` (in `src`) placed at `at` (in `dst`). Returns
/// the source origin and the destination rectangle that survive clipping.
fn clip_blit(src: Rect, src_rect: Option<&Rect>, dst: Rect, at: Point) -> Option<(Point, Rect)> {
    let wanted = src_rect.copied().unwrap_or(src);
    let source = wanted.intersection(&src)?;
    let shifted = Rect::new(
        at.x.saturating_add(source.x.saturating_sub(wanted.x)),
        at.y.saturating_add(source.y.saturating_sub(wanted.y)),
        source.w,
        source.h,
    );
    let placed = shifted.intersection(&dst)?;
    let origin = Point::new(
        source.x.saturating_add(placed.x.saturating_sub(shifted.x)),
        source.y.saturating_add(placed.y.saturating_sub(shifted.y)),
    );
    Some((origin, placed))
}

/// Backend that needs no display, audio device or native libraries.
pub struct HeadlessBackend {
    guards: GuardSet,
    state: RefCell<State>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessBackend")
            .field("guards", &self.guards)
            .field("live", &state.slots.len())
            .field("ticks", &state.ticks)
            .finish()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            guards: GuardSet::new(),
            state: RefCell::new(State::new()),
        }
    }

    /// Makes the next call to `call` fail with `message`.
    pub fn fail_next(&self, call: &'static str, message: impl Into<String>) {
        self.state.borrow_mut().forced.insert(call, message.into());
    }

    /// Queues an input event for `poll_event`.
    pub fn push_event(&self, event: Event) {
        self.state.borrow_mut().events.push_back(event);
    }

    pub fn push_events(&self, events: impl IntoIterator<Item = Event>) {
        self.state.borrow_mut().events.extend(events);
    }

    /// Restricts the decoders `Mix_Init` can load.
    pub fn set_available_decoders(&self, flags: MixerFlags) {
        self.state.borrow_mut().decoders = flags;
    }

    /// Owned handles of `kind` that are currently alive.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.state
            .borrow()
            .slots
            .values()
            .filter(|slot| slot.kind == kind && !slot.borrowed)
            .count()
    }

    /// Owned handles of every kind that are currently alive.
    pub fn live_total(&self) -> usize {
        self.state
            .borrow()
            .slots
            .values()
            .filter(|slot| !slot.borrowed)
            .count()
    }

    pub fn created(&self, kind: ResourceKind) -> usize {
        self.state.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    pub fn released(&self, kind: ResourceKind) -> usize {
        self.state.borrow().released.get(&kind).copied().unwrap_or(0)
    }

    /// Releases that were refused: double frees, frees of borrowed handles,
    /// frees with the wrong release function.
    pub fn invalid_releases(&self) -> Vec<String> {
        self.state.borrow().invalid_releases.clone()
    }

    pub fn initialised(&self) -> InitFlags {
        self.state.borrow().initialised
    }

    pub fn ttf_active(&self) -> bool {
        self.state.borrow().ttf
    }

    pub fn mixer_active(&self) -> bool {
        self.state.borrow().mixer.is_some()
    }

    pub fn audio_spec(&self) -> Option<AudioSpec> {
        self.state.borrow().audio
    }

    /// Number of mixing channels currently playing a chunk.
    pub fn playing_channels(&self) -> usize {
        self.state.borrow().channels.iter().flatten().count()
    }

    /// Draw calls received by `renderer`, oldest first.
    pub fn draw_log(&self, renderer: HeadlessHandle) -> Vec<DrawCommand> {
        self.state
            .borrow_mut()
            .renderer_log(renderer)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of `SDL_RenderPresent` calls on `renderer`.
    pub fn presented(&self, renderer: HeadlessHandle) -> u64 {
        match self.state.borrow().slots.get(&renderer) {
            Some(Slot {
                entry: Entry::Renderer { presented, .. },
                ..
            }) => *presented,
            _ => 0,
        }
    }

    /// Number of `SDL_UpdateWindowSurface` calls on `window`.
    pub fn window_updates(&self, window: HeadlessHandle) -> u64 {
        match self.state.borrow().slots.get(&window) {
            Some(Slot {
                entry: Entry::Window { updates, .. },
                ..
            }) => *updates,
            _ => 0,
        }
    }

    /// ARGB value of one surface pixel, `None` outside the surface.
    pub fn pixel(&self, surface: HeadlessHandle, x: i32, y: i32) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let pixels = state.pixels(surface).ok()?;
        if x < 0 || y < 0 || x >= pixels.width as i32 || y >= pixels.height as i32 {
            return None;
        }
        Some(pixels.get(x, y))
    }

    /// Borrows the state and consumes a forced failure for `call`, if one was
    /// queued with [`Self::fail_next`].
    fn begin(&self, call: &'static str) -> (RefMut<'_, State>, Option<String>) {
        let mut state = self.state.borrow_mut();
        let forced = state.forced.remove(call);
        (state, forced)
    }

    /// Runs `op` against the state and maps an error to `failed`, recording
    /// the message for `last_error`.
    fn call<T>(&self, call: &'static str, failed: T, op: impl FnOnce(&mut State) -> Result<T, String>) -> T {
        let (mut state, forced) = self.begin(call);
        let outcome = match forced {
            Some(message) => Err(message),
            None => op(&mut *state),
        };
        match outcome {
            Ok(value) => value,
            Err(message) => {
                state.error = message;
                failed
            }
        }
    }

    fn status(&self, call: &'static str, op: impl FnOnce(&mut State) -> Result<(), String>) -> i32 {
        self.call(call, -1, |state| op(state).map(|()| 0))
    }

    fn create(
        &self,
        call: &'static str,
        op: impl FnOnce(&mut State) -> Result<HeadlessHandle, String>,
    ) -> HeadlessHandle {
        self.call(call, HeadlessHandle::NULL, op)
    }

    fn draw(&self, call: &'static str, renderer: HeadlessHandle, command: DrawCommand) -> i32 {
        self.status(call, |state| {
            state.renderer_log(renderer)?.push(command);
            Ok(())
        })
    }

    fn release(&self, kind: ResourceKind, handle: HeadlessHandle) -> Option<Entry> {
        self.state.borrow_mut().release(kind, handle)
    }

    fn render_text(&self, call: &'static str, font: HeadlessHandle, text: &CStr, fg: Color, bytes_per_pixel: u32) -> HeadlessHandle {
        self.create(call, |state| {
            let point_size = match state.entry(ResourceKind::Font, font)? {
                Entry::Font { point_size } => *point_size,
                _ => return Err("Invalid font".to_string()),
            };
            let glyphs = text.to_string_lossy().chars().count() as u32;
            if glyphs == 0 {
                return Err("Text has zero width".to_string());
            }

            let advance = (point_size as u32 / 2).max(1);
            let mut pixels = Pixels::new(glyphs * advance, point_size as u32, bytes_per_pixel);
            let bounds = pixels.bounds();
            pixels.fill(bounds, fg.to_argb());
            Ok(state.insert(ResourceKind::Surface, Entry::Surface(pixels), false))
        })
    }
}

impl Backend for HeadlessBackend {
    type Window = HeadlessHandle;
    type Renderer = HeadlessHandle;
    type Surface = HeadlessHandle;
    type Texture = HeadlessHandle;
    type Font = HeadlessHandle;
    type Timer = HeadlessHandle;
    type Chunk = HeadlessHandle;
    type Stream = HeadlessHandle;

    fn guards(&self) -> &GuardSet {
        &self.guards
    }

    fn last_error(&self) -> String {
        self.state.borrow().error.clone()
    }

    fn init(&self, flags: InitFlags) -> i32 {
        self.status("SDL_Init", |state| {
            state.initialised |= flags;
            Ok(())
        })
    }

    fn quit(&self) {
        self.state.borrow_mut().initialised = InitFlags::empty();
    }

    fn ttf_init(&self) -> i32 {
        self.status("TTF_Init", |state| {
            state.ttf = true;
            Ok(())
        })
    }

    fn ttf_quit(&self) {
        self.state.borrow_mut().ttf = false;
    }

    fn mix_init(&self, flags: MixerFlags) -> MixerFlags {
        let (mut state, forced) = self.begin("Mix_Init");
        if let Some(message) = forced {
            state.error = message;
            return MixerFlags::empty();
        }

        let loaded = flags & state.decoders;
        if !loaded.contains(flags) {
            let missing = flags - loaded;
            state.error = format!("{missing:?} support not available");
        }
        let active = state.mixer.unwrap_or(MixerFlags::empty()) | loaded;
        state.mixer = Some(active);
        active
    }

    fn mix_quit(&self) {
        self.state.borrow_mut().mixer = None;
    }

    fn open_audio(&self, spec: &AudioSpec) -> i32 {
        self.status("Mix_OpenAudio", |state| {
            if state.audio.is_some() {
                return Err("Audio device is already opened".to_string());
            }
            if spec.frequency == 0 || spec.channels == 0 {
                return Err("Invalid audio specification".to_string());
            }
            state.audio = Some(*spec);
            state.channels = vec![None; MIX_CHANNELS];
            Ok(())
        })
    }

    fn close_audio(&self) {
        let mut state = self.state.borrow_mut();
        state.audio = None;
        state.channels.clear();
    }

    fn create_window(
        &self,
        _title: &CStr,
        _x: i32,
        _y: i32,
        w: i32,
        h: i32,
        _flags: WindowFlags,
    ) -> HeadlessHandle {
        self.create("SDL_CreateWindow", |state| {
            if !state.initialised.contains(InitFlags::VIDEO) {
                return Err("Video subsystem has not been initialized".to_string());
            }
            if w <= 0 || h <= 0 {
                return Err("Window size must be positive".to_string());
            }

            let surface = state.insert(
                ResourceKind::Surface,
                Entry::Surface(Pixels::new(w as u32, h as u32, 4)),
                true,
            );
            Ok(state.insert(
                ResourceKind::Window,
                Entry::Window {
                    surface,
                    renderer: None,
                    updates: 0,
                },
                false,
            ))
        })
    }

    fn destroy_window(&self, window: HeadlessHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(Entry::Window { surface, .. }) = state.release(ResourceKind::Window, window) {
            state.slots.remove(&surface);
        }
    }

    fn window_surface(&self, window: HeadlessHandle) -> HeadlessHandle {
        self.create("SDL_GetWindowSurface", |state| match state
            .entry(ResourceKind::Window, window)?
        {
            Entry::Window { surface, .. } => Ok(*surface),
            _ => Err("Invalid window".to_string()),
        })
    }

    fn update_window_surface(&self, window: HeadlessHandle) -> i32 {
        self.status("SDL_UpdateWindowSurface", |state| {
            match state.entry(ResourceKind::Window, window)? {
                Entry::Window { updates, .. } => {
                    *updates += 1;
                    Ok(())
                }
                _ => Err("Invalid window".to_string()),
            }
        })
    }

    fn create_renderer(&self, window: HeadlessHandle, index: i32, _flags: RendererFlags) -> HeadlessHandle {
        self.create("SDL_CreateRenderer", |state| {
            if index < -1 || index > 0 {
                return Err("index must be -1 or in the range of 0 - 0".to_string());
            }
            match state.entry(ResourceKind::Window, window)? {
                Entry::Window {
                    renderer: Some(_), ..
                } => return Err("Renderer already associated with window".to_string()),
                Entry::Window { .. } => {}
                _ => return Err("Invalid window".to_string()),
            }

            let renderer = state.insert(
                ResourceKind::Renderer,
                Entry::Renderer {
                    window,
                    log: Vec::new(),
                    presented: 0,
                },
                false,
            );
            if let Ok(Entry::Window { renderer: slot, .. }) = state.entry(ResourceKind::Window, window) {
                *slot = Some(renderer);
            }
            Ok(renderer)
        })
    }

    fn destroy_renderer(&self, renderer: HeadlessHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(Entry::Renderer { window, .. }) = state.release(ResourceKind::Renderer, renderer) {
            if let Ok(Entry::Window { renderer: slot, .. }) = state.entry(ResourceKind::Window, window) {
                *slot = None;
            }
        }
    }

    fn load_bmp(&self, path: &CStr) -> HeadlessHandle {
        let path = text(path);
        self.create("SDL_LoadBMP", |state| {
            let bytes = read_file(&path)?;
            if !bytes.starts_with(b"BM") {
                return Err("File is not a Windows BMP file".to_string());
            }
            let image = ::image::load_from_memory_with_format(&bytes, ::image::ImageFormat::Bmp)
                .map_err(|err| err.to_string())?;
            Ok(state.decoded_surface(image))
        })
    }

    fn img_load(&self, path: &CStr) -> HeadlessHandle {
        let path = text(path);
        self.create("IMG_Load", |state| {
            let bytes = read_file(&path)?;
            let image = ::image::load_from_memory(&bytes).map_err(|err| err.to_string())?;
            Ok(state.decoded_surface(image))
        })
    }

    fn free_surface(&self, surface: HeadlessHandle) {
        self.release(ResourceKind::Surface, surface);
    }

    fn surface_info(&self, surface: HeadlessHandle) -> SurfaceInfo {
        self.state
            .borrow_mut()
            .pixels(surface)
            .map(|pixels| pixels.info())
            .unwrap_or_default()
    }

    fn fill_rect(&self, surface: HeadlessHandle, rect: Option<&Rect>, color: u32) -> i32 {
        self.status("SDL_FillRect", |state| {
            let pixels = state.pixels(surface)?;
            let area = match rect {
                Some(rect) => rect.intersection(&pixels.bounds()),
                None => Some(pixels.bounds()),
            };
            if let Some(area) = area {
                pixels.fill(area, color);
            }
            Ok(())
        })
    }

    fn blit_surface(
        &self,
        src: HeadlessHandle,
        src_rect: Option<&Rect>,
        dst: HeadlessHandle,
        dst_rect: Option<&mut Rect>,
    ) -> i32 {
        self.status("SDL_BlitSurface", |state| {
            let source = state.pixels(src)?;
            let src_bounds = source.bounds();
            let src_width = source.width as usize;
            let copied = source.data.clone();

            let target = state.pixels(dst)?;
            let at = dst_rect
                .as_deref()
                .map(|rect| Point::new(rect.x, rect.y))
                .unwrap_or_default();

            let placed = clip_blit(src_bounds, src_rect, target.bounds(), at);
            if let Some((origin, area)) = placed {
                for row in 0..area.h {
                    for col in 0..area.w {
                        let sx = (origin.x + col) as usize;
                        let sy = (origin.y + row) as usize;
                        target.set(area.x + col, area.y + row, copied[sy * src_width + sx]);
                    }
                }
            }

            if let Some(out) = dst_rect {
                *out = match placed {
                    Some((_, area)) => area,
                    None => Rect::new(out.x, out.y, 0, 0),
                };
            }
            Ok(())
        })
    }

    fn create_texture_from_surface(&self, renderer: HeadlessHandle, surface: HeadlessHandle) -> HeadlessHandle {
        self.create("SDL_CreateTextureFromSurface", |state| {
            state.renderer_log(renderer)?;
            let info = state.pixels(surface)?.info();
            Ok(state.insert(
                ResourceKind::Texture,
                Entry::Texture {
                    width: info.width,
                    height: info.height,
                },
                false,
            ))
        })
    }

    fn destroy_texture(&self, texture: HeadlessHandle) {
        self.release(ResourceKind::Texture, texture);
    }

    fn query_texture(&self, texture: HeadlessHandle, info: &mut TextureInfo) -> i32 {
        self.status("SDL_QueryTexture", |state| {
            match state.entry(ResourceKind::Texture, texture)? {
                Entry::Texture { width, height } => {
                    *info = TextureInfo {
                        format: PIXEL_FORMAT_ARGB8888,
                        access: 0,
                        width: *width,
                        height: *height,
                    };
                    Ok(())
                }
                _ => Err("Invalid texture".to_string()),
            }
        })
    }

    fn set_render_draw_color(&self, renderer: HeadlessHandle, color: Color) -> i32 {
        self.draw("SDL_SetRenderDrawColor", renderer, DrawCommand::SetColor(color))
    }

    fn render_clear(&self, renderer: HeadlessHandle) -> i32 {
        self.draw("SDL_RenderClear", renderer, DrawCommand::Clear)
    }

    fn set_render_draw_blend_mode(&self, renderer: HeadlessHandle, mode: BlendMode) -> i32 {
        self.draw(
            "SDL_SetRenderDrawBlendMode",
            renderer,
            DrawCommand::SetBlendMode(mode),
        )
    }

    fn render_fill_rect(&self, renderer: HeadlessHandle, rect: Option<&Rect>) -> i32 {
        self.draw(
            "SDL_RenderFillRect",
            renderer,
            DrawCommand::FillRect(rect.copied()),
        )
    }

    fn render_draw_rect(&self, renderer: HeadlessHandle, rect: Option<&Rect>) -> i32 {
        self.draw(
            "SDL_RenderDrawRect",
            renderer,
            DrawCommand::DrawRect(rect.copied()),
        )
    }

    fn render_draw_line(&self, renderer: HeadlessHandle, from: Point, to: Point) -> i32 {
        self.draw("SDL_RenderDrawLine", renderer, DrawCommand::Line(from, to))
    }

    fn render_draw_lines(&self, renderer: HeadlessHandle, points: &[Point]) -> i32 {
        self.draw(
            "SDL_RenderDrawLines",
            renderer,
            DrawCommand::Lines(points.to_vec()),
        )
    }

    fn render_copy(
        &self,
        renderer: HeadlessHandle,
        texture: HeadlessHandle,
        src: Option<&Rect>,
        dst: Option<&Rect>,
    ) -> i32 {
        self.status("SDL_RenderCopy", |state| {
            state.texture_exists(texture)?;
            state.renderer_log(renderer)?.push(DrawCommand::Copy {
                texture,
                src: src.copied(),
                dst: dst.copied(),
            });
            Ok(())
        })
    }

    fn render_copy_ex(
        &self,
        renderer: HeadlessHandle,
        texture: HeadlessHandle,
        src: Option<&Rect>,
        dst: Option<&Rect>,
        angle: f64,
        center: Option<&Point>,
        flip: Flip,
    ) -> i32 {
        self.status("SDL_RenderCopyEx", |state| {
            state.texture_exists(texture)?;
            state.renderer_log(renderer)?.push(DrawCommand::CopyEx {
                texture,
                src: src.copied(),
                dst: dst.copied(),
                angle,
                center: center.copied(),
                flip,
            });
            Ok(())
        })
    }

    fn render_set_scale(&self, renderer: HeadlessHandle, scale_x: f32, scale_y: f32) -> i32 {
        self.status("SDL_RenderSetScale", |state| {
            if scale_x <= 0.0 || scale_y <= 0.0 {
                return Err("Scale must be positive".to_string());
            }
            state
                .renderer_log(renderer)?
                .push(DrawCommand::SetScale(scale_x, scale_y));
            Ok(())
        })
    }

    fn render_set_viewport(&self, renderer: HeadlessHandle, rect: Option<&Rect>) -> i32 {
        self.draw(
            "SDL_RenderSetViewport",
            renderer,
            DrawCommand::SetViewport(rect.copied()),
        )
    }

    fn render_present(&self, renderer: HeadlessHandle) {
        let mut state = self.state.borrow_mut();
        if let Ok(Entry::Renderer { log, presented, .. }) = state.entry(ResourceKind::Renderer, renderer) {
            log.push(DrawCommand::Present);
            *presented += 1;
        }
    }

    fn open_font(&self, path: &CStr, point_size: i32) -> HeadlessHandle {
        let path = text(path);
        self.create("TTF_OpenFont", |state| {
            if !state.ttf {
                return Err("Library not initialized".to_string());
            }
            if point_size <= 0 {
                return Err("Couldn't set font size".to_string());
            }
            fs::metadata(&path).map_err(|_| format!("Couldn't open {path}"))?;
            Ok(state.insert(ResourceKind::Font, Entry::Font { point_size }, false))
        })
    }

    fn close_font(&self, font: HeadlessHandle) {
        self.release(ResourceKind::Font, font);
    }

    fn render_utf8_blended(&self, font: HeadlessHandle, text: &CStr, fg: Color) -> HeadlessHandle {
        self.render_text("TTF_RenderUTF8_Blended", font, text, fg, 4)
    }

    fn render_text_solid(&self, font: HeadlessHandle, text: &CStr, fg: Color) -> HeadlessHandle {
        self.render_text("TTF_RenderText_Solid", font, text, fg, 1)
    }

    fn rw_from_file(&self, path: &CStr, mode: &CStr) -> HeadlessHandle {
        let path = text(path);
        let mode = text(mode);
        self.create("SDL_RWFromFile", |state| {
            let mut options = fs::OpenOptions::new();
            match mode.chars().next() {
                Some('r') => options.read(true),
                Some('w') => options.write(true).create(true).truncate(true),
                Some('a') => options.append(true).create(true),
                _ => return Err(format!("Unsupported file mode {mode}")),
            };
            if mode.contains('+') {
                options.read(true).write(true);
            }

            let file = options
                .open(&path)
                .map_err(|_| format!("Couldn't open {path}"))?;
            let len = file.metadata().map(|meta| meta.len()).unwrap_or(0);
            Ok(state.insert(ResourceKind::Stream, Entry::Stream { path, len }, false))
        })
    }

    fn rw_close(&self, stream: HeadlessHandle) {
        self.release(ResourceKind::Stream, stream);
    }

    fn load_wav_rw(&self, stream: HeadlessHandle, free_src: bool) -> HeadlessHandle {
        let (mut state, forced) = self.begin("Mix_LoadWAV_RW");
        let source = match state.entry(ResourceKind::Stream, stream) {
            Ok(Entry::Stream { path, len }) => Ok((path.clone(), *len)),
            _ => Err("Passed a NULL data source".to_string()),
        };
        if free_src && source.is_ok() {
            state.release(ResourceKind::Stream, stream);
        }

        let outcome = match (forced, source) {
            (Some(message), _) | (None, Err(message)) => Err(message),
            (None, Ok(_)) if state.audio.is_none() => {
                Err("Audio device hasn't been opened".to_string())
            }
            (None, Ok((path, 0))) => Err(format!("Unrecognized audio format in {path}")),
            (None, Ok(_)) => Ok(state.insert(ResourceKind::Chunk, Entry::Chunk, false)),
        };

        match outcome {
            Ok(chunk) => chunk,
            Err(message) => {
                state.error = message;
                HeadlessHandle::NULL
            }
        }
    }

    fn free_chunk(&self, chunk: HeadlessHandle) {
        if self.release(ResourceKind::Chunk, chunk).is_some() {
            // Freeing a chunk halts every channel playing it.
            for channel in &mut self.state.borrow_mut().channels {
                if channel.is_some_and(|playback| playback.chunk == chunk) {
                    *channel = None;
                }
            }
        }
    }

    fn play_channel(&self, channel: i32, chunk: HeadlessHandle, loops: i32) -> i32 {
        self.call("Mix_PlayChannel", -1, |state| {
            if state.audio.is_none() {
                return Err("Audio device hasn't been opened".to_string());
            }
            if !matches!(state.entry(ResourceKind::Chunk, chunk)?, Entry::Chunk) {
                return Err("Tried to play a NULL chunk".to_string());
            }

            let slot = if channel < 0 {
                state
                    .channels
                    .iter()
                    .position(Option::is_none)
                    .ok_or_else(|| "No free channels available".to_string())?
            } else if (channel as usize) < state.channels.len() {
                channel as usize
            } else {
                return Err("Invalid channel specified".to_string());
            };
            state.channels[slot] = Some(Playback {
                chunk,
                forever: loops < 0,
            });
            Ok(slot as i32)
        })
    }

    fn add_timer(&self, interval: u32, callback: TimerCallback) -> HeadlessHandle {
        self.create("SDL_AddTimer", |state| {
            let handle = state.insert(ResourceKind::Timer, Entry::Timer, false);
            let next_fire = state.ticks.saturating_add(interval.max(1));
            state.timers.insert(
                handle,
                TimerSlot {
                    interval,
                    next_fire,
                    callback: Some(callback),
                    active: true,
                },
            );
            Ok(handle)
        })
    }

    fn remove_timer(&self, timer: HeadlessHandle) {
        let mut state = self.state.borrow_mut();
        if state.release(ResourceKind::Timer, timer).is_some() {
            state.timers.remove(&timer);
        }
    }

    fn poll_event(&self) -> Option<Event> {
        self.state.borrow_mut().events.pop_front()
    }

    fn ticks(&self) -> u32 {
        self.state.borrow().ticks
    }

    fn delay(&self, ms: u32) {
        let target = self.state.borrow().ticks.saturating_add(ms);

        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                let next = state
                    .timers
                    .iter()
                    .filter(|(_, slot)| slot.active && slot.next_fire <= target)
                    .min_by_key(|(_, slot)| slot.next_fire)
                    .map(|(handle, slot)| (*handle, slot.next_fire, slot.interval));

                match next {
                    Some((handle, fire_at, interval)) => {
                        state.ticks = fire_at;
                        let callback = state
                            .timers
                            .get_mut(&handle)
                            .and_then(|slot| slot.callback.take());
                        callback.map(|callback| (handle, interval, callback))
                    }
                    None => None,
                }
            };

            let Some((handle, interval, mut callback)) = due else {
                break;
            };

            // The state borrow is released while user code runs.
            let next_interval = callback(interval);

            let mut state = self.state.borrow_mut();
            let now = state.ticks;
            if let Some(slot) = state.timers.get_mut(&handle) {
                slot.callback = Some(callback);
                if next_interval == 0 {
                    slot.active = false;
                } else {
                    slot.interval = next_interval;
                    slot.next_fire = now.saturating_add(next_interval);
                }
            }
        }

        let mut state = self.state.borrow_mut();
        state.ticks = target;
        if ms > 0 {
            // Finite plays are over by the time the clock moves on.
            for channel in &mut state.channels {
                if channel.is_some_and(|playback| !playback.forever) {
                    *channel = None;
                }
            }
        }
    }
}
