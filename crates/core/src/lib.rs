//! Scoped ownership for SDL2, SDL2_image, SDL2_ttf and SDL2_mixer.
//!
//! Every native resource is held by a value that releases it exactly once
//! when dropped, and every library-wide initialisation by a guard that shuts
//! the library down when dropped. Resources borrow the guard or parent
//! resource they depend on, so the borrow checker enforces release order.
//!
//! All native calls go through a [`Backend`]. [`HeadlessBackend`] runs without
//! a display and counts every acquisition and release; `SdlBackend` (cargo
//! feature `sdl`) links the real libraries.

pub mod assets;
pub mod backend;
pub mod config;
pub mod demo;
pub mod error;
pub mod event;
pub mod frame;
pub mod geometry;
pub mod guard;
pub mod handle;
pub mod img;
pub mod mixer;
pub mod render;
pub mod scene;
pub mod timer;
pub mod ttf;
pub mod video;

pub use assets::SceneAssets;
#[cfg(feature = "sdl")]
pub use backend::SdlBackend;
pub use backend::{Backend, HeadlessBackend, RawHandle, ResourceKind};
pub use config::{AssetConfig, DemoConfig, FontConfig, WindowConfig};
pub use demo::run_demo;
pub use error::{Result, SdlError};
pub use event::Event;
pub use frame::{FrameLoop, FrameStats};
pub use geometry::{Color, Point, Rect};
pub use guard::{CoreGuard, InitFlags, Subsystem};
pub use handle::Owned;
pub use mixer::{AudioChunk, AudioDevice, AudioFormat, AudioSpec, MixerFlags, MixerGuard, RwStream};
pub use render::{BlendMode, Flip, Renderer, RendererFlags, Texture, TextureInfo};
pub use scene::Scene;
pub use timer::Timer;
pub use ttf::{Font, TtfGuard};
pub use video::{
    blit_surface, AsSurface, Surface, SurfaceInfo, Window, WindowFlags, WindowPos, WindowSpec,
    WindowSurface,
};
