//! Process-lifetime guards for the core subsystem.
//!
//! The text and audio guards live next to the resources they govern
//! ([`crate::ttf::TtfGuard`], [`crate::mixer::MixerGuard`],
//! [`crate::mixer::AudioDevice`]); all of them claim their slot in the
//! backend's [`GuardSet`] so that only one instance per subsystem can be alive.

use std::{cell::Cell, fmt};

use bitflags::bitflags;
use tracing::debug;

use crate::{backend::Backend, event::Event, Result, SdlError};

bitflags! {
    /// Subsystems passed to `SDL_Init`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InitFlags: u32 {
        const TIMER = 0x0000_0001;
        const AUDIO = 0x0000_0010;
        const VIDEO = 0x0000_0020;
        const JOYSTICK = 0x0000_0200;
        const HAPTIC = 0x0000_1000;
        const GAMECONTROLLER = 0x0000_2000;
        const EVENTS = 0x0000_4000;
        const SENSOR = 0x0000_8000;
        const EVERYTHING = Self::TIMER.bits()
            | Self::AUDIO.bits()
            | Self::VIDEO.bits()
            | Self::JOYSTICK.bits()
            | Self::HAPTIC.bits()
            | Self::GAMECONTROLLER.bits()
            | Self::EVENTS.bits()
            | Self::SENSOR.bits();
    }
}

/// Global library state that a guard acquires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Core,
    Ttf,
    Mixer,
    AudioDevice,
}

impl Subsystem {
    pub fn name(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Ttf => "ttf",
            Self::Mixer => "mixer",
            Self::AudioDevice => "audio device",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One claim flag per [`Subsystem`]. Every backend owns one.
#[derive(Default)]
pub struct GuardSet {
    claimed: [Cell<bool>; 4],
}

impl GuardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the subsystem as guarded. Returns `false` when it already was.
    pub fn claim(&self, subsystem: Subsystem) -> bool {
        !self.claimed[subsystem.index()].replace(true)
    }

    pub fn release(&self, subsystem: Subsystem) {
        self.claimed[subsystem.index()].set(false);
    }

    pub fn is_claimed(&self, subsystem: Subsystem) -> bool {
        self.claimed[subsystem.index()].get()
    }
}

impl fmt::Debug for GuardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardSet")
            .field("core", &self.is_claimed(Subsystem::Core))
            .field("ttf", &self.is_claimed(Subsystem::Ttf))
            .field("mixer", &self.is_claimed(Subsystem::Mixer))
            .field("audio_device", &self.is_claimed(Subsystem::AudioDevice))
            .finish()
    }
}

/// Claims `subsystem`, runs `acquire`, and gives the claim back if acquiring
/// fails.
pub(crate) fn acquire<B: Backend>(
    backend: &B,
    subsystem: Subsystem,
    acquire: impl FnOnce() -> Result<()>,
) -> Result<()> {
    if !backend.guards().claim(subsystem) {
        return Err(SdlError::AlreadyActive(subsystem));
    }

    if let Err(err) = acquire() {
        backend.guards().release(subsystem);
        return Err(err);
    }

    debug!(subsystem = subsystem.name(), "subsystem initialised");
    Ok(())
}

pub(crate) fn relinquish<B: Backend>(backend: &B, subsystem: Subsystem, shutdown: impl FnOnce()) {
    shutdown();
    backend.guards().release(subsystem);
    debug!(subsystem = subsystem.name(), "subsystem shut down");
}

/// Keeps the core library initialised (`SDL_Init` / `SDL_Quit`).
///
/// Every window, surface, timer and stream borrows this guard, so it cannot be
/// dropped or moved while one of them is alive:
///
/// ```compile_fail
/// use sdl_scoped_core::{CoreGuard, HeadlessBackend, InitFlags, Window, WindowSpec};
///
/// let backend = HeadlessBackend::new();
/// let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
/// let window = Window::new(&core, &WindowSpec::new("w", 10, 10)).unwrap();
/// drop(core);
/// drop(window);
/// ```
///
/// Guards cannot be duplicated either:
///
/// ```compile_fail
/// use sdl_scoped_core::{CoreGuard, HeadlessBackend, InitFlags};
///
/// let backend = HeadlessBackend::new();
/// let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
/// let copy = core.clone();
/// ```
pub struct CoreGuard<'b, B: Backend> {
    backend: &'b B,
    flags: InitFlags,
}

impl<'b, B: Backend> CoreGuard<'b, B> {
    pub fn init(backend: &'b B, flags: InitFlags) -> Result<Self> {
        acquire(backend, Subsystem::Core, || {
            let status = backend.init(flags);
            if status < 0 {
                let message = backend.last_error();
                return Err(SdlError::native("SDL_Init", message));
            }
            Ok(())
        })?;

        Ok(Self { backend, flags })
    }

    pub fn flags(&self) -> InitFlags {
        self.flags
    }

    pub fn backend(&self) -> &'b B {
        self.backend
    }

    /// Pops one pending event, if any.
    pub fn poll_event(&self) -> Option<Event> {
        self.backend.poll_event()
    }

    /// Iterator that drains every event pending right now.
    pub fn poll_iter(&self) -> EventPump<'_, B> {
        EventPump {
            backend: self.backend,
        }
    }

    /// Milliseconds since the library was initialised.
    pub fn ticks(&self) -> u32 {
        self.backend.ticks()
    }

    /// Blocks the calling thread for `ms` milliseconds.
    pub fn delay(&self, ms: u32) {
        self.backend.delay(ms)
    }
}

impl<B: Backend> Drop for CoreGuard<'_, B> {
    fn drop(&mut self) {
        relinquish(self.backend, Subsystem::Core, || self.backend.quit());
    }
}

impl<B: Backend> fmt::Debug for CoreGuard<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreGuard")
            .field("flags", &self.flags)
            .finish()
    }
}

/// Draining iterator returned by [`CoreGuard::poll_iter`].
pub struct EventPump<'a, B: Backend> {
    backend: &'a B,
}

impl<B: Backend> Iterator for EventPump<'_, B> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.backend.poll_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn init_and_quit_track_the_subsystem() {
        let backend = HeadlessBackend::new();
        {
            let core = CoreGuard::init(&backend, InitFlags::VIDEO | InitFlags::AUDIO).unwrap();
            assert_eq!(core.flags(), InitFlags::VIDEO | InitFlags::AUDIO);
            assert!(backend.guards().is_claimed(Subsystem::Core));
            assert_eq!(backend.initialised(), InitFlags::VIDEO | InitFlags::AUDIO);
        }
        assert!(!backend.guards().is_claimed(Subsystem::Core));
        assert_eq!(backend.initialised(), InitFlags::empty());
    }

    #[test]
    fn second_guard_for_the_same_subsystem_is_refused() {
        let backend = HeadlessBackend::new();
        let _core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();

        let err = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap_err();
        assert!(matches!(err, SdlError::AlreadyActive(Subsystem::Core)));
    }

    #[test]
    fn guard_can_be_recreated_after_drop() {
        let backend = HeadlessBackend::new();
        drop(CoreGuard::init(&backend, InitFlags::VIDEO).unwrap());
        assert!(CoreGuard::init(&backend, InitFlags::VIDEO).is_ok());
    }

    #[test]
    fn failed_init_releases_the_claim() {
        let backend = HeadlessBackend::new();
        backend.fail_next("SDL_Init", "No available video device");

        let err = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap_err();
        assert_eq!(
            err.to_string(),
            "SDL_Init() failed, errMsg: No available video device"
        );
        assert!(!backend.guards().is_claimed(Subsystem::Core));
        assert!(CoreGuard::init(&backend, InitFlags::VIDEO).is_ok());
    }

    #[test]
    fn poll_iter_drains_pending_events() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::VIDEO).unwrap();
        backend.push_event(Event::KeyDown { keycode: 32 });
        backend.push_event(Event::Quit);

        let events: Vec<_> = core.poll_iter().collect();
        assert_eq!(events, vec![Event::KeyDown { keycode: 32 }, Event::Quit]);
        assert_eq!(core.poll_event(), None);
    }

    #[test]
    fn guard_set_claims_are_exclusive() {
        let set = GuardSet::new();
        assert!(set.claim(Subsystem::Ttf));
        assert!(!set.claim(Subsystem::Ttf));
        assert!(set.claim(Subsystem::Mixer));
        set.release(Subsystem::Ttf);
        assert!(set.claim(Subsystem::Ttf));
    }
}
