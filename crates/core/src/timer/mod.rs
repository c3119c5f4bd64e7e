//! Scheduled callbacks (`SDL_AddTimer` / `SDL_RemoveTimer`).

use crate::{
    backend::Backend,
    guard::CoreGuard,
    handle::{HandleKind, Owned},
    Result,
};

/// Marker for timer registrations.
pub enum TimerKind {}

impl<B: Backend> HandleKind<B> for TimerKind {
    type Raw = B::Timer;
    const NAME: &'static str = "timer";

    fn release(backend: &B, raw: Self::Raw) {
        backend.remove_timer(raw);
    }
}

/// A registered `SDL_AddTimer` callback. Dropping it removes the timer and
/// frees the callback.
pub type Timer<'a, B> = Owned<'a, B, TimerKind>;

impl<'a, B: Backend> Owned<'a, B, TimerKind> {
    /// Schedules `callback` to run after `interval_ms`. The callback runs on
    /// a thread owned by the native library; its return value is the next
    /// interval and 0 stops the timer.
    pub fn new<F>(core: &'a CoreGuard<'_, B>, interval_ms: u32, callback: F) -> Result<Self>
    where
        F: FnMut(u32) -> u32 + Send + 'static,
    {
        let backend = core.backend();
        let raw = backend.add_timer(interval_ms, Box::new(callback));
        Self::create(backend, "SDL_AddTimer", raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        backend::{HeadlessBackend, ResourceKind},
        guard::InitFlags,
    };

    #[test]
    fn fires_while_the_clock_advances() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::TIMER).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        let timer = Timer::new(&core, 10, move |interval| {
            counter.fetch_add(1, Ordering::SeqCst);
            interval
        })
        .unwrap();

        core.delay(35);
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        drop(timer);
        core.delay(50);
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert_eq!(backend.released(ResourceKind::Timer), 1);
    }

    #[test]
    fn returning_zero_stops_the_timer() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::TIMER).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        let _timer = Timer::new(&core, 5, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        })
        .unwrap();

        core.delay(100);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_registration_names_the_call() {
        let backend = HeadlessBackend::new();
        let core = CoreGuard::init(&backend, InitFlags::TIMER).unwrap();
        backend.fail_next("SDL_AddTimer", "Timer subsystem not initialized");

        let err = Timer::new(&core, 5, |interval| interval).unwrap_err();
        assert_eq!(err.call(), Some("SDL_AddTimer"));
        assert_eq!(backend.live(ResourceKind::Timer), 0);
    }
}
