//! Fixed-rate frame loop driving event polling and rendering.

use tracing::trace;

use crate::{backend::Backend, guard::CoreGuard, Result, SdlError};

/// Counters reported when a [`FrameLoop`] stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub events: u64,
    /// Whether the loop stopped on a quit event rather than the frame cap.
    pub quit: bool,
}

/// Fixed-rate poll/render/sleep loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLoop {
    budget_ms: u32,
    max_frames: Option<u64>,
}

impl FrameLoop {
    pub fn new(frame_rate: u32) -> Result<Self> {
        if frame_rate == 0 {
            return Err(SdlError::InvalidArgument(
                "frame rate must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            budget_ms: 1000 / frame_rate,
            max_frames: None,
        })
    }

    /// Stops after `max_frames` rendered frames even without a quit event.
    pub fn with_frame_cap(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn budget_ms(&self) -> u32 {
        self.budget_ms
    }

    /// Runs until a quit event arrives or the frame cap is reached. Each
    /// iteration drains pending events, renders one frame and sleeps for the
    /// rest of the frame budget. An error from `render` ends the loop and is
    /// returned as is.
    pub fn run<B, F>(&self, core: &CoreGuard<'_, B>, mut render: F) -> Result<FrameStats>
    where
        B: Backend,
        F: FnMut(u64) -> Result<()>,
    {
        let mut stats = FrameStats::default();

        loop {
            if self.max_frames.is_some_and(|max| stats.frames >= max) {
                return Ok(stats);
            }

            let begin = core.ticks();
            for event in core.poll_iter() {
                stats.events += 1;
                trace!(?event, "event");
                if event.is_quit() {
                    stats.quit = true;
                    return Ok(stats);
                }
            }

            render(stats.frames)?;
            stats.frames += 1;

            let cost = core.ticks().wrapping_sub(begin);
            if self.budget_ms > cost {
                core.delay(self.budget_ms - cost);
            }
        }
    }
}
