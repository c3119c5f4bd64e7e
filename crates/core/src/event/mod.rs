//! Input events.

use serde::{Deserialize, Serialize};

/// Input event popped from the native queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The user asked the application to close (window close button, signal).
    Quit,
    KeyDown { keycode: i32 },
    KeyUp { keycode: i32 },
    MouseMotion { x: i32, y: i32 },
    MouseButtonDown { x: i32, y: i32 },
    /// Any event type the wrappers do not decode.
    Other { kind: u32 },
}

impl Event {
    pub fn is_quit(&self) -> bool {
        matches!(self, Event::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripted_events() {
        let events: Vec<Event> = serde_json::from_str(
            r#"[{"type":"key_down","keycode":27},{"type":"mouse_motion","x":3,"y":4},{"type":"quit"}]"#,
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                Event::KeyDown { keycode: 27 },
                Event::MouseMotion { x: 3, y: 4 },
                Event::Quit
            ]
        );
        assert!(events[2].is_quit());
    }
}
