//! Toolkit-neutral input events.
//!
//! The window driver translates its native events into these calls; the
//! controller state implements [`InputSink`] and never sees the toolkit.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Character(char),
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub control: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        control: false,
        shift: false,
        alt: false,
    };

    pub const CONTROL: Self = Self {
        control: true,
        shift: false,
        alt: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

/// Receiver of input callbacks, invoked synchronously from the event poll.
pub trait InputSink {
    fn on_key(&mut self, key: Key, pressed: bool, modifiers: Modifiers);

    /// Text input, delivered once per typed character.
    fn on_char(&mut self, ch: char);

    fn on_mouse_button(&mut self, button: MouseButton, pressed: bool);

    /// Cursor position in window pixels, origin top-left.
    fn on_cursor_move(&mut self, x: f64, y: f64);

    fn on_scroll(&mut self, dx: f64, dy: f64);
}

/// Tracks the cursor between move events and whether a drag is in progress.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MouseState {
    position: Option<(f64, f64)>,
    dragging: bool,
}

impl MouseState {
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    /// Records the new position and returns the delta while dragging.
    ///
    /// The first move after start-up only seeds the position.
    pub fn move_to(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        let previous = self.position.replace((x, y))?;
        self.dragging.then(|| (x - previous.0, y - previous.1))
    }
}
