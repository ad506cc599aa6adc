//! Input boundary
//!
//! The platform layer feeds raw key and button transitions into
//! [`InputState`]; the camera controller polls it once per frame.

pub mod picking;

pub use picking::MouseState;

use std::collections::HashMap;

use crate::foundation::math::Vec2;

/// Per-key and per-button state machine
///
/// `Down` and `Up` last exactly one frame: [`InputState::advance`] turns
/// them into `Repeat` and `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyState {
    /// Not pressed
    #[default]
    Idle,
    /// Pressed this frame
    Down,
    /// Held since an earlier frame
    Repeat,
    /// Released this frame
    Up,
}

impl KeyState {
    /// Down or Repeat
    pub fn is_pressed(self) -> bool {
        matches!(self, KeyState::Down | KeyState::Repeat)
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// Q key
    Q,
    /// S key
    S,
    /// W key
    W,
    /// Left shift
    LeftShift,
    /// Delete key
    Delete,
    /// Escape key
    Escape,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Keyboard and mouse state for one frame
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: HashMap<KeyCode, KeyState>,
    buttons: HashMap<MouseButton, KeyState>,
    mouse_motion: Vec2,
    wheel: f32,
}

impl InputState {
    /// Create a new input state with everything idle
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `key`
    pub fn key(&self, key: KeyCode) -> KeyState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    /// State of `button`
    pub fn button(&self, button: MouseButton) -> KeyState {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    /// Whether `key` is held (Down or Repeat)
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.key(key).is_pressed()
    }

    /// Whether `button` is held (Down or Repeat)
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.button(button).is_pressed()
    }

    /// Mouse displacement accumulated this frame, in pixels
    pub fn mouse_motion(&self) -> Vec2 {
        self.mouse_motion
    }

    /// Wheel displacement accumulated this frame
    pub fn wheel(&self) -> f32 {
        self.wheel
    }

    /// Handle key input
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        let state = self.keys.entry(key).or_default();
        *state = Self::transition(*state, pressed);
    }

    /// Handle mouse button input
    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        let state = self.buttons.entry(button).or_default();
        *state = Self::transition(*state, pressed);
    }

    /// Handle mouse movement
    pub fn handle_mouse_move(&mut self, dx: f32, dy: f32) {
        self.mouse_motion += Vec2::new(dx, dy);
    }

    /// Handle wheel movement
    pub fn handle_wheel(&mut self, delta: f32) {
        self.wheel += delta;
    }

    /// End the frame: Down becomes Repeat, Up becomes Idle, displacements reset
    pub fn advance(&mut self) {
        for state in self.keys.values_mut().chain(self.buttons.values_mut()) {
            *state = match *state {
                KeyState::Down => KeyState::Repeat,
                KeyState::Up => KeyState::Idle,
                other => other,
            };
        }
        self.mouse_motion = Vec2::zeros();
        self.wheel = 0.0;
    }

    fn transition(current: KeyState, pressed: bool) -> KeyState {
        match (current.is_pressed(), pressed) {
            (false, true) => KeyState::Down,
            (true, false) => KeyState::Up,
            _ => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_machine() {
        let mut input = InputState::new();
        assert_eq!(input.key(KeyCode::W), KeyState::Idle);

        input.handle_key_input(KeyCode::W, true);
        assert_eq!(input.key(KeyCode::W), KeyState::Down);
        input.handle_key_input(KeyCode::W, true);
        assert_eq!(input.key(KeyCode::W), KeyState::Down);

        input.advance();
        assert_eq!(input.key(KeyCode::W), KeyState::Repeat);
        assert!(input.is_key_pressed(KeyCode::W));

        input.handle_key_input(KeyCode::W, false);
        assert_eq!(input.key(KeyCode::W), KeyState::Up);
        input.advance();
        assert_eq!(input.key(KeyCode::W), KeyState::Idle);
    }

    #[test]
    fn test_displacements_reset_each_frame() {
        let mut input = InputState::new();
        input.handle_mouse_move(3.0, -1.0);
        input.handle_mouse_move(1.0, 1.0);
        input.handle_wheel(2.0);
        assert_eq!(input.mouse_motion(), Vec2::new(4.0, 0.0));
        assert_eq!(input.wheel(), 2.0);

        input.handle_mouse_button(MouseButton::Right, true);
        input.advance();
        assert_eq!(input.mouse_motion(), Vec2::zeros());
        assert_eq!(input.wheel(), 0.0);
        assert_eq!(input.button(MouseButton::Right), KeyState::Repeat);
    }
}
