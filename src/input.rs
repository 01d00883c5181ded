//! Raw host input and pointer event synthesis
//!
//! The host translates device pixels into world coordinates before anything
//! reaches this module. [`EventSource`] accumulates the raw stream and turns
//! each callback into one [`PointerEvent`]: click flags are edge-triggered
//! against the previous raw input, the grid position is quantized, and
//! modifier-only key changes re-dispatch at the last pointer position.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::event::PointerEvent;
use crate::snap_to_grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Shift,
    Ctrl,
    Escape,
}

/// One host input callback, already in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RawInput {
    PointerMoved { position: Vec2 },
    ButtonPressed { position: Vec2, button: Button },
    ButtonReleased { position: Vec2, button: Button },
    KeyPressed(Key),
    KeyReleased(Key),
    /// Pointer left the canvas; synthesizes a pre-consumed event so
    /// mid-gesture modes abort
    PointerLeft,
}

/// Accumulated pointer/keyboard state between raw inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSource {
    grid_step: f32,
    position: Vec2,
    left_down: bool,
    right_down: bool,
    shift: bool,
    ctrl: bool,
}

impl EventSource {
    pub fn new(grid_step: f32) -> Self {
        Self {
            grid_step,
            position: Vec2::ZERO,
            left_down: false,
            right_down: false,
            shift: false,
            ctrl: false,
        }
    }

    /// Fold one raw input into the accumulated state and synthesize the
    /// event to dispatch
    pub fn synthesize(&mut self, raw: RawInput) -> PointerEvent {
        let mut left_clicked = false;
        let mut right_clicked = false;
        let mut escape = false;
        let mut consumed = false;

        match raw {
            RawInput::PointerMoved { position } => {
                self.position = position;
            }
            RawInput::ButtonPressed { position, button } => {
                self.position = position;
                match button {
                    Button::Left => {
                        left_clicked = !self.left_down;
                        self.left_down = true;
                    }
                    Button::Right => {
                        right_clicked = !self.right_down;
                        self.right_down = true;
                    }
                }
            }
            RawInput::ButtonReleased { position, button } => {
                self.position = position;
                match button {
                    Button::Left => self.left_down = false,
                    Button::Right => self.right_down = false,
                }
            }
            RawInput::KeyPressed(key) => match key {
                Key::Shift => self.shift = true,
                Key::Ctrl => self.ctrl = true,
                Key::Escape => escape = true,
            },
            RawInput::KeyReleased(key) => match key {
                Key::Shift => self.shift = false,
                Key::Ctrl => self.ctrl = false,
                Key::Escape => {}
            },
            RawInput::PointerLeft => {
                self.left_down = false;
                self.right_down = false;
                consumed = true;
            }
        }

        PointerEvent {
            position: self.position,
            position_in_grid: snap_to_grid(self.position, self.grid_step),
            left_clicked,
            right_clicked,
            left_down: self.left_down,
            shift: self.shift,
            ctrl: self.ctrl,
            escape,
            consumed,
        }
    }
}
