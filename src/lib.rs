//! Leveldraft - interaction core for a 2D polygon level editor
//!
//! Core modules:
//! - `geometry`: Pure polygon math (hit tests, self-intersection, safe vertex moves)
//! - `event`: Priority-ordered, single-consumer input event bus
//! - `input`: Raw host input accumulation and pointer event synthesis
//! - `world`: Editable entities (shapes, rockets, level markers)
//! - `history`: Mutations and the undo/redo stacks
//! - `editor`: Per-entity interaction state machines and the editor facade
//! - `config`: Tunable editor parameters with JSON persistence

pub mod config;
pub mod editor;
pub mod event;
pub mod geometry;
pub mod history;
pub mod input;
pub mod world;

pub use config::EditorConfig;
pub use editor::Editor;
pub use event::{Consume, EventBus, ListenerId, PointerEvent, Priority};
pub use history::{History, Mutation};
pub use input::{Button, EventSource, Key, RawInput};
pub use world::World;

use glam::Vec2;

/// Editor constants
pub mod consts {
    /// Grid snapping step in world units
    pub const GRID_STEP: f32 = 0.25;
    /// Radius for binding the pointer to a vertex, edge, or camera line
    pub const SNAP_DISTANCE: f32 = 0.5;
    /// Minimum number of vertices a shape may hold
    pub const MIN_SHAPE_VERTICES: usize = 3;

    /// Rocket hit box (width, height) in world units
    pub const ROCKET_WIDTH: f32 = 1.0;
    pub const ROCKET_HEIGHT: f32 = 1.8;
    /// Level flag hit box (width, height)
    pub const FLAG_WIDTH: f32 = 0.9;
    pub const FLAG_HEIGHT: f32 = 1.8;
    /// Half-extent of the default camera rectangle around a new marker
    pub const FLAG_CAMERA_EXTENT: f32 = 4.0;
}

/// Snap a point to the grid with the given step
#[inline]
pub fn snap_to_grid(p: Vec2, step: f32) -> Vec2 {
    Vec2::new((p.x / step).round() * step, (p.y / step).round() * step)
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate_vec(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_grid() {
        let snapped = snap_to_grid(Vec2::new(1.13, -0.88), 0.25);
        assert_eq!(snapped, Vec2::new(1.25, -1.0));

        // already on the grid
        let snapped = snap_to_grid(Vec2::new(0.5, 0.75), 0.25);
        assert_eq!(snapped, Vec2::new(0.5, 0.75));
    }

    #[test]
    fn test_rotate_vec() {
        let v = rotate_vec(Vec2::new(1.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert!((v.x - 0.0).abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
