//! Mutations and the undo/redo stacks
//!
//! A [`Mutation`] stores before and after data for one committed gesture, so
//! it can be applied and reverted against the world. [`History`] owns the
//! done/undone stacks; committing anything new clears the redo side.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{Vertex, normalize_winding};
use crate::world::{CameraSide, World};

/// One reversible world edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    MoveShape {
        id: u32,
        from: Vec2,
        to: Vec2,
    },
    /// Replace a shape's whole vertex ring; the new ring is winding-
    /// normalized on apply
    ReplaceVertices {
        id: u32,
        from: Vec<Vertex>,
        to: Vec<Vertex>,
    },
    RemoveVertex {
        id: u32,
        index: usize,
        vertex: Vertex,
    },
    MoveRocket {
        id: u32,
        from: (Vec2, f32),
        to: (Vec2, f32),
    },
    MoveMarker {
        id: u32,
        from: Vec2,
        to: Vec2,
    },
    SetCameraBounds {
        id: u32,
        from: (Vec2, Vec2),
        to: (Vec2, Vec2),
    },
}

impl Mutation {
    pub fn apply(&self, world: &mut World) {
        match self {
            Mutation::MoveShape { id, to, .. } => {
                if let Some(shape) = world.shape_mut(*id) {
                    shape.position = *to;
                }
            }
            Mutation::ReplaceVertices { id, to, .. } => {
                if let Some(shape) = world.shape_mut(*id) {
                    let mut vertices = to.clone();
                    normalize_winding(&mut vertices);
                    shape.vertices = vertices;
                }
            }
            Mutation::RemoveVertex { id, index, .. } => {
                if let Some(shape) = world.shape_mut(*id) {
                    if *index < shape.vertices.len() {
                        shape.vertices.remove(*index);
                    }
                }
            }
            Mutation::MoveRocket { id, to, .. } => {
                if let Some(rocket) = world.rocket_mut(*id) {
                    rocket.position = to.0;
                    rocket.rotation = to.1;
                }
            }
            Mutation::MoveMarker { id, to, .. } => {
                if let Some(marker) = world.marker_mut(*id) {
                    marker.position = *to;
                }
            }
            Mutation::SetCameraBounds { id, to, .. } => {
                if let Some(marker) = world.marker_mut(*id) {
                    marker.camera_top_left = to.0;
                    marker.camera_bottom_right = to.1;
                }
            }
        }
    }

    pub fn revert(&self, world: &mut World) {
        match self {
            Mutation::MoveShape { id, from, .. } => {
                if let Some(shape) = world.shape_mut(*id) {
                    shape.position = *from;
                }
            }
            Mutation::ReplaceVertices { id, from, .. } => {
                if let Some(shape) = world.shape_mut(*id) {
                    shape.vertices = from.clone();
                }
            }
            Mutation::RemoveVertex { id, index, vertex } => {
                if let Some(shape) = world.shape_mut(*id) {
                    let index = (*index).min(shape.vertices.len());
                    shape.vertices.insert(index, *vertex);
                }
            }
            Mutation::MoveRocket { id, from, .. } => {
                if let Some(rocket) = world.rocket_mut(*id) {
                    rocket.position = from.0;
                    rocket.rotation = from.1;
                }
            }
            Mutation::MoveMarker { id, from, .. } => {
                if let Some(marker) = world.marker_mut(*id) {
                    marker.position = *from;
                }
            }
            Mutation::SetCameraBounds { id, from, .. } => {
                if let Some(marker) = world.marker_mut(*id) {
                    marker.camera_top_left = from.0;
                    marker.camera_bottom_right = from.1;
                }
            }
        }
    }

    /// Convenience for camera-bounds commits: capture `from` off the current
    /// marker state
    pub fn camera_bounds(world: &World, id: u32, side: CameraSide, point: Vec2) -> Option<Self> {
        let marker = world.marker(id)?;
        let mut next = *marker;
        next.set_camera_side(side, point);

        Some(Mutation::SetCameraBounds {
            id,
            from: (marker.camera_top_left, marker.camera_bottom_right),
            to: (next.camera_top_left, next.camera_bottom_right),
        })
    }
}

/// Undo/redo stacks over committed mutations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    done: Vec<Mutation>,
    undone: Vec<Mutation>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Apply a mutation and record it. Anything on the redo stack is
    /// discarded.
    pub fn commit(&mut self, world: &mut World, mutation: Mutation) {
        log::debug!("commit {mutation:?}");
        mutation.apply(world);
        self.done.push(mutation);
        self.undone.clear();
    }

    pub fn undo(&mut self, world: &mut World) -> bool {
        let Some(mutation) = self.done.pop() else {
            return false;
        };

        log::debug!("undo {mutation:?}");
        mutation.revert(world);
        self.undone.push(mutation);
        true
    }

    pub fn redo(&mut self, world: &mut World) -> bool {
        let Some(mutation) = self.undone.pop() else {
            return false;
        };

        log::debug!("redo {mutation:?}");
        mutation.apply(world);
        self.done.push(mutation);
        true
    }
}
