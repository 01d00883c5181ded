//! Shape interaction state machine
//!
//! The richest of the entity machines: shapes can be selected, moved, and
//! vertex-edited. While a vertex drag is in progress the machine works on a
//! private copy of the ring; the world only changes when the gesture commits
//! a mutation.

use glam::Vec2;

use crate::config::EditorConfig;
use crate::consts::MIN_SHAPE_VERTICES;
use crate::event::{Consume, EventBus, PointerEvent, Priority};
use crate::geometry::{Rgb, Vertex, can_remove_vertex, normalize_winding, relocate_vertex};
use crate::history::Mutation;
use crate::world::{Shape, World};

use super::{EntityKey, Family, Subscription, priority_for};

/// Interaction state of one shape
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeMode {
    None,
    Selected,
    /// Whole-shape drag; `position` tracks the grid-snapped proposal
    Moving { offset: Vec2, position: Vec2 },
    /// Vertex drag over a private copy of the ring. `buffered` holds a
    /// vertex merged away by dragging onto it, so it can be restored when
    /// the pointer moves off the merge point. `inserted` records that the
    /// dragged vertex was created by clicking an edge.
    Vertex {
        vertex_index: usize,
        vertices: Vec<Vertex>,
        buffered: Option<(usize, Vertex)>,
        inserted: bool,
    },
}

impl ShapeMode {
    pub fn tier(&self) -> Priority {
        match self {
            ShapeMode::None => Priority::Normal,
            ShapeMode::Selected => Priority::Selected,
            ShapeMode::Moving { .. } | ShapeMode::Vertex { .. } => Priority::Action,
        }
    }
}

pub struct ShapeMachine {
    pub id: u32,
    pub mode: ShapeMode,
    pub hovered: bool,
    pub(super) pending: Option<ShapeMode>,
    pub(super) subscription: Subscription,
}

impl ShapeMachine {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            mode: ShapeMode::None,
            hovered: false,
            pending: None,
            subscription: Subscription::new(),
        }
    }

    fn key(&self) -> EntityKey {
        EntityKey {
            family: Family::Shape,
            id: self.id,
        }
    }

    fn priority(&self) -> i32 {
        priority_for(self.mode.tier(), Family::Shape, self.hovered)
    }

    pub(super) fn enter(&mut self, bus: &mut EventBus<EntityKey>) {
        let priority = self.priority();
        let key = self.key();
        self.subscription.enter(bus, priority, key);
    }

    /// Apply a deferred transition, or realign the listener priority when
    /// only the hover state changed
    pub(super) fn sync(&mut self, bus: &mut EventBus<EntityKey>) {
        if let Some(mode) = self.pending.take() {
            log::debug!("shape {}: {:?} -> {:?}", self.id, self.mode, mode);
            self.subscription.exit(bus);
            self.mode = mode;
            self.enter(bus);
        } else {
            self.subscription.update_priority(bus, self.priority());
        }
    }

    pub fn handle(
        &mut self,
        event: &PointerEvent,
        world: &World,
        config: &EditorConfig,
        out: &mut Vec<Mutation>,
    ) -> Option<Consume> {
        let shape = world.shape(self.id)?;

        match self.mode {
            ShapeMode::None => self.handle_none(event, shape),
            ShapeMode::Selected => self.handle_selected(event, shape, config, out),
            ShapeMode::Moving { .. } => self.handle_moving(event, shape, out),
            ShapeMode::Vertex { .. } => self.handle_vertex(event, shape, out),
        }
    }

    fn handle_none(&mut self, event: &PointerEvent, shape: &Shape) -> Option<Consume> {
        if event.consumed {
            self.hovered = false;
            return None;
        }

        let inside = shape.point_inside(event.position);

        if event.left_clicked {
            if inside {
                if event.shift {
                    self.pending = Some(ShapeMode::Moving {
                        offset: shape.position - event.position_in_grid,
                        position: shape.position,
                    });
                } else {
                    self.pending = Some(ShapeMode::Selected);
                }

                return Some(Consume);
            }

            None
        } else {
            self.hovered = inside;
            inside.then_some(Consume)
        }
    }

    fn handle_selected(
        &mut self,
        event: &PointerEvent,
        shape: &Shape,
        config: &EditorConfig,
        out: &mut Vec<Mutation>,
    ) -> Option<Consume> {
        if event.consumed {
            if event.left_clicked || event.right_clicked {
                self.pending = Some(ShapeMode::None);
            }
            return None;
        }

        if let Some(index) = shape.closest_vertex(event.position, config.snap_distance) {
            if event.ctrl {
                if event.left_clicked && can_remove_vertex(&shape.vertices, index) {
                    out.push(Mutation::RemoveVertex {
                        id: self.id,
                        index,
                        vertex: shape.vertices[index],
                    });
                }

                return Some(Consume);
            }

            if event.left_clicked {
                self.pending = Some(ShapeMode::Vertex {
                    vertex_index: index,
                    vertices: shape.vertices.clone(),
                    buffered: None,
                    inserted: false,
                });
            }

            return Some(Consume);
        }

        if let Some(hit) = shape.closest_edge(event.position, config.snap_distance) {
            if event.left_clicked {
                let (start, end) = hit.indices;
                let color = Rgb::mix(shape.vertices[start].color, shape.vertices[end].color);

                let mut vertices = shape.vertices.clone();
                vertices.insert(end, Vertex::new(hit.point - shape.position, color));

                self.pending = Some(ShapeMode::Vertex {
                    vertex_index: end,
                    vertices,
                    buffered: None,
                    inserted: true,
                });
            }

            return Some(Consume);
        }

        if shape.point_inside(event.position) {
            if event.shift && event.left_clicked {
                self.pending = Some(ShapeMode::Moving {
                    offset: shape.position - event.position_in_grid,
                    position: shape.position,
                });
            }

            return Some(Consume);
        }

        // deselect without consuming so a sibling can take the same click
        if event.left_clicked {
            self.pending = Some(ShapeMode::None);
        }

        None
    }

    fn handle_moving(
        &mut self,
        event: &PointerEvent,
        shape: &Shape,
        out: &mut Vec<Mutation>,
    ) -> Option<Consume> {
        if event.consumed {
            if event.left_clicked || event.right_clicked || !event.left_down {
                self.pending = Some(ShapeMode::None);
            }
            return None;
        }

        if event.escape {
            self.pending = Some(ShapeMode::None);
            return Some(Consume);
        }

        let ShapeMode::Moving {
            offset,
            ref mut position,
        } = self.mode
        else {
            return None;
        };

        if event.left_down && event.shift {
            *position = offset + event.position_in_grid;
        } else {
            if *position != shape.position {
                out.push(Mutation::MoveShape {
                    id: self.id,
                    from: shape.position,
                    to: *position,
                });
            }

            self.pending = Some(ShapeMode::Selected);
        }

        Some(Consume)
    }

    fn handle_vertex(
        &mut self,
        event: &PointerEvent,
        shape: &Shape,
        out: &mut Vec<Mutation>,
    ) -> Option<Consume> {
        if event.consumed {
            if event.left_clicked || event.right_clicked || !event.left_down {
                self.pending = Some(ShapeMode::None);
            }
            return None;
        }

        if event.escape {
            self.pending = Some(ShapeMode::None);
            return Some(Consume);
        }

        let ShapeMode::Vertex {
            ref mut vertex_index,
            ref mut vertices,
            ref mut buffered,
            ..
        } = self.mode
        else {
            return None;
        };

        if event.left_down {
            let target = event.position_in_grid - shape.position;
            if vertices[*vertex_index].position == target {
                return Some(Consume);
            }

            // work on a scratch ring so a rejected move leaves everything,
            // including a pending merge, exactly as it was
            let mut work = vertices.clone();
            let mut index = *vertex_index;
            let mut next_buffered = *buffered;

            if let Some((buffer_index, vertex)) = next_buffered.take() {
                // pointer left the merge point: put the merged vertex back
                let at = buffer_index.min(work.len());
                work.insert(at, vertex);
                if at <= index {
                    index += 1;
                }
            }

            let duplicate = work
                .iter()
                .enumerate()
                .position(|(i, vertex)| i != index && vertex.position == target);

            if let Some(duplicate) = duplicate {
                if !can_remove_vertex(&work, index) {
                    // merging would self-intersect; the vertex sticks
                    return Some(Consume);
                }

                let mut moved = work[index];
                moved.position = target;

                next_buffered = Some((duplicate, work[duplicate]));
                work[duplicate] = moved;
                work.remove(index);
                index = if index < duplicate {
                    duplicate - 1
                } else {
                    duplicate
                };
            } else {
                match relocate_vertex(&mut work, index, target) {
                    Some(new_index) => index = new_index,
                    // unresolvable crossing; the vertex sticks
                    None => return Some(Consume),
                }
            }

            *vertices = work;
            *vertex_index = index;
            *buffered = next_buffered;

            return Some(Consume);
        }

        // release: commit the working ring if it actually changed
        let mut committed = vertices.clone();
        normalize_winding(&mut committed);

        if committed != shape.vertices && committed.len() >= MIN_SHAPE_VERTICES {
            out.push(Mutation::ReplaceVertices {
                id: self.id,
                from: shape.vertices.clone(),
                to: committed,
            });
        }

        self.pending = Some(ShapeMode::Selected);
        Some(Consume)
    }
}
