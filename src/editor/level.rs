//! Level marker interaction state machine
//!
//! The marker is a flag plus the camera rectangle it owns. While selected,
//! the four camera boundary lines take precedence over the flag for
//! hit-testing; a line can be dragged on its own or, with shift, the whole
//! rectangle at once.

use glam::Vec2;

use crate::config::EditorConfig;
use crate::event::{Consume, EventBus, PointerEvent, Priority};
use crate::history::Mutation;
use crate::world::{CameraSide, World};

use super::{EntityKey, Family, Subscription, priority_for};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelMode {
    None,
    Selected,
    /// Flag drag; `position` tracks the grid-snapped proposal
    Moving { offset: Vec2, position: Vec2 },
    /// Whole camera rectangle drag; `delta` is the accumulated offset from
    /// the grab point
    MovingCamera { offset: Vec2, delta: Vec2 },
    /// Single boundary line drag
    MovingCameraLine { side: CameraSide, position: Vec2 },
}

impl LevelMode {
    pub fn tier(&self) -> Priority {
        match self {
            LevelMode::None => Priority::Normal,
            LevelMode::Selected => Priority::Selected,
            LevelMode::Moving { .. }
            | LevelMode::MovingCamera { .. }
            | LevelMode::MovingCameraLine { .. } => Priority::Action,
        }
    }
}

pub struct LevelMachine {
    pub id: u32,
    pub mode: LevelMode,
    pub hovered: bool,
    pub(super) pending: Option<LevelMode>,
    pub(super) subscription: Subscription,
}

impl LevelMachine {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            mode: LevelMode::None,
            hovered: false,
            pending: None,
            subscription: Subscription::new(),
        }
    }

    fn key(&self) -> EntityKey {
        EntityKey {
            family: Family::Level,
            id: self.id,
        }
    }

    fn priority(&self) -> i32 {
        priority_for(self.mode.tier(), Family::Level, self.hovered)
    }

    pub(super) fn enter(&mut self, bus: &mut EventBus<EntityKey>) {
        let priority = self.priority();
        let key = self.key();
        self.subscription.enter(bus, priority, key);
    }

    pub(super) fn sync(&mut self, bus: &mut EventBus<EntityKey>) {
        if let Some(mode) = self.pending.take() {
            log::debug!("level {}: {:?} -> {:?}", self.id, self.mode, mode);
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
        let marker = *world.marker(self.id)?;

        match self.mode {
            LevelMode::None => {
                if event.consumed {
                    self.hovered = false;
                    return None;
                }

                let inside = marker.flag_contains(event.position, config.flag_size);

                if event.left_clicked {
                    if inside {
                        if event.shift {
                            self.pending = Some(LevelMode::Moving {
                                offset: marker.position - event.position_in_grid,
                                position: marker.position,
                            });
                        } else {
                            self.pending = Some(LevelMode::Selected);
                        }

                        return Some(Consume);
                    }

                    None
                } else {
                    self.hovered = inside;
                    inside.then_some(Consume)
                }
            }
            LevelMode::Selected => {
                if event.consumed {
                    if event.left_clicked || event.right_clicked {
                        self.pending = Some(LevelMode::None);
                    }
                    return None;
                }

                // camera lines take precedence over the flag
                if let Some(side) =
                    marker.closest_camera_side(event.position_in_grid, config.snap_distance)
                {
                    if event.left_clicked {
                        if event.shift {
                            self.pending = Some(LevelMode::MovingCamera {
                                offset: event.position_in_grid,
                                delta: Vec2::ZERO,
                            });
                        } else {
                            self.pending = Some(LevelMode::MovingCameraLine {
                                side,
                                position: event.position_in_grid,
                            });
                        }
                    }

                    return Some(Consume);
                }

                if marker.flag_contains(event.position, config.flag_size) {
                    if event.shift && event.left_clicked {
                        self.pending = Some(LevelMode::Moving {
                            offset: marker.position - event.position_in_grid,
                            position: marker.position,
                        });
                    }

                    return Some(Consume);
                }

                // deselect without consuming
                if event.left_clicked {
                    self.pending = Some(LevelMode::None);
                }

                None
            }
            LevelMode::Moving { .. } => {
                if self.aborted(event) {
                    return None;
                }
                if event.escape {
                    self.pending = Some(LevelMode::None);
                    return Some(Consume);
                }

                let LevelMode::Moving {
                    offset,
                    ref mut position,
                } = self.mode
                else {
                    return None;
                };

                if event.left_down {
                    *position = offset + event.position_in_grid;
                } else {
                    if *position != marker.position {
                        out.push(Mutation::MoveMarker {
                            id: self.id,
                            from: marker.position,
                            to: *position,
                        });
                    }

                    self.pending = Some(LevelMode::Selected);
                }

                Some(Consume)
            }
            LevelMode::MovingCamera { .. } => {
                if self.aborted(event) {
                    return None;
                }
                if event.escape {
                    self.pending = Some(LevelMode::None);
                    return Some(Consume);
                }

                let LevelMode::MovingCamera {
                    offset,
                    ref mut delta,
                } = self.mode
                else {
                    return None;
                };

                if event.left_down {
                    *delta = event.position_in_grid - offset;
                } else {
                    if *delta != Vec2::ZERO {
                        out.push(Mutation::SetCameraBounds {
                            id: self.id,
                            from: (marker.camera_top_left, marker.camera_bottom_right),
                            to: (
                                marker.camera_top_left + *delta,
                                marker.camera_bottom_right + *delta,
                            ),
                        });
                    }

                    self.pending = Some(LevelMode::Selected);
                }

                Some(Consume)
            }
            LevelMode::MovingCameraLine { .. } => {
                if self.aborted(event) {
                    return None;
                }
                if event.escape {
                    self.pending = Some(LevelMode::None);
                    return Some(Consume);
                }

                let LevelMode::MovingCameraLine {
                    side,
                    ref mut position,
                } = self.mode
                else {
                    return None;
                };

                if event.left_down {
                    *position = event.position_in_grid;
                } else {
                    if let Some(mutation) = Mutation::camera_bounds(world, self.id, side, *position)
                    {
                        out.push(mutation);
                    }

                    self.pending = Some(LevelMode::Selected);
                }

                Some(Consume)
            }
        }
    }

    /// Consumed click or release while mid-gesture aborts to `None` with no
    /// mutation
    fn aborted(&mut self, event: &PointerEvent) -> bool {
        if !event.consumed {
            return false;
        }

        if event.left_clicked || event.right_clicked || !event.left_down {
            self.pending = Some(LevelMode::None);
        }

        true
    }
}
