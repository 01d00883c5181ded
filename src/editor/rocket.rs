//! Rocket interaction state machine
//!
//! Rockets have two states: idle and dragging. A drag proposes a location
//! each frame, snapping onto the closest shape edge when one is near so the
//! rocket can be placed standing on terrain.

use glam::Vec2;

use crate::config::EditorConfig;
use crate::event::{Consume, EventBus, PointerEvent, Priority};
use crate::history::Mutation;
use crate::world::{World, find_location_for_rocket};

use super::{EntityKey, Family, Subscription, priority_for};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RocketMode {
    None,
    /// Drag in progress; position and rotation track the proposal
    Moving { position: Vec2, rotation: f32 },
}

impl RocketMode {
    pub fn tier(&self) -> Priority {
        match self {
            RocketMode::None => Priority::Normal,
            RocketMode::Moving { .. } => Priority::Action,
        }
    }
}

pub struct RocketMachine {
    pub id: u32,
    pub mode: RocketMode,
    pub hovered: bool,
    pub(super) pending: Option<RocketMode>,
    pub(super) subscription: Subscription,
}

impl RocketMachine {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            mode: RocketMode::None,
            hovered: false,
            pending: None,
            subscription: Subscription::new(),
        }
    }

    fn key(&self) -> EntityKey {
        EntityKey {
            family: Family::Rocket,
            id: self.id,
        }
    }

    fn priority(&self) -> i32 {
        priority_for(self.mode.tier(), Family::Rocket, self.hovered)
    }

    pub(super) fn enter(&mut self, bus: &mut EventBus<EntityKey>) {
        let priority = self.priority();
        let key = self.key();
        self.subscription.enter(bus, priority, key);
    }

    pub(super) fn sync(&mut self, bus: &mut EventBus<EntityKey>) {
        if let Some(mode) = self.pending.take() {
            log::debug!("rocket {}: {:?} -> {:?}", self.id, self.mode, mode);
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
        let rocket = *world.rocket(self.id)?;

        match self.mode {
            RocketMode::None => {
                if event.consumed {
                    self.hovered = false;
                    return None;
                }

                let inside = rocket.contains(event.position, config.rocket_size);

                if event.left_clicked {
                    if inside {
                        if event.shift {
                            self.pending = Some(RocketMode::Moving {
                                position: rocket.position,
                                rotation: rocket.rotation,
                            });
                        }

                        return Some(Consume);
                    }

                    None
                } else {
                    self.hovered = inside;
                    inside.then_some(Consume)
                }
            }
            RocketMode::Moving { .. } => {
                if event.consumed {
                    if event.left_clicked || event.right_clicked || !event.left_down {
                        self.pending = Some(RocketMode::None);
                    }
                    return None;
                }

                if event.escape {
                    self.pending = Some(RocketMode::None);
                    return Some(Consume);
                }

                let RocketMode::Moving {
                    ref mut position,
                    ref mut rotation,
                } = self.mode
                else {
                    return None;
                };

                if event.left_down {
                    let (point, angle) = find_location_for_rocket(
                        world,
                        event.position,
                        event.position_in_grid,
                        config.snap_distance,
                    );
                    *position = point;
                    *rotation = angle;
                } else {
                    if (*position, *rotation) != (rocket.position, rocket.rotation) {
                        out.push(Mutation::MoveRocket {
                            id: self.id,
                            from: (rocket.position, rocket.rotation),
                            to: (*position, *rotation),
                        });
                    }

                    self.pending = Some(RocketMode::None);
                }

                Some(Consume)
            }
        }
    }
}
