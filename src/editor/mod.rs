//! Entity state machines and the editor facade
//!
//! One machine per editable entity, each subscribed to the bus at a priority
//! derived from its current mode. [`Editor`] wires the pieces together: it
//! synthesizes events from raw input, dispatches them, then drains the
//! deferred transition and commit queues so the listener order stays stable
//! for the whole pass.

pub mod level;
pub mod rocket;
pub mod shape;

pub use level::{LevelMachine, LevelMode};
pub use rocket::{RocketMachine, RocketMode};
pub use shape::{ShapeMachine, ShapeMode};

use crate::config::EditorConfig;
use crate::event::{EventBus, ListenerId, PointerEvent, Priority};
use crate::history::{History, Mutation};
use crate::input::{EventSource, RawInput};
use crate::world::World;

/// Entity family, used as a sub-priority so stacked entities of different
/// kinds arbitrate deterministically: rockets and flags sit on top of the
/// shapes they are placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Shape,
    Level,
    Rocket,
}

impl Family {
    fn offset(self) -> i32 {
        match self {
            Family::Shape => 0,
            Family::Level => 4,
            Family::Rocket => 8,
        }
    }
}

/// Bus listener key: which machine gets the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKey {
    pub family: Family,
    pub id: u32,
}

/// Dispatch priority of a machine: mode tier, family sub-priority, and a
/// small boost for the hovered entity. Tier spacing is wide enough that no
/// offset crosses into the next tier.
pub fn priority_for(tier: Priority, family: Family, hovered: bool) -> i32 {
    tier.base() + family.offset() + hovered as i32
}

/// A machine's live bus registration
pub(crate) struct Subscription {
    listener: Option<(ListenerId, i32)>,
}

impl Subscription {
    fn new() -> Self {
        Self { listener: None }
    }

    fn enter(&mut self, bus: &mut EventBus<EntityKey>, priority: i32, key: EntityKey) {
        // unsubscribe before resubscribing, never deliver twice
        self.exit(bus);
        self.listener = Some((bus.subscribe(priority, key), priority));
    }

    fn exit(&mut self, bus: &mut EventBus<EntityKey>) {
        if let Some((id, _)) = self.listener.take() {
            bus.unsubscribe(id);
        }
    }

    fn update_priority(&mut self, bus: &mut EventBus<EntityKey>, priority: i32) {
        if let Some((id, current)) = &mut self.listener {
            if *current != priority {
                bus.set_priority(*id, priority);
                *current = priority;
            }
        }
    }
}

/// One editor instance: world, history, bus, and the machines
pub struct Editor {
    config: EditorConfig,
    world: World,
    history: History,
    bus: EventBus<EntityKey>,
    source: EventSource,
    shapes: Vec<ShapeMachine>,
    rockets: Vec<RocketMachine>,
    levels: Vec<LevelMachine>,
}

impl Editor {
    /// Build an editor over a world, one machine per entity, all idle
    pub fn new(world: World, config: EditorConfig) -> Self {
        let mut editor = Self {
            source: EventSource::new(config.grid_step),
            config,
            world,
            history: History::new(),
            bus: EventBus::new(),
            shapes: Vec::new(),
            rockets: Vec::new(),
            levels: Vec::new(),
        };

        for shape in &editor.world.shapes {
            editor.shapes.push(ShapeMachine::new(shape.id));
        }
        for rocket in &editor.world.rockets {
            editor.rockets.push(RocketMachine::new(rocket.id));
        }
        for marker in &editor.world.markers {
            editor.levels.push(LevelMachine::new(marker.id));
        }

        for machine in &mut editor.shapes {
            machine.enter(&mut editor.bus);
        }
        for machine in &mut editor.rockets {
            machine.enter(&mut editor.bus);
        }
        for machine in &mut editor.levels {
            machine.enter(&mut editor.bus);
        }

        editor
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn shape_mode(&self, id: u32) -> Option<&ShapeMode> {
        self.shapes
            .iter()
            .find(|machine| machine.id == id)
            .map(|machine| &machine.mode)
    }

    pub fn rocket_mode(&self, id: u32) -> Option<&RocketMode> {
        self.rockets
            .iter()
            .find(|machine| machine.id == id)
            .map(|machine| &machine.mode)
    }

    pub fn level_mode(&self, id: u32) -> Option<&LevelMode> {
        self.levels
            .iter()
            .find(|machine| machine.id == id)
            .map(|machine| &machine.mode)
    }

    /// Id of the shape currently in `Selected` or deeper, if any
    pub fn selected_shape(&self) -> Option<u32> {
        self.shapes
            .iter()
            .find(|machine| machine.mode != ShapeMode::None)
            .map(|machine| machine.id)
    }

    /// Feed one raw host input through the whole pipeline: synthesize,
    /// dispatch, commit emitted mutations, apply deferred transitions.
    /// Returns whether the event was consumed.
    pub fn input(&mut self, raw: RawInput) -> bool {
        let mut event = self.source.synthesize(raw);
        self.dispatch(&mut event)
    }

    fn dispatch(&mut self, event: &mut PointerEvent) -> bool {
        let mut mutations: Vec<Mutation> = Vec::new();

        let Self {
            bus,
            world,
            config,
            shapes,
            rockets,
            levels,
            ..
        } = self;

        let consumed = bus.dispatch(event, |event, key| match key.family {
            Family::Shape => shapes
                .iter_mut()
                .find(|machine| machine.id == key.id)
                .and_then(|machine| machine.handle(event, world, config, &mut mutations)),
            Family::Rocket => rockets
                .iter_mut()
                .find(|machine| machine.id == key.id)
                .and_then(|machine| machine.handle(event, world, config, &mut mutations)),
            Family::Level => levels
                .iter_mut()
                .find(|machine| machine.id == key.id)
                .and_then(|machine| machine.handle(event, world, config, &mut mutations)),
        });

        for mutation in mutations {
            self.history.commit(&mut self.world, mutation);
        }

        for machine in &mut self.shapes {
            machine.sync(&mut self.bus);
        }
        for machine in &mut self.rockets {
            machine.sync(&mut self.bus);
        }
        for machine in &mut self.levels {
            machine.sync(&mut self.bus);
        }

        consumed
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.world)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rgb, find_self_intersection, vertices_from_points};
    use crate::input::{Button, Key};
    use glam::Vec2;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn editor_with_triangle() -> (Editor, u32) {
        let world = World::demo();
        let id = world.shapes[0].id;
        (Editor::new(world, EditorConfig::default()), id)
    }

    fn editor_with_square() -> (Editor, u32) {
        let mut world = World::new();
        let id = world.add_shape(
            Vec2::ZERO,
            vertices_from_points(
                &[
                    Vec2::new(0.0, 0.0),
                    Vec2::new(4.0, 0.0),
                    Vec2::new(4.0, 4.0),
                    Vec2::new(0.0, 4.0),
                ],
                Rgb::new(0, 0, 0),
            ),
        );
        (Editor::new(world, EditorConfig::default()), id)
    }

    fn press(editor: &mut Editor, position: Vec2) -> bool {
        editor.input(RawInput::ButtonPressed {
            position,
            button: Button::Left,
        })
    }

    fn release(editor: &mut Editor, position: Vec2) -> bool {
        editor.input(RawInput::ButtonReleased {
            position,
            button: Button::Left,
        })
    }

    fn move_to(editor: &mut Editor, position: Vec2) -> bool {
        editor.input(RawInput::PointerMoved { position })
    }

    fn click(editor: &mut Editor, position: Vec2) {
        press(editor, position);
        release(editor, position);
    }

    #[test]
    fn test_click_inside_selects() {
        let (mut editor, id) = editor_with_triangle();

        click(&mut editor, Vec2::new(0.0, 0.0));
        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::Selected));
    }

    #[test]
    fn test_click_outside_deselects_without_consuming() {
        let (mut editor, id) = editor_with_triangle();
        click(&mut editor, Vec2::new(0.0, 0.0));

        let consumed = press(&mut editor, Vec2::new(20.0, 20.0));
        assert!(!consumed);
        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::None));
    }

    #[test]
    fn test_shift_drag_moves_shape_and_undo_restores() {
        let (mut editor, id) = editor_with_triangle();

        editor.input(RawInput::KeyPressed(Key::Shift));
        press(&mut editor, Vec2::new(0.0, 0.0));
        assert!(matches!(
            editor.shape_mode(id),
            Some(&ShapeMode::Moving { .. })
        ));

        move_to(&mut editor, Vec2::new(3.0, 1.0));
        release(&mut editor, Vec2::new(3.0, 1.0));

        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::Selected));
        assert_eq!(editor.world().shape(id).unwrap().position, Vec2::new(3.0, 1.0));

        assert!(editor.undo());
        assert_eq!(editor.world().shape(id).unwrap().position, Vec2::ZERO);
        assert!(editor.redo());
        assert_eq!(editor.world().shape(id).unwrap().position, Vec2::new(3.0, 1.0));
    }

    /// Scenario B: a legal vertex drag commits a reversible mutation
    #[test]
    fn test_vertex_drag_commits_and_undoes() {
        let (mut editor, id) = editor_with_triangle();
        click(&mut editor, Vec2::new(0.0, 0.0));

        // grab the apex at (0, 2) and drag it up
        press(&mut editor, Vec2::new(0.0, 2.0));
        assert!(matches!(
            editor.shape_mode(id),
            Some(&ShapeMode::Vertex { .. })
        ));

        move_to(&mut editor, Vec2::new(0.0, 5.0));
        release(&mut editor, Vec2::new(0.0, 5.0));

        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::Selected));
        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices[0].position, Vec2::new(0.0, 5.0));

        assert!(editor.undo());
        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices[0].position, Vec2::new(0.0, 2.0));
    }

    /// Scenario A: dragging the apex through the base is rejected; the ring
    /// is unchanged when the gesture ends
    #[test]
    fn test_vertex_drag_through_edge_rejected() {
        let (mut editor, id) = editor_with_triangle();
        let original = editor.world().shape(id).unwrap().vertices.clone();

        click(&mut editor, Vec2::new(0.0, 0.0));
        press(&mut editor, Vec2::new(0.0, 2.0));
        move_to(&mut editor, Vec2::new(0.0, -10.0));
        release(&mut editor, Vec2::new(0.0, -10.0));

        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices, original);
        // nothing to undo, the gesture produced no mutation
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_edge_click_inserts_vertex() {
        let (mut editor, id) = editor_with_triangle();
        click(&mut editor, Vec2::new(0.0, 0.0));

        // middle of the base edge from (-2,-2) to (2,-2)
        press(&mut editor, Vec2::new(0.0, -2.0));
        let Some(ShapeMode::Vertex {
            vertices, inserted, ..
        }) = editor.shape_mode(id)
        else {
            panic!("expected vertex mode");
        };
        assert!(*inserted);
        assert_eq!(vertices.len(), 4);

        // drag the new vertex down and commit
        move_to(&mut editor, Vec2::new(0.0, -3.0));
        release(&mut editor, Vec2::new(0.0, -3.0));

        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices.len(), 4);
        assert_eq!(find_self_intersection(&shape.vertices), None);
    }

    #[test]
    fn test_ctrl_click_removes_vertex() {
        let (mut editor, id) = editor_with_square();

        click(&mut editor, Vec2::new(2.0, 2.0));
        editor.input(RawInput::KeyPressed(Key::Ctrl));
        click(&mut editor, Vec2::new(4.0, 4.0));

        assert_eq!(editor.world().shape(id).unwrap().vertices.len(), 3);

        // a triangle refuses further removal
        click(&mut editor, Vec2::new(4.0, 0.0));
        assert_eq!(editor.world().shape(id).unwrap().vertices.len(), 3);
    }

    /// Dragging a vertex onto a neighbor merges them into one buffered
    /// vertex; dragging away restores the merged vertex and the ring
    #[test]
    fn test_vertex_merge_buffers_and_restores() {
        let (mut editor, id) = editor_with_square();
        click(&mut editor, Vec2::new(2.0, 2.0));

        // grab the corner at (4, 0) and drop it onto (4, 4)
        press(&mut editor, Vec2::new(4.0, 0.0));
        move_to(&mut editor, Vec2::new(4.0, 4.0));

        let Some(ShapeMode::Vertex {
            vertices, buffered, ..
        }) = editor.shape_mode(id)
        else {
            panic!("expected vertex mode");
        };
        assert_eq!(vertices.len(), 3);
        assert!(buffered.is_some());

        // moving off the merge point brings the merged vertex back
        move_to(&mut editor, Vec2::new(5.0, 0.0));

        let Some(ShapeMode::Vertex {
            vertices, buffered, ..
        }) = editor.shape_mode(id)
        else {
            panic!("expected vertex mode");
        };
        assert_eq!(vertices.len(), 4);
        assert!(buffered.is_none());

        release(&mut editor, Vec2::new(5.0, 0.0));
        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices.len(), 4);
        assert_eq!(shape.vertices[1].position, Vec2::new(5.0, 0.0));
        assert_eq!(find_self_intersection(&shape.vertices), None);

        assert!(editor.undo());
        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices[1].position, Vec2::new(4.0, 0.0));
    }

    #[test]
    fn test_escape_cancels_vertex_drag() {
        let (mut editor, id) = editor_with_triangle();
        click(&mut editor, Vec2::new(0.0, 0.0));
        press(&mut editor, Vec2::new(0.0, 2.0));
        move_to(&mut editor, Vec2::new(0.0, 5.0));

        editor.input(RawInput::KeyPressed(Key::Escape));
        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::None));

        // no mutation was emitted
        assert!(!editor.history().can_undo());
        let shape = editor.world().shape(id).unwrap();
        assert_eq!(shape.vertices[0].position, Vec2::new(0.0, 2.0));
    }

    /// Scenario C: overlapping shapes, selected beats unselected
    #[test]
    fn test_selected_shape_wins_overlapping_click() {
        let mut world = World::new();
        let a = world.add_shape(
            Vec2::ZERO,
            vertices_from_points(
                &[
                    Vec2::new(0.0, 2.0),
                    Vec2::new(-2.0, -2.0),
                    Vec2::new(2.0, -2.0),
                ],
                Rgb::new(255, 0, 0),
            ),
        );
        let b = world.add_shape(
            Vec2::ZERO,
            vertices_from_points(
                &[
                    Vec2::new(0.0, 3.0),
                    Vec2::new(-3.0, -3.0),
                    Vec2::new(3.0, -3.0),
                ],
                Rgb::new(0, 255, 0),
            ),
        );
        let mut editor = Editor::new(world, EditorConfig::default());

        // within the normal tier the newest listener runs first, so the
        // first click lands on B and selects it; A observes the consumed
        // event and stays idle
        click(&mut editor, Vec2::new(0.0, 0.0));
        assert_eq!(editor.shape_mode(b), Some(&ShapeMode::Selected));
        assert_eq!(editor.shape_mode(a), Some(&ShapeMode::None));

        // a click inside both goes to the selected shape only
        let consumed = press(&mut editor, Vec2::new(0.0, 0.0));
        assert!(consumed);
        assert_eq!(editor.shape_mode(b), Some(&ShapeMode::Selected));
        assert_eq!(editor.shape_mode(a), Some(&ShapeMode::None));
        assert!(!editor.history().can_undo());
    }

    /// Scenario D: a higher-priority machine consumes the release while a
    /// shape is mid-move; the shape aborts without a mutation
    #[test]
    fn test_consumed_release_aborts_move() {
        let mut world = World::demo();
        let shape_id = world.shapes[0].id;
        let rocket_id = world.rockets[0].id;
        // park the rocket over the shape so both gestures see the pointer
        world.rocket_mut(rocket_id).unwrap().position = Vec2::ZERO;
        let mut editor = Editor::new(world, EditorConfig::default());

        // put both machines mid-gesture; the rocket's family offset ranks
        // it above the shape inside the action tier
        editor
            .shapes
            .iter_mut()
            .find(|machine| machine.id == shape_id)
            .unwrap()
            .pending = Some(ShapeMode::Moving {
            offset: Vec2::ZERO,
            position: Vec2::ZERO,
        });
        editor
            .rockets
            .iter_mut()
            .find(|machine| machine.id == rocket_id)
            .unwrap()
            .pending = Some(RocketMode::Moving {
            position: Vec2::ZERO,
            rotation: 0.0,
        });
        for machine in &mut editor.shapes {
            machine.sync(&mut editor.bus);
        }
        for machine in &mut editor.rockets {
            machine.sync(&mut editor.bus);
        }

        // the release arrives while both are mid-gesture: the rocket
        // consumes it first, the shape must abort silently
        release(&mut editor, Vec2::new(4.0, 0.0));

        assert_eq!(editor.shape_mode(shape_id), Some(&ShapeMode::None));
        assert_eq!(editor.world().shape(shape_id).unwrap().position, Vec2::ZERO);
        assert_eq!(editor.rocket_mode(rocket_id), Some(&RocketMode::None));
    }

    #[test]
    fn test_rocket_shift_drag_snaps_to_edge() {
        let mut editor = Editor::new(World::demo(), EditorConfig::default());
        let rocket_id = editor.world().rockets[0].id;
        let start = editor.world().rocket(rocket_id).unwrap().position;

        editor.input(RawInput::KeyPressed(Key::Shift));
        press(&mut editor, start);
        assert!(matches!(
            editor.rocket_mode(rocket_id),
            Some(&RocketMode::Moving { .. })
        ));

        // drop it just below the triangle base
        move_to(&mut editor, Vec2::new(0.6, -2.3));
        release(&mut editor, Vec2::new(0.6, -2.3));

        let rocket = editor.world().rocket(rocket_id).unwrap();
        assert!((rocket.position.y - -2.0).abs() < 1e-6);
        assert!(rocket.rotation != 0.0);
        assert!(editor.history().can_undo());
    }

    #[test]
    fn test_camera_line_drag() {
        let mut world = World::new();
        let id = world.add_marker(
            Vec2::new(10.0, 0.0),
            Vec2::new(6.0, 4.0),
            Vec2::new(14.0, -4.0),
        );
        let mut editor = Editor::new(world, EditorConfig::default());

        // select the flag
        click(&mut editor, Vec2::new(10.0, 0.0));
        assert_eq!(editor.level_mode(id), Some(&LevelMode::Selected));

        // grab the left camera line and drag it out
        press(&mut editor, Vec2::new(6.0, 0.0));
        assert!(matches!(
            editor.level_mode(id),
            Some(&LevelMode::MovingCameraLine { .. })
        ));
        move_to(&mut editor, Vec2::new(4.0, 0.0));
        release(&mut editor, Vec2::new(4.0, 0.0));

        assert_eq!(editor.level_mode(id), Some(&LevelMode::Selected));
        assert_eq!(editor.world().marker(id).unwrap().camera_top_left.x, 4.0);

        assert!(editor.undo());
        assert_eq!(editor.world().marker(id).unwrap().camera_top_left.x, 6.0);
    }

    #[test]
    fn test_flag_shift_drag_moves_marker() {
        let mut world = World::new();
        let id = world.add_marker(
            Vec2::new(10.0, 0.0),
            Vec2::new(6.0, 4.0),
            Vec2::new(14.0, -4.0),
        );
        let mut editor = Editor::new(world, EditorConfig::default());

        editor.input(RawInput::KeyPressed(Key::Shift));
        press(&mut editor, Vec2::new(10.0, 0.0));
        assert!(matches!(
            editor.level_mode(id),
            Some(&LevelMode::Moving { .. })
        ));

        move_to(&mut editor, Vec2::new(12.0, 2.0));
        release(&mut editor, Vec2::new(12.0, 2.0));

        assert_eq!(editor.level_mode(id), Some(&LevelMode::Selected));
        assert_eq!(
            editor.world().marker(id).unwrap().position,
            Vec2::new(12.0, 2.0)
        );

        assert!(editor.undo());
        assert_eq!(
            editor.world().marker(id).unwrap().position,
            Vec2::new(10.0, 0.0)
        );
    }

    #[test]
    fn test_camera_rect_shift_drag_moves_both_corners() {
        let mut world = World::new();
        let id = world.add_marker(
            Vec2::new(10.0, 0.0),
            Vec2::new(6.0, 4.0),
            Vec2::new(14.0, -4.0),
        );
        let mut editor = Editor::new(world, EditorConfig::default());

        click(&mut editor, Vec2::new(10.0, 0.0));
        editor.input(RawInput::KeyPressed(Key::Shift));

        // grab the left camera line with shift: the whole rectangle moves
        press(&mut editor, Vec2::new(6.0, 0.0));
        assert!(matches!(
            editor.level_mode(id),
            Some(&LevelMode::MovingCamera { .. })
        ));

        move_to(&mut editor, Vec2::new(8.0, 1.0));
        release(&mut editor, Vec2::new(8.0, 1.0));

        let marker = editor.world().marker(id).unwrap();
        assert_eq!(marker.camera_top_left, Vec2::new(8.0, 5.0));
        assert_eq!(marker.camera_bottom_right, Vec2::new(16.0, -3.0));

        assert!(editor.undo());
        let marker = editor.world().marker(id).unwrap();
        assert_eq!(marker.camera_top_left, Vec2::new(6.0, 4.0));
        assert_eq!(marker.camera_bottom_right, Vec2::new(14.0, -4.0));
    }

    #[test]
    fn test_hover_claims_events() {
        let (mut editor, _) = editor_with_triangle();

        assert!(move_to(&mut editor, Vec2::new(0.0, 0.0)));
        assert!(!move_to(&mut editor, Vec2::new(20.0, 20.0)));
    }

    #[test]
    fn test_pointer_leave_aborts_gesture() {
        let (mut editor, id) = editor_with_triangle();
        click(&mut editor, Vec2::new(0.0, 0.0));
        press(&mut editor, Vec2::new(0.0, 2.0));
        move_to(&mut editor, Vec2::new(0.0, 4.0));

        editor.input(RawInput::PointerLeft);
        assert_eq!(editor.shape_mode(id), Some(&ShapeMode::None));
        assert!(!editor.history().can_undo());
    }

    /// Seeded drag soak: whatever the pointer does, committed shapes never
    /// self-intersect and never drop below three vertices
    #[test]
    fn test_random_gesture_soak_keeps_invariants() {
        let mut rng = Pcg32::seed_from_u64(0x1337_c0de);
        let (mut editor, id) = editor_with_triangle();

        for _ in 0..400 {
            let position = Vec2::new(
                rng.random_range(-16..=16) as f32 * 0.25,
                rng.random_range(-16..=16) as f32 * 0.25,
            );

            match rng.random_range(0..6) {
                0 => {
                    press(&mut editor, position);
                }
                1 => {
                    release(&mut editor, position);
                }
                2 => {
                    editor.input(RawInput::KeyPressed(Key::Shift));
                }
                3 => {
                    editor.input(RawInput::KeyReleased(Key::Shift));
                }
                _ => {
                    move_to(&mut editor, position);
                }
            }

            let shape = editor.world().shape(id).unwrap();
            assert!(shape.vertices.len() >= 3);
            assert_eq!(find_self_intersection(&shape.vertices), None);
        }
    }
}
