//! Editable entities and the world container
//!
//! Shapes hold their vertex rings in shape-local coordinates; rockets and
//! level markers are rotated rectangles for hit-testing. The world is only
//! ever mutated through committed [`crate::history::Mutation`]s - mode
//! callbacks read it and keep private working copies until a gesture ends.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::geometry::{
    self, EdgeHit, Rgb, Vertex, distance_to_segment, normalize_winding, point_in_ring,
    vertices_from_points,
};
use crate::rotate_vec;

/// Whether `point` lies inside the axis-aligned `size` box centered at
/// `center` and rotated by `rotation`
pub fn point_in_rotated_rect(point: Vec2, center: Vec2, rotation: f32, size: Vec2) -> bool {
    let local = rotate_vec(point - center, -rotation);
    local.x.abs() <= size.x / 2.0 && local.y.abs() <= size.y / 2.0
}

/// A polygon with a consistently wound, non-self-intersecting vertex ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: u32,
    pub position: Vec2,
    pub vertices: Vec<Vertex>,
}

impl Shape {
    pub fn new(id: u32, position: Vec2, mut vertices: Vec<Vertex>) -> Self {
        normalize_winding(&mut vertices);
        Self {
            id,
            position,
            vertices,
        }
    }

    pub fn point_inside(&self, world_point: Vec2) -> bool {
        point_in_ring(world_point - self.position, &self.vertices)
    }

    /// Closest vertex to a world-space point, within `snap_distance`
    pub fn closest_vertex(&self, world_point: Vec2, snap_distance: f32) -> Option<usize> {
        geometry::closest_vertex(&self.vertices, world_point - self.position, snap_distance)
    }

    /// Closest edge to a world-space point, within `snap_distance`. The hit
    /// point is translated back into world coordinates.
    pub fn closest_edge(&self, world_point: Vec2, snap_distance: f32) -> Option<EdgeHit> {
        geometry::closest_edge(&self.vertices, world_point - self.position, snap_distance).map(
            |hit| EdgeHit {
                indices: hit.indices,
                point: hit.point + self.position,
            },
        )
    }
}

/// The player rocket, a rotated rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rocket {
    pub id: u32,
    pub position: Vec2,
    pub rotation: f32,
}

impl Rocket {
    pub fn contains(&self, point: Vec2, size: Vec2) -> bool {
        point_in_rotated_rect(point, self.position, self.rotation, size)
    }
}

/// One of the four boundary lines of a marker's camera rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// A level flag plus the camera rectangle it owns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelMarker {
    pub id: u32,
    pub position: Vec2,
    pub rotation: f32,
    pub camera_top_left: Vec2,
    pub camera_bottom_right: Vec2,
}

impl LevelMarker {
    pub fn flag_contains(&self, point: Vec2, size: Vec2) -> bool {
        point_in_rotated_rect(point, self.position, self.rotation, size)
    }

    /// The four boundary segments of the camera rectangle
    pub fn camera_lines(&self) -> [(CameraSide, Vec2, Vec2); 4] {
        let tl = self.camera_top_left;
        let br = self.camera_bottom_right;
        let tr = Vec2::new(br.x, tl.y);
        let bl = Vec2::new(tl.x, br.y);

        [
            (CameraSide::Top, tl, tr),
            (CameraSide::Right, tr, br),
            (CameraSide::Bottom, br, bl),
            (CameraSide::Left, bl, tl),
        ]
    }

    /// Boundary line closest to `point`, within `snap_distance`
    pub fn closest_camera_side(&self, point: Vec2, snap_distance: f32) -> Option<CameraSide> {
        let mut closest = None;
        let mut min_distance = f32::MAX;

        for (side, a, b) in self.camera_lines() {
            let distance = distance_to_segment(a, b, point);
            if distance < min_distance {
                min_distance = distance;
                closest = Some(side);
            }
        }

        if min_distance > snap_distance {
            return None;
        }

        closest
    }

    /// Move one boundary line to pass through `point`. Dragging a line past
    /// its opposite swaps the coordinates so top-left stays top-left.
    pub fn set_camera_side(&mut self, side: CameraSide, point: Vec2) {
        match side {
            CameraSide::Left => self.camera_top_left.x = point.x,
            CameraSide::Right => self.camera_bottom_right.x = point.x,
            CameraSide::Top => self.camera_top_left.y = point.y,
            CameraSide::Bottom => self.camera_bottom_right.y = point.y,
        }

        if self.camera_top_left.x > self.camera_bottom_right.x {
            std::mem::swap(&mut self.camera_top_left.x, &mut self.camera_bottom_right.x);
        }
        if self.camera_top_left.y < self.camera_bottom_right.y {
            std::mem::swap(&mut self.camera_top_left.y, &mut self.camera_bottom_right.y);
        }
    }

    /// Move the whole camera rectangle
    pub fn move_camera(&mut self, offset: Vec2) {
        self.camera_top_left += offset;
        self.camera_bottom_right += offset;
    }
}

/// All editable entities of one level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    pub shapes: Vec<Shape>,
    pub rockets: Vec<Rocket>,
    pub markers: Vec<LevelMarker>,
    next_id: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default editor scene: one triangle and one rocket next to it
    pub fn demo() -> Self {
        let mut world = Self::new();

        let vertices = vertices_from_points(
            &[
                Vec2::new(0.0, 2.0),
                Vec2::new(-2.0, -2.0),
                Vec2::new(2.0, -2.0),
            ],
            Rgb::new(200, 200, 200),
        );
        world.add_shape(Vec2::ZERO, vertices);
        world.add_rocket(Vec2::new(5.0, 0.0), 0.0);

        world
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_shape(&mut self, position: Vec2, vertices: Vec<Vertex>) -> u32 {
        let id = self.next_entity_id();
        self.shapes.push(Shape::new(id, position, vertices));
        id
    }

    pub fn add_rocket(&mut self, position: Vec2, rotation: f32) -> u32 {
        let id = self.next_entity_id();
        self.rockets.push(Rocket {
            id,
            position,
            rotation,
        });
        id
    }

    pub fn add_marker(
        &mut self,
        position: Vec2,
        camera_top_left: Vec2,
        camera_bottom_right: Vec2,
    ) -> u32 {
        let id = self.next_entity_id();
        self.markers.push(LevelMarker {
            id,
            position,
            rotation: 0.0,
            camera_top_left,
            camera_bottom_right,
        });
        id
    }

    pub fn shape(&self, id: u32) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.id == id)
    }

    pub fn shape_mut(&mut self, id: u32) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|shape| shape.id == id)
    }

    pub fn rocket(&self, id: u32) -> Option<&Rocket> {
        self.rockets.iter().find(|rocket| rocket.id == id)
    }

    pub fn rocket_mut(&mut self, id: u32) -> Option<&mut Rocket> {
        self.rockets.iter_mut().find(|rocket| rocket.id == id)
    }

    pub fn marker(&self, id: u32) -> Option<&LevelMarker> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    pub fn marker_mut(&mut self, id: u32) -> Option<&mut LevelMarker> {
        self.markers.iter_mut().find(|marker| marker.id == id)
    }

    /// Closest shape edge to a world-space point over all shapes, within
    /// `snap_distance`
    pub fn closest_shape_edge(&self, point: Vec2, snap_distance: f32) -> Option<(u32, EdgeHit)> {
        let mut best: Option<(u32, EdgeHit)> = None;
        let mut min_distance = f32::MAX;

        for shape in &self.shapes {
            if let Some(hit) = shape.closest_edge(point, snap_distance) {
                let distance = hit.point.distance(point);
                if distance < min_distance {
                    min_distance = distance;
                    best = Some((shape.id, hit));
                }
            }
        }

        best
    }
}

/// Propose a placement for a dragged rocket: snapped along the closest shape
/// edge at intervals of `snap_distance` and rotated to follow the edge, or
/// the grid-snapped pointer with no rotation when no edge is near.
pub fn find_location_for_rocket(
    world: &World,
    position: Vec2,
    position_in_grid: Vec2,
    snap_distance: f32,
) -> (Vec2, f32) {
    let Some((shape_id, hit)) = world.closest_shape_edge(position, snap_distance) else {
        return (position_in_grid, 0.0);
    };
    let Some(shape) = world.shape(shape_id) else {
        return (position_in_grid, 0.0);
    };

    let start = shape.vertices[hit.indices.0].position + shape.position;
    let end = shape.vertices[hit.indices.1].position + shape.position;
    let edge = end - start;
    let rotation = edge.y.atan2(edge.x) + std::f32::consts::PI;

    let along = (position - start).length();
    let snapped = (along / snap_distance).round() * snap_distance;
    let point = start + edge.normalize_or_zero() * snapped.min(edge.length());

    (point, rotation)
}

/// Default camera rectangle around a freshly placed marker
pub fn default_camera_bounds(position: Vec2) -> (Vec2, Vec2) {
    (
        position + Vec2::new(-FLAG_CAMERA_EXTENT, FLAG_CAMERA_EXTENT),
        position + Vec2::new(FLAG_CAMERA_EXTENT, -FLAG_CAMERA_EXTENT),
    )
}
