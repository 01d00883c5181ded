//! Polygon queries and intersection-safe vertex editing
//!
//! The tricky part of the editor: a dragged vertex must never leave its
//! polygon self-intersecting, no matter where the pointer goes. Everything
//! here is a pure function over a vertex ring; callers own the data.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MIN_SHAPE_VERTICES;

/// Per-vertex fill color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel-wise midpoint, used when a vertex is inserted on an edge
    pub fn mix(a: Rgb, b: Rgb) -> Rgb {
        Rgb {
            r: ((a.r as u16 + b.r as u16) / 2) as u8,
            g: ((a.g as u16 + b.g as u16) / 2) as u8,
            b: ((a.b as u16 + b.b as u16) / 2) as u8,
        }
    }
}

/// One vertex of a shape, in shape-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Rgb,
}

impl Vertex {
    pub fn new(position: Vec2, color: Rgb) -> Self {
        Self { position, color }
    }
}

/// Build a vertex ring from bare points, all with the same color
pub fn vertices_from_points(points: &[Vec2], color: Rgb) -> Vec<Vertex> {
    points.iter().map(|&p| Vertex::new(p, color)).collect()
}

/// Twice the signed area of triangle a-b-c; positive when c lies to the
/// left of a->b, zero when collinear
#[inline]
pub fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Bounding-box containment for a point known to be collinear with a-b
fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Whether segments a-b and c-d intersect, properly or by touching at a
/// boundary point
pub fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(c, d, a))
        || (d2 == 0.0 && on_segment(c, d, b))
        || (d3 == 0.0 && on_segment(a, b, c))
        || (d4 == 0.0 && on_segment(a, b, d))
}

/// Whether segments a-b and c-d cross. Stricter than
/// [`segments_intersect`]: sharing an endpoint or overlapping collinearly
/// does not count, so a ring holding two coincident vertices mid-edit can
/// still be worked on.
pub fn segments_cross(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let ccw = |a: Vec2, b: Vec2, c: Vec2| orient(a, b, c) > 0.0;

    ccw(a, c, d) != ccw(b, c, d) && ccw(a, b, c) != ccw(a, b, d)
}

/// Closest point to `point` on the segment a-b
pub fn closest_point_on_segment(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let v = b - a;
    let w = point - a;

    let c1 = w.dot(v);
    if c1 <= 0.0 {
        return a;
    }

    let c2 = v.dot(v);
    if c2 <= c1 {
        return b;
    }

    a + v * (c1 / c2)
}

pub fn distance_to_segment(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    closest_point_on_segment(a, b, point).distance(point)
}

/// Even-odd ray-cast test over a vertex ring in shape-local coordinates
pub fn point_in_ring(point: Vec2, vertices: &[Vertex]) -> bool {
    if vertices.is_empty() {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let vi = vertices[i].position;
        let vj = vertices[j].position;

        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Index of the vertex closest to `point`, if within `snap_distance`.
/// Ties keep the first candidate in iteration order.
pub fn closest_vertex(vertices: &[Vertex], point: Vec2, snap_distance: f32) -> Option<usize> {
    let mut min_distance = f32::MAX;
    let mut closest = None;

    for (i, vertex) in vertices.iter().enumerate() {
        let distance = vertex.position.distance(point);
        if distance < min_distance {
            min_distance = distance;
            closest = Some(i);
        }
    }

    if min_distance > snap_distance {
        return None;
    }

    closest
}

/// Result of a closest-edge query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    /// Indices of the edge's endpoints, in ring order
    pub indices: (usize, usize),
    /// Closest point on the edge
    pub point: Vec2,
}

/// Edge of the ring closest to `point`, if within `snap_distance`
pub fn closest_edge(vertices: &[Vertex], point: Vec2, snap_distance: f32) -> Option<EdgeHit> {
    let len = vertices.len();
    let mut min_distance = f32::MAX;
    let mut hit = None;

    for i in 0..len {
        let j = (i + 1) % len;
        let closest = closest_point_on_segment(vertices[i].position, vertices[j].position, point);
        let distance = closest.distance(point);

        if distance < min_distance {
            min_distance = distance;
            hit = Some(EdgeHit {
                indices: (i, j),
                point: closest,
            });
        }
    }

    if min_distance > snap_distance {
        return None;
    }

    hit
}

/// First pair of non-adjacent edges that intersect, as their start indices.
/// A committed shape must always return `None` here.
pub fn find_self_intersection(vertices: &[Vertex]) -> Option<(usize, usize)> {
    let len = vertices.len();

    for i in 0..len {
        for j in (i + 1)..len {
            if j == i + 1 || (i == 0 && j == len - 1) {
                continue;
            }

            let (a, b) = ring_edge(vertices, i);
            let (c, d) = ring_edge(vertices, j);

            if segments_intersect(a, b, c, d) {
                return Some((i, j));
            }
        }
    }

    None
}

#[inline]
fn ring_edge(vertices: &[Vertex], i: usize) -> (Vec2, Vec2) {
    (
        vertices[i].position,
        vertices[(i + 1) % vertices.len()].position,
    )
}

/// Whether the vertex at `index` can be removed without the edge joining its
/// neighbors crossing the rest of the ring, and without dropping below the
/// minimum vertex count
pub fn can_remove_vertex(vertices: &[Vertex], index: usize) -> bool {
    let len = vertices.len();
    if len <= MIN_SHAPE_VERTICES {
        return false;
    }

    let left = (index + len - 1) % len;
    let right = (index + 1) % len;
    let a = vertices[left].position;
    let b = vertices[right].position;

    for i in 0..len {
        let j = (i + 1) % len;
        if i == index || j == index || i == left || j == left || i == right || j == right {
            continue;
        }

        if segments_intersect(a, b, vertices[i].position, vertices[j].position) {
            return false;
        }
    }

    true
}

/// First edge in conflict with moving the vertex at `index` from `from` to
/// `to`: the movement path and the two edges formed by the candidate
/// position are each tested for a proper crossing against every
/// non-adjacent edge. Returns the start index of the conflicting edge.
fn conflict_scan(vertices: &[Vertex], index: usize, from: Vec2, to: Vec2) -> Option<usize> {
    let len = vertices.len();
    let left = (index + len - 1) % len;
    let right = (index + 1) % len;

    for i in 0..len {
        let j = (i + 1) % len;
        if i == index || j == index {
            continue;
        }

        let a = vertices[i].position;
        let b = vertices[j].position;

        if segments_cross(from, to, a, b) {
            return Some(i);
        }
        if i != left && j != left && segments_cross(to, vertices[left].position, a, b) {
            return Some(i);
        }
        if i != right && j != right && segments_cross(to, vertices[right].position, a, b) {
            return Some(i);
        }
    }

    None
}

/// Whether the movement path `from`-`to` properly crosses any ring edge
/// that is neither adjacent to `index` nor the `skip` edge
fn path_crosses_ring(
    vertices: &[Vertex],
    index: usize,
    skip: Option<(usize, usize)>,
    from: Vec2,
    to: Vec2,
) -> bool {
    let len = vertices.len();

    for i in 0..len {
        let j = (i + 1) % len;
        if i == index || j == index {
            continue;
        }
        if skip == Some((i, j)) || skip == Some((j, i)) {
            continue;
        }

        if segments_cross(from, to, vertices[i].position, vertices[j].position) {
            return true;
        }
    }

    false
}

/// Move the vertex at `index` to `to`, keeping the ring free of
/// self-intersections.
///
/// A crossing-free candidate is applied directly, then double-checked for
/// boundary-touching contact the proper-crossing scan does not see. When
/// the move properly crosses a non-adjacent edge, exactly one corrective
/// reordering is tried: the vertex is spliced to sit just past the crossed
/// edge, and the result must be crossing-free both at the new and the
/// vacated location. If the retry still conflicts the ring is restored
/// unchanged and `None` is returned, which callers treat as "do not apply"
/// - the dragged vertex visibly sticks at its last valid position. General
/// polygon untangling is unbounded, so anything the single retry cannot
/// fix is rejected.
///
/// Returns the vertex's index after the move (it changes when the splice
/// reorders the ring).
pub fn relocate_vertex(vertices: &mut Vec<Vertex>, index: usize, to: Vec2) -> Option<usize> {
    let from = vertices[index].position;
    if from == to {
        return Some(index);
    }

    let Some(i) = conflict_scan(vertices, index, from, to) else {
        vertices[index].position = to;
        if find_self_intersection(vertices).is_some() {
            log::debug!("vertex {index} move would touch the ring; rejected");
            vertices[index].position = from;
            return None;
        }
        return Some(index);
    };

    let len = vertices.len();
    let saved = vertices.clone();

    vertices[index].position = to;
    let moved = vertices[index];
    vertices.insert(i + 1, moved);
    let removed = if index < i { index } else { index + 1 };
    vertices.remove(removed);
    let new_index = if index < i { i } else { i + 1 };

    // the splice joins the moved vertex's old neighbors with a brand new
    // edge, which the movement path may legitimately cross. In a triangle
    // that edge already existed, so it stays checked.
    let joining = (len > MIN_SHAPE_VERTICES).then(|| {
        let shifted = |k: usize| {
            let k = if k <= i { k } else { k + 1 };
            if k > removed { k - 1 } else { k }
        };
        (shifted((index + len - 1) % len), shifted((index + 1) % len))
    });

    if find_self_intersection(vertices).is_none()
        && !path_crosses_ring(vertices, new_index, joining, from, to)
    {
        log::debug!("vertex {index} spliced past edge {i}, now at index {new_index}");
        return Some(new_index);
    }

    log::warn!("unable to resolve vertex crossing at edge {i}; move rejected");
    *vertices = saved;
    None
}

/// Signed area of the ring (shoelace). Positive for the canonical winding.
pub fn signed_area(vertices: &[Vertex]) -> f32 {
    let len = vertices.len();
    let mut sum = 0.0;

    for i in 0..len {
        let a = vertices[i].position;
        let b = vertices[(i + 1) % len].position;
        sum += a.x * b.y - b.x * a.y;
    }

    sum * 0.5
}

/// Reverse the ring when its signed area is negative, so every committed
/// shape carries the same winding. Returns whether the list was reversed.
pub fn normalize_winding(vertices: &mut [Vertex]) -> bool {
    if signed_area(vertices) < 0.0 {
        vertices.reverse();
        return true;
    }

    false
}
