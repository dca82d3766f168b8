//! Footprint containment and overlap on the ground plane.
//!
//! Footprints are convex polygons (projected bounding boxes). Overlap
//! uses the Separating Axis Theorem over every edge normal of both
//! polygons; containment checks each inner vertex against every edge of
//! the outer polygon.

use serde::{Deserialize, Serialize};

use crate::primitives::Vector2;

/// How boundary contact is treated.
///
/// `Permissive` (the default) lets a footprint sit flush against an
/// obstacle or the surface edge. `Strict` treats any shared boundary as
/// contact and rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPolicy {
    #[default]
    Permissive,
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vector2>,
}

impl Polygon {
    /// Build a polygon, reversing the vertex order if needed so the
    /// winding is counter-clockwise.
    pub fn new(mut vertices: Vec<Vector2>) -> Self {
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vector2] {
        &self.vertices
    }

    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Axis-aligned `(min, max)` corners enclosing every vertex.
    pub fn envelope(&self) -> (Vector2, Vector2) {
        let mut lo = Vector2::new(f64::INFINITY, f64::INFINITY);
        let mut hi = Vector2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            lo.x = lo.x.min(v.x);
            lo.y = lo.y.min(v.y);
            hi.x = hi.x.max(v.x);
            hi.y = hi.y.max(v.y);
        }
        (lo, hi)
    }

    fn edges(&self) -> impl Iterator<Item = (Vector2, Vector2)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

impl From<[Vector2; 4]> for Polygon {
    fn from(corners: [Vector2; 4]) -> Self {
        Polygon::new(corners.to_vec())
    }
}

fn signed_area(vertices: &[Vector2]) -> f64 {
    let n = vertices.len();
    let mut twice = 0.0;
    for i in 0..n {
        twice += vertices[i].cross(vertices[(i + 1) % n]);
    }
    twice / 2.0
}

fn project(poly: &Polygon, axis: Vector2) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in &poly.vertices {
        let dot = v.dot(axis);
        lo = lo.min(dot);
        hi = hi.max(dot);
    }
    (lo, hi)
}

fn separated(max_a: f64, min_b: f64, policy: ContactPolicy) -> bool {
    match policy {
        ContactPolicy::Permissive => max_a <= min_b,
        ContactPolicy::Strict => max_a < min_b,
    }
}

/// True if every vertex of `inner` lies within the convex `outer`.
/// Under `Permissive`, vertices on the boundary count as inside.
pub fn contains(outer: &Polygon, inner: &Polygon, policy: ContactPolicy) -> bool {
    if outer.vertices.len() < 3 {
        return false;
    }
    inner.vertices.iter().all(|&p| {
        outer.edges().all(|(a, b)| {
            let side = (b - a).cross(p - a);
            match policy {
                ContactPolicy::Permissive => side >= 0.0,
                ContactPolicy::Strict => side > 0.0,
            }
        })
    })
}

/// True if two convex polygons share interior area. Under `Permissive`,
/// touching along an edge or at a corner is not overlap.
pub fn overlaps(a: &Polygon, b: &Polygon, policy: ContactPolicy) -> bool {
    // Envelope rejection before the full axis sweep.
    let (a_lo, a_hi) = a.envelope();
    let (b_lo, b_hi) = b.envelope();
    if separated(a_hi.x, b_lo.x, policy)
        || separated(b_hi.x, a_lo.x, policy)
        || separated(a_hi.y, b_lo.y, policy)
        || separated(b_hi.y, a_lo.y, policy)
    {
        return false;
    }

    for poly in [a, b] {
        for (p, q) in poly.edges() {
            let edge = q - p;
            if edge.x == 0.0 && edge.y == 0.0 {
                continue;
            }
            let axis = Vector2::new(-edge.y, edge.x);
            let (min_a, max_a) = project(a, axis);
            let (min_b, max_b) = project(b, axis);
            if separated(max_a, min_b, policy) || separated(max_b, min_a, policy) {
                return false;
            }
        }
    }
    true
}
