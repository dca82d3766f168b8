//! Vectors, poses and bounding boxes.
//!
//! All of these are plain values: assigning or cloning one never shares
//! geometry with the source, so an object's rest pose and a sampler's
//! working pose cannot alias.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::collision::Polygon;
use crate::error::SamplingError;
use crate::types::BoundingBoxRecord;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Counter-clockwise rotation by `theta` radians about `pivot`.
    pub fn rotated_around(self, pivot: Vector2, theta: f64) -> Vector2 {
        let (sin_t, cos_t) = theta.sin_cos();
        let d = self - pivot;
        Vector2 {
            x: pivot.x + d.x * cos_t - d.y * sin_t,
            y: pivot.y + d.x * sin_t + d.y * cos_t,
        }
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Position plus per-axis orientation angles. Planar code only reads
/// `orientation.z` (yaw).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub frame_id: String,
    pub position: Vector3,
    pub orientation: Vector3,
}

impl Pose {
    pub fn new(position: Vector3, orientation: Vector3) -> Self {
        Self {
            frame_id: String::new(),
            position,
            orientation,
        }
    }

    pub fn yaw(&self) -> f64 {
        self.orientation.z
    }

    pub fn planar_position(&self) -> Vector2 {
        self.position.xy()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

/// Axis-aligned bounding volume with an exact planar footprint.
///
/// `min`/`max` are always the axis-aligned envelope of the box. Once the
/// box has been rotated about z that envelope is looser than the box
/// itself, so the rotated rectangle is tracked separately in
/// `footprint` and is what [`project_to_plane`](Self::project_to_plane)
/// returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundingBoxRecord", into = "BoundingBoxRecord")]
pub struct BoundingBox {
    min: Vector3,
    max: Vector3,
    footprint: [Vector2; 4],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vector3::default(),
            max: Vector3::default(),
            footprint: [Vector2::default(); 4],
        }
    }
}

fn rect_corners(min: Vector3, max: Vector3) -> [Vector2; 4] {
    [
        Vector2::new(min.x, min.y),
        Vector2::new(max.x, min.y),
        Vector2::new(max.x, max.y),
        Vector2::new(min.x, max.y),
    ]
}

const FOOTPRINT_TOLERANCE: f64 = 1e-9;

fn envelope(corners: &[Vector2; 4]) -> (Vector2, Vector2) {
    let (mut lo, mut hi) = (corners[0], corners[0]);
    for c in &corners[1..] {
        lo.x = lo.x.min(c.x);
        lo.y = lo.y.min(c.y);
        hi.x = hi.x.max(c.x);
        hi.y = hi.y.max(c.y);
    }
    (lo, hi)
}

/// Convex, opposite sides equal, and a right angle at the first corner.
/// `tol` bounds the squared-length quantities compared.
fn is_rectangle(c: &[Vector2; 4], tol: f64) -> bool {
    let edges = [c[1] - c[0], c[2] - c[1], c[3] - c[2], c[0] - c[3]];
    let turns = [0, 1, 2, 3].map(|i| edges[i].cross(edges[(i + 1) % 4]));
    let convex = turns.iter().all(|&t| t >= -tol) || turns.iter().all(|&t| t <= tol);
    let len2 = |v: Vector2| v.dot(v);
    let opposite_equal = (len2(edges[0]) - len2(edges[2])).abs() <= tol
        && (len2(edges[1]) - len2(edges[3])).abs() <= tol;
    convex && opposite_equal && edges[0].dot(edges[1]).abs() <= tol
}

impl BoundingBox {
    pub fn new(min: Vector3, max: Vector3) -> Result<Self, SamplingError> {
        let bbox = Self {
            min,
            max,
            footprint: rect_corners(min, max),
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn min(&self) -> Vector3 {
        self.min
    }

    pub fn max(&self) -> Vector3 {
        self.max
    }

    pub fn footprint(&self) -> &[Vector2; 4] {
        &self.footprint
    }

    pub fn validate(&self) -> Result<(), SamplingError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(SamplingError::MalformedInput(
                "bounding box corners must be finite".into(),
            ));
        }
        if !self.footprint.iter().all(|c| c.is_finite()) {
            return Err(SamplingError::MalformedInput(
                "bounding box footprint must be finite".into(),
            ));
        }
        for (axis, lo, hi) in [
            ("x", self.min.x, self.max.x),
            ("y", self.min.y, self.max.y),
            ("z", self.min.z, self.max.z),
        ] {
            if lo > hi {
                return Err(SamplingError::MalformedInput(format!(
                    "bounding box min.{axis} ({lo}) exceeds max.{axis} ({hi})"
                )));
            }
        }
        self.validate_footprint()
    }

    /// The footprint must be a rectangle whose envelope is `min`/`max`.
    fn validate_footprint(&self) -> Result<(), SamplingError> {
        let scale = [self.min.x, self.min.y, self.max.x, self.max.y]
            .iter()
            .fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let tol = FOOTPRINT_TOLERANCE * scale;
        let (lo, hi) = envelope(&self.footprint);
        if (lo.x - self.min.x).abs() > tol
            || (lo.y - self.min.y).abs() > tol
            || (hi.x - self.max.x).abs() > tol
            || (hi.y - self.max.y).abs() > tol
        {
            return Err(SamplingError::MalformedInput(format!(
                "bounding box footprint spans ({}, {})-({}, {}), \
                 expected ({}, {})-({}, {})",
                lo.x, lo.y, hi.x, hi.y, self.min.x, self.min.y, self.max.x, self.max.y
            )));
        }
        if !is_rectangle(&self.footprint, tol * scale) {
            return Err(SamplingError::MalformedInput(
                "bounding box footprint is not a rectangle".into(),
            ));
        }
        Ok(())
    }

    /// Rotate the footprint counter-clockwise by `theta` radians about
    /// `pivot`, then re-derive the xy envelope. z is untouched.
    pub fn rotate_around_z(&mut self, pivot: Vector2, theta: f64) {
        if theta == 0.0 {
            return;
        }
        for corner in &mut self.footprint {
            *corner = corner.rotated_around(pivot, theta);
        }
        self.refresh_envelope();
    }

    /// Shift the box by `new_xy - old_xy` in the plane.
    pub fn planar_translate(&mut self, old_xy: Vector2, new_xy: Vector2) {
        let d = new_xy - old_xy;
        self.min.x += d.x;
        self.min.y += d.y;
        self.max.x += d.x;
        self.max.y += d.y;
        for corner in &mut self.footprint {
            *corner = *corner + d;
        }
    }

    /// The xy footprint as a counter-clockwise quadrilateral.
    pub fn project_to_plane(&self) -> Polygon {
        Polygon::from(self.footprint)
    }

    fn refresh_envelope(&mut self) {
        let (lo, hi) = envelope(&self.footprint);
        self.min.x = lo.x;
        self.min.y = lo.y;
        self.max.x = hi.x;
        self.max.y = hi.y;
    }
}

impl TryFrom<BoundingBoxRecord> for BoundingBox {
    type Error = SamplingError;

    fn try_from(record: BoundingBoxRecord) -> Result<Self, Self::Error> {
        let footprint = match record.footprint {
            None => rect_corners(record.min, record.max),
            Some(points) => <[Vector2; 4]>::try_from(points).map_err(|points| {
                SamplingError::MalformedInput(format!(
                    "bounding box footprint needs 4 corners, got {}",
                    points.len()
                ))
            })?,
        };
        let bbox = BoundingBox {
            min: record.min,
            max: record.max,
            footprint,
        };
        bbox.validate()?;
        Ok(bbox)
    }
}

impl From<BoundingBox> for BoundingBoxRecord {
    fn from(bbox: BoundingBox) -> Self {
        BoundingBoxRecord {
            min: bbox.min,
            max: bbox.max,
            footprint: Some(bbox.footprint.to_vec()),
        }
    }
}
