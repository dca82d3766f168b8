//! Rigid objects: an identity, a semantic type tag, a pose and a
//! bounding box that follows every planar move of the pose.

use std::fmt;

use crate::collision::Polygon;
use crate::error::SamplingError;
use crate::primitives::{BoundingBox, Pose, Vector2};
use crate::types::{ObjectRecord, RecordHeader, OBJECT3D_RECORD_TYPE};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RigidObject {
    pub id: String,
    /// Free-form category such as "surface" or "cup". Nothing branches on it.
    pub object_type: String,
    pose: Pose,
    bbox: BoundingBox,
}

impl RigidObject {
    pub fn new(
        id: impl Into<String>,
        object_type: impl Into<String>,
        pose: Pose,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
            pose,
            bbox,
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Set the absolute yaw to `theta`, swinging the bounding box about
    /// the current planar position by the change in yaw.
    pub fn rotate_around_z(&mut self, theta: f64) {
        let delta = theta - self.pose.orientation.z;
        self.pose.orientation.z = theta;
        self.bbox.rotate_around_z(self.pose.planar_position(), delta);
    }

    /// Move to `new_position` in the plane; z and orientation are kept.
    pub fn planar_translate_to(&mut self, new_position: Vector2) {
        let old_position = self.pose.planar_position();
        self.pose.position.x = new_position.x;
        self.pose.position.y = new_position.y;
        self.bbox.planar_translate(old_position, new_position);
    }

    pub fn project_footprint(&self) -> Polygon {
        self.bbox.project_to_plane()
    }

    pub fn to_record(&self) -> ObjectRecord {
        ObjectRecord {
            header: RecordHeader::default(),
            id: self.id.clone(),
            object_type: self.object_type.clone(),
            pose: self.pose.clone(),
            bounding_box: self.bbox.clone(),
        }
    }

    pub fn from_record(record: ObjectRecord) -> Result<Self, SamplingError> {
        if record.header.record_type != OBJECT3D_RECORD_TYPE {
            return Err(SamplingError::MalformedInput(format!(
                "object '{}' has record type '{}', expected '{}'",
                record.id, record.header.record_type, OBJECT3D_RECORD_TYPE
            )));
        }
        if !record.pose.is_finite() {
            return Err(SamplingError::MalformedInput(format!(
                "object '{}' has a non-finite pose",
                record.id
            )));
        }
        record.bounding_box.validate()?;
        Ok(Self {
            id: record.id,
            object_type: record.object_type,
            pose: record.pose,
            bbox: record.bounding_box,
        })
    }
}

fn write_xyz(f: &mut fmt::Formatter<'_>, x: f64, y: f64, z: f64) -> fmt::Result {
    writeln!(f, "    x: {x:?}")?;
    writeln!(f, "    y: {y:?}")?;
    write!(f, "    z: {z:?}")
}

impl fmt::Display for RigidObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (p, o) = (self.pose.position, self.pose.orientation);
        let (lo, hi) = (self.bbox.min(), self.bbox.max());
        writeln!(f, "id: {}", self.id)?;
        writeln!(f, "type: {}", self.object_type)?;
        writeln!(f, "pose:")?;
        writeln!(f, "  position:")?;
        write_xyz(f, p.x, p.y, p.z)?;
        writeln!(f, "\n  orientation:")?;
        write_xyz(f, o.x, o.y, o.z)?;
        writeln!(f, "\nbbox:")?;
        writeln!(f, "  min:")?;
        write_xyz(f, lo.x, lo.y, lo.z)?;
        writeln!(f, "\n  max:")?;
        write_xyz(f, hi.x, hi.y, hi.z)
    }
}
