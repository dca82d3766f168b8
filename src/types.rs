//! Record and parameter types for the placement engine's JSON interchange.
//!
//! Everything here derives Serialize + Deserialize. Object and scenario
//! records are the persistence/logging boundary and must round-trip
//! without loss.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::collision::ContactPolicy;
use crate::primitives::{BoundingBox, Pose, Vector2, Vector3};

// -- Object records ------------------------------------------------

pub const OBJECT3D_RECORD_TYPE: &str = "Object3d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    #[serde(rename = "type")]
    pub record_type: String,
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self {
            record_type: OBJECT3D_RECORD_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxRecord {
    pub min: Vector3,
    pub max: Vector3,
    /// Exact xy footprint, counter-clockwise. Derived from `min`/`max`
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Vec<Vector2>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(default)]
    pub header: RecordHeader,
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    pub pose: Pose,
    pub bounding_box: BoundingBox,
}

/// The four sampling inputs, kept as a record for replay and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(default)]
    pub frame_id: String,
    pub manipulated_object: ObjectRecord,
    #[serde(default, alias = "objects_on_surface")]
    pub static_objects: Vec<ObjectRecord>,
    pub surface: ObjectRecord,
}

// -- Sampler parameters --------------------------------------------

/// Interval the candidate yaw is drawn from, in radians.
/// `min == max` pins every candidate to a single orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YawRange {
    pub min: f64,
    pub max: f64,
}

impl Default for YawRange {
    fn default() -> Self {
        Self { min: 0.0, max: TAU }
    }
}

fn default_max_attempts() -> u32 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerParams {
    #[serde(default)]
    pub seed: u64,
    /// Number of accepted poses wanted. Signed so that a non-positive
    /// count reaches request validation instead of failing to parse.
    pub number_of_samples: i64,
    /// Attempt ceiling across all workers.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub contact_policy: ContactPolicy,
    #[serde(default)]
    pub yaw_range: YawRange,
    /// Split attempts across this many rayon workers. `None` or 1 runs
    /// serially.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<u32>,
}

impl SamplerParams {
    pub fn new(number_of_samples: i64) -> Self {
        Self {
            seed: 0,
            number_of_samples,
            max_attempts: default_max_attempts(),
            contact_policy: ContactPolicy::default(),
            yaw_range: YawRange::default(),
            num_workers: None,
        }
    }
}

/// Full request accepted by [`sample_json`](crate::sample_json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    pub scenario: ScenarioRecord,
    #[serde(flatten)]
    pub sampler: SamplerParams,
}

// -- Results -------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectionCounts {
    #[serde(default)]
    pub outside_surface: u32,
    #[serde(default)]
    pub obstacle_overlap: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingResult {
    /// Accepted poses in acceptance order.
    pub candidate_poses: Vec<Pose>,
    #[serde(default)]
    pub requested: u32,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub accepted: u32,
    #[serde(default)]
    pub rejections: RejectionCounts,
}

impl SamplingResult {
    /// False when the attempt ceiling ran out before the quota was met.
    pub fn is_complete(&self) -> bool {
        self.accepted >= self.requested
    }

    pub(crate) fn merge(&mut self, other: SamplingResult) {
        self.candidate_poses.extend(other.candidate_poses);
        self.requested += other.requested;
        self.attempts += other.attempts;
        self.accepted += other.accepted;
        self.rejections.outside_surface += other.rejections.outside_surface;
        self.rejections.obstacle_overlap += other.rejections.obstacle_overlap;
    }
}

// -- Tests ---------------------------------------------------------
