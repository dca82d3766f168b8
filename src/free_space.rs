//! Free-space placement sampling.
//!
//! Rejection sampling over the surface: draw a planar position inside the
//! surface's envelope and a yaw, place a fresh copy of the manipulated
//! object there, and keep the pose if its footprint stays on the surface
//! and clear of every obstacle. Stops once the requested number of poses
//! is accepted or the attempt ceiling is spent. Running out of attempts
//! is not an error; the shortfall shows in the result's counters.
//!
//! Candidates are placed by rotating the template about its own current
//! position first and translating to the drawn position second, so the
//! footprint is always centred where the object's position lands.

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::collision::{contains, overlaps, ContactPolicy, Polygon};
use crate::error::SamplingError;
use crate::object::RigidObject;
use crate::primitives::{Pose, Vector2};
use crate::prng::Pcg32;
use crate::types::{SamplerParams, SamplingResult, ScenarioRecord, YawRange};

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub frame_id: String,
    pub manipulated_object: RigidObject,
    pub static_objects: Vec<RigidObject>,
    pub surface: RigidObject,
}

impl Scenario {
    pub fn from_record(record: ScenarioRecord) -> Result<Self, SamplingError> {
        Ok(Self {
            frame_id: record.frame_id,
            manipulated_object: RigidObject::from_record(record.manipulated_object)?,
            static_objects: record
                .static_objects
                .into_iter()
                .map(RigidObject::from_record)
                .collect::<Result<_, _>>()?,
            surface: RigidObject::from_record(record.surface)?,
        })
    }

    pub fn to_record(&self) -> ScenarioRecord {
        ScenarioRecord {
            frame_id: self.frame_id.clone(),
            manipulated_object: self.manipulated_object.to_record(),
            static_objects: self.static_objects.iter().map(RigidObject::to_record).collect(),
            surface: self.surface.to_record(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    OutsideSurface,
    ObstacleOverlap(usize),
}

/// Scenario footprints, projected once and shared read-only by every
/// attempt.
#[derive(Debug)]
pub struct FreeSpace<'a> {
    scenario: &'a Scenario,
    surface: Polygon,
    obstacles: Vec<Polygon>,
    lo: Vector2,
    hi: Vector2,
    policy: ContactPolicy,
}

fn non_degenerate(obj: &RigidObject, role: &str) -> Result<Polygon, SamplingError> {
    let footprint = obj.project_footprint();
    if footprint.area() > 0.0 {
        Ok(footprint)
    } else {
        Err(SamplingError::InvalidRequest(format!(
            "{role} '{}' has a zero-area footprint",
            obj.id
        )))
    }
}

impl<'a> FreeSpace<'a> {
    pub fn new(scenario: &'a Scenario, policy: ContactPolicy) -> Result<Self, SamplingError> {
        let surface = non_degenerate(&scenario.surface, "surface")?;
        let obstacles = scenario
            .static_objects
            .iter()
            .map(|o| non_degenerate(o, "obstacle"))
            .collect::<Result<Vec<_>, _>>()?;
        non_degenerate(&scenario.manipulated_object, "manipulated object")?;
        let (lo, hi) = surface.envelope();
        Ok(Self {
            scenario,
            surface,
            obstacles,
            lo,
            hi,
            policy,
        })
    }

    /// Replay the acceptance test for a pose produced by this scenario.
    pub fn is_feasible(&self, pose: &Pose) -> bool {
        let candidate = self.place(pose.planar_position(), pose.yaw());
        self.evaluate(&candidate).is_ok()
    }

    fn place(&self, position: Vector2, yaw: f64) -> RigidObject {
        let mut candidate = self.scenario.manipulated_object.clone();
        candidate.rotate_around_z(yaw);
        candidate.planar_translate_to(position);
        candidate
    }

    fn evaluate(&self, candidate: &RigidObject) -> Result<(), Rejection> {
        let footprint = candidate.project_footprint();
        if !contains(&self.surface, &footprint, self.policy) {
            return Err(Rejection::OutsideSurface);
        }
        match self
            .obstacles
            .iter()
            .position(|o| overlaps(&footprint, o, self.policy))
        {
            Some(i) => Err(Rejection::ObstacleOverlap(i)),
            None => Ok(()),
        }
    }

    fn attempt(&self, rng: &mut Pcg32, yaw_range: YawRange) -> Result<Pose, Rejection> {
        let x = rng.next_range(self.lo.x, self.hi.x);
        let y = rng.next_range(self.lo.y, self.hi.y);
        let yaw = rng.next_range(yaw_range.min, yaw_range.max);
        let candidate = self.place(Vector2::new(x, y), yaw);
        self.evaluate(&candidate)?;
        let mut pose = candidate.pose().clone();
        pose.frame_id = self.scenario.frame_id.clone();
        Ok(pose)
    }

    /// Sample until `quota` poses are accepted or `ceiling` attempts are
    /// spent.
    fn run(
        &self,
        rng: &mut Pcg32,
        quota: u32,
        ceiling: u32,
        yaw_range: YawRange,
    ) -> SamplingResult {
        let mut result = SamplingResult {
            requested: quota,
            ..SamplingResult::default()
        };
        while result.accepted < quota && result.attempts < ceiling {
            result.attempts += 1;
            match self.attempt(rng, yaw_range) {
                Ok(pose) => {
                    result.candidate_poses.push(pose);
                    result.accepted += 1;
                }
                Err(Rejection::OutsideSurface) => {
                    result.rejections.outside_surface += 1;
                }
                Err(Rejection::ObstacleOverlap(i)) => {
                    let obstacle = &self.scenario.static_objects[i].id;
                    trace!(obstacle = %obstacle, "candidate rejected");
                    result.rejections.obstacle_overlap += 1;
                }
            }
        }
        result
    }
}

/// Check the request and return the sample quota.
fn validate(params: &SamplerParams) -> Result<u32, SamplingError> {
    let quota = u32::try_from(params.number_of_samples)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            SamplingError::InvalidRequest(format!(
                "number_of_samples must be in 1..={}, got {}",
                u32::MAX,
                params.number_of_samples
            ))
        })?;
    if params.max_attempts == 0 {
        return Err(SamplingError::InvalidRequest(
            "max_attempts must be positive".into(),
        ));
    }
    let YawRange { min, max } = params.yaw_range;
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(SamplingError::InvalidRequest(format!(
            "yaw_range [{min}, {max}] is not a finite, ordered interval"
        )));
    }
    if params.num_workers == Some(0) {
        return Err(SamplingError::InvalidRequest(
            "num_workers must be positive".into(),
        ));
    }
    Ok(quota)
}

/// Share of `total` given to worker `i` of `n`; shares sum to `total`.
fn share(total: u32, n: u32, i: u32) -> u32 {
    total / n + u32::from(i < total % n)
}

/// Sample feasible placements of the scenario's manipulated object.
///
/// Deterministic for a given scenario, seed and worker count.
pub fn sample(
    scenario: &Scenario,
    params: &SamplerParams,
) -> Result<SamplingResult, SamplingError> {
    let quota = validate(params)?;
    let space = FreeSpace::new(scenario, params.contact_policy)?;
    debug!(
        frame_id = %scenario.frame_id,
        obstacles = scenario.static_objects.len(),
        requested = quota,
        max_attempts = params.max_attempts,
        "sampling free space"
    );

    let result = match params.num_workers {
        Some(n) if n > 1 => sample_parallel(&space, params, quota, n),
        _ => {
            let mut rng = Pcg32::for_worker(params.seed, 0);
            space.run(&mut rng, quota, params.max_attempts, params.yaw_range)
        }
    };

    if result.is_complete() {
        debug!(
            attempts = result.attempts,
            accepted = result.accepted,
            "sampling complete"
        );
    } else {
        warn!(
            attempts = result.attempts,
            accepted = result.accepted,
            requested = result.requested,
            "attempt ceiling reached before sample quota"
        );
    }
    Ok(result)
}

/// Split quota and ceiling across workers, each on its own PRNG stream,
/// and concatenate the results in worker order.
fn sample_parallel(
    space: &FreeSpace<'_>,
    params: &SamplerParams,
    quota: u32,
    workers: u32,
) -> SamplingResult {
    let workers = workers.min(quota);
    let parts: Vec<SamplingResult> = (0..workers)
        .into_par_iter()
        .map(|i| {
            let mut rng = Pcg32::for_worker(params.seed, i);
            space.run(
                &mut rng,
                share(quota, workers, i),
                share(params.max_attempts, workers, i),
                params.yaw_range,
            )
        })
        .collect();

    let mut merged = SamplingResult::default();
    for part in parts {
        merged.merge(part);
    }
    merged
}

// -----------------------------------------------------------------
// Tests
// -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{BoundingBox, Vector3};

    const EPS: f64 = 1e-9;

    fn boxed(id: &str, kind: &str, min: (f64, f64, f64), max: (f64, f64, f64)) -> RigidObject {
        let bbox = BoundingBox::new(
            Vector3::new(min.0, min.1, min.2),
            Vector3::new(max.0, max.1, max.2),
        )
        .unwrap();
        let center = Vector3::new((min.0 + max.0) / 2.0, (min.1 + max.1) / 2.0, min.2);
        RigidObject::new(id, kind, Pose::new(center, Vector3::default()), bbox)
    }

    fn table_scenario(obstacles: Vec<RigidObject>) -> Scenario {
        Scenario {
            frame_id: "map".into(),
            manipulated_object: boxed("cup_1", "cup", (-0.1, -0.1, 0.0), (0.1, 0.1, 0.1)),
            static_objects: obstacles,
            surface: boxed("table", "surface", (0.0, 0.0, 0.0), (2.0, 2.0, 0.0)),
        }
    }

    fn centre_block() -> RigidObject {
        boxed("box_1", "box", (0.5, 0.5, 0.0), (1.5, 1.5, 0.3))
    }

    fn params(n: i64) -> SamplerParams {
        SamplerParams {
            seed: 42,
            ..SamplerParams::new(n)
        }
    }

    #[test]
    fn empty_table_fills_quota() {
        let scenario = table_scenario(vec![]);
        let result = sample(&scenario, &params(50)).unwrap();
        assert_eq!(result.accepted, 50);
        assert_eq!(result.candidate_poses.len(), 50);
        assert!(result.is_complete());
        assert!(result.attempts >= 50);
        for pose in &result.candidate_poses {
            assert!(pose.position.x >= 0.1 - EPS && pose.position.x <= 1.9 + EPS);
            assert!(pose.position.y >= 0.1 - EPS && pose.position.y <= 1.9 + EPS);
            assert!((0.0..std::f64::consts::TAU).contains(&pose.yaw()));
            assert_eq!(pose.frame_id, "map");
            assert_eq!(pose.position.z, 0.0);
        }
    }

    #[test]
    fn fixed_yaw_keeps_clear_of_expanded_obstacle() {
        let scenario = table_scenario(vec![centre_block()]);
        let p = SamplerParams {
            yaw_range: YawRange { min: 0.0, max: 0.0 },
            ..params(200)
        };
        let result = sample(&scenario, &p).unwrap();
        assert_eq!(result.accepted, 200);
        assert!(result.rejections.obstacle_overlap > 0);
        for pose in &result.candidate_poses {
            let (x, y) = (pose.position.x, pose.position.y);
            let inside = x > 0.4 + EPS && x < 1.6 - EPS && y > 0.4 + EPS && y < 1.6 - EPS;
            assert!(!inside, "accepted centre ({x}, {y}) overlaps obstacle");
            assert_eq!(pose.yaw(), 0.0);
        }
    }

    #[test]
    fn free_yaw_keeps_clear_of_rounded_expansion() {
        // A rotated 0.2 square always covers the 0.1 disc around its
        // centre, so centres within 0.1 of the block must be rejected.
        let scenario = table_scenario(vec![centre_block()]);
        let result = sample(&scenario, &params(200)).unwrap();
        for pose in &result.candidate_poses {
            let (x, y) = (pose.position.x, pose.position.y);
            let dx = (0.5 - x).max(x - 1.5).max(0.0);
            let dy = (0.5 - y).max(y - 1.5).max(0.0);
            assert!(dx.hypot(dy) >= 0.1 - EPS, "accepted centre ({x}, {y})");
        }
    }

    #[test]
    fn accepted_poses_replay_as_feasible() {
        let scenario = table_scenario(vec![
            centre_block(),
            boxed("book", "book", (1.6, 0.1, 0.0), (1.9, 0.9, 0.05)),
        ]);
        let result = sample(&scenario, &params(100)).unwrap();
        let space = FreeSpace::new(&scenario, ContactPolicy::Permissive).unwrap();
        for pose in &result.candidate_poses {
            assert!(space.is_feasible(pose));
        }
    }

    #[test]
    fn infeasible_pose_detected() {
        let scenario = table_scenario(vec![centre_block()]);
        let space = FreeSpace::new(&scenario, ContactPolicy::Permissive).unwrap();
        let on_block = Pose::new(Vector3::new(1.0, 1.0, 0.0), Vector3::default());
        let off_table = Pose::new(Vector3::new(2.5, 1.0, 0.0), Vector3::default());
        let clear = Pose::new(Vector3::new(0.2, 0.2, 0.0), Vector3::default());
        assert!(!space.is_feasible(&on_block));
        assert!(!space.is_feasible(&off_table));
        assert!(space.is_feasible(&clear));
    }

    #[test]
    fn flush_placement_follows_policy() {
        let scenario = table_scenario(vec![centre_block()]);
        // Flush with the table edge and the block's left face.
        let flush = Pose::new(Vector3::new(0.4, 1.0, 0.0), Vector3::default());
        let permissive = FreeSpace::new(&scenario, ContactPolicy::Permissive).unwrap();
        let strict = FreeSpace::new(&scenario, ContactPolicy::Strict).unwrap();
        assert!(permissive.is_feasible(&flush));
        assert!(!strict.is_feasible(&flush));

        let at_edge = Pose::new(Vector3::new(0.1, 0.25, 0.0), Vector3::default());
        assert!(permissive.is_feasible(&at_edge));
        assert!(!strict.is_feasible(&at_edge));
    }

    #[test]
    fn covered_surface_returns_empty_result() {
        let blanket = boxed("cloth", "cloth", (0.0, 0.0, 0.0), (2.0, 2.0, 0.01));
        let scenario = table_scenario(vec![blanket]);
        let p = SamplerParams {
            max_attempts: 500,
            ..params(10)
        };
        let result = sample(&scenario, &p).unwrap();
        assert_eq!(result.accepted, 0);
        assert!(result.candidate_poses.is_empty());
        assert_eq!(result.attempts, 500);
        assert!(!result.is_complete());
        assert_eq!(
            result.rejections.outside_surface + result.rejections.obstacle_overlap,
            500
        );
    }

    #[test]
    fn attempt_ceiling_bounds_work() {
        let scenario = table_scenario(vec![centre_block()]);
        for ceiling in [1, 3, 17] {
            let p = SamplerParams {
                max_attempts: ceiling,
                ..params(1000)
            };
            let result = sample(&scenario, &p).unwrap();
            assert_eq!(result.attempts, ceiling);
            assert!(result.accepted <= ceiling);
            assert!(result.accepted <= 1000);
            assert_eq!(result.accepted as usize, result.candidate_poses.len());
        }
    }

    #[test]
    fn deterministic() {
        let scenario = table_scenario(vec![centre_block()]);
        let r1 = sample(&scenario, &params(40)).unwrap();
        let r2 = sample(&scenario, &params(40)).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn different_seeds() {
        let scenario = table_scenario(vec![]);
        let r1 = sample(&scenario, &params(10)).unwrap();
        let r2 = sample(&scenario, &SamplerParams { seed: 7, ..params(10) }).unwrap();
        assert_ne!(r1.candidate_poses, r2.candidate_poses);
    }

    #[test]
    fn template_is_not_mutated() {
        let scenario = table_scenario(vec![centre_block()]);
        let before = scenario.clone();
        sample(&scenario, &params(20)).unwrap();
        assert_eq!(scenario, before);
    }

    #[test]
    fn parallel_fills_quota_safely() {
        let scenario = table_scenario(vec![centre_block()]);
        let p = SamplerParams {
            num_workers: Some(4),
            ..params(101)
        };
        let result = sample(&scenario, &p).unwrap();
        assert_eq!(result.requested, 101);
        assert_eq!(result.accepted, 101);
        assert_eq!(result.candidate_poses.len(), 101);
        let space = FreeSpace::new(&scenario, ContactPolicy::Permissive).unwrap();
        assert!(result.candidate_poses.iter().all(|pose| space.is_feasible(pose)));
        assert_eq!(sample(&scenario, &p).unwrap(), result);
    }

    #[test]
    fn parallel_respects_ceiling() {
        let blanket = boxed("cloth", "cloth", (0.0, 0.0, 0.0), (2.0, 2.0, 0.01));
        let scenario = table_scenario(vec![blanket]);
        let p = SamplerParams {
            max_attempts: 103,
            num_workers: Some(4),
            ..params(8)
        };
        let result = sample(&scenario, &p).unwrap();
        assert_eq!(result.attempts, 103);
        assert_eq!(result.accepted, 0);
    }

    #[test]
    fn more_workers_than_samples() {
        let scenario = table_scenario(vec![]);
        let p = SamplerParams {
            num_workers: Some(16),
            ..params(3)
        };
        let result = sample(&scenario, &p).unwrap();
        assert_eq!(result.accepted, 3);
        assert_eq!(result.requested, 3);
    }

    #[test]
    fn zero_samples_rejected() {
        let scenario = table_scenario(vec![]);
        let err = sample(&scenario, &params(0)).unwrap_err();
        assert!(matches!(err, SamplingError::InvalidRequest(_)));
    }

    #[test]
    fn out_of_range_sample_counts_rejected() {
        let scenario = table_scenario(vec![]);
        for n in [-1, -5, i64::from(u32::MAX) + 1] {
            let err = sample(&scenario, &params(n)).unwrap_err();
            assert!(
                matches!(err, SamplingError::InvalidRequest(_)),
                "count {n}: {err:?}"
            );
            assert!(err.to_string().contains("number_of_samples"));
        }
    }

    #[test]
    fn bad_params_rejected() {
        let scenario = table_scenario(vec![]);
        let cases = [
            SamplerParams { max_attempts: 0, ..params(5) },
            SamplerParams { num_workers: Some(0), ..params(5) },
            SamplerParams { yaw_range: YawRange { min: 1.0, max: 0.0 }, ..params(5) },
            SamplerParams { yaw_range: YawRange { min: 0.0, max: f64::NAN }, ..params(5) },
        ];
        for p in cases {
            assert!(matches!(sample(&scenario, &p), Err(SamplingError::InvalidRequest(_))));
        }
    }

    #[test]
    fn degenerate_obstacle_rejected() {
        let flat = boxed("sheet", "paper", (0.5, 0.5, 0.0), (0.5, 1.5, 0.0));
        let scenario = table_scenario(vec![flat]);
        let err = sample(&scenario, &params(5)).unwrap_err();
        assert!(err.to_string().contains("sheet"));
    }

    #[test]
    fn degenerate_surface_rejected() {
        let mut scenario = table_scenario(vec![]);
        scenario.surface = boxed("edge", "surface", (0.0, 0.0, 0.0), (2.0, 0.0, 0.0));
        assert!(matches!(
            sample(&scenario, &params(5)),
            Err(SamplingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn scenario_record_round_trip() {
        let mut scenario = table_scenario(vec![centre_block()]);
        scenario.static_objects[0].rotate_around_z(0.3);
        let json = serde_json::to_string(&scenario.to_record()).unwrap();
        let back = Scenario::from_record(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(back, scenario);
    }

    #[test]
    fn share_splits_exactly() {
        let total: u32 = (0..4).map(|i| share(10, 4, i)).sum();
        assert_eq!(total, 10);
        assert_eq!(share(10, 4, 0), 3);
        assert_eq!(share(10, 4, 3), 2);
    }
}
