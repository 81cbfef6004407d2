//! Track - a feature followed across consecutive keyframes.
//!
//! A track is anchored at the pose where the tracker started it: the
//! reference keypoint holds a unit bearing and an inverse depth expressed in
//! the frame of the reference camera at that pose. The keypoint history has
//! one entry per pose from the anchor onwards (index `j` is observed at
//! pose `anchor + j`), each entry holding one observation per rig camera.

use std::collections::HashMap;

use nalgebra::{Vector2, Vector3, Vector4};

use super::types::TrackId;
use crate::geometry::SE3;

/// A keypoint measurement in one camera at one pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Pixel location.
    pub kp: Vector2<f64>,
    /// Whether the tracker re-observed the feature with enough confidence.
    pub tracked: bool,
}

impl Observation {
    pub fn new(kp: Vector2<f64>, tracked: bool) -> Self {
        Self { kp, tracked }
    }

    pub fn lost() -> Self {
        Self {
            kp: Vector2::zeros(),
            tracked: false,
        }
    }
}

/// Anchor of a track: bearing plus inverse depth in the reference camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceKeypoint {
    /// Unit ray direction.
    pub ray: Vector3<f64>,
    /// Inverse depth along `ray`.
    pub rho: f64,
}

impl ReferenceKeypoint {
    pub fn new(ray: Vector3<f64>, rho: f64) -> Self {
        Self {
            ray: ray.normalize(),
            rho,
        }
    }

    /// `[ray; rho]` as a homogeneous 4-vector.
    pub fn homogeneous(&self) -> Vector4<f64> {
        Vector4::new(self.ray.x, self.ray.y, self.ray.z, self.rho)
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    /// Rig camera the reference keypoint was measured in.
    pub ref_cam_id: usize,
    pub ref_keypoint: ReferenceKeypoint,
    /// `keypoint_history[j][cam]`, aligned with poses from the anchor on.
    pub keypoint_history: Vec<Vec<Observation>>,
    /// Excluded from optimization while set.
    pub is_outlier: bool,
    /// Whether the track was tracked in the most recent frame.
    pub tracked: bool,
    /// Latest optimized transform from the anchor pose into the most recent pose.
    pub t_ba: SE3,
    pub num_good_tracked_frames: u32,
}

impl Track {
    pub fn new(
        id: TrackId,
        ref_cam_id: usize,
        ref_keypoint: ReferenceKeypoint,
        first: Vec<Observation>,
    ) -> Self {
        Self {
            id,
            ref_cam_id,
            ref_keypoint,
            keypoint_history: vec![first],
            is_outlier: false,
            tracked: true,
            t_ba: SE3::identity(),
            num_good_tracked_frames: 1,
        }
    }

    /// Number of poses this track spans.
    pub fn len(&self) -> usize {
        self.keypoint_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoint_history.is_empty()
    }

    pub fn last_observations(&self) -> Option<&[Observation]> {
        self.keypoint_history.last().map(|obs| obs.as_slice())
    }

    /// Reference landmark expressed in the world frame.
    ///
    /// `t_wc` is the world pose of the reference camera (anchor pose composed
    /// with the camera extrinsic).
    pub fn world_landmark(&self, t_wc: &SE3) -> Vector4<f64> {
        t_wc.transform_homogeneous(&self.ref_keypoint.homogeneous())
    }

    /// Re-derive the inverse depth from an optimized world landmark.
    ///
    /// The landmark is mapped back into the reference camera and rescaled so
    /// its bearing has unit norm; only `rho` is stored, the anchor bearing is
    /// left as measured.
    pub fn refresh_inverse_depth(&mut self, t_wc: &SE3, x_w: &Vector4<f64>) {
        let x_r = t_wc.inverse().transform_homogeneous(x_w);
        let norm = x_r.xyz().norm();
        if norm > 0.0 && norm.is_finite() {
            self.ref_keypoint.rho = x_r.w / norm;
        }
    }
}

/// All tracks known to the pose graph, keyed by id.
///
/// The table owns track data; poses and the feature tracker refer to tracks
/// by [`TrackId`]. Ids are handed out by [`TrackTable::allocate_id`] and are
/// never reused within one table lifetime.
#[derive(Debug, Default)]
pub struct TrackTable {
    tracks: HashMap<TrackId, Track>,
    next_id: u64,
}

impl TrackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> TrackId {
        let id = TrackId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, track: Track) {
        self.next_id = self.next_id.max(track.id.0 + 1);
        self.tracks.insert(track.id, track);
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        self.tracks.remove(&id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    /// Drop every track. Id allocation restarts from zero.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn track_with_rho(rho: f64) -> Track {
        Track::new(
            TrackId::new(0),
            0,
            ReferenceKeypoint::new(Vector3::new(0.1, -0.2, 1.0), rho),
            vec![Observation::new(Vector2::new(10.0, 20.0), true)],
        )
    }

    #[test]
    fn test_reference_ray_is_unit() {
        let track = track_with_rho(0.2);
        assert_relative_eq!(track.ref_keypoint.ray.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_depth_roundtrip_through_anchor() {
        let mut track = track_with_rho(0.25);
        let ray_before = track.ref_keypoint.ray;
        let t_wc = SE3 {
            rotation: UnitQuaternion::from_euler_angles(0.1, -0.3, 0.7),
            translation: Vector3::new(2.0, -1.0, 0.5),
        };

        let x_w = track.world_landmark(&t_wc);
        track.refresh_inverse_depth(&t_wc, &x_w);

        assert_relative_eq!(track.ref_keypoint.rho, 0.25, epsilon = 1e-12);
        assert_relative_eq!(track.ref_keypoint.ray, ray_before, epsilon = 1e-12);

        let x_r = t_wc.inverse().transform_homogeneous(&x_w);
        assert_relative_eq!(x_r.xyz().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_refresh_rescales_moved_landmark() {
        let mut track = track_with_rho(0.5);
        let t_wc = SE3::identity();
        // Same bearing, twice as far away.
        let p = track.ref_keypoint.ray * 4.0;
        let x_w = Vector4::new(p.x, p.y, p.z, 1.0);

        track.refresh_inverse_depth(&t_wc, &x_w);
        assert_relative_eq!(track.ref_keypoint.rho, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_table_allocates_unique_ids() {
        let mut table = TrackTable::new();
        let a = table.allocate_id();
        let b = table.allocate_id();
        assert_ne!(a, b);

        table.insert(Track::new(
            TrackId::new(10),
            0,
            ReferenceKeypoint::new(Vector3::z(), 0.2),
            vec![Observation::lost()],
        ));
        assert!(table.allocate_id().0 > 10);
    }
}
