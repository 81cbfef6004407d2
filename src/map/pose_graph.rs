//! PoseGraph - the ordered keyframe poses and the tracks they originate.
//!
//! Append-only between resets. Poses are addressed two ways:
//! - by position inside the retained window (`0..len()`), which is what the
//!   bundle adjustment window works with;
//! - by a stable [`PoseId`], which keeps counting across evictions.
//!
//! With a retention horizon set, the oldest poses are evicted once the graph
//! grows beyond it.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::pose::TrackerPose;
use super::track::TrackTable;
use super::types::{PoseId, TrackId};
use crate::geometry::SE3;

#[derive(Debug, Default)]
pub struct PoseGraph {
    poses: VecDeque<TrackerPose>,
    tracks: TrackTable,
    /// Id of `poses[0]`.
    first_id: u64,
    /// Tracks whose anchor pose was evicted while the tracker still followed them.
    orphans: HashSet<TrackId>,
}

impl PoseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pose and return its id.
    pub fn push(&mut self, pose: TrackerPose) -> PoseId {
        let id = PoseId::new(self.first_id + self.poses.len() as u64);
        self.poses.push_back(pose);
        id
    }

    /// Number of retained poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Number of poses appended since the last reset, evicted ones included.
    pub fn total_poses(&self) -> u64 {
        self.first_id + self.poses.len() as u64
    }

    pub fn get(&self, position: usize) -> Option<&TrackerPose> {
        self.poses.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut TrackerPose> {
        self.poses.get_mut(position)
    }

    pub fn last(&self) -> Option<&TrackerPose> {
        self.poses.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut TrackerPose> {
        self.poses.back_mut()
    }

    pub fn pose_id(&self, position: usize) -> Option<PoseId> {
        (position < self.poses.len()).then(|| PoseId::new(self.first_id + position as u64))
    }

    pub fn position_of(&self, id: PoseId) -> Option<usize> {
        let offset = id.0.checked_sub(self.first_id)? as usize;
        (offset < self.poses.len()).then_some(offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackerPose> {
        self.poses.iter()
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut TrackTable {
        &mut self.tracks
    }

    /// Split borrow of poses and tracks for passes that walk poses while
    /// mutating the tracks they reference.
    pub fn parts_mut(&mut self) -> (&mut VecDeque<TrackerPose>, &mut TrackTable) {
        (&mut self.poses, &mut self.tracks)
    }

    /// World poses in graph order.
    pub fn trajectory(&self) -> Vec<SE3> {
        self.poses.iter().map(|p| p.t_wp).collect()
    }

    /// Clear the outlier flag on every track.
    pub fn reset_outliers(&mut self) {
        for track in self.tracks.iter_mut() {
            track.is_outlier = false;
        }
    }

    /// Drop all poses and tracks. Pose ids restart from zero.
    pub fn clear(&mut self) {
        self.poses.clear();
        self.tracks.clear();
        self.orphans.clear();
        self.first_id = 0;
    }

    /// Evict the oldest poses until at most `max_poses` remain.
    ///
    /// Tracks anchored at an evicted pose are dropped unless listed in
    /// `current`; those are kept as orphans and dropped on a later call once
    /// the tracker no longer reports them. Returns the number of evicted poses.
    pub fn enforce_retention(&mut self, max_poses: usize, current: &HashSet<TrackId>) -> usize {
        let mut evicted = 0;
        while self.poses.len() > max_poses {
            let Some(pose) = self.poses.pop_front() else {
                break;
            };
            self.first_id += 1;
            evicted += 1;
            for id in pose.tracks {
                if current.contains(&id) {
                    self.orphans.insert(id);
                } else {
                    self.tracks.remove(id);
                }
            }
        }

        self.orphans.retain(|id| {
            if current.contains(id) {
                true
            } else {
                self.tracks.remove(*id);
                false
            }
        });

        if evicted > 0 {
            debug!(
                evicted,
                first_retained = self.first_id,
                orphans = self.orphans.len(),
                "Evicted poses beyond retention horizon"
            );
        }
        evicted
    }
}
