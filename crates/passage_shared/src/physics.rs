use glam::Vec3;

use crate::pose::Pose;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing a local box carried by `pose`.
    pub fn enclosing_oriented(pose: &Pose, half_extents: Vec3) -> Self {
        let h = half_extents.abs();
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    let corner = pose.to_world(Vec3::new(h.x * sx, h.y * sy, h.z * sz));
                    min = min.min(corner);
                    max = max.max(corner);
                }
            }
        }
        Self { min, max }
    }

    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverlapTransition {
    Began,
    Ended,
}

/// Turns per-step overlap tests into begin/end transitions, the way a physics
/// engine reports trigger contacts.
#[derive(Debug, Clone, Default)]
pub struct OverlapTracker {
    overlapping: Vec<bool>,
}

impl OverlapTracker {
    pub fn new(volumes: usize) -> Self {
        Self {
            overlapping: vec![false; volumes],
        }
    }

    /// Tests `body` against every volume and reports the ones whose overlap
    /// state changed since the previous step.
    pub fn step(&mut self, body: &AABB, volumes: &[AABB]) -> Vec<(usize, OverlapTransition)> {
        if self.overlapping.len() < volumes.len() {
            self.overlapping.resize(volumes.len(), false);
        }

        let mut transitions = Vec::new();
        for (index, volume) in volumes.iter().enumerate() {
            let now = body.intersects(volume);
            let was = self.overlapping[index];
            if now && !was {
                transitions.push((index, OverlapTransition::Began));
            } else if !now && was {
                transitions.push((index, OverlapTransition::Ended));
            }
            self.overlapping[index] = now;
        }
        transitions
    }

    pub fn is_overlapping(&self, index: usize) -> bool {
        self.overlapping.get(index).copied().unwrap_or(false)
    }
}
