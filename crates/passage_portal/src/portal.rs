use std::fmt;

use glam::Vec3;
use passage_shared::physics::AABB;
use passage_shared::pose::{mirror_xy, Pose};

pub const DEFAULT_DETECTION_RADIUS: f32 = 50.0;
pub const DEFAULT_COOLDOWN_SECONDS: f32 = 0.5;
pub const DEFAULT_CROSSING_OFFSET: f32 = 1.2;
pub const DEFAULT_TRIGGER_HALF_EXTENTS: Vec3 = Vec3::new(1.0, 1.5, 1.5);

/// Stable handle of a portal inside a [`crate::system::PortalSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub u32);

impl PortalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PortalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "portal#{}", self.0)
    }
}

/// Per-portal tuning, fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalSettings {
    pub name: String,
    pub pose: Pose,
    pub detection_radius: f32,
    /// Selects the alternate mapping: no mirror on teleport, an extra half
    /// turn on the body, entry latched from the back of the surface.
    pub inverted: bool,
    pub cooldown_seconds: f32,
    /// Distance along the front axis from the origin to the crossing anchor.
    pub crossing_offset: f32,
    pub trigger_half_extents: Vec3,
}

impl PortalSettings {
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            detection_radius: DEFAULT_DETECTION_RADIUS,
            inverted: false,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            crossing_offset: DEFAULT_CROSSING_OFFSET,
            trigger_half_extents: DEFAULT_TRIGGER_HALF_EXTENTS,
        }
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn detection_radius(mut self, radius: f32) -> Self {
        self.detection_radius = radius.max(0.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub active: bool,
    pub pose: Pose,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            active: false,
            pose: Pose::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Portal {
    pub(crate) id: PortalId,
    pub(crate) settings: PortalSettings,
    pub(crate) destination: Option<PortalId>,
    pub(crate) player_inside: bool,
    pub(crate) entered_from_front: bool,
    pub(crate) pending_teleport: bool,
    pub(crate) last_teleport_time_s: Option<f32>,
    pub(crate) surface_visible: bool,
    pub(crate) camera: ViewCamera,
}

impl Portal {
    pub(crate) fn new(id: PortalId, settings: PortalSettings) -> Self {
        Self {
            id,
            settings,
            destination: None,
            player_inside: false,
            entered_from_front: false,
            pending_teleport: false,
            last_teleport_time_s: None,
            surface_visible: false,
            camera: ViewCamera::default(),
        }
    }

    pub fn id(&self) -> PortalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    pub fn pose(&self) -> &Pose {
        &self.settings.pose
    }

    pub fn destination(&self) -> Option<PortalId> {
        self.destination
    }

    pub fn is_inverted(&self) -> bool {
        self.settings.inverted
    }

    pub fn is_player_inside(&self) -> bool {
        self.player_inside
    }

    pub fn entered_from_front(&self) -> bool {
        self.entered_from_front
    }

    pub fn is_pending_teleport(&self) -> bool {
        self.pending_teleport
    }

    pub fn last_teleport_time_s(&self) -> Option<f32> {
        self.last_teleport_time_s
    }

    pub fn is_surface_visible(&self) -> bool {
        self.surface_visible
    }

    pub fn camera(&self) -> &ViewCamera {
        &self.camera
    }

    /// Whether the player is within the detection radius. No player, no room.
    pub fn is_in_room(&self, player_position: Option<Vec3>) -> bool {
        let Some(player_position) = player_position else {
            return false;
        };
        player_position.distance(self.settings.pose.position) <= self.settings.detection_radius
    }

    pub fn crossing_anchor(&self) -> Vec3 {
        let pose = &self.settings.pose;
        pose.position + pose.front() * self.settings.crossing_offset
    }

    /// Cosine between the front axis and the direction from the crossing
    /// anchor to `eye`. Positive in front, zero at the anchor itself.
    pub fn side_dot(&self, eye: Vec3) -> f32 {
        let to_eye = (eye - self.crossing_anchor()).normalize_or_zero();
        self.settings.pose.front().dot(to_eye)
    }

    /// The side a crossing must start from, under this portal's convention.
    pub fn is_entry_side(&self, side_dot: f32) -> bool {
        if self.settings.inverted {
            side_dot < 0.0
        } else {
            side_dot > 0.0
        }
    }

    /// Whether `side_dot` lies past the plane relative to the entry side.
    pub fn is_past_plane(&self, side_dot: f32) -> bool {
        if self.settings.inverted {
            side_dot >= 0.0
        } else {
            side_dot <= 0.0
        }
    }

    pub fn cooldown_elapsed(&self, now_s: f32) -> bool {
        self.last_teleport_time_s
            .map_or(true, |last| now_s - last >= self.settings.cooldown_seconds)
    }

    /// Carries a world point from this portal's space into `destination`'s.
    pub fn map_point_to(&self, destination: &Pose, world_point: Vec3) -> Vec3 {
        let local = self.settings.pose.to_local(world_point);
        let local = if self.settings.inverted {
            local
        } else {
            mirror_xy(local)
        };
        destination.to_world(local)
    }

    pub fn trigger_bounds(&self) -> AABB {
        AABB::enclosing_oriented(&self.settings.pose, self.settings.trigger_half_extents)
    }
}
