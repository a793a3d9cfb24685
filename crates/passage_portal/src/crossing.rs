//! Entry-side latching and plane-crossing detection for one portal.
//!
//! Overlap with the trigger volume alone cannot tell "walked through" from
//! "brushed the edge and backed out", so a teleport only fires once the
//! player's eye moves to the other side of the crossing anchor relative to the
//! side latched at entry.

use glam::{Quat, Vec3};
use passage_shared::pose::{wrap_angle, yaw_delta, Pose};
use tracing::debug;

use crate::player::PlayerBody;
use crate::portal::{Portal, PortalId};

/// Owner of the collider in an overlap notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collider {
    Player,
    Other(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    Outside,
    InsideFromFront,
    InsideFromBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownPortal,
    NotPlayer,
    PendingTeleport,
    NoDestination,
    AlreadyInside,
    OutOfRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Accepted { from_front: bool },
    Ignored(IgnoreReason),
}

/// A crossing that has fired and still has to be applied to the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportPlan {
    pub from: PortalId,
    pub to: PortalId,
    /// Rotation about world up applied to the body, velocity and camera yaw.
    pub yaw_delta: f32,
    pub position: Vec3,
}

/// A teleport as it was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportRecord {
    pub from: PortalId,
    pub to: PortalId,
    pub time_s: f32,
    pub from_position: Vec3,
    pub to_position: Vec3,
    pub yaw_delta: f32,
}

impl Portal {
    pub fn crossing_state(&self) -> CrossingState {
        match (self.player_inside, self.entered_from_front) {
            (false, _) => CrossingState::Outside,
            (true, true) => CrossingState::InsideFromFront,
            (true, false) => CrossingState::InsideFromBack,
        }
    }

    /// Overlap-begin handler. `has_destination` and `in_room` are evaluated
    /// by the caller against the live registry and player.
    pub(crate) fn on_enter(
        &mut self,
        collider: Collider,
        has_destination: bool,
        in_room: bool,
        eye: Vec3,
    ) -> EnterOutcome {
        let reason = if collider != Collider::Player {
            Some(IgnoreReason::NotPlayer)
        } else if self.pending_teleport {
            Some(IgnoreReason::PendingTeleport)
        } else if !has_destination {
            Some(IgnoreReason::NoDestination)
        } else if self.player_inside {
            Some(IgnoreReason::AlreadyInside)
        } else if !in_room {
            Some(IgnoreReason::OutOfRoom)
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!("{} ({}) ignored enter: {reason:?}", self.id, self.name());
            return EnterOutcome::Ignored(reason);
        }

        self.player_inside = true;
        self.entered_from_front = self.is_entry_side(self.side_dot(eye));
        debug!(
            "{} ({}) player entered from the {}",
            self.id,
            self.name(),
            if self.entered_from_front { "front" } else { "back" }
        );
        EnterOutcome::Accepted {
            from_front: self.entered_from_front,
        }
    }

    /// Overlap-end handler. Returns whether anything was cleared.
    pub(crate) fn on_exit(&mut self, collider: Collider) -> bool {
        if collider != Collider::Player {
            return false;
        }
        let changed = self.player_inside || self.entered_from_front || self.pending_teleport;
        self.player_inside = false;
        self.entered_from_front = false;
        self.pending_teleport = false;
        if changed {
            debug!("{} ({}) player exited", self.id, self.name());
        }
        changed
    }

    /// Per-frame crossing test. On fire the cooldown is stamped and the plan
    /// for moving the player is returned; nothing else is touched.
    pub(crate) fn check_crossing(
        &mut self,
        destination: Option<(PortalId, &Pose)>,
        player_position: Vec3,
        eye: Vec3,
        now_s: f32,
    ) -> Option<TeleportPlan> {
        if !self.player_inside || !self.entered_from_front || !self.cooldown_elapsed(now_s) {
            return None;
        }
        let (to, destination_pose) = destination?;
        if !self.is_past_plane(self.side_dot(eye)) {
            return None;
        }

        self.last_teleport_time_s = Some(now_s);

        let mut turn = yaw_delta(self.pose(), destination_pose);
        if self.is_inverted() {
            turn = wrap_angle(turn + std::f32::consts::PI);
        }

        Some(TeleportPlan {
            from: self.id,
            to,
            yaw_delta: turn,
            position: self.map_point_to(destination_pose, player_position),
        })
    }
}

impl TeleportPlan {
    /// Rotates the body, camera yaw and velocity, then writes the position.
    pub fn apply<P: PlayerBody + ?Sized>(&self, player: &mut P, time_s: f32) -> TeleportRecord {
        let turn = Quat::from_rotation_y(self.yaw_delta);
        let from_position = player.position();

        player.set_rotation(turn * player.rotation());
        player.add_camera_yaw(self.yaw_delta);
        player.set_velocity(turn * player.velocity());
        player.set_position(self.position);

        TeleportRecord {
            from: self.from,
            to: self.to,
            time_s,
            from_position,
            to_position: self.position,
            yaw_delta: self.yaw_delta,
        }
    }
}
