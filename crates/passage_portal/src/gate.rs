//! Per-frame visibility of portal surfaces and placement of their view cameras.
//!
//! A portal's view camera renders the image shown on its destination's
//! surface, so it only runs while the player is near that destination. The
//! portal's own surface is drawn while the player is near the portal itself.

use glam::{Quat, Vec3};
use passage_shared::pose::{look_rotation, mirror_xy, yaw_delta, Pose};
use tracing::debug;

use crate::portal::{Portal, PortalId};

/// Player state sampled once per frame for the gate.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSample {
    pub position: Vec3,
    pub forward: Vec3,
}

/// What the gate needs to know about a portal's destination this frame.
#[derive(Debug, Clone, Copy)]
pub struct DestinationSample {
    pub id: PortalId,
    pub pose: Pose,
    pub in_room: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    SurfaceShown(PortalId),
    SurfaceHidden(PortalId),
    CameraActivated(PortalId),
    CameraDeactivated(PortalId),
}

/// Where the view camera of `portal` sits for a player near `destination`.
///
/// The player's position is taken into the destination's space, mirrored
/// through its surface and brought back out of this portal's space. The look
/// direction goes through the same mirror, except under the inverted
/// convention where it is the player's forward turned by the heading
/// difference.
pub fn view_camera_pose(
    portal: &Pose,
    destination: &Pose,
    player: &PlayerSample,
    inverted: bool,
) -> Pose {
    let local = destination.to_local(player.position);
    let position = portal.to_world(mirror_xy(local));

    let direction = if inverted {
        Quat::from_rotation_y(yaw_delta(destination, portal)) * player.forward
    } else {
        let local_forward = destination.rotation.inverse() * player.forward;
        portal.rotation * mirror_xy(local_forward)
    };

    Pose::new(position, look_rotation(direction, Vec3::Y))
}

/// Runs the gate for one portal and appends any visibility transitions.
pub(crate) fn update_portal(
    portal: &mut Portal,
    destination: Option<DestinationSample>,
    player: Option<PlayerSample>,
    events: &mut Vec<GateEvent>,
) {
    let Some(destination) = destination else {
        set_camera_active(portal, false, events);
        set_surface_visible(portal, false, events);
        return;
    };

    set_camera_active(portal, destination.in_room, events);
    let in_room = portal.is_in_room(player.map(|sample| sample.position));
    set_surface_visible(portal, in_room, events);

    if !portal.camera.active {
        return;
    }
    // in_room already implies a player, but the camera needs its sample.
    if let Some(player) = player {
        portal.camera.pose = view_camera_pose(
            portal.pose(),
            &destination.pose,
            &player,
            portal.is_inverted(),
        );
    }
}

fn set_camera_active(portal: &mut Portal, active: bool, events: &mut Vec<GateEvent>) {
    if portal.camera.active == active {
        return;
    }
    portal.camera.active = active;
    debug!(
        "{} ({}) view camera {}",
        portal.id(),
        portal.name(),
        if active { "activated" } else { "deactivated" }
    );
    events.push(if active {
        GateEvent::CameraActivated(portal.id())
    } else {
        GateEvent::CameraDeactivated(portal.id())
    });
}

fn set_surface_visible(portal: &mut Portal, visible: bool, events: &mut Vec<GateEvent>) {
    if portal.surface_visible == visible {
        return;
    }
    portal.surface_visible = visible;
    debug!(
        "{} ({}) surface {}",
        portal.id(),
        portal.name(),
        if visible { "shown" } else { "hidden" }
    );
    events.push(if visible {
        GateEvent::SurfaceShown(portal.id())
    } else {
        GateEvent::SurfaceHidden(portal.id())
    });
}
