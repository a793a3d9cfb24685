use glam::{Quat, Vec3};
use passage_shared::physics::AABB;
use passage_shared::pose::wrap_angle;

/// What the portal system needs from the player controller.
pub trait PlayerBody {
    /// Body origin; used for room distance and the teleport mapping.
    fn position(&self) -> Vec3;
    /// Camera origin; used for crossing-side tests.
    fn eye_position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    /// World look direction of the player's camera.
    fn forward(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    fn set_rotation(&mut self, rotation: Quat);
    /// Adds to the yaw the controller tracks for its camera, so the next look
    /// update does not undo a teleport's rotation.
    fn add_camera_yaw(&mut self, delta: f32);

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn set_velocity(&mut self, _velocity: Vec3) {}
}

#[derive(Debug, Clone)]
pub struct PlayerRig {
    pub position: Vec3,
    pub rotation: Quat,
    pub camera_yaw: f32,
    pub pitch: f32,
    pub eye_height: f32,
    pub velocity: Vec3,
    pub half_extents: Vec3,
}

impl Default for PlayerRig {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            camera_yaw: 0.0,
            pitch: 0.0,
            eye_height: 1.6,
            velocity: Vec3::ZERO,
            half_extents: Vec3::new(0.3, 0.9, 0.3),
        }
    }
}

impl PlayerRig {
    pub fn new(position: Vec3, yaw: f32, eye_height: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
            camera_yaw: wrap_angle(yaw),
            eye_height,
            ..Default::default()
        }
    }

    /// Controller look step: the body follows the tracked camera yaw.
    pub fn sync_body_to_camera(&mut self) {
        self.rotation = Quat::from_rotation_y(self.camera_yaw);
    }

    /// Moves with a velocity given in the body's heading frame.
    pub fn walk(&mut self, local_velocity: Vec3, dt_s: f32) {
        self.velocity = Quat::from_rotation_y(self.camera_yaw) * local_velocity;
        self.position += self.velocity * dt_s;
    }

    pub fn turn(&mut self, delta: f32) {
        self.camera_yaw = wrap_angle(self.camera_yaw + delta);
    }

    pub fn bounds(&self) -> AABB {
        AABB::from_center_half_extents(
            self.position + Vec3::Y * self.half_extents.y,
            self.half_extents,
        )
    }
}

impl PlayerBody for PlayerRig {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn eye_position(&self) -> Vec3 {
        self.position + Vec3::Y * self.eye_height
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn forward(&self) -> Vec3 {
        (self.rotation * Quat::from_rotation_x(-self.pitch) * Vec3::Z).normalize_or_zero()
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn add_camera_yaw(&mut self, delta: f32) {
        self.turn(delta);
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use glam::Vec3;

    use super::{PlayerBody, PlayerRig};

    #[test]
    fn forward_tracks_body_heading_and_pitch() {
        let mut rig = PlayerRig::new(Vec3::ZERO, FRAC_PI_2, 1.6);
        assert!((rig.forward() - Vec3::X).length() < 1.0e-5);

        rig.pitch = FRAC_PI_2;
        assert!((rig.forward() - Vec3::Y).length() < 1.0e-5);
    }

    #[test]
    fn walk_moves_along_camera_heading() {
        let mut rig = PlayerRig::new(Vec3::ZERO, FRAC_PI_2, 1.6);
        rig.walk(Vec3::new(0.0, 0.0, 2.0), 0.5);
        assert!((rig.position - Vec3::X).length() < 1.0e-5);
        assert!((rig.eye_position() - Vec3::new(1.0, 1.6, 0.0)).length() < 1.0e-5);
    }
}
