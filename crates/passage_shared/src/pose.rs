use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat3, Quat, Vec3};

/// World-space position and orientation.
///
/// Portal surfaces are planes whose local +Y axis is the outward normal, so a
/// standing portal carries a quarter turn about X on top of its heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Upright surface at `position` whose front faces heading `yaw` about world up.
    pub fn standing(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw) * Quat::from_rotation_x(FRAC_PI_2),
        }
    }

    /// Local +Y in world space; the surface normal for portal poses.
    pub fn front(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local +Z in world space; the look direction for camera and body poses.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn to_local(&self, world_point: Vec3) -> Vec3 {
        self.rotation.inverse() * (world_point - self.position)
    }

    pub fn to_world(&self, local_point: Vec3) -> Vec3 {
        self.position + self.rotation * local_point
    }

    /// Heading about world up. Uses the front axis, falling back to local +Z
    /// for surfaces lying flat.
    pub fn heading_yaw(&self) -> f32 {
        let front = self.front();
        let flat = Vec3::new(front.x, 0.0, front.z);
        if flat.length_squared() > 1.0e-6 {
            return heading_of(flat);
        }
        let forward = self.forward();
        heading_of(Vec3::new(forward.x, 0.0, forward.z))
    }
}

/// Yaw whose rotation about world up carries +Z onto `direction`.
pub fn heading_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Signed rotation about world up that turns `from`'s heading onto `to`'s.
pub fn yaw_delta(from: &Pose, to: &Pose) -> f32 {
    wrap_angle(to.heading_yaw() - from.heading_yaw())
}

/// Negates local X and Y; a half turn about local Z.
pub fn mirror_xy(local: Vec3) -> Vec3 {
    Vec3::new(-local.x, -local.y, local.z)
}

/// Rotation whose local +Z points along `forward` with local +Y as close to
/// `up` as possible.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let z = forward.normalize_or_zero();
    if z == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let mut x = up.cross(z);
    if x.length_squared() < 1.0e-6 {
        x = z.any_orthonormal_vector();
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z))
}
