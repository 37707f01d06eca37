//! Rotation matrices, vector mixing and colour hue rotation
//!
//! Axis conventions: the player travels toward -z, y is up, x is lateral.
//! "Roll" rotates about z (the travel axis), "yaw" about y, "pitch" about x.

use glam::{Mat3, Vec3};

/// Rotation about the travel (z) axis
pub fn roll(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    Mat3::from_cols(Vec3::new(c, s, 0.0), Vec3::new(-s, c, 0.0), Vec3::Z)
}

/// Rotation about the vertical (y) axis
pub fn yaw(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    Mat3::from_cols(Vec3::new(c, 0.0, -s), Vec3::Y, Vec3::new(s, 0.0, c))
}

/// Rotation about the lateral (x) axis
pub fn pitch(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    Mat3::from_cols(Vec3::X, Vec3::new(0.0, c, s), Vec3::new(0.0, -s, c))
}

/// View-to-world rotation for camera angles `(yaw, pitch, roll)`
///
/// Composes yaw, then pitch, then roll, and transposes the result: the
/// shader multiplies view-space ray directions by this matrix.
pub fn view_to_world(angles: Vec3) -> Mat3 {
    (yaw(angles.x) * pitch(angles.y) * roll(angles.z)).transpose()
}

/// Linear interpolation between `a` and `b`; `t` is not clamped
#[inline]
pub fn mix(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Rotate the hue of an RGB colour by `degrees`, keeping luminance constant
pub fn rotate_hue(c: Vec3, degrees: f32) -> Vec3 {
    let (w, u) = degrees.to_radians().sin_cos();

    Vec3::new(
        (0.299 + 0.701 * u + 0.168 * w) * c.x
            + (0.587 - 0.587 * u + 0.330 * w) * c.y
            + (0.114 - 0.114 * u - 0.497 * w) * c.z,
        (0.299 - 0.299 * u - 0.328 * w) * c.x
            + (0.587 + 0.413 * u + 0.035 * w) * c.y
            + (0.114 - 0.114 * u + 0.292 * w) * c.z,
        (0.299 - 0.300 * u + 1.250 * w) * c.x
            + (0.587 - 0.588 * u - 1.050 * w) * c.y
            + (0.114 + 0.886 * u - 0.203 * w) * c.z,
    )
}
