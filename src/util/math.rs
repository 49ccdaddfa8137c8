//! Angle arithmetic on the integer-degree circle.

/// Wraps any integer degree value into `[0, 360)`.
pub(crate) fn wrap_deg(angle_deg: i32) -> u16 {
    angle_deg.rem_euclid(360) as u16
}

/// Minimum of the clockwise and counter-clockwise separation, in `[0, 180]`.
pub(crate) fn circular_distance_deg(a: u16, b: u16) -> u16 {
    let diff = (i32::from(a) - i32::from(b)).rem_euclid(360) as u16;
    diff.min(360 - diff)
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}
