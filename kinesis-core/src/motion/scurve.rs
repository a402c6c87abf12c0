//! Constant-jerk kinematics
//!
//! Within one S-curve phase the jerk is constant, so the motion is fully
//! described by the distance, velocity and acceleration at the start of
//! the phase (the anchor) plus the jerk:
//!
//! ```text
//! a(t) = iA + j·t
//! v(t) = iV + iA·t + j·t²/2
//! d(t) = iD + iV·t + iA·t²/2 + j·t³/6
//! ```

/// Distance traveled after `t` seconds, excluding the anchor distance
#[inline]
pub fn distance(t: f32, iv: f32, ia: f32, jerk: f32) -> f32 {
    iv * t + 0.5 * ia * t * t + jerk * t * t * t / 6.0
}

/// Velocity change after `t` seconds
#[inline]
pub fn velocity(t: f32, ia: f32, jerk: f32) -> f32 {
    ia * t + 0.5 * jerk * t * t
}

/// Acceleration change after `t` seconds
#[inline]
pub fn acceleration(t: f32, jerk: f32) -> f32 {
    jerk * t
}

/// Distance, velocity and acceleration at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Kinematics {
    pub distance: f32,
    pub velocity: f32,
    pub accel: f32,
}

/// Start-of-phase state the integrator works from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Anchor {
    /// Initial distance
    pub distance: f32,
    /// Initial velocity
    pub velocity: f32,
    /// Initial acceleration
    pub accel: f32,
}

impl Anchor {
    /// Evaluate the phase `t` seconds after the anchor
    pub fn at(&self, t: f32, jerk: f32) -> Kinematics {
        Kinematics {
            distance: self.distance + distance(t, self.velocity, self.accel, jerk),
            velocity: self.velocity + velocity(t, self.accel, jerk),
            accel: self.accel + acceleration(t, jerk),
        }
    }
}
