//! Data-driven game balance
//!
//! Every field has a default, so a tuning JSON only needs the values it
//! overrides.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::COUNTDOWN_DURATION_MS;
use crate::error::{GameError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Roll limit (radians)
    pub max_rotation: f32,
    /// How quickly roll approaches its target
    pub rotation_speed: f32,
    /// Lateral speed at full roll
    pub movement_speed: f32,
    /// Global chaser convergence multiplier (levels scale it further)
    pub obstacle_chase_speed: f32,
    /// Projectile speed on top of the carried player speed
    pub relative_projectile_speed: f32,
    /// Forward speed gained per millisecond of play
    pub speed_ramp_per_ms: f32,
    pub countdown_ms: f64,
    /// Camera (yaw, pitch, roll)
    pub camera_angles: Vec3,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_rotation: 0.4,
            rotation_speed: 1.0,
            movement_speed: 1.0,
            obstacle_chase_speed: 1.0,
            relative_projectile_speed: 1.0,
            speed_ramp_per_ms: 0.000005,
            countdown_ms: COUNTDOWN_DURATION_MS,
            camera_angles: Vec3::new(0.0, -0.1, 0.0),
        }
    }
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the substep loop can't integrate. Roll is clamped to
    /// `±max_rotation` and divided by it, so it must be strictly positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_rotation.is_finite() && self.max_rotation > 0.0) {
            return Err(GameError::InvalidTuning(format!(
                "max_rotation must be positive, got {}",
                self.max_rotation
            )));
        }

        let rates = [
            ("rotation_speed", self.rotation_speed),
            ("movement_speed", self.movement_speed),
            ("obstacle_chase_speed", self.obstacle_chase_speed),
            ("relative_projectile_speed", self.relative_projectile_speed),
            ("speed_ramp_per_ms", self.speed_ramp_per_ms),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GameError::InvalidTuning(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        if !(self.countdown_ms.is_finite() && self.countdown_ms >= 0.0) {
            return Err(GameError::InvalidTuning(format!(
                "countdown_ms must be finite and non-negative, got {}",
                self.countdown_ms
            )));
        }
        if !self.camera_angles.is_finite() {
            return Err(GameError::InvalidTuning("camera_angles must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{ "max_rotation": 0.5, "countdown_ms": 1000.0 }"#)
            .expect("valid tuning");
        assert_eq!(tuning.max_rotation, 0.5);
        assert_eq!(tuning.countdown_ms, 1000.0);
        assert_eq!(tuning.rotation_speed, Tuning::default().rotation_speed);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_max_rotation() {
        for json in [r#"{ "max_rotation": -0.4 }"#, r#"{ "max_rotation": 0.0 }"#] {
            let err = Tuning::from_json(json).expect_err("roll limit must be positive");
            assert!(matches!(err, GameError::InvalidTuning(_)), "{}", err);
        }
    }

    #[test]
    fn test_rejects_negative_rates() {
        let err = Tuning::from_json(r#"{ "movement_speed": -1.0 }"#).expect_err("negative speed");
        assert!(err.to_string().contains("movement_speed"));
        assert!(Tuning::from_json(r#"{ "countdown_ms": -5.0 }"#).is_err());
        assert!(Tuning::from_json(r#"{ "obstacle_chase_speed": 0.0 }"#).is_ok());
    }
}
