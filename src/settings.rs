//! Game settings and preferences
//!
//! Held in memory for the session. The options menu edits them; a settings
//! JSON can seed them at startup.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_SUBSTEPS, MAX_SUBSTEPS};
use crate::error::Result;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Ray-march step budget for the visible pass
    pub fn march_steps(&self) -> u32 {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 128,
            QualityPreset::High => 256,
        }
    }

    /// Number of shadow rays per light (0 disables soft shadows)
    pub fn shadow_steps(&self) -> u32 {
        match self {
            QualityPreset::Low => 0,
            QualityPreset::Medium => 24,
            QualityPreset::High => 48,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    /// Physics substeps per rendered frame
    pub physics_substeps: u32,
    /// Longest frame delta fed to the simulation (ms)
    pub max_frame_delta_ms: f64,

    // === Visual Effects ===
    /// Shake on win/loss and near the win plane
    pub screen_shake: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            physics_substeps: DEFAULT_SUBSTEPS,
            max_frame_delta_ms: 250.0,
            screen_shake: true,
            show_fps: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Parse settings JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Pull every numeric field back into the range the frame loop accepts
    pub fn sanitize(&mut self) {
        self.set_physics_substeps(self.physics_substeps);
        self.set_max_frame_delta_ms(self.max_frame_delta_ms);
    }

    /// Apply a substep count from the options menu, clamped to a sane range
    pub fn set_physics_substeps(&mut self, substeps: u32) {
        let clamped = substeps.clamp(1, MAX_SUBSTEPS);
        if clamped != substeps {
            log::warn!("Physics substeps {} out of range, using {}", substeps, clamped);
        }
        self.physics_substeps = clamped;
    }

    /// Set the frame delta cap. Non-positive or non-finite values fall back
    /// to the default.
    pub fn set_max_frame_delta_ms(&mut self, max_ms: f64) {
        if max_ms.is_finite() && max_ms > 0.0 {
            self.max_frame_delta_ms = max_ms;
        } else {
            let fallback = Settings::default().max_frame_delta_ms;
            log::warn!("Max frame delta {} out of range, using {}", max_ms, fallback);
            self.max_frame_delta_ms = fallback;
        }
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.physics_substeps, 8);
        assert!(s.effective_screen_shake());
    }

    #[test]
    fn test_substeps_clamped() {
        let mut s = Settings::default();
        s.set_physics_substeps(0);
        assert_eq!(s.physics_substeps, 1);
        s.set_physics_substeps(1000);
        assert_eq!(s.physics_substeps, MAX_SUBSTEPS);

        let s = Settings::from_json(r#"{ "physics_substeps": 0, "reduced_motion": true }"#)
            .expect("valid settings");
        assert_eq!(s.physics_substeps, 1);
        assert!(!s.effective_screen_shake());
    }

    #[test]
    fn test_max_frame_delta_sanitized() {
        let s = Settings::from_json(r#"{ "max_frame_delta_ms": -1.0 }"#).expect("valid settings");
        assert_eq!(s.max_frame_delta_ms, Settings::default().max_frame_delta_ms);

        let s = Settings::from_json(r#"{ "max_frame_delta_ms": 0.0 }"#).expect("valid settings");
        assert!(s.max_frame_delta_ms > 0.0);

        let s = Settings::from_json(r#"{ "max_frame_delta_ms": 100.0 }"#).expect("valid settings");
        assert_eq!(s.max_frame_delta_ms, 100.0);
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!(QualityPreset::parse("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::parse("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::parse("ultra"), None);
        assert_eq!(QualityPreset::Low.as_str(), "Low");
    }
}
