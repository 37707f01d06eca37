//! Corridor Runner - a ray-marched SDF corridor racer
//!
//! Core modules:
//! - `sim`: Frame update engine (substep physics, collisions, lifecycle)
//! - `kinematics`: Rotation matrices, mixing, hue rotation
//! - `renderer`: Renderer boundary trait plus the wgpu SDF pipeline
//! - `platform`: Browser/native platform abstraction (input, asset loading)
//! - `tuning`: Data-driven game balance
//! - `ui`: Menu visibility, countdown label, FPS counter

pub mod error;
pub mod kinematics;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use error::{GameError, Result};
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Default number of physics substeps per rendered frame
    pub const DEFAULT_SUBSTEPS: u32 = 8;
    /// Upper bound accepted from the options menu
    pub const MAX_SUBSTEPS: u32 = 64;

    /// Countdown before a level starts (ms)
    pub const COUNTDOWN_DURATION_MS: f64 = 3000.0;
    /// "GO" stays on screen this long after the countdown (ms)
    pub const GO_DISPLAY_MS: f64 = 1000.0;

    /// Uniform array capacities (must match the shader)
    pub const MAX_LIGHTS: usize = 32;
    pub const MAX_DIRECTIONAL_LIGHTS: usize = 32;
    pub const MAX_MATERIALS: usize = 32;
    pub const MAX_OBSTACLES: usize = 32;

    /// Collision readback byte meaning "nothing hit"
    pub const NO_HIT: u8 = 255;

    /// Response constants, all per millisecond of simulated time
    pub const ROTATION_RESPONSE: f32 = 0.007;
    pub const LATERAL_RESPONSE: f32 = 0.01;
    pub const FORWARD_RESPONSE: f32 = 0.02;
    pub const CHASE_RESPONSE: f32 = 0.0003;
    pub const PROJECTILE_CARRY_RESPONSE: f32 = 0.01;
    pub const PROJECTILE_RELATIVE_RESPONSE: f32 = 0.08;

    /// Player starting forward speed
    pub const PLAYER_START_SPEED: f32 = 1.0;

    /// Corridor half-width: base + amplitude * sin(frequency * z)
    pub const WALL_BASE: f32 = 4.5;
    pub const WALL_AMPLITUDE: f32 = 0.5;
    pub const WALL_FREQUENCY: f32 = 0.1;
    /// Rotation kept (and inverted) on a wall bounce
    pub const WALL_BOUNCE: f32 = 0.9;

    /// Projectile spawns this far in front of the player
    pub const PROJECTILE_LAUNCH_OFFSET: f32 = 2.4;
    /// Projectile is culled this far ahead of the camera
    pub const PROJECTILE_CULL_DISTANCE: f32 = 288.0;
    /// Projectile is culled this far past the win plane
    pub const PROJECTILE_WIN_OVERSHOOT: f32 = 0.5;

    /// Camera sits above and behind the player
    pub const CAMERA_HEIGHT: f32 = 4.5;
    pub const CAMERA_TRAIL: f32 = 20.0;

    /// End-of-run view shake
    pub const SHAKE_FRAMES: u32 = 15;
    pub const SHAKE_MAGNITUDE: f32 = 30.0;
    pub const SHAKE_MAGNITUDE_DELTA: f32 = -2.0;

    /// Near-win rumble starts this far before the win plane
    pub const WIN_RUMBLE_DISTANCE: f32 = 50.0;
    pub const WIN_RUMBLE_GAIN: f32 = 0.6;

    /// Lights never travel past this point beyond the win plane
    pub const LIGHT_WIN_MARGIN: f32 = 5.0;
}

/// Corridor half-width at depth `z`
#[inline]
pub fn wall_distance(z: f32) -> f32 {
    use consts::*;
    WALL_BASE + WALL_AMPLITUDE * (WALL_FREQUENCY * z).sin()
}
