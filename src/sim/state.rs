//! Per-run entity types
//!
//! Everything here is plain data. Lifecycle rules (reset, deep copy,
//! tombstoning) are enforced by the constructors and a couple of helpers.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Current phase of the game session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Level selection menu is showing
    #[default]
    LevelSelect,
    /// Level loaded, waiting for the countdown to elapse
    Countdown,
    /// Active gameplay
    Playing,
    /// Update loop halted by the player or by losing visibility/renderer
    Paused,
    /// Player hit an obstacle
    Lost,
    /// Player crossed the win plane
    Won,
}

impl GamePhase {
    /// Phases in which a level run is in progress (possibly halted)
    pub fn in_run(self) -> bool {
        matches!(self, GamePhase::Countdown | GamePhase::Playing | GamePhase::Paused)
    }
}

/// Obstacle shape tag, resolved to a distance function by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObstacleShape {
    #[default]
    Block,
    Pillar,
    Arch,
}

impl ObstacleShape {
    /// Shader-side shape id
    pub fn id(self) -> u32 {
        match self {
            ObstacleShape::Block => 0,
            ObstacleShape::Pillar => 1,
            ObstacleShape::Arch => 2,
        }
    }
}

/// An obstacle in a level template or a live run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec3,
    /// Roll about the travel axis (radians)
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub shape: ObstacleShape,
    /// Index into the material table
    pub material: u32,
    #[serde(default)]
    pub destroyable: bool,
    #[serde(default)]
    pub chase_player: bool,
    /// Tombstone flag; never flips back to true within a run
    #[serde(skip, default = "default_exists")]
    pub exists: bool,
}

fn default_exists() -> bool {
    true
}

impl Obstacle {
    pub fn new(
        pos: Vec3,
        angle: f32,
        shape: ObstacleShape,
        material: u32,
        destroyable: bool,
        chase_player: bool,
    ) -> Self {
        Self {
            pos,
            angle,
            shape,
            material,
            destroyable,
            chase_player,
            exists: true,
        }
    }

    /// Fresh live copy of a template obstacle
    pub fn instantiate(&self) -> Self {
        Self {
            exists: true,
            ..self.clone()
        }
    }

    /// Soft-delete in place. Returns true if this call changed anything.
    pub fn tombstone(&mut self) -> bool {
        std::mem::replace(&mut self.exists, false)
    }
}

/// The player's capsule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec3,
    /// Forward speed multiplier, ramps up while playing
    pub speed: f32,
    /// Signed roll angle, positive leans left
    pub rotation: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            speed: PLAYER_START_SPEED,
            rotation: 0.0,
        }
    }
}

/// At most one projectile is live at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub exists: bool,
    pub pos: Vec3,
    /// Player speed captured at launch
    pub launch_speed: f32,
    /// Speed relative to the player
    pub relative_speed: f32,
}

impl Projectile {
    pub fn new(relative_speed: f32) -> Self {
        Self {
            exists: false,
            pos: Vec3::ZERO,
            launch_speed: 0.0,
            relative_speed,
        }
    }

    /// Launch from in front of the player. No-op if one is already live.
    pub fn fire(&mut self, player: &Player) -> bool {
        if self.exists {
            return false;
        }
        self.exists = true;
        self.pos = player.pos - Vec3::Z * PROJECTILE_LAUNCH_OFFSET;
        self.launch_speed = player.speed;
        true
    }

    /// Travel per millisecond along -z
    pub fn speed_per_ms(&self) -> f32 {
        self.launch_speed * PROJECTILE_CARRY_RESPONSE
            + self.relative_speed * PROJECTILE_RELATIVE_RESPONSE
    }

    pub fn clear(&mut self) {
        self.exists = false;
    }
}

/// Camera trailing the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pos: Vec3,
    /// (yaw, pitch, roll)
    pub angles: Vec3,
}

impl Camera {
    pub fn new(angles: Vec3) -> Self {
        let mut camera = Self {
            pos: Vec3::ZERO,
            angles,
        };
        camera.follow(&Player::default());
        camera
    }

    /// Keep height and distance fixed relative to the player
    pub fn follow(&mut self, player: &Player) {
        self.pos.y = player.pos.y + CAMERA_HEIGHT;
        self.pos.z = player.pos.z + CAMERA_TRAIL;
    }
}
