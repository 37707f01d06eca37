//! Level templates and the level catalog
//!
//! Levels are immutable blueprints. A run deep-copies the obstacle list via
//! [`Level::instantiate_obstacles`] and never writes back.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Obstacle, ObstacleShape};
use crate::consts::*;
use crate::error::{GameError, Result};

/// Streaming window distances for long levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Obstacles are loaded once within this distance ahead of the camera
    pub look_ahead: f32,
    /// Obstacles are evicted once this far behind the camera
    pub evict_behind: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            look_ahead: PROJECTILE_CULL_DISTANCE,
            evict_behind: 10.0,
        }
    }
}

/// A level blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub title: String,
    /// Sorted by non-increasing z
    pub obstacles: Vec<Obstacle>,
    /// The player wins once their z reaches this
    pub win_position: f32,
    /// Maximum simultaneously active obstacles
    #[serde(default = "default_obstacle_cap")]
    pub obstacle_cap: usize,
    /// Multiplier on chaser convergence speed
    #[serde(default = "default_chase_speed")]
    pub chase_speed: f32,
    /// Present for levels that stream obstacles in and out
    #[serde(default)]
    pub streaming: Option<StreamConfig>,
}

fn default_obstacle_cap() -> usize {
    MAX_OBSTACLES
}

fn default_chase_speed() -> f32 {
    1.0
}

impl Level {
    pub fn new(title: &str, obstacles: Vec<Obstacle>, win_position: f32) -> Self {
        Self {
            title: title.to_string(),
            obstacles,
            win_position,
            obstacle_cap: MAX_OBSTACLES,
            chase_speed: 1.0,
            streaming: None,
        }
    }

    pub fn with_streaming(mut self, stream: StreamConfig) -> Self {
        self.streaming = Some(stream);
        self
    }

    /// Active obstacle capacity after clamping to what the renderer and the
    /// readback byte can address
    pub fn effective_cap(&self) -> usize {
        self.obstacle_cap.min(MAX_OBSTACLES).min(NO_HIT as usize)
    }

    /// Fresh per-run copy of the full obstacle list, truncated to capacity
    pub fn instantiate_obstacles(&self) -> Vec<Obstacle> {
        let cap = self.effective_cap();
        if self.obstacles.len() > cap {
            log::warn!(
                "Level '{}' has {} obstacles, truncating to {}",
                self.title,
                self.obstacles.len(),
                cap
            );
        }
        self.obstacles.iter().take(cap).map(Obstacle::instantiate).collect()
    }

    /// Whether obstacles are in non-increasing z order
    pub fn is_depth_sorted(&self) -> bool {
        self.obstacles.windows(2).all(|w| w[0].pos.z >= w[1].pos.z)
    }
}

/// Ordered list of levels offered in the level menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCatalog {
    pub levels: Vec<Level>,
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LevelCatalog {
    /// Parse a catalog from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: LevelCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(GameError::EmptyCatalog);
        }
        for level in &self.levels {
            if !level.is_depth_sorted() {
                // Streaming skips obstacles out of order; fixed levels don't care
                log::warn!("Level '{}' obstacles are not sorted by depth", level.title);
            }
            if level.streaming.is_none() && level.obstacles.len() > level.effective_cap() {
                log::warn!(
                    "Level '{}' exceeds its obstacle cap ({} > {})",
                    level.title,
                    level.obstacles.len(),
                    level.effective_cap()
                );
            }
        }
        Ok(())
    }

    pub fn get(&self, id: usize) -> Result<&Level> {
        self.levels.get(id).ok_or(GameError::UnknownLevel(id))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Menu labels, "1. Basics" style
    pub fn labels(&self) -> Vec<String> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, l)| format!("{}. {}", i + 1, l.title))
            .collect()
    }

    /// The levels that ship with the game
    pub fn builtin() -> Self {
        use ObstacleShape::*;

        const GREEN: u32 = 6;
        const PINK: u32 = 7;

        let o = |x: f32, y: f32, z: f32, angle: f32, shape, mat, destroyable, chase| {
            Obstacle::new(Vec3::new(x, y, z), angle, shape, mat, destroyable, chase)
        };

        let mut levels = vec![
            Level::new(
                "Basics",
                vec![
                    o(0.0, 0.0, -100.0, 0.0, Block, GREEN, true, false),
                    o(0.0, 0.0, -200.0, 0.0, Pillar, GREEN, true, false),
                    o(0.0, 0.0, -300.0, 0.0, Arch, GREEN, true, false),
                ],
                -500.0,
            ),
            Level::new(
                "Indestructibles",
                vec![
                    o(-2.0, 0.0, -80.0, 0.0, Block, PINK, false, false),
                    o(2.0, 0.0, -93.0, 0.0, Block, PINK, false, false),
                    o(-2.0, 0.0, -106.0, 0.0, Block, PINK, false, false),
                ],
                -130.0,
            ),
            Level::new(
                "Precision",
                (0..9)
                    .map(|i| {
                        // Zig-zag of alternating destroyable/solid pillars
                        let x = [-1.6, -0.8, 0.0, 0.8, 1.6, 0.8, 0.0, -0.8, -1.6][i];
                        let z = -70.0 - 10.0 * i as f32;
                        let destroyable = i % 2 == 0;
                        let mat = if destroyable { GREEN } else { PINK };
                        o(x, 0.0, z, 0.0, Pillar, mat, destroyable, false)
                    })
                    .collect(),
                -170.0,
            ),
            Level::new(
                "Chasers",
                vec![
                    o(-2.0, 0.0, -100.0, 0.0, Block, GREEN, true, true),
                    o(2.0, 0.0, -200.0, 0.0, Arch, PINK, false, true),
                ],
                -250.0,
            ),
            Level::new(
                "More Chasers",
                vec![
                    o(-3.0, 0.0, -100.0, 0.0, Block, PINK, false, true),
                    o(0.0, 0.0, -100.0, 0.0, Pillar, PINK, false, true),
                    o(3.0, 0.0, -100.0, 0.0, Block, PINK, false, true),
                ],
                -120.0,
            ),
            Level::new(
                "Alignment",
                [
                    o(-4.2, 0.0, -80.0, 0.0, Block, PINK, false, false),
                    o(4.2, 0.0, -80.0, 0.0, Block, PINK, false, false),
                ]
                .into_iter()
                .chain((0..7).map(|i| {
                    let x = -3.0 + i as f32;
                    o(x, 0.0, -100.0 - 10.0 * i as f32, 0.0, Pillar, PINK, false, true)
                }))
                .collect(),
                -200.0,
            ),
            Level::new(
                "Collapsing Structure",
                vec![
                    o(-2.0, 2.0, -100.0, 0.0, Block, PINK, false, true),
                    o(2.0, 2.0, -100.0, 0.0, Block, PINK, false, true),
                    o(-5.0, 0.5, -100.0, 1.57, Block, PINK, false, true),
                    o(5.0, 0.5, -100.0, 1.57, Block, PINK, false, true),
                    o(-2.0, 2.0, -170.0, 0.0, Block, PINK, false, true),
                    o(2.0, 2.0, -170.0, 0.0, Block, PINK, false, true),
                    o(-5.0, 0.5, -170.0, 1.57, Block, GREEN, true, true),
                    o(5.0, 0.5, -170.0, 1.57, Block, PINK, false, true),
                ],
                -200.0,
            ),
        ];

        levels.push(gauntlet());

        Self { levels }
    }
}

/// Long streaming level; far more obstacles than fit in the uniform arrays
fn gauntlet() -> Level {
    const ROWS: usize = 120;
    const SPACING: f32 = 25.0;

    let obstacles = (0..ROWS)
        .map(|row| {
            let z = -80.0 - SPACING * row as f32;
            // Deterministic lane pattern, left/centre/right
            let lane = ((row * 7 + row / 3) % 3) as f32 - 1.0;
            let shape = match row % 3 {
                0 => ObstacleShape::Block,
                1 => ObstacleShape::Pillar,
                _ => ObstacleShape::Arch,
            };
            let destroyable = row % 4 != 3;
            let material = if destroyable { 6 } else { 7 };
            Obstacle::new(Vec3::new(lane * 2.5, 0.0, z), 0.0, shape, material, destroyable, row % 10 == 9)
        })
        .collect::<Vec<_>>();

    let win_position = -80.0 - SPACING * ROWS as f32 - 40.0;

    let mut level = Level::new("Gauntlet", obstacles, win_position);
    level.obstacle_cap = 16;
    level.chase_speed = 0.5;
    level.with_streaming(StreamConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.labels()[0], "1. Basics");
        assert_eq!(catalog.get(0).map(|l| l.win_position).ok(), Some(-500.0));
        for level in &catalog.levels {
            assert!(level.is_depth_sorted(), "{} unsorted", level.title);
            if level.streaming.is_none() {
                assert!(level.obstacles.len() <= level.effective_cap());
            }
        }
    }

    #[test]
    fn test_gauntlet_needs_streaming() {
        let catalog = LevelCatalog::builtin();
        let gauntlet = catalog.levels.last().expect("gauntlet");
        assert!(gauntlet.streaming.is_some());
        assert!(gauntlet.obstacles.len() > MAX_OBSTACLES);
    }

    #[test]
    fn test_unknown_level() {
        let catalog = LevelCatalog::builtin();
        assert!(matches!(catalog.get(99), Err(GameError::UnknownLevel(99))));
    }

    #[test]
    fn test_instantiate_truncates_to_cap() {
        let obstacles = (0..40)
            .map(|i| Obstacle::new(Vec3::new(0.0, 0.0, -10.0 * i as f32), 0.0, ObstacleShape::Block, 6, true, false))
            .collect();
        let level = Level::new("Crowded", obstacles, -500.0);
        let live = level.instantiate_obstacles();
        assert_eq!(live.len(), MAX_OBSTACLES);
        assert!(live.iter().all(|o| o.exists));
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "levels": [{
                "title": "Json Level",
                "obstacles": [
                    { "pos": [0.0, 0.0, -50.0], "material": 6, "destroyable": true },
                    { "pos": [1.0, 0.0, -60.0], "shape": "Pillar", "material": 7 }
                ],
                "win_position": -100.0
            }]
        }"#;
        let catalog = LevelCatalog::from_json(json).expect("valid catalog");
        let level = catalog.get(0).expect("level 0");
        assert_eq!(level.obstacles.len(), 2);
        assert!(level.obstacles[0].exists);
        assert!(level.obstacles[0].destroyable);
        assert_eq!(level.obstacles[1].shape, ObstacleShape::Pillar);
        assert_eq!(level.obstacle_cap, MAX_OBSTACLES);
        assert!(level.streaming.is_none());
    }

    #[test]
    fn test_catalog_rejects_empty_and_malformed() {
        assert!(matches!(
            LevelCatalog::from_json(r#"{ "levels": [] }"#),
            Err(GameError::EmptyCatalog)
        ));
        assert!(matches!(
            LevelCatalog::from_json("{ not json"),
            Err(GameError::Config(_))
        ));
    }
}
