//! Entity state for one level run
//!
//! Owned by the session and handed to the substep loop by `&mut`. Rebuilt
//! from the level template on every (re)start.

use super::level::Level;
use super::scene::Scene;
use super::state::{Camera, Player, Projectile};
use super::stream::ObstacleWindow;
use crate::error::Result;
use crate::kinematics::view_to_world;
use crate::renderer::{FrameUniforms, Renderer};
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct World {
    pub player: Player,
    pub projectile: Projectile,
    pub camera: Camera,
    pub obstacles: ObstacleWindow,
    pub scene: Scene,
    pub win_position: f32,
    /// Chaser blend multiplier (tuning and level combined)
    pub chase_speed: f32,
    /// Obstacles moved, streamed or were destroyed since the last push
    pub obstacles_dirty: bool,
}

impl World {
    pub fn for_level(level: &Level, tuning: &Tuning) -> Self {
        let player = Player::default();
        let mut camera = Camera::new(tuning.camera_angles);
        camera.follow(&player);
        let obstacles = ObstacleWindow::for_level(level, camera.pos.z);

        Self {
            player,
            projectile: Projectile::new(tuning.relative_projectile_speed),
            camera,
            obstacles,
            scene: Scene::default(),
            win_position: level.win_position,
            chase_speed: tuning.obstacle_chase_speed * level.chase_speed,
            obstacles_dirty: true,
        }
    }

    pub fn uniforms(&self, sim_time_secs: f32) -> FrameUniforms<'_> {
        FrameUniforms {
            lights: &self.scene.lights,
            directional_lights: &self.scene.directional_lights,
            materials: &self.scene.materials,
            obstacles: self.obstacles.active(),
            obstacles_changed: self.obstacles_dirty,
            player: &self.player,
            projectile: &self.projectile,
            camera: &self.camera,
            view_to_world: view_to_world(self.camera.angles),
            win_position: self.win_position,
            sim_time_secs,
        }
    }

    pub fn push<R: Renderer>(&mut self, renderer: &mut R, sim_time_secs: f32) {
        renderer.push_entity_uniforms(&self.uniforms(sim_time_secs));
        self.obstacles_dirty = false;
    }

    /// Track lights, upload, and draw the visible frame
    pub fn draw<R: Renderer>(&mut self, renderer: &mut R, sim_time_secs: f32) -> Result<()> {
        self.camera.follow(&self.player);
        self.scene.track(&self.player, &self.projectile, self.win_position);
        self.push(renderer, sim_time_secs);
        renderer.draw_frame(false)
    }
}
