//! Shading parameters consumed by the renderer every frame
//!
//! Most of this is static. The tracked lights and the wall hue are functions
//! of gameplay state and get recomputed once per frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Player, Projectile};
use crate::consts::*;
use crate::kinematics::rotate_hue;

/// Point light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub pos: Vec3,
    pub colour: Vec3,
    pub intensity: f32,
    pub range: f32,
}

impl Light {
    pub fn new(pos: Vec3, colour: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            pos,
            colour,
            intensity,
            range,
        }
    }

    /// Shader-side falloff term
    pub fn reciprocal_range_squared(&self) -> f32 {
        1.0 / (self.range * self.range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub colour: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Material {
    pub fn new(diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            diffuse,
            specular,
            shininess,
        }
    }
}

/// Fixed light slots
pub mod light_slot {
    pub const PLAYER: usize = 0;
    pub const FORWARD: usize = 1;
    pub const SECONDARY_FORWARD: usize = 2;
    pub const PROJECTILE: usize = 3;
    pub const WIN: usize = 4;
}

/// Fixed material slots; level obstacles use ids from `OBSTACLE_BASE` up
pub mod material_slot {
    pub const PLAYER: u32 = 0;
    pub const WALL: u32 = 1;
    pub const FLOOR: u32 = 2;
    pub const CHECKER: u32 = 3;
    pub const PROJECTILE: u32 = 4;
    pub const WIN_PLANE: u32 = 5;
    pub const OBSTACLE_BASE: u32 = 6;
}

/// Wall colour before hue cycling
pub const WALL_BASE_COLOUR: Vec3 = Vec3::new(0.35, 0.25, 0.7);

const PROJECTILE_LIGHT_INTENSITY: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub lights: Vec<Light>,
    pub directional_lights: Vec<DirectionalLight>,
    pub materials: Vec<Material>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            lights: vec![
                Light::new(Vec3::new(0.0, 3.0, -1.0), Vec3::ONE, 1.5, 40.0),
                Light::new(Vec3::new(0.0, 4.0, -60.0), Vec3::new(0.8, 0.8, 1.0), 1.0, 50.0),
                Light::new(Vec3::new(0.0, 4.0, -30.0), Vec3::splat(0.6), 1.0, 40.0),
                Light::new(Vec3::ZERO, Vec3::ONE, 0.0, 40.0),
                Light::new(Vec3::ZERO, Vec3::ONE, 1.5, 50.0),
            ],
            directional_lights: Vec::new(),
            materials: vec![
                Material::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE, 8.0),
                Material::new(WALL_BASE_COLOUR, Vec3::splat(0.7), 2.0),
                Material::new(Vec3::new(0.2, 0.2, 0.3), Vec3::ONE, 4.0),
                Material::new(Vec3::splat(0.4), Vec3::ONE, 2.0),
                Material::new(Vec3::new(0.5, 0.5, 0.7), Vec3::ONE, 8.0),
                Material::new(Vec3::new(0.6, 0.4, 0.3), Vec3::ONE, 4.0),
                Material::new(Vec3::new(0.3, 0.6, 0.4), Vec3::new(0.5, 0.7, 0.4), 8.0),
                Material::new(Vec3::new(0.7, 0.3, 0.5), Vec3::ONE, 8.0),
            ],
        }
    }
}

impl Scene {
    /// Cycle the wall hue with simulation time (ms); negative time shows the base colour
    pub fn update_wall_hue(&mut self, sim_time_ms: f64) {
        let degrees = (sim_time_ms.max(0.0) * 0.01) as f32;
        if let Some(wall) = self.materials.get_mut(material_slot::WALL as usize) {
            wall.diffuse = rotate_hue(WALL_BASE_COLOUR, degrees);
        }
    }

    /// Move the tracked lights to follow the player, projectile and win plane
    pub fn track(&mut self, player: &Player, projectile: &Projectile, win_position: f32) {
        use light_slot::*;

        let wall_colour = self
            .materials
            .get(material_slot::WALL as usize)
            .map(|m| m.diffuse)
            .unwrap_or(WALL_BASE_COLOUR);
        let limit = win_position + LIGHT_WIN_MARGIN;

        if self.lights.len() <= WIN {
            log::warn!("Scene has {} lights, tracked slots missing", self.lights.len());
            return;
        }

        // Scale x down so the light never hugs a wall
        let l = &mut self.lights[PLAYER];
        l.pos = Vec3::new(player.pos.x * 0.8, player.pos.y + 4.0, player.pos.z.max(limit));

        let l = &mut self.lights[FORWARD];
        l.pos = Vec3::new(0.0, player.pos.y + 5.0, (player.pos.z - 60.0).max(limit));

        let l = &mut self.lights[SECONDARY_FORWARD];
        l.pos = Vec3::new(0.0, player.pos.y + 5.0, (player.pos.z - 30.0).max(limit));

        let l = &mut self.lights[PROJECTILE];
        if projectile.exists {
            l.colour = wall_colour;
            l.pos = Vec3::new(projectile.pos.x * 0.8, projectile.pos.y + 3.0, projectile.pos.z);
            l.intensity = PROJECTILE_LIGHT_INTENSITY;
        } else {
            l.intensity = 0.0;
        }

        self.lights[WIN].pos = Vec3::new(0.0, 2.0, win_position + LIGHT_WIN_MARGIN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_fits_capacity() {
        let scene = Scene::default();
        assert!(scene.lights.len() <= MAX_LIGHTS);
        assert!(scene.materials.len() <= MAX_MATERIALS);
        assert_eq!(scene.materials.len() as u32, material_slot::OBSTACLE_BASE + 2);
    }

    #[test]
    fn test_lights_clamped_at_win_plane() {
        let mut scene = Scene::default();
        let player = Player {
            pos: Vec3::new(2.0, 0.0, -480.0),
            ..Default::default()
        };
        let projectile = Projectile::new(1.0);
        scene.track(&player, &projectile, -500.0);

        assert_eq!(scene.lights[light_slot::PLAYER].pos, Vec3::new(1.6, 4.0, -480.0));
        assert_eq!(scene.lights[light_slot::FORWARD].pos.z, -495.0);
        assert_eq!(scene.lights[light_slot::SECONDARY_FORWARD].pos.z, -495.0);
        assert_eq!(scene.lights[light_slot::PROJECTILE].intensity, 0.0);
        assert_eq!(scene.lights[light_slot::WIN].pos, Vec3::new(0.0, 2.0, -495.0));
    }

    #[test]
    fn test_projectile_light_uses_wall_colour() {
        let mut scene = Scene::default();
        scene.update_wall_hue(12_000.0);
        let player = Player::default();
        let mut projectile = Projectile::new(1.0);
        projectile.fire(&player);
        scene.track(&player, &projectile, -500.0);

        let light = &scene.lights[light_slot::PROJECTILE];
        assert_eq!(light.intensity, 2.0);
        assert_eq!(light.colour, scene.materials[material_slot::WALL as usize].diffuse);
        assert_ne!(light.colour, WALL_BASE_COLOUR);
    }
}
