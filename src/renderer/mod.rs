//! Renderer boundary
//!
//! The simulation only talks to rendering through [`Renderer`]. The real
//! implementation ([`SdfRenderState`]) ray-marches the whole scene in a WGSL
//! fragment shader and answers collision queries by rendering a 1x1 target.
//! [`HeadlessRenderer`] stands in for it natively and in tests.

pub mod headless;
pub mod sdf_pipeline;

pub use headless::HeadlessRenderer;
pub use sdf_pipeline::SdfRenderState;

use glam::Mat3;

use crate::error::Result;
use crate::sim::scene::{DirectionalLight, Light, Material};
use crate::sim::state::{Camera, Obstacle, Player, Projectile};

/// Everything the shader needs for one draw
#[derive(Debug, Clone, Copy)]
pub struct FrameUniforms<'a> {
    pub lights: &'a [Light],
    pub directional_lights: &'a [DirectionalLight],
    pub materials: &'a [Material],
    pub obstacles: &'a [Obstacle],
    /// False when `obstacles` matches the previous push, so the upload can
    /// be skipped
    pub obstacles_changed: bool,
    pub player: &'a Player,
    pub projectile: &'a Projectile,
    pub camera: &'a Camera,
    pub view_to_world: Mat3,
    pub win_position: f32,
    pub sim_time_secs: f32,
}

/// Rendering backend as seen by the frame update engine
///
/// All calls are synchronous. `query_collision_pixel` must not return until
/// the collision pass drawn by the preceding `draw_frame(true)` has
/// completed, because the next substep depends on its result.
pub trait Renderer {
    /// False while the backend is lost (e.g. context loss)
    fn is_ready(&self) -> bool;

    /// Upload the current entity state
    fn push_entity_uniforms(&mut self, frame: &FrameUniforms<'_>);

    /// Draw either the visible frame or the 1x1 collision pass
    fn draw_frame(&mut self, collision_pass: bool) -> Result<()>;

    /// Read back `[player_hit, projectile_hit]` from the collision pass
    fn query_collision_pixel(&mut self) -> Result<[u8; 2]>;
}

/// Clamp a list to a uniform array capacity, warning when it doesn't fit
pub fn clamp_to_capacity<'a, T>(items: &'a [T], capacity: usize, what: &str) -> &'a [T] {
    if items.len() > capacity {
        log::warn!("Too many {}: {} (capacity {})", what, items.len(), capacity);
        &items[..capacity]
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_capacity() {
        let items = [1, 2, 3, 4];
        assert_eq!(clamp_to_capacity(&items, 8, "things"), &items);
        assert_eq!(clamp_to_capacity(&items, 2, "things"), &[1, 2]);
    }
}
