//! Renderer without a GPU
//!
//! Keeps a copy of the last pushed state and answers collision queries from
//! a scripted queue or a caller-supplied rule. Used by the native runner and
//! by tests that need deterministic collision outcomes.

use std::collections::VecDeque;

use glam::Vec3;

use super::{FrameUniforms, Renderer};
use crate::consts::NO_HIT;
use crate::error::{GameError, Result};

/// Snapshot of the entity state last pushed to the renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushedState {
    pub player_pos: Vec3,
    pub player_rotation: f32,
    pub projectile: Option<Vec3>,
    /// (position, exists) per active obstacle
    pub obstacles: Vec<(Vec3, bool)>,
    pub win_position: f32,
}

type CollisionRule = Box<dyn FnMut(&PushedState) -> [u8; 2]>;

pub struct HeadlessRenderer {
    ready: bool,
    last: PushedState,
    scripted: VecDeque<[u8; 2]>,
    rule: Option<CollisionRule>,
    pub pushes: usize,
    /// Pushes that carried a changed obstacle list
    pub obstacle_uploads: usize,
    pub collision_draws: usize,
    pub visible_draws: usize,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessRenderer {
    /// A renderer that never reports collisions
    pub fn new() -> Self {
        Self {
            ready: true,
            last: PushedState::default(),
            scripted: VecDeque::new(),
            rule: None,
            pushes: 0,
            obstacle_uploads: 0,
            collision_draws: 0,
            visible_draws: 0,
        }
    }

    /// Answer the next queries from `readbacks`, in order, then report no hits
    pub fn with_readbacks(readbacks: impl IntoIterator<Item = [u8; 2]>) -> Self {
        let mut renderer = Self::new();
        renderer.scripted = readbacks.into_iter().collect();
        renderer
    }

    /// Answer queries by evaluating `rule` against the last pushed state
    pub fn with_rule(rule: impl FnMut(&PushedState) -> [u8; 2] + 'static) -> Self {
        let mut renderer = Self::new();
        renderer.rule = Some(Box::new(rule));
        renderer
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn last_pushed(&self) -> &PushedState {
        &self.last
    }
}

impl Renderer for HeadlessRenderer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn push_entity_uniforms(&mut self, frame: &FrameUniforms<'_>) {
        self.pushes += 1;
        self.last.player_pos = frame.player.pos;
        self.last.player_rotation = frame.player.rotation;
        self.last.projectile = frame.projectile.exists.then_some(frame.projectile.pos);
        self.last.win_position = frame.win_position;
        // Unchanged obstacle lists keep the previous upload, as on the GPU
        if frame.obstacles_changed {
            self.obstacle_uploads += 1;
            self.last.obstacles = frame.obstacles.iter().map(|o| (o.pos, o.exists)).collect();
        }
    }

    fn draw_frame(&mut self, collision_pass: bool) -> Result<()> {
        if !self.ready {
            return Err(GameError::RendererUnavailable);
        }
        if collision_pass {
            self.collision_draws += 1;
        } else {
            self.visible_draws += 1;
        }
        Ok(())
    }

    fn query_collision_pixel(&mut self) -> Result<[u8; 2]> {
        if !self.ready {
            return Err(GameError::RendererUnavailable);
        }
        if let Some(readback) = self.scripted.pop_front() {
            return Ok(readback);
        }
        Ok(match self.rule.as_mut() {
            Some(rule) => rule(&self.last),
            None => [NO_HIT, NO_HIT],
        })
    }
}
