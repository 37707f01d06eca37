//! Fixed-substep frame update
//!
//! A rendered frame's delta is split into equal substeps. Each substep moves
//! the player, chasers and projectile, then resolves collisions through the
//! renderer before the next substep starts.

use super::collision::{self, CollisionReport};
use super::state::Obstacle;
use super::world::World;
use crate::consts::*;
use crate::error::GameError;
use crate::kinematics::mix;
use crate::renderer::Renderer;
use crate::tuning::Tuning;
use crate::wall_distance;

/// Held steering keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SteerInput {
    pub left: bool,
    pub right: bool,
}

impl SteerInput {
    /// Only one key held counts as steering
    pub fn steering_left(&self) -> bool {
        self.left && !self.right
    }

    pub fn steering_right(&self) -> bool {
        self.right && !self.left
    }
}

/// How a frame's substeps ended
#[derive(Debug)]
pub enum FrameOutcome {
    Completed,
    /// Player hit an obstacle; remaining substeps were skipped
    Lost { obstacle: usize },
    /// Renderer failed mid-frame; remaining substeps were skipped
    RendererLost(GameError),
}

/// Per-frame step parameters
#[derive(Debug, Clone, Copy)]
pub struct StepParams<'a> {
    pub tuning: &'a Tuning,
    pub substeps: u32,
    /// Frame delta (ms)
    pub dt: f32,
    pub sim_time_secs: f32,
}

/// Apply the once-per-frame forward speed ramp
pub fn ramp_speed(world: &mut World, tuning: &Tuning, dt: f32) {
    world.player.speed += dt * tuning.speed_ramp_per_ms;
}

/// Run all substeps for one frame
pub fn step_frame<R: Renderer>(
    world: &mut World,
    template: &[Obstacle],
    steer: SteerInput,
    params: StepParams<'_>,
    renderer: &mut R,
) -> FrameOutcome {
    let substeps = params.substeps.max(1);
    let dt_sub = params.dt / substeps as f32;

    for _ in 0..substeps {
        integrate(world, template, steer, params.tuning, dt_sub);

        world.push(renderer, params.sim_time_secs);
        let report = match collision::query(renderer, world.obstacles.active().len()) {
            Ok(report) => report,
            Err(e) => return FrameOutcome::RendererLost(e),
        };

        if let Some(obstacle) = resolve(world, report) {
            return FrameOutcome::Lost { obstacle };
        }
        if report.projectile_hit.is_some() {
            // Projectile and possibly obstacle existence changed
            world.push(renderer, params.sim_time_secs);
        }
    }

    FrameOutcome::Completed
}

/// Advance positions by one substep (everything except collision handling)
pub fn integrate(
    world: &mut World,
    template: &[Obstacle],
    steer: SteerInput,
    tuning: &Tuning,
    dt_sub: f32,
) {
    let max = tuning.max_rotation;
    let player = &mut world.player;

    // Roll eases toward the held direction, or back to level
    let target = if steer.steering_left() {
        max
    } else if steer.steering_right() {
        -max
    } else {
        0.0
    };
    player.rotation += (target - player.rotation) * dt_sub * tuning.rotation_speed * ROTATION_RESPONSE;
    player.rotation = player.rotation.clamp(-max, max);

    // Steering follows roll; positive roll leans left
    player.pos.x -= (player.rotation / max) * dt_sub * tuning.movement_speed * LATERAL_RESPONSE;

    // Bounce off the walls unless steering away from them
    let wall = wall_distance(player.pos.z);
    if (player.pos.x > wall && !steer.steering_left())
        || (player.pos.x < -wall && !steer.steering_right())
    {
        player.pos.x = player.pos.x.clamp(-wall, wall);
        player.rotation = -player.rotation * WALL_BOUNCE;
    }

    player.pos.z -= dt_sub * player.speed * FORWARD_RESPONSE;

    // Chasers creep toward the player
    let blend = world.chase_speed * dt_sub * CHASE_RESPONSE;
    let target_pos = player.pos;
    let mut chased = false;
    for obstacle in world.obstacles.active_mut() {
        if obstacle.chase_player && obstacle.exists && blend != 0.0 {
            obstacle.pos = mix(obstacle.pos, target_pos, blend);
            chased = true;
        }
    }

    world.camera.follow(&world.player);
    let streamed = world.obstacles.advance(template, world.camera.pos.z);
    if chased || streamed {
        world.obstacles_dirty = true;
    }

    let projectile = &mut world.projectile;
    if projectile.exists {
        projectile.pos.z -= dt_sub * projectile.speed_per_ms();

        let past_view = projectile.pos.z - world.camera.pos.z < -PROJECTILE_CULL_DISTANCE;
        let past_win = projectile.pos.z < world.win_position - PROJECTILE_WIN_OVERSHOOT;
        if past_view || past_win {
            projectile.clear();
        }
    }
}

/// Apply a collision report. Returns the obstacle index if the player lost.
pub fn resolve(world: &mut World, report: CollisionReport) -> Option<usize> {
    let destroy = report.projectile_hit;
    if destroy.is_some() {
        world.projectile.clear();
    }

    if let Some(obstacle) = report.fatal_player_hit() {
        return Some(obstacle);
    }

    if let Some(index) = destroy
        && let Some(obstacle) = world.obstacles.active_mut().get_mut(index)
        && obstacle.destroyable
        && obstacle.tombstone()
    {
        log::debug!("Obstacle {} destroyed", index);
        world.obstacles_dirty = true;
    }

    None
}
