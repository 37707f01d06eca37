//! Collision oracle
//!
//! The core never evaluates obstacle geometry. Each substep it asks the
//! renderer to draw a 1x1 collision pass whose red and green channels hold
//! the index of the obstacle the player and the projectile overlap, with
//! [`NO_HIT`] meaning nothing.

use crate::consts::NO_HIT;
use crate::error::Result;
use crate::renderer::Renderer;

/// Decoded collision readback for one substep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionReport {
    pub player_hit: Option<usize>,
    pub projectile_hit: Option<usize>,
}

impl CollisionReport {
    pub const NONE: Self = Self {
        player_hit: None,
        projectile_hit: None,
    };

    /// Decode `[player, projectile]` bytes. Indices outside the active list
    /// are dropped.
    pub fn decode(pixel: [u8; 2], active_len: usize) -> Self {
        let index = |byte: u8, who: &str| -> Option<usize> {
            if byte == NO_HIT {
                return None;
            }
            let i = byte as usize;
            if i >= active_len {
                log::warn!(
                    "Ignoring {} collision with obstacle {} (only {} active)",
                    who,
                    i,
                    active_len
                );
                return None;
            }
            Some(i)
        };
        Self {
            player_hit: index(pixel[0], "player"),
            projectile_hit: index(pixel[1], "projectile"),
        }
    }

    /// Player hit that should end the run. A player hit on the obstacle the
    /// projectile destroys in the same substep does not count.
    pub fn fatal_player_hit(&self) -> Option<usize> {
        match (self.player_hit, self.projectile_hit) {
            (Some(p), Some(q)) if p == q => None,
            (hit, _) => hit,
        }
    }
}

/// Run the collision pass and read back the result. Blocks until the
/// renderer has finished the pass.
pub fn query<R: Renderer>(renderer: &mut R, active_len: usize) -> Result<CollisionReport> {
    renderer.draw_frame(true)?;
    let pixel = renderer.query_collision_pixel()?;
    Ok(CollisionReport::decode(pixel, active_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessRenderer;

    #[test]
    fn test_decode_sentinel() {
        assert_eq!(CollisionReport::decode([NO_HIT, NO_HIT], 4), CollisionReport::NONE);
        let r = CollisionReport::decode([2, NO_HIT], 4);
        assert_eq!(r.player_hit, Some(2));
        assert_eq!(r.projectile_hit, None);
    }

    #[test]
    fn test_decode_out_of_range_is_ignored() {
        let r = CollisionReport::decode([7, 3], 4);
        assert_eq!(r.player_hit, None);
        assert_eq!(r.projectile_hit, Some(3));
    }

    #[test]
    fn test_same_index_is_not_fatal() {
        let r = CollisionReport::decode([1, 1], 4);
        assert_eq!(r.fatal_player_hit(), None);
        let r = CollisionReport::decode([1, 0], 4);
        assert_eq!(r.fatal_player_hit(), Some(1));
        let r = CollisionReport::decode([1, NO_HIT], 4);
        assert_eq!(r.fatal_player_hit(), Some(1));
    }

    #[test]
    fn test_query_draws_collision_pass() {
        let mut renderer = HeadlessRenderer::with_readbacks([[0, NO_HIT]]);
        let report = query(&mut renderer, 3).expect("query");
        assert_eq!(report.player_hit, Some(0));
        assert_eq!(renderer.collision_draws, 1);
        assert_eq!(renderer.visible_draws, 0);
    }

    #[test]
    fn test_query_fails_when_renderer_lost() {
        let mut renderer = HeadlessRenderer::new();
        renderer.set_ready(false);
        assert!(query(&mut renderer, 3).is_err());
    }
}
