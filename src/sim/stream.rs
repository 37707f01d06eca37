//! Active obstacle window
//!
//! Holds the obstacles the renderer and the collision pass currently see.
//! Fixed levels load everything at once. Streaming levels walk a single
//! forward cursor over the depth-sorted template, appending ahead of the
//! camera and evicting from the front once obstacles fall behind it.
//!
//! Indices into `active` only shift on prefix eviction, which runs between
//! collision queries, never while a readback is being resolved.

use super::level::{Level, StreamConfig};
use super::state::Obstacle;

#[derive(Debug, Clone, Default)]
pub struct ObstacleWindow {
    active: Vec<Obstacle>,
    /// Next template index to load
    cursor: usize,
    capacity: usize,
    stream: Option<StreamConfig>,
}

impl ObstacleWindow {
    /// Build the window for a fresh run of `level`
    pub fn for_level(level: &Level, camera_z: f32) -> Self {
        let capacity = level.effective_cap();
        match level.streaming {
            Some(stream) => {
                let mut window = Self {
                    active: Vec::with_capacity(capacity),
                    cursor: 0,
                    capacity,
                    stream: Some(stream),
                };
                window.advance(&level.obstacles, camera_z);
                window
            }
            None => {
                let active = level.instantiate_obstacles();
                Self {
                    cursor: level.obstacles.len(),
                    active,
                    capacity,
                    stream: None,
                }
            }
        }
    }

    /// Load obstacles that came into range and drop those left behind.
    ///
    /// Returns whether the active list changed. The template must be sorted
    /// by non-increasing z; obstacles out of order are skipped.
    pub fn advance(&mut self, template: &[Obstacle], camera_z: f32) -> bool {
        let Some(stream) = self.stream else {
            return false;
        };

        // Behind the camera means larger z
        let evict_z = camera_z + stream.evict_behind;
        let evicted = self
            .active
            .iter()
            .take_while(|o| o.pos.z > evict_z)
            .count();
        if evicted > 0 {
            self.active.drain(..evicted);
        }

        let load_z = camera_z - stream.look_ahead;
        let mut loaded = 0;
        while let Some(next) = template.get(self.cursor) {
            if next.pos.z < load_z || self.active.len() >= self.capacity {
                break;
            }
            self.active.push(next.instantiate());
            self.cursor += 1;
            loaded += 1;
        }

        if evicted > 0 || loaded > 0 {
            log::debug!(
                "Obstacle window: -{} +{} (active {}, cursor {})",
                evicted,
                loaded,
                self.active.len(),
                self.cursor
            );
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> &[Obstacle] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [Obstacle] {
        &mut self.active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ObstacleShape;
    use glam::Vec3;

    fn obstacle(z: f32) -> Obstacle {
        Obstacle::new(Vec3::new(0.0, 0.0, z), 0.0, ObstacleShape::Block, 6, true, false)
    }

    fn streaming_level(zs: &[f32], cap: usize) -> Level {
        let mut level = Level::new("Stream", zs.iter().copied().map(obstacle).collect(), -1000.0)
            .with_streaming(StreamConfig {
                look_ahead: 100.0,
                evict_behind: 5.0,
            });
        level.obstacle_cap = cap;
        level
    }

    #[test]
    fn test_fixed_level_loads_everything() {
        let level = Level::new("Fixed", vec![obstacle(-10.0), obstacle(-500.0)], -600.0);
        let mut window = ObstacleWindow::for_level(&level, 20.0);
        assert_eq!(window.active().len(), 2);
        assert!(!window.is_streaming());
        assert!(!window.advance(&level.obstacles, -1000.0));
        assert_eq!(window.active().len(), 2);
    }

    #[test]
    fn test_streaming_loads_within_look_ahead() {
        let level = streaming_level(&[-50.0, -90.0, -150.0, -300.0], 8);
        let window = ObstacleWindow::for_level(&level, 20.0);
        // Loaded down to z = 20 - 100 = -80
        assert_eq!(window.active().len(), 1);
        assert_eq!(window.cursor(), 1);
    }

    #[test]
    fn test_streaming_appends_and_evicts_prefix() {
        let level = streaming_level(&[-50.0, -90.0, -150.0, -300.0], 8);
        let mut window = ObstacleWindow::for_level(&level, 20.0);

        assert!(window.advance(&level.obstacles, -50.0));
        let zs: Vec<f32> = window.active().iter().map(|o| o.pos.z).collect();
        assert_eq!(zs, vec![-50.0, -90.0, -150.0]);

        // Everything up to -150 is now more than 5 units behind the camera
        assert!(window.advance(&level.obstacles, -200.0));
        let zs: Vec<f32> = window.active().iter().map(|o| o.pos.z).collect();
        assert_eq!(zs, vec![-300.0]);

        // Nothing left to load or evict
        assert!(!window.advance(&level.obstacles, -200.0));
    }

    #[test]
    fn test_streaming_respects_capacity() {
        let level = streaming_level(&[-10.0, -20.0, -30.0, -40.0], 2);
        let mut window = ObstacleWindow::for_level(&level, 0.0);
        assert_eq!(window.active().len(), 2);
        assert_eq!(window.cursor(), 2);

        // Room frees up once the first two fall behind
        assert!(window.advance(&level.obstacles, -50.0));
        let zs: Vec<f32> = window.active().iter().map(|o| o.pos.z).collect();
        assert_eq!(zs, vec![-30.0, -40.0]);
    }

    #[test]
    fn test_tombstones_survive_streaming() {
        let level = streaming_level(&[-10.0, -20.0, -30.0], 8);
        let mut window = ObstacleWindow::for_level(&level, 0.0);
        window.active_mut()[1].tombstone();
        window.advance(&level.obstacles, -1.0);
        assert!(window.active()[0].exists);
        assert!(!window.active()[1].exists);
        // Template is untouched
        assert!(level.obstacles.iter().all(|o| o.exists));
    }
}
