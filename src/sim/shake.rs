//! View shake on run end and rumble near the win plane
//!
//! Offsets are applied to the canvas container by the UI. They use a seeded
//! PCG stream so a session replays identically for a given seed.

use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::*;

/// Translation (pixels) and rotation (degrees) applied to the view
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewOffset {
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
}

impl ViewOffset {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        rotation_deg: 0.0,
    };

    /// Random offset scaled by `magnitude`, with the given per-axis gains
    fn random(rng: &mut Pcg32, magnitude: f32, gains: (f32, f32, f32)) -> Self {
        Self {
            x: random_step(rng, -magnitude * gains.0, magnitude * gains.0),
            y: random_step(rng, -magnitude * gains.1, magnitude * gains.1),
            rotation_deg: random_step(rng, -magnitude * gains.2, magnitude * gains.2),
        }
    }
}

/// `min` plus a whole number of steps in `0..=(max - min)`
fn random_step(rng: &mut Pcg32, min: f32, max: f32) -> f32 {
    min + (rng.random::<f32>() * (max - min + 1.0)).floor()
}

/// Decaying shake started when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewShake {
    frames_left: u32,
    magnitude: f32,
}

impl ViewShake {
    pub fn start() -> Self {
        Self {
            frames_left: SHAKE_FRAMES,
            magnitude: SHAKE_MAGNITUDE,
        }
    }

    pub fn is_active(&self) -> bool {
        self.frames_left > 0
    }

    /// Offset for the next frame, or None once the shake has finished
    pub fn next(&mut self, rng: &mut Pcg32) -> Option<ViewOffset> {
        if self.frames_left == 0 {
            return None;
        }
        self.magnitude += SHAKE_MAGNITUDE_DELTA;
        self.frames_left -= 1;
        Some(ViewOffset::random(rng, self.magnitude, (1.0, 0.5, 0.1)))
    }
}

/// Rumble while approaching the win plane, stronger the closer the player is
pub fn win_rumble(rng: &mut Pcg32, player_z: f32, win_position: f32) -> Option<ViewOffset> {
    let remaining = player_z - win_position;
    if remaining <= 0.0 || remaining > WIN_RUMBLE_DISTANCE {
        return None;
    }
    let magnitude = (WIN_RUMBLE_DISTANCE - remaining) * WIN_RUMBLE_GAIN;
    Some(ViewOffset::random(rng, magnitude, (0.4, 0.1, 0.03)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_shake_runs_fixed_frames_and_decays() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut shake = ViewShake::start();
        let mut frames = 0;
        while let Some(offset) = shake.next(&mut rng) {
            frames += 1;
            // Magnitude after this frame's decay
            let m = SHAKE_MAGNITUDE + SHAKE_MAGNITUDE_DELTA * frames as f32;
            assert!(offset.x >= -m && offset.x <= m);
            assert_eq!(offset.x.fract(), 0.0);
        }
        assert_eq!(frames, SHAKE_FRAMES);
        assert!(!shake.is_active());
        assert_eq!(shake.next(&mut rng), None);
    }

    #[test]
    fn test_shake_is_deterministic_per_seed() {
        let run = |seed| {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut shake = ViewShake::start();
            std::iter::from_fn(|| shake.next(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_win_rumble_range() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(win_rumble(&mut rng, -400.0, -500.0).is_none());
        assert!(win_rumble(&mut rng, -501.0, -500.0).is_none());
        let offset = win_rumble(&mut rng, -499.0, -500.0).expect("in range");
        // Magnitude 29.4, x gain 0.4
        assert!(offset.x.abs() <= 29.4 * 0.4 + 1.0);
    }
}
