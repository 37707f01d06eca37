//! Game lifecycle
//!
//! [`GameSession`] owns everything that lives longer than a single frame:
//! the level catalog, configuration, the current run and its timestamps.
//! The platform layer feeds it input events and animation-frame timestamps
//! (milliseconds, `performance.now()` style) and reads back phase, countdown
//! and view offset for presentation.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::level::LevelCatalog;
use super::physics::{self, FrameOutcome, SteerInput, StepParams};
use super::shake::{ViewOffset, ViewShake, win_rumble};
use super::state::GamePhase;
use super::world::World;
use crate::consts::GO_DISPLAY_MS;
use crate::error::{GameError, Result};
use crate::renderer::Renderer;
use crate::settings::Settings;
use crate::tuning::Tuning;

/// Discrete input delivered by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    SteerLeftDown,
    SteerLeftUp,
    SteerRightDown,
    SteerRightUp,
    Fire,
    PauseRequested,
    VisibilityLost,
}

/// Notifications for the presentation layer, drained once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    ProjectileFired,
    ShakeStarted,
}

/// What the countdown overlay should show
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CountdownDisplay {
    #[default]
    Hidden,
    Seconds(u32),
    /// "GO" fading out over the first second of play
    Go { opacity: f32 },
}

pub struct GameSession {
    catalog: LevelCatalog,
    settings: Settings,
    tuning: Tuning,
    phase: GamePhase,
    level_id: Option<usize>,
    world: Option<World>,
    steer: SteerInput,
    /// Run start; sim time is `now - start_time`, negative during countdown
    start_time: f64,
    last_frame_time: f64,
    pause_time: Option<f64>,
    preview_rendered: bool,
    shake: ViewShake,
    rng: Pcg32,
    view_offset: ViewOffset,
    countdown: CountdownDisplay,
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Settings are sanitized and invalid tuning is replaced by the defaults,
    /// so the frame loop only ever sees values it can integrate.
    pub fn new(catalog: LevelCatalog, mut settings: Settings, tuning: Tuning, seed: u64) -> Self {
        settings.sanitize();
        let tuning = match tuning.validate() {
            Ok(()) => tuning,
            Err(e) => {
                log::warn!("{}, using default tuning", e);
                Tuning::default()
            }
        };
        Self {
            catalog,
            settings,
            tuning,
            phase: GamePhase::LevelSelect,
            level_id: None,
            world: None,
            steer: SteerInput::default(),
            start_time: 0.0,
            last_frame_time: 0.0,
            pause_time: None,
            preview_rendered: false,
            shake: ViewShake::default(),
            rng: Pcg32::seed_from_u64(seed),
            view_offset: ViewOffset::ZERO,
            countdown: CountdownDisplay::Hidden,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level_id(&self) -> Option<usize> {
        self.level_id
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn countdown(&self) -> CountdownDisplay {
        self.countdown
    }

    pub fn view_offset(&self) -> ViewOffset {
        self.view_offset
    }

    /// Milliseconds since the run started (negative during the countdown)
    pub fn sim_time(&self, now: f64) -> f64 {
        now - self.start_time
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase == phase {
            return;
        }
        log::info!("Phase {:?} -> {:?}", self.phase, phase);
        self.events.push(GameEvent::PhaseChanged {
            from: self.phase,
            to: phase,
        });
        self.phase = phase;
    }

    /// Start a level from the menu. Ignored while a run is in progress.
    pub fn select_level(&mut self, id: usize, now: f64) -> Result<()> {
        if self.phase.in_run() {
            log::warn!("Ignoring level {} selection during {:?}", id, self.phase);
            return Ok(());
        }
        self.start_level(id, now)
    }

    /// Restart the current level
    pub fn replay(&mut self, now: f64) -> Result<()> {
        let id = self.level_id.ok_or(GameError::UnknownLevel(0))?;
        self.start_level(id, now)
    }

    fn start_level(&mut self, id: usize, now: f64) -> Result<()> {
        let level = self.catalog.get(id)?;
        log::info!("Starting level {} '{}'", id, level.title);

        self.world = Some(World::for_level(level, &self.tuning));
        self.level_id = Some(id);
        self.steer = SteerInput::default();
        self.start_time = now + self.tuning.countdown_ms;
        self.last_frame_time = now;
        self.pause_time = None;
        self.preview_rendered = false;
        self.shake = ViewShake::default();
        self.view_offset = ViewOffset::ZERO;
        self.countdown = self.countdown_seconds(self.sim_time(now));
        self.set_phase(GamePhase::Countdown);
        Ok(())
    }

    fn countdown_seconds(&self, sim_time: f64) -> CountdownDisplay {
        let shown = -(sim_time / 1000.0).floor();
        let cap = (self.tuning.countdown_ms / 1000.0).floor();
        CountdownDisplay::Seconds(shown.min(cap).max(0.0) as u32)
    }

    /// Halt the run. Repeated pauses keep the first pause timestamp.
    pub fn pause(&mut self, now: f64) -> bool {
        if !matches!(self.phase, GamePhase::Countdown | GamePhase::Playing) {
            return false;
        }
        self.pause_time.get_or_insert(now);
        self.set_phase(GamePhase::Paused);
        true
    }

    /// Continue a paused run, shifting timestamps so the pause doesn't count
    /// as sim time. Refused while the renderer is unavailable.
    pub fn resume(&mut self, now: f64, renderer_ready: bool) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        if !renderer_ready {
            log::warn!("Renderer not ready, staying paused");
            return false;
        }

        let paused_for = now - self.pause_time.take().unwrap_or(now);
        self.start_time += paused_for;
        self.last_frame_time += paused_for;

        if self.sim_time(now) < 0.0 {
            // Context may have been restored; draw the preview again
            self.preview_rendered = false;
            self.set_phase(GamePhase::Countdown);
        } else {
            self.set_phase(GamePhase::Playing);
        }
        true
    }

    pub fn return_to_menu(&mut self) {
        self.world = None;
        self.steer = SteerInput::default();
        self.pause_time = None;
        self.shake = ViewShake::default();
        self.view_offset = ViewOffset::ZERO;
        self.countdown = CountdownDisplay::Hidden;
        self.set_phase(GamePhase::LevelSelect);
    }

    pub fn handle_input(&mut self, event: InputEvent, now: f64) {
        match event {
            InputEvent::SteerLeftDown => self.steer.left = true,
            InputEvent::SteerLeftUp => self.steer.left = false,
            InputEvent::SteerRightDown => self.steer.right = true,
            InputEvent::SteerRightUp => self.steer.right = false,
            InputEvent::Fire => {
                if self.phase != GamePhase::Playing {
                    return;
                }
                if let Some(world) = self.world.as_mut()
                    && world.projectile.fire(&world.player)
                {
                    self.events.push(GameEvent::ProjectileFired);
                }
            }
            InputEvent::PauseRequested | InputEvent::VisibilityLost => {
                self.pause(now);
            }
        }
    }

    /// Run one animation frame. Returns whether another frame should be
    /// scheduled.
    pub fn frame<R: Renderer>(&mut self, now: f64, renderer: &mut R) -> bool {
        match self.phase {
            GamePhase::LevelSelect | GamePhase::Paused => return false,
            GamePhase::Lost | GamePhase::Won => return self.advance_shake(),
            GamePhase::Countdown | GamePhase::Playing => {}
        }

        if !renderer.is_ready() {
            log::warn!("Renderer unavailable, pausing");
            self.pause(now);
            return false;
        }

        let sim_time = self.sim_time(now);
        if self.phase == GamePhase::Countdown {
            if sim_time < 0.0 {
                return self.countdown_frame(now, sim_time, renderer);
            }
            self.set_phase(GamePhase::Playing);
        }

        self.countdown = if sim_time < GO_DISPLAY_MS {
            CountdownDisplay::Go {
                opacity: (1.0 - sim_time / GO_DISPLAY_MS) as f32,
            }
        } else {
            CountdownDisplay::Hidden
        };

        self.play_frame(now, sim_time, renderer)
    }

    fn countdown_frame<R: Renderer>(&mut self, now: f64, sim_time: f64, renderer: &mut R) -> bool {
        self.countdown = self.countdown_seconds(sim_time);
        self.last_frame_time = now;

        if !self.preview_rendered {
            let Some(world) = self.world.as_mut() else {
                return false;
            };
            if let Err(e) = world.draw(renderer, 0.0) {
                return self.renderer_lost(now, e);
            }
            self.preview_rendered = true;
        }
        true
    }

    fn play_frame<R: Renderer>(&mut self, now: f64, sim_time: f64, renderer: &mut R) -> bool {
        let dt = (now - self.last_frame_time)
            .min(self.settings.max_frame_delta_ms)
            .max(0.0);
        self.last_frame_time = now;

        let Some(level) = self.level_id.and_then(|id| self.catalog.levels.get(id)) else {
            return false;
        };
        let Some(world) = self.world.as_mut() else {
            return false;
        };

        let sim_time_secs = (sim_time / 1000.0) as f32;
        physics::ramp_speed(world, &self.tuning, dt as f32);
        world.scene.update_wall_hue(sim_time);

        let params = StepParams {
            tuning: &self.tuning,
            substeps: self.settings.physics_substeps,
            dt: dt as f32,
            sim_time_secs,
        };
        let outcome = physics::step_frame(world, &level.obstacles, self.steer, params, renderer);

        let lost = match outcome {
            FrameOutcome::Completed => None,
            FrameOutcome::Lost { obstacle } => Some(obstacle),
            FrameOutcome::RendererLost(e) => return self.renderer_lost(now, e),
        };
        if let Err(e) = world.draw(renderer, sim_time_secs) {
            return self.renderer_lost(now, e);
        }

        let player_z = world.player.pos.z;
        let win_position = world.win_position;

        if let Some(obstacle) = lost {
            log::info!("Hit obstacle {} at z={:.1}", obstacle, player_z);
            return self.end_run(GamePhase::Lost);
        }
        if player_z <= win_position {
            return self.end_run(GamePhase::Won);
        }

        self.view_offset = if self.settings.effective_screen_shake() {
            win_rumble(&mut self.rng, player_z, win_position).unwrap_or(ViewOffset::ZERO)
        } else {
            ViewOffset::ZERO
        };
        true
    }

    fn end_run(&mut self, phase: GamePhase) -> bool {
        self.set_phase(phase);
        self.steer = SteerInput::default();
        self.countdown = CountdownDisplay::Hidden;
        if self.settings.effective_screen_shake() {
            self.shake = ViewShake::start();
            self.events.push(GameEvent::ShakeStarted);
            true
        } else {
            self.view_offset = ViewOffset::ZERO;
            false
        }
    }

    fn advance_shake(&mut self) -> bool {
        match self.shake.next(&mut self.rng) {
            Some(offset) => {
                self.view_offset = offset;
                true
            }
            None => {
                self.view_offset = ViewOffset::ZERO;
                false
            }
        }
    }

    fn renderer_lost(&mut self, now: f64, err: GameError) -> bool {
        log::warn!("Renderer error: {}, pausing", err);
        self.pause(now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{NO_HIT, SHAKE_FRAMES};
    use crate::renderer::HeadlessRenderer;
    use crate::sim::level::Level;
    use crate::sim::state::{Obstacle, ObstacleShape};
    use glam::Vec3;

    fn session_with(levels: Vec<Level>) -> GameSession {
        GameSession::new(LevelCatalog { levels }, Settings::default(), Tuning::default(), 7)
    }

    fn straight() -> Level {
        Level::new("Straight", vec![], -500.0)
    }

    /// Run frames every `step` ms from `now` until `done` or `limit` frames
    fn run_until(
        session: &mut GameSession,
        renderer: &mut HeadlessRenderer,
        mut now: f64,
        step: f64,
        limit: usize,
        done: impl Fn(&GameSession) -> bool,
    ) -> f64 {
        for _ in 0..limit {
            if done(session) {
                break;
            }
            now += step;
            session.frame(now, renderer);
        }
        now
    }

    #[test]
    fn test_select_level_starts_countdown() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 1000.0).expect("level 0");

        assert_eq!(session.phase(), GamePhase::Countdown);
        assert_eq!(session.sim_time(1000.0), -3000.0);
        assert_eq!(session.countdown(), CountdownDisplay::Seconds(3));

        assert!(session.frame(1016.0, &mut renderer));
        assert!(session.frame(2500.0, &mut renderer));
        // Preview drawn once, no physics during the countdown
        assert_eq!(renderer.visible_draws, 1);
        assert_eq!(renderer.collision_draws, 0);
        assert_eq!(session.countdown(), CountdownDisplay::Seconds(2));
        assert_eq!(session.world().map(|w| w.player.pos.z), Some(0.0));

        session.frame(3999.0, &mut renderer);
        assert_eq!(session.countdown(), CountdownDisplay::Seconds(1));
    }

    #[test]
    fn test_countdown_hands_over_to_play() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(2990.0, &mut renderer);
        session.frame(3250.0, &mut renderer);

        assert_eq!(session.phase(), GamePhase::Playing);
        match session.countdown() {
            CountdownDisplay::Go { opacity } => assert!((opacity - 0.75).abs() < 1e-6),
            other => panic!("expected GO, got {:?}", other),
        }
        // Only the 260 ms since the last countdown frame were simulated
        let z = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        assert!(z < 0.0 && z > -260.0 * 0.02 * 1.01);

        session.frame(4100.0, &mut renderer);
        assert_eq!(session.countdown(), CountdownDisplay::Hidden);
    }

    #[test]
    fn test_unknown_level() {
        let mut session = session_with(vec![straight()]);
        assert!(matches!(session.select_level(3, 0.0), Err(GameError::UnknownLevel(3))));
        assert_eq!(session.phase(), GamePhase::LevelSelect);
    }

    #[test]
    fn test_select_level_ignored_mid_run() {
        let mut session = session_with(vec![straight(), Level::new("Other", vec![], -100.0)]);
        session.select_level(0, 0.0).expect("level 0");
        session.select_level(1, 10.0).expect("ignored");
        assert_eq!(session.level_id(), Some(0));
    }

    #[test]
    fn test_pause_resume_preserves_sim_time() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(3000.0, &mut renderer);
        session.frame(3500.0, &mut renderer);
        let before = session.sim_time(3500.0);

        assert!(session.pause(3500.0));
        // Second pause request doesn't move the pause timestamp
        session.handle_input(InputEvent::VisibilityLost, 6000.0);
        assert!(!session.frame(7000.0, &mut renderer));
        assert!(session.resume(13500.0, true));

        assert_eq!(session.phase(), GamePhase::Playing);
        assert_eq!(session.sim_time(13500.0), before);

        // First frame after resume sees only the time since resuming
        let z = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        session.frame(13516.0, &mut renderer);
        let moved = z - session.world().map(|w| w.player.pos.z).unwrap_or_default();
        assert!(moved > 0.0 && moved < 16.0 * 0.02 * 1.01);
    }

    #[test]
    fn test_resume_into_countdown() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(500.0, &mut renderer);
        session.handle_input(InputEvent::PauseRequested, 1000.0);
        assert_eq!(session.phase(), GamePhase::Paused);

        assert!(session.resume(5000.0, true));
        assert_eq!(session.phase(), GamePhase::Countdown);
        assert_eq!(session.sim_time(5000.0), -2000.0);
        session.frame(5016.0, &mut renderer);
        assert_eq!(renderer.visible_draws, 2);
    }

    #[test]
    fn test_win_straight_level() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");

        let now = run_until(&mut session, &mut renderer, 0.0, 50.0, 2000, |s| {
            s.phase() == GamePhase::Won
        });
        assert_eq!(session.phase(), GamePhase::Won);
        assert!(session.world().map(|w| w.player.pos.z).unwrap_or_default() <= -500.0);
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::ShakeStarted));
        assert!(events.contains(&GameEvent::PhaseChanged {
            from: GamePhase::Playing,
            to: GamePhase::Won
        }));

        // Shake runs out, then the loop stops
        let draws = renderer.collision_draws;
        let mut frames = 0;
        let mut t = now;
        while session.frame(t, &mut renderer) {
            frames += 1;
            t += 16.0;
        }
        assert_eq!(frames, SHAKE_FRAMES);
        assert_eq!(session.view_offset(), ViewOffset::ZERO);
        assert_eq!(renderer.collision_draws, draws);
    }

    #[test]
    fn test_collision_loses_run() {
        let wall = Obstacle::new(Vec3::new(0.0, 0.0, -30.0), 0.0, ObstacleShape::Block, 6, false, false);
        let mut session = session_with(vec![Level::new("Wall", vec![wall], -500.0)]);
        let mut renderer = HeadlessRenderer::with_rule(|state| {
            let hit = state.obstacles.iter().position(|(pos, exists)| {
                *exists && (state.player_pos.z - pos.z).abs() < 1.0
            });
            [hit.map(|i| i as u8).unwrap_or(NO_HIT), NO_HIT]
        });
        session.select_level(0, 0.0).expect("level 0");

        run_until(&mut session, &mut renderer, 0.0, 16.0, 2000, |s| s.phase() == GamePhase::Lost);
        assert_eq!(session.phase(), GamePhase::Lost);
        let z = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        assert!(z < -29.0 && z > -31.0);
    }

    #[test]
    fn test_fire_only_while_playing() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");

        session.handle_input(InputEvent::Fire, 100.0);
        assert_eq!(session.world().map(|w| w.projectile.exists), Some(false));

        session.frame(3000.0, &mut renderer);
        session.drain_events();
        session.handle_input(InputEvent::Fire, 3001.0);
        session.handle_input(InputEvent::Fire, 3002.0);
        assert_eq!(session.world().map(|w| w.projectile.exists), Some(true));
        assert_eq!(session.drain_events(), vec![GameEvent::ProjectileFired]);
    }

    #[test]
    fn test_renderer_loss_pauses_until_ready() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(3100.0, &mut renderer);

        renderer.set_ready(false);
        assert!(!session.frame(3116.0, &mut renderer));
        assert_eq!(session.phase(), GamePhase::Paused);
        assert!(!session.resume(4000.0, renderer.is_ready()));

        renderer.set_ready(true);
        assert!(session.resume(5000.0, renderer.is_ready()));
        assert_eq!(session.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(3000.0, &mut renderer);
        let before = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        session.frame(60_000.0, &mut renderer);

        let after = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        let max = session.settings().max_frame_delta_ms as f32 * 0.02 * 1.01;
        assert!(before - after <= max);
        assert!(before - after > 0.0);
    }

    #[test]
    fn test_bad_frame_delta_cap_never_reaches_the_loop() {
        let settings = Settings {
            max_frame_delta_ms: -1.0,
            ..Settings::default()
        };
        let mut session = GameSession::new(LevelCatalog { levels: vec![straight()] }, settings, Tuning::default(), 7);
        assert!(session.settings().max_frame_delta_ms > 0.0);

        // Also edited after construction
        session.settings_mut().max_frame_delta_ms = -5.0;
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(3000.0, &mut renderer);
        session.frame(3016.0, &mut renderer);
        assert_eq!(session.phase(), GamePhase::Playing);
        let z = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        assert!(z.is_finite() && z <= 0.0);
    }

    #[test]
    fn test_invalid_tuning_falls_back_to_defaults() {
        let tuning = Tuning {
            max_rotation: -0.4,
            ..Tuning::default()
        };
        let mut session = GameSession::new(LevelCatalog { levels: vec![straight()] }, Settings::default(), tuning, 7);
        assert_eq!(session.tuning(), &Tuning::default());

        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.handle_input(InputEvent::SteerLeftDown, 0.0);
        session.frame(3000.0, &mut renderer);
        session.frame(3016.0, &mut renderer);
        let world = session.world().expect("world");
        assert!(world.player.pos.x.is_finite());
        assert!(world.player.rotation > 0.0);
    }

    #[test]
    fn test_return_to_menu_and_replay() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.frame(3500.0, &mut renderer);

        session.return_to_menu();
        assert_eq!(session.phase(), GamePhase::LevelSelect);
        assert!(session.world().is_none());
        assert!(!session.frame(3600.0, &mut renderer));

        session.replay(4000.0).expect("replay");
        assert_eq!(session.phase(), GamePhase::Countdown);
        assert_eq!(session.world().map(|w| w.player.pos.z), Some(0.0));
    }

    #[test]
    fn test_held_steering_survives_countdown() {
        let mut session = session_with(vec![straight()]);
        let mut renderer = HeadlessRenderer::new();
        session.select_level(0, 0.0).expect("level 0");
        session.handle_input(InputEvent::SteerRightDown, 1000.0);
        session.frame(3000.0, &mut renderer);
        session.frame(3100.0, &mut renderer);

        let world = session.world().expect("world");
        assert!(world.player.rotation < 0.0);
        assert!(world.player.pos.x > 0.0);
    }
}
