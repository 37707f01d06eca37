//! Presentation state derived from the session
//!
//! The DOM layer applies a [`UiState`] every frame; nothing here touches the
//! DOM so the mapping from game phase to visible menus can be tested natively.

use crate::sim::{CountdownDisplay, GamePhase, GameSession, ViewOffset};

/// Which overlay is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    None,
    LevelSelect,
    Paused,
    /// End-of-run menu (replay / back to levels)
    RunOver { won: bool },
}

impl Menu {
    pub fn for_phase(phase: GamePhase) -> Self {
        match phase {
            GamePhase::LevelSelect => Menu::LevelSelect,
            GamePhase::Paused => Menu::Paused,
            GamePhase::Lost => Menu::RunOver { won: false },
            GamePhase::Won => Menu::RunOver { won: true },
            GamePhase::Countdown | GamePhase::Playing => Menu::None,
        }
    }

    /// Element id of the overlay, if any
    pub fn element_id(&self) -> Option<&'static str> {
        match self {
            Menu::None => None,
            Menu::LevelSelect => Some("level-menu"),
            Menu::Paused => Some("pause-menu"),
            Menu::RunOver { .. } => Some("end-menu"),
        }
    }

    pub fn title(&self) -> Option<&'static str> {
        match self {
            Menu::RunOver { won: true } => Some("Level complete!"),
            Menu::RunOver { won: false } => Some("Crashed!"),
            _ => None,
        }
    }
}

/// All overlay element ids, for hiding the ones not shown
pub const MENU_IDS: [&str; 3] = ["level-menu", "pause-menu", "end-menu"];

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub menu: Menu,
    /// Countdown overlay text; None hides it
    pub countdown_text: Option<String>,
    pub countdown_opacity: f32,
    /// Fps label; None when disabled in settings
    pub fps_text: Option<String>,
    /// CSS transform for the canvas container
    pub view_transform: String,
}

impl UiState {
    pub fn from_session(session: &GameSession, fps: u32) -> Self {
        let (countdown_text, countdown_opacity) = match session.countdown() {
            CountdownDisplay::Hidden => (None, 0.0),
            CountdownDisplay::Seconds(s) => (Some(s.to_string()), 1.0),
            CountdownDisplay::Go { opacity } => (Some("GO".to_string()), opacity.clamp(0.0, 1.0)),
        };

        Self {
            menu: Menu::for_phase(session.phase()),
            countdown_text,
            countdown_opacity,
            fps_text: session.settings().show_fps.then(|| format!("{} fps", fps)),
            view_transform: css_transform(session.view_offset()),
        }
    }
}

pub fn css_transform(offset: ViewOffset) -> String {
    if offset == ViewOffset::ZERO {
        return String::new();
    }
    format!(
        "translate({}px, {}px) rotate({}deg)",
        offset.x, offset.y, offset.rotation_deg
    )
}

/// Frame-rate estimate over the last 60 frames
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_times: [f64; 60],
    frame_index: usize,
    fps: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self {
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
        }
    }
}

impl FpsCounter {
    /// Record a frame timestamp (ms) and return the current estimate
    pub fn record(&mut self, time: f64) -> u32 {
        self.frame_times[self.frame_index] = time;
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();

        // Oldest sample is the one about to be overwritten
        let oldest_time = self.frame_times[self.frame_index];
        if oldest_time > 0.0 {
            let elapsed = time - oldest_time;
            if elapsed > 0.0 {
                self.fps = (1000.0 * (self.frame_times.len() - 1) as f64 / elapsed).round() as u32;
            }
        }
        self.fps
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HeadlessRenderer;
    use crate::settings::Settings;
    use crate::sim::LevelCatalog;
    use crate::tuning::Tuning;

    #[test]
    fn test_menu_per_phase() {
        assert_eq!(Menu::for_phase(GamePhase::LevelSelect).element_id(), Some("level-menu"));
        assert_eq!(Menu::for_phase(GamePhase::Playing), Menu::None);
        assert_eq!(Menu::for_phase(GamePhase::Countdown).element_id(), None);
        assert_eq!(Menu::for_phase(GamePhase::Won).title(), Some("Level complete!"));
        assert_eq!(Menu::for_phase(GamePhase::Lost).element_id(), Some("end-menu"));
    }

    #[test]
    fn test_ui_follows_session() {
        let mut session = GameSession::new(LevelCatalog::builtin(), Settings::default(), Tuning::default(), 1);
        let mut renderer = HeadlessRenderer::new();

        let ui = UiState::from_session(&session, 60);
        assert_eq!(ui.menu, Menu::LevelSelect);
        assert_eq!(ui.countdown_text, None);
        assert_eq!(ui.fps_text.as_deref(), Some("60 fps"));
        assert!(ui.view_transform.is_empty());

        session.select_level(0, 0.0).expect("level 0");
        session.frame(10.0, &mut renderer);
        let ui = UiState::from_session(&session, 60);
        assert_eq!(ui.menu, Menu::None);
        assert_eq!(ui.countdown_text.as_deref(), Some("3"));

        session.frame(3500.0, &mut renderer);
        let ui = UiState::from_session(&session, 60);
        assert_eq!(ui.countdown_text.as_deref(), Some("GO"));
        assert!((ui.countdown_opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fps_hidden_when_disabled() {
        let settings = Settings {
            show_fps: false,
            ..Default::default()
        };
        let session = GameSession::new(LevelCatalog::builtin(), settings, Tuning::default(), 1);
        assert_eq!(UiState::from_session(&session, 60).fps_text, None);
    }

    #[test]
    fn test_css_transform() {
        let offset = ViewOffset {
            x: 3.0,
            y: -1.0,
            rotation_deg: 0.5,
        };
        assert_eq!(css_transform(offset), "translate(3px, -1px) rotate(0.5deg)");
    }

    #[test]
    fn test_fps_counter() {
        let mut counter = FpsCounter::default();
        let mut fps = 0;
        for i in 1..=120 {
            fps = counter.record(i as f64 * 1000.0 / 60.0);
        }
        assert_eq!(fps, 60);
        assert_eq!(counter.fps(), 60);
    }
}
