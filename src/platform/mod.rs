//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Keyboard mapping to game input
//! - Shader asset loading (fetch on web, embedded natively)

pub mod shaders;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use shaders::{ShaderAsset, ShaderBundle, ShaderLoader};

use crate::sim::InputEvent;

/// Map a `KeyboardEvent.key` to a game input. `pressed` is false for keyup.
pub fn map_key(key: &str, pressed: bool) -> Option<InputEvent> {
    let event = match (key, pressed) {
        ("ArrowLeft" | "a" | "A", true) => InputEvent::SteerLeftDown,
        ("ArrowLeft" | "a" | "A", false) => InputEvent::SteerLeftUp,
        ("ArrowRight" | "d" | "D", true) => InputEvent::SteerRightDown,
        ("ArrowRight" | "d" | "D", false) => InputEvent::SteerRightUp,
        (" " | "ArrowUp", true) => InputEvent::Fire,
        ("Escape" | "p" | "P", true) => InputEvent::PauseRequested,
        _ => return None,
    };
    Some(event)
}

/// Keys whose default browser action (scrolling) should be suppressed
pub fn is_game_key(key: &str) -> bool {
    matches!(key, "ArrowLeft" | "ArrowRight" | "ArrowUp" | " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key("ArrowLeft", true), Some(InputEvent::SteerLeftDown));
        assert_eq!(map_key("ArrowLeft", false), Some(InputEvent::SteerLeftUp));
        assert_eq!(map_key("D", false), Some(InputEvent::SteerRightUp));
        assert_eq!(map_key(" ", true), Some(InputEvent::Fire));
        assert_eq!(map_key("Escape", true), Some(InputEvent::PauseRequested));
    }

    #[test]
    fn test_release_only_matters_for_steering() {
        assert_eq!(map_key(" ", false), None);
        assert_eq!(map_key("Escape", false), None);
        assert_eq!(map_key("q", true), None);
    }

    #[test]
    fn test_game_keys() {
        assert!(is_game_key(" "));
        assert!(!is_game_key("Escape"));
    }
}
