//! Player configuration — frame pacing and key bindings.
//!
//! Loaded from `~/.config/tty-turtle/player.json`; a missing or invalid
//! file silently falls back to the defaults so `run` always works.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Display ticks per second driving the machine.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default)]
    pub key_bindings: KeyBindings,
}

fn default_frame_rate() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    pub quit: String,
    pub replay: String,
    pub pause: String,
    pub fullscreen: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            quit: "q".into(),
            replay: "r".into(),
            pause: "Space".into(),
            fullscreen: "F11".into(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            frame_rate: default_frame_rate(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl PlayerConfig {
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: invalid player config ({e}), using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> std::path::PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = std::path::PathBuf::from(home);
        path.push(".config");
        path.push("tty-turtle");
        path.push("player.json");
        path
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        if !event.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        return rest
            .chars()
            .next()
            .is_some_and(|c| event.code == KeyCode::Char(c));
    }

    // Plain bindings must not fire while a modifier is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    match binding {
        "Space" => event.code == KeyCode::Char(' '),
        "Enter" => event.code == KeyCode::Enter,
        "Esc" => event.code == KeyCode::Esc,
        s => {
            if let Some(rest) = s.strip_prefix('F') {
                if let Ok(n) = rest.parse::<u8>() {
                    return event.code == KeyCode::F(n);
                }
            }
            s.chars()
                .next()
                .is_some_and(|c| event.code == KeyCode::Char(c))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_and_special_bindings_match() {
        assert!(matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(matches_binding("Space", &key(KeyCode::Char(' '), KeyModifiers::NONE)));
        assert!(matches_binding("F11", &key(KeyCode::F(11), KeyModifiers::NONE)));
        assert!(!matches_binding("q", &key(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn modifiers_gate_plain_bindings() {
        assert!(!matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(matches_binding("Ctrl-c", &key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn config_defaults_are_sane() {
        let config = PlayerConfig::default();
        assert!(config.frame_rate > 0);
        assert_eq!(config.key_bindings.quit, "q");
    }
}
