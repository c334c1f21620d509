//! User settings persistence.
//!
//! This module handles loading and saving user preferences: the capture
//! hotkey, recognition language hints and the delivery mode for recognized
//! text.

use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default capture hotkey, parsed by [`crate::hotkey::KeyCombo::parse`].
pub const DEFAULT_HOTKEY: &str = "ctrl+shift+2";

/// Where recognized text ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Write the text straight to the clipboard.
    Clipboard,
    /// Show the floating result window.
    Window,
}

/// User-configurable settings persisted between sessions.
///
/// Settings are stored as JSON in the user's config directory
/// (e.g., `~/.config/textshot/settings.json` on Linux).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Capture hotkey specification, e.g. `"ctrl+shift+2"`.
    pub hotkey: String,
    /// Language hints passed to the recognition engine; empty means
    /// auto-detect.
    #[serde(default)]
    pub languages: Vec<String>,
    /// How recognized text is delivered.
    pub delivery: DeliveryMode,
    /// Whether the silent first-run permission request has already been
    /// consumed. After that, a denied capture attempt gets the explanatory
    /// prompt instead.
    #[serde(default)]
    pub permission_prompted: bool,
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "textshot").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if not found.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            let json = serde_json::to_string_pretty(self)?;
            fs::write(path, json)?;
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hotkey: DEFAULT_HOTKEY.to_string(),
            languages: Vec::new(),
            delivery: DeliveryMode::Clipboard,
            permission_prompted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hotkey_parses() {
        assert!(crate::hotkey::KeyCombo::parse(DEFAULT_HOTKEY).is_ok());
    }

    #[test]
    fn settings_survive_a_json_round_trip() {
        let settings = Settings {
            hotkey: "cmd+shift+t".into(),
            languages: vec!["eng".into(), "deu".into()],
            delivery: DeliveryMode::Window,
            permission_prompted: true,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let json = r#"{"hotkey": "ctrl+1", "delivery": "clipboard"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert!(settings.languages.is_empty());
        assert!(!settings.permission_prompted);
    }
}
