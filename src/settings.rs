//! User settings, stored as JSON in the user config directory.
//!
//! Every field has a default and unknown fields are ignored, so settings
//! files survive upgrades in both directions.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Spell-check language tag (e.g. "en_US"); `None` lets the system
    /// spell checker pick.
    pub language: Option<String>,
    /// Maximum completions surfaced per word.
    pub max_suggestions: usize,
    /// Hosts that mishandle synthetic key events for text manipulation;
    /// they get the clipboard-paste procedure exclusively, like
    /// terminals.
    pub paste_only_apps: Vec<String>,
    /// User additions to the built-in classification sets.
    pub extra_terminal_apps: Vec<String>,
    pub extra_browser_apps: Vec<String>,
    pub extra_electron_apps: Vec<String>,
    /// Settling delay between individual synthetic keystrokes.
    pub keystroke_delay_ms: u64,
    /// Settling delay after a clipboard write before pasting.
    pub clipboard_settle_ms: u64,
    /// Settling delay after sending a paste or delete chord.
    pub paste_settle_ms: u64,
    /// How long to let the host consume a paste before the original
    /// clipboard is restored.
    pub clipboard_restore_delay_ms: u64,
    /// Entry cap for the completion cache.
    pub suggestion_cache_capacity: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: None,
            max_suggestions: 8,
            paste_only_apps: vec![
                "com.jetbrains.intellij".to_string(),
                "com.jetbrains.intellij.ce".to_string(),
                "com.jetbrains.pycharm".to_string(),
                "com.jetbrains.WebStorm".to_string(),
                "com.jetbrains.goland".to_string(),
                "com.sublimetext.4".to_string(),
            ],
            extra_terminal_apps: Vec::new(),
            extra_browser_apps: Vec::new(),
            extra_electron_apps: Vec::new(),
            keystroke_delay_ms: 1,
            clipboard_settle_ms: 30,
            paste_settle_ms: 50,
            clipboard_restore_delay_ms: 300,
            suggestion_cache_capacity: 256,
        }
    }
}

impl AppSettings {
    pub fn is_paste_only(&self, bundle_id: &str) -> bool {
        self.paste_only_apps.iter().any(|b| b == bundle_id)
    }
}

/// Path of the settings file, `None` when the platform has no config dir.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quickspell").join("settings.json"))
}

/// Load settings, falling back to defaults on a missing or malformed
/// file. A malformed file is reported but never fatal.
pub fn get_settings() -> AppSettings {
    let Some(path) = settings_path() else {
        return AppSettings::default();
    };
    load_from(&path)
}

fn load_from(path: &std::path::Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), "Settings file is malformed, using defaults: {}", err);
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    }
}

/// Persist settings, creating the parent directory if needed.
pub fn write_settings(settings: &AppSettings) -> anyhow::Result<()> {
    let path = settings_path()
        .ok_or_else(|| anyhow::anyhow!("no config directory available on this platform"))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let settings = AppSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: AppSettings =
            serde_json::from_str(r#"{"max_suggestions": 3, "language": "en_US"}"#).unwrap();
        assert_eq!(parsed.max_suggestions, 3);
        assert_eq!(parsed.language.as_deref(), Some("en_US"));
        assert_eq!(parsed.keystroke_delay_ms, AppSettings::default().keystroke_delay_ms);
        assert!(!parsed.paste_only_apps.is_empty());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        assert_eq!(load_from(&path), AppSettings::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_from(&dir.path().join("nope.json")), AppSettings::default());
    }

    #[test]
    fn paste_only_lookup_matches_exact_bundle() {
        let settings = AppSettings::default();
        assert!(settings.is_paste_only("com.sublimetext.4"));
        assert!(!settings.is_paste_only("com.apple.TextEdit"));
    }
}
