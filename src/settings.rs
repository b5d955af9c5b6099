//! User preferences and their persistence.

use crate::error::Result;
use crate::language::{DEFAULT_LANGUAGE_CODE, is_supported};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Storage key carried over from the original web client.
pub const SETTINGS_STORAGE_KEY: &str = "hrAppPreferences";

/// User preferences. Persisted camelCase under [`SETTINGS_STORAGE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Show one-tap quick-action prompts above the input box.
    pub show_quick_actions: bool,
    /// Dark chat background.
    pub prefer_dark_background: bool,
    /// BCP-47 display language.
    pub selected_language_code: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_quick_actions: true,
            prefer_dark_background: false,
            selected_language_code: DEFAULT_LANGUAGE_CODE.to_owned(),
        }
    }
}

/// Process-wide settings instance bound to a key-value store.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    settings: Settings,
}

impl SettingsStore {
    /// Load settings from the store.
    ///
    /// Corrupt stored content is removed and replaced by defaults; an
    /// unsupported language code is coerced to the default. Never fails.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match store.get(SETTINGS_STORAGE_KEY) {
            Some(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(mut parsed) => {
                    if !is_supported(&parsed.selected_language_code) {
                        warn!(
                            "unsupported stored language {:?}, falling back to {DEFAULT_LANGUAGE_CODE}",
                            parsed.selected_language_code
                        );
                        parsed.selected_language_code = DEFAULT_LANGUAGE_CODE.to_owned();
                    }
                    parsed
                }
                Err(e) => {
                    warn!("discarding corrupt stored settings: {e}");
                    store.remove(SETTINGS_STORAGE_KEY);
                    Settings::default()
                }
            },
            None => Settings::default(),
        };
        Self { store, settings }
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current display language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.settings.selected_language_code
    }

    /// Replace the settings and persist them.
    ///
    /// The in-memory value is updated even when persisting fails.
    ///
    /// # Errors
    ///
    /// Returns the storage error from the underlying store, to be surfaced
    /// as a transient notice.
    pub fn save(&mut self, settings: Settings) -> Result<()> {
        self.settings = settings;
        let json = serde_json::to_string(&self.settings)
            .map_err(|e| crate::error::AssistantError::Storage(e.to_string()))?;
        self.store.set(SETTINGS_STORAGE_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_when_nothing_stored() {
        let store = Arc::new(MemoryStore::new());
        let settings = SettingsStore::load(store);
        assert_eq!(settings.settings(), &Settings::default());
    }

    #[test]
    fn unsupported_language_coerced_to_default() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                SETTINGS_STORAGE_KEY,
                r#"{"showQuickActions":false,"preferDarkBackground":true,"selectedLanguageCode":"xx-YY"}"#,
            )
            .unwrap();
        let settings = SettingsStore::load(store);
        assert_eq!(settings.language(), DEFAULT_LANGUAGE_CODE);
        // Other fields survive the coercion.
        assert!(!settings.settings().show_quick_actions);
        assert!(settings.settings().prefer_dark_background);
    }

    #[test]
    fn corrupt_settings_removed_and_defaulted() {
        let store = Arc::new(MemoryStore::new());
        store.set(SETTINGS_STORAGE_KEY, "not-json{{").unwrap();
        let settings = SettingsStore::load(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        assert_eq!(settings.settings(), &Settings::default());
        assert_eq!(store.get(SETTINGS_STORAGE_KEY), None);
    }

    #[test]
    fn save_persists_camel_case_json() {
        let store = Arc::new(MemoryStore::new());
        let mut settings = SettingsStore::load(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        settings
            .save(Settings {
                selected_language_code: "fr-FR".to_owned(),
                ..Settings::default()
            })
            .unwrap();

        let raw = store.get(SETTINGS_STORAGE_KEY).unwrap();
        assert!(raw.contains("\"selectedLanguageCode\":\"fr-FR\""));

        let reloaded = SettingsStore::load(store);
        assert_eq!(reloaded.language(), "fr-FR");
    }
}
