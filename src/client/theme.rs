//! Light/dark preference with persistence.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::client::errors::ClientResult;

/// Storage key of the persisted preference.
pub const THEME_STORAGE_KEY: &str = "feelm-theme";

/// Environment hint forcing the OS preference (`dark`, `1`, `true`).
const PREFERS_DARK_ENV: &str = "FEELMATE_PREFERS_DARK";
/// Terminal colour hint, `fg;bg`.
const COLORFGBG_ENV: &str = "COLORFGBG";

/// Page theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a stored value. Anything else counts as absent.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent storage for the preference.
pub trait ThemeStore: Send + Sync {
    /// Stored preference, `None` if never saved.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> ClientResult<Option<Theme>>;

    /// Persist `theme`.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn save(&self, theme: Theme) -> ClientResult<()>;
}

/// JSON key/value file, the native counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    /// Store backed by `path`, created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_entries(&self) -> ClientResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> ClientResult<Option<Theme>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(THEME_STORAGE_KEY)
            .and_then(|value| Theme::parse(value)))
    }

    fn save(&self, theme: Theme) -> ClientResult<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(THEME_STORAGE_KEY.to_string(), theme.as_str().to_string());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    value: Mutex<Option<Theme>>,
}

impl MemoryThemeStore {
    /// Store pre-seeded with `theme`.
    #[must_use]
    pub const fn with(theme: Option<Theme>) -> Self {
        Self {
            value: Mutex::new(theme),
        }
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> ClientResult<Option<Theme>> {
        Ok(*self.value.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, theme: Theme) -> ClientResult<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(theme);
        Ok(())
    }
}

/// Whether the environment asks for a dark theme.
#[must_use]
pub fn os_prefers_dark() -> bool {
    prefers_dark_from(
        std::env::var(PREFERS_DARK_ENV).ok().as_deref(),
        std::env::var(COLORFGBG_ENV).ok().as_deref(),
    )
}

fn prefers_dark_from(explicit: Option<&str>, colorfgbg: Option<&str>) -> bool {
    if let Some(value) = explicit {
        return matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "dark" | "yes");
    }
    // Background colour indices 0-6 and 8 are the dark half of the palette.
    colorfgbg
        .and_then(|value| value.rsplit(';').next())
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg <= 6 || bg == 8)
}

/// Current theme plus its store.
pub struct ThemeToggle<S> {
    store: S,
    theme: Theme,
}

impl<S: ThemeStore> ThemeToggle<S> {
    /// Stored preference if present, else the OS preference, else light.
    #[must_use]
    pub fn init(store: S, os_prefers_dark: bool) -> Self {
        let stored = store.load().unwrap_or_else(|err| {
            warn!(error = %err, "Could not read theme preference");
            None
        });
        let os_theme = if os_prefers_dark { Theme::Dark } else { Theme::Light };
        let theme = stored.unwrap_or(os_theme);
        Self { store, theme }
    }

    /// Active theme.
    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch theme and persist the new value.
    ///
    /// # Errors
    /// Returns an error if persisting fails; the switch still applies.
    pub fn toggle(&mut self) -> ClientResult<Theme> {
        self.theme = self.theme.toggled();
        self.store.save(self.theme)?;
        Ok(self.theme)
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_dark_then_toggle_persists_light() {
        let mut toggle = ThemeToggle::init(MemoryThemeStore::default(), true);
        assert_eq!(toggle.theme(), Theme::Dark);

        assert_eq!(toggle.toggle().unwrap(), Theme::Light);
        assert_eq!(toggle.store().load().unwrap(), Some(Theme::Light));
    }

    #[test]
    fn test_stored_preference_wins() {
        let toggle = ThemeToggle::init(MemoryThemeStore::with(Some(Theme::Light)), true);
        assert_eq!(toggle.theme(), Theme::Light);
    }

    #[test]
    fn test_defaults_to_light() {
        let toggle = ThemeToggle::init(MemoryThemeStore::default(), false);
        assert_eq!(toggle.theme(), Theme::Light);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("feelmate-theme-{}", uuid::Uuid::new_v4()));
        let path = dir.join("prefs.json");
        let store = FileThemeStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        store.save(Theme::Dark).unwrap();
        let raw: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("feelm-theme").map(String::as_str), Some("dark"));
        assert_eq!(store.load().unwrap(), Some(Theme::Dark));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unknown_stored_value_is_ignored() {
        let dir = std::env::temp_dir().join(format!("feelmate-theme-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prefs.json");
        std::fs::write(&path, r#"{"feelm-theme":"sepia"}"#).unwrap();

        let toggle = ThemeToggle::init(FileThemeStore::new(&path), true);
        assert_eq!(toggle.theme(), Theme::Dark);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_colorfgbg_hint() {
        assert!(prefers_dark_from(None, Some("15;0")));
        assert!(!prefers_dark_from(None, Some("0;15")));
        assert!(!prefers_dark_from(None, None));
        assert!(prefers_dark_from(Some("dark"), Some("0;15")));
        assert!(!prefers_dark_from(Some("no"), Some("15;0")));
    }
}
