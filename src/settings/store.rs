use crate::domain::{AudioEdition, Editions, TextEdition};
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub text_edition: TextEdition,
    #[serde(default)]
    pub audio_edition: AudioEdition,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            text_edition: TextEdition::default(),
            audio_edition: AudioEdition::default(),
            repeat: default_repeat(),
        }
    }
}

fn default_repeat() -> u32 {
    1
}

impl AppSettings {
    pub fn editions(&self) -> Editions {
        Editions {
            text: self.text_edition.clone(),
            audio: self.audio_edition.clone(),
        }
    }
}

/// Loads settings, falling back to defaults on a missing or corrupt file.
///
/// The text edition is pinned to the default one; a file carrying another
/// value is rewritten.
pub fn load_settings(data_dir: &Path) -> AppSettings {
    let p = settings_path(data_dir);
    let Ok(bytes) = fs::read(&p) else {
        return AppSettings::default();
    };
    let Ok(mut s) = serde_json::from_slice::<AppSettings>(&bytes) else {
        tracing::warn!(path = %p.display(), "settings file is corrupt, using defaults");
        return AppSettings::default();
    };
    s.repeat = s.repeat.max(1);
    if !s.text_edition.is_default() {
        s.text_edition = TextEdition::default();
        if let Err(e) = save_settings(data_dir, &s) {
            tracing::warn!(err = %e, "failed to persist text edition migration");
        }
    }
    s
}

pub fn save_settings(data_dir: &Path, s: &AppSettings) -> Result<(), SettingsError> {
    fs::create_dir_all(data_dir).map_err(|source| SettingsError::Save { source })?;
    let p = settings_path(data_dir);
    let tmp = p.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(s).map_err(|source| SettingsError::Encode { source })?;
    fs::write(&tmp, bytes).map_err(|source| SettingsError::Save { source })?;
    if let Err(e) = fs::rename(&tmp, &p) {
        let _ = fs::remove_file(&p);
        fs::rename(&tmp, &p).map_err(|_| SettingsError::Save { source: e })?;
    }
    Ok(())
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

/// Persisted settings plus a live view of the audio edition.
///
/// The playback queue holds a receiver and reads the edition at lookup
/// time, so a change applies to the very next resolution.
pub struct SettingsStore {
    data_dir: PathBuf,
    current: AppSettings,
    tx_edition: watch::Sender<AudioEdition>,
}

impl SettingsStore {
    pub fn open(data_dir: &Path) -> Self {
        let current = load_settings(data_dir);
        let (tx_edition, _) = watch::channel(current.audio_edition.clone());
        Self {
            data_dir: data_dir.to_path_buf(),
            current,
            tx_edition,
        }
    }

    pub fn get(&self) -> &AppSettings {
        &self.current
    }

    pub fn audio_edition(&self) -> watch::Receiver<AudioEdition> {
        self.tx_edition.subscribe()
    }

    /// Applies `f`, persists the result and publishes the audio edition.
    ///
    /// The in-memory value is updated even when saving fails.
    pub fn update(&mut self, f: impl FnOnce(&mut AppSettings)) -> Result<&AppSettings, SettingsError> {
        f(&mut self.current);
        self.current.repeat = self.current.repeat.max(1);
        self.current.text_edition = TextEdition::default();
        self.tx_edition.send_if_modified(|edition| {
            if *edition == self.current.audio_edition {
                return false;
            }
            *edition = self.current.audio_edition.clone();
            true
        });
        save_settings(&self.data_dir, &self.current)?;
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_publishes_audio_edition() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SettingsStore::open(dir.path());
        let rx = store.audio_edition();
        assert_eq!(*rx.borrow(), AudioEdition::default());

        store
            .update(|s| s.audio_edition = AudioEdition::new("ar.husary"))
            .expect("update");
        assert_eq!(rx.borrow().as_str(), "ar.husary");
        assert_eq!(load_settings(dir.path()).audio_edition.as_str(), "ar.husary");
    }

    #[test]
    fn test_repeat_is_clamped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SettingsStore::open(dir.path());
        let s = store.update(|s| s.repeat = 0).expect("update");
        assert_eq!(s.repeat, 1);
    }
}
