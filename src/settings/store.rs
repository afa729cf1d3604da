//! Хранение настроек дикторов в JSON-файле

use std::io::Write;
use std::path::{Path, PathBuf};
use log::info;
use tempfile::NamedTempFile;
use crate::error::{Result, TtsScriptError};
use crate::settings::SettingsStore;

/// Порт хранения настроек
pub trait SettingsPersistence: Send + Sync {
    /// Прочитать сохранённые настройки; `None`, если их ещё нет
    fn load(&self) -> Result<Option<SettingsStore>>;

    /// Записать настройки; успех означает, что данные уже на диске
    fn save(&self, store: &SettingsStore) -> Result<()>;
}

/// JSON-файл настроек
///
/// Запись идёт во временный файл в той же директории с последующим
/// атомарным переименованием.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsPersistence for JsonFileSettings {
    fn load(&self) -> Result<Option<SettingsStore>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let store: SettingsStore = serde_json::from_str(&content)?;
        info!("Loaded settings from {}", self.path.display());
        Ok(Some(store))
    }

    fn save(&self, store: &SettingsStore) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(store)?;
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .map_err(|e| TtsScriptError::Io(e.error))?;

        info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SettingsResolver, SpeakerSettings, TtsVersion};

    #[test]
    fn test_absent_file_is_not_created_until_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let resolver = SettingsResolver::open(Box::new(JsonFileSettings::new(&path)));

        assert_eq!(resolver.global(), SpeakerSettings::default());
        assert!(!path.exists());

        resolver.save(None, SpeakerSettings::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let hero = SpeakerSettings {
            silence_duration: 1.0,
            tts_version: TtsVersion::V1_5,
            max_text_tokens_per_sentence: 100,
            scale_rate: 0.5,
        };

        {
            let resolver = SettingsResolver::open(Box::new(JsonFileSettings::new(&path)));
            resolver.save(Some("Hero"), hero.clone()).unwrap();
        }

        let reopened = SettingsResolver::open(Box::new(JsonFileSettings::new(&path)));
        assert_eq!(reopened.resolve(Some("Hero")), hero);
        assert_eq!(reopened.resolve(Some("Villain")), SpeakerSettings::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let persistence = JsonFileSettings::new(&path);
        assert!(persistence.load().is_err());

        let resolver = SettingsResolver::open(Box::new(persistence));
        assert_eq!(resolver.global(), SpeakerSettings::default());
    }

    #[test]
    fn test_legacy_file_without_scale_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"global_settings": {"silence_duration": 0.5, "tts_version": 1, "max_text_tokens_per_sentence": 80}}"#,
        )
        .unwrap();

        let store = JsonFileSettings::new(&path).load().unwrap().unwrap();
        assert_eq!(store.global_settings.silence_duration, 0.5);
        assert_eq!(store.global_settings.scale_rate, 1.0);
        assert!(store.speaker_settings.is_empty());
    }
}
