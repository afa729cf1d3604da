//! Настройки синтеза: глобальные и по дикторам
//!
//! Настройки диктора, если они сохранены, используются целиком вместо
//! глобальных; поля никогда не смешиваются.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;
use log::info;
use parking_lot::RwLock;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::error::{Result, TtsScriptError};

pub use store::{JsonFileSettings, SettingsPersistence};

/// Значение выбора диктора, означающее «без диктора»
pub const NO_SPEAKER: &str = "none";

/// Версия модели TTS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TtsVersion {
    #[default]
    V1,
    V1_5,
}

impl TtsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V1_5 => "1.5",
        }
    }

    fn from_f64(value: f64) -> Option<Self> {
        if (value - 1.0).abs() < f64::EPSILON {
            Some(Self::V1)
        } else if (value - 1.5).abs() < f64::EPSILON {
            Some(Self::V1_5)
        } else {
            None
        }
    }
}

impl fmt::Display for TtsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// В файле настроек версия хранится числом: 1 или 1.5
impl Serialize for TtsVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::V1 => serializer.serialize_u64(1),
            Self::V1_5 => serializer.serialize_f64(1.5),
        }
    }
}

struct TtsVersionVisitor;

impl<'de> Visitor<'de> for TtsVersionVisitor {
    type Value = TtsVersion;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("TTS version 1 or 1.5")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<TtsVersion, E> {
        self.visit_f64(v as f64)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<TtsVersion, E> {
        self.visit_f64(v as f64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<TtsVersion, E> {
        TtsVersion::from_f64(v).ok_or_else(|| E::custom(format!("unsupported TTS version {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<TtsVersion, E> {
        let value: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("unsupported TTS version {:?}", v)))?;
        self.visit_f64(value)
    }
}

impl<'de> Deserialize<'de> for TtsVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TtsVersionVisitor)
    }
}

fn default_scale_rate() -> f32 {
    1.0
}

/// Параметры синтеза для диктора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSettings {
    /// Длительность паузы на пустую строку, секунды
    pub silence_duration: f32,
    /// Версия модели
    pub tts_version: TtsVersion,
    /// Максимум токенов текста в одном предложении
    pub max_text_tokens_per_sentence: u32,
    /// Коэффициент масштабирования пауз внутри фрагмента
    #[serde(default = "default_scale_rate")]
    pub scale_rate: f32,
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self {
            silence_duration: 0.3,
            tts_version: TtsVersion::V1,
            max_text_tokens_per_sentence: 80,
            scale_rate: 1.0,
        }
    }
}

impl SpeakerSettings {
    /// Проверить допустимость значений
    pub fn validate(&self) -> Result<()> {
        if !self.silence_duration.is_finite() || self.silence_duration < 0.0 {
            return Err(TtsScriptError::InvalidSettings(format!(
                "silence_duration must be >= 0, got {}",
                self.silence_duration
            )));
        }
        if self.max_text_tokens_per_sentence == 0 {
            return Err(TtsScriptError::InvalidSettings(
                "max_text_tokens_per_sentence must be > 0".to_string(),
            ));
        }
        if !self.scale_rate.is_finite() || self.scale_rate <= 0.0 {
            return Err(TtsScriptError::InvalidSettings(format!(
                "scale_rate must be > 0, got {}",
                self.scale_rate
            )));
        }
        Ok(())
    }
}

/// Содержимое хранилища настроек
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsStore {
    #[serde(default)]
    pub global_settings: SpeakerSettings,
    #[serde(default)]
    pub speaker_settings: BTreeMap<String, SpeakerSettings>,
}

/// Имя диктора, если это не «пустой» выбор
fn speaker_key(speaker: Option<&str>) -> Option<&str> {
    speaker.filter(|name| !name.is_empty() && *name != NO_SPEAKER)
}

/// Разрешение настроек дикторов поверх порта хранения
pub struct SettingsResolver {
    store: RwLock<SettingsStore>,
    persistence: Box<dyn SettingsPersistence>,
}

impl SettingsResolver {
    pub fn new(store: SettingsStore, persistence: Box<dyn SettingsPersistence>) -> Self {
        Self {
            store: RwLock::new(store),
            persistence,
        }
    }

    /// Загрузить настройки через порт; при отсутствии данных берутся значения по умолчанию
    pub fn open(persistence: Box<dyn SettingsPersistence>) -> Self {
        let store = match persistence.load() {
            Ok(Some(store)) => store,
            Ok(None) => SettingsStore::default(),
            Err(e) => {
                log::error!("Failed to load settings, falling back to defaults: {}", e);
                SettingsStore::default()
            }
        };
        Self::new(store, persistence)
    }

    /// Настройки для диктора: его собственные или глобальные
    pub fn resolve(&self, speaker: Option<&str>) -> SpeakerSettings {
        let store = self.store.read();
        speaker_key(speaker)
            .and_then(|name| store.speaker_settings.get(name))
            .unwrap_or(&store.global_settings)
            .clone()
    }

    /// Сохранённые настройки именно этого диктора
    pub fn speaker_override(&self, speaker: &str) -> Option<SpeakerSettings> {
        let key = speaker_key(Some(speaker))?;
        self.store.read().speaker_settings.get(key).cloned()
    }

    pub fn global(&self) -> SpeakerSettings {
        self.store.read().global_settings.clone()
    }

    /// Дикторы с собственными настройками
    pub fn speakers(&self) -> Vec<String> {
        self.store.read().speaker_settings.keys().cloned().collect()
    }

    /// Копия текущего состояния
    pub fn snapshot(&self) -> SettingsStore {
        self.store.read().clone()
    }

    /// Сохранить настройки диктора (или глобальные)
    ///
    /// Состояние в памяти меняется только после успешной записи.
    pub fn save(&self, speaker: Option<&str>, settings: SpeakerSettings) -> Result<()> {
        settings.validate()?;

        let mut store = self.store.write();
        let mut updated = store.clone();
        match speaker_key(speaker) {
            Some(name) => {
                updated.speaker_settings.insert(name.to_string(), settings);
            }
            None => updated.global_settings = settings,
        }

        self.persistence.save(&updated).map_err(|e| {
            log::error!("Failed to save settings: {}", e);
            TtsScriptError::SettingsWrite(e.to_string())
        })?;
        *store = updated;

        match speaker_key(speaker) {
            Some(name) => info!("Saved settings for speaker '{}'", name),
            None => info!("Saved global settings"),
        }
        Ok(())
    }

    /// Удалить собственные настройки диктора; возвращает false, если их не было
    pub fn remove_speaker(&self, speaker: &str) -> Result<bool> {
        let Some(name) = speaker_key(Some(speaker)) else {
            return Ok(false);
        };

        let mut store = self.store.write();
        if !store.speaker_settings.contains_key(name) {
            return Ok(false);
        }
        let mut updated = store.clone();
        updated.speaker_settings.remove(name);

        self.persistence
            .save(&updated)
            .map_err(|e| TtsScriptError::SettingsWrite(e.to_string()))?;
        *store = updated;
        info!("Removed settings for speaker '{}'", name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use parking_lot::Mutex;

    /// Порт в памяти с возможностью имитировать сбой записи
    #[derive(Default, Clone)]
    struct MemoryPersistence {
        saved: Arc<Mutex<Option<SettingsStore>>>,
        fail: bool,
    }

    impl SettingsPersistence for MemoryPersistence {
        fn load(&self) -> Result<Option<SettingsStore>> {
            Ok(self.saved.lock().clone())
        }

        fn save(&self, store: &SettingsStore) -> Result<()> {
            if self.fail {
                return Err(TtsScriptError::Other("disk full".to_string()));
            }
            *self.saved.lock() = Some(store.clone());
            Ok(())
        }
    }

    fn alice_settings() -> SpeakerSettings {
        SpeakerSettings {
            silence_duration: 0.8,
            tts_version: TtsVersion::V1_5,
            max_text_tokens_per_sentence: 120,
            scale_rate: 1.5,
        }
    }

    #[test]
    fn test_defaults() {
        let settings = SpeakerSettings::default();
        assert_eq!(settings.silence_duration, 0.3);
        assert_eq!(settings.tts_version, TtsVersion::V1);
        assert_eq!(settings.max_text_tokens_per_sentence, 80);
        assert_eq!(settings.scale_rate, 1.0);
    }

    #[test]
    fn test_resolution_precedence() {
        let resolver = SettingsResolver::open(Box::new(MemoryPersistence::default()));
        resolver.save(Some("Alice"), alice_settings()).unwrap();

        assert_eq!(resolver.resolve(Some("Alice")), alice_settings());
        assert_eq!(resolver.resolve(Some("Bob")), resolver.global());
        assert_eq!(resolver.resolve(None), SpeakerSettings::default());
        assert_eq!(resolver.resolve(Some("")), SpeakerSettings::default());
        assert_eq!(resolver.resolve(Some(NO_SPEAKER)), SpeakerSettings::default());
    }

    #[test]
    fn test_save_global_via_sentinel() {
        let persistence = MemoryPersistence::default();
        let resolver = SettingsResolver::open(Box::new(persistence.clone()));
        resolver.save(Some(NO_SPEAKER), alice_settings()).unwrap();

        assert_eq!(resolver.global(), alice_settings());
        assert!(resolver.speakers().is_empty());
        assert_eq!(
            persistence.saved.lock().as_ref().unwrap().global_settings,
            alice_settings()
        );
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let persistence = MemoryPersistence {
            fail: true,
            ..Default::default()
        };
        let resolver = SettingsResolver::new(SettingsStore::default(), Box::new(persistence));

        let result = resolver.save(Some("Alice"), alice_settings());
        assert!(matches!(result, Err(TtsScriptError::SettingsWrite(_))));
        assert_eq!(resolver.resolve(Some("Alice")), SpeakerSettings::default());
        assert!(resolver.speaker_override("Alice").is_none());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let resolver = SettingsResolver::open(Box::new(MemoryPersistence::default()));
        let bad = SpeakerSettings {
            scale_rate: 0.0,
            ..SpeakerSettings::default()
        };
        assert!(matches!(
            resolver.save(None, bad),
            Err(TtsScriptError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_remove_speaker() {
        let resolver = SettingsResolver::open(Box::new(MemoryPersistence::default()));
        resolver.save(Some("Alice"), alice_settings()).unwrap();
        assert!(resolver.remove_speaker("Alice").unwrap());
        assert!(!resolver.remove_speaker("Alice").unwrap());
        assert_eq!(resolver.resolve(Some("Alice")), resolver.global());
    }

    #[test]
    fn test_version_json_format() {
        let json = r#"{
            "global_settings": {"silence_duration": 0.3, "tts_version": 1, "max_text_tokens_per_sentence": 80},
            "speaker_settings": {
                "Hero": {"silence_duration": 0.5, "tts_version": 1.5, "max_text_tokens_per_sentence": 60, "scale_rate": 2.0}
            }
        }"#;
        let store: SettingsStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.global_settings, SpeakerSettings::default());
        assert_eq!(store.speaker_settings["Hero"].tts_version, TtsVersion::V1_5);
        assert_eq!(store.speaker_settings["Hero"].scale_rate, 2.0);

        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(value["global_settings"]["tts_version"], serde_json::json!(1));
        assert_eq!(value["speaker_settings"]["Hero"]["tts_version"], serde_json::json!(1.5));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let result = serde_json::from_str::<TtsVersion>("2");
        assert!(result.is_err());
        assert_eq!(serde_json::from_str::<TtsVersion>("\"1.5\"").unwrap(), TtsVersion::V1_5);
    }
}
