//! Модуль конфигурации библиотеки tts-script
//!
//! Этот модуль содержит структуры для настройки путей, очереди запросов,
//! пост-обработки тишины и команды внешнего движка синтеза.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, TtsScriptError};

/// Параметры масштабирования пауз внутри синтезированного фрагмента
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SilenceRescaleConfig {
    /// Включить масштабирование пауз
    pub enabled: bool,
    /// Порог амплитуды, ниже которого сэмпл считается тишиной
    pub amplitude_threshold: f32,
    /// Минимальная длительность паузы в секундах
    pub min_silence_seconds: f64,
}

impl Default for SilenceRescaleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amplitude_threshold: 0.01,
            min_silence_seconds: 0.1,
        }
    }
}

/// Команда запуска внешнего движка TTS
///
/// Аргументы могут содержать подстановки `{prompt}`, `{text}`, `{output}`,
/// `{mode}`, `{version}`, `{max_tokens}` и `{silence}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineCommandConfig {
    /// Исполняемый файл движка
    pub program: String,
    /// Шаблон аргументов
    pub args: Vec<String>,
}

impl Default for EngineCommandConfig {
    fn default() -> Self {
        Self {
            program: "indextts".to_string(),
            args: vec![
                "--voice".to_string(),
                "{prompt}".to_string(),
                "--output_path".to_string(),
                "{output}".to_string(),
                "--model_version".to_string(),
                "{version}".to_string(),
                "{text}".to_string(),
            ],
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsScriptConfig {
    /// Файл правил замены текста
    pub rules_file: PathBuf,
    /// Файл настроек дикторов
    pub settings_file: PathBuf,
    /// Директория с эталонными записями голосов
    pub prompts_dir: PathBuf,
    /// Директория для готовых записей
    pub output_dir: PathBuf,
    /// Максимальное количество запросов, принятых в очередь
    pub max_queued_requests: usize,
    /// Максимальное количество одновременно выполняемых запросов
    pub max_concurrent_requests: usize,
    /// Масштабирование пауз
    pub rescale: SilenceRescaleConfig,
    /// Внешний движок синтеза
    pub engine: EngineCommandConfig,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for TtsScriptConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from("text_replace_rules.txt"),
            settings_file: PathBuf::from("config.json"),
            prompts_dir: PathBuf::from("prompts"),
            output_dir: PathBuf::from("outputs"),
            max_queued_requests: 20,
            max_concurrent_requests: 1,
            rescale: SilenceRescaleConfig::default(),
            engine: EngineCommandConfig::default(),
            cleanup_temp_files: true,
        }
    }
}

impl TtsScriptConfig {
    /// Загрузить конфигурацию из JSON-файла; отсутствующие поля берутся по умолчанию
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TtsScriptError::Configuration(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Проверить согласованность параметров
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(TtsScriptError::Configuration(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_queued_requests < self.max_concurrent_requests {
            return Err(TtsScriptError::Configuration(format!(
                "max_queued_requests ({}) must not be smaller than max_concurrent_requests ({})",
                self.max_queued_requests, self.max_concurrent_requests
            )));
        }
        if self.rescale.amplitude_threshold < 0.0 || self.rescale.min_silence_seconds < 0.0 {
            return Err(TtsScriptError::Configuration(
                "rescale thresholds must be non-negative".to_string(),
            ));
        }
        if self.engine.program.trim().is_empty() {
            return Err(TtsScriptError::Configuration("engine program is empty".to_string()));
        }
        Ok(())
    }
}
