//! Модуль обработки ошибок библиотеки tts-script
//!
//! Фатальные ошибки прерывают весь запрос синтеза, восстанавливаемые
//! (битая строка правил, несовпадение формы при масштабировании тишины)
//! только логируются.

use thiserror::Error;

/// Ошибки библиотеки tts-script
#[derive(Debug, Error)]
pub enum TtsScriptError {
    /// После нормализации в сценарии не осталось ни одного сегмента
    #[error("Script is empty: nothing to synthesize")]
    EmptyScript,

    /// Ошибка внешнего движка синтеза
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// Не удалось сохранить настройки
    #[error("Settings store write failed: {0}")]
    SettingsWrite(String),

    /// Недопустимые значения настроек
    #[error("Invalid speaker settings: {0}")]
    InvalidSettings(String),

    /// Несовпадение длины при пересборке буфера с масштабированной тишиной
    #[error("Silence rescale shape mismatch: expected {expected} samples, got {actual}")]
    SilenceRescaleShapeMismatch { expected: usize, actual: usize },

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка ресемплинга
    #[error("Resampling error: {0}")]
    Resampling(String),

    /// Ошибка чтения/записи WAV
    #[error("WAV error: {0}")]
    WavEncoding(#[from] hound::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Очередь запросов переполнена
    #[error("Request queue is full")]
    QueueFull,

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for TtsScriptError {
    fn from(s: &str) -> Self {
        TtsScriptError::Other(s.to_string())
    }
}

impl From<String> for TtsScriptError {
    fn from(s: String) -> Self {
        TtsScriptError::Other(s)
    }
}

impl TtsScriptError {
    /// Можно ли продолжить работу после этой ошибки
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SilenceRescaleShapeMismatch { .. })
    }
}

/// Тип Result для библиотеки tts-script
pub type Result<T> = std::result::Result<T, TtsScriptError>;
