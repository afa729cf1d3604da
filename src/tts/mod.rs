//! Модуль для работы с TTS
//!
//! Граница с внешним движком синтеза: трейт `SpeechSynthesizer` и его
//! реализация через запуск внешней команды.

pub mod command;

use std::fmt;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::media::Waveform;
use crate::settings::SpeakerSettings;

pub use command::CommandSynthesizer;

/// Режим инференса движка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// Обычный режим, по одному предложению
    #[default]
    Normal,
    /// Пакетный режим
    Batch,
}

impl InferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InferenceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "batch" => Ok(Self::Batch),
            other => Err(format!("unknown inference mode: {}", other)),
        }
    }
}

/// Запрос на синтез одного фрагмента
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Эталонная запись голоса
    pub prompt_path: PathBuf,
    /// Текст фрагмента
    pub text: String,
    pub mode: InferenceMode,
    /// Настройки диктора фрагмента
    pub settings: SpeakerSettings,
}

/// Внешний движок синтеза речи
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Синтезировать фрагмент; ошибка прерывает весь запрос
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Waveform>;
}
