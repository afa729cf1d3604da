//! Основной файл библиотеки tts-script
//!
//! Озвучивание сценариев с несколькими дикторами: строки `<Имя>` переключают
//! диктора, пустые строки становятся паузами, фрагменты синтезируются внешним
//! движком и собираются в один WAV-файл.

pub mod config;
pub mod error;
pub mod media;
pub mod notification;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod queue;
pub mod settings;
pub mod text;
pub mod tts;
pub mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use crate::config::TtsScriptConfig;
use crate::error::Result;
use crate::orchestrator::{SynthesisJob, SynthesisOrchestrator, SynthesisOutput};
use crate::prompt::DirectoryPromptProvider;
use crate::queue::{RequestQueue, RunHandle};
use crate::settings::{JsonFileSettings, SettingsResolver};
use crate::text::{ReplacementRuleEngine, ScriptSegmenter};
use crate::tts::{CommandSynthesizer, SpeechSynthesizer};

pub use crate::error::TtsScriptError;

/// Основная структура для работы с библиотекой
///
/// Собирает все компоненты по конфигурации: правила замены, настройки
/// дикторов, эталоны голосов, движок синтеза и очередь запросов.
pub struct TtsScript {
    config: TtsScriptConfig,
    rules: Arc<ReplacementRuleEngine>,
    settings: Arc<SettingsResolver>,
    prompts: Arc<DirectoryPromptProvider>,
    orchestrator: Arc<SynthesisOrchestrator>,
    queue: RequestQueue,
}

impl TtsScript {
    /// Создать экземпляр с движком из `config.engine`
    pub fn new(config: TtsScriptConfig) -> Result<Self> {
        let synthesizer = Arc::new(CommandSynthesizer::new(&config.engine, config.cleanup_temp_files));
        Self::with_synthesizer(config, synthesizer)
    }

    /// Создать экземпляр с произвольным движком синтеза
    pub fn with_synthesizer(config: TtsScriptConfig, synthesizer: Arc<dyn SpeechSynthesizer>) -> Result<Self> {
        config.validate()?;

        let rules = Arc::new(ReplacementRuleEngine::new(&config.rules_file));
        let settings = Arc::new(SettingsResolver::open(Box::new(JsonFileSettings::new(
            &config.settings_file,
        ))));
        let prompts = Arc::new(DirectoryPromptProvider::new(&config.prompts_dir));

        let orchestrator = Arc::new(SynthesisOrchestrator::new(
            ScriptSegmenter::new(rules.clone()),
            settings.clone(),
            prompts.clone(),
            synthesizer,
            config.rescale.clone(),
            &config.output_dir,
        ));
        let queue = RequestQueue::from_config(orchestrator.clone(), &config);

        log::info!(
            "tts-script ready: prompts {}, output {}",
            config.prompts_dir.display(),
            config.output_dir.display()
        );

        Ok(Self {
            config,
            rules,
            settings,
            prompts,
            orchestrator,
            queue,
        })
    }

    pub fn config(&self) -> &TtsScriptConfig {
        &self.config
    }

    pub fn rules(&self) -> &Arc<ReplacementRuleEngine> {
        &self.rules
    }

    /// Настройки дикторов
    pub fn settings(&self) -> &Arc<SettingsResolver> {
        &self.settings
    }

    /// Эталоны голосов
    pub fn prompts(&self) -> &Arc<DirectoryPromptProvider> {
        &self.prompts
    }

    pub fn orchestrator(&self) -> &Arc<SynthesisOrchestrator> {
        &self.orchestrator
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Озвучить сценарий через очередь и дождаться результата
    pub async fn synthesize(&self, job: SynthesisJob) -> Result<SynthesisOutput> {
        self.queue.submit(job).await
    }

    /// Запустить озвучивание в фоне
    pub fn spawn(&self, job: SynthesisJob) -> Result<RunHandle> {
        self.queue.spawn(job)
    }
}
