//! Оркестратор синтеза сценария
//!
//! Один запрос обрабатывается строго последовательно: фрагменты синтезируются
//! в порядке сценария, паузы строятся по частоте и числу каналов первого
//! синтезированного фрагмента, итоговый файл пишется только после успешного
//! синтеза всех фрагментов.

use std::path::PathBuf;
use std::sync::Arc;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use crate::config::SilenceRescaleConfig;
use crate::error::{Result, TtsScriptError};
use crate::media::{self, concatenate, write_output, Waveform};
use crate::progress::{ProcessStep, ProgressTracker};
use crate::prompt::PromptProvider;
use crate::settings::{SettingsResolver, SpeakerSettings};
use crate::text::{distinct_speakers, ScriptSegmenter, Segment, SegmentContent};
use crate::tts::{InferenceMode, SpeechSynthesizer, SynthesisRequest};

/// Запрос на озвучивание сценария
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisJob {
    /// Диктор для строк до первого тега `<Имя>`
    pub default_speaker: String,
    /// Эталон для дикторов без собственной записи
    pub fallback_prompt: PathBuf,
    /// Текст сценария
    pub text: String,
    #[serde(default)]
    pub mode: InferenceMode,
    /// Настройки для дикторов без сохранённых настроек
    pub global_settings: SpeakerSettings,
}

/// Результат озвучивания
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub sample_rate: u32,
    pub waveform: Waveform,
    /// Записанный файл
    pub output_path: PathBuf,
    /// Дикторы в порядке первого появления
    pub speakers: Vec<String>,
}

/// Оркестратор: сегментация, синтез, сборка и запись
pub struct SynthesisOrchestrator {
    segmenter: ScriptSegmenter,
    resolver: Arc<SettingsResolver>,
    prompts: Arc<dyn PromptProvider>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    rescale: SilenceRescaleConfig,
    output_dir: PathBuf,
}

/// Частота и число каналов, заданные первым фрагментом
#[derive(Debug, Clone, Copy)]
struct Layout {
    sample_rate: u32,
    channels: usize,
}

impl SynthesisOrchestrator {
    pub fn new(
        segmenter: ScriptSegmenter,
        resolver: Arc<SettingsResolver>,
        prompts: Arc<dyn PromptProvider>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        rescale: SilenceRescaleConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            segmenter,
            resolver,
            prompts,
            synthesizer,
            rescale,
            output_dir: output_dir.into(),
        }
    }

    pub fn resolver(&self) -> &Arc<SettingsResolver> {
        &self.resolver
    }

    pub fn segmenter(&self) -> &ScriptSegmenter {
        &self.segmenter
    }

    /// Настройки диктора фрагмента: сохранённые целиком, иначе настройки запроса
    pub fn settings_for(&self, speaker: &str, job: &SynthesisJob) -> SpeakerSettings {
        self.resolver
            .speaker_override(speaker)
            .unwrap_or_else(|| job.global_settings.clone())
    }

    /// Озвучить сценарий без отслеживания прогресса
    pub async fn run(&self, job: &SynthesisJob) -> Result<SynthesisOutput> {
        self.run_with_progress(job, &ProgressTracker::new()).await
    }

    /// Озвучить сценарий, сообщая о прогрессе через `tracker`
    pub async fn run_with_progress(&self, job: &SynthesisJob, tracker: &ProgressTracker) -> Result<SynthesisOutput> {
        info!("Starting script synthesis ({} chars, mode {})", job.text.chars().count(), job.mode);

        tracker.set_step(ProcessStep::Segmentation);
        let segments = self.segmenter.segment(&job.text, &job.default_speaker);
        if segments.is_empty() {
            return Err(TtsScriptError::EmptyScript);
        }
        tracker.update_step_progress(100.0, Some(format!("{} сегментов", segments.len())));

        tracker.set_step(ProcessStep::Synthesis);
        let buffers = self.synthesize_segments(&segments, job, tracker).await?;
        let layout = match buffers.first() {
            Some(first) => Layout {
                sample_rate: first.sample_rate,
                channels: first.channel_count(),
            },
            // Сценарий из одних пауз
            None => return Err(TtsScriptError::EmptyScript),
        };

        tracker.set_step(ProcessStep::Assembly);
        let waveform = concatenate(&buffers, layout.sample_rate)?;
        debug!(
            "Assembled {} buffers: {} samples, {} channels",
            buffers.len(),
            waveform.len(),
            layout.channels
        );

        tracker.set_step(ProcessStep::Writing);
        let speakers = distinct_speakers(&segments);
        let output_path = write_output(
            &self.output_dir,
            &waveform,
            &speakers,
            &job.text,
            job.global_settings.tts_version,
        )?;

        tracker.complete();
        info!("Синтез сценария завершен: {}", output_path.display());

        Ok(SynthesisOutput {
            sample_rate: layout.sample_rate,
            waveform,
            output_path,
            speakers,
        })
    }

    async fn synthesize_segments(
        &self,
        segments: &[Segment],
        job: &SynthesisJob,
        tracker: &ProgressTracker,
    ) -> Result<Vec<Waveform>> {
        let total = segments.iter().filter(|s| !s.is_break()).count();
        let mut completed = 0;
        let mut layout: Option<Layout> = None;
        let mut buffers = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let settings = self.settings_for(&segment.speaker, job);

            match &segment.content {
                SegmentContent::Break => match layout {
                    Some(layout) => {
                        buffers.push(Waveform::silence_for(
                            layout.sample_rate,
                            layout.channels,
                            settings.silence_duration,
                        ));
                    }
                    None => debug!("Dropping leading break at segment {}: no audio yet", index),
                },
                SegmentContent::Text(text) => {
                    let wave = self.synthesize_text(&segment.speaker, text, job, settings).await?;
                    if layout.is_none() {
                        layout = Some(Layout {
                            sample_rate: wave.sample_rate,
                            channels: wave.channel_count(),
                        });
                    }
                    buffers.push(wave);

                    completed += 1;
                    tracker.update_segments(completed, total, Some(preview(text)));
                    info!("Синтез: {}/{}, {}: {}", completed, total, segment.speaker, preview(text));
                }
            }
        }

        Ok(buffers)
    }

    async fn synthesize_text(
        &self,
        speaker: &str,
        text: &str,
        job: &SynthesisJob,
        settings: SpeakerSettings,
    ) -> Result<Waveform> {
        let prompt_path = self
            .prompts
            .resolve(speaker)
            .unwrap_or_else(|| job.fallback_prompt.clone());

        let request = SynthesisRequest {
            prompt_path,
            text: text.to_string(),
            mode: job.mode,
            settings,
        };

        let wave = self.synthesizer.synthesize(&request).await.map_err(|e| {
            error!("Synthesis failed for speaker {}: {}", speaker, e);
            match e {
                TtsScriptError::Synthesis(_) => e,
                other => TtsScriptError::Synthesis(other.to_string()),
            }
        })?;

        let scale_rate = request.settings.scale_rate;
        if self.rescale.enabled && scale_rate != 1.0 {
            let outcome = media::rescale(
                &wave,
                self.rescale.amplitude_threshold,
                self.rescale.min_silence_seconds,
                scale_rate,
            );
            return Ok(outcome.waveform);
        }

        Ok(wave)
    }
}

/// Начало текста для сообщений о прогрессе
fn preview(text: &str) -> String {
    if text.chars().count() > 30 {
        format!("{}...", text.chars().take(30).collect::<String>())
    } else {
        text.to_string()
    }
}
