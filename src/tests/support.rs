use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use crate::config::TtsScriptConfig;
use crate::error::{Result, TtsScriptError};
use crate::media::Waveform;
use crate::orchestrator::SynthesisJob;
use crate::settings::{SpeakerSettings, TtsVersion};
use crate::tts::{InferenceMode, SpeechSynthesizer, SynthesisRequest};
use crate::TtsScript;

type Responder = Box<dyn Fn(&SynthesisRequest) -> Result<Waveform> + Send + Sync>;

/// Движок-заглушка: запоминает запросы и отвечает заданной функцией
pub struct FakeSynthesizer {
    calls: Mutex<Vec<SynthesisRequest>>,
    respond: Responder,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn with<F>(respond: F) -> Self
    where
        F: Fn(&SynthesisRequest) -> Result<Waveform> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            gate: None,
            delay: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// 1000 сэмплов 0.5 на 24 кГц на каждый фрагмент
    pub fn constant() -> Self {
        Self::with(|_| Ok(Waveform::mono(24000, vec![0.5; 1000])))
    }

    /// Ошибка на фрагменте с текстом `text`
    pub fn failing_on(text: &'static str) -> Self {
        Self::with(move |request| {
            if request.text == text {
                Err(TtsScriptError::Synthesis("CUDA out of memory".to_string()))
            } else {
                Ok(Waveform::mono(24000, vec![0.5; 1000]))
            }
        })
    }

    /// Каждый вызов ждёт разрешения от семафора
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SynthesisRequest> {
        self.calls.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.text).collect()
    }

    /// Максимум одновременных вызовов
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Waveform> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().push(request.clone());
        let result = (self.respond)(request);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Рабочая директория с конфигурацией для тестов
pub struct Fixture {
    pub dir: TempDir,
    pub config: TtsScriptConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = TtsScriptConfig {
            rules_file: dir.path().join("text_replace_rules.txt"),
            settings_file: dir.path().join("config.json"),
            prompts_dir: dir.path().join("prompts"),
            output_dir: dir.path().join("outputs"),
            ..TtsScriptConfig::default()
        };
        std::fs::create_dir_all(&config.prompts_dir).unwrap();
        Self { dir, config }
    }

    pub fn add_prompt_file(&self, name: &str) -> PathBuf {
        let path = self.config.prompts_dir.join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    pub fn fallback_prompt(&self) -> PathBuf {
        self.dir.path().join("fallback.wav")
    }

    pub fn app(&self, synthesizer: Arc<FakeSynthesizer>) -> TtsScript {
        TtsScript::with_synthesizer(self.config.clone(), synthesizer).unwrap()
    }

    pub fn job(&self, text: &str, default_speaker: &str) -> SynthesisJob {
        SynthesisJob {
            default_speaker: default_speaker.to_string(),
            fallback_prompt: self.fallback_prompt(),
            text: text.to_string(),
            mode: InferenceMode::Normal,
            global_settings: SpeakerSettings {
                silence_duration: 0.3,
                tts_version: TtsVersion::V1,
                max_text_tokens_per_sentence: 80,
                scale_rate: 1.0,
            },
        }
    }

    /// Файлы в директории результатов
    pub fn output_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.config.output_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
