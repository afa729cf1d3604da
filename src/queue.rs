//! Очередь запросов синтеза
//!
//! Ограничивает число принятых запросов (`max_queued_requests`) и число
//! выполняемых одновременно (`max_concurrent_requests`). Запрос выполняется в
//! отдельной задаче Tokio и сообщает о ходе работы через канал событий.

use std::path::PathBuf;
use std::sync::Arc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use crate::config::TtsScriptConfig;
use crate::error::{Result, TtsScriptError};
use crate::notification::CallbackProgressObserver;
use crate::orchestrator::{SynthesisJob, SynthesisOrchestrator, SynthesisOutput};
use crate::progress::{ProgressInfo, ProgressTracker};

/// Событие выполнения запроса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    Progress(ProgressInfo),
    /// Файл записан
    Completed(PathBuf),
    /// Запрос прерван; текст первой фатальной ошибки
    Failed(String),
}

/// Дескриптор запущенного запроса
pub struct RunHandle {
    /// События в порядке возникновения; последним приходит Completed или Failed
    pub events: mpsc::UnboundedReceiver<RunEvent>,
    pub join: JoinHandle<Result<SynthesisOutput>>,
}

impl RunHandle {
    /// Дождаться результата
    pub async fn wait(self) -> Result<SynthesisOutput> {
        self.join
            .await
            .map_err(|e| TtsScriptError::Other(format!("Synthesis task failed: {}", e)))?
    }
}

/// Ограниченная очередь запросов перед оркестратором
#[derive(Clone)]
pub struct RequestQueue {
    orchestrator: Arc<SynthesisOrchestrator>,
    admission: Arc<Semaphore>,
    execution: Arc<Semaphore>,
    max_queued: usize,
}

impl RequestQueue {
    pub fn new(orchestrator: Arc<SynthesisOrchestrator>, max_queued: usize, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let max_queued = max_queued.max(max_concurrent);
        Self {
            orchestrator,
            admission: Arc::new(Semaphore::new(max_queued)),
            execution: Arc::new(Semaphore::new(max_concurrent)),
            max_queued,
        }
    }

    pub fn from_config(orchestrator: Arc<SynthesisOrchestrator>, config: &TtsScriptConfig) -> Self {
        Self::new(orchestrator, config.max_queued_requests, config.max_concurrent_requests)
    }

    /// Сколько запросов ещё можно принять
    pub fn available_slots(&self) -> usize {
        self.admission.available_permits()
    }

    /// Сколько запросов принято и ещё не завершено
    pub fn pending(&self) -> usize {
        self.max_queued - self.admission.available_permits()
    }

    /// Принять запрос и запустить его в фоне
    ///
    /// Если очередь заполнена, возвращает `QueueFull` сразу, не дожидаясь места.
    pub fn spawn(&self, job: SynthesisJob) -> Result<RunHandle> {
        let admission = self.admission.clone().try_acquire_owned().map_err(|_| {
            warn!("Очередь запросов заполнена ({} запросов)", self.max_queued);
            TtsScriptError::QueueFull
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.orchestrator.clone();
        let execution = self.execution.clone();

        let join = tokio::spawn(async move {
            let _admission = admission;
            let _permit = execution
                .acquire_owned()
                .await
                .map_err(|e| TtsScriptError::Other(format!("Request queue closed: {}", e)))?;

            let progress_tx = tx.clone();
            let tracker = ProgressTracker::with_observer(Box::new(CallbackProgressObserver::new(
                move |progress| {
                    let _ = progress_tx.send(RunEvent::Progress(progress));
                },
            )));

            let result = orchestrator.run_with_progress(&job, &tracker).await;
            let event = match &result {
                Ok(output) => RunEvent::Completed(output.output_path.clone()),
                Err(e) => RunEvent::Failed(e.to_string()),
            };
            let _ = tx.send(event);
            result
        });

        info!("Запрос синтеза принят, в очереди: {}", self.pending());
        Ok(RunHandle { events: rx, join })
    }

    /// Принять запрос и дождаться результата
    pub async fn submit(&self, job: SynthesisJob) -> Result<SynthesisOutput> {
        self.spawn(job)?.wait().await
    }
}
