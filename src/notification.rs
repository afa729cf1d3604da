//! Модуль для реализации системы уведомлений
//!
//! Конкретные наблюдатели для системы прогресса: консоль, память и функция
//! обратного вызова.

use std::sync::Arc;
use parking_lot::Mutex;
use crate::progress::{ProgressInfo, ProgressObserver};

/// Наблюдатель, выводящий информацию о прогрессе в stderr
#[derive(Default)]
pub struct ConsoleProgressObserver;

impl ConsoleProgressObserver {
    pub fn new() -> Self {
        Self
    }

    fn format(&self, progress: &ProgressInfo) -> String {
        let segments = progress
            .segments
            .map(|(done, total)| format!(" [{}/{}]", done, total))
            .unwrap_or_default();
        let details = progress
            .details
            .as_deref()
            .map(|d| format!(", Детали: {}", d))
            .unwrap_or_default();

        format!(
            "[Прогресс] Шаг: {}{}, Общий прогресс: {:.1}%{}",
            progress.step, segments, progress.total_progress, details
        )
    }
}

impl ProgressObserver for ConsoleProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        // stdout занят результатом CLI
        eprintln!("{}", self.format(&progress));
    }
}

/// Наблюдатель, сохраняющий историю прогресса в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить историю обновлений прогресса
    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().clone()
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history.lock().push(progress);
    }
}

/// Наблюдатель, вызывающий функцию обратного вызова
pub struct CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    callback: F,
}

impl<F> CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressObserver for CallbackProgressObserver<F>
where
    F: Fn(ProgressInfo) + Send + Sync + 'static,
{
    fn on_progress_update(&self, progress: ProgressInfo) {
        (self.callback)(progress);
    }
}
