//! Модуль для отслеживания прогресса выполнения запроса синтеза
//!
//! Реализация паттерна Observer: трекер хранит состояние этапов запроса, а
//! наблюдатели получают снимки прогресса.

use std::collections::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Синтезировано фрагментов / всего фрагментов
    pub segments: Option<(usize, usize)>,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    /// Создает новый экземпляр ProgressInfo
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            segments: None,
            details,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    /// Метод, вызываемый при обновлении прогресса
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Трейт для объекта, отправляющего уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>);

    /// Уведомить всех наблюдателей о прогрессе
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Реализация ProgressReporter по умолчанию
pub struct DefaultProgressReporter {
    observers: RwLock<Vec<Box<dyn ProgressObserver>>>,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Репортер с одним наблюдателем
    pub fn with_observer(observer: Box<dyn ProgressObserver>) -> Self {
        let mut reporter = Self::new();
        reporter.add_observer(observer);
        reporter
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) {
        self.observers.get_mut().push(observer);
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = self.observers.read();
        for observer in observers.iter() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы запроса синтеза
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStep {
    /// Нормализация текста и разбиение по дикторам
    Segmentation,
    /// Синтез фрагментов
    Synthesis,
    /// Склейка буферов
    Assembly,
    /// Запись итогового файла
    Writing,
}

impl ProcessStep {
    /// Получить название этапа в виде строки
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segmentation => "Разбиение сценария",
            Self::Synthesis => "Синтез речи",
            Self::Assembly => "Сборка аудио",
            Self::Writing => "Запись файла",
        }
    }

    /// Весовой коэффициент этапа (в процентах от общего процесса)
    pub fn weight(&self) -> f32 {
        match self {
            Self::Segmentation => 5.0,
            Self::Synthesis => 85.0,
            Self::Assembly => 5.0,
            Self::Writing => 5.0,
        }
    }
}

#[derive(Debug)]
struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
    segments: Option<(usize, usize)>,
}

impl TrackerState {
    fn update_total_progress(&mut self) {
        let mut total = 0.0;
        let mut total_weight = 0.0;

        for (step, progress) in &self.completed_steps {
            if *step != self.current_step {
                total += step.weight() * progress / 100.0;
                total_weight += step.weight();
            }
        }

        total += self.current_step.weight() * self.step_progress / 100.0;
        total_weight += self.current_step.weight();

        self.total_progress = (total / total_weight * 100.0).clamp(0.0, 100.0);
    }

    fn snapshot(&self, details: Option<String>) -> ProgressInfo {
        let mut info = ProgressInfo::new(
            self.current_step.as_str(),
            self.step_progress,
            self.total_progress,
            details,
        );
        info.segments = self.segments;
        info
    }
}

/// Трекер прогресса одного запроса
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    state: RwLock<TrackerState>,
}

impl ProgressTracker {
    /// Трекер без наблюдателей
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: RwLock::new(TrackerState {
                current_step: ProcessStep::Segmentation,
                step_progress: 0.0,
                total_progress: 0.0,
                completed_steps: HashMap::new(),
                segments: None,
            }),
        }
    }

    /// Трекер с репортером
    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    /// Трекер с единственным наблюдателем
    pub fn with_observer(observer: Box<dyn ProgressObserver>) -> Self {
        Self::with_reporter(Box::new(DefaultProgressReporter::with_observer(observer)))
    }

    pub fn current_step(&self) -> ProcessStep {
        self.state.read().current_step
    }

    pub fn total_progress(&self) -> f32 {
        self.state.read().total_progress
    }

    /// Установить текущий этап; предыдущий считается завершённым
    pub fn set_step(&self, step: ProcessStep) {
        let info = {
            let mut state = self.state.write();
            if state.current_step == step {
                return;
            }
            let previous = state.current_step;
            state.completed_steps.insert(previous, 100.0);
            state.current_step = step;
            state.step_progress = 0.0;
            state.update_total_progress();
            state.snapshot(None)
        };
        self.report(info);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let info = {
            let mut state = self.state.write();
            state.step_progress = progress.clamp(0.0, 100.0);
            state.update_total_progress();
            state.snapshot(details)
        };
        self.report(info);
    }

    /// Отметить `completed` из `total` фрагментов синтеза
    pub fn update_segments(&self, completed: usize, total: usize, details: Option<String>) {
        let info = {
            let mut state = self.state.write();
            state.segments = Some((completed, total));
            state.step_progress = if total == 0 {
                100.0
            } else {
                completed as f32 / total as f32 * 100.0
            };
            state.update_total_progress();
            state.snapshot(details)
        };
        self.report(info);
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        let info = {
            let mut state = self.state.write();
            let current = state.current_step;
            state.completed_steps.insert(current, 100.0);
            state.step_progress = 100.0;
            state.total_progress = 100.0;
            state.snapshot(Some("Процесс завершен".to_string()))
        };
        self.report(info);
    }

    fn report(&self, info: ProgressInfo) {
        if let Some(reporter) = &self.reporter {
            reporter.notify_progress(info);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
