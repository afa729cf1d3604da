//! Эталонные записи голосов (prompt audio)
//!
//! Каждый обычный файл в директории prompts считается эталоном. Имя диктора
//! берётся из имени файла до первого `_`; при нескольких файлах одного диктора
//! используется первый по алфавиту.

use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use parking_lot::RwLock;
use walkdir::WalkDir;
use crate::error::{Result, TtsScriptError};
use crate::settings::NO_SPEAKER;

/// Источник эталонных записей по имени диктора
pub trait PromptProvider: Send + Sync {
    /// Путь к эталону диктора, если он есть
    fn resolve(&self, speaker: &str) -> Option<PathBuf>;
}

/// Найденный эталон
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Имя диктора по имени файла эталона
pub fn speaker_name_from_file(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = stem.split('_').next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

/// Эталоны из директории на диске
pub struct DirectoryPromptProvider {
    dir: PathBuf,
    entries: RwLock<Vec<PromptEntry>>,
}

impl DirectoryPromptProvider {
    /// Создать провайдер и сразу просканировать директорию
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let provider = Self {
            dir: dir.into(),
            entries: RwLock::new(Vec::new()),
        };
        if let Err(e) = provider.refresh() {
            warn!("Не удалось прочитать директорию эталонов {}: {}", provider.dir.display(), e);
        }
        provider
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Пересканировать директорию
    pub fn refresh(&self) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        if self.dir.is_dir() {
            let walker = WalkDir::new(&self.dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|e| TtsScriptError::Io(e.into()))?;
                if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                if let Some(name) = speaker_name_from_file(entry.path()) {
                    entries.push(PromptEntry {
                        name,
                        path: entry.path().to_path_buf(),
                    });
                }
            }
        }

        debug!("Prompt files: {:?}", entries.iter().map(|e| &e.path).collect::<Vec<_>>());
        *self.entries.write() = entries;
        Ok(self.names())
    }

    /// Список для выбора диктора: `"none"` и все найденные дикторы
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read();
        std::iter::once(NO_SPEAKER.to_string())
            .chain(entries.iter().map(|e| e.name.clone()))
            .collect()
    }

    pub fn entries(&self) -> Vec<PromptEntry> {
        self.entries.read().clone()
    }

    /// Добавить эталон диктора: файл копируется как `<name>_<имя файла>`
    pub fn add_prompt(&self, name: &str, source: &Path) -> Result<PathBuf> {
        if name.is_empty() || name.contains(&['_', '/', '\\'][..]) || name == NO_SPEAKER {
            return Err(TtsScriptError::Other(format!("Недопустимое имя диктора: {:?}", name)));
        }
        if !source.is_file() {
            return Err(TtsScriptError::FileNotFound(source.display().to_string()));
        }
        let file_name = source
            .file_name()
            .ok_or_else(|| TtsScriptError::FileNotFound(source.display().to_string()))?
            .to_string_lossy();

        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(format!("{}_{}", name, file_name));
        std::fs::copy(source, &target)?;
        info!("Добавлен эталон диктора {}: {}", name, target.display());

        self.refresh()?;
        Ok(target)
    }

    /// Удалить все эталоны диктора; возвращает количество удалённых файлов
    pub fn remove_prompt(&self, name: &str) -> Result<usize> {
        let targets: Vec<PathBuf> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.path.clone())
            .collect();

        for path in &targets {
            std::fs::remove_file(path)?;
            info!("Удален эталон: {}", path.display());
        }

        self.refresh()?;
        Ok(targets.len())
    }
}

impl PromptProvider for DirectoryPromptProvider {
    fn resolve(&self, speaker: &str) -> Option<PathBuf> {
        self.entries
            .read()
            .iter()
            .find(|e| e.name == speaker)
            .map(|e| e.path.clone())
    }
}
