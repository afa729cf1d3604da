//! Модуль для работы с временными файлами
//!
//! Промежуточные WAV-файлы движка живут во временной директории одного
//! запроса и удаляются вместе с ней.

use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, warn};
use tempfile::TempDir;
use crate::error::Result;

/// Менеджер временных файлов
pub struct TempFileManager {
    /// Временная директория; `None` после `keep()`
    temp_dir: Option<TempDir>,
    /// Путь к директории
    dir_path: PathBuf,
    /// Список созданных файлов
    files: Vec<PathBuf>,
    /// Нужно ли удалять файлы при завершении
    cleanup: bool,
}

impl TempFileManager {
    /// Создать новый экземпляр TempFileManager
    pub fn new(cleanup: bool) -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("tts-script-").tempdir()?;
        let dir_path = temp_dir.path().to_path_buf();

        // Без очистки директория переживает менеджер
        let temp_dir = if cleanup {
            Some(temp_dir)
        } else {
            let kept = temp_dir.keep();
            debug!("Временные файлы сохраняются в {}", kept.display());
            None
        };

        Ok(Self {
            temp_dir,
            dir_path,
            files: Vec::new(),
            cleanup,
        })
    }

    /// Зарезервировать путь для временного файла; сам файл не создаётся
    pub fn temp_file_path(&mut self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        let file_path = self.dir_path.join(file_name);
        self.files.push(file_path.clone());
        file_path
    }

    /// Получить путь к временной директории
    pub fn temp_dir_path(&self) -> &Path {
        &self.dir_path
    }

    /// Количество выданных путей
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Очистить временные файлы
    pub fn cleanup(&mut self) -> Result<()> {
        if self.cleanup {
            for file in &self.files {
                if file.exists() {
                    fs::remove_file(file)?;
                }
            }
            self.files.clear();
        }
        Ok(())
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Не удалось удалить временные файлы: {}", e);
        }
        if let Some(dir) = self.temp_dir.take() {
            let _ = dir.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_removed_on_drop() {
        let (dir, file) = {
            let mut manager = TempFileManager::new(true).unwrap();
            let file = manager.temp_file_path("segment", "wav");
            fs::write(&file, b"data").unwrap();
            assert!(file.starts_with(manager.temp_dir_path()));
            (manager.temp_dir_path().to_path_buf(), file)
        };
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_files_kept_without_cleanup() {
        let (dir, file) = {
            let mut manager = TempFileManager::new(false).unwrap();
            let file = manager.temp_file_path("segment", "wav");
            fs::write(&file, b"data").unwrap();
            (manager.temp_dir_path().to_path_buf(), file)
        };
        assert!(file.exists());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unique_paths() {
        let mut manager = TempFileManager::new(true).unwrap();
        let a = manager.temp_file_path("segment", "wav");
        let b = manager.temp_file_path("segment", "wav");
        assert_ne!(a, b);
        assert_eq!(manager.file_count(), 2);
    }
}
