//! Правила замены текста перед синтезом
//!
//! Файл правил построчный: `фраза|что_заменить|на_что`, строки с `#` —
//! комментарии. Правила кэшируются по времени модификации файла.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use log::{debug, error, info, warn};
use parking_lot::RwLock;

/// Разделитель полей в строке правила
const RULE_DELIMITER: char = '|';

/// Правило замены: внутри `context` токен `from` заменяется на ` to `
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    /// Фраза-контекст, при наличии которой срабатывает правило
    pub context: String,
    /// Заменяемый фрагмент внутри фразы
    pub from: String,
    /// Замена (при применении окружается пробелами)
    pub to: String,
}

impl ReplacementRule {
    pub fn new(context: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Применить правило к тексту
    pub fn apply(&self, text: &str) -> String {
        if self.context.is_empty() || !text.contains(&self.context) {
            return text.to_string();
        }
        let padded = format!(" {} ", self.to);
        let modified = self.context.replace(&self.from, &padded);
        debug!("Text replacement: {} -> {}", self.context, modified);
        text.replace(&self.context, &modified)
    }
}

/// Разобрать содержимое файла правил; битые строки пропускаются с предупреждением
pub fn parse_rules(content: &str) -> Vec<ReplacementRule> {
    let mut rules = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split(RULE_DELIMITER).collect();
        match parts.as_slice() {
            [context, from, to] => rules.push(ReplacementRule::new(*context, *from, *to)),
            _ => warn!(
                "Skipping malformed replacement rule at line {}: {}",
                index + 1,
                line
            ),
        }
    }

    rules
}

/// Состояние кэша: время модификации и загруженные правила
#[derive(Debug, Default)]
struct RuleCache {
    last_seen: Option<SystemTime>,
    rules: Arc<Vec<ReplacementRule>>,
}

/// Движок правил замены с кэшем, привязанным к mtime файла
#[derive(Debug)]
pub struct ReplacementRuleEngine {
    path: PathBuf,
    cache: RwLock<RuleCache>,
}

impl ReplacementRuleEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(RuleCache::default()),
        }
    }

    /// Движок без файла правил (текст не изменяется)
    pub fn disabled() -> Self {
        Self::new(PathBuf::new())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Загрузить правила
    ///
    /// Отсутствующий файл даёт пустой список без ошибки. Если время
    /// модификации не увеличилось, возвращается тот же кэшированный список.
    pub fn load(&self) -> Arc<Vec<ReplacementRule>> {
        if self.path.as_os_str().is_empty() {
            return Arc::new(Vec::new());
        }

        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return Arc::new(Vec::new()),
        };

        {
            let cache = self.cache.read();
            if let Some(last_seen) = cache.last_seen {
                if modified <= last_seen {
                    debug!("Replacement rules unchanged, using cache");
                    return Arc::clone(&cache.rules);
                }
            }
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                error!(
                    "Failed to read replacement rules {}: {}",
                    self.path.display(),
                    e
                );
                return Arc::clone(&self.cache.read().rules);
            }
        };

        let rules = Arc::new(parse_rules(&content));
        if !rules.is_empty() {
            info!("Загружено {} правил замены текста", rules.len());
        }

        let mut cache = self.cache.write();
        // Другой поток мог успеть загрузить более свежую версию
        if cache.last_seen.map_or(true, |seen| modified > seen) {
            cache.last_seen = Some(modified);
            cache.rules = Arc::clone(&rules);
        }
        Arc::clone(&cache.rules)
    }

    /// Применить все правила по порядку файла
    pub fn apply(&self, text: &str) -> String {
        let rules = self.load();
        rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
