//! Разбиение сценария на сегменты по дикторам и строкам
//!
//! Строка вида `<Имя>` переключает текущего диктора для всех последующих
//! строк. Каждая пустая строка превращается в отдельный сегмент-паузу.

use std::sync::Arc;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::text::rules::ReplacementRuleEngine;

lazy_static! {
    static ref LEADING_NEWLINES: Regex = Regex::new(r"^[\n\r]+").unwrap();
    static ref QUOTES: Regex = Regex::new(r#"["'*#“”‘’·]"#).unwrap();
    static ref SPEAKER_TAG: Regex = Regex::new(r"^<([^>]+)>$").unwrap();
}

/// Двойное тире, заменяемое на дефис
const DOUBLE_DASH: &str = "——";

/// Содержимое сегмента
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentContent {
    /// Текст для синтеза
    Text(String),
    /// Пауза на месте пустой строки
    Break,
}

/// Сегмент сценария
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Диктор сегмента
    pub speaker: String,
    /// Текст или пауза
    pub content: SegmentContent,
}

impl Segment {
    pub fn text(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: SegmentContent::Text(text.into()),
        }
    }

    pub fn pause(speaker: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: SegmentContent::Break,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self.content, SegmentContent::Break)
    }

    /// Текст сегмента (None для паузы)
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            SegmentContent::Text(text) => Some(text),
            SegmentContent::Break => None,
        }
    }
}

/// Уникальные дикторы в порядке первого появления
pub fn distinct_speakers(segments: &[Segment]) -> Vec<String> {
    let mut speakers: Vec<String> = Vec::new();
    for segment in segments {
        if !speakers.iter().any(|s| s == &segment.speaker) {
            speakers.push(segment.speaker.clone());
        }
    }
    speakers
}

/// Переход автомата разбора для одной строки
enum LineEvent<'a> {
    /// Строка `<Имя>`
    SpeakerTag(&'a str),
    /// Любая другая строка, в том числе пустая
    Content(&'a str),
}

impl<'a> LineEvent<'a> {
    fn classify(line: &'a str) -> Self {
        match SPEAKER_TAG.captures(line).and_then(|c| c.get(1)) {
            Some(name) => LineEvent::SpeakerTag(name.as_str()),
            None => LineEvent::Content(line),
        }
    }
}

/// Превратить накопленные строки в сегменты одного диктора
pub fn flush<S: AsRef<str>>(speaker: &str, lines: &[S]) -> Vec<Segment> {
    lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            if line.is_empty() {
                Segment::pause(speaker)
            } else {
                Segment::text(speaker, line)
            }
        })
        .collect()
}

/// Сегментатор сценария
pub struct ScriptSegmenter {
    rules: Arc<ReplacementRuleEngine>,
}

impl ScriptSegmenter {
    pub fn new(rules: Arc<ReplacementRuleEngine>) -> Self {
        Self { rules }
    }

    /// Нормализовать текст: убрать ведущие пустые строки, кавычки,
    /// заменить двойное тире и применить правила замены
    pub fn normalize(&self, raw: &str) -> String {
        let text = LEADING_NEWLINES.replace(raw, "");
        let text = QUOTES.replace_all(&text, "");
        let text = text.replace(DOUBLE_DASH, "-");
        self.rules.apply(&text)
    }

    /// Разбить сценарий на сегменты
    pub fn segment(&self, raw: &str, default_speaker: &str) -> Vec<Segment> {
        if raw.is_empty() {
            return Vec::new();
        }

        let text = self.normalize(raw);

        let mut segments = Vec::new();
        let mut current_speaker = default_speaker.to_string();
        let mut buffer: Vec<&str> = Vec::new();

        for line in text.split('\n').map(str::trim) {
            match LineEvent::classify(line) {
                LineEvent::SpeakerTag(name) => {
                    segments.extend(flush(&current_speaker, &buffer));
                    buffer.clear();
                    current_speaker = name.to_string();
                }
                LineEvent::Content(line) => buffer.push(line),
            }
        }
        segments.extend(flush(&current_speaker, &buffer));

        debug!("Script split into {} segments", segments.len());
        segments
    }
}
