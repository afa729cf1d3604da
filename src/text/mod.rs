//! Подготовка текста сценария: правила замены и разбиение по дикторам

pub mod rules;
pub mod segmenter;

pub use rules::{parse_rules, ReplacementRule, ReplacementRuleEngine};
pub use segmenter::{distinct_speakers, flush, ScriptSegmenter, Segment, SegmentContent};
