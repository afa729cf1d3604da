//! Масштабирование пауз внутри синтезированного фрагмента
//!
//! Паузы ищутся по порогу амплитуды; каждая найденная пауза заменяется нулями
//! длиной `floor(len * rate)`. Сглаживание на стыках не выполняется.

use log::{debug, warn};
use crate::error::{Result, TtsScriptError};
use crate::media::waveform::Waveform;

/// Участок тишины `[start, end)` в сэмплах
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceRegion {
    pub start: usize,
    pub end: usize,
}

impl SilenceRegion {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Длина участка после масштабирования
    pub fn scaled_len(&self, rate: f32) -> usize {
        (self.len() as f64 * rate as f64).floor() as usize
    }
}

/// Результат масштабирования
#[derive(Debug)]
pub struct RescaleOutcome {
    pub waveform: Waveform,
    pub regions: Vec<SilenceRegion>,
    /// Несовпадение формы при пересборке; в этом случае возвращён исходный буфер
    pub warning: Option<TtsScriptError>,
}

impl RescaleOutcome {
    fn unchanged(waveform: &Waveform, regions: Vec<SilenceRegion>) -> Self {
        Self {
            waveform: waveform.clone(),
            regions,
            warning: None,
        }
    }
}

/// Найти участки тишины не короче `min_silence_seconds`
pub fn detect_silence_regions(
    samples: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
    min_silence_seconds: f64,
) -> Vec<SilenceRegion> {
    let min_len = min_silence_seconds.max(0.0) * sample_rate as f64;
    let long_enough = |run: usize| run > 0 && run as f64 >= min_len;

    let mut regions = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, sample) in samples.iter().enumerate() {
        let silent = sample.abs() < amplitude_threshold;
        match (silent, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                if long_enough(i - start) {
                    regions.push(SilenceRegion { start, end: i });
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if long_enough(samples.len() - start) {
            regions.push(SilenceRegion { start, end: samples.len() });
        }
    }

    regions
}

/// Пересобрать одноканальный буфер, заменив каждый участок тишины нулями новой длины
pub fn apply_regions(waveform: &Waveform, regions: &[SilenceRegion], rate: f32) -> Result<Waveform> {
    let samples = waveform
        .channels
        .first()
        .ok_or_else(|| TtsScriptError::AudioProcessing("waveform has no channels".to_string()))?;

    let mut cursor = 0;
    for region in regions {
        if region.start < cursor || region.end < region.start || region.end > samples.len() {
            return Err(TtsScriptError::SilenceRescaleShapeMismatch {
                expected: samples.len(),
                actual: region.end,
            });
        }
        cursor = region.end;
    }

    let removed: usize = regions.iter().map(SilenceRegion::len).sum();
    let added: usize = regions.iter().map(|r| r.scaled_len(rate)).sum();
    let expected = samples.len() - removed + added;

    let mut rebuilt = Vec::with_capacity(expected);
    let mut cursor = 0;
    for region in regions {
        rebuilt.extend_from_slice(&samples[cursor..region.start]);
        rebuilt.resize(rebuilt.len() + region.scaled_len(rate), 0.0);
        cursor = region.end;
    }
    rebuilt.extend_from_slice(&samples[cursor..]);

    if rebuilt.len() != expected {
        return Err(TtsScriptError::SilenceRescaleShapeMismatch {
            expected,
            actual: rebuilt.len(),
        });
    }

    Ok(Waveform::mono(waveform.sample_rate, rebuilt))
}

/// Масштабировать паузы в буфере
///
/// Многоканальные буферы и `rate == 1.0` возвращаются без изменений. Ошибка
/// пересборки не прерывает работу: возвращается исходный буфер и предупреждение.
pub fn rescale(
    waveform: &Waveform,
    amplitude_threshold: f32,
    min_silence_seconds: f64,
    rate: f32,
) -> RescaleOutcome {
    if waveform.channel_count() != 1 {
        debug!("Skipping silence rescale for {}-channel buffer", waveform.channel_count());
        return RescaleOutcome::unchanged(waveform, Vec::new());
    }

    let regions = detect_silence_regions(
        &waveform.channels[0],
        waveform.sample_rate,
        amplitude_threshold,
        min_silence_seconds,
    );

    if regions.is_empty() || rate == 1.0 {
        return RescaleOutcome::unchanged(waveform, regions);
    }

    match apply_regions(waveform, &regions, rate) {
        Ok(rescaled) => {
            debug!(
                "Rescaled {} silence regions: {} -> {} samples",
                regions.len(),
                waveform.len(),
                rescaled.len()
            );
            RescaleOutcome {
                waveform: rescaled,
                regions,
                warning: None,
            }
        }
        Err(e) => {
            warn!("Масштабирование тишины отменено: {}", e);
            RescaleOutcome {
                waveform: waveform.clone(),
                regions,
                warning: Some(e),
            }
        }
    }
}
