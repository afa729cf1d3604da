//! Аудиобуфер с раскладкой по каналам и ресемплинг через Rubato

use log::{debug, info};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use crate::error::{Result, TtsScriptError};

/// PCM-буфер (f32, [-1.0, 1.0]), каналы хранятся отдельными векторами
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Частота дискретизации в Гц
    pub sample_rate: u32,
    /// Сэмплы по каналам; все каналы одной длины
    pub channels: Vec<Vec<f32>>,
}

impl Waveform {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TtsScriptError::AudioProcessing("sample rate must be > 0".to_string()));
        }
        if channels.is_empty() {
            return Err(TtsScriptError::AudioProcessing("waveform has no channels".to_string()));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(TtsScriptError::AudioProcessing(
                "all channels must have the same length".to_string(),
            ));
        }
        Ok(Self { sample_rate, channels })
    }

    /// Одноканальный буфер
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    /// Тишина заданной длины в сэмплах
    pub fn silence(sample_rate: u32, channel_count: usize, len: usize) -> Self {
        Self {
            sample_rate,
            channels: vec![vec![0.0; len]; channel_count.max(1)],
        }
    }

    /// Тишина заданной длительности: `round(sample_rate * seconds)` сэмплов
    pub fn silence_for(sample_rate: u32, channel_count: usize, seconds: f32) -> Self {
        let len = (sample_rate as f64 * seconds.max(0.0) as f64).round() as usize;
        Self::silence(sample_rate, channel_count, len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Количество сэмплов на канал
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Длительность в секундах
    pub fn duration_seconds(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Дописать другой буфер в конец (частота и число каналов должны совпадать)
    pub fn append(&mut self, other: &Waveform) -> Result<()> {
        if other.sample_rate != self.sample_rate {
            return Err(TtsScriptError::AudioProcessing(format!(
                "sample rate mismatch: {} vs {}",
                self.sample_rate, other.sample_rate
            )));
        }
        if other.channel_count() != self.channel_count() {
            return Err(TtsScriptError::AudioProcessing(format!(
                "channel count mismatch: {} vs {}",
                self.channel_count(),
                other.channel_count()
            )));
        }
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Пересчитать буфер в другую частоту дискретизации
    pub fn resample(&self, target_rate: u32) -> Result<Waveform> {
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }
        if target_rate == 0 {
            return Err(TtsScriptError::Resampling("target sample rate must be > 0".to_string()));
        }
        if self.is_empty() {
            return Ok(Waveform::silence(target_rate, self.channel_count(), 0));
        }

        info!(
            "Resampling {} samples from {} Hz to {} Hz",
            self.len(),
            self.sample_rate,
            target_rate
        );

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let expected_len = (self.len() as f64 * ratio).round() as usize;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        // Весь буфер подаётся одним блоком
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, self.len(), self.channel_count())
            .map_err(|e| TtsScriptError::Resampling(format!("Ошибка инициализации Rubato: {}", e)))?;

        let delay = resampler.output_delay();
        let mut output = resampler
            .process(&self.channels, None)
            .map_err(|e| TtsScriptError::Resampling(format!("Ошибка в процессе ресемплинга: {}", e)))?;

        // Досчитываем хвост, задержанный фильтром
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| TtsScriptError::Resampling(format!("Ошибка в процессе ресемплинга: {}", e)))?;
        for (channel, rest) in output.iter_mut().zip(tail) {
            channel.extend(rest);
        }

        let channels = output
            .into_iter()
            .map(|channel| {
                let mut aligned: Vec<f32> = channel.into_iter().skip(delay).take(expected_len).collect();
                aligned.resize(expected_len, 0.0);
                aligned
            })
            .collect();

        debug!("Resampled to {} samples", expected_len);
        Ok(Waveform {
            sample_rate: target_rate,
            channels,
        })
    }
}
