//! # WAV Format Handling
//!
//! Кодирование и декодирование WAV через hound. Запись всегда идёт в
//! 16-битном целочисленном PCM с чередованием каналов.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;
use crate::error::{Result, TtsScriptError};
use crate::media::waveform::Waveform;

/// Разрядность выходного файла
pub const OUTPUT_BITS_PER_SAMPLE: u16 = 16;

/// Декодирует WAV-файл в буфер по каналам.
///
/// Поддерживаются 8/16/24/32-битные целочисленные и 32-битные float файлы.
pub fn decode_wav<P: AsRef<Path>>(file_path: P) -> Result<Waveform> {
    let mut reader = WavReader::open(file_path.as_ref())?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        _ => {
            return Err(TtsScriptError::AudioProcessing(format!(
                "Неподдерживаемый формат WAV: {:?}, {} бит",
                spec.sample_format, spec.bits_per_sample
            )));
        }
    };

    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    Waveform::new(spec.sample_rate, channels)
}

/// Кодирует буфер в WAV-файл (16 бит, целочисленный PCM).
pub fn encode_wav<P: AsRef<Path>>(waveform: &Waveform, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    let file = File::create(output_path)?;
    write_wav(waveform, BufWriter::new(file))?;

    info!(
        "Сохранен WAV-файл: {} ({} семплов, {} Гц, {} кан.)",
        output_path.display(),
        waveform.len(),
        waveform.sample_rate,
        waveform.channel_count()
    );
    Ok(())
}

/// Кодирует буфер в произвольный поток
pub fn write_wav<W: Write + Seek>(waveform: &Waveform, writer: W) -> Result<()> {
    let spec = WavSpec {
        channels: waveform.channel_count() as u16,
        sample_rate: waveform.sample_rate,
        bits_per_sample: OUTPUT_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::new(writer, spec)?;
    for frame in 0..waveform.len() {
        for channel in &waveform.channels {
            writer.write_sample(to_pcm16(channel[frame]))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
