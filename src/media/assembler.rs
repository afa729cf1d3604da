//! Сборка итоговой записи и запись результата на диск

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use log::{info, warn};
use tempfile::NamedTempFile;
use crate::error::{Result, TtsScriptError};
use crate::media::wav::write_wav;
use crate::media::waveform::Waveform;
use crate::settings::TtsVersion;

/// Максимальная длина фрагмента текста в имени файла, символы
pub const EXCERPT_MAX_CHARS: usize = 50;

/// Максимальная длина имени файла, байты
pub const MAX_FILE_NAME_BYTES: usize = 255;

const RESERVED_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Склеить буферы по оси сэмплов, приводя частоту к `target_rate`
pub fn concatenate(buffers: &[Waveform], target_rate: u32) -> Result<Waveform> {
    let channel_count = buffers.first().map_or(1, Waveform::channel_count);
    let mut result = Waveform::silence(target_rate, channel_count, 0);

    for (index, buffer) in buffers.iter().enumerate() {
        if buffer.channel_count() != channel_count {
            return Err(TtsScriptError::AudioProcessing(format!(
                "buffer {} has {} channels, expected {}",
                index,
                buffer.channel_count(),
                channel_count
            )));
        }
        if buffer.sample_rate != target_rate {
            warn!(
                "Buffer {} has sample rate {} Hz, resampling to {} Hz",
                index, buffer.sample_rate, target_rate
            );
            result.append(&buffer.resample(target_rate)?)?;
        } else {
            result.append(buffer)?;
        }
    }

    Ok(result)
}

/// Подготовить фрагмент текста для имени файла
pub fn sanitize_excerpt(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | ' '))
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .take(EXCERPT_MAX_CHARS)
        .collect()
}

/// Описание набора дикторов: имя единственного диктора или `<первый>_multi`
pub fn speaker_descriptor(speakers: &[String]) -> Option<String> {
    match speakers {
        [] => None,
        [single] => Some(single.clone()),
        [first, ..] => Some(format!("{}_multi", first)),
    }
}

/// Метка времени для имени файла
pub fn file_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

fn try_output_file_name(speakers: &[String], text: &str, version: TtsVersion, timestamp: &str) -> Option<String> {
    let descriptor = speaker_descriptor(speakers)?;
    if descriptor.contains(RESERVED_CHARS) {
        return None;
    }
    let name = format!(
        "[{}][{}][{}]{}.wav",
        descriptor,
        version,
        timestamp,
        sanitize_excerpt(text)
    );
    (name.len() <= MAX_FILE_NAME_BYTES).then_some(name)
}

/// Имя выходного файла `[<дикторы>][<версия>][<время>]<текст>.wav`
///
/// Если имя построить нельзя, используется `audio_<время>.wav`.
pub fn output_file_name(speakers: &[String], text: &str, version: TtsVersion, timestamp: &str) -> String {
    try_output_file_name(speakers, text, version, timestamp).unwrap_or_else(|| {
        warn!("Не удалось построить имя файла, используется имя по умолчанию");
        format!("audio_{}.wav", timestamp)
    })
}

/// Записать итоговый буфер в `output_dir`, создав директорию при необходимости
pub fn write_output(
    output_dir: &Path,
    waveform: &Waveform,
    speakers: &[String],
    text: &str,
    version: TtsVersion,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let timestamp = file_timestamp(&Local::now());
    let output_path = output_dir.join(output_file_name(speakers, text, version, &timestamp));
    write_atomically(&output_path, |file| write_wav(waveform, BufWriter::new(file)))?;
    info!(
        "Итоговая запись сохранена: {} ({} семплов, {} Гц)",
        output_path.display(),
        waveform.len(),
        waveform.sample_rate
    );
    Ok(output_path)
}

/// Записать файл через временный файл в той же директории
///
/// При ошибке записи временный файл удаляется, итоговый путь не появляется.
fn write_atomically<F>(output_path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    write(file.as_file_mut())?;
    file.as_file().sync_all()?;
    file.persist(output_path)
        .map_err(|e| TtsScriptError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assembly_order() {
        let b1 = Waveform::mono(24000, vec![0.1, 0.2, 0.3]);
        let silence = Waveform::silence_for(24000, 1, 0.3);
        let b2 = Waveform::mono(24000, vec![-0.4, -0.5]);

        let joined = concatenate(&[b1.clone(), silence.clone(), b2.clone()], 24000).unwrap();
        let out = &joined.channels[0];

        assert_eq!(joined.len(), 3 + 7200 + 2);
        assert_eq!(&out[..3], &b1.channels[0][..]);
        assert!(out[3..3 + 7200].iter().all(|&s| s == 0.0));
        assert_eq!(&out[3 + 7200..], &b2.channels[0][..]);
    }

    #[test]
    fn test_mismatched_rate_is_resampled() {
        let b1 = Waveform::mono(24000, vec![0.0; 2400]);
        let b2 = Waveform::mono(12000, vec![0.0; 1200]);
        let joined = concatenate(&[b1, b2], 24000).unwrap();
        assert_eq!(joined.sample_rate, 24000);
        assert_eq!(joined.len(), 4800);
    }

    #[test]
    fn test_channel_mismatch_is_fatal() {
        let b1 = Waveform::mono(24000, vec![0.0; 10]);
        let b2 = Waveform::silence(24000, 2, 10);
        assert!(matches!(
            concatenate(&[b1, b2], 24000),
            Err(TtsScriptError::AudioProcessing(_))
        ));
    }

    #[test]
    fn test_sanitize_excerpt() {
        assert_eq!(sanitize_excerpt("  a b\r\nc:d/e?  "), "abc_d_e_");
        let long = "字".repeat(80);
        assert_eq!(sanitize_excerpt(&long).chars().count(), EXCERPT_MAX_CHARS);
    }

    #[test]
    fn test_output_file_name() {
        let ts = file_timestamp(&Local.with_ymd_and_hms(2024, 5, 1, 13, 2, 3).unwrap());
        assert_eq!(ts, "20240501130203");

        let single = output_file_name(&names(&["Narrator"]), "Hello. World", TtsVersion::V1, &ts);
        assert_eq!(single, "[Narrator][1][20240501130203]Hello.World.wav");

        let multi = output_file_name(&names(&["Narrator", "Hero"]), "Go!", TtsVersion::V1_5, &ts);
        assert_eq!(multi, "[Narrator_multi][1.5][20240501130203]Go!.wav");
    }

    #[test]
    fn test_output_file_name_fallback() {
        let ts = "20240501130203";
        assert_eq!(output_file_name(&[], "text", TtsVersion::V1, ts), "audio_20240501130203.wav");

        let huge = names(&[&"x".repeat(300)]);
        assert_eq!(output_file_name(&huge, "text", TtsVersion::V1, ts), "audio_20240501130203.wav");

        let bad = names(&["a/b"]);
        assert_eq!(output_file_name(&bad, "text", TtsVersion::V1, ts), "audio_20240501130203.wav");
    }

    #[test]
    fn test_write_output_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("outputs");
        let wave = Waveform::mono(24000, vec![0.0; 240]);

        let path = write_output(&out_dir, &wave, &names(&["Hero"]), "Go!", TtsVersion::V1).unwrap();
        assert!(path.starts_with(&out_dir));
        assert!(path.exists());
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("[Hero][1]["));
        assert!(file_name.ends_with("]Go!.wav"));
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("[Hero][1][20240101000000]Go!.wav");

        let result = write_atomically(&target, |file| {
            use std::io::Write;
            file.write_all(b"RIFF")?;
            Err(TtsScriptError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            )))
        });

        assert!(matches!(result, Err(TtsScriptError::Io(_))));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Директория на месте итогового файла не даёт переименовать
        let target = dir.path().join("taken.wav");
        std::fs::create_dir(&target).unwrap();
        let wave = Waveform::mono(24000, vec![0.1; 240]);

        let result = write_atomically(&target, |file| write_wav(&wave, BufWriter::new(file)));

        assert!(result.is_err());
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
