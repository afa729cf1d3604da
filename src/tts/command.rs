//! Синтез через внешнюю команду
//!
//! Движок запускается как отдельный процесс и пишет WAV во временный файл,
//! который затем читается в память.

use lazy_static::lazy_static;
use log::{debug, error, info};
use regex::{Captures, Regex};
use tokio::process::Command as TokioCommand;
use crate::config::EngineCommandConfig;
use crate::error::{Result, TtsScriptError};
use crate::media::{decode_wav, Waveform};
use crate::tts::{SpeechSynthesizer, SynthesisRequest};
use crate::utils::temp::TempFileManager;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{(prompt|text|output|mode|version|max_tokens|silence)\}").unwrap();
}

/// Движок, вызываемый как внешняя программа
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    cleanup_temp_files: bool,
}

impl CommandSynthesizer {
    pub fn new(config: &EngineCommandConfig, cleanup_temp_files: bool) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            cleanup_temp_files,
        }
    }

    /// Подставить значения запроса в шаблон аргументов
    pub fn expand_args(&self, request: &SynthesisRequest, output: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                PLACEHOLDER
                    .replace_all(arg, |caps: &Captures| match &caps[1] {
                        "prompt" => request.prompt_path.to_string_lossy().to_string(),
                        "text" => request.text.clone(),
                        "output" => output.to_string(),
                        "mode" => request.mode.as_str().to_string(),
                        "version" => request.settings.tts_version.to_string(),
                        "max_tokens" => request.settings.max_text_tokens_per_sentence.to_string(),
                        "silence" => request.settings.silence_duration.to_string(),
                        _ => caps[0].to_string(),
                    })
                    .into_owned()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Waveform> {
        let mut temp = TempFileManager::new(self.cleanup_temp_files)?;
        let output_path = temp.temp_file_path("segment", "wav");
        let args = self.expand_args(request, &output_path.to_string_lossy());

        debug!("Running TTS engine: {} {:?}", self.program, args);
        let output = TokioCommand::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| TtsScriptError::Synthesis(format!("Failed to start {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("TTS engine failed ({}): {}", output.status, stderr.trim());
            return Err(TtsScriptError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if !output_path.exists() {
            return Err(TtsScriptError::Synthesis(format!(
                "{} produced no output file",
                self.program
            )));
        }

        let waveform = decode_wav(&output_path)
            .map_err(|e| TtsScriptError::Synthesis(format!("Unreadable engine output: {}", e)))?;
        info!(
            "Синтезирован фрагмент: {:.2} с, {} Гц",
            waveform.duration_seconds(),
            waveform.sample_rate
        );
        Ok(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::media::encode_wav;
    use crate::settings::{SpeakerSettings, TtsVersion};
    use crate::tts::InferenceMode;

    fn request(prompt: PathBuf) -> SynthesisRequest {
        SynthesisRequest {
            prompt_path: prompt,
            text: "Hello.".to_string(),
            mode: InferenceMode::Batch,
            settings: SpeakerSettings {
                tts_version: TtsVersion::V1_5,
                max_text_tokens_per_sentence: 120,
                ..SpeakerSettings::default()
            },
        }
    }

    fn engine(program: &str, args: &[&str]) -> CommandSynthesizer {
        let config = EngineCommandConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };
        CommandSynthesizer::new(&config, true)
    }

    #[test]
    fn test_text_is_not_expanded_twice() {
        let synth = engine("indextts", &["{text}", "{output}"]);
        let mut req = request(PathBuf::from("p.wav"));
        req.text = "say {output} literally".to_string();
        let args = synth.expand_args(&req, "/tmp/x.wav");
        assert_eq!(args, vec!["say {output} literally", "/tmp/x.wav"]);
    }

    #[test]
    fn test_placeholder_expansion() {
        let synth = engine(
            "indextts",
            &["--voice", "{prompt}", "-o={output}", "{mode}", "v{version}", "{max_tokens}", "{silence}", "{text}"],
        );
        let args = synth.expand_args(&request(PathBuf::from("prompts/Hero_a.wav")), "/tmp/x.wav");
        assert_eq!(
            args,
            vec!["--voice", "prompts/Hero_a.wav", "-o=/tmp/x.wav", "batch", "v1.5", "120", "0.3", "Hello."]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_output_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = dir.path().join("prompt.wav");
        encode_wav(&Waveform::mono(24000, vec![0.25; 480]), &prompt).unwrap();

        let synth = engine("cp", &["{prompt}", "{output}"]);
        let wave = synth.synthesize(&request(prompt)).await.unwrap();
        assert_eq!(wave.sample_rate, 24000);
        assert_eq!(wave.len(), 480);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_failure_carries_stderr() {
        let synth = engine("sh", &["-c", "echo model exploded >&2; exit 3"]);
        let err = synth.synthesize(&request(PathBuf::from("p.wav"))).await.unwrap_err();
        match err {
            TtsScriptError::Synthesis(msg) => assert!(msg.contains("model exploded")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_is_an_error() {
        let synth = engine("true", &[]);
        let err = synth.synthesize(&request(PathBuf::from("p.wav"))).await.unwrap_err();
        assert!(matches!(err, TtsScriptError::Synthesis(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_segment_temp_dir_is_removed_after_call() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = dir.path().join("prompt.wav");
        let marker = dir.path().join("output_path.txt");
        encode_wav(&Waveform::mono(24000, vec![0.25; 480]), &prompt).unwrap();

        let marker_arg = marker.to_string_lossy().to_string();
        let synth = engine(
            "sh",
            &["-c", r#"cp "$1" "$2" && printf %s "$2" > "$3""#, "sh", "{prompt}", "{output}", marker_arg.as_str()],
        );
        synth.synthesize(&request(prompt)).await.unwrap();

        let engine_output = PathBuf::from(std::fs::read_to_string(&marker).unwrap());
        assert!(!engine_output.exists());
        assert!(!engine_output.parent().unwrap().exists());
    }
}
