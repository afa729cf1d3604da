//! CLI для озвучивания сценария

use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tts_script::config::TtsScriptConfig;
use tts_script::notification::ConsoleProgressObserver;
use tts_script::orchestrator::SynthesisJob;
use tts_script::progress::ProgressObserver;
use tts_script::prompt::PromptProvider;
use tts_script::queue::RunEvent;
use tts_script::settings::NO_SPEAKER;
use tts_script::tts::InferenceMode;
use tts_script::utils::init_logger;
use tts_script::TtsScript;

/// Озвучить сценарий с несколькими дикторами в один WAV-файл
#[derive(Parser)]
#[command(name = "tts-script", version)]
#[command(about = "Synthesize a multi-speaker script into one WAV file")]
struct Cli {
    /// Файл сценария
    #[arg(short, long)]
    script: PathBuf,

    /// Диктор для строк до первого тега <Имя>
    #[arg(long, default_value = NO_SPEAKER)]
    speaker: String,

    /// Эталонная запись для дикторов без своей записи
    #[arg(short, long)]
    prompt: Option<PathBuf>,

    /// Режим инференса: normal или batch
    #[arg(short, long, default_value = "normal")]
    mode: InferenceMode,

    /// JSON-файл конфигурации
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Фильтр логов в формате RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level.as_deref());

    let config = match &cli.config {
        Some(path) => TtsScriptConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TtsScriptConfig::default(),
    };
    let app = TtsScript::new(config)?;

    let text = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("Failed to read script {}", cli.script.display()))?;

    let fallback_prompt = cli
        .prompt
        .clone()
        .or_else(|| app.prompts().resolve(&cli.speaker))
        .ok_or_else(|| anyhow!("No prompt audio for speaker {:?}; pass --prompt", cli.speaker))?;

    let job = SynthesisJob {
        default_speaker: cli.speaker.clone(),
        fallback_prompt,
        text,
        mode: cli.mode,
        global_settings: app.settings().global(),
    };

    let mut handle = app.spawn(job)?;
    let console = ConsoleProgressObserver::new();
    while let Some(event) = handle.events.recv().await {
        match event {
            RunEvent::Progress(progress) => console.on_progress_update(progress),
            RunEvent::Failed(message) => log::error!("Синтез прерван: {}", message),
            RunEvent::Completed(_) => {}
        }
    }

    let output = handle.wait().await?;
    println!("{}", output.output_path.display());
    Ok(())
}
