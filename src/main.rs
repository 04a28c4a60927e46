use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyword_session::{
    load_keyword_model, AudioDescriptor, AudioFile, Config, FileAudioProvider,
    FileKeywordModelLoader, Script, ScriptedEngineFactory, SessionController, SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "keyword-session", version, about = "Keyword-triggered speech session controller")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/keyword-session")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one session against a scripted engine
    Run {
        /// JSON engine script
        #[arg(long)]
        script: PathBuf,

        /// WAV file overriding the configured audio input
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Stop the session after this many seconds
        #[arg(long, default_value_t = 10)]
        duration_secs: u64,
    },
    /// Print the metadata of a WAV file
    Info { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Info { path } => {
            let audio = AudioFile::open(&path)?;
            info!("Path: {}", audio.path);
            info!("Duration: {:.1} seconds", audio.duration_seconds);
            info!("Sample rate: {} Hz", audio.sample_rate);
            info!("Channels: {}", audio.channels);
            info!("Bits per sample: {}", audio.bits_per_sample);
            if !audio.is_speech_format() {
                warn!("Recognition engines usually expect 16kHz 16-bit mono audio");
            }
            Ok(())
        }
        Command::Run {
            script,
            audio,
            duration_secs,
        } => {
            let cfg = Config::load(&cli.config)?;
            run(cfg, script, audio, Duration::from_secs(duration_secs)).await
        }
    }
}

async fn run(
    cfg: Config,
    script: PathBuf,
    audio: Option<PathBuf>,
    duration: Duration,
) -> Result<()> {
    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let source = match audio {
        Some(path) => AudioDescriptor::File(path),
        None => cfg.audio_descriptor()?,
    };
    let script = Script::load(&script)?;
    let model = load_keyword_model(&FileKeywordModelLoader, &cfg.keyword.model_path).await?;

    let controller = SessionController::new(
        Arc::new(FileAudioProvider::new()),
        Arc::new(ScriptedEngineFactory::new(script)),
    );

    let mut transcript = controller.watch_transcript();
    let display = tokio::spawn(async move {
        while transcript.changed().await.is_ok() {
            let lines = transcript.borrow_and_update().join("\n");
            println!("{}\n", lines);
        }
    });

    controller
        .start(cfg.session_config(), source, model)
        .await
        .context("Failed to start keyword session")?;

    let mut state = controller.watch_state();
    tokio::select! {
        _ = tokio::time::sleep(duration) => info!("Session time elapsed"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = state.wait_for(|s| *s == SessionState::Idle) => warn!("Session ended on its own"),
    }

    controller.stop().await.context("Failed to stop keyword session")?;

    let stats = controller.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    display.abort();
    Ok(())
}
