use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use poserec_cli::config::{default_config_path, Settings};
use poserec_cli::motion::{LogRenderer, SyntheticSource};
use poserec_cli::recording::{PlaybackSession, RecordingManager, RecordingSession};
use poserec_cli::{Cli, Command, PlayArgs, RecordArgs, VERSION};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    log::debug!("poserec {}", VERSION);

    let config_path = args.config.clone().or_else(default_config_path);
    let settings = match &config_path {
        Some(path) => Settings::load_or_default(path)?,
        None => {
            warn!("No config directory found, using default settings");
            Settings::default()
        }
    };

    match args.command {
        Command::Record(record) => run_record(settings, record).await,
        Command::Play(play) => run_play(settings, play).await,
        Command::List { json } => list(json),
        Command::Info { name } => show_info(&name),
        Command::Delete { name } => {
            RecordingManager::new().delete_recording(&name)?;
            Ok(())
        }
        Command::Rename { name, new_name } => {
            RecordingManager::new().rename_recording(&name, &new_name)?;
            Ok(())
        }
        Command::Settings { save } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if save {
                let Some(path) = config_path else {
                    bail!("No settings file location, pass --config");
                };
                settings.save(&path)?;
            }
            Ok(())
        }
    }
}

async fn run_record(mut settings: Settings, args: RecordArgs) -> Result<()> {
    args.apply(&mut settings.recorder);

    // A name generates a fresh file in the recordings directory, unless an
    // output file was given as well
    if args.output.is_none() && (args.name.is_some() || settings.recorder.destination.is_none()) {
        let manager = RecordingManager::new();
        let filename = manager.generate_filename(args.name.as_deref());
        settings.recorder.destination = Some(manager.get_recording_path(&filename));
    }

    let limit = match args.seconds {
        Some(seconds) => Some(
            Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("Invalid duration: {}s", seconds))?,
        ),
        None => None,
    };

    let step = settings.recorder.sample_period()?.as_secs_f64();
    let source = SyntheticSource::new(args.joints, step);
    let mut session = RecordingSession::new(source, &settings.recorder)?;

    let summary = session
        .run(async move {
            match limit {
                Some(limit) => {
                    tokio::select! {
                        _ = tokio::time::sleep(limit) => {}
                        _ = ctrl_c() => {}
                    }
                }
                None => ctrl_c().await,
            }
        })
        .await
        .context("Recording failed")?;

    println!(
        "{} ({} frames, {:.3}s)",
        session
            .recorder()
            .destination()
            .map(|d| d.path().display().to_string())
            .unwrap_or_default(),
        summary.frame_count,
        summary.duration
    );
    Ok(())
}

async fn run_play(mut settings: Settings, args: PlayArgs) -> Result<()> {
    let manager = RecordingManager::new();
    args.apply(&mut settings.player, |name| manager.resolve(name));

    let mut session = PlaybackSession::open(LogRenderer::new(), &settings.player)?;
    let status = session.run(ctrl_c()).await.context("Playback failed")?;

    info!(
        "Applied {} poses, {:.0}% played",
        session.player().renderer().applied(),
        status.progress * 100.0
    );
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let manager = RecordingManager::new();
    let recordings = manager.list_recordings();

    if json {
        println!("{}", serde_json::to_string_pretty(&recordings)?);
        return Ok(());
    }

    if recordings.is_empty() {
        println!("No recordings in {}", manager.base_dir().display());
        return Ok(());
    }
    for info in recordings {
        let modified = chrono::DateTime::from_timestamp_millis(info.modified_ms as i64)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{:<48} {:>7} frames {:>9.3}s {:>10} bytes  {}",
            info.filename, info.frame_count, info.duration_seconds, info.size, modified
        );
    }
    Ok(())
}

fn show_info(name: &str) -> Result<()> {
    let manager = RecordingManager::new();
    let path: PathBuf = manager.resolve(name);
    let Some(info) = manager.get_recording_info(&path) else {
        bail!("Not a readable recording: {}", path.display());
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Resolves on Ctrl-C, or never if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
