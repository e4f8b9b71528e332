use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use storemaster::cli::{Cli, Command};
use storemaster::config::Config;
use storemaster::fs;
use storemaster::key::PathKey;
use storemaster::sync::{ensure_bucket, BucketState, SyncEngine, SyncOptions, SyncPhase, SyncProgress, SyncReport};
use storemaster::SyncError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("storemaster={},warn", cli.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<SyncError>() {
                Some(sync_err) => {
                    eprintln!("Error ({}): {}", sync_err.kind(), sync_err);
                    if let Some(key) = sync_err.failed_key() {
                        eprintln!("  failed key: {}", key);
                    }
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::discover(cli.config.as_deref()).context("loading configuration")?;
    config.apply_env(|key| std::env::var(key).ok());
    cli.apply(&mut config);
    config
        .load_credentials(|key| std::env::var(key).ok())
        .context("loading credentials")?;
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.command == Command::CreateBucket {
        return create_bucket(&config).await;
    }

    let options = SyncOptions {
        dry_run: cli.dry_run,
        ..SyncOptions::from_config(&config)
    };

    let (tx, rx) = mpsc::channel(64);
    let progress = tokio::spawn(render_progress(rx, cli.quiet));

    let result = dispatch(&cli.command, &config, options, tx).await;
    // the engine and its sender are gone, so the progress task ends
    let _ = progress.await;

    result
}

async fn dispatch(
    command: &Command,
    config: &Config,
    options: SyncOptions,
    tx: mpsc::Sender<SyncProgress>,
) -> Result<()> {
    let engine = SyncEngine::connect(config, options).await?.with_progress(tx);
    let user_key = |raw: &str| PathKey::from_user_path(engine.local_root(), raw);

    match command {
        Command::Download { path } => {
            let outcome = engine.pull_one(&user_key(path.as_str())?).await?;
            println!("Downloaded {} ({} bytes)", outcome.key, outcome.bytes);
        }
        Command::Upload { path } => {
            let outcome = engine.push_one(&user_key(path.as_str())?).await?;
            println!("Uploaded {} ({} bytes)", outcome.key, outcome.bytes);
        }
        Command::ForceUpload { path } => {
            let scope = path.as_deref().map(user_key).transpose()?;
            let report = engine.mirror_push(scope.as_ref()).await?;
            print_report(&report);
        }
        Command::OverwriteRemote | Command::Sync => {
            let report = engine.sync_bidirectional().await?;
            print_report(&report);
        }
        Command::Purge => {
            let report = engine.purge().await?;
            print_report(&report);
        }
        Command::Remote => {
            for line in listing_lines(&engine.list().await?) {
                println!("{line}");
            }
        }
        Command::CreateBucket => create_bucket(config).await?,
    }

    Ok(())
}

async fn create_bucket(config: &Config) -> Result<()> {
    let remote = fs::s3::connect(config).await?;
    match ensure_bucket(remote.admin(), remote.bucket()).await? {
        BucketState::Existed => println!("Bucket {} already exists", remote.bucket()),
        BucketState::Created => println!("Created bucket {}", remote.bucket()),
    }
    Ok(())
}

async fn render_progress(mut rx: mpsc::Receiver<SyncProgress>, quiet: bool) {
    let pb = if quiet { ProgressBar::hidden() } else { ProgressBar::new(0) };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }

    while let Some(update) = rx.recv().await {
        match update.phase {
            SyncPhase::Listing => pb.set_message("listing"),
            SyncPhase::Diffing => pb.set_message("comparing"),
            SyncPhase::Transferring => {
                pb.set_length(update.total as u64);
                pb.set_position(update.done as u64);
                if let Some(key) = update.current {
                    pb.set_message(key.to_string());
                }
            }
            SyncPhase::Done => {
                pb.set_length(update.total as u64);
                pb.set_position(update.done as u64);
                pb.finish_and_clear();
            }
        }
    }

    pb.finish_and_clear();
}

/// Count line followed by one bare key per line.
fn listing_lines(keys: &[PathKey]) -> Vec<String> {
    let mut lines = Vec::with_capacity(keys.len() + 1);
    lines.push(format!("Total remote objects: {}", keys.len()));
    lines.extend(keys.iter().map(|key| key.to_string()));
    lines
}

fn print_report(report: &SyncReport) {
    let verb = if report.dry_run { "would be " } else { "" };

    for key in &report.deleted {
        println!("{key} {verb}deleted");
    }
    for key in &report.uploaded {
        println!("{key} {verb}uploaded");
    }
    for key in &report.downloaded {
        println!("{key} {verb}downloaded");
    }

    println!(
        "{:?}: {} uploaded, {} downloaded, {} deleted, {} unchanged, {} bytes in {:.1}s{}",
        report.mode,
        report.uploaded.len(),
        report.downloaded.len(),
        report.deleted.len(),
        report.unchanged,
        report.bytes_transferred,
        report.duration.as_secs_f64(),
        if report.dry_run { " (dry run)" } else { "" }
    );
}
