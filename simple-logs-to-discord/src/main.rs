use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use simple_logs_to_discord::config::{Args, Config};
use simple_logs_to_discord::notification::DiscordNotifier;
use simple_logs_to_discord::pipeline::Pipeline;
use simple_logs_to_discord::{Error, logging, source};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so env-backed flags can see it.
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = logging::init_logging(args.log_filter.as_deref(), args.verbose) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>().and_then(Error::config_problems) {
                Some(problems) => {
                    for problem in problems {
                        eprintln!("Error: {problem}");
                    }
                }
                None => {
                    error!("Application error: {:#}", e);
                    eprintln!("Error: {e:#}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("simple-logs-to-discord starting...");

    let config = Config::from_args(&args)?;
    info!("Source: {}", config.source_label);
    info!("Patterns: {} pattern(s)", config.patterns.len());
    info!("Template: {}", config.message_template);

    let notifier = DiscordNotifier::new(config.discord_config())?;
    let source = source::open_source(&config.source)?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                info!(signal, "Shutdown requested");
                signal_token.cancel();
            }
            Err(e) => error!("{e:#}"),
        }
    });

    let pipeline = Pipeline::new(config.pipeline_config(), notifier);
    let summary = pipeline.run(source, shutdown).await;

    info!(reason = %summary.stop_reason, "Shutting down...");
    Ok(())
}

/// Wait for SIGINT or SIGTERM and return the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to listen for Ctrl+C: {}", e))?;
    Ok("Ctrl+C")
}
