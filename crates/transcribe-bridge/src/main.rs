use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use transcribe_bridge::bridge::transport::connect_transport;
use transcribe_bridge::config::{self, ConfigError, USAGE};
use transcribe_bridge::{
    CommandTranscriber, Gateway, SubscriberSlot, TranscriptionBridge, WorkerConfig, run_worker,
    spawn_writer, version_line,
};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config = match config::load(&args) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{}\n\n{USAGE}", version_line());
            process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    init_tracing();
    info!("{}", version_line());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        tracing::error!("Worker failed: {e:#}");
        process::exit(1);
    }
}

/// Initialize tracing with TRANSCRIBE_LOG and LOG_FORMAT support.
///
/// Always writes to stderr: stdout may be the frame channel.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("TRANSCRIBE_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("trace") => "trace",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!(
            "transcribe_bridge={level},transcribe_worker={level},transcribe_bridge::bridge::codec=off"
        ))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

async fn run(config: WorkerConfig) -> Result<()> {
    let Some((program, args)) = config.command.split_first() else {
        bail!("no transcription command configured");
    };
    let transcriber = CommandTranscriber::new(program.clone()).with_args(args.iter().cloned());
    info!(
        program = %transcriber.program(),
        transport = %config.transport,
        dispatch = %config.dispatch,
        "Starting transcription worker"
    );

    let (reader, writer) = connect_transport(&config.transport)
        .await
        .with_context(|| format!("failed to open {} transport", config.transport))?;

    let (sender, writer_task) = spawn_writer(writer);
    let bridge = TranscriptionBridge::new(
        Arc::new(transcriber),
        Arc::new(SubscriberSlot::new()),
        sender,
    );

    let result = run_worker(Gateway::new(reader), bridge, config.dispatch).await;

    // Bridge is gone, so the writer drains what is queued and exits.
    if let Err(e) = writer_task.await {
        tracing::warn!(error = %e, "Outbound writer task failed");
    }

    result.context("worker stopped on gateway error")?;
    info!("Worker exiting");
    Ok(())
}
