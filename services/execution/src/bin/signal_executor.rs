//! Signal executor binary
//!
//! Reads parsed signals as JSON lines and executes them through the paper
//! gateway until EOF or Ctrl+C.
//!
//! Usage:
//!   signal_executor --signals signals.jsonl
//!   cat signals.jsonl | signal_executor --channel gold-vip --json-logs

use anyhow::{Context, Result};
use clap::Parser;
use execution_service::{
    ExecutionError, ExecutionService, ExecutorConfig, PaperGateway, TracingNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::TradeSignal;

#[derive(Parser, Debug)]
#[command(name = "signal_executor")]
#[command(about = "Execute parsed trading signals over a self-healing gateway session")]
#[command(version)]
struct Args {
    /// JSON-lines signal file; stdin when omitted
    #[arg(short, long)]
    signals: Option<PathBuf>,

    /// Channel name attached to every signal
    #[arg(short, long, default_value = "stdin")]
    channel: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(&args);

    info!("Starting signal executor");

    let config = ExecutorConfig::from_env().context("Failed to load executor configuration")?;
    info!("Configuration: {:?}", config);

    let mut service = ExecutionService::new(
        config,
        Arc::new(PaperGateway::new()),
        Arc::new(TracingNotifier),
    );
    service
        .start()
        .await
        .context("Failed to establish the initial gateway session")?;
    info!("Executing signals as {:?} orders", service.intake().mode());

    let outcome = match &args.signals {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            run(&service, &args.channel, BufReader::new(file)).await
        }
        None => run(&service, &args.channel, BufReader::new(tokio::io::stdin())).await,
    };

    service.shutdown().await;
    outcome
}

async fn run<R>(service: &ExecutionService, channel: &str, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut executed = 0u64;
    let mut refused = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read signal input")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        };

        let Some(line) = line else {
            info!("Signal input exhausted");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let signal: TradeSignal = match serde_json::from_str(&line) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Skipping malformed signal line: {}", e);
                refused += 1;
                continue;
            }
        };

        match service.intake().handle(channel, &signal).await {
            Ok(handle) => {
                executed += 1;
                info!("Signal executed as order {}", handle.order_id);
            }
            Err(e @ ExecutionError::NotReady) => {
                refused += 1;
                warn!("{}", e);
            }
            Err(e) => {
                refused += 1;
                error!("Signal failed: {}", e);
            }
        }
    }

    info!("Done: {} executed, {} refused", executed, refused);
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.to_lowercase()));

    if args.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
