/*!
 * Telltale - Main Entry Point
 *
 * Standalone recorder process that serves the entries API:
 * - Cursor pagination and filtering
 * - Live-tail sequence probes
 * - Tag and triage administration
 */

use clap::Parser;
use miette::IntoDiagnostic;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use telltale::{http, init_tracing, Recorder, RecorderConfig};

/// CLI arguments for the recorder server
#[derive(Debug, Parser)]
#[command(name = "telltale", version, about = "In-process observability recorder")]
struct CliArgs {
    /// HTTP server port
    #[arg(long, env = "TELLTALE_PORT", default_value = "9000")]
    port: u16,

    /// JSON configuration file; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture caller-supplied data (overrides the configuration file)
    #[arg(long, default_value = "false")]
    capture_data: bool,
}

impl CliArgs {
    fn to_recorder_config(&self) -> miette::Result<RecorderConfig> {
        let config = match &self.config {
            Some(path) => RecorderConfig::from_json_file(path)?,
            None => RecorderConfig::default(),
        };
        let mut config = config.apply_env()?;
        if self.capture_data {
            config.capture_data = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = CliArgs::parse();
    let config = args.to_recorder_config()?;

    let recorder = Recorder::builder(config).build().await?;
    init_tracing(Some(recorder.log_layer()));
    recorder.watchers().exception.install_panic_hook();

    info!(
        capture_data = recorder.config().capture_data,
        installation = %recorder.config().installation_id,
        "Telltale recorder starting"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    http::serve(addr, recorder.router(), http::shutdown_signal())
        .await
        .into_diagnostic()?;

    recorder.flush().await?;
    let stats = recorder.stats();
    info!(
        persisted = stats.persisted,
        dropped = stats.dropped,
        failed = stats.failed,
        "Telltale recorder stopped"
    );
    Ok(())
}
