use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use geoingest::{
    publish, regions::load_regions, telemetry, Args, HttpUpstream, LogWriter, OrchestratorBuilder,
    RuntimeError, Subscribe,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = telemetry::init(&args.log_level, args.log_format) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let cfg = args.config()?;
    let credentials = args.credentials()?;
    let regions = load_regions(&args.regions)?;
    let backend = args.backend()?;
    info!(
        regions = regions.len(),
        file = %args.regions.display(),
        backend = ?backend,
        "configuration loaded"
    );

    let publisher = publish::connect(&backend).await?;
    let upstream = HttpUpstream::new(&args.upstream_url, credentials.bearer(), args.connect_timeout)
        .context("building upstream client")?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let orch = OrchestratorBuilder::new(cfg, Arc::new(upstream), publisher)
        .with_subscribers(subs)
        .build();

    match orch.run(regions).await {
        Ok(()) => {
            info!("stopped");
            Ok(())
        }
        Err(e @ RuntimeError::GraceExceeded { .. }) => Err(e.into()),
        Err(e) => Err(e).context("runtime failed"),
    }
}
