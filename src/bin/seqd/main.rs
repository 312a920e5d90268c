mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use seq_workers::http;
use seq_workers::store::{StoreConfig, WorkerStore};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let config = match StoreConfig::new(args.max_parallel) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "unsupported configuration");
            return ExitCode::from(2);
        },
    };

    // Cancellation on ctrl-c stops the dispatcher and drains the server.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    if let Err(error) = begin(args, config, cancel).await {
        error!(error = %format!("{error:#}"), "encountered runtime error");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn begin(
    args: Args,
    config: StoreConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind((args.listen, args.port))
        .await
        .with_context(|| format!("binding {}:{}", args.listen, args.port))?;

    let store = WorkerStore::new(config);
    let dispatcher = store.start(cancel.clone());
    info!(max_parallel = config.max_parallel(), "store started");

    let served = http::serve(listener, store, cancel.clone())
        .await
        .context("serving HTTP");

    // Stop the dispatcher whether the server exited cleanly or not.
    cancel.cancel();
    dispatcher.await.context("joining dispatcher")?;

    served?;
    info!("shut down");

    Ok(())
}
