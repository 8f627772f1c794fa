//! CLI entry point for the gateway.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use species_gateway::backoff::{Constant, Exponential};
use species_gateway::pokeapi::PokeApiClient;
use species_gateway::server::{self, AppState};
use species_gateway::translation::TranslationClient;
use species_gateway::{ClientOptions, TracingLogger};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command, ServeArgs};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    // RUST_LOG wins over --log-level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(
        port = args.port,
        pokeapi = %args.pokeapi_endpoint,
        translation = %args.translation_endpoint,
        max_retries = args.max_retries,
        "CLI arguments parsed"
    );

    let options = ClientOptions::default()
        .with_max_retries(args.max_retries)
        .with_timeout(args.timeout())
        .with_logger(TracingLogger);
    let options = if args.backoff_initial().is_zero() {
        options.with_backoff(Constant::zero())
    } else {
        let backoff = Exponential::new(args.backoff_initial(), args.backoff_max())
            .context("invalid backoff configuration")?;
        options.with_backoff(backoff)
    };

    let translation = TranslationClient::with_endpoint(
        &args.translation_endpoint,
        &args.translation_api_key,
        options.clone(),
    )
    .context("invalid translation API key")?;
    let state = AppState::new(
        PokeApiClient::with_endpoint(&args.pokeapi_endpoint, options),
        translation,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    info!(port = args.port, "listening");

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn(server::serve(
        listener,
        state,
        shutdown.clone().cancelled_owned(),
    ));

    tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")?.context("server error")?;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    info!("shutting down");
    shutdown.cancel();
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => joined.context("server task failed")?.context("server error")?,
        Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "graceful shutdown timed out"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
