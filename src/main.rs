#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else, clippy::missing_errors_doc)]

use crate::{
    config::RuntimeConfiguration,
    error::{BindSnafu, CohortToolsResult, ServeSnafu},
    routes::router,
    state::CohortToolsState,
};
use snafu::ResultExt;
use sqlx::postgres::PgPoolOptions;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod config;
mod data;
mod error;
mod extract;
mod routes;
mod state;
mod store;

async fn shutdown_signal(state: CohortToolsState) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
    state.sensible_shutdown().await;
}

async fn serve(config: RuntimeConfiguration) -> CohortToolsResult<()> {
    let options = PgPoolOptions::new().max_connections(15);
    let state = CohortToolsState::connect(options, config.clone())?;

    let app = router(state.clone());

    let port = config.port();
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .await
        .context(BindSnafu { port })?;

    info!(port, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context(ServeSnafu)
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        //a missing .env is fine, everything has a default
        eprintln!("not loading .env: {e}");
    }

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");

    let config = RuntimeConfiguration::new().expect("unable to create config");

    if let Err(e) = serve(config).await {
        error!(?e, "Server stopped");
        std::process::exit(1);
    }
}
