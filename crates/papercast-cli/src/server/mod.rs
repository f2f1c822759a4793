//! HTTP server startup and graceful shutdown.

mod error;
mod shutdown;

use std::future::IntoFuture;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use self::error::{ServeError, ServeResult};
use self::shutdown::shutdown_signal;
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};

/// Binds the configured address and serves `app` until a shutdown signal.
///
/// In-flight requests get up to the configured shutdown timeout to finish
/// once a signal arrives.
pub async fn serve(app: Router, config: ServerConfig) -> ServeResult<()> {
    config
        .validate()
        .map_err(|e| ServeError::invalid_config(&e))?;

    let server_addr = config.server_addr();
    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
        ServeError::bind_error(&server_addr.to_string(), err)
    })?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_STARTUP,
            "Server is bound to all interfaces. Ensure firewall rules are properly configured."
        );
    }

    let shutdown_timeout = config.shutdown_timeout();
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal(shutdown_timeout).await;
            shutdown.cancel();
        }
    });

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.clone().cancelled_owned());

    tokio::select! {
        result = server.into_future() => result.map_err(ServeError::Runtime)?,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(
                target: TRACING_TARGET_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown timeout elapsed, dropping in-flight requests"
            );
        }
    }

    tracing::info!(target: TRACING_TARGET_SHUTDOWN, "Server shut down gracefully");
    Ok(())
}
