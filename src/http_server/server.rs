//! # HTTP Server
//!
//! Wraps the dispatch table in CORS and request tracing, binds the listener
//! and drains in-flight requests on shutdown for a bounded time.

use std::io;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes::api_routes;
use super::state::AppState;
use crate::config::ServerConfig;

/// CORS from the configured origins; permissive when none are listed
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Full application router
pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
    api_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
}

pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let router = build_router(&config, state);
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C or SIGTERM, then wait at most
    /// `shutdown_grace_secs` for open requests
    pub async fn run(self) -> io::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "listening");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let server = axum::serve(listener, self.router).with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        });
        let mut serving = tokio::spawn(async move { server.await });

        tokio::select! {
            joined = &mut serving => return flatten(joined),
            _ = stop_rx.changed() => {}
        }

        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        match tokio::time::timeout(grace, &mut serving).await {
            Ok(joined) => flatten(joined),
            Err(_) => {
                tracing::warn!(
                    grace_secs = self.config.shutdown_grace_secs,
                    "shutdown window elapsed; dropping open connections"
                );
                serving.abort();
                Ok(())
            }
        }
    }
}

fn flatten(joined: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    joined.map_err(io::Error::other)?
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
