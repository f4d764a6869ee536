//! Keyswap production server.
//!
//! Serves [`keyswap_core`]'s exchange over HTTP using axum on a Tokio
//! runtime, with system time.
//!
//! # Architecture
//!
//! This crate is production "glue". All protocol decisions live in
//! [`ExchangeCoordinator`], which is constructed once and shared by every
//! request handler behind an `Arc`. The server adds the HTTP surface, a
//! background sweeper that purges expired deposits and rate-limit entries,
//! and graceful shutdown.
//!
//! # Components
//!
//! - [`router`]: axum routes for `/keyExchange` and `/health`
//! - [`Server`]: binds the listener and runs router plus sweeper
//! - [`spawn_sweeper`]: periodic [`ExchangeCoordinator::sweep`]
//! - [`SystemEnv`]: Production environment (real time)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod http;
mod system_env;

use std::{net::SocketAddr, sync::Arc, time::Duration};

pub use error::ServerError;
pub use http::{ApiError, TOKEN_COOKIE, router};
use keyswap_core::{Environment, ExchangeConfig, ExchangeCoordinator, IdentityResolver};
pub use system_env::SystemEnv;
use tokio::{
    net::TcpListener,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

/// Default interval between sweeps of expired state.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Interval between sweeps of expired deposits and rate-limit entries
    pub sweep_interval: Duration,
    /// Exchange configuration (cooldown, store limits, deposit policy)
    pub exchange: ExchangeConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            exchange: ExchangeConfig::default(),
        }
    }
}

/// Production keyswap server.
///
/// Wraps [`ExchangeCoordinator`] with an HTTP listener and system
/// environment.
pub struct Server<R> {
    /// Shared exchange state
    coordinator: Arc<ExchangeCoordinator<SystemEnv, R>>,
    /// Bound TCP listener
    listener: TcpListener,
    /// Sweep period
    sweep_interval: Duration,
}

impl<R: IdentityResolver + 'static> Server<R> {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig, resolver: R) -> Result<Self, ServerError> {
        let coordinator =
            Arc::new(ExchangeCoordinator::new(SystemEnv::new(), resolver, config.exchange));

        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Transport(format!("failed to bind {}: {e}", config.bind_address))
        })?;

        Ok(Self { coordinator, listener, sweep_interval: config.sweep_interval })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until Ctrl-C or a transport error.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);

        let sweeper = spawn_sweeper(Arc::clone(&self.coordinator), self.sweep_interval);

        let result = axum::serve(self.listener, router(self.coordinator))
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        tracing::info!("Server stopped");

        Ok(result?)
    }
}

/// Spawn a task that calls [`ExchangeCoordinator::sweep`] every `period`.
///
/// The first sweep runs one full period after spawning. The task runs until
/// aborted.
pub fn spawn_sweeper<E, R>(
    coordinator: Arc<ExchangeCoordinator<E, R>>,
    period: Duration,
) -> JoinHandle<()>
where
    E: Environment,
    R: IdentityResolver + 'static,
{
    // interval() panics on a zero period
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let report = coordinator.sweep();
            tracing::debug!(
                expired_deposits = report.expired_deposits,
                expired_rate_limits = report.expired_rate_limits,
                pending_deposits = coordinator.pending_deposits(),
                "Sweep complete"
            );
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
