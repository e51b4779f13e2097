//! diced - dice session server daemon
//!
//! Keeps per-session dice tables in memory: add and remove d6/d20 dice,
//! roll them one at a time or all together, and keep a short roll history.

pub mod api;
pub mod config;
pub mod dice;
pub mod sessions;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use sessions::SessionManager;

/// The diced server instance
pub struct Server {
    config: Config,
    sessions: Arc<SessionManager>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        let mut manager = SessionManager::new(config.roll_delay(), config.max_sessions);
        if let Some(timeout) = config.idle_timeout() {
            manager = manager.with_idle_timeout(timeout);
        }
        let sessions = Arc::new(manager);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            sessions,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get the session registry
    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.sessions.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "diced listening on {} (roll delay {}ms)",
            local_addr, self.config.roll_delay_ms
        );

        let reaper = self
            .config
            .reap_interval()
            .map(|every| self.sessions.spawn_reaper(every, self.shutdown_rx.clone()));

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        if let Some(reaper) = reaper {
            reaper.abort();
        }
        info!("diced shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
