//! TCP accept loop

use super::config::ServerConfig;
use super::session::{Session, SessionContext};
use crate::core::{AdmissionLimiter, Ledger, OperationExecutor};
use crate::types::ServerError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) does not spin the loop
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Banking server bound to a TCP socket
///
/// Accepts clients until its shutdown token is cancelled, then stops
/// accepting, lets every session finish its current command, and persists
/// the ledger one last time.
pub struct BankServer {
    listener: TcpListener,
    context: SessionContext,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl BankServer {
    /// Bind the listening socket
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is invalid or in use.
    pub async fn bind(config: &ServerConfig, ledger: Arc<Ledger>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| ServerError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                message: e.to_string(),
            })?;

        Ok(Self {
            listener,
            context: SessionContext {
                ledger,
                limiter: AdmissionLimiter::new(config.max_concurrent),
                executor: OperationExecutor::new(config.timeout),
            },
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Address the server actually listens on
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.context.limiter
    }

    /// Accept clients until shutdown, then drain sessions and flush the ledger
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!(
            %addr,
            max_concurrent = self.context.limiter.capacity(),
            timeout_ms = self.context.executor.deadline().as_millis() as u64,
            "Server listening"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let session = Session::new(
                            stream,
                            peer,
                            self.context.clone(),
                            self.shutdown.clone(),
                        );
                        self.tracker.spawn(session.run());
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!(sessions = self.tracker.len(), "Shutting down, draining sessions");
        drop(self.listener);

        // Commands still waiting for a permit are answered as unavailable
        self.context.limiter.close();
        self.tracker.close();
        self.tracker.wait().await;

        let ledger = Arc::clone(&self.context.ledger);
        match tokio::task::spawn_blocking(move || ledger.flush()).await {
            Ok(Ok(())) => info!("Ledger persisted"),
            Ok(Err(e)) => error!(error = %e, "Failed to persist ledger on shutdown"),
            Err(e) => error!(error = %e, "Final persistence task failed"),
        }

        info!("Server stopped");
        Ok(())
    }
}
