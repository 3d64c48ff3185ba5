//! Connection session
//!
//! One [`Session`] owns one client connection for its whole life:
//!
//! ```text
//! Connected → ReadingCommand ⇄ AwaitingResult → Closed
//! ```
//!
//! Each line is parsed, admitted through the limiter, run by the executor
//! against the ledger, and answered with exactly one line. Parse failures are
//! answered immediately without taking a permit. A blank line, end of stream,
//! a connection error, `SAIR` or server shutdown closes the session.

use crate::core::{AdmissionLimiter, Ledger, OperationExecutor, Outcome};
use crate::io::{parse_command, RequestCodec, Response};
use crate::types::{Command, LedgerError, Receipt};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Components shared by every session
///
/// Sessions reach the ledger only through these.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub ledger: Arc<Ledger>,
    pub limiter: AdmissionLimiter,
    pub executor: OperationExecutor,
}

/// Server-side state of one connected client
pub struct Session<S> {
    peer: SocketAddr,
    lines: Framed<S, RequestCodec>,
    context: SessionContext,
    shutdown: CancellationToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        context: SessionContext,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            peer,
            lines: Framed::new(stream, RequestCodec::new()),
            context,
            shutdown,
        }
    }

    /// Serve the client until the session closes
    pub async fn run(mut self) {
        info!(peer = %self.peer, "Client connected");
        let mut commands: u64 = 0;

        let reason = loop {
            // A session waiting for input stops on shutdown; one with a
            // command in flight finishes it below before looking again.
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break "server shutdown",
                next = self.lines.next() => next,
            };

            let response = match next {
                None => break "end of stream",
                Some(Ok(Ok(line))) if line.trim().is_empty() => break "blank line",
                Some(Ok(Ok(line))) => {
                    commands += 1;
                    self.handle_line(&line).await
                }
                Some(Ok(Err(rejection))) => {
                    debug!(peer = %self.peer, error = %rejection, "Rejected line");
                    Response::Rejected(rejection)
                }
                Some(Err(e)) => {
                    warn!(peer = %self.peer, error = %e, "Connection error");
                    break "connection error";
                }
            };

            if let Err(reason) = self.reply(&response).await {
                break reason;
            }

            if response.closes_session() {
                break "sign-off";
            }
        };

        // Flushes and shuts down the write half; the socket closes on drop
        let deadline = self.context.executor.deadline();
        match tokio::time::timeout(deadline, SinkExt::<String>::close(&mut self.lines)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(peer = %self.peer, error = %e, "Error while closing connection"),
            Err(_) => debug!(peer = %self.peer, "Timed out closing connection"),
        }

        info!(peer = %self.peer, commands, reason, "Client disconnected");
    }

    /// Write one reply line, giving up after the command deadline
    ///
    /// A client that stops reading would otherwise hold the session, and
    /// with it the server's shutdown, forever.
    async fn reply(&mut self, response: &Response) -> Result<(), &'static str> {
        let deadline = self.context.executor.deadline();
        match tokio::time::timeout(deadline, self.lines.send(response.to_string())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(peer = %self.peer, error = %e, "Failed to send response");
                Err("connection error")
            }
            Err(_) => {
                warn!(peer = %self.peer, "Client is not reading, response write timed out");
                Err("write timeout")
            }
        }
    }

    async fn handle_line(&self, line: &str) -> Response {
        match parse_command(line) {
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "Rejected command");
                Response::Rejected(e)
            }
            Ok(Command::SignOff) => Response::Receipt(Receipt::SignedOff),
            Ok(command) => self.dispatch(command).await,
        }
    }

    /// Run a well-formed command through limiter, executor and ledger
    async fn dispatch(&self, command: Command) -> Response {
        let verb = command.verb();
        let mutation = command.is_mutation();

        let permit = match self.context.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                debug!(peer = %self.peer, verb, error = %e, "Command refused");
                return Response::Unavailable;
            }
        };

        let ledger = Arc::clone(&self.context.ledger);
        let outcome = self
            .context
            .executor
            .execute(permit, move || ledger.apply(command))
            .await;

        match outcome {
            Outcome::Completed(result) => {
                match &result {
                    Err(e @ LedgerError::InsufficientFunds { .. }) => {
                        debug!(peer = %self.peer, verb, error = %e, "Command declined");
                    }
                    Err(e) => warn!(peer = %self.peer, verb, error = %e, "Command failed"),
                    Ok(_) => {}
                }
                Response::from_ledger(result)
            }
            Outcome::TimedOut if mutation => {
                // The detached unit of work may still commit and persist
                warn!(peer = %self.peer, verb, "Command timed out, change may still be applied");
                Response::TimedOut
            }
            Outcome::TimedOut => {
                warn!(peer = %self.peer, verb, "Command timed out");
                Response::TimedOut
            }
            Outcome::Failed(reason) => {
                warn!(peer = %self.peer, verb, reason, "Command failed");
                Response::InternalError
            }
        }
    }
}
