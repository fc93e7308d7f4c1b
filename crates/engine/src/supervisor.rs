// Path: crates/engine/src/supervisor.rs

//! The retry supervisor.
//!
//! Owns at most one live session. The session runs as a future the
//! supervisor awaits, so its lifetime is strictly contained in the
//! supervisor's: there is no back-pointer for a late transport event to
//! dangle through. On a transient failure the supervisor reconnects after a
//! fixed delay; clean stops and fatal errors end the run.

use crate::error::FillError;
use crate::session::Session;
use statefill_storage::KvStore;
use statefill_types::config::FillConfig;
use statefill_upstream::TcpTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Delay between the end of a failed session and the next connect attempt.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Runs fill sessions against one upstream until a clean stop, a fatal
/// error, or shutdown.
pub struct Supervisor {
    config: FillConfig,
    store: Arc<dyn KvStore>,
    shutdown: watch::Receiver<bool>,
}

/// What one connect-and-stream attempt means for the supervisor loop.
enum Attempt {
    /// `stop_before` reached, or shutdown was requested.
    Done,
    /// Transient failure; reconnect after the delay.
    Retry,
}

impl Supervisor {
    /// Builds a supervisor. The store handle and the shutdown channel are
    /// injected at construction; the supervisor holds no other process
    /// state.
    pub fn new(
        config: FillConfig,
        store: Arc<dyn KvStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { config, store, shutdown }
    }

    /// Runs until a clean stop (`Ok`), a fatal error (`Err`), or shutdown
    /// (`Ok`). A closed shutdown channel is treated as a shutdown request.
    pub async fn run(mut self) -> Result<(), FillError> {
        // Fail fast on a bad endpoint before the first dial.
        self.config.endpoint()?;

        loop {
            if *self.shutdown.borrow() {
                return Ok(());
            }
            match self.attempt().await? {
                Attempt::Done => return Ok(()),
                Attempt::Retry => {}
            }

            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = tokio::time::sleep(RETRY_DELAY) => {
                    tracing::info!(target: "fill", "retry...");
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    tracing::info!(target: "fill", "shutdown during retry delay");
                    return Ok(());
                }
            }
        }
    }

    async fn attempt(&mut self) -> Result<Attempt, FillError> {
        let (host, port) = self.config.endpoint()?;
        let transport = match TcpTransport::connect(&host, port).await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(target: "fill", error = %e, "connect failed");
                return Ok(Attempt::Retry);
            }
        };

        let session = Session::new(
            self.config.clone(),
            Box::new(transport),
            Arc::clone(&self.store),
        );

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            result = session.run() => match result {
                Ok(()) => Ok(Attempt::Done),
                Err(e) if e.is_transient() => {
                    tracing::warn!(target: "fill", error = %e, "session closed");
                    Ok(Attempt::Retry)
                }
                Err(e) => Err(e),
            },
            _ = shutdown.wait_for(|stop| *stop) => {
                // Dropping the session closes the connection and discards
                // its uncommitted view window.
                tracing::info!(target: "fill", "shutdown requested");
                Ok(Attempt::Done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statefill_storage::MemoryStore;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn config_for(addr: std::net::SocketAddr) -> FillConfig {
        FillConfig {
            connect_to: addr.to_string(),
            skip_to: 0,
            stop_before: 0,
            trx_filters: vec![],
        }
    }

    #[tokio::test]
    async fn invalid_endpoint_is_fatal_before_dialing() {
        let (_tx, rx) = watch::channel(false);
        let config = FillConfig {
            connect_to: "no-port-here".to_string(),
            skip_to: 0,
            stop_before: 0,
            trx_filters: vec![],
        };
        let supervisor =
            Supervisor::new(config, Arc::new(MemoryStore::new()) as Arc<dyn KvStore>, rx);
        let err = supervisor.run().await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_stalled_session() {
        // The mock upstream accepts and then never sends a schema frame, so
        // the session parks in its first read.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let (tx, rx) = watch::channel(false);
        let supervisor = Supervisor::new(
            config_for(addr),
            Arc::new(MemoryStore::new()) as Arc<dyn KvStore>,
            rx,
        );
        let handle = tokio::spawn(supervisor.run());

        tx.send(true).unwrap();
        handle.await.unwrap().expect("shutdown is a clean exit");
    }

    #[tokio::test]
    async fn an_unusable_schema_announcement_is_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let garbage = b"not a schema";
            stream.write_u32_le(garbage.len() as u32).await.unwrap();
            stream.write_all(garbage).await.unwrap();
            // Keep the connection open so the failure is the decode, not a
            // disconnect.
            std::future::pending::<()>().await;
        });

        let (_tx, rx) = watch::channel(false);
        let supervisor = Supervisor::new(
            config_for(addr),
            Arc::new(MemoryStore::new()) as Arc<dyn KvStore>,
            rx,
        );
        let err = supervisor.run().await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("schema"), "{err}");
    }
}
