//! TCP service
//!
//! Accepts memcached text connections and drives one [`Controller`] per
//! connection on its own task until the client leaves or shutdown is
//! requested.

use crate::controller::{Controller, ControllerError, DEFAULT_MAX_ITEM_SIZE};
use crate::core::shutdown::ShutdownCoordinator;
use crate::repository::QueueRepository;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

/// Default listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:22133";

/// Service settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: String,
    /// Idle limit between commands; `None` waits forever
    pub client_timeout: Option<Duration>,
    /// Largest value a `set` may carry, in bytes
    pub max_item_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            client_timeout: None,
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
        }
    }
}

/// Why a connection loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Quit,
    Disconnected,
    Failed,
    TimedOut,
    Shutdown,
}

pub struct QueueServer {
    config: ServerConfig,
    repo: Arc<QueueRepository>,
    shutdown: ShutdownCoordinator,
}

impl QueueServer {
    pub fn new(
        config: ServerConfig,
        repo: Arc<QueueRepository>,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            config,
            repo,
            shutdown,
        }
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    ///
    /// On shutdown the listener is dropped, every connection task is told
    /// to stop and awaited, then all queues are closed.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        log::info!("listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut connections = JoinSet::new();

        while !self.shutdown.is_shutdown_requested() {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("connection from {}", peer);
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            Arc::clone(&self.repo),
                            self.shutdown.clone(),
                            self.config.clone(),
                        ));
                    }
                    Err(e) => log::error!("accept failed: {}", e),
                },
                // reap finished tasks so the set does not grow without bound
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = shutdown_rx.recv() => break,
            }
        }

        drop(listener);
        log::info!(
            "shutting down, waiting for {} connection(s)",
            connections.len()
        );
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                log::error!("connection task failed: {}", e);
            }
        }

        if let Err(e) = self.repo.close_all_queues() {
            log::error!("closing queues: {}", e);
        }
        log::info!("server stopped");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    repo: Arc<QueueRepository>,
    shutdown: ShutdownCoordinator,
    config: ServerConfig,
) {
    let mut shutdown_rx = shutdown.subscribe();
    let (reader, writer) = stream.into_split();
    let mut controller = Controller::new_session(BufReader::new(reader), writer, repo)
        .with_max_item_size(config.max_item_size);

    let end = loop {
        if shutdown.is_shutdown_requested() {
            break SessionEnd::Shutdown;
        }
        let outcome = tokio::select! {
            outcome = dispatch_within(&mut controller, config.client_timeout) => outcome,
            _ = shutdown_rx.recv() => break SessionEnd::Shutdown,
        };
        match outcome {
            Some(Ok(())) => {}
            Some(Err(e)) => match session_end(&e) {
                Some(end) => {
                    if end == SessionEnd::Failed {
                        log::warn!("connection {}: {}", peer, e);
                    }
                    break end;
                }
                None => log::trace!("connection {}: {}", peer, e),
            },
            None => break SessionEnd::TimedOut,
        }
    };

    controller.finish_session();
    log::debug!("connection {} closed ({:?})", peer, end);
}

/// Run one command, giving up after `limit` when one is set
async fn dispatch_within<R, W>(
    controller: &mut Controller<R, W>,
    limit: Option<Duration>,
) -> Option<Result<(), ControllerError>>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, controller.dispatch()).await.ok(),
        None => Some(controller.dispatch().await),
    }
}

/// `None` when the connection should keep going after `error`
fn session_end(error: &ControllerError) -> Option<SessionEnd> {
    match error {
        ControllerError::ClientQuit => Some(SessionEnd::Quit),
        ControllerError::Disconnected => Some(SessionEnd::Disconnected),
        e if e.is_fatal() => Some(SessionEnd::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ErrorKind;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "0.0.0.0:22133");
        assert!(config.client_timeout.is_none());
        assert_eq!(config.max_item_size, DEFAULT_MAX_ITEM_SIZE);
    }

    #[test]
    fn test_reply_errors_keep_the_session() {
        assert_eq!(session_end(&ControllerError::unknown_command()), None);
        assert_eq!(session_end(&ControllerError::client("bad data chunk")), None);
        assert_eq!(
            session_end(&ControllerError::Reply {
                kind: ErrorKind::ServerError,
                message: "boom".to_string(),
            }),
            None
        );
    }

    #[test]
    fn test_fatal_errors_end_the_session() {
        assert_eq!(session_end(&ControllerError::ClientQuit), Some(SessionEnd::Quit));
        assert_eq!(
            session_end(&ControllerError::Disconnected),
            Some(SessionEnd::Disconnected)
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(session_end(&ControllerError::from(io)), Some(SessionEnd::Failed));
    }
}
