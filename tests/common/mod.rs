//! Common test utilities and helpers
//!
//! Starts a real server on an ephemeral port and talks to it over TCP.

use stashq::core::shutdown::ShutdownCoordinator;
use stashq::repository::QueueRepository;
use stashq::server::{QueueServer, ServerConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    pub repo: Arc<QueueRepository>,
    shutdown: ShutdownCoordinator,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start(data_dir: &Path, client_timeout: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let repo = Arc::new(QueueRepository::open(data_dir).unwrap());
        let shutdown = ShutdownCoordinator::new();
        let config = ServerConfig {
            listen: addr.to_string(),
            client_timeout,
            ..ServerConfig::default()
        };
        let server = QueueServer::new(config, Arc::clone(&repo), shutdown.clone());
        let handle = tokio::spawn(async move { server.serve(listener).await });
        Self {
            addr,
            repo,
            shutdown,
            handle,
        }
    }

    pub async fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Client {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Request shutdown and wait for the server to finish
    pub async fn stop(self) {
        self.shutdown.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap()
            .unwrap();
    }
}

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
    }

    /// Send one command line and collect the complete reply
    pub async fn command(&mut self, line: &str) -> String {
        self.send(&format!("{}\r\n", line)).await;
        self.reply().await
    }

    pub async fn set(&mut self, queue: &str, value: &str) -> String {
        self.send(&format!("set {} 0 0 {}\r\n{}\r\n", queue, value.len(), value))
            .await;
        self.reply().await
    }

    /// Reply lines up to and including the terminating one
    pub async fn reply(&mut self) -> String {
        let mut reply = String::new();
        loop {
            let line = self.line().await;
            reply.push_str(&line);
            if line.starts_with("VALUE ") {
                // data line, then END
                reply.push_str(&self.line().await);
                continue;
            }
            if is_terminal(&line) {
                return reply;
            }
        }
    }

    /// `true` once the server has closed the connection
    pub async fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(
            tokio::time::timeout(Duration::from_secs(5), self.reader.read(&mut buf)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        let read = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("no reply from server")
            .unwrap();
        assert!(read > 0, "server closed the connection");
        line
    }
}

fn is_terminal(line: &str) -> bool {
    let line = line.trim_end();
    line == "END"
        || line == "STORED"
        || line == "Flushed all queues."
        || line.starts_with("VERSION ")
        || line.starts_with("ERROR")
        || line.starts_with("CLIENT_ERROR")
        || line.starts_with("SERVER_ERROR")
}

/// Poll `check` until it holds or a few seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
