//! Protocol Controller
//!
//! One `Controller` per client connection. It reads memcached-style text
//! commands, runs them against the queue repository and writes the replies.
//! Besides plain reads it tracks at most one reliable ("open") read per
//! connection:
//!
//! ```text
//!            get q/open                       get q/close
//!   Idle ─────────────────────► Open ───────────────────────► Idle
//!                                 │  get q/abort  (put back)
//!                                 └─────────────────────────► Idle
//! ```
//!
//! Dropping a connection while Open puts the held item back
//! ([`Controller::finish_session`]).

mod command;
mod error;
mod get;
mod info;
mod manage;
mod set;

pub use command::{CommandName, GetCommand, SubCommand, Target};
pub use error::{ControllerError, ControllerResult, ErrorKind};

use crate::repository::QueueRepository;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const END: &str = "END";

/// Largest `set` data block accepted unless configured otherwise
pub const DEFAULT_MAX_ITEM_SIZE: usize = 1024 * 1024;

/// An item taken by a reliable read, waiting for close or abort
#[derive(Debug)]
struct OpenRead {
    command: GetCommand,
    value: Vec<u8>,
}

/// Per-connection protocol state machine
pub struct Controller<R, W> {
    reader: R,
    writer: W,
    repo: Arc<QueueRepository>,
    current: Option<OpenRead>,
    max_item_size: usize,
}

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Start a session; counts the connection
    pub fn new_session(reader: R, writer: W, repo: Arc<QueueRepository>) -> Self {
        repo.stats().connection_opened();
        Self {
            reader,
            writer,
            repo,
            current: None,
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
        }
    }

    /// Reject `set` data blocks longer than `limit` bytes
    pub fn with_max_item_size(mut self, limit: usize) -> Self {
        self.max_item_size = limit;
        self
    }

    /// End the session, putting back any item still held
    pub fn finish_session(&mut self) {
        if let Some(open) = &self.current {
            log::debug!(
                "session ended with open item on '{}', aborting",
                open.command.target.queue
            );
            if let Err(e) = self.abort_current() {
                log::error!("auto-abort failed, item dropped: {}", e);
                self.current = None;
            }
        }
        self.repo.stats().connection_closed();
    }

    /// Whether a reliable read is waiting for close or abort
    #[cfg(test)]
    pub(crate) fn has_open_item(&self) -> bool {
        self.current.is_some()
    }

    /// Read one command and execute it
    ///
    /// Reply errors are sent to the client before being returned.
    pub async fn dispatch(&mut self) -> ControllerResult<()> {
        let line = self.read_first_message().await?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let name = tokens.first().and_then(|word| word.parse::<CommandName>().ok());

        let result = match name {
            Some(CommandName::Get | CommandName::Gets) => self.get(&tokens).await,
            Some(CommandName::Set) => self.set(&tokens).await,
            Some(CommandName::Delete) => self.delete(&tokens).await,
            Some(CommandName::Flush) => self.flush(&tokens).await,
            Some(CommandName::FlushAll) => self.flush_all().await,
            Some(CommandName::Stats) => self.stats().await,
            Some(CommandName::Version) => self.version().await,
            Some(CommandName::Quit) => return Err(ControllerError::ClientQuit),
            None => Err(ControllerError::unknown_command()),
        };

        if let Err(e) = &result {
            if let Some(reply) = e.reply_line() {
                log::debug!("command {:?} failed: {}", tokens.first(), reply);
                self.send_error(&reply).await?;
            }
        }
        result
    }

    /// Next request line without its line terminator
    async fn read_first_message(&mut self) -> ControllerResult<String> {
        let mut raw = Vec::new();
        let read = self.reader.read_until(b'\n', &mut raw).await?;
        if read == 0 {
            return Err(ControllerError::Disconnected);
        }
        Ok(String::from_utf8_lossy(&raw)
            .trim_end_matches(['\r', '\n'])
            .to_string())
    }

    async fn send_error(&mut self, message: &str) -> ControllerResult<()> {
        self.write_line(message).await
    }

    async fn write_line(&mut self, line: &str) -> ControllerResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn write_end(&mut self) -> ControllerResult<()> {
        self.write_line(END).await
    }

    /// Writer access for tests that inspect replies between commands
    #[cfg(test)]
    pub(crate) fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

#[cfg(test)]
mod tests;
