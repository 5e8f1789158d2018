//! GET handling
//!
//! Command: `get <queue>[.<group>][/open|/close|/abort|/peek|/close/open]`
//! Response: `VALUE <queue> 0 <bytes>\r\n<data>\r\n` when an item is
//! returned, then `END\r\n`.

use crate::controller::{
    Controller, ControllerError, ControllerResult, GetCommand, OpenRead, SubCommand,
};
use crate::queue::QueueError;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) async fn get(&mut self, tokens: &[&str]) -> ControllerResult<()> {
        let raw = tokens.get(1).ok_or_else(ControllerError::invalid_command)?;
        let command = GetCommand::parse(raw)?;

        match command.sub_command {
            SubCommand::None | SubCommand::Open => self.get_open(command).await,
            SubCommand::Close => {
                self.close_current()?;
                self.write_end().await
            }
            SubCommand::Abort => {
                self.abort_current()?;
                self.write_end().await
            }
            SubCommand::Peek => self.peek(command).await,
            SubCommand::CloseOpen => {
                self.close_current()?;
                self.get_open(command).await
            }
        }
    }

    /// Take the next item; reliable sub-commands keep it as the open item
    async fn get_open(&mut self, command: GetCommand) -> ControllerResult<()> {
        if self.current.is_some() {
            return Err(ControllerError::client("Close current item first"));
        }

        let queue = self.repo.get_queue(&command.target.queue)?;
        self.repo.stats().record_get();
        let reliable = command.sub_command.is_reliable();
        let taken = queue.with_consumer(command.target.group.as_deref(), |consumer| {
            let value = consumer.get_next()?;
            if reliable {
                consumer.stats().update_open_reads(1);
            }
            Ok(value)
        });

        match taken {
            Ok(value) => {
                // held before replying so a failed write still gets aborted
                if reliable {
                    self.current = Some(OpenRead {
                        command: command.clone(),
                        value: value.clone(),
                    });
                }
                self.write_value(&command.target.queue, &value).await?;
            }
            Err(QueueError::Empty) => {}
            Err(e) => {
                log::warn!("get from '{}' failed: {}", command.target.queue, e);
                return Err(e.into());
            }
        }
        self.write_end().await
    }

    async fn peek(&mut self, command: GetCommand) -> ControllerResult<()> {
        let queue = self.repo.get_queue(&command.target.queue)?;
        self.repo.stats().record_get();
        match queue.with_consumer(command.target.group.as_deref(), |consumer| consumer.peek()) {
            Ok(value) => self.write_value(&command.target.queue, &value).await?,
            Err(QueueError::Empty) => {}
            Err(e) => return Err(e.into()),
        }
        self.write_end().await
    }

    /// Acknowledge the open item, if any; it is gone for good
    fn close_current(&mut self) -> ControllerResult<()> {
        let Some(open) = self.current.take() else {
            return Ok(());
        };
        let target = &open.command.target;
        // the queue may have been deleted while the item was held
        if let Some(queue) = self.repo.find_queue(&target.queue)? {
            let released = queue.with_consumer(target.group.as_deref(), |consumer| {
                consumer.stats().update_open_reads(-1);
                Ok(())
            });
            if let Err(e) = released {
                log::debug!("close on '{}': {}", target.queue, e);
            }
        }
        Ok(())
    }

    /// Return the open item to the queue or group it was taken from
    pub(crate) fn abort_current(&mut self) -> ControllerResult<()> {
        let Some(open) = &self.current else {
            return Ok(());
        };
        let target = &open.command.target;
        let queue = self.repo.get_queue(&target.queue)?;
        queue.with_consumer(target.group.as_deref(), |consumer| {
            consumer.put_back(&open.value)?;
            consumer.stats().update_open_reads(-1);
            Ok(())
        })?;
        self.current = None;
        Ok(())
    }

    async fn write_value(&mut self, queue: &str, value: &[u8]) -> ControllerResult<()> {
        let header = format!("VALUE {} 0 {}\r\n", queue, value.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(value).await?;
        self.writer.write_all(b"\r\n").await?;
        Ok(())
    }
}
