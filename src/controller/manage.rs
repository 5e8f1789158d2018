//! DELETE, FLUSH and FLUSH_ALL
//!
//! `delete <queue>` drops the queue with all of its groups,
//! `delete <queue>.<group>` only that group. `flush` resets instead of
//! dropping. Both reply `END\r\n`; `flush_all` replies
//! `Flushed all queues.\r\n`.

use crate::controller::{Controller, ControllerError, ControllerResult, Target};
use tokio::io::{AsyncBufRead, AsyncWrite};

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) async fn delete(&mut self, tokens: &[&str]) -> ControllerResult<()> {
        let target = parse_target(tokens)?;
        let deleted = match &target.group {
            Some(group) => match self.repo.find_queue(&target.queue)? {
                Some(queue) => queue.delete_consumer_group(group),
                None => Ok(()),
            },
            None => self.repo.delete_queue(&target.queue),
        };
        if let Err(e) = deleted {
            log::error!("can't delete '{}': {}", target.queue, e);
            return Err(ControllerError::server(e.to_string()));
        }
        self.write_end().await
    }

    pub(crate) async fn flush(&mut self, tokens: &[&str]) -> ControllerResult<()> {
        let target = parse_target(tokens)?;
        let flushed = match &target.group {
            Some(group) => self.repo.get_queue(&target.queue).and_then(|queue| {
                queue.with_consumer(Some(group.as_str()), |consumer| consumer.flush())
            }),
            None => self.repo.flush_queue(&target.queue).map(|_| ()),
        };
        if let Err(e) = flushed {
            log::error!("can't flush '{}': {}", target.queue, e);
            return Err(e.into());
        }
        self.write_end().await
    }

    pub(crate) async fn flush_all(&mut self) -> ControllerResult<()> {
        if let Err(e) = self.repo.flush_all_queues() {
            log::error!("can't flush all queues: {}", e);
            return Err(ControllerError::server(e.to_string()));
        }
        self.write_line("Flushed all queues.").await
    }
}

fn parse_target(tokens: &[&str]) -> ControllerResult<Target> {
    match tokens {
        [_, target] => Ok(Target::parse(target)),
        _ => Err(ControllerError::client("Invalid command")),
    }
}
