//! STATS and VERSION

use crate::controller::{Controller, ControllerResult};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Response: `STAT <key> <value>\r\n`... `END\r\n`
    pub(crate) async fn stats(&mut self) -> ControllerResult<()> {
        let mut reply = String::new();
        for item in self.repo.full_stats()? {
            reply.push_str(&format!("STAT {} {}\r\n", item.key, item.value));
        }
        self.writer.write_all(reply.as_bytes()).await?;
        self.write_end().await
    }

    /// Response: `VERSION <version>\r\n`
    pub(crate) async fn version(&mut self) -> ControllerResult<()> {
        let line = format!("VERSION {}", self.repo.stats().version());
        self.write_line(&line).await
    }
}
