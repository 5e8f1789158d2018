//! SET handling
//!
//! Command: `set <queue>[+<queue>...] <flags> <exptime> <bytes> [noreply]`
//! followed by a `<bytes>` long data block and `\r\n`.
//! Response: `STORED\r\n`

use crate::controller::{Controller, ControllerError, ControllerResult};
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite};

impl<R, W> Controller<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) async fn set(&mut self, tokens: &[&str]) -> ControllerResult<()> {
        if tokens.len() < 5 || tokens.len() > 6 {
            return Err(ControllerError::client("Invalid command"));
        }
        let size: usize = tokens[4]
            .parse()
            .map_err(|_| ControllerError::client("Invalid <bytes> number"))?;
        if size > self.max_item_size {
            self.skip_data_block(size).await?;
            return Err(ControllerError::client("object too large for cache"));
        }
        let block = self.read_data_block(size).await?;

        for name in tokens[1].split('+') {
            let stored = self
                .repo
                .get_queue(name)
                .and_then(|queue| queue.enqueue(&block));
            if let Err(e) = stored {
                log::warn!("set on '{}' failed: {}", name, e);
                return Err(ControllerError::error(e.to_string()));
            }
        }

        self.repo.stats().record_set();
        self.write_line("STORED").await
    }

    /// Read exactly `size` bytes plus the terminating CRLF
    async fn read_data_block(&mut self, size: usize) -> ControllerResult<Vec<u8>> {
        let expected = size.saturating_add(2);
        let mut block = Vec::with_capacity(expected.min(64 * 1024));
        (&mut self.reader)
            .take(expected as u64)
            .read_to_end(&mut block)
            .await?;
        if block.len() < expected {
            return Err(ControllerError::Disconnected);
        }
        if !block.ends_with(b"\r\n") {
            return Err(ControllerError::client("bad data chunk"));
        }
        block.truncate(size);
        Ok(block)
    }

    /// Consume a data block without keeping it, so the next command line
    /// is read from the right place
    async fn skip_data_block(&mut self, size: usize) -> ControllerResult<()> {
        let expected = (size as u64).saturating_add(2);
        let skipped = tokio::io::copy(
            &mut (&mut self.reader).take(expected),
            &mut tokio::io::sink(),
        )
        .await?;
        if skipped < expected {
            return Err(ControllerError::Disconnected);
        }
        Ok(())
    }
}
