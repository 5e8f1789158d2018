//! Queue items and key encoding
//!
//! An item's key is its 8-byte big-endian id, optionally preceded by a
//! namespace prefix when several queues share one store.

use crate::queue::{QueueError, QueueResult};

/// An item read from a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Absolute, 1-based id of the item inside its queue
    pub id: u64,
    /// Full store key (prefix + id)
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Build the store key for `id` under `prefix`
pub fn encode_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Recover the id from a store key under `prefix`
pub fn decode_key(prefix: &[u8], key: &[u8]) -> QueueResult<u64> {
    let id_bytes = key
        .strip_prefix(prefix)
        .filter(|rest| rest.len() == 8)
        .ok_or_else(|| QueueError::CorruptKey {
            message: format!(
                "expected {} bytes under prefix {:?}, got {:?}",
                prefix.len() + 8,
                String::from_utf8_lossy(prefix),
                key
            ),
        })?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(id_bytes);
    Ok(u64::from_be_bytes(buf))
}
