//! JSON wire codec for sync messages.
//!
//! Messages are JSON documents. Over a byte stream each message is framed
//! with a 4-byte big-endian length prefix.

use crate::error::{SyncError, SyncResult};
use crate::protocol::SyncMessage;
use std::io::{Read, Write};

/// Default upper bound on an encoded message.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Encodes a message as JSON bytes.
pub fn encode(message: &SyncMessage, limit: usize) -> SyncResult<Vec<u8>> {
    let data = serde_json::to_vec(message)?;
    check_size(data.len(), limit)?;
    Ok(data)
}

/// Decodes a message from JSON bytes.
pub fn decode(data: &[u8], limit: usize) -> SyncResult<SyncMessage> {
    check_size(data.len(), limit)?;
    Ok(serde_json::from_slice(data)?)
}

/// Writes a length-prefixed message.
pub fn write_message<W: Write>(io: &mut W, message: &SyncMessage, limit: usize) -> SyncResult<()> {
    let data = encode(message, limit)?;
    let len = u32::try_from(data.len()).map_err(|_| SyncError::MessageTooLarge {
        size: data.len(),
        limit,
    })?;
    io.write_all(&len.to_be_bytes())?;
    io.write_all(&data)?;
    io.flush()?;
    Ok(())
}

/// Reads a length-prefixed message.
pub fn read_message<R: Read>(io: &mut R, limit: usize) -> SyncResult<SyncMessage> {
    let mut len_bytes = [0u8; 4];
    io.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    // Validate before allocating.
    check_size(len, limit)?;

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf)?;
    decode(&buf, limit)
}

fn check_size(size: usize, limit: usize) -> SyncResult<()> {
    if size > limit {
        return Err(SyncError::MessageTooLarge { size, limit });
    }
    Ok(())
}
