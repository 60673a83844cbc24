// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Length-prefixed frame transport over a duplex byte stream.
// Author: Lukas Bower

//! Length-prefixed framing.
//!
//! Every message on a LabelDoor channel is one frame: a `u32` big-endian
//! payload length followed by exactly that many payload bytes. Framing
//! errors are fatal to the channel: there is no way to resynchronize a
//! byte stream once a prefix or payload has been half-consumed.

use std::io::{ErrorKind, Read, Write};

/// Upper bound on a frame payload. A declared length above this is treated
/// as a malformed prefix rather than an allocation request.
pub const MAX_FRAME_BYTES: u32 = 4 * 1024 * 1024;

/// Fatal transport failures.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended before a full prefix or payload arrived.
    #[error("stream closed mid-frame")]
    Truncated,
    /// The declared payload length exceeds [`MAX_FRAME_BYTES`].
    #[error("declared frame length {declared} exceeds {MAX_FRAME_BYTES}")]
    TooBig {
        /// Length taken from the frame prefix.
        declared: u64,
    },
    /// An underlying stream error.
    #[error("frame i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Write one frame: prefix, payload, flush. The payload may be empty.
pub fn send_frame<W: Write>(stream: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    if payload.len() as u64 > u64::from(MAX_FRAME_BYTES) {
        return Err(FrameError::TooBig {
            declared: payload.len() as u64,
        });
    }
    stream.write_all(&(payload.len() as u32).to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()?;
    Ok(())
}

/// Read one frame, retrying short reads until the declared length has been
/// accumulated. EOF anywhere before that is [`FrameError::Truncated`].
pub fn recv_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0u8; 4];
    read_full(stream, &mut prefix)?;
    let declared = u32::from_be_bytes(prefix);
    if declared > MAX_FRAME_BYTES {
        return Err(FrameError::TooBig {
            declared: u64::from(declared),
        });
    }
    let mut payload = vec![0u8; declared as usize];
    read_full(stream, &mut payload)?;
    Ok(payload)
}

fn read_full<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(FrameError::Truncated),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}
