// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.3
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Errors surfaced by the syscall client.
//!
//! Transport and codec failures are fatal: once a frame is short or a
//! payload undecodable, the stream position is unknown and no further call
//! can be trusted. Host refusals are not errors; operations report them as
//! `false` or `None` in their return values.

use labeldoor_wire::{FrameError, WireError};

/// Failure of a syscall exchange.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// The frame transport failed.
    #[error("frame transport: {0}")]
    Frame(#[from] FrameError),
    /// A message failed to encode or decode.
    #[error("message codec: {0}")]
    Wire(#[from] WireError),
    /// The host answered with a response variant the request does not map to.
    #[error("protocol violation: expected {expected} response, got {got}")]
    UnexpectedResponse {
        /// Variant the issued request maps to.
        expected: &'static str,
        /// Variant the host actually sent.
        got: &'static str,
    },
    /// A blob operation the host reported as failed.
    #[error("blob {op} failed on fd {fd}")]
    BlobFailed {
        /// The failing operation.
        op: &'static str,
        /// The blob fd it targeted.
        fd: u64,
    },
}
