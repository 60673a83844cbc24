// CLASSIFICATION: COMMUNITY
// Filename: channel.rs v0.4
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Unary RPC over one framed duplex stream.
//!
//! The host speaks first with a [`Bootstrap`] envelope; after that every
//! exchange is one request frame out, one response frame back, except
//! `Finish`, which gets no reply. There are no correlation ids because there
//! is never more than one call in flight.

use std::io::{Read, Write};

use labeldoor_wire::{
    decode_bootstrap, decode_response, encode_request, recv_frame, send_frame, Bootstrap, Request,
    Response,
};
use log::trace;

use crate::error::SyscallError;

/// Framed request/response channel to the host.
pub struct Channel<S: Read + Write> {
    stream: S,
}

impl<S: Read + Write> Channel<S> {
    /// Wrap a connected duplex stream.
    pub fn new(stream: S) -> Self {
        Channel { stream }
    }

    /// Receive the bootstrap envelope. Must precede any [`Channel::call`].
    pub fn recv_bootstrap(&mut self) -> Result<Bootstrap, SyscallError> {
        let payload = recv_frame(&mut self.stream)?;
        Ok(decode_bootstrap(&payload)?)
    }

    /// Issue one request and block for its response.
    pub fn call(&mut self, request: &Request) -> Result<Response, SyscallError> {
        let out = encode_request(request)?;
        trace!("call: {} byte request", out.len());
        send_frame(&mut self.stream, &out)?;
        let payload = recv_frame(&mut self.stream)?;
        trace!("call: {} byte response", payload.len());
        Ok(decode_response(&payload)?)
    }

    /// Send a request that gets no reply. Only `Finish` uses this.
    pub fn send(&mut self, request: &Request) -> Result<(), SyscallError> {
        let out = encode_request(request)?;
        send_frame(&mut self.stream, &out)?;
        Ok(())
    }
}
