// CLASSIFICATION: COMMUNITY
// Filename: blob.rs v0.6
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Blob handles.
//!
//! A blob starts life as an append-only staging handle ([`NewBlob`]).
//! Finalizing seals the bytes, derives their content address, and turns the
//! same fd into a read handle ([`Blob`]). Read handles also come from blob
//! entries in the tree and from `toblob` invocations; those carry no name
//! until the host is asked.

use std::cell::Cell;
use std::io::{Read, Write};

use labeldoor_wire::Request;
use log::warn;

use crate::error::SyscallError;
use crate::syscall::Syscall;

/// Blob fd ownership; drop sends `BlobClose`.
struct RawBlob<'c, S: Read + Write> {
    sys: &'c Syscall<S>,
    fd: u64,
}

impl<S: Read + Write> Drop for RawBlob<'_, S> {
    fn drop(&mut self) {
        match self
            .sys
            .call_blob(&Request::BlobClose { fd: self.fd })
        {
            Ok(result) if result.success => {}
            Ok(_) => warn!("blob close refused for fd {}", self.fd),
            Err(err) => warn!("blob close failed for fd {}: {err}", self.fd),
        }
    }
}

/// An append-only staging blob.
pub struct NewBlob<'c, S: Read + Write> {
    raw: RawBlob<'c, S>,
}

impl<'c, S: Read + Write> NewBlob<'c, S> {
    pub(crate) fn create(
        sys: &'c Syscall<S>,
        size_hint: Option<u64>,
    ) -> Result<Self, SyscallError> {
        let result = sys.call_blob(&Request::BlobCreate { size_hint })?;
        if !result.success {
            return Err(SyscallError::BlobFailed {
                op: "create",
                fd: result.fd,
            });
        }
        Ok(NewBlob {
            raw: RawBlob { sys, fd: result.fd },
        })
    }

    /// The staging fd.
    #[must_use]
    pub fn fd(&self) -> u64 {
        self.raw.fd
    }

    /// Append bytes; returns the count the host accepted.
    pub fn write(&self, data: &[u8]) -> Result<u64, SyscallError> {
        let result = self.raw.sys.call_blob(&Request::BlobWrite {
            fd: self.raw.fd,
            data: data.to_vec(),
        })?;
        if !result.success {
            return Err(SyscallError::BlobFailed {
                op: "write",
                fd: self.raw.fd,
            });
        }
        Ok(result.len)
    }

    /// Append `trailer`, seal the blob, and return a read handle to it.
    /// The content address is the hex digest of the sealed bytes.
    pub fn finalize(self, trailer: &[u8]) -> Result<Blob<'c, S>, SyscallError> {
        let result = self.raw.sys.call_blob(&Request::BlobFinalize {
            fd: self.raw.fd,
            data: trailer.to_vec(),
        })?;
        if !result.success {
            return Err(SyscallError::BlobFailed {
                op: "finalize",
                fd: self.raw.fd,
            });
        }
        let name = result
            .data
            .and_then(|bytes| String::from_utf8(bytes).ok());
        // The fd stays open and turns into the read handle.
        let NewBlob { raw } = self;
        Ok(Blob {
            raw,
            len: result.len,
            name,
            cursor: Cell::new(0),
        })
    }
}

/// A finalized, readable blob.
pub struct Blob<'c, S: Read + Write> {
    raw: RawBlob<'c, S>,
    len: u64,
    name: Option<String>,
    cursor: Cell<u64>,
}

impl<'c, S: Read + Write> Blob<'c, S> {
    pub(crate) fn from_parts(
        sys: &'c Syscall<S>,
        fd: u64,
        len: u64,
        name: Option<String>,
    ) -> Self {
        Blob {
            raw: RawBlob { sys, fd },
            len,
            name,
            cursor: Cell::new(0),
        }
    }

    /// The read fd.
    #[must_use]
    pub fn fd(&self) -> u64 {
        self.raw.fd
    }

    /// Total length the host reported when it handed out the fd.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the host reported a zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The content address, when known. Blobs opened through entries or
    /// invocations carry none.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Read the next chunk, advancing an internal cursor. The host picks
    /// the chunk size. Empty at end of blob.
    pub fn read(&self) -> Result<Vec<u8>, SyscallError> {
        let offset = self.cursor.get();
        let data = self.read_at(Some(offset), None)?;
        self.cursor.set(offset + data.len() as u64);
        Ok(data)
    }

    /// Read `length` bytes at `offset`. `None` for either defers to the
    /// host's cursor and chunk size.
    pub fn read_at(
        &self,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> Result<Vec<u8>, SyscallError> {
        let result = self.raw.sys.call_blob(&Request::BlobRead {
            fd: self.raw.fd,
            offset,
            length,
        })?;
        if !result.success {
            return Err(SyscallError::BlobFailed {
                op: "read",
                fd: self.raw.fd,
            });
        }
        Ok(result.data.unwrap_or_default())
    }
}
