// CLASSIFICATION: COMMUNITY
// Filename: dent.rs v0.9
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Typed handles to directory entries.
//!
//! Every open entry is an fd in the host's per-instance table. A handle owns
//! its fd and releases it on drop; fd 0, the root directory, is the one fd
//! the host never hands back, so the root handle drops silently. Handles
//! borrow the [`Syscall`] context, which pins them to the stream their fds
//! live on.

use std::io::{Read, Write};

use labeldoor_buckle::Buckle;
use labeldoor_wire::{
    DentInvokeResult, DentKind, DentOpenEntry, DentUpdateKind, GateSpec, Request, ServiceSpec,
};
use log::warn;
use std::collections::BTreeMap;

use crate::blob::Blob;
use crate::error::SyscallError;
use crate::syscall::Syscall;

/// Anything with an open fd in the host table.
pub trait Entry {
    /// The host-side descriptor.
    fn fd(&self) -> u64;
}

/// Fd ownership. Dropping an owned fd sends `DentClose`; a failure to close
/// is logged, not raised, since drop has nowhere to report it.
pub(crate) struct RawDent<'c, S: Read + Write> {
    pub(crate) sys: &'c Syscall<S>,
    pub(crate) fd: u64,
    close_on_drop: bool,
}

impl<'c, S: Read + Write> RawDent<'c, S> {
    pub(crate) fn owned(sys: &'c Syscall<S>, fd: u64) -> Self {
        RawDent {
            sys,
            fd,
            close_on_drop: true,
        }
    }

    fn root(sys: &'c Syscall<S>) -> Self {
        RawDent {
            sys,
            fd: 0,
            close_on_drop: false,
        }
    }
}

impl<S: Read + Write> Drop for RawDent<'_, S> {
    fn drop(&mut self) {
        if !self.close_on_drop {
            return;
        }
        match self.sys.dent_close(self.fd) {
            Ok(true) => {}
            Ok(false) => warn!("close refused for fd {}", self.fd),
            Err(err) => warn!("close failed for fd {}: {err}", self.fd),
        }
    }
}

macro_rules! dent_guard {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<'c, S: Read + Write> {
            raw: RawDent<'c, S>,
        }

        impl<'c, S: Read + Write> $name<'c, S> {
            pub(crate) fn from_raw(raw: RawDent<'c, S>) -> Self {
                $name { raw }
            }
        }

        impl<S: Read + Write> Entry for $name<'_, S> {
            fn fd(&self) -> u64 {
                self.raw.fd
            }
        }
    };
}

dent_guard! {
    /// A plain directory: named edges to other entries.
    Directory
}
dent_guard! {
    /// A labeled byte-array file.
    File
}
dent_guard! {
    /// A directory keyed by facet label instead of name.
    FacetedDirectory
}
dent_guard! {
    /// An invocable gate.
    Gate
}
dent_guard! {
    /// An invocable external service.
    Service
}
dent_guard! {
    /// A named reference to a finalized blob.
    BlobEntry
}
dent_guard! {
    /// An entry detached from its directory by unlink. Still open, still
    /// linkable elsewhere; dropping it without relinking orphans the entry.
    Unlinked
}

impl<'c, S: Read + Write> Directory<'c, S> {
    pub(crate) fn root(sys: &'c Syscall<S>) -> Self {
        Directory {
            raw: RawDent::root(sys),
        }
    }

    /// Open the named child. `Ok(None)` when the name is absent or the
    /// open is refused.
    pub fn open(&self, name: &str) -> Result<Option<DirEntry<'c, S>>, SyscallError> {
        let opened = self.raw.sys.call_dent_open(&Request::DentOpen {
            fd: self.raw.fd,
            entry: DentOpenEntry::Name(name.to_string()),
        })?;
        if !opened.success {
            return Ok(None);
        }
        Ok(Some(guard_for_kind(
            RawDent::owned(self.raw.sys, opened.fd),
            opened.kind,
        )))
    }

    /// Names and kinds of the directory's entries.
    pub fn list(&self) -> Result<Option<BTreeMap<String, DentKind>>, SyscallError> {
        let listing = self.raw.sys.dent_list(self.raw.fd)?;
        if listing.success {
            Ok(Some(listing.entries))
        } else {
            Ok(None)
        }
    }

    /// Add a named edge to an open entry. Fails on a name collision or a
    /// label violation.
    pub fn link(&self, name: &str, target: &impl Entry) -> Result<bool, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentLink {
            dir_fd: self.raw.fd,
            name: name.to_string(),
            target_fd: target.fd(),
        })?;
        Ok(result.success)
    }

    /// Remove a named edge. On success the detached entry comes back as a
    /// handle that can be linked under another name.
    pub fn unlink(&self, name: &str) -> Result<Option<Unlinked<'c, S>>, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentUnlink {
            dir_fd: self.raw.fd,
            name: name.to_string(),
        })?;
        match (result.success, result.fd) {
            (true, Some(fd)) => Ok(Some(self.raw.sys.unlinked(fd))),
            _ => Ok(None),
        }
    }
}

impl<S: Read + Write> File<'_, S> {
    /// The file's contents. `None` when reading is not permitted.
    pub fn read(&self) -> Result<Option<Vec<u8>>, SyscallError> {
        Ok(self
            .raw
            .sys
            .call_value(&Request::DentRead { fd: self.raw.fd })?
            .value)
    }

    /// Replace the file's contents.
    pub fn write(&self, data: &[u8]) -> Result<bool, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentUpdate {
            fd: self.raw.fd,
            kind: DentUpdateKind::File(data.to_vec()),
        })?;
        Ok(result.success)
    }
}

impl<'c, S: Read + Write> FacetedDirectory<'c, S> {
    /// Open one facet as a directory, allocating it if absent.
    pub fn open_facet(&self, facet: &Buckle) -> Result<Option<Directory<'c, S>>, SyscallError> {
        let opened = self.raw.sys.call_dent_open(&Request::DentOpen {
            fd: self.raw.fd,
            entry: DentOpenEntry::Facet(facet.clone()),
        })?;
        if !opened.success {
            return Ok(None);
        }
        Ok(Some(Directory::from_raw(RawDent::owned(
            self.raw.sys,
            opened.fd,
        ))))
    }

    /// Facet labels with content, up to `clearance`.
    pub fn facets(&self, clearance: Buckle) -> Result<Option<Vec<Buckle>>, SyscallError> {
        let listing = self.raw.sys.dent_ls_faceted(self.raw.fd, clearance)?;
        if listing.success {
            Ok(Some(listing.facets))
        } else {
            Ok(None)
        }
    }
}

impl<'c, S: Read + Write> Gate<'c, S> {
    /// Invoke the gate. With `sync` the result bytes come back inline;
    /// without it the call returns as soon as the host accepts the
    /// invocation, with no result. `params` ride along as invocation
    /// headers for the function to read.
    pub fn invoke(
        &self,
        payload: &[u8],
        sync: bool,
        params: BTreeMap<String, String>,
    ) -> Result<Option<Vec<u8>>, SyscallError> {
        let result = self.raw.sys.dent_invoke(&Request::DentInvoke {
            fd: self.raw.fd,
            payload: payload.to_vec(),
            sync,
            toblob: false,
            params,
        })?;
        if !result.success {
            return Ok(None);
        }
        Ok(Some(result.data.unwrap_or_default()))
    }

    /// Invoke the gate and materialize the result as a blob.
    pub fn invoke_to_blob(
        &self,
        payload: &[u8],
        params: BTreeMap<String, String>,
    ) -> Result<Option<Blob<'c, S>>, SyscallError> {
        let result = self.raw.sys.dent_invoke(&Request::DentInvoke {
            fd: self.raw.fd,
            payload: payload.to_vec(),
            sync: true,
            toblob: true,
            params,
        })?;
        match (result.success, result.fd) {
            (true, Some(fd)) => Ok(Some(Blob::from_parts(self.raw.sys, fd, result.len, None))),
            _ => Ok(None),
        }
    }

    /// The gate's contents. Image fds of a direct gate come back freshly
    /// opened and are the caller's to close.
    pub fn spec(&self) -> Result<Option<GateSpec>, SyscallError> {
        let result = self.raw.sys.dent_ls_gate(self.raw.fd)?;
        if result.success {
            Ok(result.gate)
        } else {
            Ok(None)
        }
    }

    /// Replace the gate's contents, possibly switching its shape.
    pub fn update(&self, spec: GateSpec) -> Result<bool, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentUpdate {
            fd: self.raw.fd,
            kind: DentUpdateKind::Gate(spec),
        })?;
        Ok(result.success)
    }
}

impl<S: Read + Write> Service<'_, S> {
    /// Call the service. `params` fill the URL template and extend the
    /// stored headers. Without `sync` the call returns once the host
    /// accepts the relay, with no response body.
    pub fn call(
        &self,
        body: &[u8],
        sync: bool,
        params: BTreeMap<String, String>,
    ) -> Result<Option<DentInvokeResult>, SyscallError> {
        let result = self.raw.sys.dent_invoke(&Request::DentInvoke {
            fd: self.raw.fd,
            payload: body.to_vec(),
            sync,
            toblob: false,
            params,
        })?;
        if result.success {
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }

    /// Replace the service's contents.
    pub fn update(&self, spec: ServiceSpec) -> Result<bool, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentUpdate {
            fd: self.raw.fd,
            kind: DentUpdateKind::Service(spec),
        })?;
        Ok(result.success)
    }
}

impl<'c, S: Read + Write> BlobEntry<'c, S> {
    /// Open the underlying blob for reading.
    pub fn get(&self) -> Result<Option<Blob<'c, S>>, SyscallError> {
        let result = self
            .raw
            .sys
            .call_blob(&Request::DentGetBlob { fd: self.raw.fd })?;
        if !result.success {
            return Ok(None);
        }
        Ok(Some(Blob::from_parts(
            self.raw.sys,
            result.fd,
            result.len,
            None,
        )))
    }

    /// Point the entry at another finalized blob.
    pub fn update(&self, blob: &Blob<'_, S>) -> Result<bool, SyscallError> {
        let result = self.raw.sys.call_dent(&Request::DentUpdate {
            fd: self.raw.fd,
            kind: DentUpdateKind::Blob(blob.fd()),
        })?;
        Ok(result.success)
    }
}

/// A handle of statically unknown kind, as produced by a path walk.
pub enum DirEntry<'c, S: Read + Write> {
    /// A plain directory.
    Directory(Directory<'c, S>),
    /// A file.
    File(File<'c, S>),
    /// A faceted directory.
    FacetedDirectory(FacetedDirectory<'c, S>),
    /// A gate.
    Gate(Gate<'c, S>),
    /// A service.
    Service(Service<'c, S>),
    /// A blob entry.
    Blob(BlobEntry<'c, S>),
}

pub(crate) fn guard_for_kind<'c, S: Read + Write>(
    raw: RawDent<'c, S>,
    kind: DentKind,
) -> DirEntry<'c, S> {
    match kind {
        DentKind::Directory => DirEntry::Directory(Directory::from_raw(raw)),
        DentKind::File => DirEntry::File(File::from_raw(raw)),
        DentKind::FacetedDirectory => {
            DirEntry::FacetedDirectory(FacetedDirectory::from_raw(raw))
        }
        DentKind::Gate => DirEntry::Gate(Gate::from_raw(raw)),
        DentKind::Service => DirEntry::Service(Service::from_raw(raw)),
        DentKind::Blob => DirEntry::Blob(BlobEntry::from_raw(raw)),
    }
}

impl<'c, S: Read + Write> DirEntry<'c, S> {
    /// The entry's kind.
    #[must_use]
    pub fn kind(&self) -> DentKind {
        match self {
            DirEntry::Directory(_) => DentKind::Directory,
            DirEntry::File(_) => DentKind::File,
            DirEntry::FacetedDirectory(_) => DentKind::FacetedDirectory,
            DirEntry::Gate(_) => DentKind::Gate,
            DirEntry::Service(_) => DentKind::Service,
            DirEntry::Blob(_) => DentKind::Blob,
        }
    }

    /// The directory handle, when the entry is a directory.
    #[must_use]
    pub fn into_directory(self) -> Option<Directory<'c, S>> {
        match self {
            DirEntry::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    /// The file handle, when the entry is a file.
    #[must_use]
    pub fn into_file(self) -> Option<File<'c, S>> {
        match self {
            DirEntry::File(file) => Some(file),
            _ => None,
        }
    }

    /// The faceted directory handle, when the entry is one.
    #[must_use]
    pub fn into_faceted(self) -> Option<FacetedDirectory<'c, S>> {
        match self {
            DirEntry::FacetedDirectory(faceted) => Some(faceted),
            _ => None,
        }
    }

    /// The gate handle, when the entry is a gate.
    #[must_use]
    pub fn into_gate(self) -> Option<Gate<'c, S>> {
        match self {
            DirEntry::Gate(gate) => Some(gate),
            _ => None,
        }
    }

    /// The service handle, when the entry is a service.
    #[must_use]
    pub fn into_service(self) -> Option<Service<'c, S>> {
        match self {
            DirEntry::Service(service) => Some(service),
            _ => None,
        }
    }

    /// The blob entry handle, when the entry is one.
    #[must_use]
    pub fn into_blob_entry(self) -> Option<BlobEntry<'c, S>> {
        match self {
            DirEntry::Blob(blob) => Some(blob),
            _ => None,
        }
    }
}

impl<S: Read + Write> Entry for DirEntry<'_, S> {
    fn fd(&self) -> u64 {
        match self {
            DirEntry::Directory(dir) => dir.fd(),
            DirEntry::File(file) => file.fd(),
            DirEntry::FacetedDirectory(faceted) => faceted.fd(),
            DirEntry::Gate(gate) => gate.fd(),
            DirEntry::Service(service) => service.fd(),
            DirEntry::Blob(blob) => blob.fd(),
        }
    }
}
