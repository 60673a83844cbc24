// CLASSIFICATION: COMMUNITY
// Filename: syscall.rs v0.10
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! The syscall context a sandboxed function runs against.
//!
//! One [`Syscall`] wraps the single channel to the host. Handles borrow the
//! context, so every handle's close lands on the same stream that opened it,
//! and the borrow checker keeps handles from outliving the context. Interior
//! mutability lets many live handles share the channel; calls themselves are
//! strictly one at a time.
//!
//! Host refusals come back as `false` or `None`. Only transport, codec and
//! protocol faults raise [`SyscallError`].

use std::cell::RefCell;
use std::io::{Read, Write};

use labeldoor_buckle::{Buckle, Component, Privilege};
use labeldoor_wire::{
    Bootstrap, DentCreateKind, DentInvokeResult, DentKind, DentListResult, DentLsFacetedResult,
    DentLsGateResult, DentOpenEntry, DentOpenResult, DentResult, GateSpec, HttpResult, HttpVerb,
    Request, Response, ServiceSpec, ValueResult, WriteResult,
};

use crate::blob::{Blob, NewBlob};
use crate::channel::Channel;
use crate::dent::{
    guard_for_kind, BlobEntry, DirEntry, Directory, FacetedDirectory, File, Gate, RawDent,
    Service, Unlinked,
};
use crate::error::SyscallError;
use crate::path::Path;

/// Syscall context for one function instance.
pub struct Syscall<S: Read + Write> {
    chan: RefCell<Channel<S>>,
}

fn unexpected(expected: &'static str, got: &Response) -> SyscallError {
    SyscallError::UnexpectedResponse {
        expected,
        got: got.kind(),
    }
}

impl<S: Read + Write> Syscall<S> {
    /// Build a context over a connected host stream.
    pub fn new(stream: S) -> Self {
        Syscall {
            chan: RefCell::new(Channel::new(stream)),
        }
    }

    /// Receive the invocation envelope. Call once, before anything else.
    pub fn bootstrap(&self) -> Result<Bootstrap, SyscallError> {
        self.chan.borrow_mut().recv_bootstrap()
    }

    /// Report the invocation's result. The host sends no reply; the
    /// instance is expected to exit afterwards.
    pub fn finish(&self, payload: Vec<u8>) -> Result<(), SyscallError> {
        self.chan.borrow_mut().send(&Request::Finish { payload })
    }

    pub(crate) fn call(&self, request: &Request) -> Result<Response, SyscallError> {
        self.chan.borrow_mut().call(request)
    }

    // ---- expectation helpers, shared with the handle modules ----

    pub(crate) fn call_value(&self, request: &Request) -> Result<ValueResult, SyscallError> {
        match self.call(request)? {
            Response::Value(v) => Ok(v),
            other => Err(unexpected("Value", &other)),
        }
    }

    pub(crate) fn call_write(&self, request: &Request) -> Result<WriteResult, SyscallError> {
        match self.call(request)? {
            Response::Write(w) => Ok(w),
            other => Err(unexpected("Write", &other)),
        }
    }

    pub(crate) fn call_dent(&self, request: &Request) -> Result<DentResult, SyscallError> {
        match self.call(request)? {
            Response::Dent(d) => Ok(d),
            other => Err(unexpected("Dent", &other)),
        }
    }

    pub(crate) fn call_dent_open(&self, request: &Request) -> Result<DentOpenResult, SyscallError> {
        match self.call(request)? {
            Response::DentOpen(d) => Ok(d),
            other => Err(unexpected("DentOpen", &other)),
        }
    }

    // ---- invocation key-value store ----

    /// Read a value from the invocation store.
    pub fn read_key(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SyscallError> {
        Ok(self
            .call_value(&Request::ReadKey { key: key.to_vec() })?
            .value)
    }

    /// Write a value into the invocation store.
    pub fn write_key(&self, key: &[u8], value: &[u8]) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::WriteKey {
                key: key.to_vec(),
                value: value.to_vec(),
            })?
            .success)
    }

    // ---- path-addressed filesystem ----

    /// Read the file at `path`. `None` when the path does not resolve or
    /// the read is not permitted.
    pub fn fs_read(&self, path: &Path) -> Result<Option<Vec<u8>>, SyscallError> {
        Ok(self
            .call_value(&Request::FsRead {
                path: path.components().to_vec(),
            })?
            .value)
    }

    /// Overwrite the file at `path`.
    pub fn fs_write(&self, path: &Path, data: &[u8]) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::FsWrite {
                path: path.components().to_vec(),
                data: data.to_vec(),
            })?
            .success)
    }

    /// Create a directory named `name` under `base`.
    pub fn fs_create_dir(
        &self,
        base: &Path,
        name: &str,
        label: Option<Buckle>,
    ) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::FsCreateDir {
                base: base.components().to_vec(),
                name: name.to_string(),
                label,
            })?
            .success)
    }

    /// Create a file named `name` under `base`.
    pub fn fs_create_file(
        &self,
        base: &Path,
        name: &str,
        label: Option<Buckle>,
    ) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::FsCreateFile {
                base: base.components().to_vec(),
                name: name.to_string(),
                label,
            })?
            .success)
    }

    /// Create a faceted directory named `name` under `base`.
    pub fn fs_create_faceted_dir(&self, base: &Path, name: &str) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::FsCreateFacetedDir {
                base: base.components().to_vec(),
                name: name.to_string(),
            })?
            .success)
    }

    // ---- labels and privilege ----

    /// The context's current label.
    pub fn current_label(&self) -> Result<Buckle, SyscallError> {
        match self.call(&Request::GetCurrentLabel)? {
            Response::Label(label) => Ok(label),
            other => Err(unexpected("Label", &other)),
        }
    }

    /// Fold `label` into the current label and return the result. Raising
    /// the label always succeeds.
    pub fn taint(&self, label: &Buckle) -> Result<Buckle, SyscallError> {
        match self.call(&Request::TaintWithLabel {
            label: label.clone(),
        })? {
            Response::Label(label) => Ok(label),
            other => Err(unexpected("Label", &other)),
        }
    }

    /// Lower current secrecy toward `secrecy`. `None` when the context's
    /// privilege does not justify the drop.
    pub fn declassify(&self, secrecy: Component) -> Result<Option<Buckle>, SyscallError> {
        match self.call(&Request::Declassify { secrecy })? {
            Response::MaybeLabel(label) => Ok(label),
            other => Err(unexpected("MaybeLabel", &other)),
        }
    }

    /// Raise current integrity with the ambient privilege, or with an
    /// explicit one.
    pub fn endorse(
        &self,
        with_privilege: Option<Component>,
    ) -> Result<Option<Buckle>, SyscallError> {
        match self.call(&Request::Endorse { with_privilege })? {
            Response::MaybeLabel(label) => Ok(label),
            other => Err(unexpected("MaybeLabel", &other)),
        }
    }

    /// Narrow the context privilege by appending `suffix` to its delegation
    /// chains, and return the replacement. Irreversible for this instance.
    pub fn sub_privilege(&self, suffix: Vec<String>) -> Result<Privilege, SyscallError> {
        match self.call(&Request::SubPrivilege { suffix })? {
            Response::Privilege(privilege) => Ok(privilege),
            other => Err(unexpected("Privilege", &other)),
        }
    }

    /// Ask the host to parse a label string. `None` on a parse failure.
    pub fn buckle_parse(&self, text: &str) -> Result<Option<Buckle>, SyscallError> {
        match self.call(&Request::BuckleParse {
            text: text.to_string(),
        })? {
            Response::MaybeLabel(label) => Ok(label),
            other => Err(unexpected("MaybeLabel", &other)),
        }
    }

    // ---- path-addressed invocation ----

    /// Invoke the gate at `gate` with `payload`.
    pub fn invoke(&self, gate: &Path, payload: &[u8]) -> Result<bool, SyscallError> {
        Ok(self
            .call_write(&Request::Invoke {
                gate: gate.components().to_vec(),
                payload: payload.to_vec(),
            })?
            .success)
    }

    /// Invoke the external service at `service` with `body`.
    pub fn invoke_service(&self, service: &Path, body: &[u8]) -> Result<HttpResult, SyscallError> {
        match self.call(&Request::InvokeService {
            service: service.components().to_vec(),
            body: body.to_vec(),
        })? {
            Response::Service(result) => Ok(result),
            other => Err(unexpected("Service", &other)),
        }
    }

    /// Relay a GitHub REST call through the host.
    pub fn github_rest(
        &self,
        verb: HttpVerb,
        route: &str,
        body: Option<Vec<u8>>,
        toblob: bool,
    ) -> Result<HttpResult, SyscallError> {
        match self.call(&Request::GithubRest {
            verb,
            route: route.to_string(),
            body,
            toblob,
        })? {
            Response::Http(result) => Ok(result),
            other => Err(unexpected("Http", &other)),
        }
    }

    // ---- handles ----

    /// The root directory. Fd 0 is never closed, so dropping this handle
    /// sends nothing.
    pub fn root(&self) -> Directory<'_, S> {
        Directory::root(self)
    }

    /// Walk `path` from `base`, one open per component, and return a handle
    /// to the final entry. Intermediate entries are closed as the walk
    /// advances. `Ok(None)` when a component does not resolve, when the walk
    /// is not permitted, or when `path` is empty.
    pub fn open_at(
        &self,
        base: &impl crate::dent::Entry,
        path: &Path,
    ) -> Result<Option<DirEntry<'_, S>>, SyscallError> {
        let mut walked: Option<(RawDent<'_, S>, DentKind)> = None;
        for component in path.components() {
            let fd = walked.as_ref().map_or_else(|| base.fd(), |(raw, _)| raw.fd);
            let entry = match component {
                labeldoor_wire::PathComponent::Name(name) => DentOpenEntry::Name(name.clone()),
                labeldoor_wire::PathComponent::Facet(label) => {
                    DentOpenEntry::Facet(label.clone())
                }
            };
            let opened = self.call_dent_open(&Request::DentOpen { fd, entry })?;
            if !opened.success {
                return Ok(None);
            }
            // Drop of the previous guard clunks the intermediate fd.
            walked = Some((RawDent::owned(self, opened.fd), opened.kind));
        }
        Ok(walked.map(|(raw, kind)| guard_for_kind(raw, kind)))
    }

    pub(crate) fn dent_create(
        &self,
        kind: DentCreateKind,
        label: Option<Buckle>,
    ) -> Result<Option<u64>, SyscallError> {
        let result = self.call_dent(&Request::DentCreate { kind, label })?;
        if result.success {
            Ok(result.fd)
        } else {
            Ok(None)
        }
    }

    /// Mint an unlinked directory.
    pub fn create_directory(
        &self,
        label: Option<Buckle>,
    ) -> Result<Option<Directory<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::Directory, label)?
            .map(|fd| Directory::from_raw(RawDent::owned(self, fd))))
    }

    /// Mint an unlinked file.
    pub fn create_file(&self, label: Option<Buckle>) -> Result<Option<File<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::File, label)?
            .map(|fd| File::from_raw(RawDent::owned(self, fd))))
    }

    /// Mint an unlinked faceted directory.
    pub fn create_faceted_directory(
        &self,
    ) -> Result<Option<FacetedDirectory<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::FacetedDirectory, None)?
            .map(|fd| FacetedDirectory::from_raw(RawDent::owned(self, fd))))
    }

    /// Mint an unlinked gate. Image fds inside a direct gate must be live
    /// finalized blobs in this context.
    pub fn create_gate(
        &self,
        spec: GateSpec,
        label: Option<Buckle>,
    ) -> Result<Option<Gate<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::Gate(spec), label)?
            .map(|fd| Gate::from_raw(RawDent::owned(self, fd))))
    }

    /// Mint an unlinked service.
    pub fn create_service(
        &self,
        spec: ServiceSpec,
        label: Option<Buckle>,
    ) -> Result<Option<Service<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::Service(spec), label)?
            .map(|fd| Service::from_raw(RawDent::owned(self, fd))))
    }

    /// Mint an unlinked named entry over a finalized blob.
    pub fn create_blob_entry(
        &self,
        blob: &Blob<'_, S>,
        label: Option<Buckle>,
    ) -> Result<Option<BlobEntry<'_, S>>, SyscallError> {
        Ok(self
            .dent_create(DentCreateKind::Blob(blob.fd()), label)?
            .map(|fd| BlobEntry::from_raw(RawDent::owned(self, fd))))
    }

    /// Acquire a fresh staging blob.
    pub fn create_blob(&self, size_hint: Option<u64>) -> Result<NewBlob<'_, S>, SyscallError> {
        NewBlob::create(self, size_hint)
    }

    /// Attach to a sealed blob by its content address. `None` when the
    /// host holds no blob under that name.
    pub fn open_blob(&self, name: &str) -> Result<Option<Blob<'_, S>>, SyscallError> {
        let result = self.call_blob(&Request::BlobOpen {
            name: name.to_string(),
        })?;
        if !result.success {
            return Ok(None);
        }
        Ok(Some(Blob::from_parts(
            self,
            result.fd,
            result.len,
            Some(name.to_string()),
        )))
    }

    // ---- fd-level plumbing shared with the handle modules ----

    pub(crate) fn dent_close(&self, fd: u64) -> Result<bool, SyscallError> {
        Ok(self.call_dent(&Request::DentClose { fd })?.success)
    }

    pub(crate) fn dent_list(&self, fd: u64) -> Result<DentListResult, SyscallError> {
        match self.call(&Request::DentList { fd })? {
            Response::DentList(list) => Ok(list),
            other => Err(unexpected("DentList", &other)),
        }
    }

    pub(crate) fn dent_ls_faceted(
        &self,
        fd: u64,
        clearance: Buckle,
    ) -> Result<DentLsFacetedResult, SyscallError> {
        match self.call(&Request::DentLsFaceted { fd, clearance })? {
            Response::DentLsFaceted(list) => Ok(list),
            other => Err(unexpected("DentLsFaceted", &other)),
        }
    }

    pub(crate) fn dent_ls_gate(&self, fd: u64) -> Result<DentLsGateResult, SyscallError> {
        match self.call(&Request::DentLsGate { fd })? {
            Response::DentLsGate(gate) => Ok(gate),
            other => Err(unexpected("DentLsGate", &other)),
        }
    }

    pub(crate) fn dent_invoke(
        &self,
        request: &Request,
    ) -> Result<DentInvokeResult, SyscallError> {
        match self.call(request)? {
            Response::DentInvoke(result) => Ok(result),
            other => Err(unexpected("DentInvoke", &other)),
        }
    }

    pub(crate) fn call_blob(
        &self,
        request: &Request,
    ) -> Result<labeldoor_wire::BlobResult, SyscallError> {
        match self.call(request)? {
            Response::Blob(result) => Ok(result),
            other => Err(unexpected("Blob", &other)),
        }
    }

    /// Detach an entry fd into a relinkable handle. Used by unlink.
    pub(crate) fn unlinked(&self, fd: u64) -> Unlinked<'_, S> {
        Unlinked::from_raw(RawDent::owned(self, fd))
    }
}
