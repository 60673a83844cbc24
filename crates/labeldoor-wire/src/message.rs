// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Typed request/response unions and their MessagePack codec.
// Author: Lukas Bower

//! Typed messages carried inside LabelDoor frames.
//!
//! Every operation the host offers has exactly one [`Request`] constructor
//! and maps to exactly one [`Response`] variant. The channel is a unary RPC:
//! one request in flight, one response back, no correlation ids. A response
//! variant other than the one a request expects is a protocol violation the
//! caller must surface loudly; [`Response::kind`] exists to report it.

use std::collections::BTreeMap;

use labeldoor_buckle::{Buckle, Component};
use serde::{Deserialize, Serialize};

/// Codec failures. Both directions are fatal to the channel: an undecodable
/// frame means the peers disagree about the protocol.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A value failed to serialize.
    #[error("encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// A frame payload failed to deserialize.
    #[error("decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// One step of a path: a directory entry name or, inside a faceted
/// directory, an inline facet label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathComponent {
    /// A named entry in a directory.
    Name(String),
    /// A facet of a faceted directory.
    Facet(Buckle),
}

/// Entry kinds the host tags open results with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DentKind {
    /// A plain directory.
    Directory,
    /// A byte-array file.
    File,
    /// A directory whose visible contents depend on the observer's label.
    FacetedDirectory,
    /// An invocable gate.
    Gate,
    /// An invocable external service.
    Service,
    /// A named reference to a content-addressed blob.
    Blob,
}

/// HTTP verbs relayed through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVerb {
    /// HEAD request.
    Head,
    /// GET request.
    Get,
    /// POST request.
    Post,
    /// PUT request.
    Put,
    /// DELETE request.
    Delete,
}

/// Function image referenced by a direct gate. All three image fields are
/// blob fds live in the caller's handle table at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunction {
    /// Memory budget in mebibytes.
    pub memory: u64,
    /// Blob fd of the application image.
    pub app_image: u64,
    /// Blob fd of the runtime image.
    pub runtime: u64,
    /// Blob fd of the kernel image.
    pub kernel: u64,
}

/// Contents of a direct gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectGate {
    /// Privilege the gate confers on the invoked function.
    pub privilege: Component,
    /// Integrity the invoker must be able to endorse.
    pub invoker_clearance: Component,
    /// The function image to launch.
    pub function: WireFunction,
}

/// Contents of a redirect gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectGate {
    /// Privilege the gate confers on the invoked function.
    pub privilege: Component,
    /// Integrity the invoker must be able to endorse.
    pub invoker_clearance: Component,
    /// Gate fd this gate forwards to.
    pub gate: u64,
}

/// A gate is exactly one of the two shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateSpec {
    /// Bound directly to a function image.
    Direct(DirectGate),
    /// Forwarding to another gate.
    Redirect(RedirectGate),
}

/// Contents of an external service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Label folded into the invoker after each call.
    pub taint: Buckle,
    /// Privilege used to declassify the outgoing request.
    pub privilege: Component,
    /// Integrity the invoker must be able to endorse.
    pub invoker_clearance: Component,
    /// Request URL template.
    pub url: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Headers sent with every call.
    pub headers: BTreeMap<String, String>,
}

/// What `DentOpen` resolves against the base fd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DentOpenEntry {
    /// A named child of a directory.
    Name(String),
    /// A facet of a faceted directory.
    Facet(Buckle),
}

/// What `DentCreate` mints. Created entries are unlinked until a
/// `DentLink` names them inside a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DentCreateKind {
    /// An empty directory.
    Directory,
    /// An empty file.
    File,
    /// An empty faceted directory.
    FacetedDirectory,
    /// A gate with the given contents.
    Gate(GateSpec),
    /// A service with the given contents.
    Service(ServiceSpec),
    /// A named blob entry bound to a finalized blob fd.
    Blob(u64),
}

/// What `DentUpdate` replaces in an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DentUpdateKind {
    /// Overwrite a file's contents.
    File(Vec<u8>),
    /// Replace a gate's contents, possibly switching its shape.
    Gate(GateSpec),
    /// Replace a service's contents.
    Service(ServiceSpec),
    /// Rebind a blob entry to another finalized blob fd.
    Blob(u64),
}

/// Requests the client may issue. One constructor per host operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Read a value from the invocation key-value store.
    ReadKey {
        /// Key bytes.
        key: Vec<u8>,
    },
    /// Write a value into the invocation key-value store.
    WriteKey {
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },

    /// Read the file at a path.
    FsRead {
        /// Path from the root.
        path: Vec<PathComponent>,
    },
    /// Overwrite the file at a path.
    FsWrite {
        /// Path from the root.
        path: Vec<PathComponent>,
        /// New contents.
        data: Vec<u8>,
    },
    /// Create a directory under a base path.
    FsCreateDir {
        /// Base directory path.
        base: Vec<PathComponent>,
        /// New entry name.
        name: String,
        /// Label for the new entry; `None` asks the host to use the current
        /// label.
        label: Option<Buckle>,
    },
    /// Create a file under a base path.
    FsCreateFile {
        /// Base directory path.
        base: Vec<PathComponent>,
        /// New entry name.
        name: String,
        /// Label for the new entry.
        label: Option<Buckle>,
    },
    /// Create a faceted directory under a base path.
    FsCreateFacetedDir {
        /// Base directory path.
        base: Vec<PathComponent>,
        /// New entry name.
        name: String,
    },

    /// Fetch the current label without changing it.
    GetCurrentLabel,
    /// Fold a label into the current label.
    TaintWithLabel {
        /// Label to join in.
        label: Buckle,
    },
    /// Lower current secrecy toward a target, contingent on privilege.
    Declassify {
        /// Target secrecy.
        secrecy: Component,
    },
    /// Raise current integrity using held or supplied privilege.
    Endorse {
        /// Privilege to endorse with; `None` uses the ambient privilege.
        with_privilege: Option<Component>,
    },
    /// Replace the context privilege with a narrower delegation.
    SubPrivilege {
        /// Tokens appended to the delegation chain.
        suffix: Vec<String>,
    },
    /// Ask the host to parse a label string.
    BuckleParse {
        /// Candidate label text.
        text: String,
    },

    /// Open one entry relative to an open fd.
    DentOpen {
        /// Base fd (0 is the root directory).
        fd: u64,
        /// Name or facet to resolve.
        entry: DentOpenEntry,
    },
    /// Release an fd.
    DentClose {
        /// The fd to release.
        fd: u64,
    },
    /// Mint a new, unlinked entry.
    DentCreate {
        /// Entry kind and contents.
        kind: DentCreateKind,
        /// Label for the new entry.
        label: Option<Buckle>,
    },
    /// Replace an existing entry's contents.
    DentUpdate {
        /// Target fd.
        fd: u64,
        /// Replacement contents.
        kind: DentUpdateKind,
    },
    /// Read a file entry's contents.
    DentRead {
        /// File fd.
        fd: u64,
    },
    /// Create a named edge to an entry inside a directory.
    DentLink {
        /// Directory fd.
        dir_fd: u64,
        /// Edge name.
        name: String,
        /// Entry to link.
        target_fd: u64,
    },
    /// Remove a named edge from a directory.
    DentUnlink {
        /// Directory fd.
        dir_fd: u64,
        /// Edge name.
        name: String,
    },
    /// List a directory.
    DentList {
        /// Directory fd.
        fd: u64,
    },
    /// List the populated facets of a faceted directory.
    DentLsFaceted {
        /// Faceted directory fd.
        fd: u64,
        /// Upper bound on facet labels returned.
        clearance: Buckle,
    },
    /// Inspect a gate's contents.
    DentLsGate {
        /// Gate fd.
        fd: u64,
    },
    /// Invoke a gate or service entry.
    DentInvoke {
        /// Gate or service fd.
        fd: u64,
        /// Payload delivered to the callee.
        payload: Vec<u8>,
        /// When false, block only for the acknowledgment.
        sync: bool,
        /// Materialize the result as a blob instead of inline bytes.
        toblob: bool,
        /// Invocation parameters (URL template arguments, headers).
        params: BTreeMap<String, String>,
    },
    /// Open the blob behind a blob entry for reading.
    DentGetBlob {
        /// Blob entry fd.
        fd: u64,
    },

    /// Acquire a fresh staging blob.
    BlobCreate {
        /// Expected total size, if known.
        size_hint: Option<u64>,
    },
    /// Append bytes to a staging blob.
    BlobWrite {
        /// Staging blob fd.
        fd: u64,
        /// Bytes to append.
        data: Vec<u8>,
    },
    /// Append final bytes, seal the blob, and learn its content address.
    BlobFinalize {
        /// Staging blob fd.
        fd: u64,
        /// Final bytes to append before sealing.
        data: Vec<u8>,
    },
    /// Attach to an existing immutable blob by content address.
    BlobOpen {
        /// Hex digest naming the blob.
        name: String,
    },
    /// Read from a finalized blob.
    BlobRead {
        /// Blob fd.
        fd: u64,
        /// Read offset; `None` lets the host use its cursor.
        offset: Option<u64>,
        /// Bytes requested; `None` means one host-defined chunk.
        length: Option<u64>,
    },
    /// Release a blob fd.
    BlobClose {
        /// The fd to release.
        fd: u64,
    },

    /// Relay a GitHub REST call through the host.
    GithubRest {
        /// HTTP verb.
        verb: HttpVerb,
        /// Route below the API root.
        route: String,
        /// Request body, if any.
        body: Option<Vec<u8>>,
        /// Materialize the response as a blob.
        toblob: bool,
    },

    /// Invoke a gate by path.
    Invoke {
        /// Path to the gate.
        gate: Vec<PathComponent>,
        /// Payload delivered to the callee.
        payload: Vec<u8>,
    },
    /// Invoke a service by path.
    InvokeService {
        /// Path to the service.
        service: Vec<PathComponent>,
        /// Request body.
        body: Vec<u8>,
    },

    /// Final result of this invocation; the host sends no reply.
    Finish {
        /// Result payload handed back to the invoker.
        payload: Vec<u8>,
    },
}

/// Result of a read-style call: an absent value means "not found", which is
/// distinct from failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResult {
    /// The value, if present.
    pub value: Option<Vec<u8>>,
}

/// Result of a mutation attempted by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Whether the host performed the mutation.
    pub success: bool,
}

/// Result of `DentOpen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentOpenResult {
    /// Whether the component resolved.
    pub success: bool,
    /// The opened fd; meaningful only on success.
    pub fd: u64,
    /// Kind of the opened entry; meaningful only on success.
    pub kind: DentKind,
}

/// Result of fd-addressed entry operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// An fd produced by the operation (created entry, unlinked entry).
    pub fd: Option<u64>,
    /// Inline data produced by the operation.
    pub data: Option<Vec<u8>>,
}

/// Result of `DentList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentListResult {
    /// Whether the listing was permitted.
    pub success: bool,
    /// Entry names and their kinds.
    pub entries: BTreeMap<String, DentKind>,
}

/// Result of `DentLsFaceted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentLsFacetedResult {
    /// Whether the listing was permitted.
    pub success: bool,
    /// Facet labels that currently have content.
    pub facets: Vec<Buckle>,
}

/// Result of `DentLsGate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentLsGateResult {
    /// Whether the fd named a gate.
    pub success: bool,
    /// The gate's contents. Image fields of a direct gate come back as
    /// freshly opened blob fds owned by the caller.
    pub gate: Option<GateSpec>,
}

/// Result of `DentInvoke`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentInvokeResult {
    /// Whether the invocation was accepted and produced a result.
    pub success: bool,
    /// Blob fd holding the result when `toblob` was requested.
    pub fd: Option<u64>,
    /// Byte length of the result blob when `toblob` was requested.
    pub len: u64,
    /// Inline result bytes otherwise.
    pub data: Option<Vec<u8>>,
    /// Response headers for service invocations.
    pub headers: BTreeMap<String, Vec<u8>>,
}

/// Result of blob operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The blob fd the operation applies to or produced.
    pub fd: u64,
    /// Bytes written, read, or total blob length, depending on the call.
    pub len: u64,
    /// Read bytes, the content address on finalize, or an error note.
    pub data: Option<Vec<u8>>,
}

/// Result of a relayed HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResult {
    /// HTTP status code; 0 when the relay itself failed.
    pub status: u32,
    /// Response body, or a blob fd rendering when `toblob` was set.
    pub data: Vec<u8>,
}

/// Responses, exactly one variant per request family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Reply to `ReadKey` and `FsRead` and `DentRead`.
    Value(ValueResult),
    /// Reply to write-style calls.
    Write(WriteResult),
    /// Reply to `GetCurrentLabel` and `TaintWithLabel`.
    Label(Buckle),
    /// Reply to `Declassify`, `Endorse` and `BuckleParse`: `None` reports
    /// refusal or a parse failure.
    MaybeLabel(Option<Buckle>),
    /// Reply to `SubPrivilege`: the replacement privilege.
    Privilege(Component),
    /// Reply to `DentOpen`.
    DentOpen(DentOpenResult),
    /// Reply to `DentClose`, `DentCreate`, `DentUpdate`, `DentLink` and
    /// `DentUnlink`.
    Dent(DentResult),
    /// Reply to `DentList`.
    DentList(DentListResult),
    /// Reply to `DentLsFaceted`.
    DentLsFaceted(DentLsFacetedResult),
    /// Reply to `DentLsGate`.
    DentLsGate(DentLsGateResult),
    /// Reply to `DentInvoke`.
    DentInvoke(DentInvokeResult),
    /// Reply to blob calls and `DentGetBlob`.
    Blob(BlobResult),
    /// Reply to `GithubRest`.
    Http(HttpResult),
    /// Reply to `InvokeService`.
    Service(HttpResult),
}

impl Response {
    /// Stable name of the variant, for protocol-violation reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Value(_) => "Value",
            Response::Write(_) => "Write",
            Response::Label(_) => "Label",
            Response::MaybeLabel(_) => "MaybeLabel",
            Response::Privilege(_) => "Privilege",
            Response::DentOpen(_) => "DentOpen",
            Response::Dent(_) => "Dent",
            Response::DentList(_) => "DentList",
            Response::DentLsFaceted(_) => "DentLsFaceted",
            Response::DentLsGate(_) => "DentLsGate",
            Response::DentInvoke(_) => "DentInvoke",
            Response::Blob(_) => "Blob",
            Response::Http(_) => "Http",
            Response::Service(_) => "Service",
        }
    }
}

/// The envelope the host sends to start an invocation, before any request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bootstrap {
    /// Invocation payload.
    pub payload: Vec<u8>,
    /// Named blob fds pre-opened in the caller's handle table.
    pub blobs: BTreeMap<String, u64>,
    /// Invocation headers.
    pub headers: BTreeMap<String, String>,
}

/// Encode a request for framing.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec(request)?)
}

/// Decode a request from a frame payload.
pub fn decode_request(bytes: &[u8]) -> Result<Request, WireError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode a response for framing.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec(response)?)
}

/// Decode a response from a frame payload.
pub fn decode_response(bytes: &[u8]) -> Result<Response, WireError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encode the bootstrap envelope.
pub fn encode_bootstrap(bootstrap: &Bootstrap) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec(bootstrap)?)
}

/// Decode the bootstrap envelope.
pub fn decode_bootstrap(bytes: &[u8]) -> Result<Bootstrap, WireError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
