// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.6
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Client library for sandboxed functions talking to their trusted host.
//!
//! A function owns exactly one duplex byte stream to the host. Everything it
//! may do, from reading a file to minting a gate, is a synchronous
//! request/response exchange over that stream: the [`syscall::Syscall`]
//! context serializes calls, and typed handles ([`dent`], [`blob`]) hold the
//! host-side descriptors and release them on drop.
//!
//! The wire format lives in `labeldoor-wire`; the label model in
//! `labeldoor-buckle`. This crate adds the call discipline, the handle
//! lifecycle, and path resolution on top of them.

/// Framed unary RPC over a duplex stream.
pub mod channel;

/// Error taxonomy for the client surface.
pub mod error;

/// Textual paths and their components.
pub mod path;

/// The syscall context: one per function instance.
pub mod syscall;

/// Typed handles to directory entries.
pub mod dent;

/// Staging and finalized blob handles.
pub mod blob;

pub use blob::{Blob, NewBlob};
pub use channel::Channel;
pub use dent::{
    BlobEntry, DirEntry, Directory, Entry, FacetedDirectory, File, Gate, Service, Unlinked,
};
pub use error::SyscallError;
pub use path::{Path, PathError};
pub use syscall::Syscall;

pub use labeldoor_buckle::{Buckle, BuckleParseError, Clause, Component, Privilege};
pub use labeldoor_wire::{
    Bootstrap, DentKind, DirectGate, GateSpec, HttpResult, HttpVerb, PathComponent, RedirectGate,
    ServiceSpec, WireFunction,
};
