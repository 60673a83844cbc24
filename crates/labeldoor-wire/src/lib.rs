// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the LabelDoor wire layer: frame transport and message codec.
// Author: Lukas Bower

//! Wire layer for the LabelDoor protocol.
//!
//! [`frame`] moves opaque byte payloads over a duplex stream with a 4-byte
//! big-endian length prefix. [`message`] defines the typed request/response
//! unions that travel inside those frames, encoded as MessagePack. The two
//! layers are independent: the frame codec never inspects payloads and the
//! message codec never touches the stream.

pub mod frame;
pub mod message;

pub use frame::{recv_frame, send_frame, FrameError, MAX_FRAME_BYTES};
pub use message::{
    decode_bootstrap, decode_request, decode_response, encode_bootstrap, encode_request,
    encode_response, BlobResult, Bootstrap, DentCreateKind, DentInvokeResult, DentKind,
    DentListResult, DentLsFacetedResult, DentLsGateResult, DentOpenEntry, DentOpenResult,
    DentResult, DentUpdateKind, DirectGate, GateSpec, HttpResult, HttpVerb, PathComponent,
    RedirectGate, Request, Response, ServiceSpec, ValueResult, WireError, WireFunction,
    WriteResult,
};
