//! # Message Envelope
//!
//! The universal unit of traffic on the channel: an opaque byte payload plus
//! an extensible header map keyed by small integers.
//!
//! ## Header discipline
//!
//! - Every outbound message and every reply carries a scope header so the
//!   multiplexer on the receiving side can route it back to the same logical
//!   service.
//! - Request/response flows additionally carry a correlation header with the
//!   request id and direction.
//! - Inserting or reading one header never disturbs the others; unknown
//!   header ids are carried through untouched.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one logical service sharing the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub u16);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Correlation id of one in-flight call. Unique and monotonically increasing
/// per correlator; `(ScopeId, RequestId)` identifies a pending call on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Small-integer key into the message header map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderId(pub u16);

/// Header id carrying the scope tag.
pub const SCOPE_HEADER: HeaderId = HeaderId(1);
/// Header id carrying request/reply correlation metadata.
pub const CORRELATION_HEADER: HeaderId = HeaderId(2);

/// A single header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Header {
    /// Tags the message for one logical service on the shared channel.
    Scope(ScopeId),
    /// Marks the message as a request. `needs_reply` is false for
    /// fire-and-forget traffic, in which case receivers produce no response.
    Request { id: RequestId, needs_reply: bool },
    /// Marks the message as the reply to a previously sent request.
    Reply { id: RequestId, is_error: bool },
}

/// Opaque payload plus extensible header map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Destination endpoint. `None` addresses every member of the view.
    pub dest: Option<Address>,
    /// Sending endpoint, stamped by the transport or the sender.
    pub src: Option<Address>,
    /// Application payload bytes.
    pub payload: Vec<u8>,
    /// Extensible header map keyed by small integers.
    headers: BTreeMap<HeaderId, Header>,
}

impl Message {
    /// Create a message carrying the given payload and no headers.
    #[must_use]
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            dest: None,
            src: None,
            payload,
            headers: BTreeMap::new(),
        }
    }

    /// Set the destination endpoint.
    #[must_use]
    pub fn with_dest(mut self, dest: Address) -> Self {
        self.dest = Some(dest);
        self
    }

    /// Set the source endpoint.
    #[must_use]
    pub fn with_src(mut self, src: Address) -> Self {
        self.src = Some(src);
        self
    }

    /// Insert or replace the header stored under `id`. Other headers are
    /// left untouched.
    pub fn put_header(&mut self, id: HeaderId, header: Header) {
        self.headers.insert(id, header);
    }

    /// Look up the header stored under `id`.
    #[must_use]
    pub fn header(&self, id: HeaderId) -> Option<&Header> {
        self.headers.get(&id)
    }

    /// Number of headers attached to this message.
    #[must_use]
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Typed lookup of the scope tag.
    #[must_use]
    pub fn scope(&self) -> Option<ScopeId> {
        match self.headers.get(&SCOPE_HEADER) {
            Some(Header::Scope(scope)) => Some(*scope),
            _ => None,
        }
    }

    /// Tag this message for the given scope.
    pub fn set_scope(&mut self, scope: ScopeId) {
        self.put_header(SCOPE_HEADER, Header::Scope(scope));
    }

    /// Typed lookup of the correlation header.
    #[must_use]
    pub fn correlation(&self) -> Option<&Header> {
        match self.headers.get(&CORRELATION_HEADER) {
            header @ Some(Header::Request { .. } | Header::Reply { .. }) => header,
            _ => None,
        }
    }

    /// Stamp this message as a request.
    pub fn set_request(&mut self, id: RequestId, needs_reply: bool) {
        self.put_header(CORRELATION_HEADER, Header::Request { id, needs_reply });
    }

    /// Stamp this message as a reply.
    pub fn set_reply(&mut self, id: RequestId, is_error: bool) {
        self.put_header(CORRELATION_HEADER, Header::Reply { id, is_error });
    }

    /// Build the reply envelope for this request: routed back to the sender,
    /// carrying the same scope tag and request id.
    #[must_use]
    pub fn make_reply(&self, payload: Vec<u8>, is_error: bool) -> Option<Message> {
        let dest = self.src?;
        let id = match self.correlation() {
            Some(Header::Request { id, .. }) => *id,
            _ => return None,
        };

        let mut reply = Message::new(payload).with_dest(dest);
        if let Some(scope) = self.scope() {
            reply.set_scope(scope);
        }
        reply.set_reply(id, is_error);
        Some(reply)
    }
}
