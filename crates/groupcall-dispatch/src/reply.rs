//! Per-destination call outcomes.

use groupcall_types::Address;
use std::collections::BTreeMap;
use std::time::Instant;

/// Terminal (or pending) state of one destination within one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    /// The destination answered with a value.
    Value(Vec<u8>),
    /// The destination's handler failed, or its send failed locally.
    Error(String),
    /// The destination departed the view before answering.
    Unreachable,
    /// The dispatcher was stopped while the call was pending.
    Stopped,
    /// Nothing arrived before the call retired.
    Unresolved,
}

impl ReplyStatus {
    /// Whether this status retires the destination for completion
    /// accounting. `Unresolved` does not: it only appears in snapshots of
    /// calls that timed out or completed without this destination.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReplyStatus::Unresolved)
    }
}

/// One destination's reply, with its arrival timestamp. Synthesized replies
/// (unreachable, stopped) carry the instant they were synthesized;
/// unresolved entries carry none.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Outcome for this destination.
    pub status: ReplyStatus,
    /// When the reply arrived or was synthesized.
    pub received_at: Option<Instant>,
}

impl Reply {
    pub(crate) fn now(status: ReplyStatus) -> Self {
        Self {
            status,
            received_at: Some(Instant::now()),
        }
    }

    pub(crate) fn unresolved() -> Self {
        Self {
            status: ReplyStatus::Unresolved,
            received_at: None,
        }
    }

    /// The value bytes, if this reply carries a value.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match &self.status {
            ReplyStatus::Value(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// How a group call reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The completion policy was satisfied.
    Satisfied,
    /// The timeout elapsed first; the result carries whatever arrived.
    TimedOut,
    /// The dispatcher was stopped while the call was pending.
    Stopped,
}

/// Result of one group call: how it ended, plus one entry per expected
/// destination.
#[derive(Debug, Clone)]
pub struct CallResult {
    /// How the call reached its end.
    pub termination: Termination,
    /// Outcome per destination. Every expected destination has an entry;
    /// destinations the call never heard from are `Unresolved`.
    pub replies: BTreeMap<Address, Reply>,
}

impl CallResult {
    /// Whether the completion policy was satisfied.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.termination == Termination::Satisfied
    }

    /// The first value reply, if any.
    #[must_use]
    pub fn first_value(&self) -> Option<(&Address, &[u8])> {
        self.replies
            .iter()
            .find_map(|(addr, reply)| reply.value().map(|v| (addr, v)))
    }

    /// Number of value replies collected.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.replies.values().filter(|r| r.value().is_some()).count()
    }
}
