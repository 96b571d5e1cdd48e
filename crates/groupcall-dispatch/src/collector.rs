//! # Group Call Collector
//!
//! Per-call state: accumulates one reply per destination, applies the
//! completion policy, and unblocks the waiting caller when the policy is
//! satisfied, a destination becomes unreachable, the timeout elapses, or
//! the dispatcher stops.
//!
//! ## Completion discipline
//!
//! Termination is decided exactly once, under the state lock. Everything
//! that can end a call - a reply arriving, a membership change, the
//! deadline, an abort - funnels through that single gate, so a reply and a
//! timeout can never both believe they completed the call.

use crate::options::{CallOptions, ReplyFilter, ResponseMode};
use crate::reply::{CallResult, Reply, ReplyStatus, Termination};
use groupcall_types::{Address, View};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::Notify;
use tracing::debug;

struct CollectorState {
    /// Replies recorded so far, keyed by sender.
    replies: BTreeMap<Address, Reply>,
    /// Value replies that passed the filter.
    accepted: usize,
    /// Expected destinations holding a terminal reply.
    terminal: usize,
    /// Set exactly once; `None` while the call is live.
    termination: Option<Termination>,
}

/// Accumulates replies for one group call and wakes the caller when its
/// completion policy is met.
pub struct GroupCollector {
    expected: Vec<Address>,
    mode: ResponseMode,
    filter: Option<ReplyFilter>,
    state: Mutex<CollectorState>,
    notify: Notify,
}

impl GroupCollector {
    /// Build a collector for the given destination set and call options.
    #[must_use]
    pub fn new(expected: Vec<Address>, options: &CallOptions) -> Self {
        let collector = Self {
            mode: options.mode,
            filter: options.filter.clone(),
            expected,
            state: Mutex::new(CollectorState {
                replies: BTreeMap::new(),
                accepted: 0,
                terminal: 0,
                termination: None,
            }),
            notify: Notify::new(),
        };

        // Fire-and-forget calls (and empty destination sets in ALL mode)
        // are satisfied before anything arrives.
        {
            let mut state = collector.state.lock();
            if collector.policy_met(&state) {
                state.termination = Some(Termination::Satisfied);
            }
        }
        collector
    }

    /// The destinations this call expects to hear from.
    #[must_use]
    pub fn expected(&self) -> &[Address] {
        &self.expected
    }

    /// Record one reply from `sender`.
    ///
    /// The first terminal reply per sender wins; duplicates and replies
    /// from unexpected senders are ignored. Replies arriving after the call
    /// terminated are still stored but no longer change the outcome.
    ///
    /// Returns true if the reply was newly recorded.
    pub fn record(&self, sender: Address, status: ReplyStatus) -> bool {
        if !self.expected.contains(&sender) {
            debug!(sender = %sender, "Ignoring reply from unexpected sender");
            return false;
        }

        let mut state = self.state.lock();
        if state
            .replies
            .get(&sender)
            .is_some_and(|existing| existing.status.is_terminal())
        {
            debug!(sender = %sender, "Ignoring duplicate reply");
            return false;
        }

        let accepted = match &status {
            ReplyStatus::Value(bytes) => self
                .filter
                .as_ref()
                .map_or(true, |filter| filter(&sender, bytes)),
            _ => false,
        };

        if status.is_terminal() {
            state.terminal += 1;
            if accepted {
                state.accepted += 1;
            }
        }
        state.replies.insert(sender, Reply::now(status));

        if state.termination.is_none() && self.policy_met(&state) {
            state.termination = Some(Termination::Satisfied);
            drop(state);
            self.notify.notify_waiters();
        }
        true
    }

    /// Synthesize `Unreachable` for every departed member of the expected
    /// set that has no terminal reply yet. Lets ALL/MAJORITY calls finish
    /// without waiting out the full timeout.
    pub fn record_unreachable(&self, departed: &[Address]) {
        for address in departed {
            if self.expected.contains(address) {
                debug!(dest = %address, "Destination departed, marking unreachable");
                self.record(*address, ReplyStatus::Unreachable);
            }
        }
    }

    /// React to a new membership view: expected destinations missing from
    /// the view resolve as unreachable.
    pub fn handle_view(&self, view: &View) {
        let departed: Vec<Address> = self
            .expected
            .iter()
            .filter(|dest| !view.contains(dest))
            .copied()
            .collect();
        if !departed.is_empty() {
            self.record_unreachable(&departed);
        }
    }

    /// Terminally retire the call, filling every destination without a
    /// terminal reply with `status`. Used by dispatcher stop. Returns false
    /// if the call already terminated.
    pub fn abort(&self, status: ReplyStatus, termination: Termination) -> bool {
        let mut state = self.state.lock();
        if state.termination.is_some() {
            return false;
        }

        for dest in &self.expected {
            let resolved = state
                .replies
                .get(dest)
                .is_some_and(|reply| reply.status.is_terminal());
            if !resolved {
                state.replies.insert(*dest, Reply::now(status.clone()));
                state.terminal += 1;
            }
        }
        state.termination = Some(termination);
        drop(state);
        self.notify.notify_waiters();
        true
    }

    /// Whether the call has reached a terminal outcome.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.lock().termination.is_some()
    }

    /// Policy evaluation against the current state.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.policy_met(&self.state.lock())
    }

    fn policy_met(&self, state: &CollectorState) -> bool {
        match self.mode {
            ResponseMode::None => true,
            ResponseMode::First => state.accepted >= 1,
            ResponseMode::Majority => state.accepted * 2 > self.expected.len(),
            ResponseMode::All => state.terminal >= self.expected.len(),
        }
    }

    /// Block the calling task until the policy is satisfied, the call is
    /// aborted, or `timeout` elapses - whichever comes first.
    ///
    /// Timeout is an outcome, not an error: the result carries whatever
    /// replies arrived, with the rest marked unresolved. No lock is held
    /// while waiting.
    pub async fn await_completion(&self, timeout: std::time::Duration) -> CallResult {
        let deadline = tokio::time::Instant::now() + timeout;

        let termination = loop {
            // Register interest before checking state, so a completion
            // racing with this check cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(termination) = self.state.lock().termination {
                break termination;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let mut state = self.state.lock();
                // A reply may have won the race with the deadline.
                break *state.termination.get_or_insert(Termination::TimedOut);
            }
        };

        CallResult {
            termination,
            replies: self.snapshot(),
        }
    }

    /// Current replies, with unresolved placeholders for every expected
    /// destination the call never heard from.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Address, Reply> {
        let state = self.state.lock();
        let mut replies = state.replies.clone();
        for dest in &self.expected {
            replies.entry(*dest).or_insert_with(Reply::unresolved);
        }
        replies
    }
}
