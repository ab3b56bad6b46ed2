//! Last-fetched snapshot of a remote collection.
//!
//! # Design
//! The store never talks to the network. `begin_fetch` hands out a
//! `FetchTicket`; the host performs the request and returns the result with
//! `complete_fetch`. Fetches are not de-duplicated: every trigger gets its
//! own ticket, and whichever response arrives last replaces the snapshot.
//!
//! Tickets are bound to an activation epoch. `deactivate` moves to a new
//! epoch and empties the store, so responses belonging to a screen that has
//! gone away are discarded instead of being applied, and a remounted screen
//! starts from nothing. Each ticket completes at most once.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// One-shot message for the user (an alert dialog on the host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Proof that a fetch was started; returned with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    epoch: u64,
    seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The snapshot was replaced with `len` items.
    Applied { len: usize },
    /// The fetch failed; the previous snapshot is kept.
    Failed,
    /// The ticket belongs to a past activation; nothing changed.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct CollectionStore<T> {
    name: &'static str,
    snapshot: Vec<T>,
    state: LoadState,
    error: Option<String>,
    notifications: VecDeque<Notification>,
    epoch: u64,
    next_seq: u64,
    outstanding: BTreeSet<u64>,
}

impl<T> CollectionStore<T> {
    /// An empty store for the collection called `name` (used in logs).
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            snapshot: Vec::new(),
            state: LoadState::Loading,
            error: None,
            notifications: VecDeque::new(),
            epoch: 0,
            next_seq: 0,
            outstanding: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn snapshot(&self) -> &[T] {
        &self.snapshot
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Message of the last failed fetch, cleared by the next trigger.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        let ticket = FetchTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.outstanding.insert(ticket.seq);
        self.state = LoadState::Loading;
        self.error = None;
        debug!(collection = self.name, seq = ticket.seq, "fetch started");
        ticket
    }

    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<T>, ApiError>,
    ) -> FetchOutcome {
        if ticket.epoch != self.epoch {
            debug!(
                collection = self.name,
                seq = ticket.seq,
                "discarding response from a previous activation"
            );
            return FetchOutcome::Discarded;
        }
        if !self.outstanding.remove(&ticket.seq) {
            debug!(collection = self.name, seq = ticket.seq, "ticket already completed");
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(items) => {
                let len = items.len();
                self.snapshot = items;
                self.state = LoadState::Ready;
                self.error = None;
                debug!(collection = self.name, seq = ticket.seq, len, "snapshot replaced");
                FetchOutcome::Applied { len }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(collection = self.name, seq = ticket.seq, error = %message, "fetch failed");
                self.state = LoadState::Error;
                self.notifications.push_back(Notification::error(message.clone()));
                self.error = Some(message);
                FetchOutcome::Failed
            }
        }
    }

    /// Abandon in-flight fetches and drop everything the activation held.
    ///
    /// Late responses are discarded; the store is back to empty and
    /// `Loading` with no error and no queued notifications.
    pub fn deactivate(&mut self) {
        if !self.outstanding.is_empty() {
            debug!(collection = self.name, in_flight = self.outstanding.len(), "cancelling fetches");
        }
        self.epoch += 1;
        self.outstanding.clear();
        self.snapshot.clear();
        self.state = LoadState::Loading;
        self.error = None;
        self.notifications.clear();
    }

    /// Queue a notification produced outside of fetching.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }
}
