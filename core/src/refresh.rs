//! When a listing must re-fetch, and guarding mutations against resubmission.
//!
//! Freshness is pull-based and event-driven: a screen re-fetches when it is
//! first shown, when it regains focus after being left, and after every
//! mutation settles (success or failure). There is no polling.

use std::collections::HashSet;
use std::fmt;

use crate::error::ApiError;

/// Lifecycle events a host screen reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenEvent {
    Mounted,
    Focused,
    Blurred,
    MutationSettled,
    Unmounted,
}

/// What the screen must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Fetch,
    Skip,
    /// The screen went away; cancel its in-flight fetches.
    Deactivate,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshTrigger {
    mounted: bool,
    focused: bool,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.mounted
    }

    pub fn on_event(&mut self, event: ScreenEvent) -> Refresh {
        match event {
            // A focus before any mount counts as the first activation.
            ScreenEvent::Mounted | ScreenEvent::Focused if !self.mounted => {
                self.mounted = true;
                self.focused = true;
                Refresh::Fetch
            }
            ScreenEvent::Mounted => Refresh::Skip,
            ScreenEvent::Focused if self.focused => Refresh::Skip,
            ScreenEvent::Focused => {
                self.focused = true;
                Refresh::Fetch
            }
            ScreenEvent::Blurred => {
                self.focused = false;
                Refresh::Skip
            }
            ScreenEvent::MutationSettled if self.mounted => Refresh::Fetch,
            ScreenEvent::MutationSettled => Refresh::Skip,
            ScreenEvent::Unmounted => {
                self.mounted = false;
                self.focused = false;
                Refresh::Deactivate
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CreatePet,
    UpdatePet,
    DeletePet,
    CreateVaccine,
    StartAdoption,
    AcceptAdoption,
    DenyAdoption,
}

impl MutationKind {
    /// Confirmation shown when the backend sends no message of its own.
    pub fn done_message(&self) -> &'static str {
        match self {
            MutationKind::CreatePet => "Pet registered",
            MutationKind::UpdatePet => "Pet updated",
            MutationKind::DeletePet => "Pet deleted",
            MutationKind::CreateVaccine => "Vaccine registered",
            MutationKind::StartAdoption => "Adoption requested",
            MutationKind::AcceptAdoption => "Adoption accepted",
            MutationKind::DenyAdoption => "Adoption denied",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationKind::CreatePet => "creating the pet",
            MutationKind::UpdatePet => "updating the pet",
            MutationKind::DeletePet => "deleting the pet",
            MutationKind::CreateVaccine => "registering the vaccine",
            MutationKind::StartAdoption => "the adoption request",
            MutationKind::AcceptAdoption => "accepting the adoption",
            MutationKind::DenyAdoption => "denying the adoption",
        };
        f.write_str(label)
    }
}

/// A mutation on a specific record, or on the collection for creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub kind: MutationKind,
    pub target: Option<u64>,
}

impl MutationKey {
    pub fn new(kind: MutationKind, target: Option<u64>) -> Self {
        Self { kind, target }
    }
}

/// Held while a mutation is submitting; hand it back to `finish`.
#[derive(Debug, PartialEq, Eq)]
pub struct MutationTicket {
    key: MutationKey,
    generation: u64,
}

impl MutationTicket {
    pub fn key(&self) -> MutationKey {
        self.key
    }
}

/// Per-action `idle -> submitting -> idle` state.
///
/// `clear` returns every action to idle; tickets issued before it no longer
/// release anything.
#[derive(Debug, Clone, Default)]
pub struct MutationGuard {
    submitting: HashSet<MutationKey>,
    generation: u64,
}

impl MutationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&mut self, key: MutationKey) -> Result<MutationTicket, ApiError> {
        if !self.submitting.insert(key) {
            return Err(ApiError::Busy(key.kind.to_string()));
        }
        Ok(MutationTicket {
            key,
            generation: self.generation,
        })
    }

    /// Release the action. Returns false for a ticket issued before the
    /// last `clear`, which leaves the guard untouched.
    pub fn finish(&mut self, ticket: MutationTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.submitting.remove(&ticket.key);
        true
    }

    pub fn clear(&mut self) {
        self.submitting.clear();
        self.generation += 1;
    }

    pub fn is_submitting(&self, key: &MutationKey) -> bool {
        self.submitting.contains(key)
    }

    pub fn any_submitting(&self) -> bool {
        !self.submitting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mount_fetches_once() {
        let mut trigger = RefreshTrigger::new();
        assert_eq!(trigger.on_event(ScreenEvent::Mounted), Refresh::Fetch);
        assert_eq!(trigger.on_event(ScreenEvent::Mounted), Refresh::Skip);
        assert_eq!(trigger.on_event(ScreenEvent::Focused), Refresh::Skip);
    }

    #[test]
    fn returning_to_screen_fetches() {
        let mut trigger = RefreshTrigger::new();
        trigger.on_event(ScreenEvent::Mounted);
        assert_eq!(trigger.on_event(ScreenEvent::Blurred), Refresh::Skip);
        assert_eq!(trigger.on_event(ScreenEvent::Focused), Refresh::Fetch);
        assert_eq!(trigger.on_event(ScreenEvent::Blurred), Refresh::Skip);
        assert_eq!(trigger.on_event(ScreenEvent::Focused), Refresh::Fetch);
    }

    #[test]
    fn focus_before_mount_activates() {
        let mut trigger = RefreshTrigger::new();
        assert_eq!(trigger.on_event(ScreenEvent::Focused), Refresh::Fetch);
        assert_eq!(trigger.on_event(ScreenEvent::Mounted), Refresh::Skip);
    }

    #[test]
    fn every_settled_mutation_fetches() {
        let mut trigger = RefreshTrigger::new();
        trigger.on_event(ScreenEvent::Mounted);
        assert_eq!(trigger.on_event(ScreenEvent::MutationSettled), Refresh::Fetch);
        assert_eq!(trigger.on_event(ScreenEvent::MutationSettled), Refresh::Fetch);
    }

    #[test]
    fn unmount_deactivates_and_stops_refreshing() {
        let mut trigger = RefreshTrigger::new();
        trigger.on_event(ScreenEvent::Mounted);
        assert_eq!(trigger.on_event(ScreenEvent::Unmounted), Refresh::Deactivate);
        assert_eq!(trigger.on_event(ScreenEvent::MutationSettled), Refresh::Skip);
        assert_eq!(trigger.on_event(ScreenEvent::Mounted), Refresh::Fetch);
    }

    #[test]
    fn guard_blocks_resubmission_until_finished() {
        let mut guard = MutationGuard::new();
        let key = MutationKey::new(MutationKind::DeletePet, Some(3));
        let ticket = guard.try_begin(key).unwrap();
        assert!(guard.is_submitting(&key));
        let err = guard.try_begin(key).unwrap_err();
        assert_eq!(err.to_string(), "deleting the pet is already in progress");

        guard.finish(ticket);
        assert!(!guard.any_submitting());
        assert!(guard.try_begin(key).is_ok());
    }

    #[test]
    fn guard_is_per_target() {
        let mut guard = MutationGuard::new();
        guard
            .try_begin(MutationKey::new(MutationKind::DeletePet, Some(1)))
            .unwrap();
        assert!(guard
            .try_begin(MutationKey::new(MutationKind::DeletePet, Some(2)))
            .is_ok());
    }

    #[test]
    fn cleared_guard_ignores_old_tickets() {
        let mut guard = MutationGuard::new();
        let key = MutationKey::new(MutationKind::DeletePet, Some(2));
        let stale = guard.try_begin(key).unwrap();

        guard.clear();
        assert!(!guard.is_submitting(&key));
        let fresh = guard.try_begin(key).unwrap();

        assert!(!guard.finish(stale));
        assert!(guard.is_submitting(&key));
        assert!(guard.finish(fresh));
        assert!(!guard.any_submitting());
    }
}
