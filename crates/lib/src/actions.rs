//! Deferred user actions: widget clicks recorded as intent, converted into
//! conversation turns on the next processing pass.
//!
//! Event handlers run in isolation before the render pass resumes, so they
//! only write these slots; the backend round-trip happens when the turn
//! processor drains the queue.

/// Confirm/cancel decision, with the literal text the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    Yes,
    NoCancel,
}

impl ConfirmDecision {
    /// The exact message sent to the backend.
    pub fn as_message(&self) -> &'static str {
        match self {
            ConfirmDecision::Yes => "yes",
            ConfirmDecision::NoCancel => "no, cancel",
        }
    }
}

/// One queued user-originated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    TimeSelection(String),
    Confirmation(ConfirmDecision),
}

/// At most one pending action per kind. Writers are the UI event handlers;
/// the turn processor drains one action per pass.
#[derive(Debug, Default)]
pub struct PendingActions {
    time_selection: Option<String>,
    confirmation: Option<ConfirmDecision>,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a clicked time slot.
    pub fn select_time(&mut self, slot: impl Into<String>) {
        self.time_selection = Some(slot.into());
    }

    /// Record a confirm/cancel click.
    pub fn confirm(&mut self, decision: ConfirmDecision) {
        self.confirmation = Some(decision);
    }

    /// Take at most one action, clearing its slot. Time-selection wins when
    /// both are set: the exposed affordances cannot set both in one pass, but
    /// the ordering is an explicit priority, not an accident of check order.
    pub fn take_next(&mut self) -> Option<PendingAction> {
        if let Some(slot) = self.time_selection.take() {
            return Some(PendingAction::TimeSelection(slot));
        }
        self.confirmation.take().map(PendingAction::Confirmation)
    }

    pub fn is_empty(&self) -> bool {
        self.time_selection.is_none() && self.confirmation.is_none()
    }

    /// Drop both slots (session reset).
    pub fn clear(&mut self) {
        self.time_selection = None;
        self.confirmation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_next_drains_one_action_and_clears_slot() {
        let mut pending = PendingActions::new();
        pending.select_time("3:00 PM");
        assert_eq!(
            pending.take_next(),
            Some(PendingAction::TimeSelection("3:00 PM".to_string()))
        );
        assert!(pending.is_empty());
        assert_eq!(pending.take_next(), None);
    }

    #[test]
    fn time_selection_wins_when_both_slots_set() {
        let mut pending = PendingActions::new();
        pending.confirm(ConfirmDecision::Yes);
        pending.select_time("10:00 AM");
        assert_eq!(
            pending.take_next(),
            Some(PendingAction::TimeSelection("10:00 AM".to_string()))
        );
        // The confirmation is still queued for the next pass.
        assert_eq!(
            pending.take_next(),
            Some(PendingAction::Confirmation(ConfirmDecision::Yes))
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn confirmation_wire_text_is_literal() {
        assert_eq!(ConfirmDecision::Yes.as_message(), "yes");
        assert_eq!(ConfirmDecision::NoCancel.as_message(), "no, cancel");
    }

    #[test]
    fn clear_empties_both_slots() {
        let mut pending = PendingActions::new();
        pending.select_time("1 PM");
        pending.confirm(ConfirmDecision::NoCancel);
        pending.clear();
        assert!(pending.is_empty());
    }
}
