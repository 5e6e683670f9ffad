//! Per-session state: the conversation log plus the deferred action queue.
//!
//! One session id maps to one log. State is fully isolated between sessions
//! and nothing here is shared or global; the front-ends own exactly one
//! `SessionState` and pass it through every component call.

use crate::actions::PendingActions;
use crate::conversation::ConversationLog;

/// All mutable state for one chat session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub session_id: String,
    pub log: ConversationLog,
    pub pending: PendingActions,
}

impl SessionState {
    /// Empty session with the given id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            log: ConversationLog::new(),
            pending: PendingActions::new(),
        }
    }

    /// Empty session with a generated id.
    pub fn with_generated_id() -> Self {
        Self::new(format!("sess-{}", uuid::Uuid::new_v4()))
    }

    /// Full conversation reset: the log (turns, both derived indices, the
    /// shown-booking set) and both pending slots clear in one step. A partial
    /// reset is an invariant violation, so this is the only reset operation.
    pub fn reset(&mut self) {
        self.log.reset();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ConfirmDecision;
    use crate::backend::{BookingData, ChatReply};
    use crate::conversation::Turn;

    #[test]
    fn reset_clears_log_indices_shown_set_and_pending_jointly() {
        let mut state = SessionState::new("test-session");
        state.log.push_user(Turn::user("book a sync"));
        state.log.push_assistant(Turn::assistant(&ChatReply {
            message: "Booked!".to_string(),
            booking_data: Some(BookingData {
                id: "evt1".to_string(),
                title: None,
                start_time: None,
                status: None,
                html_link: None,
            }),
            suggested_times: vec!["10 AM".to_string()],
            ..Default::default()
        }));
        state.log.celebrate("evt1");
        state.pending.select_time("10 AM");
        state.pending.confirm(ConfirmDecision::Yes);

        state.reset();

        assert!(state.log.is_empty());
        assert_eq!(state.log.last_booking_turn(), None);
        assert_eq!(state.log.last_suggestion_turn(), None);
        assert!(!state.log.celebrated("evt1"));
        assert!(state.pending.is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = SessionState::with_generated_id();
        let b = SessionState::with_generated_id();
        assert_ne!(a.session_id, b.session_id);
        assert!(a.session_id.starts_with("sess-"));
    }
}
