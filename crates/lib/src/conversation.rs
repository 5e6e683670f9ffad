//! Conversation log: ordered user/assistant turns plus the derived state the
//! display selector reads.
//!
//! The log is append-only within a session. Only a full reset clears it, and
//! the reset clears every piece of derived state (both indices and the
//! shown-booking set) in the same step.

use crate::backend::{BookingData, ChatReply};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;

/// IST offset (UTC+5:30). All timestamps are generated in this zone
/// regardless of host locale.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Current time in IST.
pub fn ist_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap();
    Utc::now().with_timezone(&offset)
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<FixedOffset>,
    /// Structured booking echoed by the backend, when any.
    pub booking_data: Option<BookingData>,
    pub suggested_times: Vec<String>,
    pub requires_confirmation: bool,
    /// Synthetic cold-start reply; rendered as retry guidance.
    pub is_startup_error: bool,
    /// User turn produced by a time-slot click rather than free text.
    pub is_time_selection: bool,
    /// User turn produced by a confirm/cancel click rather than free text.
    pub is_confirmation: bool,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: ist_now(),
            booking_data: None,
            suggested_times: Vec::new(),
            requires_confirmation: false,
            is_startup_error: false,
            is_time_selection: false,
            is_confirmation: false,
        }
    }

    pub fn assistant(reply: &ChatReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.message.clone(),
            timestamp: ist_now(),
            booking_data: reply.booking_data.clone(),
            suggested_times: reply.suggested_times.clone(),
            requires_confirmation: reply.requires_confirmation,
            is_startup_error: reply.is_startup_error,
            is_time_selection: false,
            is_confirmation: false,
        }
    }

    /// True when this turn carries a booking the backend actually created.
    pub fn has_real_booking(&self) -> bool {
        self.booking_data
            .as_ref()
            .map(BookingData::is_real)
            .unwrap_or(false)
    }
}

/// Append-only conversation history plus derived display state.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
    /// Most recent turn carrying a structured booking payload.
    last_booking_turn: Option<usize>,
    /// Most recent turn carrying suggested times.
    last_suggestion_turn: Option<usize>,
    /// Booking ids whose celebratory effect already fired this session.
    shown_bookings: HashSet<String>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn last_booking_turn(&self) -> Option<usize> {
        self.last_booking_turn
    }

    pub fn last_suggestion_turn(&self) -> Option<usize> {
        self.last_suggestion_turn
    }

    /// Append a user turn; returns its index. Only the turn processor calls
    /// this — the log has no other growth path.
    pub(crate) fn push_user(&mut self, turn: Turn) -> usize {
        debug_assert!(turn.role == Role::User);
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Append an assistant turn and move the derived indices it affects.
    pub(crate) fn push_assistant(&mut self, turn: Turn) -> usize {
        debug_assert!(turn.role == Role::Assistant);
        let index = self.turns.len();
        if turn.booking_data.is_some() {
            self.last_booking_turn = Some(index);
        }
        if !turn.suggested_times.is_empty() {
            self.last_suggestion_turn = Some(index);
        }
        self.turns.push(turn);
        index
    }

    /// Record the celebratory effect for a booking id. Returns true exactly
    /// once per id for the life of the log.
    pub fn celebrate(&mut self, booking_id: &str) -> bool {
        if booking_id.is_empty() {
            return false;
        }
        self.shown_bookings.insert(booking_id.to_string())
    }

    /// True when the celebratory effect already fired for this id.
    pub fn celebrated(&self, booking_id: &str) -> bool {
        self.shown_bookings.contains(booking_id)
    }

    /// Clear turns, both derived indices, and the shown-booking set together.
    /// Partial clears leave derived state pointing into a log that no longer
    /// exists, so there is no finer-grained operation.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.last_booking_turn = None;
        self.last_suggestion_turn = None;
        self.shown_bookings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatReply;

    fn booking_reply(id: &str) -> ChatReply {
        ChatReply {
            message: "Booked!".to_string(),
            booking_data: Some(BookingData {
                id: id.to_string(),
                title: Some("Sync".to_string()),
                start_time: None,
                status: None,
                html_link: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn push_assistant_tracks_indices() {
        let mut log = ConversationLog::new();
        assert_eq!(log.last_booking_turn(), None);
        assert_eq!(log.last_suggestion_turn(), None);

        log.push_user(Turn::user("book something"));
        let reply = ChatReply {
            message: "pick one".to_string(),
            suggested_times: vec!["10 AM".to_string()],
            ..Default::default()
        };
        let i = log.push_assistant(Turn::assistant(&reply));
        assert_eq!(log.last_suggestion_turn(), Some(i));
        assert_eq!(log.last_booking_turn(), None);

        log.push_user(Turn::user("10 AM"));
        let j = log.push_assistant(Turn::assistant(&booking_reply("evt1")));
        assert_eq!(log.last_booking_turn(), Some(j));
        assert_eq!(log.last_suggestion_turn(), Some(i));
    }

    #[test]
    fn celebrate_fires_once_per_id() {
        let mut log = ConversationLog::new();
        assert!(log.celebrate("evt123"));
        assert!(!log.celebrate("evt123"));
        assert!(log.celebrated("evt123"));
        assert!(log.celebrate("evt456"));
        assert!(!log.celebrate(""));
    }

    #[test]
    fn reset_clears_turns_indices_and_shown_set() {
        let mut log = ConversationLog::new();
        log.push_user(Turn::user("hi"));
        log.push_assistant(Turn::assistant(&booking_reply("evt1")));
        log.celebrate("evt1");

        log.reset();
        assert!(log.is_empty());
        assert_eq!(log.last_booking_turn(), None);
        assert_eq!(log.last_suggestion_turn(), None);
        assert!(!log.celebrated("evt1"));
    }
}
