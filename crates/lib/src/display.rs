//! Display selector: which single affordance, if any, an assistant turn gets
//! at render time.
//!
//! Pure functions over the log, evaluated once per historical turn on every
//! render pass. Priority is fixed — booking confirmation > confirmation
//! prompt > time-slot picker — and at most one of the three renders per turn.

use crate::conversation::{ConversationLog, Role, Turn};
use chrono::{DateTime, NaiveDateTime};

/// Phrases (lowercase) that mean the reply text claims a booking happened.
/// When the backend says one of these without returning structured booking
/// data, time slots are suppressed and a mismatch warning is shown instead.
const BOOKING_CLAIM_PHRASES: [&str; 11] = [
    "i've created",
    "i've made",
    "i've added",
    "created the event",
    "added to your calendar",
    "event created",
    "successfully booked",
    "appointment has been",
    "i'm creating",
    "let me create",
    "i've now booked",
];

/// The three mutually exclusive interactive elements an assistant turn can
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    BookingConfirmation,
    ConfirmationPrompt,
    TimeSlotPicker,
}

/// Decide the affordance for the turn at `index`, if any.
pub fn select_affordance(index: usize, turn: &Turn, log: &ConversationLog) -> Option<Affordance> {
    if should_show_booking(index, turn, log) {
        Some(Affordance::BookingConfirmation)
    } else if should_show_confirmation(index, turn, log) {
        Some(Affordance::ConfirmationPrompt)
    } else if should_show_suggestions(index, turn, log) {
        Some(Affordance::TimeSlotPicker)
    } else {
        None
    }
}

/// Booking details stay visible only for the freshest booking: the turn the
/// booking index points at, or the last turn in the log.
fn should_show_booking(index: usize, turn: &Turn, log: &ConversationLog) -> bool {
    if turn.role != Role::Assistant || !turn.has_real_booking() {
        return false;
    }
    log.last_booking_turn() == Some(index) || index + 1 == log.len()
}

/// A confirmation request is stale once a later assistant turn books or asks
/// again.
fn should_show_confirmation(index: usize, turn: &Turn, log: &ConversationLog) -> bool {
    if turn.role != Role::Assistant || !turn.requires_confirmation {
        return false;
    }
    if turn.booking_data.is_some() {
        return false;
    }
    !log.turns()[index + 1..].iter().any(|later| {
        later.role == Role::Assistant
            && (later.booking_data.is_some() || later.requires_confirmation)
    })
}

fn should_show_suggestions(index: usize, turn: &Turn, log: &ConversationLog) -> bool {
    if turn.role != Role::Assistant || turn.suggested_times.is_empty() {
        return false;
    }
    if turn.booking_data.is_some() {
        return false;
    }
    if contains_booking_claim(&turn.content) {
        log::debug!("turn {}: reply claims a booking, suppressing time slots", index);
        return false;
    }
    !log.turns()[index + 1..].iter().any(|later| {
        later.role == Role::Assistant
            && (!later.suggested_times.is_empty()
                || later.booking_data.is_some()
                || later.requires_confirmation)
    })
}

fn contains_booking_claim(content: &str) -> bool {
    let lower = content.to_lowercase();
    BOOKING_CLAIM_PHRASES.iter().any(|p| lower.contains(p))
}

/// True when the reply text claims a booking but no structured record backs
/// it up. Rendered as an explicit warning so the user knows why no time slots
/// are offered for that message.
pub fn claims_booking_without_data(turn: &Turn) -> bool {
    turn.role == Role::Assistant
        && turn.booking_data.is_none()
        && contains_booking_claim(&turn.content)
}

/// Format a booking start time for display. Accepts RFC 3339 (with or without
/// a trailing `Z`) or a bare ISO timestamp; anything else is shown verbatim.
pub fn format_booking_start(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%A, %B %d, %Y at %I:%M %p IST").to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.format("%A, %B %d, %Y at %I:%M %p IST").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BookingData, ChatReply};
    use crate::conversation::{ConversationLog, Turn};

    fn booking(id: &str) -> Option<BookingData> {
        Some(BookingData {
            id: id.to_string(),
            title: Some("Sync".to_string()),
            start_time: None,
            status: None,
            html_link: None,
        })
    }

    fn assistant_reply(reply: ChatReply, log: &mut ConversationLog) -> usize {
        log.push_assistant(Turn::assistant(&reply))
    }

    fn affordance_at(log: &ConversationLog, index: usize) -> Option<Affordance> {
        select_affordance(index, &log.turns()[index], log)
    }

    #[test]
    fn booking_reply_is_booking_eligible_and_wins_priority() {
        let mut log = ConversationLog::new();
        log.push_user(Turn::user("book it"));
        // All three signals on one turn: booking takes precedence.
        let i = assistant_reply(
            ChatReply {
                message: "Booked!".to_string(),
                booking_data: booking("evt123"),
                suggested_times: vec!["10 AM".to_string()],
                requires_confirmation: true,
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, i), Some(Affordance::BookingConfirmation));
    }

    #[test]
    fn booking_without_id_is_not_eligible() {
        let mut log = ConversationLog::new();
        let i = assistant_reply(
            ChatReply {
                message: "Booked!".to_string(),
                booking_data: booking(""),
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, i), None);
    }

    #[test]
    fn only_freshest_booking_is_highlighted() {
        let mut log = ConversationLog::new();
        let first = assistant_reply(
            ChatReply {
                message: "Booked!".to_string(),
                booking_data: booking("evt1"),
                ..Default::default()
            },
            &mut log,
        );
        let second = assistant_reply(
            ChatReply {
                message: "Booked another!".to_string(),
                booking_data: booking("evt2"),
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, first), None);
        assert_eq!(
            affordance_at(&log, second),
            Some(Affordance::BookingConfirmation)
        );
    }

    #[test]
    fn booking_stays_visible_past_unrelated_turns() {
        let mut log = ConversationLog::new();
        let i = assistant_reply(
            ChatReply {
                message: "Booked!".to_string(),
                booking_data: booking("evt1"),
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("thanks"));
        assistant_reply(
            ChatReply {
                message: "You're welcome".to_string(),
                ..Default::default()
            },
            &mut log,
        );
        // Still the most recent booking, so still shown.
        assert_eq!(affordance_at(&log, i), Some(Affordance::BookingConfirmation));
    }

    #[test]
    fn only_latest_confirmation_request_is_eligible() {
        let mut log = ConversationLog::new();
        let first = assistant_reply(
            ChatReply {
                message: "Confirm 3 PM?".to_string(),
                requires_confirmation: true,
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("actually make it 4"));
        let second = assistant_reply(
            ChatReply {
                message: "Confirm 4 PM?".to_string(),
                requires_confirmation: true,
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, first), None);
        assert_eq!(
            affordance_at(&log, second),
            Some(Affordance::ConfirmationPrompt)
        );
    }

    #[test]
    fn suggestions_render_for_latest_suggesting_turn_only() {
        let mut log = ConversationLog::new();
        let first = assistant_reply(
            ChatReply {
                message: "Options:".to_string(),
                suggested_times: vec!["10 AM".to_string(), "2 PM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("anything later?"));
        let second = assistant_reply(
            ChatReply {
                message: "Later options:".to_string(),
                suggested_times: vec!["4 PM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, first), None);
        assert_eq!(affordance_at(&log, second), Some(Affordance::TimeSlotPicker));
    }

    #[test]
    fn suggestions_are_superseded_by_later_booking_or_confirmation() {
        let mut log = ConversationLog::new();
        let suggest = assistant_reply(
            ChatReply {
                message: "Options:".to_string(),
                suggested_times: vec!["10 AM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("10 AM"));
        assistant_reply(
            ChatReply {
                message: "Confirm?".to_string(),
                requires_confirmation: true,
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, suggest), None);
    }

    #[test]
    fn booking_claim_without_data_suppresses_slots_and_flags_mismatch() {
        let mut log = ConversationLog::new();
        let i = assistant_reply(
            ChatReply {
                message: "I've created the event".to_string(),
                booking_data: None,
                suggested_times: vec!["10 AM".to_string(), "2 PM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, i), None);
        assert!(claims_booking_without_data(&log.turns()[i]));
    }

    #[test]
    fn claim_phrases_match_case_insensitively() {
        let mut log = ConversationLog::new();
        let i = assistant_reply(
            ChatReply {
                message: "Your appointment has been Successfully Booked.".to_string(),
                suggested_times: vec!["10 AM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        assert_eq!(affordance_at(&log, i), None);
    }

    #[test]
    fn claim_with_real_booking_is_not_a_mismatch() {
        let mut log = ConversationLog::new();
        let i = assistant_reply(
            ChatReply {
                message: "I've created the event".to_string(),
                booking_data: booking("evt1"),
                ..Default::default()
            },
            &mut log,
        );
        assert!(!claims_booking_without_data(&log.turns()[i]));
        assert_eq!(affordance_at(&log, i), Some(Affordance::BookingConfirmation));
    }

    #[test]
    fn user_turns_get_no_affordance() {
        let mut log = ConversationLog::new();
        let i = log.push_user(Turn::user("10 AM"));
        assert_eq!(affordance_at(&log, i), None);
    }

    #[test]
    fn at_most_one_affordance_per_turn_across_the_log() {
        let mut log = ConversationLog::new();
        log.push_user(Turn::user("book a meeting"));
        assistant_reply(
            ChatReply {
                message: "Options:".to_string(),
                suggested_times: vec!["10 AM".to_string()],
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("10 AM"));
        assistant_reply(
            ChatReply {
                message: "Confirm?".to_string(),
                requires_confirmation: true,
                ..Default::default()
            },
            &mut log,
        );
        log.push_user(Turn::user("yes"));
        assistant_reply(
            ChatReply {
                message: "Booked!".to_string(),
                booking_data: booking("evt9"),
                ..Default::default()
            },
            &mut log,
        );
        let shown: Vec<_> = log
            .turns()
            .iter()
            .enumerate()
            .filter_map(|(i, t)| select_affordance(i, t, &log))
            .collect();
        assert_eq!(shown, vec![Affordance::BookingConfirmation]);
    }

    #[test]
    fn format_booking_start_handles_common_shapes() {
        assert_eq!(
            format_booking_start("2026-08-07T15:00:00+05:30"),
            "Friday, August 07, 2026 at 03:00 PM IST"
        );
        assert_eq!(
            format_booking_start("2026-08-07T15:00:00"),
            "Friday, August 07, 2026 at 03:00 PM IST"
        );
        assert_eq!(format_booking_start("tomorrow-ish"), "tomorrow-ish");
    }
}
