//! Turn processor: the single path through which the conversation log grows.
//!
//! One round-trip = append the user turn, call the backend, append the
//! assistant turn, update derived indices. Deferred actions drain here too,
//! at most one per processing pass, before any other work.

use crate::actions::PendingAction;
use crate::backend::{ChatBackend, ChatReply};
use crate::conversation::Turn;
use crate::session::SessionState;

/// How the user turn came to be: typed text or a drained widget click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOrigin {
    FreeText,
    TimeSelection,
    Confirmation,
}

/// Append the user half of a turn; returns its index. The desktop calls this
/// before handing the round-trip to a worker thread; `run_turn` covers the
/// blocking case.
pub fn begin_turn(state: &mut SessionState, content: &str, origin: TurnOrigin) -> usize {
    let mut turn = Turn::user(content);
    match origin {
        TurnOrigin::FreeText => {}
        TurnOrigin::TimeSelection => turn.is_time_selection = true,
        TurnOrigin::Confirmation => turn.is_confirmation = true,
    }
    state.log.push_user(turn)
}

/// Append the assistant half of a turn; returns its index.
pub fn complete_turn(state: &mut SessionState, reply: &ChatReply) -> usize {
    state.log.push_assistant(Turn::assistant(reply))
}

/// One full conversational round-trip. The backend never raises — failures
/// arrive as reply records — so the log always gains exactly one user and one
/// assistant turn. Returns the assistant turn's index.
pub async fn run_turn<B: ChatBackend>(
    state: &mut SessionState,
    backend: &B,
    content: &str,
    origin: TurnOrigin,
) -> usize {
    begin_turn(state, content, origin);
    let reply = backend.send_chat(content).await;
    complete_turn(state, &reply)
}

/// The message text and origin a drained action turns into.
pub fn action_turn(action: PendingAction) -> (String, TurnOrigin) {
    match action {
        PendingAction::TimeSelection(slot) => (slot, TurnOrigin::TimeSelection),
        PendingAction::Confirmation(decision) => {
            (decision.as_message().to_string(), TurnOrigin::Confirmation)
        }
    }
}

/// Drain at most one pending action into a full turn. Returns true when a
/// turn ran and the view needs a fresh render pass. The slot is consumed
/// before the backend call, so a failed round-trip is not retried; the user
/// retries by acting again.
pub async fn drain_pending<B: ChatBackend>(state: &mut SessionState, backend: &B) -> bool {
    let Some(action) = state.pending.take_next() else {
        return false;
    };
    let (content, origin) = action_turn(action);
    log::info!("draining pending {:?}: {}", origin, content);
    run_turn(state, backend, &content, origin).await;
    true
}
