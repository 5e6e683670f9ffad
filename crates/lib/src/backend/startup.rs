//! Cold-start detection and the synthetic startup reply.
//!
//! The hosted backend sleeps after inactivity, so the first request times out
//! while the service boots. Those failures must read as "wait and retry", not
//! as errors, and must never look like a normal assistant answer.

use crate::backend::client::ChatReply;

/// Seconds the user should wait before retrying while the backend boots.
pub const RETRY_WAIT_SECS: u64 = 60;

/// Substrings (lowercase) in a transport error chain that mark a cold start
/// rather than a genuine outage.
const COLD_START_MARKERS: [&str; 4] = ["timeout", "timed out", "read timed out", "connection pool"];

const STARTUP_MESSAGE: &str = "The calendar assistant is starting up.\n\n\
The service is booting from sleep mode, which is normal after a period of \
inactivity. Startup takes around 50-60 seconds while the backend initializes \
and reconnects to Google Calendar.\n\n\
Wait about a minute, then send your message again. There is no need to \
restart anything; once the service is running, responses are instant.";

/// True when a transport failure matches the cold-start signature: a request
/// or connect timeout, or an error chain mentioning one of the fixed markers.
pub fn is_cold_start(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    let text = error_chain_text(err).to_lowercase();
    COLD_START_MARKERS.iter().any(|m| text.contains(m))
}

fn error_chain_text(err: &reqwest::Error) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        text.push_str(": ");
        text.push_str(&e.to_string());
        source = e.source();
    }
    text
}

/// The synthetic reply appended when the backend is cold-starting. Carries no
/// booking data, suggestions, or confirmation requirement, so it is never
/// display-eligible; the `is_startup_error` marker routes it to the
/// retry-guidance rendering instead of a normal assistant answer.
pub fn startup_reply() -> ChatReply {
    ChatReply {
        message: STARTUP_MESSAGE.to_string(),
        booking_data: None,
        suggested_times: Vec::new(),
        requires_confirmation: false,
        is_startup_error: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_reply_is_marked_and_signal_free() {
        let reply = startup_reply();
        assert!(reply.is_startup_error);
        assert!(reply.booking_data.is_none());
        assert!(reply.suggested_times.is_empty());
        assert!(!reply.requires_confirmation);
        assert!(reply.message.contains("starting up"));
    }
}
