//! Booking backend gateway: HTTP client and cold-start classification.

mod client;
pub mod startup;

pub use client::{
    BackendError, BookingClient, BookingData, ChatBackend, ChatReply, HealthReport, HealthStatus,
};
