use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Shared response fragments.
pub mod common;
/// Health check payloads.
pub mod health;
/// Settings read/update payloads.
pub mod settings;
/// Server-Sent Events payloads.
pub mod sse;
/// Suggestion submission and listing payloads.
pub mod suggestions;
/// Validation helpers for DTOs.
pub mod validation;
/// Vote toggle, tally, and round payloads.
pub mod votes;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
