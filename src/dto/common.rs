use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::RoundPhase;

/// Generic acknowledgement for operations without a richer payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable confirmation to relay to the member.
    pub message: String,
}

impl ActionResponse {
    /// Wrap a confirmation message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Round lifecycle phase as exposed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhaseDto {
    /// Suggestions are being collected.
    Idle,
    /// A vote is open.
    Voting,
}

impl From<RoundPhase> for RoundPhaseDto {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::Idle => RoundPhaseDto::Idle,
            RoundPhase::Voting => RoundPhaseDto::Voting,
        }
    }
}
