use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::{MemberId, MessageId};

/// Payload sent when a member presses an option on a vote prompt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleVoteRequest {
    /// Member casting the toggle.
    pub member_id: MemberId,
    /// Option label as it appears on the prompt.
    pub option: String,
}

/// Result of a ballot toggle.
#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleVoteResponse {
    /// The toggled option.
    pub option: String,
    /// New flag state: `true` means the member's vote is now counted.
    pub enabled: bool,
}

/// One option with its running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TallyEntry {
    /// Option label.
    pub option: String,
    /// Number of members whose flag for this option is set.
    pub votes: u32,
}

impl From<(String, u32)> for TallyEntry {
    fn from((option, votes): (String, u32)) -> Self {
        Self { option, votes }
    }
}

/// Running totals of the open vote, in options order.
#[derive(Debug, Serialize, ToSchema)]
pub struct TallyResponse {
    /// Per-option totals.
    pub tallies: Vec<TallyEntry>,
}

/// Result of opening a vote round.
#[derive(Debug, Serialize, ToSchema)]
pub struct OpenVoteResponse {
    /// Options frozen into the round, in pool insertion order.
    pub options: Vec<String>,
    /// Identifiers of the published prompt messages, in retire order.
    #[schema(value_type = Vec<Uuid>)]
    pub prompt_messages: Vec<MessageId>,
    /// Confirmation to relay to the administrator.
    pub message: String,
}

/// Result of closing a vote round.
#[derive(Debug, Serialize, ToSchema)]
pub struct CloseVoteResponse {
    /// Announced winner.
    pub winner: String,
    /// Whether the top tally was shared by several options.
    pub tie: bool,
    /// All options that shared the top tally; empty when there was no tie.
    pub tied: Vec<String>,
    /// Full ordered results for the summary message.
    pub results: Vec<TallyEntry>,
    /// Options carried into the next round's suggestion pool.
    pub retained: Vec<String>,
}
