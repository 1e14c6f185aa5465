use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{ChannelId, CommunityId, MessageId, RoleId},
    dto::votes::TallyEntry,
};

/// Dispatched payload carried across SSE channels.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

}

/// Initial metadata sent to an SSE client when it connects.
#[derive(Debug, Serialize, ToSchema)]
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Optional admin token returned when the stream is privileged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Request to the messaging layer to render one vote prompt message.
#[derive(Debug, Serialize, ToSchema)]
pub struct VotePromptEvent {
    /// Community the prompt belongs to.
    pub community_id: CommunityId,
    /// Channel the prompt should be rendered in.
    pub channel_id: ChannelId,
    /// Identifier assigned to the prompt message.
    #[schema(value_type = Uuid)]
    pub message_id: MessageId,
    /// Role to mention, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention_role: Option<RoleId>,
    /// Prompt body.
    pub text: String,
    /// Options rendered as toggle buttons, at most one chunk's worth.
    pub options: Vec<String>,
}

/// Request to replace a published prompt's content with the results summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromptEditEvent {
    /// Community the prompt belongs to.
    pub community_id: CommunityId,
    /// Prompt message to edit in place.
    #[schema(value_type = Uuid)]
    pub message_id: MessageId,
    /// Replacement body.
    pub text: String,
}

/// Request to delete a published prompt message.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromptDeleteEvent {
    /// Community the prompt belongs to.
    pub community_id: CommunityId,
    /// Prompt message to remove.
    #[schema(value_type = Uuid)]
    pub message_id: MessageId,
}

/// Winner announcement for a closed round.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementEvent {
    /// Community the round belongs to.
    pub community_id: CommunityId,
    /// Channel the announcement should be rendered in.
    pub channel_id: ChannelId,
    /// Role to mention, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention_role: Option<RoleId>,
    /// Announcement body.
    pub text: String,
    /// Winning option.
    pub winner: String,
    /// Whether the winner was drawn from a tie.
    pub tie: bool,
    /// Options sharing the top tally when a tie occurred.
    pub tied: Vec<String>,
    /// Full ordered results.
    pub results: Vec<TallyEntry>,
}

/// Broadcast after every accepted toggle so prompt UIs can refresh counts.
#[derive(Debug, Serialize, ToSchema)]
pub struct TallyUpdatedEvent {
    /// Community the open vote belongs to.
    pub community_id: CommunityId,
    /// Per-option totals in options order.
    pub tallies: Vec<TallyEntry>,
}
