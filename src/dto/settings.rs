use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dao::models::{ChannelId, RoleId},
    dto::format_system_time,
    state::session::CommunitySettings,
};

/// Partial settings update.
///
/// Clearable fields use a double `Option`: omitted means "leave unchanged",
/// an explicit `null` clears the value, and a value sets it. Setting
/// `announcement_channel` initializes the community; it cannot be cleared.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    /// Channel for winner announcements; setting it activates the community.
    #[serde(default)]
    pub announcement_channel: Option<ChannelId>,
    /// Channel for vote prompts; `null` falls back to the announcement channel.
    #[serde(default)]
    #[schema(value_type = Option<u64>)]
    pub vote_channel: Option<Option<ChannelId>>,
    /// Role mentioned in announcements; `null` disables the mention.
    #[serde(default)]
    #[schema(value_type = Option<u64>)]
    pub announcement_role: Option<Option<RoleId>>,
    /// Role mentioned in vote prompts; `null` disables the mention.
    #[serde(default)]
    #[schema(value_type = Option<u64>)]
    pub vote_role: Option<Option<RoleId>>,
    /// Per-member suggestion quota; 0 means unlimited.
    #[serde(default)]
    pub max_suggestions_per_member: Option<u32>,
    /// Retention threshold; negative disables retention.
    #[serde(default)]
    pub retain_threshold: Option<i64>,
}

impl UpdateSettingsRequest {
    /// Whether the request touches anything beyond community initialization.
    pub fn touches_settings(&self) -> bool {
        self.vote_channel.is_some()
            || self.announcement_role.is_some()
            || self.vote_role.is_some()
            || self.max_suggestions_per_member.is_some()
            || self.retain_threshold.is_some()
    }

    /// Whether the request carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.announcement_channel.is_none() && !self.touches_settings()
    }
}

/// Current settings record for a community.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    /// Channel for winner announcements.
    pub announcement_channel: Option<ChannelId>,
    /// Channel for vote prompts, if overridden.
    pub vote_channel: Option<ChannelId>,
    /// Role mentioned in announcements.
    pub announcement_role: Option<RoleId>,
    /// Role mentioned in vote prompts.
    pub vote_role: Option<RoleId>,
    /// Per-member suggestion quota; 0 means unlimited.
    pub max_suggestions_per_member: u32,
    /// Retention threshold; negative disables retention.
    pub retain_threshold: i64,
    /// RFC 3339 timestamp of the last vote opening, absent before the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_vote_started_at: Option<String>,
}

impl From<&CommunitySettings> for SettingsResponse {
    fn from(value: &CommunitySettings) -> Self {
        Self {
            announcement_channel: value.announcement_channel,
            vote_channel: value.vote_channel,
            announcement_role: value.announcement_role,
            vote_role: value.vote_role,
            max_suggestions_per_member: value.max_suggestions_per_member,
            retain_threshold: value.retain_threshold,
            last_vote_started_at: (value.last_vote_started_at != std::time::UNIX_EPOCH)
                .then(|| format_system_time(value.last_vote_started_at)),
        }
    }
}
