use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of an isolated community tenant (server/guild snowflake).
pub type CommunityId = u64;
/// Identifier of a member inside a community.
pub type MemberId = u64;
/// Identifier of a messaging channel.
pub type ChannelId = u64;
/// Identifier of a mentionable role.
pub type RoleId = u64;
/// Identifier of a published prompt message, minted by the publisher.
pub type MessageId = Uuid;

/// Submitter id recorded on suggestions reseeded by the retention pass.
pub const SYSTEM_MEMBER: MemberId = 0;

/// Per-community settings record as written to the settings artifact.
///
/// Absent fields mean "default"; only non-default values are persisted so the
/// artifact stays readable by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsEntity {
    /// Channel receiving winner announcements; unset means uninitialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement_channel: Option<ChannelId>,
    /// Channel receiving vote prompts, falling back to the announcement channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_channel: Option<ChannelId>,
    /// Role mentioned in announcements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement_role: Option<RoleId>,
    /// Role mentioned in vote prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_role: Option<RoleId>,
    /// Per-member suggestion quota; 0 means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_suggestions_per_member: Option<u32>,
    /// Minimum tally for a losing option to be carried into the next round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_threshold: Option<i64>,
    /// Unix seconds of the most recent vote opening.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_vote_started_at: Option<u64>,
}

/// One suggestion row as written to the suggestions artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionEntity {
    /// Suggested game name, case preserved as first submitted.
    pub name: String,
    /// Member who submitted it first ([`SYSTEM_MEMBER`] for retained entries).
    pub submitter_id: MemberId,
    /// Unix seconds of the first submission.
    pub submitted_at: u64,
}

/// One member's ballot row, flags aligned to the session options by index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BallotRowEntity {
    /// Voting member.
    pub member_id: MemberId,
    /// 0/1 flag per option.
    pub flags: Vec<u8>,
}

/// Open vote session as written to the votes artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteSessionEntity {
    /// Option names frozen at vote opening, in pool insertion order.
    pub options: Vec<String>,
    /// One row per member that has toggled at least once.
    pub ballots: Vec<BallotRowEntity>,
    /// Published prompt messages; the first is edited in place at close,
    /// the rest are deleted.
    pub prompt_messages: Vec<MessageId>,
}

/// Everything a store hands back at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Settings records keyed by community.
    pub settings: HashMap<CommunityId, SettingsEntity>,
    /// Suggestion pools keyed by community.
    pub suggestions: HashMap<CommunityId, Vec<SuggestionEntity>>,
    /// Open vote sessions keyed by community.
    pub votes: HashMap<CommunityId, VoteSessionEntity>,
}
