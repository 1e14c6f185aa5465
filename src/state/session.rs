use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::dao::models::{
    BallotRowEntity, ChannelId, MemberId, MessageId, RoleId, SettingsEntity, SuggestionEntity,
    VoteSessionEntity,
};

/// Default per-member suggestion quota.
pub const DEFAULT_MAX_SUGGESTIONS: u32 = 3;
/// Default minimum tally for a suggestion to survive into the next round.
pub const DEFAULT_RETAIN_THRESHOLD: i64 = 2;

/// Per-community settings driving announcements, quotas, and retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunitySettings {
    /// Channel receiving winner announcements. A community is active only
    /// once this is set; every other operation is gated on it.
    pub announcement_channel: Option<ChannelId>,
    /// Channel receiving vote prompts; falls back to the announcement channel.
    pub vote_channel: Option<ChannelId>,
    /// Role mentioned in announcements, when present.
    pub announcement_role: Option<RoleId>,
    /// Role mentioned in vote prompts, when present.
    pub vote_role: Option<RoleId>,
    /// Per-member suggestion quota; 0 means unlimited.
    pub max_suggestions_per_member: u32,
    /// Minimum tally for retention; negative disables retention.
    pub retain_threshold: i64,
    /// Moment the most recent vote was opened.
    pub last_vote_started_at: SystemTime,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            announcement_channel: None,
            vote_channel: None,
            announcement_role: None,
            vote_role: None,
            max_suggestions_per_member: DEFAULT_MAX_SUGGESTIONS,
            retain_threshold: DEFAULT_RETAIN_THRESHOLD,
            last_vote_started_at: UNIX_EPOCH,
        }
    }
}

impl CommunitySettings {
    /// Whether the community has been initialized by an administrator.
    pub fn is_active(&self) -> bool {
        self.announcement_channel.is_some()
    }

    /// Channel vote prompts should be published to.
    pub fn effective_vote_channel(&self) -> Option<ChannelId> {
        self.vote_channel.or(self.announcement_channel)
    }
}

/// One suggested game. Identity is the case-insensitive name; the submitter
/// and timestamp of the first submission stick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Game name with the first-submitted casing.
    pub name: String,
    /// First submitter (`SYSTEM_MEMBER` for retained entries).
    pub submitter: MemberId,
    /// Moment of the first submission.
    pub submitted_at: SystemTime,
}

/// Insertion-ordered suggestion set, unique by case-insensitive name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionPool {
    entries: IndexMap<String, Suggestion>,
}

impl SuggestionPool {
    /// Insert a suggestion. Returns `false` when a case-insensitive duplicate
    /// already exists, in which case the pool is unchanged.
    pub fn insert(&mut self, suggestion: Suggestion) -> bool {
        let key = suggestion.name.to_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, suggestion);
        true
    }

    /// Number of live suggestions submitted by `member`.
    pub fn count_from(&self, member: MemberId) -> u32 {
        self.entries
            .values()
            .filter(|suggestion| suggestion.submitter == member)
            .count() as u32
    }

    /// Suggestions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
        self.entries.values()
    }

    /// Suggestion names in insertion order, as frozen into a vote session.
    pub fn names(&self) -> Vec<String> {
        self.entries.values().map(|s| s.name.clone()).collect()
    }

    /// Number of suggestions in the pool.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no suggestions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every suggestion.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Open vote over a frozen list of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSession {
    /// Option names in pool insertion order; never empty while a session exists.
    pub options: Vec<String>,
    /// Per-member 0/1 flags aligned to `options` by index.
    pub ballots: IndexMap<MemberId, Vec<u8>>,
    /// Published prompt messages, in retire order.
    pub prompt_messages: Vec<MessageId>,
}

impl VoteSession {
    /// Open a session over a non-empty option list.
    pub fn open(options: Vec<String>) -> Self {
        debug_assert!(!options.is_empty());
        Self {
            options,
            ballots: IndexMap::new(),
            prompt_messages: Vec::new(),
        }
    }

    /// Flip `member`'s flag for `option`. Returns the new flag state, or
    /// `None` when the option is not part of this session (stale prompt UI).
    pub fn toggle(&mut self, member: MemberId, option: &str) -> Option<bool> {
        let index = self.options.iter().position(|name| name == option)?;
        let ballot = self
            .ballots
            .entry(member)
            .or_insert_with(|| vec![0; self.options.len()]);
        ballot[index] = 1 - ballot[index];
        Some(ballot[index] == 1)
    }

    /// Column sums per option, in options order. Pure read.
    pub fn tally(&self) -> Vec<(String, u32)> {
        self.options
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let total = self
                    .ballots
                    .values()
                    .map(|flags| u32::from(flags[index]))
                    .sum();
                (name.clone(), total)
            })
            .collect()
    }
}

/// Round lifecycle phase, derived from the presence of an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Suggestions are being collected; no vote is open.
    Idle,
    /// A vote is open over a frozen option list.
    Voting,
}

/// Full runtime state of one community.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunityState {
    /// Settings record.
    pub settings: CommunitySettings,
    /// Suggestion pool for the upcoming round.
    pub suggestions: SuggestionPool,
    /// Open vote, if any.
    pub vote: Option<VoteSession>,
}

impl CommunityState {
    /// Current round phase.
    pub fn phase(&self) -> RoundPhase {
        if self.vote.is_some() {
            RoundPhase::Voting
        } else {
            RoundPhase::Idle
        }
    }

    /// Rebuild runtime state from the persisted artifacts.
    pub fn from_entities(
        settings: Option<SettingsEntity>,
        suggestions: Vec<SuggestionEntity>,
        vote: Option<VoteSessionEntity>,
    ) -> Self {
        let mut pool = SuggestionPool::default();
        for entity in suggestions {
            pool.insert(entity.into());
        }
        Self {
            settings: settings.map(Into::into).unwrap_or_default(),
            suggestions: pool,
            vote: vote.filter(|entity| !entity.options.is_empty()).map(Into::into),
        }
    }

    /// Snapshot the settings artifact record.
    pub fn settings_entity(&self) -> SettingsEntity {
        self.settings.clone().into()
    }

    /// Snapshot the suggestions artifact record.
    pub fn suggestions_entity(&self) -> Vec<SuggestionEntity> {
        self.suggestions.iter().cloned().map(Into::into).collect()
    }

    /// Snapshot the votes artifact record.
    pub fn votes_entity(&self) -> Option<VoteSessionEntity> {
        self.vote.clone().map(Into::into)
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn from_unix_seconds(seconds: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(seconds)
}

impl From<SettingsEntity> for CommunitySettings {
    fn from(value: SettingsEntity) -> Self {
        let defaults = CommunitySettings::default();
        Self {
            announcement_channel: value.announcement_channel,
            vote_channel: value.vote_channel,
            announcement_role: value.announcement_role,
            vote_role: value.vote_role,
            max_suggestions_per_member: value
                .max_suggestions_per_member
                .unwrap_or(defaults.max_suggestions_per_member),
            retain_threshold: value.retain_threshold.unwrap_or(defaults.retain_threshold),
            last_vote_started_at: value
                .last_vote_started_at
                .map(from_unix_seconds)
                .unwrap_or(UNIX_EPOCH),
        }
    }
}

impl From<CommunitySettings> for SettingsEntity {
    fn from(value: CommunitySettings) -> Self {
        Self {
            announcement_channel: value.announcement_channel,
            vote_channel: value.vote_channel,
            announcement_role: value.announcement_role,
            vote_role: value.vote_role,
            max_suggestions_per_member: (value.max_suggestions_per_member
                != DEFAULT_MAX_SUGGESTIONS)
                .then_some(value.max_suggestions_per_member),
            retain_threshold: (value.retain_threshold != DEFAULT_RETAIN_THRESHOLD)
                .then_some(value.retain_threshold),
            last_vote_started_at: (value.last_vote_started_at != UNIX_EPOCH)
                .then(|| unix_seconds(value.last_vote_started_at)),
        }
    }
}

impl From<SuggestionEntity> for Suggestion {
    fn from(value: SuggestionEntity) -> Self {
        Self {
            name: value.name,
            submitter: value.submitter_id,
            submitted_at: from_unix_seconds(value.submitted_at),
        }
    }
}

impl From<Suggestion> for SuggestionEntity {
    fn from(value: Suggestion) -> Self {
        Self {
            name: value.name,
            submitter_id: value.submitter,
            submitted_at: unix_seconds(value.submitted_at),
        }
    }
}

impl From<VoteSessionEntity> for VoteSession {
    fn from(value: VoteSessionEntity) -> Self {
        let width = value.options.len();
        let ballots = value
            .ballots
            .into_iter()
            .filter(|row| row.flags.len() == width)
            .map(|row| (row.member_id, row.flags))
            .collect();
        Self {
            options: value.options,
            ballots,
            prompt_messages: value.prompt_messages,
        }
    }
}

impl From<VoteSession> for VoteSessionEntity {
    fn from(value: VoteSession) -> Self {
        Self {
            options: value.options,
            ballots: value
                .ballots
                .into_iter()
                .map(|(member_id, flags)| BallotRowEntity { member_id, flags })
                .collect(),
            prompt_messages: value.prompt_messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(name: &str, submitter: MemberId) -> Suggestion {
        Suggestion {
            name: name.into(),
            submitter,
            submitted_at: from_unix_seconds(1_700_000_000),
        }
    }

    #[test]
    fn duplicate_names_are_case_insensitive_no_ops() {
        let mut pool = SuggestionPool::default();
        assert!(pool.insert(suggestion("Celeste", 1)));
        assert!(!pool.insert(suggestion("celeste", 2)));
        assert!(!pool.insert(suggestion("CELESTE", 1)));

        assert_eq!(pool.len(), 1);
        let kept = pool.iter().next().unwrap();
        assert_eq!(kept.name, "Celeste");
        assert_eq!(kept.submitter, 1);
    }

    #[test]
    fn count_from_only_counts_the_member() {
        let mut pool = SuggestionPool::default();
        pool.insert(suggestion("Celeste", 1));
        pool.insert(suggestion("Hades", 1));
        pool.insert(suggestion("Factorio", 2));

        assert_eq!(pool.count_from(1), 2);
        assert_eq!(pool.count_from(2), 1);
        assert_eq!(pool.count_from(3), 0);
    }

    #[test]
    fn names_keep_insertion_order() {
        let mut pool = SuggestionPool::default();
        pool.insert(suggestion("Hades", 1));
        pool.insert(suggestion("Celeste", 2));
        pool.insert(suggestion("Factorio", 3));
        assert_eq!(pool.names(), vec!["Hades", "Celeste", "Factorio"]);
    }

    #[test]
    fn toggle_is_an_involution() {
        let mut session = VoteSession::open(vec!["A".into(), "B".into()]);
        assert_eq!(session.toggle(7, "B"), Some(true));
        assert_eq!(session.tally(), vec![("A".into(), 0), ("B".into(), 1)]);

        assert_eq!(session.toggle(7, "B"), Some(false));
        assert_eq!(session.tally(), vec![("A".into(), 0), ("B".into(), 0)]);
    }

    #[test]
    fn toggle_rejects_unknown_options() {
        let mut session = VoteSession::open(vec!["A".into()]);
        assert_eq!(session.toggle(7, "Z"), None);
        assert!(session.ballots.is_empty());
    }

    #[test]
    fn tally_sums_columns_per_option() {
        let mut session = VoteSession::open(vec!["A".into(), "B".into(), "C".into()]);
        session.toggle(1, "A");
        session.toggle(1, "C");
        session.toggle(2, "A");
        session.toggle(3, "A");
        session.toggle(3, "B");
        session.toggle(3, "B"); // toggled back off

        assert_eq!(
            session.tally(),
            vec![("A".into(), 3), ("B".into(), 0), ("C".into(), 1)]
        );
    }

    #[test]
    fn phase_tracks_session_presence() {
        let mut state = CommunityState::default();
        assert_eq!(state.phase(), RoundPhase::Idle);
        state.vote = Some(VoteSession::open(vec!["A".into()]));
        assert_eq!(state.phase(), RoundPhase::Voting);
    }

    #[test]
    fn settings_entity_round_trip_keeps_defaults_implicit() {
        let settings = CommunitySettings {
            announcement_channel: Some(10),
            ..CommunitySettings::default()
        };
        let entity: SettingsEntity = settings.clone().into();
        assert_eq!(entity.max_suggestions_per_member, None);
        assert_eq!(entity.retain_threshold, None);
        assert_eq!(entity.last_vote_started_at, None);

        let back: CommunitySettings = entity.into();
        assert_eq!(back, settings);
    }

    #[test]
    fn state_round_trips_through_entities() {
        let mut state = CommunityState {
            settings: CommunitySettings {
                announcement_channel: Some(1),
                vote_channel: Some(2),
                retain_threshold: -1,
                ..CommunitySettings::default()
            },
            suggestions: SuggestionPool::default(),
            vote: None,
        };
        state.suggestions.insert(suggestion("Celeste", 4));
        let mut session = VoteSession::open(vec!["Hades".into(), "Factorio".into()]);
        session.toggle(5, "Hades");
        session.prompt_messages.push(uuid::Uuid::new_v4());
        state.vote = Some(session);

        let rebuilt = CommunityState::from_entities(
            Some(state.settings_entity()),
            state.suggestions_entity(),
            state.votes_entity(),
        );
        assert_eq!(rebuilt, state);
    }
}
