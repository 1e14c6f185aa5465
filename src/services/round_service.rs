use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, seq::IndexedRandom};
use tracing::info;

use crate::{
    dao::models::{ChannelId, CommunityId, RoleId, SYSTEM_MEMBER},
    dto::votes::{CloseVoteResponse, OpenVoteResponse, TallyEntry},
    error::ServiceError,
    services::{
        known_community,
        publisher::{Announcement, MAX_OPTIONS_PER_PROMPT, VotePrompt},
        require_active,
    },
    state::{
        SharedState,
        session::{Suggestion, VoteSession},
    },
};

/// Open a vote round: freeze the suggestion pool into an option list, publish
/// the prompts, and start collecting ballots.
///
/// An already-open round is superseded: its session is discarded without an
/// announcement and its prompts are deleted. Suggestions submitted while the
/// new round runs accumulate for the round after it.
pub async fn open_vote(
    state: &SharedState,
    community: CommunityId,
) -> Result<OpenVoteResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let (options, prompt_messages, superseded) = {
        let mut guard = handle.lock().await;
        require_active(&guard)?;

        let channel = guard
            .settings
            .effective_vote_channel()
            .ok_or(ServiceError::Uninitialized)?;
        if guard.suggestions.is_empty() {
            return Err(ServiceError::NoSuggestions);
        }

        let options = guard.suggestions.names();
        guard.suggestions.clear();
        guard.settings.last_vote_started_at = SystemTime::now();
        let superseded = guard.vote.take().map(|old| old.prompt_messages);

        let prompts = build_prompts(guard.settings.vote_role, channel, &options);
        // Hold the community lock across publishing so the recorded message
        // ids and the session become visible atomically.
        let prompt_messages = state
            .publisher()
            .publish_prompts(community, prompts)
            .await;

        let mut session = VoteSession::open(options.clone());
        session.prompt_messages = prompt_messages.clone();
        guard.vote = Some(session);

        let registry = state.registry();
        registry.cache_settings(community, guard.settings_entity());
        registry.cache_suggestions(community, guard.suggestions_entity());
        registry.cache_votes(community, guard.votes_entity());
        (options, prompt_messages, superseded)
    };

    let registry = state.registry();
    registry.flush_settings().await;
    registry.flush_suggestions().await;
    registry.flush_votes().await;

    if let Some(old_prompts) = superseded {
        state
            .publisher()
            .discard_prompts(community, old_prompts)
            .await;
        info!(community, "superseded an open vote round");
    }

    info!(community, options = options.len(), "vote round opened");
    Ok(OpenVoteResponse {
        message: format!("Voting is open over {} suggestions.", options.len()),
        options,
        prompt_messages,
    })
}

/// Close the open round: tally the ballots, pick the winner (at random among
/// the tied options when the top tally is shared), re-pool options that met
/// the retention threshold, and announce the result.
///
/// The random source is passed in so the tie-break is reproducible in tests;
/// production callers hand in an OS-seeded generator.
pub async fn close_vote<R>(
    state: &SharedState,
    community: CommunityId,
    mut rng: R,
) -> Result<CloseVoteResponse, ServiceError>
where
    R: Rng + Send,
{
    let handle = known_community(state, community)?;
    let (response, prompt_messages, announcement) = {
        let mut guard = handle.lock().await;
        require_active(&guard)?;

        let channel = guard
            .settings
            .announcement_channel
            .ok_or(ServiceError::Uninitialized)?;
        let session = guard.vote.take().ok_or(ServiceError::NoOpenVote)?;

        let results = session.tally();
        let top = results.iter().map(|(_, votes)| *votes).max().unwrap_or(0);
        let winners: Vec<String> = results
            .iter()
            .filter(|(_, votes)| *votes == top)
            .map(|(name, _)| name.clone())
            .collect();
        // Options are never empty while a session exists, so neither is the
        // winner set.
        let winner = winners
            .choose(&mut rng)
            .cloned()
            .ok_or(ServiceError::NoOpenVote)?;
        let tie = winners.len() > 1;
        let tied = if tie { winners } else { Vec::new() };

        let threshold = guard.settings.retain_threshold;
        let mut retained = Vec::new();
        if threshold >= 0 {
            for (name, votes) in &results {
                if i64::from(*votes) >= threshold
                    && guard.suggestions.insert(Suggestion {
                        name: name.clone(),
                        submitter: SYSTEM_MEMBER,
                        submitted_at: UNIX_EPOCH,
                    })
                {
                    retained.push(name.clone());
                }
            }
        }

        let registry = state.registry();
        registry.cache_suggestions(community, guard.suggestions_entity());
        registry.cache_votes(community, None);

        let results: Vec<TallyEntry> = results.into_iter().map(Into::into).collect();
        let announcement = Announcement {
            channel_id: channel,
            mention_role: guard.settings.announcement_role,
            winner: winner.clone(),
            tie,
            tied: tied.clone(),
            results: results.clone(),
        };
        (
            CloseVoteResponse {
                winner,
                tie,
                tied,
                results,
                retained,
            },
            session.prompt_messages,
            announcement,
        )
    };

    let registry = state.registry();
    registry.flush_suggestions().await;
    registry.flush_votes().await;

    state
        .publisher()
        .retire_prompts(community, prompt_messages, announcement)
        .await;

    info!(
        community,
        winner = %response.winner,
        tie = response.tie,
        retained = response.retained.len(),
        "vote round closed"
    );
    Ok(response)
}

fn build_prompts(vote_role: Option<RoleId>, channel: ChannelId, options: &[String]) -> Vec<VotePrompt> {
    let chunks: Vec<&[String]> = options.chunks(MAX_OPTIONS_PER_PROMPT).collect();
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| VotePrompt {
            channel_id: channel,
            // Only the first prompt pings the configured role.
            mention_role: if index == 0 { vote_role } else { None },
            text: if total == 1 {
                "Vote for the games you want to play!".to_string()
            } else {
                format!(
                    "Vote for the games you want to play! ({}/{})",
                    index + 1,
                    total
                )
            },
            options: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use futures::{FutureExt, future::BoxFuture};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        dao::{memory_store::MemoryStore, models::MessageId},
        services::publisher::PromptPublisher,
        services::{suggestion_service, vote_service},
        state::{AppState, registry::SessionRegistry},
    };

    #[derive(Default)]
    struct RecordingPublisher {
        published: StdMutex<Vec<(CommunityId, Vec<VotePrompt>)>>,
        retired: StdMutex<Vec<(CommunityId, Vec<MessageId>, Announcement)>>,
        discarded: StdMutex<Vec<(CommunityId, Vec<MessageId>)>>,
    }

    impl PromptPublisher for RecordingPublisher {
        fn publish_prompts(
            &self,
            community: CommunityId,
            prompts: Vec<VotePrompt>,
        ) -> BoxFuture<'static, Vec<MessageId>> {
            let ids: Vec<MessageId> = prompts.iter().map(|_| uuid::Uuid::new_v4()).collect();
            self.published.lock().unwrap().push((community, prompts));
            async move { ids }.boxed()
        }

        fn retire_prompts(
            &self,
            community: CommunityId,
            message_ids: Vec<MessageId>,
            announcement: Announcement,
        ) -> BoxFuture<'static, ()> {
            self.retired
                .lock()
                .unwrap()
                .push((community, message_ids, announcement));
            async {}.boxed()
        }

        fn discard_prompts(
            &self,
            community: CommunityId,
            message_ids: Vec<MessageId>,
        ) -> BoxFuture<'static, ()> {
            self.discarded.lock().unwrap().push((community, message_ids));
            async {}.boxed()
        }
    }

    async fn active_state() -> (crate::state::SharedState, Arc<RecordingPublisher>) {
        let registry = SessionRegistry::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        let handle = registry.init_community(1).await;
        handle.lock().await.settings.announcement_channel = Some(100);
        let publisher = Arc::new(RecordingPublisher::default());
        (AppState::with_publisher(registry, publisher.clone()), publisher)
    }

    #[tokio::test]
    async fn open_requires_suggestions() {
        let (state, _) = active_state().await;
        let err = open_vote(&state, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoSuggestions));
    }

    #[tokio::test]
    async fn open_freezes_the_pool_and_publishes_prompts() {
        let (state, publisher) = active_state().await;
        suggestion_service::submit(&state, 1, 10, "Celeste").await.unwrap();
        suggestion_service::submit(&state, 1, 11, "Hades").await.unwrap();

        let opened = open_vote(&state, 1).await.unwrap();
        assert_eq!(opened.options, vec!["Celeste", "Hades"]);
        assert_eq!(opened.prompt_messages.len(), 1);

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1[0].channel_id, 100);
        assert_eq!(published[0].1[0].options, vec!["Celeste", "Hades"]);

        // The pool was consumed and new suggestions go to the next round.
        let listing = suggestion_service::list(&state, 1).await.unwrap();
        assert!(listing.suggestions.is_empty());
        assert_eq!(listing.phase, crate::dto::common::RoundPhaseDto::Voting);
    }

    #[tokio::test]
    async fn reopening_supersedes_the_previous_round() {
        let (state, publisher) = active_state().await;
        suggestion_service::submit(&state, 1, 10, "Celeste").await.unwrap();
        let first = open_vote(&state, 1).await.unwrap();

        suggestion_service::submit(&state, 1, 10, "Hades").await.unwrap();
        let second = open_vote(&state, 1).await.unwrap();
        assert_eq!(second.options, vec!["Hades"]);

        let discarded = publisher.discarded.lock().unwrap();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].1, first.prompt_messages);
        assert!(publisher.retired.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn options_are_chunked_for_button_limits() {
        let (state, publisher) = active_state().await;
        {
            let handle = state.registry().community(1).unwrap();
            let mut guard = handle.lock().await;
            guard.settings.max_suggestions_per_member = 0;
            guard.settings.vote_role = Some(55);
        }
        for i in 0..30 {
            suggestion_service::submit(&state, 1, 0, &format!("Game {i}"))
                .await
                .unwrap();
        }

        let opened = open_vote(&state, 1).await.unwrap();
        assert_eq!(opened.prompt_messages.len(), 2);

        let published = publisher.published.lock().unwrap();
        let prompts = &published[0].1;
        assert_eq!(prompts[0].options.len(), 25);
        assert_eq!(prompts[1].options.len(), 5);
        assert_eq!(prompts[0].mention_role, Some(55));
        assert_eq!(prompts[1].mention_role, None);
    }

    #[tokio::test]
    async fn close_picks_the_clear_winner() {
        let (state, publisher) = active_state().await;
        for name in ["A", "B", "C"] {
            suggestion_service::submit(&state, 1, 0, name).await.unwrap();
        }
        // Retention off so the pool stays empty after the close.
        {
            let handle = state.registry().community(1).unwrap();
            handle.lock().await.settings.retain_threshold = -1;
        }
        open_vote(&state, 1).await.unwrap();

        for member in 1..=5 {
            vote_service::toggle(&state, 1, member, "A").await.unwrap();
        }
        for member in 1..=3 {
            vote_service::toggle(&state, 1, member, "B").await.unwrap();
        }
        vote_service::toggle(&state, 1, 1, "C").await.unwrap();

        let closed = close_vote(&state, 1, StdRng::seed_from_u64(7)).await.unwrap();
        assert_eq!(closed.winner, "A");
        assert!(!closed.tie);
        assert!(closed.tied.is_empty());
        assert_eq!(
            closed.results,
            vec![
                ("A".to_string(), 5).into(),
                ("B".to_string(), 3).into(),
                ("C".to_string(), 1).into(),
            ]
        );
        assert!(closed.retained.is_empty());

        let retired = publisher.retired.lock().unwrap();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].2.winner, "A");
        assert_eq!(retired[0].2.channel_id, 100);
    }

    #[tokio::test]
    async fn tie_break_stays_inside_the_tied_set() {
        for seed in 0..16 {
            let (state, _) = active_state().await;
            for name in ["A", "B", "C"] {
                suggestion_service::submit(&state, 1, 0, name).await.unwrap();
            }
            open_vote(&state, 1).await.unwrap();
            vote_service::toggle(&state, 1, 1, "A").await.unwrap();
            vote_service::toggle(&state, 1, 2, "B").await.unwrap();

            let closed = close_vote(&state, 1, StdRng::seed_from_u64(seed))
                .await
                .unwrap();
            assert!(closed.tie);
            assert_eq!(closed.tied, vec!["A", "B"]);
            assert!(closed.tied.contains(&closed.winner), "seed {seed}");
        }
    }

    #[tokio::test]
    async fn retention_re_pools_popular_options() {
        let (state, _) = active_state().await;
        for name in ["X", "Y"] {
            suggestion_service::submit(&state, 1, 0, name).await.unwrap();
        }
        open_vote(&state, 1).await.unwrap();
        vote_service::toggle(&state, 1, 1, "X").await.unwrap();
        vote_service::toggle(&state, 1, 2, "X").await.unwrap();
        vote_service::toggle(&state, 1, 1, "Y").await.unwrap();

        // Default threshold is 2: only X comes back.
        let closed = close_vote(&state, 1, StdRng::seed_from_u64(0)).await.unwrap();
        assert_eq!(closed.retained, vec!["X"]);

        let listing = suggestion_service::list(&state, 1).await.unwrap();
        assert_eq!(listing.suggestions.len(), 1);
        assert_eq!(listing.suggestions[0].name, "X");
        assert_eq!(listing.suggestions[0].submitter_id, SYSTEM_MEMBER);
    }

    #[tokio::test]
    async fn close_without_an_open_vote_fails() {
        let (state, _) = active_state().await;
        let err = close_vote(&state, 1, StdRng::seed_from_u64(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoOpenVote));
    }

    #[tokio::test]
    async fn rounds_are_gated_on_initialization() {
        let registry = SessionRegistry::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        registry.init_community(1).await;
        let state = AppState::with_publisher(registry, Arc::new(RecordingPublisher::default()));

        assert!(matches!(
            open_vote(&state, 1).await.unwrap_err(),
            ServiceError::Uninitialized
        ));
        assert!(matches!(
            close_vote(&state, 1, StdRng::seed_from_u64(0))
                .await
                .unwrap_err(),
            ServiceError::Uninitialized
        ));
    }
}
