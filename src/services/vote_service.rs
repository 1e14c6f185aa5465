use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dao::models::{CommunityId, MemberId},
    dto::{
        sse::{ServerEvent, TallyUpdatedEvent},
        votes::{TallyEntry, TallyResponse, ToggleVoteResponse},
    },
    error::ServiceError,
    services::{known_community, require_active},
    state::SharedState,
};

const EVENT_TALLY_UPDATED: &str = "vote.tally";

/// Flip `member`'s ballot flag for `option` in the open vote.
///
/// Every accepted toggle is flushed before returning so a crash never loses
/// more than the in-flight press, and the new totals are broadcast so prompt
/// UIs can refresh their counters.
pub async fn toggle(
    state: &SharedState,
    community: CommunityId,
    member: MemberId,
    option: &str,
) -> Result<ToggleVoteResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let (enabled, tallies) = {
        let mut guard = handle.lock().await;
        require_active(&guard)?;

        let session = guard.vote.as_mut().ok_or(ServiceError::NoOpenVote)?;
        let enabled = session
            .toggle(member, option)
            .ok_or_else(|| ServiceError::UnknownOption(option.to_string()))?;
        let tallies: Vec<TallyEntry> = session.tally().into_iter().map(Into::into).collect();
        state.registry().cache_votes(community, guard.votes_entity());
        (enabled, tallies)
    };

    state.registry().flush_votes().await;
    debug!(community, member, option, enabled, "ballot toggled");
    send_public_event(
        state,
        EVENT_TALLY_UPDATED,
        &TallyUpdatedEvent {
            community_id: community,
            tallies,
        },
    );

    Ok(ToggleVoteResponse {
        option: option.to_string(),
        enabled,
    })
}

/// Running totals of the open vote. Pure read.
pub async fn tally(
    state: &SharedState,
    community: CommunityId,
) -> Result<TallyResponse, ServiceError> {
    let handle = known_community(state, community)?;
    let guard = handle.lock().await;
    require_active(&guard)?;

    let session = guard.vote.as_ref().ok_or(ServiceError::NoOpenVote)?;
    Ok(TallyResponse {
        tallies: session.tally().into_iter().map(Into::into).collect(),
    })
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
