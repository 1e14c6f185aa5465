use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::CommunityId,
    dto::{
        common::ActionResponse,
        suggestions::{SubmitSuggestionRequest, SuggestionListResponse},
        votes::{TallyResponse, ToggleVoteRequest, ToggleVoteResponse},
    },
    error::AppError,
    services::{suggestion_service, vote_service},
    state::SharedState,
};

/// Member-facing endpoints for suggesting games and voting on them.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/communities/{id}/suggestions",
            get(list_suggestions).post(submit_suggestion),
        )
        .route("/communities/{id}/vote/toggle", post(toggle_vote))
        .route("/communities/{id}/vote/tally", get(vote_tally))
}

/// Suggest a game for the community's next game night.
#[utoipa::path(
    post,
    path = "/communities/{id}/suggestions",
    tag = "community",
    params(("id" = u64, Path, description = "Community identifier")),
    request_body = SubmitSuggestionRequest,
    responses(
        (status = 200, description = "Suggestion acknowledged", body = ActionResponse),
        (status = 409, description = "Community not set up or quota reached")
    )
)]
pub async fn submit_suggestion(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
    Valid(Json(payload)): Valid<Json<SubmitSuggestionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response =
        suggestion_service::submit(&state, id, payload.member_id, &payload.name).await?;
    Ok(Json(response))
}

/// List the suggestions collected for the next round.
#[utoipa::path(
    get,
    path = "/communities/{id}/suggestions",
    tag = "community",
    params(("id" = u64, Path, description = "Community identifier")),
    responses((status = 200, description = "Current suggestion pool", body = SuggestionListResponse))
)]
pub async fn list_suggestions(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<SuggestionListResponse>, AppError> {
    Ok(Json(suggestion_service::list(&state, id).await?))
}

/// Toggle the caller's ballot flag for one option of the open vote.
#[utoipa::path(
    post,
    path = "/communities/{id}/vote/toggle",
    tag = "community",
    params(("id" = u64, Path, description = "Community identifier")),
    request_body = ToggleVoteRequest,
    responses(
        (status = 200, description = "Ballot updated", body = ToggleVoteResponse),
        (status = 404, description = "Option is not part of the open vote"),
        (status = 409, description = "No vote is open")
    )
)]
pub async fn toggle_vote(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
    Json(payload): Json<ToggleVoteRequest>,
) -> Result<Json<ToggleVoteResponse>, AppError> {
    let response = vote_service::toggle(&state, id, payload.member_id, &payload.option).await?;
    Ok(Json(response))
}

/// Running totals of the open vote.
#[utoipa::path(
    get,
    path = "/communities/{id}/vote/tally",
    tag = "community",
    params(("id" = u64, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Per-option totals", body = TallyResponse),
        (status = 409, description = "No vote is open")
    )
)]
pub async fn vote_tally(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<TallyResponse>, AppError> {
    Ok(Json(vote_service::tally(&state, id).await?))
}
