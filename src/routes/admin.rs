use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    dao::models::CommunityId,
    dto::{
        settings::{SettingsResponse, UpdateSettingsRequest},
        suggestions::ClearSuggestionsResponse,
        votes::{CloseVoteResponse, OpenVoteResponse},
    },
    error::AppError,
    services::{round_service, settings_service, suggestion_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints for configuring communities and driving vote rounds.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/communities/{id}/suggestions",
            delete(clear_suggestions),
        )
        .route("/admin/communities/{id}/vote/open", post(open_vote))
        .route("/admin/communities/{id}/vote/close", post(close_vote))
        .route(
            "/admin/communities/{id}/settings",
            get(get_settings).patch(update_settings),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Drop every pooled suggestion for the community.
#[utoipa::path(
    delete,
    path = "/admin/communities/{id}/suggestions",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Community identifier")),
    responses((status = 200, description = "Suggestion pool cleared", body = ClearSuggestionsResponse))
)]
pub async fn clear_suggestions(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<ClearSuggestionsResponse>, AppError> {
    Ok(Json(suggestion_service::clear(&state, id).await?))
}

/// Freeze the suggestion pool into an option list and open a vote round.
#[utoipa::path(
    post,
    path = "/admin/communities/{id}/vote/open",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Vote round opened", body = OpenVoteResponse),
        (status = 409, description = "Community not set up or no suggestions pooled")
    )
)]
pub async fn open_vote(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<OpenVoteResponse>, AppError> {
    Ok(Json(round_service::open_vote(&state, id).await?))
}

/// Close the open round, announce the winner, and recycle popular options.
#[utoipa::path(
    post,
    path = "/admin/communities/{id}/vote/close",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Vote round closed", body = CloseVoteResponse),
        (status = 409, description = "No vote is open")
    )
)]
pub async fn close_vote(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<CloseVoteResponse>, AppError> {
    let rng = StdRng::from_os_rng();
    Ok(Json(round_service::close_vote(&state, id, rng).await?))
}

/// Current settings record for the community.
#[utoipa::path(
    get,
    path = "/admin/communities/{id}/settings",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Community identifier")),
    responses(
        (status = 200, description = "Community settings", body = SettingsResponse),
        (status = 409, description = "Community not set up")
    )
)]
pub async fn get_settings(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
) -> Result<Json<SettingsResponse>, AppError> {
    Ok(Json(settings_service::get(&state, id).await?))
}

/// Apply a partial settings update; setting the announcement channel
/// initializes the community.
#[utoipa::path(
    patch,
    path = "/admin/communities/{id}/settings",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Community identifier")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated settings", body = SettingsResponse),
        (status = 409, description = "Community not set up for the requested fields")
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Path(id): Path<CommunityId>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    Ok(Json(settings_service::update(&state, id, payload).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = {
        let guard = state.admin_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin SSE stream not initialised yet".into(),
        )),
    }
}
