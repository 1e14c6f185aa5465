use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Game Night Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::community::submit_suggestion,
        crate::routes::community::list_suggestions,
        crate::routes::community::toggle_vote,
        crate::routes::community::vote_tally,
        crate::routes::admin::clear_suggestions,
        crate::routes::admin::open_vote,
        crate::routes::admin::close_vote,
        crate::routes::admin::get_settings,
        crate::routes::admin::update_settings,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::ActionResponse,
            crate::dto::common::RoundPhaseDto,
            crate::dto::suggestions::SubmitSuggestionRequest,
            crate::dto::suggestions::SuggestionSummary,
            crate::dto::suggestions::SuggestionListResponse,
            crate::dto::suggestions::ClearSuggestionsResponse,
            crate::dto::votes::ToggleVoteRequest,
            crate::dto::votes::ToggleVoteResponse,
            crate::dto::votes::TallyEntry,
            crate::dto::votes::TallyResponse,
            crate::dto::votes::OpenVoteResponse,
            crate::dto::votes::CloseVoteResponse,
            crate::dto::settings::UpdateSettingsRequest,
            crate::dto::settings::SettingsResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::VotePromptEvent,
            crate::dto::sse::PromptEditEvent,
            crate::dto::sse::PromptDeleteEvent,
            crate::dto::sse::AnnouncementEvent,
            crate::dto::sse::TallyUpdatedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "community", description = "Member-facing suggestion and vote operations"),
        (name = "admin", description = "Community configuration and round control"),
    )
)]
pub struct ApiDoc;
