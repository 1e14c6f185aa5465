use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::MemberId,
    dto::{common::RoundPhaseDto, format_system_time, validation::validate_suggestion_name},
    state::session::Suggestion,
};

/// Payload submitted when a member suggests a game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitSuggestionRequest {
    /// Member submitting the suggestion.
    pub member_id: MemberId,
    /// Suggested game name; matched case-insensitively against the pool.
    pub name: String,
}

impl Validate for SubmitSuggestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(err) = validate_suggestion_name(&self.name) {
            errors.add("name", err);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One suggestion as rendered in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionSummary {
    /// Game name with its first-submitted casing.
    pub name: String,
    /// First submitter; 0 marks entries retained from the previous round.
    pub submitter_id: MemberId,
    /// RFC 3339 timestamp of the first submission.
    pub submitted_at: String,
}

impl From<&Suggestion> for SuggestionSummary {
    fn from(value: &Suggestion) -> Self {
        Self {
            name: value.name.clone(),
            submitter_id: value.submitter,
            submitted_at: format_system_time(value.submitted_at),
        }
    }
}

/// Current suggestion pool in insertion order.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionListResponse {
    /// Suggestions collected for the next round; may be empty.
    pub suggestions: Vec<SuggestionSummary>,
    /// Whether a vote is currently open alongside the pool.
    pub phase: RoundPhaseDto,
}

/// Result of clearing the suggestion pool.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClearSuggestionsResponse {
    /// Whether any suggestions were actually removed.
    pub cleared: bool,
    /// Confirmation to relay to the administrator.
    pub message: String,
}
