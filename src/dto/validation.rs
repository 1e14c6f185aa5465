//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted suggestion name; anything longer will not render in a
/// prompt button label.
pub const MAX_SUGGESTION_NAME_LENGTH: usize = 100;

/// Validates that a suggested game name is displayable: non-blank, within the
/// label length limit, and free of control characters.
pub fn validate_suggestion_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("suggestion_name_blank");
        err.message = Some("Suggestion name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > MAX_SUGGESTION_NAME_LENGTH {
        let mut err = ValidationError::new("suggestion_name_length");
        err.message = Some(
            format!("Suggestion name must be at most {MAX_SUGGESTION_NAME_LENGTH} characters")
                .into(),
        );
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("suggestion_name_control");
        err.message = Some("Suggestion name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_suggestion_name("Celeste").is_ok());
        assert!(validate_suggestion_name("Worms, Armageddon").is_ok());
        assert!(validate_suggestion_name("Ōkami HD").is_ok());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(validate_suggestion_name("").is_err());
        assert!(validate_suggestion_name("   ").is_err());
        assert!(validate_suggestion_name("\t").is_err());
    }

    #[test]
    fn rejects_oversized_names() {
        let long = "x".repeat(MAX_SUGGESTION_NAME_LENGTH + 1);
        assert!(validate_suggestion_name(&long).is_err());
        let just_fits = "x".repeat(MAX_SUGGESTION_NAME_LENGTH);
        assert!(validate_suggestion_name(&just_fits).is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(validate_suggestion_name("Cele\nste").is_err());
        assert!(validate_suggestion_name("Cele\u{7}ste").is_err());
    }
}
