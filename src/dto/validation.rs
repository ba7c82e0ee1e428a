//! Validation helpers for DTOs and realtime payloads.

use validator::ValidationError;

/// Maximum number of characters accepted for an answer.
pub const MAX_ANSWER_CHARS: usize = 500;

/// Validates that answer content is non-blank and within the size cap.
pub fn validate_answer_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        let mut err = ValidationError::new("answer_empty");
        err.message = Some("Answer content must not be empty".into());
        return Err(err);
    }

    if content.chars().count() > MAX_ANSWER_CHARS {
        let mut err = ValidationError::new("answer_too_long");
        err.message = Some(
            format!("Answer content must not exceed {MAX_ANSWER_CHARS} characters").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates the round count requested for a new game.
pub fn validate_total_rounds(total_rounds: u32, max_rounds: u32) -> Result<(), ValidationError> {
    if total_rounds == 0 {
        let mut err = ValidationError::new("rounds_zero");
        err.message = Some("A game needs at least one round".into());
        return Err(err);
    }

    if total_rounds > max_rounds {
        let mut err = ValidationError::new("rounds_too_many");
        err.message = Some(format!("A game may run at most {max_rounds} rounds").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_answer_content_valid() {
        assert!(validate_answer_content("a haunted vending machine").is_ok());
        assert!(validate_answer_content(&"x".repeat(MAX_ANSWER_CHARS)).is_ok());
    }

    #[test]
    fn test_validate_answer_content_blank() {
        assert!(validate_answer_content("").is_err());
        assert!(validate_answer_content("   ").is_err());
        assert!(validate_answer_content("\n\t").is_err());
    }

    #[test]
    fn test_validate_answer_content_too_long() {
        assert!(validate_answer_content(&"x".repeat(MAX_ANSWER_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_total_rounds_bounds() {
        assert!(validate_total_rounds(1, 20).is_ok());
        assert!(validate_total_rounds(20, 20).is_ok());
        assert!(validate_total_rounds(0, 20).is_err());
        assert!(validate_total_rounds(21, 20).is_err());
    }
}
