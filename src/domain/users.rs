//! Account field rules.

use crate::domain::error::DomainError;

pub const MAX_USERNAME_CHARS: usize = 150;
/// Limit for first and last names.
pub const MAX_NAME_CHARS: usize = 150;
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Names that would shadow fixed routes under `/profile/`.
const RESERVED_USERNAMES: &[&str] = &["edit"];

/// Usernames are 1..=150 characters of letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(DomainError::validation(format!(
            "username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits and @/./+/-/_",
        ));
    }
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(DomainError::validation("this username is reserved"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation("password cannot be entirely numeric"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_usernames() {
        assert!(validate_username("testuser").is_ok());
        assert!(validate_username("ivan.petrov+blog@example").is_ok());
        assert!(validate_username("Алексей").is_ok());
    }

    #[test]
    fn rejects_spaces_and_overlong_usernames() {
        assert!(validate_username("test user").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
        assert!(validate_username("Edit").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("1234567890").is_err());
    }
}
