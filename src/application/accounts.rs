//! Registration, password login and cookie sessions.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use metrics::counter;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::forms::{
    FormErrors, LoginForm, ProfileForm, RegistrationForm, RegistrationInput, domain_message,
};
use crate::application::repos::{
    CreateUserParams, RepoError, SessionsRepo, UpdateProfileParams, UsersRepo,
};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::users::{validate_password, validate_username};
use crate::infra::telemetry::METRIC_LOGIN_FAILURES;

pub const DEFAULT_SESSION_TTL_HOURS: u32 = 24 * 14;
const MIN_TOKEN_LEN: usize = 32;
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("submitted account data is invalid")]
    Invalid(FormErrors),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A freshly opened session; `token` goes into the cookie and is never stored.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self {
            users,
            sessions,
            session_ttl: Duration::hours(i64::from(DEFAULT_SESSION_TTL_HOURS)),
        }
    }

    pub fn with_session_ttl_hours(mut self, hours: u32) -> Self {
        self.session_ttl = Duration::hours(i64::from(hours.max(1)));
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Create an account from the sign-up form.
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserRecord, AccountError> {
        let input = form.clean().map_err(AccountError::Invalid)?;
        self.create_user(input).await
    }

    /// Create an account directly, bypassing the confirmation field.
    pub async fn create_user(&self, input: RegistrationInput) -> Result<UserRecord, AccountError> {
        let mut errors = FormErrors::new();
        if let Err(err) = validate_username(&input.username) {
            errors.add("username", domain_message(&err));
        }
        if let Err(err) = validate_password(&input.password) {
            errors.add("password2", domain_message(&err));
        }
        if !errors.is_empty() {
            return Err(AccountError::Invalid(errors));
        }
        if self.users.find_by_username(&input.username).await?.is_some() {
            return Err(AccountError::Invalid(FormErrors::single(
                "username",
                USERNAME_TAKEN,
            )));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username: input.username,
                password_hash,
                first_name: String::new(),
                last_name: String::new(),
                email: input.email,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => {
                    AccountError::Invalid(FormErrors::single("username", USERNAME_TAKEN))
                }
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "blogicum::application::accounts",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    /// Check credentials and open a session.
    pub async fn login(&self, form: &LoginForm) -> Result<IssuedSession, AccountError> {
        let (username, password) = form.clean().map_err(AccountError::Invalid)?;

        let user = self.users.find_by_username(&username).await?;
        let verified = match &user {
            Some(user) => verify_password(&password, &user.password_hash)?,
            None => false,
        };
        let Some(user) = user.filter(|_| verified) else {
            counter!(METRIC_LOGIN_FAILURES).increment(1);
            warn!(
                target = "blogicum::application::accounts",
                username = %username,
                "login rejected"
            );
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            return Err(AccountError::Invalid(errors));
        };

        self.open_session(user).await
    }

    pub async fn open_session(&self, user: UserRecord) -> Result<IssuedSession, AccountError> {
        let token = generate_token();
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.session_ttl;

        self.sessions
            .create_session(SessionRecord {
                token_hash: hash_token(&token),
                user_id: user.id,
                created_at: now,
                expires_at,
            })
            .await?;

        info!(
            target = "blogicum::application::accounts",
            user_id = user.id,
            "session opened"
        );
        Ok(IssuedSession {
            user,
            token,
            expires_at,
        })
    }

    /// Resolve a cookie token to its user. Unknown, malformed and expired
    /// tokens all resolve to `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        if token.len() < MIN_TOKEN_LEN {
            return Ok(None);
        }
        let token_hash = hash_token(token);
        let Some(session) = self.sessions.find_session(&token_hash).await? else {
            return Ok(None);
        };
        if session.token_hash.ct_eq(&token_hash).unwrap_u8() == 0 {
            return Ok(None);
        }
        if session.expires_at <= OffsetDateTime::now_utc() {
            self.sessions.delete_session(&token_hash).await?;
            return Ok(None);
        }
        Ok(self.users.find_by_id(session.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(&hash_token(token)).await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        let removed = self
            .sessions
            .delete_expired(OffsetDateTime::now_utc())
            .await?;
        Ok(removed)
    }

    pub async fn update_profile(
        &self,
        user: &UserRecord,
        form: &ProfileForm,
    ) -> Result<UserRecord, AccountError> {
        let input = form.clean().map_err(AccountError::Invalid)?;

        if input.username != user.username
            && self.users.find_by_username(&input.username).await?.is_some()
        {
            return Err(AccountError::Invalid(FormErrors::single(
                "username",
                USERNAME_TAKEN,
            )));
        }

        let updated = self
            .users
            .update_profile(UpdateProfileParams {
                id: user.id,
                username: input.username,
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => {
                    AccountError::Invalid(FormErrors::single("username", USERNAME_TAKEN))
                }
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "blogicum::application::accounts",
            user_id = updated.id,
            "profile updated"
        );
        Ok(updated)
    }
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| AccountError::Hashing(format!("invalid stored hash: {err}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AccountError::Hashing(err.to_string())),
    }
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("password123").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("password123", &hash).expect("verify"));
        assert!(!verify_password("password124", &hash).expect("verify"));
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        assert!(matches!(
            verify_password("password123", "plain"),
            Err(AccountError::Hashing(_))
        ));
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
        assert_eq!(hash_token(&first).len(), 32);
        assert_eq!(hash_token(&first), hash_token(&first));
    }
}
