use async_trait::async_trait;

use crate::application::repos::{CreateUserParams, RepoError, UpdateProfileParams, UsersRepo};
use crate::domain::entities::UserRecord;

use super::types::UserRow;
use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str =
    "id, username, password_hash, first_name, last_name, email, date_joined";

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password_hash, first_name, last_name, email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(params.username)
        .bind(params.password_hash)
        .bind(params.first_name)
        .bind(params.last_name)
        .bind(params.email)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET username = $2, first_name = $3, last_name = $4, email = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.username)
        .bind(params.first_name)
        .bind(params.last_name)
        .bind(params.email)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }
}
