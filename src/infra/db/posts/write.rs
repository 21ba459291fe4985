use async_trait::async_trait;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::infra::db::map_sqlx_error;

use super::super::PostgresRepositories;
use super::super::types::PostRow;
use super::POST_COLUMNS;

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            text,
            author_id,
            pub_date,
            category_id,
            location_id,
            is_published,
        } = params;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (title, text, author_id, pub_date, category_id, location_id, is_published) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(title)
        .bind(text)
        .bind(author_id)
        .bind(pub_date)
        .bind(category_id)
        .bind(location_id)
        .bind(is_published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            text,
            pub_date,
            category_id,
            location_id,
            is_published,
        } = params;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, text = $3, pub_date = $4, category_id = $5, \
             location_id = $6, is_published = $7 \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(text)
        .bind(pub_date)
        .bind(category_id)
        .bind(location_id)
        .bind(is_published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
