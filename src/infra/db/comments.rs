use async_trait::async_trait;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{CommentListRecord, CommentRecord};

use super::types::{CommentListRow, CommentRow};
use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentListRow>(
            "SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at, \
                    u.username AS author_username \
             FROM comments cm \
             INNER JOIN users u ON u.id = cm.author_id \
             WHERE cm.post_id = $1 \
             ORDER BY cm.created_at ASC, cm.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentListRecord::from).collect())
    }

    async fn find_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentRecord>, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, text, post_id, author_id, created_at \
             FROM comments WHERE id = $1 AND post_id = $2",
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (text, post_id, author_id) VALUES ($1, $2, $3) \
             RETURNING id, text, post_id, author_id, created_at",
        )
        .bind(params.text)
        .bind(params.post_id)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "UPDATE comments SET text = $2 WHERE id = $1 \
             RETURNING id, text, post_id, author_id, created_at",
        )
        .bind(id)
        .bind(text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
