//! Comment authoring.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::forms::{CommentForm, FormErrors};
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::{CommentRecord, PostListRecord, UserRecord};
use crate::infra::telemetry::METRIC_COMMENTS_CREATED;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("post not found")]
    PostNotFound,
    #[error("comment not found")]
    NotFound,
    #[error("submitted comment is invalid")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Posts accept comments from anyone who can see them.
    async fn commentable_post(
        &self,
        post_id: i64,
        viewer: &UserRecord,
    ) -> Result<PostListRecord, CommentError> {
        self.posts
            .find_listing(post_id)
            .await?
            .filter(|post| post.is_visible_to(Some(viewer.id), OffsetDateTime::now_utc()))
            .ok_or(CommentError::PostNotFound)
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        author: &UserRecord,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        let post = self.commentable_post(post_id, author).await?;
        let text = form.clean().map_err(CommentError::Invalid)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.post.id,
                author_id: author.id,
                text,
            })
            .await?;

        counter!(METRIC_COMMENTS_CREATED).increment(1);
        info!(
            target = "blogicum::application::comments",
            post_id = comment.post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    /// Load a comment for modification. Comments of other authors are
    /// reported as missing.
    pub async fn load_owned(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &UserRecord,
    ) -> Result<CommentRecord, CommentError> {
        self.comments
            .find_comment(post_id, comment_id)
            .await?
            .filter(|comment| comment.author_id == user.id)
            .ok_or(CommentError::NotFound)
    }

    pub async fn edit_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &UserRecord,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self.load_owned(post_id, comment_id, user).await?;
        let text = form.clean().map_err(CommentError::Invalid)?;
        let updated = self.comments.update_comment(comment.id, text).await?;
        info!(
            target = "blogicum::application::comments",
            post_id,
            comment_id,
            "comment updated"
        );
        Ok(updated)
    }

    pub async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &UserRecord,
    ) -> Result<(), CommentError> {
        let comment = self.load_owned(post_id, comment_id, user).await?;
        self.comments.delete_comment(comment.id).await?;
        info!(
            target = "blogicum::application::comments",
            post_id,
            comment_id,
            "comment deleted"
        );
        Ok(())
    }
}
