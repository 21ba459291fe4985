//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PostCursor};
use crate::domain::entities::{
    CategoryRecord, CommentListRecord, CommentRecord, LocationRecord, PostListRecord, PostRecord,
    SessionRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Publicly visible posts across the whole blog.
    Public,
    /// Publicly visible posts of one category.
    Category { category_id: i64 },
    /// Posts of one author; hidden ones only when the author is looking.
    Author { author_id: i64, include_hidden: bool },
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub name: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub text: String,
    pub author_id: i64,
    pub pub_date: OffsetDateTime,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, session: SessionRecord) -> Result<(), RepoError>;

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError>;

    /// Remove sessions that expired before `now`, returning how many were dropped.
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait LocationsRepo: Send + Sync {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<LocationRecord>, RepoError>;

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first by `pub_date`, ties broken by descending id.
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostListRecord>, RepoError>;

    async fn count_posts(&self, scope: PostListScope, now: OffsetDateTime)
    -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    async fn find_listing(&self, id: i64) -> Result<Option<PostListRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Deletes the post together with its comments.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Oldest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentListRecord>, RepoError>;

    async fn find_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: i64, text: String) -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
