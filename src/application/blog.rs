//! Read side of the blog: feeds, profiles and post pages.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{PageRequest, PostCursor};
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, PostListScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CategoryRecord, CommentListRecord, PostListRecord, UserRecord};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One page of a post listing.
#[derive(Debug, Clone)]
pub struct PostFeed {
    pub posts: Vec<PostListRecord>,
    pub next_cursor: Option<String>,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct CategoryFeed {
    pub category: CategoryRecord,
    pub feed: PostFeed,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub user: UserRecord,
    pub is_owner: bool,
    pub feed: PostFeed,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostListRecord,
    pub comments: Vec<CommentListRecord>,
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
    page_size: u32,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            posts,
            comments,
            categories,
            users,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn decode_cursor(&self, cursor: Option<&str>) -> Result<Option<PostCursor>, BlogError> {
        cursor
            .filter(|value| !value.is_empty())
            .map(PostCursor::decode)
            .transpose()
            .map_err(|err| BlogError::InvalidCursor(err.to_string()))
    }

    async fn feed(
        &self,
        scope: PostListScope,
        cursor: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<PostFeed, BlogError> {
        let cursor = self.decode_cursor(cursor)?;
        let page = self
            .posts
            .list_posts(scope, now, PageRequest::new(self.page_size, cursor))
            .await?;
        let total = self.posts.count_posts(scope, now).await?;

        Ok(PostFeed {
            posts: page.items,
            next_cursor: page.next_cursor,
            total,
        })
    }

    /// Publicly visible posts, newest first.
    pub async fn index(&self, cursor: Option<&str>) -> Result<PostFeed, BlogError> {
        self.feed(PostListScope::Public, cursor, OffsetDateTime::now_utc())
            .await
    }

    /// Publicly visible posts of a published category.
    pub async fn category_posts(
        &self,
        slug: &str,
        cursor: Option<&str>,
    ) -> Result<CategoryFeed, BlogError> {
        let category = self
            .categories
            .find_by_slug(slug)
            .await?
            .filter(|category| category.is_published)
            .ok_or(BlogError::NotFound("category"))?;

        let feed = self
            .feed(
                PostListScope::Category {
                    category_id: category.id,
                },
                cursor,
                OffsetDateTime::now_utc(),
            )
            .await?;

        Ok(CategoryFeed { category, feed })
    }

    /// A user's page. Owners see every post they wrote.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&UserRecord>,
        cursor: Option<&str>,
    ) -> Result<ProfileFeed, BlogError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(BlogError::NotFound("user"))?;
        let is_owner = viewer.is_some_and(|viewer| viewer.id == user.id);

        let feed = self
            .feed(
                PostListScope::Author {
                    author_id: user.id,
                    include_hidden: is_owner,
                },
                cursor,
                OffsetDateTime::now_utc(),
            )
            .await?;

        Ok(ProfileFeed {
            user,
            is_owner,
            feed,
        })
    }

    pub async fn post_detail(
        &self,
        id: i64,
        viewer_id: Option<i64>,
    ) -> Result<PostDetail, BlogError> {
        let post = self
            .posts
            .find_listing(id)
            .await?
            .filter(|post| post.is_visible_to(viewer_id, OffsetDateTime::now_utc()))
            .ok_or(BlogError::NotFound("post"))?;
        let comments = self.comments.list_for_post(post.post.id).await?;

        Ok(PostDetail { post, comments })
    }
}
