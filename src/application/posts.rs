//! Authoring posts: create, edit and delete on behalf of their author.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::forms::{FormErrors, PostForm, PostInput};
use crate::application::repos::{
    CategoriesRepo, CreatePostParams, LocationsRepo, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::{CategoryRecord, LocationRecord, PostRecord, UserRecord};
use crate::infra::telemetry::METRIC_POSTS_CREATED;

const INVALID_CHOICE: &str = "Select a valid choice.";

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("post belongs to another author")]
    Forbidden { post_id: i64 },
    #[error("submitted post is invalid")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Choices offered by the post editor.
#[derive(Debug, Clone, Default)]
pub struct PostFormOptions {
    pub categories: Vec<CategoryRecord>,
    pub locations: Vec<LocationRecord>,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        locations: Arc<dyn LocationsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            locations,
        }
    }

    pub async fn form_options(&self) -> Result<PostFormOptions, PostError> {
        Ok(PostFormOptions {
            categories: self.categories.list_categories().await?,
            locations: self.locations.list_locations().await?,
        })
    }

    /// Load a post for modification by `user`.
    pub async fn load_owned(&self, post_id: i64, user: &UserRecord) -> Result<PostRecord, PostError> {
        let post = self
            .reader
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        if post.author_id != user.id {
            return Err(PostError::Forbidden { post_id });
        }
        Ok(post)
    }

    pub async fn create_post(
        &self,
        author: &UserRecord,
        form: &PostForm,
    ) -> Result<PostRecord, PostError> {
        let input = self.validate(form, None).await?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                title: input.title,
                text: input.text,
                author_id: author.id,
                pub_date: input.pub_date,
                category_id: Some(input.category_id),
                location_id: input.location_id,
                is_published: input.is_published,
            })
            .await?;

        counter!(METRIC_POSTS_CREATED).increment(1);
        info!(
            target = "blogicum::application::posts",
            post_id = post.id,
            author = %author.username,
            "post created"
        );
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        post_id: i64,
        user: &UserRecord,
        form: &PostForm,
    ) -> Result<PostRecord, PostError> {
        let existing = self.load_owned(post_id, user).await?;
        let input = self.validate(form, Some(&existing)).await?;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: existing.id,
                title: input.title,
                text: input.text,
                pub_date: input.pub_date,
                category_id: Some(input.category_id),
                location_id: input.location_id,
                is_published: input.is_published,
            })
            .await?;

        info!(
            target = "blogicum::application::posts",
            post_id = post.id,
            "post updated"
        );
        Ok(post)
    }

    pub async fn delete_post(&self, post_id: i64, user: &UserRecord) -> Result<(), PostError> {
        let post = self.load_owned(post_id, user).await?;
        self.writer.delete_post(post.id).await?;
        info!(
            target = "blogicum::application::posts",
            post_id = post.id,
            "post deleted"
        );
        Ok(())
    }

    /// Clean the form and check that the referenced category and location exist.
    async fn validate(
        &self,
        form: &PostForm,
        existing: Option<&PostRecord>,
    ) -> Result<PostInput, PostError> {
        let input = form.clean(existing).map_err(PostError::Invalid)?;

        let mut errors = FormErrors::new();
        if self.categories.find_by_id(input.category_id).await?.is_none() {
            errors.add("category", INVALID_CHOICE);
        }
        if let Some(location_id) = input.location_id
            && self.locations.find_by_id(location_id).await?.is_none()
        {
            errors.add("location", INVALID_CHOICE);
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(PostError::Invalid(errors))
        }
    }
}
