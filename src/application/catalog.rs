//! Operator-facing management of categories and locations.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CategoriesRepo, CreateCategoryParams, CreateLocationParams, LocationsRepo, RepoError,
};
use crate::domain::entities::{CategoryRecord, LocationRecord};
use crate::domain::posts::MAX_TITLE_CHARS;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be at most {max} characters", max = MAX_TITLE_CHARS)]
    TooLong { field: &'static str },
    #[error("slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for CatalogError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => Self::Slug(err),
            SlugAsyncError::Predicate(err) => Self::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub is_published: bool,
}

fn check_title(field: &'static str, value: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Empty { field });
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(CatalogError::TooLong { field });
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl CatalogService {
    pub fn new(categories: Arc<dyn CategoriesRepo>, locations: Arc<dyn LocationsRepo>) -> Self {
        Self {
            categories,
            locations,
        }
    }

    pub async fn add_category(&self, new: NewCategory) -> Result<CategoryRecord, CatalogError> {
        let title = check_title("title", &new.title)?;

        let slug = match new.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => {
                validate_slug(slug)?;
                if self.categories.find_by_slug(slug).await?.is_some() {
                    return Err(CatalogError::SlugTaken(slug.to_string()));
                }
                slug.to_string()
            }
            _ => {
                let categories = self.categories.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let categories = categories.clone();
                    let candidate = candidate.to_string();
                    async move {
                        Ok::<bool, RepoError>(categories.find_by_slug(&candidate).await?.is_none())
                    }
                })
                .await?
            }
        };

        let category = self
            .categories
            .create_category(CreateCategoryParams {
                title,
                description: new.description.trim().to_string(),
                slug: slug.clone(),
                is_published: new.is_published,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => CatalogError::SlugTaken(slug),
                other => CatalogError::Repo(other),
            })?;

        info!(
            target = "blogicum::application::catalog",
            category_id = category.id,
            slug = %category.slug,
            "category created"
        );
        Ok(category)
    }

    pub async fn add_location(&self, new: NewLocation) -> Result<LocationRecord, CatalogError> {
        let name = check_title("name", &new.name)?;
        let location = self
            .locations
            .create_location(CreateLocationParams {
                name,
                is_published: new.is_published,
            })
            .await?;

        info!(
            target = "blogicum::application::catalog",
            location_id = location.id,
            "location created"
        );
        Ok(location)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, CatalogError> {
        Ok(self.categories.list_categories().await?)
    }

    pub async fn locations(&self) -> Result<Vec<LocationRecord>, CatalogError> {
        Ok(self.locations.list_locations().await?)
    }
}
