//! Category slug helpers.
//!
//! Slugs are derived from titles with the `slug` crate, which transliterates
//! non-Latin scripts so Cyrillic titles still yield ASCII slugs. Callers that
//! need uniqueness pass an async predicate that checks the repository.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
pub const MAX_SLUG_CHARS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain latin letters, digits, hyphens and underscores")]
    InvalidCharacters { slug: String },
    #[error("slug `{slug}` is longer than {max} characters", max = MAX_SLUG_CHARS)]
    TooLong { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > MAX_SLUG_CHARS {
        candidate.truncate(MAX_SLUG_CHARS);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Check an operator-supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_CHARS {
        return Err(SlugError::TooLong {
            slug: slug.to_string(),
        });
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Append `-{attempt}`, shortening `base` so the result stays within
/// `MAX_SLUG_CHARS`.
fn with_suffix(base: &str, attempt: usize) -> String {
    let suffix = format!("-{attempt}");
    let mut stem = base.to_string();
    stem.truncate(MAX_SLUG_CHARS.saturating_sub(suffix.len()));
    while stem.ends_with('-') {
        stem.pop();
    }
    stem.push_str(&suffix);
    stem
}

/// Produce a slug whose uniqueness is confirmed by the async predicate.
///
/// `is_unique` must resolve to `true` when the candidate is free. Collisions
/// are retried with a monotonic suffix (`-2`, `-3`, …).
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = with_suffix(&base, attempt);
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}
