//! Publication rules shared by every post listing.

use time::OffsetDateTime;

use crate::domain::entities::{CategoryRecord, PostListRecord, PostRecord};

/// Maximum length of post, category and location titles.
pub const MAX_TITLE_CHARS: usize = 256;

/// Whether a post can be shown to readers other than its author at `now`.
///
/// A post is public when it is flagged published, its publication date has
/// been reached, and its category (if any) is published as well.
pub fn is_publicly_visible(
    post: &PostRecord,
    category: Option<&CategoryRecord>,
    now: OffsetDateTime,
) -> bool {
    post.is_published
        && post.pub_date <= now
        && category.is_none_or(|category| category.is_published)
}

impl PostListRecord {
    pub fn is_publicly_visible(&self, now: OffsetDateTime) -> bool {
        is_publicly_visible(&self.post, self.category.as_ref(), now)
    }

    /// Authors always see their own posts; everyone else needs them published.
    pub fn is_visible_to(&self, viewer_id: Option<i64>, now: OffsetDateTime) -> bool {
        viewer_id == Some(self.post.author_id) || self.is_publicly_visible(now)
    }
}
