use time::OffsetDateTime;

use crate::domain::entities::{
    CategoryRecord, CommentListRecord, CommentRecord, LocationRecord, PostListRecord, PostRecord,
    SessionRecord, UserRecord,
};

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) date_joined: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            date_joined: row.date_joined,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SessionRow {
    pub(crate) token_hash: Vec<u8>,
    pub(crate) user_id: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            token_hash: row.token_hash,
            user_id: row.user_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CategoryRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) slug: String,
    pub(crate) is_published: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            slug: row.slug,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LocationRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) is_published: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) text: String,
    pub(crate) author_id: i64,
    pub(crate) pub_date: OffsetDateTime,
    pub(crate) category_id: Option<i64>,
    pub(crate) location_id: Option<i64>,
    pub(crate) is_published: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            author_id: row.author_id,
            pub_date: row.pub_date,
            category_id: row.category_id,
            location_id: row.location_id,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

/// A post joined with its author, category, location and comment count.
#[derive(sqlx::FromRow)]
pub(crate) struct PostListRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) text: String,
    pub(crate) author_id: i64,
    pub(crate) pub_date: OffsetDateTime,
    pub(crate) category_id: Option<i64>,
    pub(crate) location_id: Option<i64>,
    pub(crate) is_published: bool,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
    pub(crate) category_title: Option<String>,
    pub(crate) category_description: Option<String>,
    pub(crate) category_slug: Option<String>,
    pub(crate) category_is_published: Option<bool>,
    pub(crate) category_created_at: Option<OffsetDateTime>,
    pub(crate) location_name: Option<String>,
    pub(crate) location_is_published: Option<bool>,
    pub(crate) location_created_at: Option<OffsetDateTime>,
    pub(crate) comment_count: i64,
}

impl From<PostListRow> for PostListRecord {
    fn from(row: PostListRow) -> Self {
        let category = match (
            row.category_id,
            row.category_title,
            row.category_slug,
            row.category_is_published,
            row.category_created_at,
        ) {
            (Some(id), Some(title), Some(slug), Some(is_published), Some(created_at)) => {
                Some(CategoryRecord {
                    id,
                    title,
                    description: row.category_description.unwrap_or_default(),
                    slug,
                    is_published,
                    created_at,
                })
            }
            _ => None,
        };
        let location = match (
            row.location_id,
            row.location_name,
            row.location_is_published,
            row.location_created_at,
        ) {
            (Some(id), Some(name), Some(is_published), Some(created_at)) => Some(LocationRecord {
                id,
                name,
                is_published,
                created_at,
            }),
            _ => None,
        };

        Self {
            post: PostRecord {
                id: row.id,
                title: row.title,
                text: row.text,
                author_id: row.author_id,
                pub_date: row.pub_date,
                category_id: row.category_id,
                location_id: row.location_id,
                is_published: row.is_published,
                created_at: row.created_at,
            },
            author_username: row.author_username,
            category,
            location,
            comment_count: u64::try_from(row.comment_count).unwrap_or_default(),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) post_id: i64,
    pub(crate) author_id: i64,
    pub(crate) created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            post_id: row.post_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentListRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) post_id: i64,
    pub(crate) author_id: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
}

impl From<CommentListRow> for CommentListRecord {
    fn from(row: CommentListRow) -> Self {
        Self {
            comment: CommentRecord {
                id: row.id,
                text: row.text,
                post_id: row.post_id,
                author_id: row.author_id,
                created_at: row.created_at,
            },
            author_username: row.author_username,
        }
    }
}
