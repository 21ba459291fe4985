//! Postgres-backed repository implementations.

mod categories;
mod comments;
mod locations;
mod posts;
mod sessions;
mod types;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};
use time::OffsetDateTime;

use crate::application::repos::{HealthProbe, PostListScope, RepoError};

const POST_LISTING_SELECT: &str = "SELECT p.id, p.title, p.text, p.author_id, p.pub_date, \
    p.category_id, p.location_id, p.is_published, p.created_at, \
    u.username AS author_username, \
    c.title AS category_title, c.description AS category_description, \
    c.slug AS category_slug, c.is_published AS category_is_published, \
    c.created_at AS category_created_at, \
    l.name AS location_name, l.is_published AS location_is_published, \
    l.created_at AS location_created_at, \
    (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN categories c ON c.id = p.category_id \
    LEFT JOIN locations l ON l.id = p.location_id \
    WHERE 1=1 ";

const POST_COUNT_SELECT: &str = "SELECT COUNT(*) FROM posts p \
    LEFT JOIN categories c ON c.id = p.category_id \
    WHERE 1=1 ";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn push_visible_condition<'q>(qb: &mut QueryBuilder<'q, Postgres>, now: OffsetDateTime) {
        qb.push("(p.is_published AND p.pub_date <= ");
        qb.push_bind(now);
        qb.push(" AND (c.id IS NULL OR c.is_published))");
    }

    fn apply_scope_conditions<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        scope: PostListScope,
        now: OffsetDateTime,
    ) {
        match scope {
            PostListScope::Public => {
                qb.push(" AND ");
                Self::push_visible_condition(qb, now);
            }
            PostListScope::Category { category_id } => {
                qb.push(" AND p.category_id = ");
                qb.push_bind(category_id);
                qb.push(" AND ");
                Self::push_visible_condition(qb, now);
            }
            PostListScope::Author {
                author_id,
                include_hidden,
            } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
                if !include_hidden {
                    qb.push(" AND ");
                    Self::push_visible_condition(qb, now);
                }
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl HealthProbe for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
