use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::pagination::{CursorPage, PageRequest, PostCursor};
use crate::application::repos::{PostListScope, PostsRepo, RepoError};
use crate::domain::entities::{PostListRecord, PostRecord};
use crate::infra::db::map_sqlx_error;

use super::super::types::{PostListRow, PostRow};
use super::super::{POST_COUNT_SELECT, POST_LISTING_SELECT, PostgresRepositories};
use super::POST_COLUMNS;

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostListRecord>, RepoError> {
        let page = PageRequest::new(page.limit.clamp(1, 100), page.cursor);

        let mut qb = QueryBuilder::new(POST_LISTING_SELECT);
        Self::apply_scope_conditions(&mut qb, scope, now);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (p.pub_date, p.id) < (");
            qb.push_bind(cursor.pub_date());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(page.fetch_limit());

        let rows = qb
            .build_query_as::<PostListRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.into_iter().map(PostListRecord::from).collect();
        Ok(CursorPage::from_overfetch(records, page.limit, |record| {
            PostCursor::new(record.post.pub_date, record.post.id).encode()
        }))
    }

    async fn count_posts(
        &self,
        scope: PostListScope,
        now: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new(POST_COUNT_SELECT);
        Self::apply_scope_conditions(&mut qb, scope, now);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_listing(&self, id: i64) -> Result<Option<PostListRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_LISTING_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostListRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostListRecord::from))
    }
}
