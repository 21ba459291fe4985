use async_trait::async_trait;

use crate::application::repos::{CreateLocationParams, LocationsRepo, RepoError};
use crate::domain::entities::LocationRecord;

use super::types::LocationRow;
use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl LocationsRepo for PostgresRepositories {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) \
             RETURNING id, name, is_published, created_at",
        )
        .bind(params.name)
        .bind(params.is_published)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LocationRecord>, RepoError> {
        let row = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(LocationRecord::from))
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let rows = sqlx::query_as::<_, LocationRow>(
            "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }
}
