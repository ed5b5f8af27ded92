use quiz_core::model::{KidId, PackageId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, ser};
use crate::repository::{AssignmentRepository, StorageError};

#[async_trait::async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn assign_package(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), StorageError> {
        let kid = id_to_i64("kid_id", kid_id.value())?;
        let package = id_to_i64("package_id", package_id.value())?;

        let exists = sqlx::query("SELECT 1 FROM packages WHERE id = ?1")
            .bind(package)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO kid_packages (kid_id, package_id, position)
            VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM kid_packages WHERE kid_id = ?1)
            )
            ON CONFLICT(kid_id, package_id) DO NOTHING
            ",
        )
        .bind(kid)
        .bind(package)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn unassign_package(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kid_packages WHERE kid_id = ?1 AND package_id = ?2")
            .bind(id_to_i64("kid_id", kid_id.value())?)
            .bind(id_to_i64("package_id", package_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn assigned_packages(&self, kid_id: KidId) -> Result<Vec<PackageId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT package_id FROM kid_packages
            WHERE kid_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(id_to_i64("kid_id", kid_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: i64 = row.try_get("package_id").map_err(ser)?;
            ids.push(PackageId::new(u64::try_from(raw).map_err(ser)?));
        }
        Ok(ids)
    }
}
