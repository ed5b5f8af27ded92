use quiz_core::model::{GuardianId, Package, PackageId, PackageOrder};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_package_row, parse_order, placeholders, ser};
use crate::repository::{NewPackageRecord, PackageRepository, StorageError};

#[async_trait::async_trait]
impl PackageRepository for SqliteRepository {
    async fn insert_new_package(
        &self,
        package: NewPackageRecord,
    ) -> Result<PackageId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO packages (guardian_id, name, description, presentation_order, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("guardian_id", package.guardian_id.value())?)
        .bind(package.name)
        .bind(package.description)
        .bind(package.order.as_str())
        .bind(package.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        u64::try_from(res.last_insert_rowid())
            .map(PackageId::new)
            .map_err(|_| StorageError::Serialization("package_id sign overflow".into()))
    }

    async fn upsert_package(&self, package: &Package) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO packages (id, guardian_id, name, description, presentation_order, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                presentation_order = excluded.presentation_order
            ",
        )
        .bind(id_to_i64("package_id", package.id().value())?)
        .bind(id_to_i64("guardian_id", package.guardian_id().value())?)
        .bind(package.name().to_owned())
        .bind(package.description().map(ToOwned::to_owned))
        .bind(package.order().as_str())
        .bind(package.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, guardian_id, name, description, presentation_order, created_at
            FROM packages WHERE id = ?1
            ",
        )
        .bind(id_to_i64("package_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_package_row).transpose()
    }

    async fn list_packages(&self, guardian_id: GuardianId) -> Result<Vec<Package>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, guardian_id, name, description, presentation_order, created_at
            FROM packages
            WHERE guardian_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("guardian_id", guardian_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_package_row).collect()
    }

    async fn delete_package(&self, id: PackageId) -> Result<(), StorageError> {
        // Questions, options and assignments go with it via ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM packages WHERE id = ?1")
            .bind(id_to_i64("package_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn package_orders(&self, ids: &[PackageId]) -> Result<Vec<PackageOrder>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, presentation_order FROM packages WHERE id IN ({})",
            placeholders(1, ids.len())
        );
        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id_to_i64("package_id", id.value())?);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(conn)?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_id: i64 = row.try_get("id").map_err(ser)?;
            let order: String = row.try_get("presentation_order").map_err(ser)?;
            orders.push(PackageOrder {
                package_id: PackageId::new(
                    u64::try_from(raw_id)
                        .map_err(|_| StorageError::Serialization("id sign overflow".into()))?,
                ),
                order: parse_order(&order)?,
            });
        }
        Ok(orders)
    }
}
