use std::sync::Arc;

use quiz_core::model::{GuardianId, KidId, Package, PackageId, PresentationOrder};
use storage::repository::{
    AssignmentRepository, NewPackageRecord, PackageRepository, StorageError,
};
use tracing::info;

use crate::Clock;
use crate::error::PackageServiceError;

/// Package CRUD and kid assignments.
#[derive(Clone)]
pub struct PackageService {
    clock: Clock,
    packages: Arc<dyn PackageRepository>,
    assignments: Arc<dyn AssignmentRepository>,
}

impl PackageService {
    #[must_use]
    pub fn new(
        clock: Clock,
        packages: Arc<dyn PackageRepository>,
        assignments: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            clock,
            packages,
            assignments,
        }
    }

    /// Create and persist a package owned by `guardian_id`.
    ///
    /// # Errors
    ///
    /// Returns `PackageServiceError::Package` for validation failures.
    /// Returns `PackageServiceError::Storage` if persistence fails.
    pub async fn create_package(
        &self,
        guardian_id: GuardianId,
        name: String,
        description: Option<String>,
        order: PresentationOrder,
    ) -> Result<PackageId, PackageServiceError> {
        let package = Package::new(
            PackageId::new(1),
            guardian_id,
            name,
            description,
            order,
            self.clock.now(),
        )?;
        let id = self
            .packages
            .insert_new_package(NewPackageRecord::from_package(&package))
            .await?;
        info!(package_id = %id, name = package.name(), "package created");
        Ok(id)
    }

    /// Update name, description and presentation order, keeping owner and
    /// creation time.
    ///
    /// # Errors
    ///
    /// Returns `PackageServiceError::Package` if validation fails.
    /// Returns `PackageServiceError::Storage` if the package is missing or
    /// repository access fails.
    pub async fn update_package(
        &self,
        package_id: PackageId,
        name: String,
        description: Option<String>,
        order: PresentationOrder,
    ) -> Result<Package, PackageServiceError> {
        let existing = self
            .packages
            .get_package(package_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let updated = Package::new(
            existing.id(),
            existing.guardian_id(),
            name,
            description,
            order,
            existing.created_at(),
        )?;
        self.packages.upsert_package(&updated).await?;
        Ok(updated)
    }

    /// Returns `Ok(None)` when the package does not exist.
    ///
    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if repository access fails.
    pub async fn get_package(
        &self,
        package_id: PackageId,
    ) -> Result<Option<Package>, PackageServiceError> {
        Ok(self.packages.get_package(package_id).await?)
    }

    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if repository access fails.
    pub async fn list_for_guardian(
        &self,
        guardian_id: GuardianId,
    ) -> Result<Vec<Package>, PackageServiceError> {
        Ok(self.packages.list_packages(guardian_id).await?)
    }

    /// Delete a package together with its questions and their options.
    ///
    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if the package is missing or
    /// repository access fails.
    pub async fn delete_package(&self, package_id: PackageId) -> Result<(), PackageServiceError> {
        self.packages.delete_package(package_id).await?;
        info!(package_id = %package_id, "package deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if the package is missing or
    /// repository access fails.
    pub async fn assign(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), PackageServiceError> {
        self.assignments.assign_package(kid_id, package_id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if repository access fails.
    pub async fn unassign(
        &self,
        kid_id: KidId,
        package_id: PackageId,
    ) -> Result<(), PackageServiceError> {
        self.assignments.unassign_package(kid_id, package_id).await?;
        Ok(())
    }

    /// Packages assigned to a kid, in assignment order.
    ///
    /// # Errors
    ///
    /// Returns `PackageServiceError::Storage` if repository access fails.
    pub async fn assigned(&self, kid_id: KidId) -> Result<Vec<Package>, PackageServiceError> {
        let ids = self.assignments.assigned_packages(kid_id).await?;
        let mut packages = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(package) = self.packages.get_package(id).await? {
                packages.push(package);
            }
        }
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::PackageError;
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> PackageService {
        let repo = InMemoryRepository::new();
        PackageService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        )
    }

    #[tokio::test]
    async fn create_then_get_trims_fields() {
        let service = service();
        let id = service
            .create_package(
                GuardianId::new(1),
                "  Animals ".into(),
                Some("   ".into()),
                PresentationOrder::Sequential,
            )
            .await
            .unwrap();

        let package = service.get_package(id).await.unwrap().unwrap();
        assert_eq!(package.name(), "Animals");
        assert_eq!(package.description(), None);
        assert_eq!(package.order(), PresentationOrder::Sequential);
        assert_eq!(package.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = service()
            .create_package(GuardianId::new(1), " ".into(), None, PresentationOrder::Shuffle)
            .await
            .unwrap_err();
        assert!(matches!(err, PackageServiceError::Package(PackageError::EmptyName)));
    }

    #[tokio::test]
    async fn update_keeps_owner_and_creation_time() {
        let service = service();
        let id = service
            .create_package(GuardianId::new(7), "Colors".into(), None, PresentationOrder::Shuffle)
            .await
            .unwrap();

        let updated = service
            .update_package(id, "Colours".into(), Some("UK".into()), PresentationOrder::Sequential)
            .await
            .unwrap();

        assert_eq!(updated.guardian_id(), GuardianId::new(7));
        assert_eq!(updated.created_at(), fixed_now());
        let stored = service.get_package(id).await.unwrap().unwrap();
        assert_eq!(stored.name(), "Colours");
        assert_eq!(stored.description(), Some("UK"));
    }

    #[tokio::test]
    async fn update_missing_package_is_not_found() {
        let err = service()
            .update_package(PackageId::new(42), "x".into(), None, PresentationOrder::Shuffle)
            .await
            .unwrap_err();
        assert!(matches!(err, PackageServiceError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn assigned_lists_packages_in_assignment_order() {
        let service = service();
        let guardian = GuardianId::new(1);
        let a = service
            .create_package(guardian, "A".into(), None, PresentationOrder::Shuffle)
            .await
            .unwrap();
        let b = service
            .create_package(guardian, "B".into(), None, PresentationOrder::Shuffle)
            .await
            .unwrap();
        let kid = KidId::new(3);

        service.assign(kid, b).await.unwrap();
        service.assign(kid, a).await.unwrap();
        let names: Vec<String> = service
            .assigned(kid)
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, vec!["B", "A"]);

        service.unassign(kid, b).await.unwrap();
        service.delete_package(a).await.unwrap();
        assert!(service.assigned(kid).await.unwrap().is_empty());
        assert_eq!(service.list_for_guardian(guardian).await.unwrap().len(), 1);
    }
}
