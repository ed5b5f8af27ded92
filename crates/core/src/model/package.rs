use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{GuardianId, PackageId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PackageError {
    #[error("package name cannot be empty")]
    EmptyName,

    #[error("unknown presentation order: {0}")]
    UnknownOrder(String),
}

//
// ─── PRESENTATION ORDER ────────────────────────────────────────────────────────
//

/// How a package's questions are ordered within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationOrder {
    /// Ascending creation time.
    Sequential,
    /// Uniformly random permutation per session.
    #[default]
    Shuffle,
}

impl PresentationOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PresentationOrder::Sequential => "sequential",
            PresentationOrder::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PresentationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresentationOrder {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "shuffle" => Ok(Self::Shuffle),
            other => Err(PackageError::UnknownOrder(other.to_string())),
        }
    }
}

/// Presentation order resolved for a single package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOrder {
    pub package_id: PackageId,
    pub order: PresentationOrder,
}

//
// ─── PACKAGE ───────────────────────────────────────────────────────────────────
//

/// A named collection of quiz questions owned by a guardian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    id: PackageId,
    guardian_id: GuardianId,
    name: String,
    description: Option<String>,
    order: PresentationOrder,
    created_at: DateTime<Utc>,
}

impl Package {
    /// Creates a new Package.
    ///
    /// # Errors
    ///
    /// Returns `PackageError::EmptyName` if name is empty or whitespace-only.
    pub fn new(
        id: PackageId,
        guardian_id: GuardianId,
        name: impl Into<String>,
        description: Option<String>,
        order: PresentationOrder,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PackageError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PackageError::EmptyName);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            guardian_id,
            name: name.trim().to_owned(),
            description,
            order,
            created_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> PackageId {
        self.id
    }

    #[must_use]
    pub fn guardian_id(&self) -> GuardianId {
        self.guardian_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn order(&self) -> PresentationOrder {
        self.order
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn package_order(&self) -> PackageOrder {
        PackageOrder {
            package_id: self.id,
            order: self.order,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn package_new_rejects_empty_name() {
        let err = Package::new(
            PackageId::new(1),
            GuardianId::new(1),
            "   ",
            None,
            PresentationOrder::Shuffle,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, PackageError::EmptyName);
    }

    #[test]
    fn package_trims_name_and_filters_empty_description() {
        let package = Package::new(
            PackageId::new(3),
            GuardianId::new(1),
            "  Animals  ",
            Some("   ".into()),
            PresentationOrder::Sequential,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(package.name(), "Animals");
        assert_eq!(package.description(), None);
        assert_eq!(
            package.package_order(),
            PackageOrder {
                package_id: PackageId::new(3),
                order: PresentationOrder::Sequential,
            }
        );
    }

    #[test]
    fn presentation_order_defaults_to_shuffle() {
        assert_eq!(PresentationOrder::default(), PresentationOrder::Shuffle);
    }

    #[test]
    fn presentation_order_parses_case_insensitively() {
        assert_eq!(
            " Sequential ".parse::<PresentationOrder>().unwrap(),
            PresentationOrder::Sequential
        );
        assert!(matches!(
            "random".parse::<PresentationOrder>(),
            Err(PackageError::UnknownOrder(_))
        ));
    }
}
