use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a question package
    PackageId
);
define_id!(
    /// Unique identifier for a question
    QuestionId
);
define_id!(
    /// Unique identifier for an answer option
    AnswerId
);
define_id!(
    /// Unique identifier for a kid profile
    KidId
);
define_id!(
    /// Unique identifier for the guardian account owning packages
    GuardianId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_id_display() {
        assert_eq!(PackageId::new(42).to_string(), "42");
    }

    #[test]
    fn question_id_from_str_trims() {
        let id: QuestionId = " 123 ".parse().unwrap();
        assert_eq!(id, QuestionId::new(123));
    }

    #[test]
    fn kid_id_from_str_invalid() {
        let err = "kid-1".parse::<KidId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse KidId from string");
    }

    #[test]
    fn answer_id_debug_names_kind() {
        assert_eq!(format!("{:?}", AnswerId::new(7)), "AnswerId(7)");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&GuardianId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: GuardianId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GuardianId::new(9));
    }
}
