//! Demo content: one sequential and one shuffled package assigned to a kid.

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{
    AnswerDraft, GuardianId, KidId, Package, PackageId, PresentationOrder, QuestionDraft,
};

use crate::repository::{NewPackageRecord, Storage, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub packages: Vec<PackageId>,
    pub questions: usize,
    /// Packages already present for the guardian; nothing was inserted for them.
    pub skipped: usize,
}

struct SeedPackage {
    name: &'static str,
    description: &'static str,
    order: PresentationOrder,
    questions: &'static [(&'static str, [&'static str; 4], usize, u32)],
}

const PACKAGES: &[SeedPackage] = &[
    SeedPackage {
        name: "Animals",
        description: "Who lives where?",
        order: PresentationOrder::Sequential,
        questions: &[
            ("Which animal says moo?", ["Cat", "Cow", "Duck", "Dog"], 1, 10),
            ("Which animal can fly?", ["Fish", "Horse", "Bird", "Snail"], 2, 10),
            ("Which animal lives in the sea?", ["Whale", "Lion", "Bear", "Goat"], 0, 15),
        ],
    },
    SeedPackage {
        name: "Colors",
        description: "Mix and match",
        order: PresentationOrder::Shuffle,
        questions: &[
            ("What color is the sky on a sunny day?", ["Green", "Red", "Yellow", "Blue"], 3, 5),
            ("Red and yellow make...", ["Orange", "Purple", "Brown", "Pink"], 0, 20),
        ],
    },
];

/// Insert the demo packages for `guardian_id` and assign them to `kid_id`.
///
/// Packages whose name already exists for the guardian are left untouched but
/// still assigned.
///
/// # Errors
///
/// Returns `StorageError` if any repository call fails.
pub async fn seed_demo(
    storage: &Storage,
    guardian_id: GuardianId,
    kid_id: KidId,
    now: DateTime<Utc>,
) -> Result<SeedReport, StorageError> {
    let existing = storage.packages.list_packages(guardian_id).await?;
    let mut report = SeedReport {
        packages: Vec::with_capacity(PACKAGES.len()),
        questions: 0,
        skipped: 0,
    };

    for seed in PACKAGES {
        if let Some(found) = existing.iter().find(|p| p.name() == seed.name) {
            storage.assignments.assign_package(kid_id, found.id()).await?;
            report.packages.push(found.id());
            report.skipped += 1;
            continue;
        }

        let package = Package::new(
            PackageId::new(0),
            guardian_id,
            seed.name,
            Some(seed.description.to_owned()),
            seed.order,
            now,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let package_id = storage
            .packages
            .insert_new_package(NewPackageRecord::from_package(&package))
            .await?;

        // Stagger creation times so sequential packages keep the listed order.
        for (offset, (content, answers, correct, points)) in (0_i64..).zip(seed.questions) {
            let draft = QuestionDraft {
                package_id,
                content: (*content).to_owned(),
                time_limit_secs: None,
                points: Some(*points),
                answers: answers
                    .iter()
                    .enumerate()
                    .map(|(i, text)| AnswerDraft::new(*text, i == *correct))
                    .collect(),
            };
            let validated = draft
                .validate(now + Duration::seconds(offset))
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            storage.questions.insert_question(&validated).await?;
            report.questions += 1;
        }

        storage.assignments.assign_package(kid_id, package_id).await?;
        report.packages.push(package_id);
    }

    Ok(report)
}
