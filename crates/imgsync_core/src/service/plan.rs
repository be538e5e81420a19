//! Local-versus-stored inventory diff.

use crate::model::image::ImageRecord;
use std::collections::HashSet;

/// Difference between local and stored inventories, keyed by
/// `(repository, tag)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Stored records with no local image, in store order.
    pub missing_locally: Vec<ImageRecord>,
    /// Local records with no stored row, in local order.
    pub untracked: Vec<ImageRecord>,
}

impl ReconcilePlan {
    pub fn between(local: &[ImageRecord], stored: &[ImageRecord]) -> Self {
        let local_keys: HashSet<(&str, &str)> = local.iter().map(ImageRecord::key).collect();
        let stored_keys: HashSet<(&str, &str)> = stored.iter().map(ImageRecord::key).collect();

        // Duplicate stored rows collapse to the first occurrence.
        let mut seen = HashSet::new();
        let mut missing_locally = Vec::new();
        for record in stored {
            let key = record.key();
            if !local_keys.contains(&key) && seen.insert(key) {
                missing_locally.push(record.clone());
            }
        }

        let untracked = local
            .iter()
            .filter(|record| !stored_keys.contains(&record.key()))
            .cloned()
            .collect();

        Self {
            missing_locally,
            untracked,
        }
    }

    pub fn is_in_sync(&self) -> bool {
        self.missing_locally.is_empty() && self.untracked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ReconcilePlan;
    use crate::model::image::ImageRecord;

    fn record(repo: &str, tag: &str, id: &str) -> ImageRecord {
        ImageRecord::new(repo, tag, id, "1MB")
    }

    #[test]
    fn diff_is_keyed_by_repository_and_tag_only() {
        let local = vec![
            record("alpine", "latest", "aaa"),
            record("redis", "7", "bbb"),
        ];
        let stored = vec![
            record("alpine", "latest", "different-id"),
            record("debian", "12", "ccc"),
            record("debian", "12", "ccc"),
        ];

        let plan = ReconcilePlan::between(&local, &stored);
        assert_eq!(plan.missing_locally, vec![record("debian", "12", "ccc")]);
        assert_eq!(plan.untracked, vec![record("redis", "7", "bbb")]);
        assert!(!plan.is_in_sync());
    }

    #[test]
    fn identical_inventories_are_in_sync() {
        let images = vec![record("alpine", "latest", "aaa")];
        assert!(ReconcilePlan::between(&images, &images).is_in_sync());
    }
}
