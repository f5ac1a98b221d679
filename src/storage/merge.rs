//! Dedup against persisted records.

use std::collections::HashSet;

use crate::models::{BidRecord, IdentityKey};

/// Records from `new` whose identity key is absent from `existing`.
///
/// Order is preserved. Repeats inside `new` collapse to the first one seen.
pub fn merge_new_records(new: Vec<BidRecord>, existing: &[BidRecord]) -> Vec<BidRecord> {
    let mut seen: HashSet<IdentityKey> = existing.iter().map(BidRecord::identity_key).collect();
    new.into_iter()
        .filter(|record| seen.insert(record.identity_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BidField;

    fn record(name: &str, datetime: &str, counterparty: &str) -> BidRecord {
        BidRecord::new()
            .with(BidField::ConstructionName, name)
            .with(BidField::BidOpeningDatetime, datetime)
            .with(BidField::Counterparty, counterparty)
    }

    #[test]
    fn test_only_unseen_records_survive() {
        let existing = vec![
            record("テスト工事1", "2025-04-01 10:00", "テスト会社1"),
            record("テスト工事2", "2025-04-02 10:00", "テスト会社2"),
        ];
        let new = vec![
            record("テスト工事2", "2025-04-02 10:00", "別の会社"),
            record("テスト工事3", "2025-04-03 10:00", "テスト会社3"),
        ];

        let merged = merge_new_records(new.clone(), &existing);

        assert_eq!(merged, vec![new[1].clone()]);
    }

    #[test]
    fn test_changed_fields_do_not_make_a_record_new() {
        let full = |name: &str, datetime: &str, amount: &str, counterparty: &str| {
            BidRecord::new()
                .with(BidField::ConstructionName, name)
                .with(BidField::BidOpeningDatetime, datetime)
                .with(BidField::BidMethod, "一般競争入札")
                .with(BidField::ParticipantCount, "3")
                .with(BidField::AwardAmount, amount)
                .with(BidField::EstimatedPrice, "2,000,000円")
                .with(BidField::MinimumPrice, "900,000円")
                .with(BidField::Counterparty, counterparty)
        };
        let existing = vec![
            full("テスト工事1", "2025-04-01 10:00", "1,000,000円", "テスト会社1"),
            full("テスト工事2", "2025-04-02 11:00", "1,100,000円", "テスト会社2"),
        ];
        let new = vec![
            full("テスト工事1", "2025-04-01 10:00", "1,050,000円", "別の会社1"),
            full("テスト工事2", "2025-04-02 11:00", "1,150,000円", "別の会社2"),
            full("テスト工事3", "2025-04-03 13:00", "1,200,000円", "テスト会社3"),
        ];

        let merged = merge_new_records(new, &existing);

        assert_eq!(merged.len(), 1);
        let only = &merged[0];
        assert_eq!(only.get(BidField::ConstructionName), "テスト工事3");
        assert_eq!(only.get(BidField::BidOpeningDatetime), "2025-04-03 13:00");
        assert_eq!(only.get(BidField::BidMethod), "一般競争入札");
        assert_eq!(only.get(BidField::ParticipantCount), "3");
        assert_eq!(only.get(BidField::AwardAmount), "1,200,000円");
        assert_eq!(only.get(BidField::EstimatedPrice), "2,000,000円");
        assert_eq!(only.get(BidField::MinimumPrice), "900,000円");
        assert_eq!(only.get(BidField::Counterparty), "テスト会社3");
    }

    #[test]
    fn test_key_requires_both_fields() {
        let existing = vec![record("テスト工事1", "2025-04-01 10:00", "")];
        let new = vec![record("テスト工事1", "2025-04-08 10:00", "")];
        assert_eq!(merge_new_records(new, &existing).len(), 1);
    }

    #[test]
    fn test_duplicates_within_batch_collapse_to_first() {
        let new = vec![
            record("テスト工事1", "2025-04-01 10:00", "A"),
            record("テスト工事1", "2025-04-01 10:00", "B"),
            record("テスト工事2", "2025-04-02 10:00", "C"),
        ];
        let merged = merge_new_records(new, &[]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].get(BidField::Counterparty), "A");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![record("テスト工事1", "2025-04-01 10:00", "")];
        let new = vec![record("テスト工事2", "2025-04-02 10:00", "")];

        let first = merge_new_records(new.clone(), &existing);
        let mut persisted = existing.clone();
        persisted.extend(first.clone());

        assert_eq!(first.len(), 1);
        assert!(merge_new_records(new, &persisted).is_empty());
    }
}
