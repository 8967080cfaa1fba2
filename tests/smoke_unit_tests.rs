//! Smoke screen unit tests for bundle ledger components
//!
//! These tests span the codebase, testing behavior in isolation from
//! integration scenarios. They are intended as smoke-screen and generally
//! test the happy path.

use bundle_ledger::calculator::{detail_total, effective_rate, member_allocations, theoretical_release};
use bundle_ledger::rates::is_valid_product_code;
use bundle_ledger::types::{
    Allocation, AllocationItem, DetailLine, PushType, SubmissionStatus, TimeStamp,
};
use bundle_ledger::utils::{new_allocation_id, new_record_id, new_submission_id};
use chrono::{Datelike, Timelike, Utc};

// UTILS MODULE TESTS
mod utils_tests {
    use super::*;

    /// Record ids are bech32 strings under the expected prefix.
    #[test]
    fn generates_ids_with_expected_prefixes() {
        let alloc_id = new_allocation_id().unwrap();
        let sub_id = new_submission_id().unwrap();

        assert!(alloc_id.starts_with("alloc_1"));
        assert!(sub_id.starts_with("sub_1"));
        assert!(alloc_id.len() > 10); // uuid payload produces substantial output
    }

    /// Multiple calls generate unique identifiers.
    #[test]
    fn generates_unique_ids() {
        let id1 = new_submission_id().unwrap();
        let id2 = new_submission_id().unwrap();
        let id3 = new_submission_id().unwrap();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    /// An empty human-readable prefix is rejected.
    #[test]
    fn handles_empty_hrp() {
        assert!(new_record_id("").is_err());
    }
}

// TYPES MODULE TESTS
mod types_tests {
    use super::*;

    /// TimeStamp::now() is close to the current time.
    #[test]
    fn timestamp_now_creates_current_time() {
        let ts = TimeStamp::now();
        let now = Utc::now();

        let diff = (now - ts.to_datetime_utc()).num_seconds().abs();
        assert!(diff < 1);
    }

    /// TimeStamp can be created with specific date/time values.
    #[test]
    fn timestamp_new_with_creates_specific_time() {
        let ts = TimeStamp::new_with(2024, 6, 15, 10, 30, 0);
        let dt = ts.to_datetime_utc();

        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 6);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    /// Only pending and approved count as active.
    #[test]
    fn active_statuses() {
        assert!(SubmissionStatus::Pending.is_active());
        assert!(SubmissionStatus::Approved.is_active());
        assert!(!SubmissionStatus::Historical.is_active());
    }

    /// Wire labels match the legacy persisted strings.
    #[test]
    fn wire_labels_are_stable() {
        assert_eq!(SubmissionStatus::Pending.wire_label(), "待审核");
        assert_eq!(SubmissionStatus::Approved.wire_label(), "已通过");
        assert_eq!(SubmissionStatus::Historical.wire_label(), "历史");
        assert_eq!(PushType::NotPushed.wire_label(), "没推");
    }
}

// RATES MODULE TESTS
mod rates_tests {
    use super::*;

    #[test]
    fn accepts_letter_then_digits() {
        assert!(is_valid_product_code("A1"));
        assert!(is_valid_product_code("b42"));
        assert!(is_valid_product_code("C999"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_valid_product_code(""));
        assert!(!is_valid_product_code("A"));
        assert!(!is_valid_product_code("42"));
        assert!(!is_valid_product_code("AA1"));
        assert!(!is_valid_product_code("A-1"));
        assert!(!is_valid_product_code("产1"));
    }
}

// ERROR MODULE TESTS
mod error_tests {
    use bundle_ledger::error::LedgerError;

    /// Machine-readable kinds stay stable for API callers.
    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(LedgerError::InvalidConfirmText.kind(), "invalid_confirm_text");
        assert_eq!(LedgerError::InvalidQuantity(-1).kind(), "invalid_quantity");
        assert_eq!(
            LedgerError::NotFound("sub_x".into()).kind(),
            "not_found"
        );
        assert_eq!(
            LedgerError::DuplicateProductCode("A1".into()).kind(),
            "duplicate_product_code"
        );
        assert_eq!(
            LedgerError::StoreUnavailable("io".into()).kind(),
            "store_unavailable"
        );
        assert_eq!(
            LedgerError::ConcurrentModification("race".into()).kind(),
            "concurrent_modification"
        );
    }
}

// CALCULATOR MODULE TESTS
mod calculator_tests {
    use super::*;

    #[test]
    fn effective_rate_penalizes_only_positive_rates() {
        assert_eq!(effective_rate(2, PushType::Pushed), 2);
        assert_eq!(effective_rate(2, PushType::NotPushed), 3);
        assert_eq!(effective_rate(0, PushType::NotPushed), 0);
    }

    #[test]
    fn detail_total_sums_quantities() {
        let details = vec![DetailLine::new("A1", 4), DetailLine::new("C2", 3)];
        assert_eq!(detail_total(&details), 7);
        assert_eq!(detail_total(&[]), 0);
    }

    #[test]
    fn release_floors_half_the_sheet_count() {
        assert_eq!(theoretical_release(0, 0), 0);
        assert_eq!(theoretical_release(1, 0), 0);
        assert_eq!(theoretical_release(1, 1), 1);
        assert_eq!(theoretical_release(4, 3), 3);
    }

    #[test]
    fn member_allocations_filters_by_member_and_group() {
        let allocations = vec![Allocation {
            id: "a1".into(),
            group: "G".into(),
            product_code: "A1".into(),
            items: vec![
                AllocationItem {
                    member_id: "M1".into(),
                    quantity: 3,
                },
                AllocationItem {
                    member_id: "M2".into(),
                    quantity: 7,
                },
            ],
            created_at: TimeStamp::now(),
            updated_at: TimeStamp::now(),
        }];

        let lines = member_allocations("M1", "G", &allocations);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);

        assert!(member_allocations("M1", "H", &allocations).is_empty());
        assert!(member_allocations("M3", "G", &allocations).is_empty());
    }
}
