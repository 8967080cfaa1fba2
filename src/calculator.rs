//! Bundle accounting: how many bundles of packaging a member owes after
//! partial unbundling credit.
//!
//! The rules, fixed business policy rather than anything configurable:
//! every allocated unit requires `rate` bundles; a member who did not push
//! the shared cart pays one extra bundle per unit on any product that
//! bundles at all; every two raw sheets of push-cart or self-cold evidence
//! release one bundle, never more than were owed in the first place.
use crate::rates::RateTable;
use crate::types::{Allocation, DetailLine, PushType, Submission};
use tracing::debug;

/// One allocation line attributed to a member, as the calculator saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedLine {
    pub product_code: String,
    pub quantity: u32,
    pub group: String,
}

/// Result of the per-member bundle computation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BundleResult {
    pub allocations: Vec<AllocatedLine>,
    pub total_original: u64,
    pub total_release: u64,
    pub final_bundles: u64,
}

/// Base rate plus the not-pushed penalty. Products that bundle at zero have
/// no rate to penalize and stay at zero.
pub fn effective_rate(base_rate: u32, push_type: PushType) -> u32 {
    if push_type == PushType::NotPushed && base_rate > 0 {
        base_rate + 1
    } else {
        base_rate
    }
}

/// Sum of quantities across detail lines.
pub fn detail_total(details: &[DetailLine]) -> u64 {
    details.iter().map(|d| u64::from(d.quantity)).sum()
}

/// Two raw sheets free one bundle.
pub fn theoretical_release(total_push: u64, total_cold: u64) -> u64 {
    (total_push + total_cold) / 2
}

/// Every allocation line granted to `member_id` within `group`, in
/// allocation iteration order. The same member/product pair may appear in
/// several allocation records; each occurrence yields its own line so that
/// totals sum rather than overwrite.
pub fn member_allocations(
    member_id: &str,
    group: &str,
    allocations: &[Allocation],
) -> Vec<AllocatedLine> {
    let mut lines = Vec::new();
    for alloc in allocations {
        if alloc.group != group {
            continue;
        }
        for item in &alloc.items {
            if item.member_id == member_id {
                lines.push(AllocatedLine {
                    product_code: alloc.product_code.clone(),
                    quantity: item.quantity,
                    group: alloc.group.clone(),
                });
            }
        }
    }
    lines
}

/// Compute a member's original, released and final bundle counts from their
/// submission against the full allocation set.
///
/// Pure and deterministic; a member with no allocation lines in the group
/// gets the all-zero result, which is the valid "not yet allocated" outcome
/// and not an error.
pub fn calculate_final_bundles(
    submission: &Submission,
    allocations: &[Allocation],
    rates: &RateTable,
) -> BundleResult {
    debug!(
        member = %submission.member_id,
        group = %submission.group,
        push_type = submission.push_type.wire_label(),
        "computing final bundles"
    );

    let member_lines = member_allocations(&submission.member_id, &submission.group, allocations);

    if member_lines.is_empty() {
        debug!(member = %submission.member_id, "no allocation lines in this group");
        return BundleResult::default();
    }

    let mut total_original: u64 = 0;
    for line in &member_lines {
        let rate = rates.rate_of(&line.product_code);
        let actual_rate = effective_rate(rate, submission.push_type);
        let need_bundles = u64::from(line.quantity) * u64::from(actual_rate);
        total_original += need_bundles;
        debug!(
            product = %line.product_code,
            quantity = line.quantity,
            rate,
            actual_rate,
            need_bundles,
            "allocation line"
        );
    }

    let total_push = detail_total(&submission.push_details);
    let total_cold = detail_total(&submission.self_cold_details);

    let theoretical = theoretical_release(total_push, total_cold);
    // release can never exceed what was originally required
    let total_release = theoretical.min(total_original);
    let final_bundles = total_original - total_release;

    debug!(
        total_push,
        total_cold,
        theoretical,
        total_original,
        total_release,
        final_bundles,
        "bundle computation complete"
    );

    BundleResult {
        allocations: member_lines,
        total_original,
        total_release,
        final_bundles,
    }
}
