//! Service layer API for the allocation and reconciliation workflow
use crate::error::LedgerError;
use crate::rates::RateTable;
use crate::report::{self, BundleTableRow, SummaryRow};
use crate::store::RecordStore;
use crate::types::{Allocation, AllocationItem, RateEntry, Submission, SubmissionDraft, SubmissionStatus};
use anyhow::Context;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Exact phrase the destructive wipe requires, kept verbatim from the
/// original admin console.
pub const CLEAR_CONFIRM_TEXT: &str = "我确定清空";

pub struct LedgerService<S> {
    store: S,
    // Serializes the demote-then-insert of submit, and approvals, so the
    // "one active submission per (member, group)" invariant never
    // transiently breaks between two store calls.
    submit_lock: Mutex<()>,
}

impl<S: RecordStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock_submissions(&self) -> std::sync::MutexGuard<'_, ()> {
        self.submit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a member's usage evidence for a group.
    ///
    /// Any prior pending or approved submission for the same (member, group)
    /// is demoted to historical first; the new record always enters as
    /// pending. If the insert fails after the demotion, the member is left
    /// with zero active submissions, never two, and the error is surfaced.
    pub fn submit_usage(&self, draft: SubmissionDraft) -> anyhow::Result<Submission> {
        draft.validate()?;

        let _guard = self.lock_submissions();

        let demoted = self
            .store
            .mark_submissions_historical(&draft.member_id, &draft.group)?;

        let submission = self.store.create_submission(draft).context(
            "submission insert failed after demotion; member has no active submission for this group",
        )?;

        info!(
            id = %submission.id,
            member = %submission.member_id,
            group = %submission.group,
            demoted,
            "submission recorded, awaiting review"
        );
        Ok(submission)
    }

    /// Approve a pending submission. Approving anything but a pending record
    /// is refused: a missing id is `NotFound`, an already-approved or
    /// historical one is `ConcurrentModification`.
    pub fn approve_submission(&self, id: &str) -> anyhow::Result<Submission> {
        let _guard = self.lock_submissions();

        let submission = self
            .store
            .get_submission(id)?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if submission.status != SubmissionStatus::Pending {
            return Err(LedgerError::ConcurrentModification(format!(
                "submission {id} is {}, only pending submissions can be approved",
                submission.status.wire_label()
            ))
            .into());
        }

        if !self
            .store
            .set_submission_status(id, SubmissionStatus::Approved)?
        {
            return Err(LedgerError::NotFound(id.to_string()).into());
        }

        info!(%id, member = %submission.member_id, "submission approved");
        Ok(Submission {
            status: SubmissionStatus::Approved,
            ..submission
        })
    }

    /// Reject a submission by deleting it outright. Only meaningful while
    /// pending, but deletion of any existing record is honored.
    pub fn reject_submission(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.lock_submissions();

        if !self.store.delete_submission(id)? {
            return Err(LedgerError::NotFound(id.to_string()).into());
        }
        info!(%id, "submission rejected and removed");
        Ok(())
    }

    pub fn pending_submissions(&self) -> anyhow::Result<Vec<Submission>> {
        Ok(self
            .store
            .list_submissions(Some(SubmissionStatus::Pending))?)
    }

    pub fn approved_submissions(&self) -> anyhow::Result<Vec<Submission>> {
        Ok(self
            .store
            .list_submissions(Some(SubmissionStatus::Approved))?)
    }

    pub fn allocations(&self) -> anyhow::Result<Vec<Allocation>> {
        Ok(self.store.list_allocations()?)
    }

    pub fn create_allocation(
        &self,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> anyhow::Result<Allocation> {
        Ok(self.store.create_allocation(group, product_code, items)?)
    }

    pub fn update_allocation(
        &self,
        id: &str,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> anyhow::Result<()> {
        if !self
            .store
            .update_allocation(id, group, product_code, items)?
        {
            return Err(LedgerError::NotFound(id.to_string()).into());
        }
        Ok(())
    }

    pub fn delete_allocation(&self, id: &str) -> anyhow::Result<()> {
        if !self.store.delete_allocation(id)? {
            return Err(LedgerError::NotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Snapshot of the persisted rate table.
    pub fn rate_table(&self) -> anyhow::Result<RateTable> {
        Ok(RateTable::from_entries(self.store.list_rates()?))
    }

    /// Add a brand-new rate. Malformed codes and duplicates are rejected
    /// before the store is touched.
    pub fn add_rate(&self, product_code: &str, rate: u32, description: &str) -> anyhow::Result<RateEntry> {
        let mut table = self.rate_table()?;
        let entry = table.insert(product_code, rate, description)?.clone();
        Ok(self.store.upsert_rate(entry)?)
    }

    /// Create-or-replace a rate.
    pub fn update_rate(&self, product_code: &str, rate: u32, description: &str) -> anyhow::Result<RateEntry> {
        let mut table = self.rate_table()?;
        let entry = table.upsert(product_code, rate, description)?.clone();
        Ok(self.store.upsert_rate(entry)?)
    }

    pub fn remove_rate(&self, product_code: &str) -> anyhow::Result<()> {
        if !self.store.delete_rate(product_code)? {
            return Err(LedgerError::NotFound(product_code.to_string()).into());
        }
        Ok(())
    }

    /// Per-member summary over all approved submissions, recomputed on call.
    pub fn summary(&self) -> anyhow::Result<Vec<SummaryRow>> {
        let allocations = self.store.list_allocations()?;
        let approved = self.approved_submissions()?;
        let rates = self.rate_table()?;
        Ok(report::summary(&allocations, &approved, &rates))
    }

    /// Per-allocation-line bundle table, recomputed on call.
    pub fn bundle_table(&self) -> anyhow::Result<Vec<BundleTableRow>> {
        let allocations = self.store.list_allocations()?;
        let approved = self.approved_submissions()?;
        let rates = self.rate_table()?;
        Ok(report::bundle_table(&allocations, &approved, &rates))
    }

    /// Wipe all round data. Requires the operator to type the exact confirm
    /// phrase; anything else is rejected before any record is touched.
    pub fn clear_database(&self, confirm_text: &str) -> anyhow::Result<()> {
        if confirm_text != CLEAR_CONFIRM_TEXT {
            return Err(LedgerError::InvalidConfirmText.into());
        }
        let _guard = self.lock_submissions();
        self.store.clear_all()?;
        info!("database cleared by admin request");
        Ok(())
    }
}
