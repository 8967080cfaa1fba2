//! Record store: the persistence seam consumed by the service layer.
//!
//! [`RecordStore`] is the injected repository abstraction; [`SledStore`] is
//! the embedded implementation, one tree per entity kind with values encoded
//! as CBOR. Every sled failure surfaces as
//! [`LedgerError::StoreUnavailable`] instead of hanging the caller.
use crate::error::LedgerError;
use crate::types::{
    Allocation, AllocationItem, RateEntry, Submission, SubmissionDraft, SubmissionStatus,
    TimeStamp,
};
use crate::utils;
use sled::{Batch, Db, Tree};
use std::sync::Arc;
use tracing::{debug, info};

const ALLOCATIONS_TREE: &str = "allocations";
const SUBMISSIONS_TREE: &str = "submissions";
const RATES_TREE: &str = "rates";

/// Persistence operations the core consumes. Implementations own the records
/// exclusively; callers only ever see decoded snapshots.
pub trait RecordStore {
    fn list_allocations(&self) -> Result<Vec<Allocation>, LedgerError>;
    fn create_allocation(
        &self,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> Result<Allocation, LedgerError>;
    fn update_allocation(
        &self,
        id: &str,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> Result<bool, LedgerError>;
    fn delete_allocation(&self, id: &str) -> Result<bool, LedgerError>;

    fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, LedgerError>;
    fn get_submission(&self, id: &str) -> Result<Option<Submission>, LedgerError>;
    fn create_submission(&self, draft: SubmissionDraft) -> Result<Submission, LedgerError>;
    /// Demote every active submission for (member, group) to historical,
    /// returning how many records changed. All demotions apply atomically.
    fn mark_submissions_historical(
        &self,
        member_id: &str,
        group: &str,
    ) -> Result<usize, LedgerError>;
    fn set_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
    ) -> Result<bool, LedgerError>;
    fn delete_submission(&self, id: &str) -> Result<bool, LedgerError>;

    fn list_rates(&self) -> Result<Vec<RateEntry>, LedgerError>;
    fn upsert_rate(&self, entry: RateEntry) -> Result<RateEntry, LedgerError>;
    fn delete_rate(&self, product_code: &str) -> Result<bool, LedgerError>;

    /// Wipe allocations and submissions. Rates survive, they are
    /// configuration rather than round data.
    fn clear_all(&self) -> Result<(), LedgerError>;
}

fn store_err(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::StoreUnavailable(err.to_string())
}

fn encode<T>(value: &T) -> Result<Vec<u8>, LedgerError>
where
    T: minicbor::Encode<()>,
{
    minicbor::to_vec(value).map_err(store_err)
}

fn decode<T>(bytes: &[u8]) -> Result<T, LedgerError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    minicbor::decode(bytes).map_err(store_err)
}

/// Embedded record store over a shared sled instance.
pub struct SledStore {
    allocations: Tree,
    submissions: Tree,
    rates: Tree,
}

impl SledStore {
    /// Open the entity trees. An empty rates tree is seeded with the launch
    /// rate table so a fresh database computes the same bundles as the old
    /// deployment did.
    pub fn open(db: Arc<Db>) -> Result<Self, LedgerError> {
        let store = Self {
            allocations: db.open_tree(ALLOCATIONS_TREE).map_err(store_err)?,
            submissions: db.open_tree(SUBMISSIONS_TREE).map_err(store_err)?,
            rates: db.open_tree(RATES_TREE).map_err(store_err)?,
        };

        if store.rates.is_empty() {
            let seeded = crate::rates::RateTable::seeded();
            for entry in seeded.entries() {
                store.upsert_rate(entry.clone())?;
            }
            info!(entries = seeded.len(), "seeded default rate table");
        }

        Ok(store)
    }

    fn decode_all<T>(tree: &Tree) -> Result<Vec<T>, LedgerError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        let mut records = Vec::new();
        for item in tree.iter() {
            let (_, value) = item.map_err(store_err)?;
            records.push(decode(&value)?);
        }
        Ok(records)
    }
}

impl RecordStore for SledStore {
    fn list_allocations(&self) -> Result<Vec<Allocation>, LedgerError> {
        let mut allocations: Vec<Allocation> = Self::decode_all(&self.allocations)?;
        // newest first, matching the admin listing
        allocations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(allocations)
    }

    fn create_allocation(
        &self,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> Result<Allocation, LedgerError> {
        let id = utils::new_allocation_id().map_err(store_err)?;
        let now = TimeStamp::now();
        let allocation = Allocation {
            id: id.clone(),
            group: group.to_string(),
            product_code: product_code.to_string(),
            items,
            created_at: now.clone(),
            updated_at: now,
        };

        self.allocations
            .insert(id.as_bytes(), encode(&allocation)?)
            .map_err(store_err)?;
        debug!(%id, group, product_code, "allocation created");
        Ok(allocation)
    }

    fn update_allocation(
        &self,
        id: &str,
        group: &str,
        product_code: &str,
        items: Vec<AllocationItem>,
    ) -> Result<bool, LedgerError> {
        let Some(existing) = self.allocations.get(id.as_bytes()).map_err(store_err)? else {
            return Ok(false);
        };
        let mut allocation: Allocation = decode(&existing)?;

        allocation.group = group.to_string();
        allocation.product_code = product_code.to_string();
        allocation.items = items;
        allocation.updated_at = TimeStamp::now();

        self.allocations
            .insert(id.as_bytes(), encode(&allocation)?)
            .map_err(store_err)?;
        debug!(%id, "allocation updated");
        Ok(true)
    }

    fn delete_allocation(&self, id: &str) -> Result<bool, LedgerError> {
        let removed = self
            .allocations
            .remove(id.as_bytes())
            .map_err(store_err)?
            .is_some();
        if removed {
            debug!(%id, "allocation deleted");
        }
        Ok(removed)
    }

    fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, LedgerError> {
        let mut submissions: Vec<Submission> = Self::decode_all(&self.submissions)?;
        if let Some(status) = status {
            submissions.retain(|s| s.status == status);
        }
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(submissions)
    }

    fn get_submission(&self, id: &str) -> Result<Option<Submission>, LedgerError> {
        match self.submissions.get(id.as_bytes()).map_err(store_err)? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn create_submission(&self, draft: SubmissionDraft) -> Result<Submission, LedgerError> {
        let id = utils::new_submission_id().map_err(store_err)?;
        let submission = Submission {
            id: id.clone(),
            member_id: draft.member_id,
            group: draft.group,
            push_type: draft.push_type,
            push_details: draft.push_details,
            self_cold_details: draft.self_cold_details,
            push_images: draft.push_images,
            self_cold_images: draft.self_cold_images,
            status: SubmissionStatus::Pending,
            created_at: TimeStamp::now(),
        };

        self.submissions
            .insert(id.as_bytes(), encode(&submission)?)
            .map_err(store_err)?;
        debug!(%id, member = %submission.member_id, group = %submission.group, "submission created");
        Ok(submission)
    }

    fn mark_submissions_historical(
        &self,
        member_id: &str,
        group: &str,
    ) -> Result<usize, LedgerError> {
        let mut batch = Batch::default();
        let mut count = 0;

        for item in self.submissions.iter() {
            let (key, value) = item.map_err(store_err)?;
            let mut submission: Submission = decode(&value)?;
            if submission.member_id == member_id
                && submission.group == group
                && submission.status.is_active()
            {
                submission.status = SubmissionStatus::Historical;
                batch.insert(key, encode(&submission)?);
                count += 1;
            }
        }

        if count > 0 {
            self.submissions.apply_batch(batch).map_err(store_err)?;
            debug!(member_id, group, count, "demoted active submissions to historical");
        }
        Ok(count)
    }

    fn set_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
    ) -> Result<bool, LedgerError> {
        let Some(value) = self.submissions.get(id.as_bytes()).map_err(store_err)? else {
            return Ok(false);
        };
        let mut submission: Submission = decode(&value)?;
        submission.status = status;

        self.submissions
            .insert(id.as_bytes(), encode(&submission)?)
            .map_err(store_err)?;
        debug!(%id, status = status.wire_label(), "submission status set");
        Ok(true)
    }

    fn delete_submission(&self, id: &str) -> Result<bool, LedgerError> {
        let removed = self
            .submissions
            .remove(id.as_bytes())
            .map_err(store_err)?
            .is_some();
        if removed {
            debug!(%id, "submission deleted");
        }
        Ok(removed)
    }

    fn list_rates(&self) -> Result<Vec<RateEntry>, LedgerError> {
        Self::decode_all(&self.rates)
    }

    fn upsert_rate(&self, entry: RateEntry) -> Result<RateEntry, LedgerError> {
        self.rates
            .insert(entry.product_code.as_bytes(), encode(&entry)?)
            .map_err(store_err)?;
        Ok(entry)
    }

    fn delete_rate(&self, product_code: &str) -> Result<bool, LedgerError> {
        Ok(self
            .rates
            .remove(product_code.as_bytes())
            .map_err(store_err)?
            .is_some())
    }

    fn clear_all(&self) -> Result<(), LedgerError> {
        self.allocations.clear().map_err(store_err)?;
        self.submissions.clear().map_err(store_err)?;
        info!("allocations and submissions cleared");
        Ok(())
    }
}
