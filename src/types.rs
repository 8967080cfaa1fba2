//! Core ledger records: allocations, submissions and their enums
use crate::error::LedgerError;
use chrono::{DateTime, TimeZone, Utc};

/// Upper bound on evidence photos per side, matching the intake form.
pub const MAX_IMAGES_PER_SIDE: usize = 10;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone + Eq> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone + Eq> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Whether the member used the shared push-cart for this round.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PushType {
    #[n(0)]
    #[default]
    Pushed,
    #[n(1)]
    NotPushed,
}

impl PushType {
    /// Label used by the legacy wire format and the report views.
    pub fn wire_label(&self) -> &'static str {
        match self {
            PushType::Pushed => "推了",
            PushType::NotPushed => "没推",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Historical,
}

impl SubmissionStatus {
    pub fn wire_label(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "待审核",
            SubmissionStatus::Approved => "已通过",
            SubmissionStatus::Historical => "历史",
        }
    }

    /// A submission still counting towards the one-per-(member, group) rule.
    pub fn is_active(&self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Approved)
    }
}

/// One member's share of an allocation record.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct AllocationItem {
    #[n(0)]
    pub member_id: String,
    #[n(1)]
    pub quantity: u32,
}

impl AllocationItem {
    /// Build an item from untrusted intake numbers, rejecting negatives.
    pub fn parse(member_id: impl Into<String>, quantity: i64) -> Result<Self, LedgerError> {
        let quantity = u32::try_from(quantity).map_err(|_| LedgerError::InvalidQuantity(quantity))?;
        Ok(Self {
            member_id: member_id.into(),
            quantity,
        })
    }
}

/// A quantity of one product granted to a set of members within a group.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub group: String,
    #[n(2)]
    pub product_code: String,
    #[n(3)]
    pub items: Vec<AllocationItem>,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
    #[n(5)]
    pub updated_at: TimeStamp<Utc>,
}

/// One `code:quantity` line of usage evidence (push-cart or self-cold).
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct DetailLine {
    #[n(0)]
    pub product_code: String,
    #[n(1)]
    pub quantity: u32,
}

impl DetailLine {
    pub fn new(product_code: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
        }
    }

    /// Build a line from untrusted intake numbers, rejecting negatives.
    pub fn parse(product_code: impl Into<String>, quantity: i64) -> Result<Self, LedgerError> {
        let quantity = u32::try_from(quantity).map_err(|_| LedgerError::InvalidQuantity(quantity))?;
        Ok(Self::new(product_code, quantity))
    }
}

/// A member's self-reported usage for one group, at a point in time.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub member_id: String,
    #[n(2)]
    pub group: String,
    #[n(3)]
    pub push_type: PushType,
    #[n(4)]
    pub push_details: Vec<DetailLine>,
    #[n(5)]
    pub self_cold_details: Vec<DetailLine>,
    #[n(6)]
    pub push_images: Vec<String>,
    #[n(7)]
    pub self_cold_images: Vec<String>,
    #[n(8)]
    pub status: SubmissionStatus,
    #[n(9)]
    pub created_at: TimeStamp<Utc>,
}

// Used for constructing a submission before the store assigns id and status.
#[derive(Debug, Default, Clone)]
pub struct SubmissionDraft {
    pub member_id: String,
    pub group: String,
    pub push_type: PushType,
    pub push_details: Vec<DetailLine>,
    pub self_cold_details: Vec<DetailLine>,
    pub push_images: Vec<String>,
    pub self_cold_images: Vec<String>,
}

impl SubmissionDraft {
    pub fn new(member_id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            group: group.into(),
            ..Self::default()
        }
    }
    pub fn set_push_type(mut self, push_type: PushType) -> Self {
        self.push_type = push_type;
        self
    }
    pub fn add_push_line(mut self, line: DetailLine) -> Self {
        self.push_details.push(line);
        self
    }
    pub fn add_cold_line(mut self, line: DetailLine) -> Self {
        self.self_cold_details.push(line);
        self
    }
    pub fn add_push_image(mut self, reference: impl Into<String>) -> Self {
        self.push_images.push(reference.into());
        self
    }
    pub fn add_cold_image(mut self, reference: impl Into<String>) -> Self {
        self.self_cold_images.push(reference.into());
        self
    }

    /// Checks fields before anything touches the store.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let most = self.push_images.len().max(self.self_cold_images.len());
        if most > MAX_IMAGES_PER_SIDE {
            return Err(LedgerError::TooManyImages(most));
        }
        Ok(())
    }
}

/// One rate-table row: bundles of packaging per allocated unit.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RateEntry {
    #[n(0)]
    pub product_code: String,
    #[n(1)]
    pub rate: u32,
    #[n(2)]
    pub description: String,
}
