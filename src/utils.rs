//! Record id minting

use bech32::Bech32m;
use uuid7::uuid7;

/// Human-readable prefix for allocation record ids.
pub const ALLOC_HRP: &str = "alloc_";
/// Human-readable prefix for submission record ids.
pub const SUB_HRP: &str = "sub_";

// construct a unique record id then encode using bech32
pub fn new_record_id(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_allocation_id() -> anyhow::Result<String> {
    new_record_id(ALLOC_HRP)
}

pub fn new_submission_id() -> anyhow::Result<String> {
    new_record_id(SUB_HRP)
}
