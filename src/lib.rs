//! Order-allocation and bundle reconciliation for a group-buying workflow.
//!
//! Administrators allocate product quantities to members, members submit
//! usage evidence (push-cart and self-cold counts plus photo references),
//! and the [`calculator`] works out how many bundles of packaging each
//! member still owes after unbundling credit. [`report`] joins allocations
//! against approved submissions into the two admin views, [`service`] wraps
//! the submission lifecycle over a [`store::RecordStore`].

pub mod calculator;
pub mod error;
pub mod rates;
pub mod report;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
