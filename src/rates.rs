//! Bundle-rate table: packaging bundles required per allocated unit
use crate::error::LedgerError;
use crate::types::RateEntry;
use std::collections::BTreeMap;

/// Mapping from product code to its bundle rate. Unknown codes rate at zero,
/// meaning the product needs no bundling.
#[derive(Debug, Default, Clone)]
pub struct RateTable {
    entries: BTreeMap<String, RateEntry>,
}

/// One letter followed by one or more digits, e.g. `A1` or `C12`.
pub fn is_valid_product_code(code: &str) -> bool {
    let mut chars = code.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let mut saw_digit = false;
    for c in chars {
        if !c.is_ascii_digit() {
            return false;
        }
        saw_digit = true;
    }
    saw_digit
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed rates the workflow launched with.
    pub fn seeded() -> Self {
        let mut table = Self::new();
        for code in ["A1", "C2", "C4", "C8", "B15"] {
            table.entries.insert(
                code.to_string(),
                RateEntry {
                    product_code: code.to_string(),
                    rate: 2,
                    description: String::new(),
                },
            );
        }
        for code in ["A4", "B5", "A10", "C12", "B16", "C14", "C7"] {
            table.entries.insert(
                code.to_string(),
                RateEntry {
                    product_code: code.to_string(),
                    rate: 1,
                    description: String::new(),
                },
            );
        }
        table
    }

    pub fn from_entries(entries: impl IntoIterator<Item = RateEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.product_code.clone(), e))
            .collect();
        Self { entries }
    }

    /// Rate lookup, `0` when the product code is unknown.
    pub fn rate_of(&self, product_code: &str) -> u32 {
        self.entries.get(product_code).map(|e| e.rate).unwrap_or(0)
    }

    pub fn get(&self, product_code: &str) -> Option<&RateEntry> {
        self.entries.get(product_code)
    }

    /// Insert a new entry. Duplicate codes are rejected, callers wanting
    /// replace-or-create semantics use [`RateTable::upsert`].
    pub fn insert(
        &mut self,
        product_code: &str,
        rate: u32,
        description: &str,
    ) -> Result<&RateEntry, LedgerError> {
        if !is_valid_product_code(product_code) {
            return Err(LedgerError::InvalidProductCode(product_code.to_string()));
        }
        if self.entries.contains_key(product_code) {
            return Err(LedgerError::DuplicateProductCode(product_code.to_string()));
        }
        let entry = RateEntry {
            product_code: product_code.to_string(),
            rate,
            description: description.to_string(),
        };
        Ok(self
            .entries
            .entry(product_code.to_string())
            .or_insert(entry))
    }

    pub fn upsert(
        &mut self,
        product_code: &str,
        rate: u32,
        description: &str,
    ) -> Result<&RateEntry, LedgerError> {
        if !is_valid_product_code(product_code) {
            return Err(LedgerError::InvalidProductCode(product_code.to_string()));
        }
        let entry = RateEntry {
            product_code: product_code.to_string(),
            rate,
            description: description.to_string(),
        };
        let slot = self.entries.entry(product_code.to_string()).or_insert(entry.clone());
        *slot = entry;
        Ok(slot)
    }

    pub fn remove(&mut self, product_code: &str) -> Result<RateEntry, LedgerError> {
        self.entries
            .remove(product_code)
            .ok_or_else(|| LedgerError::NotFound(product_code.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &RateEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
