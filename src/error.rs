#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("invalid product code {0:?}, expected one letter followed by digits")]
    InvalidProductCode(String),
    #[error("invalid quantity {0}, must be non-negative")]
    InvalidQuantity(i64),
    #[error("too many images: {0}, at most 10 per side")]
    TooManyImages(usize),
    #[error("confirm text did not match, database left untouched")]
    InvalidConfirmText,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("duplicate product code: {0}")]
    DuplicateProductCode(String),
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl LedgerError {
    /// Stable machine-readable kind for API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidProductCode(_) => "invalid_product_code",
            LedgerError::InvalidQuantity(_) => "invalid_quantity",
            LedgerError::TooManyImages(_) => "too_many_images",
            LedgerError::InvalidConfirmText => "invalid_confirm_text",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::DuplicateProductCode(_) => "duplicate_product_code",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
            LedgerError::ConcurrentModification(_) => "concurrent_modification",
        }
    }
}
