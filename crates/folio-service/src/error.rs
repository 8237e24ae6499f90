use folio_ledger::LedgerError;

use crate::store::StoreError;

/// Failures a service operation can surface to the HTTP layer.
#[derive(Debug)]
pub enum ServiceError {
    /// Entry-time ledger invariant violation (malformed numerics, oversell,
    /// insufficient cash). Maps to 422.
    Ledger(LedgerError),
    /// The portfolio reached its trade-event cap. Maps to 403.
    TradeCapExceeded { cap: usize },
    /// The addressed event does not exist in this portfolio's log. Maps to 404.
    EventNotFound,
    /// Store backend failure. Maps to 500.
    Store(StoreError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger(e) => write!(f, "{e}"),
            Self::TradeCapExceeded { cap } => {
                write!(f, "portfolio trade limit reached ({cap} events)")
            }
            Self::EventNotFound => write!(f, "trade event not found"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ledger(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::EventNotFound,
            other => Self::Store(other),
        }
    }
}
