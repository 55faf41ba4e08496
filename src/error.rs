use thiserror::Error;

/// Failures reported by the ledger for read or mutating calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("sequence number {0} was already used by this account")]
    DuplicateSequence(u64),
    #[error("the ledger's pending request pool is full")]
    CapacityExceeded,
    #[error("insufficient funds in the signing account")]
    InsufficientFunds,
    #[error("ledger rejected the call: {0}")]
    Rejected(String),
    #[error("ledger connection failed: {0}")]
    Connection(String),
}

/// Failures raised at the transaction sequencer boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("another request is already in flight")]
    Busy,
    #[error("no account is connected")]
    NoAccount,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A read batch failed part-way; the previous snapshot stays authoritative.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("refresh failed: {0}")]
pub struct FetchError(#[from] pub GatewayError);

/// Fatal initialization failures. No automatic recovery is attempted.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no wallet account is available")]
    NoAccount,
    #[error("wrong network: expected chain {expected}, connected to chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("failed to reach the ledger: {0}")]
    Ledger(#[from] GatewayError),
}
