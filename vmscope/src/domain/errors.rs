//! Structured error types for vmscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Only offset-table initialization produces errors. Per-call lookups against
//! live VM memory (`find_blob` and friends) report misses as `None`: a PC that
//! resolves to nothing is an expected outcome of reading a mutating target,
//! not an exceptional condition.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmInitError {
    #[error("VM symbol {0} not found (unsupported VM version?)")]
    MissingSymbol(String),

    #[error("exported field offset {symbol} has invalid value {value}")]
    InvalidOffset { symbol: String, value: i32 },

    #[error("VM offset table already initialized")]
    AlreadyInitialized,
}
