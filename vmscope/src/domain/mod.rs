//! Domain model for vmscope
//!
//! Core domain types and errors:
//! - Compile-time safety via newtype pattern
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::Pid;

pub use errors::VmInitError;
