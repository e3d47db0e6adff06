//! Newtype wrappers for raw identifiers
//!
//! Prevents mixing up a process ID with any other plain integer in
//! function signatures.

use std::fmt;

/// Process ID of the monitored VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}
