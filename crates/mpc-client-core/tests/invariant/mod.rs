//! Invariant tests module
//!
//! Guarantees that must hold regardless of timing:
//! - Busy flag coverage
//! - Wallet handle bound to the current key share only
//! - Failures never clear what the session already holds
