//! Fuzz tests module
//!
//! Property-based testing using proptest.

pub mod halving_fuzz;
