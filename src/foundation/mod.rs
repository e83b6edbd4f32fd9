//! Types and helpers shared by every module.

/// Timestamps and small shared value types.
pub mod core;
/// Crate error type.
pub mod error;
/// Fixed-point pixel arithmetic.
pub(crate) mod math;
