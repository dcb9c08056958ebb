//! # Domain Models
//!
//! Pure catalog types shared by the store-facing crates and the applications, with minimal
//! dependencies (`serde`, `chrono`, `rust_decimal`).
//! Keep it lean: no I/O, networking, or store access, just data and simple helpers.

pub mod catalog;
pub mod config;
pub mod ids;

pub use catalog::*;
pub use ids::*;
