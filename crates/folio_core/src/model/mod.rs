//! Page-centric domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the page store and services.
//!
//! # Invariants
//! - Every page is identified by a stable `PageId` and owned by exactly one
//!   workspace for its whole lifetime.

pub mod page;
