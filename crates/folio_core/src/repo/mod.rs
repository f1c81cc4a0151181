//! Persistence abstractions and implementations.
//!
//! # Responsibility
//! - Define the page store and membership lookup contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never check authorization; the service layer does.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod membership_repo;
pub mod memory;
pub mod page_repo;
