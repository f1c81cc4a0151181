//! Core use-case services.
//!
//! # Responsibility
//! - Enforce workspace authorization above the repository layer.
//! - Orchestrate repository calls into page lifecycle operations.

pub mod authorization;
pub mod page_service;
