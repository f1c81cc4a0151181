//! Page management core for Folio workspaces.
//! This crate is the single source of truth for page lifecycle and
//! workspace authorization invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::page::{
    Block, BlockId, FieldPatch, Page, PageId, PageUpdate, UserId, WorkspaceId, DEFAULT_PAGE_TITLE,
};
pub use repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
pub use repo::memory::{InMemoryMembershipRepository, InMemoryPageRepository};
pub use repo::page_repo::{
    PageListQuery, PageRepository, ParentFilter, RepoError, RepoResult, SqlitePageRepository,
};
pub use service::authorization::{AuthorizationError, AuthorizationGate, MembershipCheckError};
pub use service::page_service::{PageService, PageServiceError, PageServiceResult};

/// Minimal health-check API for embedding smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
