//! Workspace membership lookups.
//!
//! Membership storage belongs to the workspace subsystem; this module only
//! answers "is this user a member of this workspace" for the page core.

use crate::model::page::{UserId, WorkspaceId};
use crate::repo::page_repo::{ensure_schema_version, ensure_table_columns, RepoResult};
use rusqlite::{params, Connection};

/// Read-only membership collaborator consumed by the authorization gate.
pub trait MembershipRepository {
    /// Returns whether `user_id` belongs to `workspace_id`.
    fn is_member(&self, workspace_id: WorkspaceId, user_id: UserId) -> RepoResult<bool>;
}

/// SQLite-backed membership lookup over `workspace_members`.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_version(conn)?;
        ensure_table_columns(conn, "workspace_members", &["workspace_id", "user_id"])?;
        Ok(Self { conn })
    }

    /// Adds a membership row. Granting twice is a no-op.
    ///
    /// Used by seeding and tooling; the page core never writes memberships.
    pub fn grant(&self, workspace_id: WorkspaceId, user_id: UserId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO workspace_members (workspace_id, user_id)
             VALUES (?1, ?2);",
            params![workspace_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Removes a membership row if present.
    pub fn revoke(&self, workspace_id: WorkspaceId, user_id: UserId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2;",
            params![workspace_id.to_string(), user_id.to_string()],
        )?;
        Ok(())
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn is_member(&self, workspace_id: WorkspaceId, user_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM workspace_members
                WHERE workspace_id = ?1 AND user_id = ?2
            );",
            params![workspace_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
