//! Page store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide fetch/insert/sparse-update/delete/list APIs over `pages`.
//! - Delete the `blocks` owned by a page as part of hard deletion.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Only fields present in a `PageUpdate` are written; `updated_at` is
//!   bumped on every non-empty update.
//! - Listing is deterministic: `created_at DESC, id ASC`.
//! - Nothing in this module is authorization-aware.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::page::{now_epoch_ms, Block, BlockId, Page, PageId, PageUpdate, WorkspaceId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PAGE_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    parent_page_id,
    title,
    icon,
    cover,
    archived,
    created_by_id,
    created_at,
    updated_at
FROM pages";

const PAGE_COLUMNS: &[&str] = &[
    "id",
    "workspace_id",
    "parent_page_id",
    "title",
    "icon",
    "cover",
    "archived",
    "created_by_id",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error shared by the page and membership repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target page does not exist.
    NotFound(PageId),
    /// Persisted row cannot be converted into a valid model.
    InvalidData(String),
    /// Non-SQLite backend could not serve the call.
    Unavailable(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "page not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "page repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "page repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "page repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Which level of the page tree a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// Pages without a parent.
    Root,
    /// Direct children of the given page.
    ChildrenOf(PageId),
}

impl From<Option<PageId>> for ParentFilter {
    fn from(value: Option<PageId>) -> Self {
        match value {
            Some(parent) => Self::ChildrenOf(parent),
            None => Self::Root,
        }
    }
}

/// Listing options for one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageListQuery {
    pub workspace_id: WorkspaceId,
    pub parent: ParentFilter,
    pub include_archived: bool,
}

impl PageListQuery {
    /// Active (non-archived) pages at one tree level.
    pub fn active(workspace_id: WorkspaceId, parent: ParentFilter) -> Self {
        Self {
            workspace_id,
            parent,
            include_archived: false,
        }
    }
}

/// Repository interface for page persistence.
pub trait PageRepository {
    /// Persists a new page row.
    fn insert_page(&self, page: &Page) -> RepoResult<PageId>;
    /// Loads one page by id, archived or not.
    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>>;
    /// Writes only the fields present in `update`.
    ///
    /// Returns `NotFound` when no row matched. An empty update is a no-op.
    fn update_page_fields(&self, id: PageId, update: &PageUpdate) -> RepoResult<()>;
    /// Deletes every block owned by the page. Returns deleted block count.
    fn delete_blocks_by_page(&self, page_id: PageId) -> RepoResult<usize>;
    /// Deletes the page row. Returns affected rows (0 or 1).
    fn delete_page(&self, id: PageId) -> RepoResult<usize>;
    /// Lists pages of one workspace level, newest first.
    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>>;

    /// Deletes the page's blocks, then the page. Returns affected page rows.
    ///
    /// Implementations with transactions should make both steps atomic.
    fn delete_page_cascade(&self, id: PageId) -> RepoResult<usize> {
        self.delete_blocks_by_page(id)?;
        self.delete_page(id)
    }
}

/// SQLite-backed page repository.
pub struct SqlitePageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePageRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_page_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts a content block. Block content is opaque to this crate.
    pub fn insert_block(&self, block: &Block) -> RepoResult<BlockId> {
        self.conn.execute(
            "INSERT INTO blocks (id, page_id, kind, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                block.id.to_string(),
                block.page_id.to_string(),
                block.kind.as_str(),
                block.content.as_str(),
                block.created_at,
            ],
        )?;
        Ok(block.id)
    }

    /// Counts blocks owned by one page.
    pub fn count_blocks(&self, page_id: PageId) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM blocks WHERE page_id = ?1;",
            [page_id.to_string()],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative block count `{count}`")))
    }
}

impl PageRepository for SqlitePageRepository<'_> {
    fn insert_page(&self, page: &Page) -> RepoResult<PageId> {
        self.conn.execute(
            "INSERT INTO pages (
                id,
                workspace_id,
                parent_page_id,
                title,
                icon,
                cover,
                archived,
                created_by_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                page.id.to_string(),
                page.workspace_id.to_string(),
                page.parent_page_id.map(|value| value.to_string()),
                page.title.as_str(),
                page.icon.as_deref(),
                page.cover.as_deref(),
                bool_to_int(page.archived),
                page.created_by_id.to_string(),
                page.created_at,
                page.updated_at,
            ],
        )?;
        Ok(page.id)
    }

    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAGE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_page_row(row)?));
        }
        Ok(None)
    }

    fn update_page_fields(&self, id: PageId, update: &PageUpdate) -> RepoResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &update.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(icon) = update.icon.as_write() {
            assignments.push("icon = ?");
            bind_values.push(optional_text(icon.cloned()));
        }
        if let Some(cover) = update.cover.as_write() {
            assignments.push("cover = ?");
            bind_values.push(optional_text(cover.cloned()));
        }
        if let Some(archived) = update.archived {
            assignments.push("archived = ?");
            bind_values.push(Value::Integer(bool_to_int(archived)));
        }
        if let Some(parent) = update.parent_page_id.as_write() {
            assignments.push("parent_page_id = ?");
            bind_values.push(optional_text(parent.map(Uuid::to_string)));
        }
        assignments.push("updated_at = ?");
        bind_values.push(Value::Integer(now_epoch_ms()));
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE pages SET {} WHERE id = ?;", assignments.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_blocks_by_page(&self, page_id: PageId) -> RepoResult<usize> {
        delete_blocks_in(self.conn, page_id)
    }

    fn delete_page(&self, id: PageId) -> RepoResult<usize> {
        delete_page_in(self.conn, id)
    }

    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>> {
        let mut sql = format!("{PAGE_SELECT_SQL} WHERE workspace_id = ?");
        let mut bind_values = vec![Value::Text(query.workspace_id.to_string())];

        if !query.include_archived {
            sql.push_str(" AND archived = 0");
        }
        match query.parent {
            ParentFilter::Root => sql.push_str(" AND parent_page_id IS NULL"),
            ParentFilter::ChildrenOf(parent) => {
                sql.push_str(" AND parent_page_id = ?");
                bind_values.push(Value::Text(parent.to_string()));
            }
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut pages = Vec::new();
        while let Some(row) = rows.next()? {
            pages.push(parse_page_row(row)?);
        }
        Ok(pages)
    }

    fn delete_page_cascade(&self, id: PageId) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_blocks_in(&tx, id)?;
        let deleted = delete_page_in(&tx, id)?;
        tx.commit()?;
        Ok(deleted)
    }
}

fn delete_blocks_in(conn: &Connection, page_id: PageId) -> RepoResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM blocks WHERE page_id = ?1;",
        [page_id.to_string()],
    )?;
    Ok(deleted)
}

fn delete_page_in(conn: &Connection, id: PageId) -> RepoResult<usize> {
    let deleted = conn.execute("DELETE FROM pages WHERE id = ?1;", [id.to_string()])?;
    Ok(deleted)
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<Page> {
    let id_text: String = row.get("id")?;
    let workspace_text: String = row.get("workspace_id")?;
    let creator_text: String = row.get("created_by_id")?;
    let parent_page_id = row
        .get::<_, Option<String>>("parent_page_id")?
        .map(|value| parse_uuid(&value, "pages.parent_page_id"))
        .transpose()?;

    let archived = match row.get::<_, i64>("archived")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid archived value `{other}` in pages.archived"
            )));
        }
    };

    Ok(Page {
        id: parse_uuid(&id_text, "pages.id")?,
        workspace_id: parse_uuid(&workspace_text, "pages.workspace_id")?,
        parent_page_id,
        title: row.get("title")?,
        icon: row.get("icon")?,
        cover: row.get("cover")?,
        archived,
        created_by_id: parse_uuid(&creator_text, "pages.created_by_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_page_connection_ready(conn: &Connection) -> RepoResult<()> {
    ensure_schema_version(conn)?;
    ensure_table_columns(conn, "pages", PAGE_COLUMNS)?;
    ensure_table_columns(conn, "blocks", &["id", "page_id"])
}

pub(crate) fn ensure_schema_version(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn ensure_table_columns(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let existing = table_columns(conn, table)?;
    if existing.is_empty() {
        return Err(RepoError::MissingRequiredTable(table));
    }
    for &column in columns {
        if !existing.iter().any(|current| current.as_str() == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
