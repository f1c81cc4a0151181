//! Page domain model.
//!
//! # Responsibility
//! - Define the page record shared by the store and the lifecycle service.
//! - Describe sparse page updates without a dynamically typed field map.
//!
//! # Invariants
//! - `id`, `workspace_id`, `created_by_id` and `created_at` never change
//!   after creation.
//! - `archived` hides a page from listings but not from direct lookups.
//! - `parent_page_id = None` marks a root page.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of a page.
pub type PageId = Uuid;
/// Identifier of the workspace (tenant) that owns a page.
pub type WorkspaceId = Uuid;
/// Identity of a requester, as produced by the external session layer.
pub type UserId = Uuid;
/// Identifier of a content block.
pub type BlockId = Uuid;

/// Title stored when a page is created with an empty title.
pub const DEFAULT_PAGE_TITLE: &str = "Untitled";

/// Hierarchical document node scoped to one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub workspace_id: WorkspaceId,
    /// `None` for root pages.
    pub parent_page_id: Option<PageId>,
    pub title: String,
    pub icon: Option<String>,
    pub cover: Option<String>,
    /// Soft-delete marker.
    pub archived: bool,
    pub created_by_id: UserId,
    /// Unix epoch milliseconds. Sole listing order key.
    pub created_at: i64,
    /// Unix epoch milliseconds of the last field update.
    pub updated_at: i64,
}

impl Page {
    /// Creates an active page with a generated id and current timestamps.
    ///
    /// The title is stored as given; defaulting happens in the service.
    pub fn new(
        workspace_id: WorkspaceId,
        created_by_id: UserId,
        parent_page_id: Option<PageId>,
        title: impl Into<String>,
    ) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            parent_page_id,
            title: title.into(),
            icon: None,
            cover: None,
            archived: false,
            created_by_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_page_id.is_none()
    }
}

/// Unit of page content. Only relevant to this crate as a cascade target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub page_id: PageId,
    pub kind: String,
    pub content: String,
    pub created_at: i64,
}

impl Block {
    pub fn new(page_id: PageId, kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id,
            kind: kind.into(),
            content: content.into(),
            created_at: now_epoch_ms(),
        }
    }
}

/// Update instruction for one nullable field.
///
/// Distinguishes "leave untouched" from "set to null", which a plain
/// `Option<T>` cannot express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> FieldPatch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Returns the value a touched field should be written as.
    ///
    /// `None` means the field is not part of the update.
    pub fn as_write(&self) -> Option<Option<&T>> {
        match self {
            Self::Keep => None,
            Self::Clear => Some(None),
            Self::Set(value) => Some(Some(value)),
        }
    }

    /// Applies the patch on top of the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Keep => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    /// `Some(v)` sets, `None` clears. Use `FieldPatch::Keep` to leave a field alone.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        }
    }
}

/// Sparse page update. Only supplied fields are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub icon: FieldPatch<String>,
    pub cover: FieldPatch<String>,
    pub archived: Option<bool>,
    pub parent_page_id: FieldPatch<PageId>,
}

impl PageUpdate {
    /// Returns whether no field was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.icon.is_keep()
            && self.cover.is_keep()
            && self.archived.is_none()
            && self.parent_page_id.is_keep()
    }

    /// Update that only flips the soft-delete marker on.
    pub fn archive() -> Self {
        Self {
            archived: Some(true),
            ..Self::default()
        }
    }

    /// Applies this update to an in-memory page copy.
    pub fn apply_to(&self, page: &mut Page) {
        if let Some(title) = &self.title {
            page.title = title.clone();
        }
        page.icon = self.icon.clone().apply(page.icon.take());
        page.cover = self.cover.clone().apply(page.cover.take());
        if let Some(archived) = self.archived {
            page.archived = archived;
        }
        page.parent_page_id = self.parent_page_id.clone().apply(page.parent_page_id);
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
