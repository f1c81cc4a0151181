//! Page lifecycle use-case service.
//!
//! # Responsibility
//! - Gate every page operation on workspace membership.
//! - Apply title defaulting and sparse update semantics.
//! - Coordinate hard deletion of a page and the blocks it owns.
//!
//! # Invariants
//! - Authorization runs exactly once per operation and before any store
//!   mutation. Operations addressed by page id load the page first, then
//!   authorize against its workspace, then act.
//! - A page never changes workspace.
//! - A new parent must be an existing page of the same workspace and must
//!   not be the page itself or one of its descendants.
//! - A hard delete that removes no row reports `NotFound`.

use crate::model::page::{
    FieldPatch, Page, PageId, PageUpdate, UserId, WorkspaceId, DEFAULT_PAGE_TITLE,
};
use crate::repo::membership_repo::MembershipRepository;
use crate::repo::page_repo::{PageListQuery, PageRepository, RepoError};
use crate::service::authorization::{AuthorizationError, AuthorizationGate, MembershipCheckError};
use log::{debug, error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PageServiceResult<T> = Result<T, PageServiceError>;

/// Errors from page lifecycle operations.
#[derive(Debug)]
pub enum PageServiceError {
    /// Requester is not a member of the target workspace.
    Unauthorized {
        workspace_id: WorkspaceId,
        requester_id: UserId,
    },
    /// Target page does not exist (or vanished mid-operation).
    NotFound(PageId),
    /// Membership collaborator failed; the request was neither allowed nor denied.
    MembershipCheck(MembershipCheckError),
    /// Requested parent is missing or belongs to another workspace.
    InvalidParent {
        parent_page_id: PageId,
        workspace_id: WorkspaceId,
    },
    /// Reparenting would make the page its own ancestor.
    CycleDetected {
        page_id: PageId,
        parent_page_id: PageId,
    },
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for PageServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized {
                workspace_id,
                requester_id,
            } => write!(
                f,
                "not authorized: {requester_id} is not a member of workspace {workspace_id}"
            ),
            Self::NotFound(id) => write!(f, "page not found: {id}"),
            Self::MembershipCheck(err) => write!(f, "{err}"),
            Self::InvalidParent {
                parent_page_id,
                workspace_id,
            } => write!(
                f,
                "parent page {parent_page_id} does not exist in workspace {workspace_id}"
            ),
            Self::CycleDetected {
                page_id,
                parent_page_id,
            } => write!(
                f,
                "moving page {page_id} under {parent_page_id} would create a cycle"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PageServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MembershipCheck(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PageServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<AuthorizationError> for PageServiceError {
    fn from(value: AuthorizationError) -> Self {
        match value {
            AuthorizationError::Denied {
                workspace_id,
                user_id,
            } => Self::Unauthorized {
                workspace_id,
                requester_id: user_id,
            },
            AuthorizationError::CheckFailed(err) => Self::MembershipCheck(err),
        }
    }
}

/// Page lifecycle service over injected store and membership collaborators.
pub struct PageService<R: PageRepository, M: MembershipRepository> {
    repo: R,
    gate: AuthorizationGate<M>,
}

impl<R: PageRepository, M: MembershipRepository> PageService<R, M> {
    /// Creates a service from a page store and a membership lookup.
    pub fn new(repo: R, membership: M) -> Self {
        Self::with_gate(repo, AuthorizationGate::new(membership))
    }

    pub fn with_gate(repo: R, gate: AuthorizationGate<M>) -> Self {
        Self { repo, gate }
    }

    /// Returns the underlying page store.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns the authorization gate.
    pub fn gate(&self) -> &AuthorizationGate<M> {
        &self.gate
    }

    /// Creates a page in `workspace_id` on behalf of a member.
    ///
    /// An empty `title` is stored as `"Untitled"`.
    pub fn create_page(
        &self,
        workspace_id: WorkspaceId,
        requester_id: UserId,
        parent_page_id: Option<PageId>,
        title: impl Into<String>,
    ) -> PageServiceResult<Page> {
        self.gate.authorize(workspace_id, requester_id)?;
        if let Some(parent_page_id) = parent_page_id {
            self.ensure_parent_in_workspace(parent_page_id, workspace_id)?;
        }

        let mut title = title.into();
        if title.is_empty() {
            title = DEFAULT_PAGE_TITLE.to_string();
        }

        let page = Page::new(workspace_id, requester_id, parent_page_id, title);
        self.repo.insert_page(&page).inspect_err(|err| {
            error!(
                "event=page_create module=page_service status=error workspace_id={workspace_id} error={err}"
            )
        })?;

        info!(
            "event=page_create module=page_service status=ok page_id={} workspace_id={} is_root={}",
            page.id,
            workspace_id,
            page.is_root()
        );
        Ok(page)
    }

    /// Loads a page and checks the requester belongs to its workspace.
    ///
    /// Archived pages are returned like any other page.
    pub fn get_page(&self, page_id: PageId, requester_id: UserId) -> PageServiceResult<Page> {
        let page = self
            .repo
            .get_page(page_id)?
            .ok_or(PageServiceError::NotFound(page_id))?;
        self.gate.authorize(page.workspace_id, requester_id)?;
        Ok(page)
    }

    /// Lists non-archived pages at one tree level, newest first.
    ///
    /// `parent_page_id = None` lists root pages; `Some(id)` lists the
    /// direct children of `id`. An empty listing is not an error.
    pub fn list_pages(
        &self,
        workspace_id: WorkspaceId,
        requester_id: UserId,
        parent_page_id: Option<PageId>,
    ) -> PageServiceResult<Vec<Page>> {
        self.gate.authorize(workspace_id, requester_id)?;
        let query = PageListQuery::active(workspace_id, parent_page_id.into());
        let pages = self.repo.list_pages(&query)?;
        debug!(
            "event=page_list module=page_service status=ok workspace_id={workspace_id} count={}",
            pages.len()
        );
        Ok(pages)
    }

    /// Applies a sparse update and returns the page as re-read from the store.
    ///
    /// An empty update is not an error: it returns the current page without
    /// writing anything.
    pub fn update_page(
        &self,
        page_id: PageId,
        requester_id: UserId,
        update: PageUpdate,
    ) -> PageServiceResult<Page> {
        let page = self.get_page(page_id, requester_id)?;
        if update.is_empty() {
            return Ok(page);
        }

        if let FieldPatch::Set(parent_page_id) = update.parent_page_id {
            self.ensure_parent_in_workspace(parent_page_id, page.workspace_id)?;
            if self.would_create_cycle(page.id, parent_page_id)? {
                return Err(PageServiceError::CycleDetected {
                    page_id: page.id,
                    parent_page_id,
                });
            }
        }

        self.repo
            .update_page_fields(page.id, &update)
            .inspect_err(|err| {
                error!(
                    "event=page_update module=page_service status=error page_id={page_id} error={err}"
                )
            })?;

        let updated = self
            .repo
            .get_page(page.id)?
            .ok_or(PageServiceError::NotFound(page.id))?;
        info!("event=page_update module=page_service status=ok page_id={page_id}");
        Ok(updated)
    }

    /// Hides a page from listings. There is no reverse operation here.
    pub fn archive_page(&self, page_id: PageId, requester_id: UserId) -> PageServiceResult<()> {
        let page = self.get_page(page_id, requester_id)?;
        self.repo
            .update_page_fields(page.id, &PageUpdate::archive())
            .inspect_err(|err| {
                error!(
                    "event=page_archive module=page_service status=error page_id={page_id} error={err}"
                )
            })?;
        info!("event=page_archive module=page_service status=ok page_id={page_id}");
        Ok(())
    }

    /// Permanently deletes a page after deleting every block it owns.
    ///
    /// Fails with `NotFound` when the page disappeared between the
    /// authorization step and the delete.
    pub fn delete_page_hard(&self, page_id: PageId, requester_id: UserId) -> PageServiceResult<()> {
        let page = self.get_page(page_id, requester_id)?;
        let deleted = self.repo.delete_page_cascade(page.id).inspect_err(|err| {
            error!(
                "event=page_delete module=page_service status=error page_id={page_id} error={err}"
            )
        })?;

        if deleted == 0 {
            info!(
                "event=page_delete module=page_service status=not_found page_id={page_id} reason=concurrent_delete"
            );
            return Err(PageServiceError::NotFound(page.id));
        }

        info!("event=page_delete module=page_service status=ok page_id={page_id}");
        Ok(())
    }

    fn ensure_parent_in_workspace(
        &self,
        parent_page_id: PageId,
        workspace_id: WorkspaceId,
    ) -> PageServiceResult<()> {
        match self.repo.get_page(parent_page_id)? {
            Some(parent) if parent.workspace_id == workspace_id => Ok(()),
            _ => Err(PageServiceError::InvalidParent {
                parent_page_id,
                workspace_id,
            }),
        }
    }

    fn would_create_cycle(
        &self,
        page_id: PageId,
        candidate_parent_id: PageId,
    ) -> PageServiceResult<bool> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == page_id || !visited.insert(current) {
                return Ok(true);
            }
            cursor = match self.repo.get_page(current)? {
                Some(ancestor) => ancestor.parent_page_id,
                None => None,
            };
        }
        Ok(false)
    }
}
