//! In-memory page store and membership lookup.
//!
//! Used to run the lifecycle service without SQLite, mainly in tests.
//! Both types are `Sync` and can back a service shared across threads.

use crate::model::page::{
    now_epoch_ms, Block, BlockId, Page, PageId, PageUpdate, UserId, WorkspaceId,
};
use crate::repo::membership_repo::MembershipRepository;
use crate::repo::page_repo::{PageListQuery, PageRepository, ParentFilter, RepoError, RepoResult};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    pages: HashMap<PageId, Page>,
    blocks: HashMap<BlockId, Block>,
}

/// Page repository backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryPageRepository {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    mutations: AtomicUsize,
}

impl InMemoryPageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `RepoError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful write calls served so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn insert_block(&self, block: Block) -> RepoResult<BlockId> {
        let mut state = self.lock()?;
        let id = block.id;
        state.blocks.insert(id, block);
        Ok(id)
    }

    pub fn count_blocks(&self, page_id: PageId) -> RepoResult<usize> {
        let state = self.lock()?;
        Ok(state
            .blocks
            .values()
            .filter(|block| block.page_id == page_id)
            .count())
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("in-memory store switched off".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| RepoError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

impl PageRepository for InMemoryPageRepository {
    fn insert_page(&self, page: &Page) -> RepoResult<PageId> {
        let mut state = self.lock()?;
        if state.pages.contains_key(&page.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate page id `{}`",
                page.id
            )));
        }
        state.pages.insert(page.id, page.clone());
        self.record_mutation();
        Ok(page.id)
    }

    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>> {
        let state = self.lock()?;
        Ok(state.pages.get(&id).cloned())
    }

    fn update_page_fields(&self, id: PageId, update: &PageUpdate) -> RepoResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let mut state = self.lock()?;
        let page = state.pages.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        update.apply_to(page);
        page.updated_at = now_epoch_ms();
        self.record_mutation();
        Ok(())
    }

    fn delete_blocks_by_page(&self, page_id: PageId) -> RepoResult<usize> {
        let mut state = self.lock()?;
        let before = state.blocks.len();
        state.blocks.retain(|_, block| block.page_id != page_id);
        self.record_mutation();
        Ok(before - state.blocks.len())
    }

    fn delete_page(&self, id: PageId) -> RepoResult<usize> {
        let mut state = self.lock()?;
        let removed = state.pages.remove(&id).map_or(0, |_| 1);
        self.record_mutation();
        Ok(removed)
    }

    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>> {
        let state = self.lock()?;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|page| page.workspace_id == query.workspace_id)
            .filter(|page| query.include_archived || !page.archived)
            .filter(|page| match query.parent {
                ParentFilter::Root => page.parent_page_id.is_none(),
                ParentFilter::ChildrenOf(parent) => page.parent_page_id == Some(parent),
            })
            .cloned()
            .collect();
        pages.sort_by_key(|page| (Reverse(page.created_at), page.id));
        Ok(pages)
    }

    fn delete_page_cascade(&self, id: PageId) -> RepoResult<usize> {
        let mut state = self.lock()?;
        state.blocks.retain(|_, block| block.page_id != id);
        let removed = state.pages.remove(&id).map_or(0, |_| 1);
        self.record_mutation();
        Ok(removed)
    }
}

/// Membership lookup backed by a set of `(workspace, user)` pairs.
#[derive(Debug, Default)]
pub struct InMemoryMembershipRepository {
    members: Mutex<HashSet<(WorkspaceId, UserId)>>,
    unavailable: AtomicBool,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a lookup pre-seeded with the given memberships.
    pub fn with_members(members: impl IntoIterator<Item = (WorkspaceId, UserId)>) -> Self {
        Self {
            members: Mutex::new(members.into_iter().collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn grant(&self, workspace_id: WorkspaceId, user_id: UserId) {
        if let Ok(mut members) = self.members.lock() {
            members.insert((workspace_id, user_id));
        }
    }

    pub fn revoke(&self, workspace_id: WorkspaceId, user_id: UserId) {
        if let Ok(mut members) = self.members.lock() {
            members.remove(&(workspace_id, user_id));
        }
    }

    /// Makes every subsequent check fail instead of answering.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl MembershipRepository for InMemoryMembershipRepository {
    fn is_member(&self, workspace_id: WorkspaceId, user_id: UserId) -> RepoResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable(
                "membership directory switched off".to_string(),
            ));
        }
        let members = self
            .members
            .lock()
            .map_err(|_| RepoError::Unavailable("membership lock poisoned".to_string()))?;
        Ok(members.contains(&(workspace_id, user_id)))
    }
}
