use folio_core::db::open_db;
use folio_core::{
    Block, InMemoryMembershipRepository, InMemoryPageRepository, Page, PageId, PageListQuery,
    PageRepository, PageService, PageServiceError, PageUpdate, RepoResult,
    SqliteMembershipRepository, SqlitePageRepository,
};
use std::path::Path;
use std::sync::Barrier;
use uuid::Uuid;

fn memory_service(
    workspace: Uuid,
    member: Uuid,
) -> PageService<InMemoryPageRepository, InMemoryMembershipRepository> {
    PageService::new(
        InMemoryPageRepository::new(),
        InMemoryMembershipRepository::with_members([(workspace, member)]),
    )
}

#[test]
fn concurrent_hard_deletes_on_shared_store_succeed_exactly_once() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = memory_service(workspace, member);
    let page = service.create_page(workspace, member, None, "Shared").unwrap();
    for _ in 0..4 {
        service
            .repo()
            .insert_block(Block::new(page.id, "paragraph", "text"))
            .unwrap();
    }

    let barrier = Barrier::new(2);
    let outcomes: Vec<Result<(), PageServiceError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    service.delete_page_hard(page.id, member)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(PageServiceError::NotFound(id)) if *id == page.id)));
    assert_eq!(service.repo().count_blocks(page.id).unwrap(), 0);
}

#[test]
fn concurrent_hard_deletes_on_shared_database_file_succeed_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.sqlite3");
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();

    let page_id = {
        let conn = open_db(&path).unwrap();
        SqliteMembershipRepository::try_new(&conn)
            .unwrap()
            .grant(workspace, member)
            .unwrap();
        let service = PageService::new(
            SqlitePageRepository::try_new(&conn).unwrap(),
            SqliteMembershipRepository::try_new(&conn).unwrap(),
        );
        let page = service.create_page(workspace, member, None, "Shared").unwrap();
        for _ in 0..3 {
            service
                .repo()
                .insert_block(&Block::new(page.id, "paragraph", "text"))
                .unwrap();
        }
        page.id
    };

    let barrier = Barrier::new(2);
    let outcomes: Vec<Result<(), PageServiceError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| delete_from_own_connection(&path, &barrier, page_id, member)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(PageServiceError::NotFound(_)))));

    let conn = open_db(&path).unwrap();
    let repo = SqlitePageRepository::try_new(&conn).unwrap();
    assert!(repo.get_page(page_id).unwrap().is_none());
    assert_eq!(repo.count_blocks(page_id).unwrap(), 0);
}

fn delete_from_own_connection(
    path: &Path,
    barrier: &Barrier,
    page_id: PageId,
    member: Uuid,
) -> Result<(), PageServiceError> {
    let conn = open_db(path).unwrap();
    let service = PageService::new(
        SqlitePageRepository::try_new(&conn).unwrap(),
        SqliteMembershipRepository::try_new(&conn).unwrap(),
    );
    barrier.wait();
    service.delete_page_hard(page_id, member)
}

/// Store whose block cleanup races with another deleter removing the page.
struct RacingRepository {
    inner: InMemoryPageRepository,
}

impl PageRepository for RacingRepository {
    fn insert_page(&self, page: &Page) -> RepoResult<PageId> {
        self.inner.insert_page(page)
    }

    fn get_page(&self, id: PageId) -> RepoResult<Option<Page>> {
        self.inner.get_page(id)
    }

    fn update_page_fields(&self, id: PageId, update: &PageUpdate) -> RepoResult<()> {
        self.inner.update_page_fields(id, update)
    }

    fn delete_blocks_by_page(&self, page_id: PageId) -> RepoResult<usize> {
        let deleted = self.inner.delete_blocks_by_page(page_id)?;
        self.inner.delete_page(page_id)?;
        Ok(deleted)
    }

    fn delete_page(&self, id: PageId) -> RepoResult<usize> {
        self.inner.delete_page(id)
    }

    fn list_pages(&self, query: &PageListQuery) -> RepoResult<Vec<Page>> {
        self.inner.list_pages(query)
    }
}

#[test]
fn page_vanishing_between_authorize_and_delete_reports_not_found() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = PageService::new(
        RacingRepository {
            inner: InMemoryPageRepository::new(),
        },
        InMemoryMembershipRepository::with_members([(workspace, member)]),
    );
    let page = service.create_page(workspace, member, None, "Doomed").unwrap();

    let err = service.delete_page_hard(page.id, member).unwrap_err();

    assert!(matches!(err, PageServiceError::NotFound(id) if id == page.id));
}

#[test]
fn empty_update_issues_no_store_mutation() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = memory_service(workspace, member);
    let page = service.create_page(workspace, member, None, "Quiet").unwrap();
    let writes_before = service.repo().mutation_count();

    let returned = service
        .update_page(page.id, member, PageUpdate::default())
        .unwrap();

    assert_eq!(returned, page);
    assert_eq!(service.repo().mutation_count(), writes_before);
}

#[test]
fn membership_check_failure_is_distinct_from_denial_and_blocks_mutation() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = memory_service(workspace, member);
    let page = service.create_page(workspace, member, None, "Guarded").unwrap();
    let writes_before = service.repo().mutation_count();

    service.gate().membership().set_unavailable(true);

    let err = service.archive_page(page.id, member).unwrap_err();
    assert!(matches!(err, PageServiceError::MembershipCheck(_)));
    let err = service
        .create_page(workspace, member, None, "Another")
        .unwrap_err();
    assert!(matches!(err, PageServiceError::MembershipCheck(_)));
    assert_eq!(service.repo().mutation_count(), writes_before);

    service.gate().membership().set_unavailable(false);
    assert!(!service.get_page(page.id, member).unwrap().archived);
}

#[test]
fn store_failure_is_propagated_as_store_error() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = memory_service(workspace, member);
    let page = service.create_page(workspace, member, None, "Fragile").unwrap();

    service.repo().set_unavailable(true);

    let err = service.get_page(page.id, member).unwrap_err();
    assert!(matches!(err, PageServiceError::Store(_)));
    let err = service.list_pages(workspace, member, None).unwrap_err();
    assert!(matches!(err, PageServiceError::Store(_)));
}

#[test]
fn revoked_member_loses_access() {
    let workspace = Uuid::new_v4();
    let member = Uuid::new_v4();
    let service = memory_service(workspace, member);
    let page = service.create_page(workspace, member, None, "Handover").unwrap();

    service.gate().membership().revoke(workspace, member);

    let err = service.get_page(page.id, member).unwrap_err();
    assert!(matches!(err, PageServiceError::Unauthorized { .. }));
}
