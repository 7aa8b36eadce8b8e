//! Contract test helpers for validating trait implementations.
//!
//! Provides standardized tests that any implementation of the four core
//! repository traits should pass, so the same suite runs against both
//! the in-memory mocks and `SqliteStore`.

use task_core::error::OrchestratorError;
use task_core::models::{NoteRole, Role, UpdateWorkItem, WorkItemFilter};
use task_core::repository::{DependencyRepository, NoteRepository, WorkItemRepository};

use crate::fixtures::{create_new_dependency, create_new_item, create_note_upsert};

/// Runs the full work-item contract suite against any implementation.
pub async fn test_work_item_repository_contract<R: WorkItemRepository>(repo: &R) {
    test_create_contract(repo).await;
    test_update_contract(repo).await;
    test_delete_contract(repo).await;
    test_get_contract(repo).await;
    test_search_contract(repo).await;
    test_depth_contract(repo).await;
}

pub async fn test_create_contract<R: WorkItemRepository>(repo: &R) {
    let new_item = create_new_item();
    let item = repo.create(new_item.clone()).await.expect("create should succeed");

    assert!(item.id > 0, "created item should have a positive id");
    assert_eq!(item.title, new_item.title, "created item should preserve title");
    assert_eq!(item.role, Role::Queue, "new items start in QUEUE");
    assert!(item.parent_id.is_none());
    assert_eq!(item.depth, 0);
}

pub async fn test_update_contract<R: WorkItemRepository>(repo: &R) {
    let item = repo.create(create_new_item()).await.expect("create should succeed");

    let updated = repo
        .update(
            item.id,
            UpdateWorkItem {
                title: Some("Updated title".to_string()),
                summary: Some("Updated summary".to_string()),
                tags: None,
                priority: None,
            },
        )
        .await
        .expect("update should succeed");
    assert_eq!(updated.title, "Updated title");
    assert_eq!(updated.summary, "Updated summary");
    assert_eq!(updated.id, item.id, "id should remain unchanged");

    let not_found = repo.update(999_999, UpdateWorkItem::default()).await;
    assert!(not_found.is_err(), "update of a missing item should fail");
    assert!(matches!(not_found.unwrap_err(), OrchestratorError::NotFound(_)));
}

pub async fn test_delete_contract<R: WorkItemRepository>(repo: &R) {
    let item = repo.create(create_new_item()).await.expect("create should succeed");
    repo.delete(item.id).await.expect("delete should succeed");

    let gone = repo.get_by_id(item.id).await.expect("get should not error");
    assert!(gone.is_none(), "deleted item should no longer resolve");

    let not_found = repo.delete(999_999).await;
    assert!(not_found.is_err(), "delete of a missing item should fail");
}

pub async fn test_get_contract<R: WorkItemRepository>(repo: &R) {
    let item = repo.create(create_new_item()).await.expect("create should succeed");

    let fetched = repo
        .get_by_id(item.id)
        .await
        .expect("get should not error")
        .expect("item should exist");
    assert_eq!(fetched.id, item.id);

    let missing = repo.get_by_id(999_999).await.expect("get should not error for a missing id");
    assert!(missing.is_none());
}

pub async fn test_search_contract<R: WorkItemRepository>(repo: &R) {
    for title in ["Alpha feature", "Beta feature", "Gamma fix"] {
        let mut new_item = create_new_item();
        new_item.title = title.to_string();
        repo.create(new_item).await.expect("create should succeed");
    }

    let all = repo
        .search(WorkItemFilter::default())
        .await
        .expect("search should succeed");
    assert!(all.len() >= 3, "should contain at least our created items");

    let filtered = repo
        .search(WorkItemFilter {
            title_contains: Some("feature".to_string()),
            ..Default::default()
        })
        .await
        .expect("filtered search should succeed");
    assert!(
        filtered.iter().all(|i| i.title.to_lowercase().contains("feature")),
        "all returned items should match the title filter"
    );
}

pub async fn test_depth_contract<R: WorkItemRepository>(repo: &R) {
    let root = repo.create(create_new_item()).await.expect("create should succeed");
    let mut child = create_new_item();
    child.parent_id = Some(root.id);
    let child = repo.create(child).await.expect("create should succeed");
    assert_eq!(child.depth, root.depth + 1);

    let mut grandchild = create_new_item();
    grandchild.parent_id = Some(999_999);
    let bad_parent = repo.create(grandchild).await;
    assert!(bad_parent.is_err(), "creating under a missing parent should fail");
}

pub async fn test_note_repository_contract<R: NoteRepository>(repo: &R, item_id: i64) {
    let note = repo
        .upsert(create_note_upsert(item_id, "requirements"))
        .await
        .expect("upsert should succeed");
    assert_eq!(note.item_id, item_id);
    assert_eq!(note.role, NoteRole::Queue);

    let fetched = repo
        .get(item_id, "requirements")
        .await
        .expect("get should not error")
        .expect("note should exist");
    assert_eq!(fetched.body, note.body);

    let replaced = repo
        .upsert(crate::fixtures::create_note_upsert(item_id, "requirements"))
        .await
        .expect("second upsert should replace, not duplicate");
    assert_eq!(replaced.id, note.id, "upsert at the same key should reuse the row");

    repo.delete(item_id, "requirements").await.expect("delete should succeed");
    let gone = repo.get(item_id, "requirements").await.expect("get should not error");
    assert!(gone.is_none());
}

pub async fn test_dependency_repository_contract<R: DependencyRepository>(
    repo: &R,
    from_item_id: i64,
    to_item_id: i64,
) {
    let created = repo
        .create_batch(vec![create_new_dependency(from_item_id, to_item_id)])
        .await
        .expect("create_batch should succeed");
    assert_eq!(created.len(), 1);

    let cyclic = repo
        .create_batch(vec![create_new_dependency(to_item_id, from_item_id)])
        .await;
    assert!(cyclic.is_err(), "a dependency closing a cycle should be rejected");

    let by_from = repo.by_from_item(from_item_id).await.expect("by_from_item should succeed");
    assert_eq!(by_from.len(), 1);

    let deleted = repo
        .delete_by_pair(from_item_id, to_item_id, None)
        .await
        .expect("delete_by_pair should succeed");
    assert_eq!(deleted, 1);
}
