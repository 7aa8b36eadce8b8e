use database::SqliteStore;
use task_core::models::{
    DependencyType, NewDependency, NewWorkItem, NoteRole, NoteUpsert, Role, Trigger,
    UpdateWorkItem, WorkItemFilter,
};
use task_core::repository::{DependencyRepository, NoteRepository, WorkItemRepository};

async fn store() -> SqliteStore {
    let store = SqliteStore::connect(":memory:").await.unwrap();
    store.bootstrap().await.unwrap();
    store
}

#[tokio::test]
async fn create_and_fetch_root_item() {
    let store = store().await;
    let item = store
        .create(NewWorkItem {
            title: "Ship v2".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(item.role, Role::Queue);
    assert_eq!(item.depth, 0);
    assert!(item.parent_id.is_none());

    let fetched = store.get_by_id(item.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Ship v2");
}

#[tokio::test]
async fn child_depth_is_parent_depth_plus_one() {
    let store = store().await;
    let parent = store
        .create(NewWorkItem {
            title: "Parent".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let child = store
        .create(NewWorkItem {
            title: "Child".to_string(),
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(child.depth, 1);
}

#[tokio::test]
async fn depth_overflow_is_rejected() {
    let store = store().await;
    let mut parent_id = None;
    for i in 0..=WorkItemDepthHelper::MAX_DEPTH {
        let result = store
            .create(NewWorkItem {
                title: format!("level-{i}"),
                parent_id,
                ..Default::default()
            })
            .await;
        match result {
            Ok(item) => parent_id = Some(item.id),
            Err(err) => {
                assert!(err.is_validation());
                return;
            }
        }
    }
    panic!("expected depth overflow before reaching this point");
}

struct WorkItemDepthHelper;
impl WorkItemDepthHelper {
    const MAX_DEPTH: i32 = task_core::models::WorkItem::MAX_DEPTH;
}

#[tokio::test]
async fn update_preserves_unset_fields() {
    let store = store().await;
    let item = store
        .create(NewWorkItem {
            title: "Original".to_string(),
            summary: "Original summary".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let updated = store
        .update(
            item.id,
            UpdateWorkItem {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.summary, "Original summary");
}

#[tokio::test]
async fn search_filters_by_role_and_tag() {
    let store = store().await;
    store
        .create(NewWorkItem {
            title: "Bug fix".to_string(),
            tags: vec!["bug".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .create(NewWorkItem {
            title: "Feature work".to_string(),
            tags: vec!["feature".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let results = store
        .search(WorkItemFilter {
            tag_substring: Some("bug".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Bug fix");

    let queued = store
        .search(WorkItemFilter {
            role: Some(Role::Queue),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(queued.len(), 2);
}

#[tokio::test]
async fn notes_upsert_replaces_existing_body() {
    let store = store().await;
    let item = store
        .create(NewWorkItem {
            title: "Item".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    store
        .upsert(NoteUpsert {
            item_id: item.id,
            key: "plan".to_string(),
            role: NoteRole::Queue,
            body: "first draft".to_string(),
        })
        .await
        .unwrap();
    store
        .upsert(NoteUpsert {
            item_id: item.id,
            key: "plan".to_string(),
            role: NoteRole::Queue,
            body: "revised draft".to_string(),
        })
        .await
        .unwrap();

    let notes = store.list_for_item(item.id, None).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].body, "revised draft");
}

#[tokio::test]
async fn dependency_batch_rejects_cycle() {
    let store = store().await;
    let a = store
        .create(NewWorkItem { title: "A".to_string(), ..Default::default() })
        .await
        .unwrap();
    let b = store
        .create(NewWorkItem { title: "B".to_string(), ..Default::default() })
        .await
        .unwrap();

    store
        .create_batch(vec![NewDependency {
            from_item_id: a.id,
            to_item_id: b.id,
            dependency_type: DependencyType::Blocks,
            unblock_at: None,
        }])
        .await
        .unwrap();

    let result = store
        .create_batch(vec![NewDependency {
            from_item_id: b.id,
            to_item_id: a.id,
            dependency_type: DependencyType::Blocks,
            unblock_at: None,
        }])
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn dependency_batch_is_atomic() {
    let store = store().await;
    let a = store
        .create(NewWorkItem { title: "A".to_string(), ..Default::default() })
        .await
        .unwrap();
    let b = store
        .create(NewWorkItem { title: "B".to_string(), ..Default::default() })
        .await
        .unwrap();
    let c = store
        .create(NewWorkItem { title: "C".to_string(), ..Default::default() })
        .await
        .unwrap();

    store
        .create_batch(vec![NewDependency {
            from_item_id: a.id,
            to_item_id: b.id,
            dependency_type: DependencyType::Blocks,
            unblock_at: None,
        }])
        .await
        .unwrap();

    // second edge in the batch closes a cycle; neither should land.
    let result = store
        .create_batch(vec![
            NewDependency {
                from_item_id: c.id,
                to_item_id: a.id,
                dependency_type: DependencyType::Blocks,
                unblock_at: None,
            },
            NewDependency {
                from_item_id: b.id,
                to_item_id: c.id,
                dependency_type: DependencyType::Blocks,
                unblock_at: None,
            },
        ])
        .await;
    assert!(result.is_err());

    let edges = store.by_item(c.id).await.unwrap();
    assert!(edges.is_empty());
}

#[tokio::test]
async fn completion_cleanup_deletes_direct_children_not_grandchildren() {
    let store = store().await;
    let parent = store
        .create(NewWorkItem { title: "Feature".to_string(), ..Default::default() })
        .await
        .unwrap();
    let child = store
        .create(NewWorkItem {
            title: "Subtask".to_string(),
            parent_id: Some(parent.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let grandchild = store
        .create(NewWorkItem {
            title: "Sub-subtask".to_string(),
            parent_id: Some(child.id),
            ..Default::default()
        })
        .await
        .unwrap();

    let deleted = store
        .delete_children_except_tags(parent.id, &[])
        .await
        .unwrap();
    assert_eq!(deleted, vec![child.id]);
    assert!(store.get_by_id(child.id).await.unwrap().is_none());
    assert!(store.get_by_id(grandchild.id).await.unwrap().is_none());
}

#[tokio::test]
async fn role_transition_survives_item_deletion() {
    use task_core::repository::RoleTransitionRepository;

    let store = store().await;
    let item = store
        .create(NewWorkItem { title: "Throwaway".to_string(), ..Default::default() })
        .await
        .unwrap();
    store
        .append(item.id, Role::Queue, Role::Work, None, None, Trigger::Start, None)
        .await
        .unwrap();
    store.delete(item.id).await.unwrap();

    let history = store.by_item(item.id).await.unwrap();
    assert_eq!(history.len(), 1);
}
