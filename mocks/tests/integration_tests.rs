//! End-to-end exercises against the in-memory mocks, covering the same
//! ground an integration suite would run against `SqliteStore` but
//! without touching a database.

use task_core::error::OrchestratorError;
use task_core::models::{NoteRole, Role, Trigger};
use task_core::repository::{DependencyRepository, NoteRepository, RoleTransitionRepository, WorkItemRepository};

use mocks::assertions::{
    assert_contains_item_with_title, assert_item_equals, assert_item_matches,
    assert_items_sorted_by_priority, ItemMatcher,
};
use mocks::builders::{NewDependencyBuilder, NewWorkItemBuilder, NoteUpsertBuilder, UpdateWorkItemBuilder, WorkItemFilterBuilder};
use mocks::contracts::{test_dependency_repository_contract, test_note_repository_contract, test_work_item_repository_contract};
use mocks::fixtures::{create_items_in_all_roles, create_new_item, create_test_items};
use mocks::generators::{generate_random_item, item_strategy, ItemGenerator};
use mocks::{in_memory_repositories, MockDependencyRepository, MockNoteRepository, MockWorkItemRepository};

#[tokio::test]
async fn work_item_repository_round_trips_through_create_update_delete() {
    let repo = MockWorkItemRepository::new();
    let created = repo.create(create_new_item()).await.unwrap();
    assert_eq!(created.role, Role::Queue);

    let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_item_equals(&fetched, &created);

    let updated = repo
        .update(created.id, UpdateWorkItemBuilder::new().with_title("renamed").build())
        .await
        .unwrap();
    assert_eq!(updated.title, "renamed");

    repo.delete(created.id).await.unwrap();
    assert!(repo.get_by_id(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_parent_cascades_to_children() {
    let repo = MockWorkItemRepository::new();
    let parent = repo.create(create_new_item()).await.unwrap();
    let child = repo
        .create(NewWorkItemBuilder::new().with_title("child").with_parent(parent.id).build())
        .await
        .unwrap();

    repo.delete(parent.id).await.unwrap();

    assert!(repo.get_by_id(parent.id).await.unwrap().is_none());
    assert!(repo.get_by_id(child.id).await.unwrap().is_none());
}

#[tokio::test]
async fn search_filters_by_role_and_sorts_by_priority() {
    let repo = MockWorkItemRepository::with_items(create_test_items(5));
    for template in create_items_in_all_roles() {
        let created = repo.create(create_new_item()).await.unwrap();
        let mut changed = created.clone();
        changed.role = template.role;
        repo.apply_role_change(&changed).await.unwrap();
    }

    let filter = WorkItemFilterBuilder::new().with_role(Role::Queue).build();
    let queued = repo.search(filter).await.unwrap();
    assert!(queued.iter().all(|i| i.role == Role::Queue));
    assert_items_sorted_by_priority(&queued);
}

#[tokio::test]
async fn error_injection_surfaces_on_the_next_call_only() {
    let repo = MockWorkItemRepository::new();
    repo.inject_error(OrchestratorError::not_found_item(42));

    let err = repo.create(create_new_item()).await.unwrap_err();
    assert_eq!(err.code(), "RESOURCE_NOT_FOUND");

    // injection is one-shot: the following call succeeds normally
    let created = repo.create(create_new_item()).await.unwrap();
    assert_eq!(created.role, Role::Queue);
}

#[tokio::test]
async fn call_history_records_method_invocations() {
    let repo = MockWorkItemRepository::new();
    let item = repo.create(create_new_item()).await.unwrap();
    repo.get_by_id(item.id).await.unwrap();

    repo.assert_called("create");
    repo.assert_called("get_by_id");
    assert!(repo.call_history().len() >= 2);
}

#[tokio::test]
async fn work_item_repository_satisfies_the_shared_contract() {
    let repo = MockWorkItemRepository::new();
    test_work_item_repository_contract(&repo).await;
}

#[tokio::test]
async fn note_repository_satisfies_the_shared_contract() {
    let items = MockWorkItemRepository::new();
    let item = items.create(create_new_item()).await.unwrap();
    let notes = MockNoteRepository::new();
    test_note_repository_contract(&notes, item.id).await;
}

#[tokio::test]
async fn dependency_repository_satisfies_the_shared_contract() {
    let items = MockWorkItemRepository::new();
    let from = items.create(create_new_item()).await.unwrap();
    let to = items.create(create_new_item()).await.unwrap();
    let deps = MockDependencyRepository::new();
    test_dependency_repository_contract(&deps, from.id, to.id).await;
}

#[tokio::test]
async fn blocking_dependency_is_reported_against_the_dependent_item() {
    let items = MockWorkItemRepository::new();
    let blocker = items.create(create_new_item()).await.unwrap();
    let dependent = items.create(create_new_item()).await.unwrap();

    let deps = MockDependencyRepository::new();
    let created = deps
        .create_batch(vec![NewDependencyBuilder::blocks(blocker.id, dependent.id).build()])
        .await
        .unwrap();
    assert_eq!(created.len(), 1);

    let blockers_of_dependent = deps.by_to_item(dependent.id).await.unwrap();
    assert!(blockers_of_dependent.iter().any(|d| d.blocker_item_id() == blocker.id));
}

#[tokio::test]
async fn a_direct_cycle_is_rejected() {
    let deps = MockDependencyRepository::new();
    deps.create_batch(vec![NewDependencyBuilder::blocks(1, 2).build()])
        .await
        .unwrap();

    let err = deps
        .create_batch(vec![NewDependencyBuilder::blocks(2, 1).build()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CONFLICT_ERROR");
}

#[tokio::test]
async fn note_upsert_is_idempotent_on_item_and_key() {
    let notes = MockNoteRepository::new();
    let first = notes
        .upsert(NoteUpsertBuilder::new(1, "progress").with_body("started").build())
        .await
        .unwrap();
    let second = notes
        .upsert(
            NoteUpsertBuilder::new(1, "progress")
                .with_role(NoteRole::Work)
                .with_body("halfway")
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.body, "halfway");
    assert_eq!(notes.list_for_item(1, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn role_transition_history_is_queryable_by_item() {
    let transitions = in_memory_repositories().transitions;
    transitions
        .append(1, Role::Queue, Role::Work, None, None, Trigger::Start, None)
        .await
        .unwrap();
    transitions
        .append(1, Role::Work, Role::Review, None, None, Trigger::Start, None)
        .await
        .unwrap();

    let history = transitions.by_item(1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].to_role, Role::Review);
}

#[test]
fn fixture_based_search_finds_item_by_title() {
    let items = create_test_items(10);
    assert_contains_item_with_title(&items, &items[0].title);
}

#[test]
fn item_matcher_validates_expected_fields() {
    let item = generate_random_item();
    let matcher = ItemMatcher::new()
        .with_id(item.id)
        .with_title(&item.title)
        .with_role(item.role)
        .with_priority(item.priority);
    assert_item_matches(&item, &matcher);
}

#[test]
fn configurable_generator_applies_its_title_prefix() {
    let generator = ItemGenerator {
        title_prefix: "Spike".to_string(),
        tag_pool: vec!["research".to_string()],
    };
    let item = generator.generate();
    assert!(item.title.starts_with("Spike"));
    assert_eq!(item.role, Role::Queue);
}

proptest::proptest! {
    #[test]
    fn any_generated_item_has_a_nonnegative_depth(item in item_strategy()) {
        proptest::prop_assert!(item.depth >= 0);
    }
}
