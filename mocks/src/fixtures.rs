//! Standard test fixtures for consistent testing.
//!
//! Provides pre-built test data including:
//! - Standard work items in various roles
//! - Edge case scenarios (depth, blocked state)
//! - Bulk item generators

use chrono::Utc;
use task_core::models::{
    Dependency, DependencyType, NewDependency, NewWorkItem, Note, NoteRole, NoteUpsert, Priority,
    Role, UpdateWorkItem, WorkItem,
};

/// A basic root item in the QUEUE role with sensible defaults.
pub fn create_test_item() -> WorkItem {
    let now = Utc::now();
    WorkItem {
        id: 1,
        title: "Test item".to_string(),
        summary: "A standard test item with default values".to_string(),
        tags: vec!["feature".to_string()],
        priority: Priority::Medium,
        parent_id: None,
        depth: 0,
        role: Role::Queue,
        previous_role: None,
        status_label: None,
        created_at: now,
        modified_at: now,
        role_changed_at: now,
        summary_on_complete: None,
    }
}

/// Create an item in a specific role.
pub fn create_test_item_with_role(role: Role) -> WorkItem {
    let mut item = create_test_item();
    item.role = role;
    if role == Role::Terminal {
        item.summary_on_complete = Some("done".to_string());
    }
    item
}

/// Create an item with a specific parent, one depth level down.
pub fn create_test_child_item(parent_id: i64) -> WorkItem {
    let mut item = create_test_item();
    item.id = 2;
    item.parent_id = Some(parent_id);
    item.depth = 1;
    item
}

/// Create multiple unique items, cycling through roles.
pub fn create_test_items(count: usize) -> Vec<WorkItem> {
    (1..=count)
        .map(|i| {
            let role = match i % 4 {
                0 => Role::Queue,
                1 => Role::Work,
                2 => Role::Review,
                _ => Role::Terminal,
            };
            let mut item = create_test_item();
            item.id = i as i64;
            item.title = format!("Test item {i}");
            item.summary = format!("Test item number {i} for bulk testing");
            item.role = role;
            item
        })
        .collect()
}

/// One item in each possible role, including BLOCKED.
pub fn create_items_in_all_roles() -> Vec<WorkItem> {
    [Role::Queue, Role::Work, Role::Review, Role::Terminal, Role::Blocked]
        .into_iter()
        .enumerate()
        .map(|(i, role)| {
            let mut item = create_test_item();
            item.id = (i + 1) as i64;
            item.title = format!("{} item", role.lowercase_name());
            item.role = role;
            if role == Role::Blocked {
                item.previous_role = Some(Role::Work);
            }
            item
        })
        .collect()
}

/// A standard `NewWorkItem` for testing creation.
pub fn create_new_item() -> NewWorkItem {
    NewWorkItem {
        title: "New test item".to_string(),
        summary: "A new item for testing creation".to_string(),
        tags: vec!["feature".to_string()],
        priority: Some(Priority::Medium),
        parent_id: None,
        template_ids: Vec::new(),
    }
}

/// `NewWorkItem` with a specific title.
pub fn create_new_item_with_title(title: &str) -> NewWorkItem {
    let mut item = create_new_item();
    item.title = title.to_string();
    item
}

/// A standard `UpdateWorkItem` for testing updates.
pub fn create_update_item() -> UpdateWorkItem {
    UpdateWorkItem {
        title: Some("Updated item name".to_string()),
        summary: Some("Updated item summary".to_string()),
        tags: None,
        priority: Some(Priority::High),
    }
}

/// A standard note fixture for a given item.
pub fn create_test_note(item_id: i64, key: &str) -> Note {
    let now = Utc::now();
    Note {
        id: 1,
        item_id,
        key: key.to_string(),
        role: NoteRole::Queue,
        body: "test note body".to_string(),
        created_at: now,
        modified_at: now,
    }
}

pub fn create_note_upsert(item_id: i64, key: &str) -> NoteUpsert {
    NoteUpsert {
        item_id,
        key: key.to_string(),
        role: NoteRole::Queue,
        body: "test note body".to_string(),
    }
}

/// A standard BLOCKS dependency fixture between two item ids.
pub fn create_test_dependency(from_item_id: i64, to_item_id: i64) -> Dependency {
    Dependency {
        id: 1,
        from_item_id,
        to_item_id,
        dependency_type: DependencyType::Blocks,
        unblock_at: None,
        created_at: Utc::now(),
    }
}

pub fn create_new_dependency(from_item_id: i64, to_item_id: i64) -> NewDependency {
    NewDependency {
        from_item_id,
        to_item_id,
        dependency_type: DependencyType::Blocks,
        unblock_at: None,
    }
}
