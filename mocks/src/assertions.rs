//! Custom assertion helpers for testing.
//!
//! Provides specialized assertions for:
//! - Work item equality with clear error messages
//! - Dependency gate checks
//! - Collection-based assertions

use task_core::error::Blocker;
use task_core::models::{Priority, Role, WorkItem};

/// Assert items are equal ignoring timestamps.
pub fn assert_item_equals(actual: &WorkItem, expected: &WorkItem) {
    assert_eq!(actual.id, expected.id, "item IDs don't match");
    assert_eq!(actual.title, expected.title, "item titles don't match");
    assert_eq!(actual.summary, expected.summary, "item summaries don't match");
    assert_eq!(actual.tags, expected.tags, "item tags don't match");
    assert_eq!(actual.priority, expected.priority, "item priorities don't match");
    assert_eq!(actual.role, expected.role, "item roles don't match");
}

/// Assert items are equal including exact timestamps.
pub fn assert_item_equals_exact(actual: &WorkItem, expected: &WorkItem) {
    assert_eq!(actual, expected, "items are not exactly equal");
}

/// Assert an item matches partial criteria.
pub fn assert_item_matches(item: &WorkItem, matcher: &ItemMatcher) {
    if let Some(expected_id) = matcher.id {
        assert_eq!(item.id, expected_id, "item ID doesn't match expected");
    }
    if let Some(ref expected_title) = matcher.title {
        assert_eq!(&item.title, expected_title, "item title doesn't match expected");
    }
    if let Some(expected_role) = matcher.role {
        assert_eq!(item.role, expected_role, "item role doesn't match expected");
    }
    if let Some(expected_priority) = matcher.priority {
        assert_eq!(item.priority, expected_priority, "item priority doesn't match expected");
    }
    if let Some(expected_parent) = matcher.parent_id {
        assert_eq!(item.parent_id, Some(expected_parent), "item parent doesn't match expected");
    }
}

/// Assert a list of items contains one with a specific title.
pub fn assert_contains_item_with_title(items: &[WorkItem], title: &str) {
    assert!(
        items.iter().any(|i| i.title == title),
        "expected to find item titled '{}', available titles: {:?}",
        title,
        items.iter().map(|i| &i.title).collect::<Vec<_>>()
    );
}

/// Assert items come back sorted by priority (critical first), ties
/// broken by creation order — the order `WorkItemRepository::search` and
/// `children` both promise.
pub fn assert_items_sorted_by_priority(items: &[WorkItem]) {
    for window in items.windows(2) {
        assert!(
            window[0].priority.sort_rank() <= window[1].priority.sort_rank(),
            "items are not sorted by priority: '{}' ({:?}) comes before '{}' ({:?})",
            window[0].title,
            window[0].priority,
            window[1].title,
            window[1].priority
        );
    }
}

/// Assert a blocker list names the expected blocking item.
pub fn assert_blocked_by(blockers: &[Blocker], blocker_item_id: i64) {
    assert!(
        blockers.iter().any(|b| b.blocker_item_id == blocker_item_id),
        "expected blocker list to include item {blocker_item_id}, got: {blockers:?}"
    );
}

/// Flexible item matcher for partial assertions.
#[derive(Debug, Default)]
pub struct ItemMatcher {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub role: Option<Role>,
    pub priority: Option<Priority>,
    pub parent_id: Option<i64>,
}

impl ItemMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_parent_id(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}
