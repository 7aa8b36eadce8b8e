//! Random test data generators using the `fake` crate.
//!
//! Provides realistic random data including:
//! - Item titles and summaries
//! - Tag pools
//! - Property-based testing strategies

use chrono::Utc;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;
use task_core::models::{Priority, Role, WorkItem, WorkItemFilter};

/// Generate a realistic tag (e.g. "feature-implementation", "bugfix").
pub fn generate_tag() -> String {
    let tags = [
        "feature-implementation",
        "bugfix",
        "research",
        "documentation",
        "infra",
        "security-review",
        "performance",
    ];
    tags[rand::thread_rng().gen_range(0..tags.len())].to_string()
}

/// Generate a realistic item title.
pub fn generate_item_title() -> String {
    Sentence(3..8).fake()
}

/// Generate a realistic item summary.
pub fn generate_item_summary() -> String {
    Paragraph(2..5).fake()
}

/// Generate a random role.
pub fn generate_random_role() -> Role {
    let roles = [Role::Queue, Role::Work, Role::Review, Role::Terminal, Role::Blocked];
    roles[rand::thread_rng().gen_range(0..roles.len())]
}

/// Generate a random priority.
pub fn generate_random_priority() -> Priority {
    let priorities = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];
    priorities[rand::thread_rng().gen_range(0..priorities.len())]
}

/// Generate a random work item with realistic data (not persisted).
pub fn generate_random_item() -> WorkItem {
    let id: i64 = (1..99999).fake();
    let now = Utc::now();
    let role = generate_random_role();
    WorkItem {
        id,
        title: generate_item_title(),
        summary: generate_item_summary(),
        tags: vec![generate_tag()],
        priority: generate_random_priority(),
        parent_id: None,
        depth: 0,
        role,
        previous_role: if role == Role::Blocked { Some(Role::Work) } else { None },
        status_label: None,
        created_at: now,
        modified_at: now,
        role_changed_at: now,
        summary_on_complete: None,
    }
}

/// Configurable item generator.
pub struct ItemGenerator {
    pub title_prefix: String,
    pub tag_pool: Vec<String>,
}

impl Default for ItemGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemGenerator {
    pub fn new() -> Self {
        Self {
            title_prefix: "Item".to_string(),
            tag_pool: vec![
                "feature-implementation".to_string(),
                "bugfix".to_string(),
                "research".to_string(),
            ],
        }
    }

    pub fn generate(&self) -> WorkItem {
        let id: i64 = (1..99999).fake();
        let now = Utc::now();
        let tag = &self.tag_pool[rand::thread_rng().gen_range(0..self.tag_pool.len())];
        WorkItem {
            id,
            title: format!("{} {}", self.title_prefix, generate_item_title()),
            summary: generate_item_summary(),
            tags: vec![tag.clone()],
            priority: generate_random_priority(),
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
}

/// Proptest strategy for generating valid roles.
pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Queue),
        Just(Role::Work),
        Just(Role::Review),
        Just(Role::Terminal),
        Just(Role::Blocked),
    ]
}

/// Proptest strategy for generating valid priorities.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

/// Proptest strategy for generating complete (unpersisted) work items.
pub fn item_strategy() -> impl Strategy<Value = WorkItem> {
    (
        1i64..99999,
        "[A-Za-z ]{5,50}",
        "[A-Za-z0-9 .,!?]{10,200}",
        role_strategy(),
        priority_strategy(),
    )
        .prop_map(|(id, title, summary, role, priority)| {
            let now = Utc::now();
            WorkItem {
                id,
                title,
                summary,
                tags: vec!["feature-implementation".to_string()],
                priority,
                parent_id: None,
                depth: 0,
                role,
                previous_role: if role == Role::Blocked { Some(Role::Work) } else { None },
                status_label: None,
                created_at: now,
                modified_at: now,
                role_changed_at: now,
                summary_on_complete: None,
            }
        })
}

/// Proptest strategy for generating work item filters.
pub fn item_filter_strategy() -> impl Strategy<Value = WorkItemFilter> {
    (
        proptest::option::of("[a-z-]{5,20}"),
        proptest::option::of(role_strategy()),
    )
        .prop_map(|(tag_substring, role)| WorkItemFilter {
            tag_substring,
            role,
            priority: None,
            parent_id: None,
            depth: None,
            title_contains: None,
            limit: None,
            offset: None,
        })
}
