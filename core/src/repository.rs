//! Repository traits for the four persisted entities.
//!
//! Implementations live in the `database` crate (SQLite) and the
//! `mocks` crate (in-memory, for unit tests). Every method returns
//! `crate::error::Result<T>`; implementations never panic across this
//! boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Dependency, NewDependency, NewWorkItem, Note, NoteRole, NoteUpsert, Role,
    RoleTransitionRecord, Trigger, UpdateWorkItem, WorkItem, WorkItemFilter,
};

/// Hierarchical overview of a subtree rooted at an item: per-descendant
/// child counts bucketed by role, used by `query_items(overview)`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RoleCounts {
    pub queue: u64,
    pub work: u64,
    pub review: u64,
    pub terminal: u64,
    pub blocked: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OverviewNode {
    pub item: WorkItem,
    pub child_counts: RoleCounts,
    pub children: Vec<OverviewNode>,
}

#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// Validates parent existence/depth and persists a new root or
    /// child item. Fails with `Validation` if the resulting depth would
    /// exceed [`WorkItem::MAX_DEPTH`](crate::models::WorkItem::MAX_DEPTH).
    async fn create(&self, item: NewWorkItem) -> Result<WorkItem>;

    async fn get_by_id(&self, id: i64) -> Result<Option<WorkItem>>;

    /// Partial update of non-role fields; role/previous_role/status_label
    /// are only ever written by the transition handler.
    async fn update(&self, id: i64, updates: UpdateWorkItem) -> Result<WorkItem>;

    /// Deletes an item and (transactionally) its notes and dependencies.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Deletes a batch of direct children, used by completion cleanup.
    /// Items carrying any tag in `retain_tags` are skipped.
    async fn delete_children_except_tags(
        &self,
        parent_id: i64,
        retain_tags: &[String],
    ) -> Result<Vec<i64>>;

    async fn search(&self, filter: WorkItemFilter) -> Result<Vec<WorkItem>>;

    /// Direct children of `parent_id`, used for cascade/cleanup/overview.
    async fn children(&self, parent_id: i64) -> Result<Vec<WorkItem>>;

    /// Ancestor chain from immediate parent up to the root, nearest first.
    async fn ancestors(&self, item_id: i64) -> Result<Vec<WorkItem>>;

    /// Hierarchical walk from `root_id` (or every root when `None`),
    /// bucketing each node's direct children by role.
    async fn overview(&self, root_id: Option<i64>) -> Result<Vec<OverviewNode>>;

    /// Writes the role-bearing fields of `item` as they stand (role,
    /// previous_role, status_label, role_changed_at, summary_on_complete)
    /// inside the caller's transition transaction. Used only by the
    /// transition handler's apply phase.
    async fn apply_role_change(&self, item: &WorkItem) -> Result<WorkItem>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Inserts or replaces the note at (item_id, key); exactly one row
    /// exists afterward.
    async fn upsert(&self, note: NoteUpsert) -> Result<Note>;

    async fn get(&self, item_id: i64, key: &str) -> Result<Option<Note>>;

    async fn list_for_item(&self, item_id: i64, role: Option<NoteRole>) -> Result<Vec<Note>>;

    async fn delete(&self, item_id: i64, key: &str) -> Result<()>;

    async fn delete_all_for_item(&self, item_id: i64) -> Result<()>;
}

#[async_trait]
pub trait DependencyRepository: Send + Sync {
    /// Validates uniqueness of (from,to,type) and that the insert would
    /// not close a directed blocking cycle; fails the whole batch with
    /// `Conflict` if any member does.
    async fn create_batch(&self, deps: Vec<NewDependency>) -> Result<Vec<Dependency>>;

    async fn by_from_item(&self, item_id: i64) -> Result<Vec<Dependency>>;

    async fn by_to_item(&self, item_id: i64) -> Result<Vec<Dependency>>;

    /// Union of `by_from_item` and `by_to_item`.
    async fn by_item(&self, item_id: i64) -> Result<Vec<Dependency>>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn delete_by_pair(
        &self,
        from_item_id: i64,
        to_item_id: i64,
        dependency_type: Option<crate::models::DependencyType>,
    ) -> Result<u64>;

    async fn delete_all_for_item(&self, item_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait RoleTransitionRepository: Send + Sync {
    async fn append(
        &self,
        item_id: i64,
        from_role: Role,
        to_role: Role,
        from_status_label: Option<String>,
        to_status_label: Option<String>,
        trigger: Trigger,
        summary: Option<String>,
    ) -> Result<RoleTransitionRecord>;

    async fn by_item(&self, item_id: i64) -> Result<Vec<RoleTransitionRecord>>;

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<RoleTransitionRecord>>;

    async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RoleTransitionRecord>>;
}

/// Aggregate bundle of the four repositories, the unit the domain layer
/// and tool handlers are constructed over. Kept as a plain struct of
/// trait objects (rather than one mega-trait) so each repository can be
/// mocked independently in tests.
#[derive(Clone)]
pub struct Repositories {
    pub items: std::sync::Arc<dyn WorkItemRepository>,
    pub notes: std::sync::Arc<dyn NoteRepository>,
    pub dependencies: std::sync::Arc<dyn DependencyRepository>,
    pub transitions: std::sync::Arc<dyn RoleTransitionRepository>,
}
