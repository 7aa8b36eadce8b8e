//! In-memory implementations of the four repository traits.
//!
//! Each mock offers:
//! - Error injection for failure-path testing
//! - Call history tracking for verification
//! - Behavior that mirrors `SqliteStore` closely enough that the same
//!   contract tests in [`crate::contracts`] pass against either.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use task_core::error::{OrchestratorError, Result};
use task_core::models::{
    Dependency, DependencyType, NewDependency, NewWorkItem, Note, NoteRole, NoteUpsert, Role,
    RoleTransitionRecord, Trigger, UpdateWorkItem, WorkItem, WorkItemFilter,
};
use task_core::repository::{
    DependencyRepository, NoteRepository, OverviewNode, Repositories, RoleCounts,
    RoleTransitionRepository, WorkItemRepository,
};
use task_core::validation::{DependencyValidator, NoteValidator, WorkItemValidator};

/// Builds a full [`Repositories`] bundle out of four fresh, independent
/// in-memory mocks.
pub fn in_memory_repositories() -> Repositories {
    Repositories {
        items: Arc::new(MockWorkItemRepository::new()),
        notes: Arc::new(MockNoteRepository::new()),
        dependencies: Arc::new(MockDependencyRepository::new()),
        transitions: Arc::new(MockRoleTransitionRepository::new()),
    }
}

fn check_error_injection(slot: &Mutex<Option<OrchestratorError>>) -> Result<()> {
    if let Some(err) = slot.lock().take() {
        return Err(err);
    }
    Ok(())
}

#[derive(Default)]
pub struct MockWorkItemRepository {
    items: Mutex<HashMap<i64, WorkItem>>,
    next_id: AtomicI64,
    error_injection: Mutex<Option<OrchestratorError>>,
    call_history: Mutex<Vec<String>>,
}

impl MockWorkItemRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn with_items(items: Vec<WorkItem>) -> Self {
        let mut map = HashMap::new();
        let mut max_id = 0;
        for item in items {
            max_id = max_id.max(item.id);
            map.insert(item.id, item);
        }
        Self {
            items: Mutex::new(map),
            next_id: AtomicI64::new(max_id + 1),
            ..Default::default()
        }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|c| c.contains(method)),
            "method '{method}' was not called, history: {history:?}"
        );
    }

    fn record(&self, call: impl Into<String>) {
        self.call_history.lock().push(call.into());
    }
}

#[async_trait]
impl WorkItemRepository for MockWorkItemRepository {
    async fn create(&self, new_item: NewWorkItem) -> Result<WorkItem> {
        self.record(format!("create({})", new_item.title));
        check_error_injection(&self.error_injection)?;
        WorkItemValidator::validate_new(&new_item)?;

        let parent_depth = match new_item.parent_id {
            Some(parent_id) => {
                let items = self.items.lock();
                let parent = items
                    .get(&parent_id)
                    .ok_or_else(|| OrchestratorError::not_found_item(parent_id))?;
                Some(parent.depth)
            }
            None => None,
        };
        let depth = WorkItemValidator::validate_depth(parent_depth)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let item = WorkItem {
            id,
            title: new_item.title,
            summary: new_item.summary,
            tags: new_item.tags,
            priority: new_item.priority.unwrap_or_default(),
            parent_id: new_item.parent_id,
            depth,
            role: Role::Queue,
            previous_role: None,
            status_label: None,
            created_at: now,
            modified_at: now,
            role_changed_at: now,
            summary_on_complete: None,
        };
        self.items.lock().insert(id, item.clone());
        Ok(item)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<WorkItem>> {
        self.record(format!("get_by_id({id})"));
        check_error_injection(&self.error_injection)?;
        Ok(self.items.lock().get(&id).cloned())
    }

    async fn update(&self, id: i64, updates: UpdateWorkItem) -> Result<WorkItem> {
        self.record(format!("update({id})"));
        check_error_injection(&self.error_injection)?;
        if let Some(ref tags) = updates.tags {
            WorkItemValidator::validate_tags(tags)?;
        }
        let mut items = self.items.lock();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found_item(id))?;
        if let Some(title) = updates.title {
            item.title = title;
        }
        if let Some(summary) = updates.summary {
            item.summary = summary;
        }
        if let Some(tags) = updates.tags {
            item.tags = tags;
        }
        if let Some(priority) = updates.priority {
            item.priority = priority;
        }
        item.modified_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.record(format!("delete({id})"));
        check_error_injection(&self.error_injection)?;
        let mut items = self.items.lock();
        if items.remove(&id).is_none() {
            return Err(OrchestratorError::not_found_item(id));
        }
        let descendants: Vec<i64> = items
            .values()
            .filter(|i| i.parent_id == Some(id))
            .map(|i| i.id)
            .collect();
        drop(items);
        for child_id in descendants {
            let _ = Box::pin(self.delete(child_id)).await;
        }
        Ok(())
    }

    async fn delete_children_except_tags(
        &self,
        parent_id: i64,
        retain_tags: &[String],
    ) -> Result<Vec<i64>> {
        self.record(format!("delete_children_except_tags({parent_id})"));
        check_error_injection(&self.error_injection)?;
        let children = self.children(parent_id).await?;
        let mut deleted = Vec::new();
        for child in children {
            if child.tags.iter().any(|t| retain_tags.contains(t)) {
                continue;
            }
            self.delete(child.id).await?;
            deleted.push(child.id);
        }
        Ok(deleted)
    }

    async fn search(&self, filter: WorkItemFilter) -> Result<Vec<WorkItem>> {
        self.record("search");
        check_error_injection(&self.error_injection)?;
        let items = self.items.lock();
        let mut result: Vec<WorkItem> = items
            .values()
            .filter(|i| filter.role.map_or(true, |r| i.role == r))
            .filter(|i| filter.priority.map_or(true, |p| i.priority == p))
            .filter(|i| filter.parent_id.is_none() || i.parent_id == filter.parent_id)
            .filter(|i| filter.depth.map_or(true, |d| i.depth == d))
            .filter(|i| match &filter.title_contains {
                Some(t) => i.title.contains(t.as_str()),
                None => true,
            })
            .filter(|i| match &filter.tag_substring {
                Some(t) => i.tags.iter().any(|tag| tag.contains(t.as_str())),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by_key(|i| (i.priority.sort_rank(), i.created_at));
        if let Some(offset) = filter.offset {
            result = result.into_iter().skip(offset as usize).collect();
        }
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        Ok(result)
    }

    async fn children(&self, parent_id: i64) -> Result<Vec<WorkItem>> {
        self.record(format!("children({parent_id})"));
        check_error_injection(&self.error_injection)?;
        let items = self.items.lock();
        let mut children: Vec<WorkItem> = items
            .values()
            .filter(|i| i.parent_id == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by_key(|i| (i.priority.sort_rank(), i.created_at));
        Ok(children)
    }

    async fn ancestors(&self, item_id: i64) -> Result<Vec<WorkItem>> {
        self.record(format!("ancestors({item_id})"));
        check_error_injection(&self.error_injection)?;
        let mut chain = Vec::new();
        let mut current = self.items.lock().get(&item_id).cloned();
        while let Some(item) = current {
            match item.parent_id {
                Some(parent_id) => {
                    let parent = self.items.lock().get(&parent_id).cloned();
                    if let Some(ref p) = parent {
                        chain.push(p.clone());
                    }
                    current = parent;
                }
                None => break,
            }
        }
        Ok(chain)
    }

    async fn overview(&self, root_id: Option<i64>) -> Result<Vec<OverviewNode>> {
        self.record("overview");
        check_error_injection(&self.error_injection)?;
        let roots: Vec<WorkItem> = match root_id {
            Some(id) => self.get_by_id(id).await?.into_iter().collect(),
            None => {
                let items = self.items.lock();
                items.values().filter(|i| i.depth == 0).cloned().collect()
            }
        };
        let mut out = Vec::with_capacity(roots.len());
        for root in roots {
            out.push(Box::pin(self.overview_node(root)).await?);
        }
        Ok(out)
    }

    async fn apply_role_change(&self, item: &WorkItem) -> Result<WorkItem> {
        self.record(format!("apply_role_change({})", item.id));
        check_error_injection(&self.error_injection)?;
        let mut items = self.items.lock();
        let existing = items
            .get_mut(&item.id)
            .ok_or_else(|| OrchestratorError::not_found_item(item.id))?;
        existing.role = item.role;
        existing.previous_role = item.previous_role;
        existing.status_label = item.status_label.clone();
        existing.role_changed_at = item.role_changed_at;
        existing.modified_at = item.modified_at;
        existing.summary_on_complete = item.summary_on_complete.clone();
        Ok(existing.clone())
    }
}

impl MockWorkItemRepository {
    fn overview_node<'a>(
        &'a self,
        item: WorkItem,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<OverviewNode>> + Send + 'a>> {
        Box::pin(async move {
            let children = self.children(item.id).await?;
            let mut counts = RoleCounts::default();
            for child in &children {
                match child.role {
                    Role::Queue => counts.queue += 1,
                    Role::Work => counts.work += 1,
                    Role::Review => counts.review += 1,
                    Role::Terminal => counts.terminal += 1,
                    Role::Blocked => counts.blocked += 1,
                }
            }
            let mut child_nodes = Vec::with_capacity(children.len());
            for child in children {
                child_nodes.push(self.overview_node(child).await?);
            }
            Ok(OverviewNode {
                item,
                child_counts: counts,
                children: child_nodes,
            })
        })
    }
}

#[derive(Default)]
pub struct MockNoteRepository {
    notes: Mutex<HashMap<(i64, String), Note>>,
    next_id: AtomicI64,
    error_injection: Mutex<Option<OrchestratorError>>,
}

impl MockNoteRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }
}

#[async_trait]
impl NoteRepository for MockNoteRepository {
    async fn upsert(&self, note: NoteUpsert) -> Result<Note> {
        check_error_injection(&self.error_injection)?;
        NoteValidator::validate_upsert(&note)?;
        let mut notes = self.notes.lock();
        let now = Utc::now();
        let key = (note.item_id, note.key.clone());
        let entry = notes.entry(key).or_insert_with(|| Note {
            id: 0,
            item_id: note.item_id,
            key: note.key.clone(),
            role: note.role,
            body: String::new(),
            created_at: now,
            modified_at: now,
        });
        if entry.id == 0 {
            entry.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        }
        entry.role = note.role;
        entry.body = note.body;
        entry.modified_at = now;
        Ok(entry.clone())
    }

    async fn get(&self, item_id: i64, key: &str) -> Result<Option<Note>> {
        check_error_injection(&self.error_injection)?;
        Ok(self.notes.lock().get(&(item_id, key.to_string())).cloned())
    }

    async fn list_for_item(&self, item_id: i64, role: Option<NoteRole>) -> Result<Vec<Note>> {
        check_error_injection(&self.error_injection)?;
        let mut notes: Vec<Note> = self
            .notes
            .lock()
            .values()
            .filter(|n| n.item_id == item_id)
            .filter(|n| role.map_or(true, |r| n.role == r))
            .cloned()
            .collect();
        notes.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(notes)
    }

    async fn delete(&self, item_id: i64, key: &str) -> Result<()> {
        check_error_injection(&self.error_injection)?;
        self.notes
            .lock()
            .remove(&(item_id, key.to_string()))
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::NotFound(format!("note '{key}' on item {item_id}")))
    }

    async fn delete_all_for_item(&self, item_id: i64) -> Result<()> {
        check_error_injection(&self.error_injection)?;
        self.notes.lock().retain(|(id, _), _| *id != item_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDependencyRepository {
    deps: Mutex<HashMap<i64, Dependency>>,
    next_id: AtomicI64,
    error_injection: Mutex<Option<OrchestratorError>>,
}

impl MockDependencyRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    fn reaches(&self, graph: &HashMap<i64, Vec<i64>>, start: i64, target: i64) -> bool {
        if start == target {
            return true;
        }
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            if let Some(neighbors) = graph.get(&node) {
                for &next in neighbors {
                    if next == target {
                        return true;
                    }
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        false
    }
}

#[async_trait]
impl DependencyRepository for MockDependencyRepository {
    async fn create_batch(&self, new_deps: Vec<NewDependency>) -> Result<Vec<Dependency>> {
        check_error_injection(&self.error_injection)?;
        for dep in &new_deps {
            DependencyValidator::validate_new(dep)?;
        }

        let mut deps = self.deps.lock();
        let mut graph: HashMap<i64, Vec<i64>> = HashMap::new();
        for dep in deps.values().filter(|d| d.dependency_type.is_blocking()) {
            let blocker = dep.blocker_item_id();
            let dependent = if blocker == dep.from_item_id {
                dep.to_item_id
            } else {
                dep.from_item_id
            };
            graph.entry(blocker).or_default().push(dependent);
        }

        for dep in &new_deps {
            if !dep.dependency_type.is_blocking() {
                continue;
            }
            let (blocker, dependent) = if dep.dependency_type == DependencyType::IsBlockedBy {
                (dep.to_item_id, dep.from_item_id)
            } else {
                (dep.from_item_id, dep.to_item_id)
            };
            if self.reaches(&graph, dependent, blocker) {
                return Err(OrchestratorError::cyclic_dependency());
            }
            graph.entry(blocker).or_default().push(dependent);
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(new_deps.len());
        for dep in new_deps {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let record = Dependency {
                id,
                from_item_id: dep.from_item_id,
                to_item_id: dep.to_item_id,
                dependency_type: dep.dependency_type,
                unblock_at: dep.unblock_at,
                created_at: now,
            };
            deps.insert(id, record.clone());
            created.push(record);
        }
        Ok(created)
    }

    async fn by_from_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .deps
            .lock()
            .values()
            .filter(|d| d.from_item_id == item_id)
            .cloned()
            .collect())
    }

    async fn by_to_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .deps
            .lock()
            .values()
            .filter(|d| d.to_item_id == item_id)
            .cloned()
            .collect())
    }

    async fn by_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .deps
            .lock()
            .values()
            .filter(|d| d.from_item_id == item_id || d.to_item_id == item_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        check_error_injection(&self.error_injection)?;
        self.deps
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::NotFound(format!("dependency {id}")))
    }

    async fn delete_by_pair(
        &self,
        from_item_id: i64,
        to_item_id: i64,
        dependency_type: Option<DependencyType>,
    ) -> Result<u64> {
        check_error_injection(&self.error_injection)?;
        let mut deps = self.deps.lock();
        let before = deps.len();
        deps.retain(|_, d| {
            !(d.from_item_id == from_item_id
                && d.to_item_id == to_item_id
                && dependency_type.map_or(true, |t| d.dependency_type == t))
        });
        Ok((before - deps.len()) as u64)
    }

    async fn delete_all_for_item(&self, item_id: i64) -> Result<u64> {
        check_error_injection(&self.error_injection)?;
        let mut deps = self.deps.lock();
        let before = deps.len();
        deps.retain(|_, d| d.from_item_id != item_id && d.to_item_id != item_id);
        Ok((before - deps.len()) as u64)
    }
}

#[derive(Default)]
pub struct MockRoleTransitionRepository {
    records: Mutex<Vec<RoleTransitionRecord>>,
    next_id: AtomicI64,
    error_injection: Mutex<Option<OrchestratorError>>,
}

impl MockRoleTransitionRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }
}

#[async_trait]
impl RoleTransitionRepository for MockRoleTransitionRepository {
    async fn append(
        &self,
        item_id: i64,
        from_role: Role,
        to_role: Role,
        from_status_label: Option<String>,
        to_status_label: Option<String>,
        trigger: Trigger,
        summary: Option<String>,
    ) -> Result<RoleTransitionRecord> {
        check_error_injection(&self.error_injection)?;
        let record = RoleTransitionRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            item_id,
            from_role,
            to_role,
            from_status_label,
            to_status_label,
            trigger,
            summary,
            transitioned_at: Utc::now(),
        };
        self.records.lock().push(record.clone());
        Ok(record)
    }

    async fn by_item(&self, item_id: i64) -> Result<Vec<RoleTransitionRecord>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn since(&self, since: DateTime<Utc>) -> Result<Vec<RoleTransitionRecord>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.transitioned_at >= since)
            .cloned()
            .collect())
    }

    async fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<RoleTransitionRecord>> {
        check_error_injection(&self.error_injection)?;
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.transitioned_at >= from && r.transitioned_at <= to)
            .cloned()
            .collect())
    }
}
