//! SQLite-backed implementations of the four repository traits.
//!
//! Connection setup enables `foreign_keys`, WAL journal mode, and a
//! 5-second busy timeout so concurrent clients queue rather than fail.
//! `migrate`/`bootstrap` give the two schema-bring-up paths the
//! `USE_FLYWAY` environment variable toggles between.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, QueryBuilder, Row, Sqlite, SqlitePool};

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

use crate::common::{
    dependency_type_to_string, note_role_to_string, priority_to_string, role_to_string,
    row_to_dependency, row_to_note, row_to_role_transition, row_to_work_item,
    sqlx_error_to_domain_error, tags_column, trigger_to_string,
};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to `database_path` (a filesystem path, or `:memory:`),
    /// creating the file if absent, with WAL journaling, foreign keys
    /// on, and a 5s busy timeout. Uses a single-connection pool and
    /// sqlx's default statement logging; see [`Self::connect_with_options`]
    /// to configure both.
    pub async fn connect(database_path: &str) -> Result<Self> {
        Self::connect_with_options(database_path, 5, false).await
    }

    /// As [`Self::connect`], but lets the caller size the connection pool
    /// and toggle sqlx's per-statement debug logging
    /// (`DATABASE_MAX_CONNECTIONS`/`DATABASE_SHOW_SQL`).
    pub async fn connect_with_options(
        database_path: &str,
        max_connections: u32,
        show_sql: bool,
    ) -> Result<Self> {
        let db_url = if database_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            format!("sqlite://{database_path}")
        };

        if database_path != ":memory:" && !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            Sqlite::create_database(&db_url)
                .await
                .map_err(|e| OrchestratorError::Database(format!("failed to create database: {e}")))?;
        }

        let journal_mode = if database_path == ":memory:" {
            sqlx::sqlite::SqliteJournalMode::Memory
        } else {
            sqlx::sqlite::SqliteJournalMode::Wal
        };

        let mut connect_options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(journal_mode)
            .busy_timeout(std::time::Duration::from_secs(5))
            .foreign_keys(true);

        if !show_sql {
            connect_options = connect_options.disable_statement_logging();
        }

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(connect_options)
            .await
            .map_err(sqlx_error_to_domain_error)?;

        Ok(Self { pool })
    }

    /// Versioned migrations via sqlx's embedded migrator and bookkeeping
    /// table. Selected when `USE_FLYWAY=true`.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| OrchestratorError::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` bootstrap for
    /// environments that can't ship migration files. Selected when
    /// `USE_FLYWAY=false`.
    ///
    /// Strips `--`-prefixed comment lines before splitting on `;`: several
    /// statements in `0001_init.sql` open with a comment block of their
    /// own, and a statement-level `starts_with("--")` check would discard
    /// the whole `CREATE TABLE` along with its header comment.
    pub async fn bootstrap(&self) -> Result<()> {
        const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");
        let without_comments: String = INIT_SQL
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        for statement in without_comments.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(sqlx_error_to_domain_error)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bundles clones of this store (a cheap handle around a pool) into
    /// the four repository traits the domain layer operates over.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            items: std::sync::Arc::new(self.clone()),
            notes: std::sync::Arc::new(self.clone()),
            dependencies: std::sync::Arc::new(self.clone()),
            transitions: std::sync::Arc::new(self.clone()),
        }
    }
}

#[async_trait]
impl WorkItemRepository for SqliteStore {
    async fn create(&self, new_item: NewWorkItem) -> Result<WorkItem> {
        WorkItemValidator::validate_new(&new_item)?;

        let parent_depth = match new_item.parent_id {
            Some(parent_id) => {
                let parent = self
                    .get_by_id(parent_id)
                    .await?
                    .ok_or_else(|| OrchestratorError::not_found_item(parent_id))?;
                Some(parent.depth)
            }
            None => None,
        };
        let depth = WorkItemValidator::validate_depth(parent_depth)?;

        let now = Utc::now();
        let priority = new_item.priority.unwrap_or_default();
        let tags_json = tags_column(&new_item.tags);

        let row = sqlx::query(
            r#"
            INSERT INTO work_items
                (title, summary, tags, priority, parent_id, depth, role,
                 previous_role, status_label, created_at, modified_at,
                 role_changed_at, summary_on_complete)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?, ?, NULL)
            RETURNING *
            "#,
        )
        .bind(&new_item.title)
        .bind(&new_item.summary)
        .bind(&tags_json)
        .bind(priority_to_string(priority))
        .bind(new_item.parent_id)
        .bind(depth)
        .bind(role_to_string(Role::Queue))
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;

        row_to_work_item(&row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<WorkItem>> {
        let row = sqlx::query("SELECT * FROM work_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        row.as_ref().map(row_to_work_item).transpose()
    }

    async fn update(&self, id: i64, updates: UpdateWorkItem) -> Result<WorkItem> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found_item(id))?;

        if let Some(ref tags) = updates.tags {
            WorkItemValidator::validate_tags(tags)?;
        }

        let title = updates.title.unwrap_or(existing.title);
        let summary = updates.summary.unwrap_or(existing.summary);
        let tags = updates.tags.unwrap_or(existing.tags);
        let priority = updates.priority.unwrap_or(existing.priority);
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            UPDATE work_items
            SET title = ?, summary = ?, tags = ?, priority = ?, modified_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&summary)
        .bind(tags_column(&tags))
        .bind(priority_to_string(priority))
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;

        row_to_work_item(&row)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM work_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        if result.rows_affected() == 0 {
            return Err(OrchestratorError::not_found_item(id));
        }
        Ok(())
    }

    async fn delete_children_except_tags(
        &self,
        parent_id: i64,
        retain_tags: &[String],
    ) -> Result<Vec<i64>> {
        let children = self.children(parent_id).await?;
        let retain: HashSet<&str> = retain_tags.iter().map(|s| s.as_str()).collect();
        let mut deleted = Vec::new();
        for child in children {
            if child.tags.iter().any(|t| retain.contains(t.as_str())) {
                continue;
            }
            self.delete(child.id).await?;
            deleted.push(child.id);
        }
        Ok(deleted)
    }

    async fn search(&self, filter: WorkItemFilter) -> Result<Vec<WorkItem>> {
        let mut qb = QueryBuilder::new("SELECT * FROM work_items WHERE 1 = 1");

        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role_to_string(role));
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ").push_bind(priority_to_string(priority));
        }
        if let Some(parent_id) = filter.parent_id {
            qb.push(" AND parent_id = ").push_bind(parent_id);
        }
        if let Some(depth) = filter.depth {
            qb.push(" AND depth = ").push_bind(depth);
        }
        if let Some(ref title) = filter.title_contains {
            qb.push(" AND title LIKE ").push_bind(format!("%{title}%"));
        }
        if let Some(ref tag) = filter.tag_substring {
            qb.push(" AND tags LIKE ").push_bind(format!("%{tag}%"));
        }

        qb.push(" ORDER BY CASE priority")
            .push(" WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END ASC")
            .push(", created_at ASC");

        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
            if let Some(offset) = filter.offset {
                qb.push(" OFFSET ").push_bind(offset as i64);
            }
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_work_item).collect()
    }

    async fn children(&self, parent_id: i64) -> Result<Vec<WorkItem>> {
        let rows = sqlx::query(
            "SELECT * FROM work_items WHERE parent_id = ? ORDER BY \
             CASE priority WHEN 'critical' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, \
             created_at ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_work_item).collect()
    }

    async fn ancestors(&self, item_id: i64) -> Result<Vec<WorkItem>> {
        let mut chain = Vec::new();
        let mut current = self.get_by_id(item_id).await?;
        while let Some(item) = current {
            match item.parent_id {
                Some(parent_id) => {
                    let parent = self.get_by_id(parent_id).await?;
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
        let roots = match root_id {
            Some(id) => self.get_by_id(id).await?.into_iter().collect::<Vec<_>>(),
            None => self.search(WorkItemFilter {
                depth: Some(0),
                ..Default::default()
            }).await?,
        };

        let mut out = Vec::with_capacity(roots.len());
        for root in roots {
            out.push(self.overview_node(root).await?);
        }
        Ok(out)
    }

    async fn apply_role_change(&self, item: &WorkItem) -> Result<WorkItem> {
        let row = sqlx::query(
            r#"
            UPDATE work_items
            SET role = ?, previous_role = ?, status_label = ?,
                role_changed_at = ?, modified_at = ?, summary_on_complete = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(role_to_string(item.role))
        .bind(item.previous_role.map(role_to_string))
        .bind(&item.status_label)
        .bind(item.role_changed_at)
        .bind(item.modified_at)
        .bind(&item.summary_on_complete)
        .bind(item.id)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;
        row_to_work_item(&row)
    }
}

impl SqliteStore {
    /// Box-recursive helper backing `overview`: one level of children,
    /// bucketed by role, per node.
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

#[async_trait]
impl NoteRepository for SqliteStore {
    async fn upsert(&self, note: NoteUpsert) -> Result<Note> {
        NoteValidator::validate_upsert(&note)?;
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO notes (item_id, key, role, body, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id, key) DO UPDATE SET
                role = excluded.role,
                body = excluded.body,
                modified_at = excluded.modified_at
            RETURNING *
            "#,
        )
        .bind(note.item_id)
        .bind(&note.key)
        .bind(note_role_to_string(note.role))
        .bind(&note.body)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;
        row_to_note(&row)
    }

    async fn get(&self, item_id: i64, key: &str) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE item_id = ? AND key = ?")
            .bind(item_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        row.as_ref().map(row_to_note).transpose()
    }

    async fn list_for_item(&self, item_id: i64, role: Option<NoteRole>) -> Result<Vec<Note>> {
        let rows = match role {
            Some(role) => sqlx::query("SELECT * FROM notes WHERE item_id = ? AND role = ? ORDER BY key")
                .bind(item_id)
                .bind(note_role_to_string(role))
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT * FROM notes WHERE item_id = ? ORDER BY key")
                .bind(item_id)
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_note).collect()
    }

    async fn delete(&self, item_id: i64, key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM notes WHERE item_id = ? AND key = ?")
            .bind(item_id)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(format!(
                "note '{key}' on item {item_id} not found"
            )));
        }
        Ok(())
    }

    async fn delete_all_for_item(&self, item_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE item_id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        Ok(())
    }
}

#[async_trait]
impl DependencyRepository for SqliteStore {
    async fn create_batch(&self, deps: Vec<NewDependency>) -> Result<Vec<Dependency>> {
        for dep in &deps {
            DependencyValidator::validate_new(dep)?;
        }

        // Build the existing blocking-edge graph (blocker -> dependent).
        let existing = sqlx::query(
            "SELECT from_item_id, to_item_id, dependency_type FROM dependencies \
             WHERE dependency_type IN ('BLOCKS', 'IS_BLOCKED_BY')",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;

        let mut graph: std::collections::HashMap<i64, Vec<i64>> = std::collections::HashMap::new();
        for row in &existing {
            let from: i64 = row.get("from_item_id");
            let to: i64 = row.get("to_item_id");
            let type_str: String = row.get("dependency_type");
            let (blocker, dependent) = if type_str == "IS_BLOCKED_BY" { (to, from) } else { (from, to) };
            graph.entry(blocker).or_default().push(dependent);
        }

        for dep in &deps {
            if !dep.dependency_type.is_blocking() {
                continue;
            }
            let (blocker, dependent) = if dep.dependency_type == DependencyType::IsBlockedBy {
                (dep.to_item_id, dep.from_item_id)
            } else {
                (dep.from_item_id, dep.to_item_id)
            };
            if reaches(&graph, dependent, blocker) {
                return Err(OrchestratorError::cyclic_dependency());
            }
            graph.entry(blocker).or_default().push(dependent);
        }

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_domain_error)?;
        let mut created = Vec::with_capacity(deps.len());
        let now = Utc::now();
        for dep in deps {
            let row = sqlx::query(
                r#"
                INSERT INTO dependencies (from_item_id, to_item_id, dependency_type, unblock_at, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(dep.from_item_id)
            .bind(dep.to_item_id)
            .bind(dependency_type_to_string(dep.dependency_type))
            .bind(dep.unblock_at.map(role_to_string))
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_domain_error)?;
            created.push(row_to_dependency(&row)?);
        }
        tx.commit().await.map_err(sqlx_error_to_domain_error)?;
        Ok(created)
    }

    async fn by_from_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE from_item_id = ?")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_dependency).collect()
    }

    async fn by_to_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE to_item_id = ?")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_dependency).collect()
    }

    async fn by_item(&self, item_id: i64) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE from_item_id = ? OR to_item_id = ?")
            .bind(item_id)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_dependency).collect()
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM dependencies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(format!("dependency {id} not found")));
        }
        Ok(())
    }

    async fn delete_by_pair(
        &self,
        from_item_id: i64,
        to_item_id: i64,
        dependency_type: Option<DependencyType>,
    ) -> Result<u64> {
        let result = match dependency_type {
            Some(t) => {
                sqlx::query(
                    "DELETE FROM dependencies WHERE from_item_id = ? AND to_item_id = ? AND dependency_type = ?",
                )
                .bind(from_item_id)
                .bind(to_item_id)
                .bind(dependency_type_to_string(t))
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query("DELETE FROM dependencies WHERE from_item_id = ? AND to_item_id = ?")
                    .bind(from_item_id)
                    .bind(to_item_id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(sqlx_error_to_domain_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_all_for_item(&self, item_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dependencies WHERE from_item_id = ? OR to_item_id = ?")
            .bind(item_id)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        Ok(result.rows_affected())
    }
}

/// BFS reachability: can `start` reach `target` in the blocker->dependent
/// graph? Used to reject dependency inserts that would close a cycle.
fn reaches(graph: &std::collections::HashMap<i64, Vec<i64>>, start: i64, target: i64) -> bool {
    if start == target {
        return true;
    }
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
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

#[async_trait]
impl RoleTransitionRepository for SqliteStore {
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
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO role_transitions
                (item_id, from_role, to_role, from_status_label, to_status_label, trigger, summary, transitioned_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(role_to_string(from_role))
        .bind(role_to_string(to_role))
        .bind(from_status_label)
        .bind(to_status_label)
        .bind(trigger_to_string(trigger))
        .bind(summary)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;
        row_to_role_transition(&row)
    }

    async fn by_item(&self, item_id: i64) -> Result<Vec<RoleTransitionRecord>> {
        let rows = sqlx::query("SELECT * FROM role_transitions WHERE item_id = ? ORDER BY transitioned_at ASC")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_role_transition).collect()
    }

    async fn since(&self, since: chrono::DateTime<Utc>) -> Result<Vec<RoleTransitionRecord>> {
        let rows = sqlx::query("SELECT * FROM role_transitions WHERE transitioned_at >= ? ORDER BY transitioned_at ASC")
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_role_transition).collect()
    }

    async fn in_range(
        &self,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> Result<Vec<RoleTransitionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM role_transitions WHERE transitioned_at >= ? AND transitioned_at <= ? ORDER BY transitioned_at ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_domain_error)?;
        rows.iter().map(row_to_role_transition).collect()
    }
}
