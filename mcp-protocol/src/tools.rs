//! The MCP tool surface: 13 tools bridging the rmcp `#[tool_router]`
//! macro to the domain core's repositories and transition handler.
//! Built directly over [`Repositories`] — the core crate already
//! type-erases its four traits into `Arc<dyn Trait>` fields, so a
//! second layer of generics here would just duplicate that erasure.
//!
//! Every handler follows the same shape: parse/validate request fields,
//! call into `task_core`, and hand the `Result` to
//! [`crate::serialization::ok`]/[`crate::serialization::err`] so the
//! uniform envelope — not a JSON-RPC protocol error — carries the
//! outcome back to the client.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rmcp::{
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    schemars::JsonSchema,
    ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use task_core::error::{Blocker, OrchestratorError, Result as CoreResult};
use task_core::models::{
    Dependency, DependencyType, NewDependency, NewWorkItem, NoteRole, NoteUpsert, Priority, Role,
    Trigger, UpdateWorkItem, WorkItem, WorkItemFilter,
};
use task_core::repository::Repositories;
use task_core::schema::NoteSchemaService;
use task_core::transition;
use task_core::workflow_config::WorkflowConfig;

use crate::error;
use crate::serialization::{self, ok};

/// How long a Work/Review item can sit without a role change before
/// `get_context`'s no-id summary calls it stalled. An implementation
/// decision recorded in DESIGN.md.
const STALLED_AFTER_HOURS: i64 = 24;

fn parse_priority(raw: Option<&str>) -> CoreResult<Option<Priority>> {
    match raw {
        None => Ok(None),
        Some(s) => Priority::parse(s)
            .map(Some)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown priority '{s}'"))),
    }
}

fn parse_role(raw: Option<&str>) -> CoreResult<Option<Role>> {
    match raw {
        None => Ok(None),
        Some(s) => Role::parse(s)
            .map(Some)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown role '{s}'"))),
    }
}

fn parse_trigger(raw: &str) -> CoreResult<Trigger> {
    Trigger::parse(raw).ok_or_else(|| {
        OrchestratorError::unknown_trigger(&["start", "complete", "block", "hold", "resume", "cancel"])
    })
}

fn parse_dependency_type(raw: &str) -> CoreResult<DependencyType> {
    DependencyType::parse(raw)
        .ok_or_else(|| OrchestratorError::Validation(format!("unknown dependency type '{raw}'")))
}

/// Unsatisfied blocking dependencies for `item`, regardless of the
/// trigger that would use them. Mirrors the gate check inside
/// `task_core::transition::validate`, which is private to that module
/// and only runs for a `Start`/`Complete` trigger on one item at a time;
/// `get_next_item`/`get_blocked_items` need the same check standalone
/// and across many items.
async fn unmet_blockers(item: &WorkItem, repos: &Repositories) -> CoreResult<Vec<Blocker>> {
    let incoming = repos.dependencies.by_to_item(item.id).await?;
    let mut blockers = Vec::new();
    for dep in incoming.iter().filter(|d| d.dependency_type.is_blocking()) {
        let blocker_id = dep.blocker_item_id();
        let blocker = repos.items.get_by_id(blocker_id).await?;
        let satisfied = blocker.as_ref().map(|b| dep.threshold_met(b.role)).unwrap_or(false);
        if !satisfied {
            blockers.push(Blocker {
                dependency_id: dep.id,
                blocker_item_id: blocker_id,
                blocker_role: blocker.map(|b| b.role.as_str().to_string()).unwrap_or_else(|| "MISSING".to_string()),
                required_role: dep.threshold().as_str().to_string(),
            });
        }
    }
    Ok(blockers)
}

// ---------------------------------------------------------------------
// manage_items
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateItemInput {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<String>,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub template_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateItemInput {
    pub id: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ManageItemsRequest {
    /// One of `create`, `update`, `delete`.
    pub operation: String,
    #[serde(default)]
    pub items: Vec<CreateItemInput>,
    #[serde(default)]
    pub updates: Vec<UpdateItemInput>,
    #[serde(default)]
    pub ids: Vec<i64>,
}

// ---------------------------------------------------------------------
// query_items
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ItemFilterInput {
    pub tag_substring: Option<String>,
    pub role: Option<String>,
    pub priority: Option<String>,
    pub parent_id: Option<i64>,
    pub depth: Option<i32>,
    pub title_contains: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryItemsRequest {
    /// One of `get`, `search`, `overview`, `export`.
    pub operation: String,
    pub id: Option<i64>,
    #[serde(default)]
    pub filter: ItemFilterInput,
    pub root_id: Option<i64>,
}

// ---------------------------------------------------------------------
// manage_notes / query_notes
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NoteUpsertInput {
    pub item_id: i64,
    pub key: String,
    pub role: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NoteKeyInput {
    pub item_id: i64,
    pub key: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ManageNotesRequest {
    /// One of `upsert`, `delete`.
    pub operation: String,
    #[serde(default)]
    pub upserts: Vec<NoteUpsertInput>,
    #[serde(default)]
    pub deletions: Vec<NoteKeyInput>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryNotesRequest {
    /// One of `get`, `list`.
    pub operation: String,
    pub item_id: i64,
    pub key: Option<String>,
    pub role: Option<String>,
}

// ---------------------------------------------------------------------
// manage_dependencies / query_dependencies
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DependencyInput {
    pub from_item_id: i64,
    pub to_item_id: i64,
    pub dependency_type: String,
    pub unblock_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FanOutInput {
    pub source: i64,
    pub targets: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FanInInput {
    pub sources: Vec<i64>,
    pub target: i64,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ManageDependenciesRequest {
    /// One of `create`, `delete`.
    pub operation: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyInput>,
    pub linear: Option<Vec<i64>>,
    pub fan_out: Option<FanOutInput>,
    pub fan_in: Option<FanInInput>,
    pub id: Option<i64>,
    pub from_item_id: Option<i64>,
    pub to_item_id: Option<i64>,
    pub dependency_type: Option<String>,
    pub delete_all_for_item: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryDependenciesRequest {
    pub item_id: i64,
    /// One of `from`, `to`, `both` (default `both`).
    pub direction: Option<String>,
    pub dependency_type: Option<String>,
    #[serde(default)]
    pub graph: bool,
}

// ---------------------------------------------------------------------
// advance_item / get_next_status / complete_tree
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TransitionInput {
    pub item_id: i64,
    pub trigger: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AdvanceItemRequest {
    pub transitions: Vec<TransitionInput>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetNextStatusRequest {
    pub item_id: i64,
    pub trigger: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompleteTreeRequest {
    pub item_ids: Vec<i64>,
    pub summary: Option<String>,
}

// ---------------------------------------------------------------------
// get_next_item / get_context / create_work_tree
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetNextItemRequest {
    pub parent_id: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetContextRequest {
    pub item_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TreeItemInput {
    pub local_id: String,
    pub parent_local_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub template_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TreeDependencyInput {
    pub from_local_id: String,
    pub to_local_id: String,
    pub dependency_type: String,
    pub unblock_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TreeNoteInput {
    pub local_id: String,
    pub key: String,
    pub role: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateWorkTreeRequest {
    pub root: TreeItemInput,
    #[serde(default)]
    pub children: Vec<TreeItemInput>,
    #[serde(default)]
    pub dependencies: Vec<TreeDependencyInput>,
    #[serde(default)]
    pub notes: Vec<TreeNoteInput>,
}

/// The handler backing all 13 tools. Holds the repository bundle, the
/// loaded note schema map, and the workflow policy knobs — all immutable
/// after server startup.
#[derive(Clone)]
pub struct WorkOrchestratorHandler {
    repos: Repositories,
    schema: Arc<NoteSchemaService>,
    config: Arc<WorkflowConfig>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

impl WorkOrchestratorHandler {
    pub fn new(repos: Repositories, schema: NoteSchemaService, config: WorkflowConfig) -> Self {
        Self {
            repos,
            schema: Arc::new(schema),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl WorkOrchestratorHandler {
    #[tool(description = "Create, update, or delete work items, each batched via an array")]
    async fn manage_items(
        &self,
        request: ManageItemsRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.operation.as_str() {
            "create" => {
                let mut created = Vec::with_capacity(request.items.len());
                for input in request.items {
                    let priority = match parse_priority(input.priority.as_deref()) {
                        Ok(p) => p,
                        Err(e) => return Ok(serialization::err(&e)),
                    };
                    let new_item = NewWorkItem {
                        title: input.title,
                        summary: input.summary,
                        tags: input.tags,
                        priority,
                        parent_id: input.parent_id,
                        template_ids: input.template_ids,
                    };
                    match self.repos.items.create(new_item).await {
                        Ok(item) => created.push(item),
                        Err(e) => return Ok(serialization::err(&e)),
                    }
                }
                Ok(ok(created))
            }
            "update" => {
                let mut updated = Vec::with_capacity(request.updates.len());
                for input in request.updates {
                    let priority = match parse_priority(input.priority.as_deref()) {
                        Ok(p) => p,
                        Err(e) => return Ok(serialization::err(&e)),
                    };
                    let updates = UpdateWorkItem {
                        title: input.title,
                        summary: input.summary,
                        tags: input.tags,
                        priority,
                    };
                    match self.repos.items.update(input.id, updates).await {
                        Ok(item) => updated.push(item),
                        Err(e) => return Ok(serialization::err(&e)),
                    }
                }
                Ok(ok(updated))
            }
            "delete" => {
                let mut deleted = Vec::with_capacity(request.ids.len());
                for id in request.ids {
                    match self.repos.items.delete(id).await {
                        Ok(()) => deleted.push(id),
                        Err(e) => return Ok(serialization::err(&e)),
                    }
                }
                Ok(ok(json!({ "deletedIds": deleted })))
            }
            other => Err(error::invalid_operation("manage_items", other)),
        }
    }

    #[tool(description = "Read work items by id, search, hierarchical overview, or full export")]
    async fn query_items(
        &self,
        request: QueryItemsRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.operation.as_str() {
            "get" => {
                let Some(id) = request.id else {
                    return Err(McpError::invalid_params("query_items(get) requires 'id'"));
                };
                match self.repos.items.get_by_id(id).await {
                    Ok(item) => Ok(ok(item)),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            "search" => {
                let role = match parse_role(request.filter.role.as_deref()) {
                    Ok(r) => r,
                    Err(e) => return Ok(serialization::err(&e)),
                };
                let priority = match parse_priority(request.filter.priority.as_deref()) {
                    Ok(p) => p,
                    Err(e) => return Ok(serialization::err(&e)),
                };
                let filter = WorkItemFilter {
                    tag_substring: request.filter.tag_substring,
                    role,
                    priority,
                    parent_id: request.filter.parent_id,
                    depth: request.filter.depth,
                    title_contains: request.filter.title_contains,
                    limit: request.filter.limit,
                    offset: request.filter.offset,
                };
                match self.repos.items.search(filter).await {
                    Ok(items) => Ok(ok(items)),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            "overview" => match self.repos.items.overview(request.root_id).await {
                Ok(nodes) => Ok(ok(nodes)),
                Err(e) => Ok(serialization::err(&e)),
            },
            "export" => match self.export_all().await {
                Ok(dump) => Ok(ok(dump)),
                Err(e) => Ok(serialization::err(&e)),
            },
            other => Err(error::invalid_operation("query_items", other)),
        }
    }

    #[tool(description = "Upsert or delete schema-gated notes on work items")]
    async fn manage_notes(
        &self,
        request: ManageNotesRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.operation.as_str() {
            "upsert" => {
                let mut saved = Vec::with_capacity(request.upserts.len());
                for input in request.upserts {
                    let Some(role) = NoteRole::parse(&input.role) else {
                        return Ok(serialization::err(&OrchestratorError::Validation(format!(
                            "unknown note role '{}'",
                            input.role
                        ))));
                    };
                    let upsert = NoteUpsert {
                        item_id: input.item_id,
                        key: input.key,
                        role,
                        body: input.body,
                    };
                    match self.repos.notes.upsert(upsert).await {
                        Ok(note) => saved.push(note),
                        Err(e) => return Ok(serialization::err(&e)),
                    }
                }
                Ok(ok(saved))
            }
            "delete" => {
                let mut deleted = Vec::with_capacity(request.deletions.len());
                for input in request.deletions {
                    match self.repos.notes.delete(input.item_id, &input.key).await {
                        Ok(()) => deleted.push(json!({ "itemId": input.item_id, "key": input.key })),
                        Err(e) => return Ok(serialization::err(&e)),
                    }
                }
                Ok(ok(deleted))
            }
            other => Err(error::invalid_operation("manage_notes", other)),
        }
    }

    #[tool(description = "Read a single note or list all notes on a work item")]
    async fn query_notes(
        &self,
        request: QueryNotesRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.operation.as_str() {
            "get" => {
                let Some(key) = request.key else {
                    return Err(McpError::invalid_params("query_notes(get) requires 'key'"));
                };
                match self.repos.notes.get(request.item_id, &key).await {
                    Ok(note) => Ok(ok(note)),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            "list" => {
                let role = match parse_note_role(request.role.as_deref()) {
                    Ok(r) => r,
                    Err(e) => return Ok(serialization::err(&e)),
                };
                match self.repos.notes.list_for_item(request.item_id, role).await {
                    Ok(notes) => Ok(ok(notes)),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            other => Err(error::invalid_operation("query_notes", other)),
        }
    }

    #[tool(description = "Create (explicit or linear/fan-out/fan-in pattern) or delete dependencies")]
    async fn manage_dependencies(
        &self,
        request: ManageDependenciesRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.operation.as_str() {
            "create" => {
                let mut new_deps = Vec::new();
                for d in &request.dependencies {
                    let dependency_type = match parse_dependency_type(&d.dependency_type) {
                        Ok(t) => t,
                        Err(e) => return Ok(serialization::err(&e)),
                    };
                    let unblock_at = match parse_role(d.unblock_at.as_deref()) {
                        Ok(r) => r,
                        Err(e) => return Ok(serialization::err(&e)),
                    };
                    new_deps.push(NewDependency {
                        from_item_id: d.from_item_id,
                        to_item_id: d.to_item_id,
                        dependency_type,
                        unblock_at,
                    });
                }
                if let Some(chain) = &request.linear {
                    for pair in chain.windows(2) {
                        new_deps.push(NewDependency {
                            from_item_id: pair[0],
                            to_item_id: pair[1],
                            dependency_type: DependencyType::Blocks,
                            unblock_at: None,
                        });
                    }
                }
                if let Some(fan_out) = &request.fan_out {
                    for &target in &fan_out.targets {
                        new_deps.push(NewDependency {
                            from_item_id: fan_out.source,
                            to_item_id: target,
                            dependency_type: DependencyType::Blocks,
                            unblock_at: None,
                        });
                    }
                }
                if let Some(fan_in) = &request.fan_in {
                    for &source in &fan_in.sources {
                        new_deps.push(NewDependency {
                            from_item_id: source,
                            to_item_id: fan_in.target,
                            dependency_type: DependencyType::Blocks,
                            unblock_at: None,
                        });
                    }
                }
                if new_deps.is_empty() {
                    return Ok(serialization::err(&OrchestratorError::Validation(
                        "no dependencies, linear/fan-out/fan-in pattern supplied".to_string(),
                    )));
                }
                match self.repos.dependencies.create_batch(new_deps).await {
                    Ok(created) => Ok(ok(created)),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            "delete" => {
                if let Some(id) = request.id {
                    return match self.repos.dependencies.delete(id).await {
                        Ok(()) => Ok(ok(json!({ "deletedId": id }))),
                        Err(e) => Ok(serialization::err(&e)),
                    };
                }
                if let Some(item_id) = request.delete_all_for_item {
                    return match self.repos.dependencies.delete_all_for_item(item_id).await {
                        Ok(count) => Ok(ok(json!({ "deletedCount": count }))),
                        Err(e) => Ok(serialization::err(&e)),
                    };
                }
                let (Some(from), Some(to)) = (request.from_item_id, request.to_item_id) else {
                    return Err(McpError::invalid_params(
                        "manage_dependencies(delete) requires 'id', 'deleteAllForItem', or a (from,to) pair",
                    ));
                };
                let dependency_type = match parse_dependency_type_opt(request.dependency_type.as_deref()) {
                    Ok(t) => t,
                    Err(e) => return Ok(serialization::err(&e)),
                };
                match self.repos.dependencies.delete_by_pair(from, to, dependency_type).await {
                    Ok(count) => Ok(ok(json!({ "deletedCount": count }))),
                    Err(e) => Ok(serialization::err(&e)),
                }
            }
            other => Err(error::invalid_operation("manage_dependencies", other)),
        }
    }

    #[tool(description = "Query an item's dependencies by direction/type, with an optional BFS graph walk")]
    async fn query_dependencies(
        &self,
        request: QueryDependenciesRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        let dependency_type = match parse_dependency_type_opt(request.dependency_type.as_deref()) {
            Ok(t) => t,
            Err(e) => return Ok(serialization::err(&e)),
        };

        if request.graph {
            return match self.walk_dependency_graph(request.item_id, dependency_type).await {
                Ok(walk) => Ok(ok(walk)),
                Err(e) => Ok(serialization::err(&e)),
            };
        }

        let fetch = match request.direction.as_deref() {
            Some("from") => self.repos.dependencies.by_from_item(request.item_id).await,
            Some("to") => self.repos.dependencies.by_to_item(request.item_id).await,
            Some("both") | None => self.repos.dependencies.by_item(request.item_id).await,
            Some(other) => {
                return Err(McpError::invalid_params(format!(
                    "query_dependencies: unknown direction '{other}'"
                )))
            }
        };
        match fetch {
            Ok(deps) => {
                let filtered: Vec<Dependency> = deps
                    .into_iter()
                    .filter(|d| dependency_type.map_or(true, |t| d.dependency_type == t))
                    .collect();
                Ok(ok(filtered))
            }
            Err(e) => Ok(serialization::err(&e)),
        }
    }

    #[tool(description = "Apply a batch of role-transition triggers, each with an optional completion summary")]
    async fn advance_item(
        &self,
        request: AdvanceItemRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        let mut results = Vec::with_capacity(request.transitions.len());
        for entry in request.transitions {
            let trigger = match parse_trigger(&entry.trigger) {
                Ok(t) => t,
                Err(e) => {
                    results.push(transition_failure(entry.item_id, &e));
                    continue;
                }
            };
            match transition::advance(entry.item_id, trigger, entry.summary, &self.repos, &self.schema, &self.config).await {
                Ok(outcome) => results.push(json!({
                    "itemId": entry.item_id,
                    "success": true,
                    "newRole": outcome.item.role,
                    "expectedNotes": outcome.expected_notes,
                    "cascadeEvents": outcome.cascade_events,
                    "cleanedUpChildren": outcome.cleaned_up_children,
                })),
                Err(e) => results.push(transition_failure(entry.item_id, &e)),
            }
        }
        Ok(ok(results))
    }

    #[tool(description = "Recommend the next work item to start, optionally scoped to a parent")]
    async fn get_next_item(
        &self,
        request: GetNextItemRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.recommend_next(request.parent_id, request.limit.unwrap_or(1)).await {
            Ok(items) => Ok(ok(items)),
            Err(e) => Ok(serialization::err(&e)),
        }
    }

    #[tool(description = "Enumerate blocked items: those in the BLOCKED role and those gated by unmet dependencies")]
    async fn get_blocked_items(&self) -> std::result::Result<CallToolResult, McpError> {
        match self.blocked_report().await {
            Ok(report) => Ok(ok(report)),
            Err(e) => Ok(serialization::err(&e)),
        }
    }

    #[tool(description = "Read-only dry run: resolve and validate a trigger without applying it")]
    async fn get_next_status(
        &self,
        request: GetNextStatusRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        let trigger = match parse_trigger(&request.trigger) {
            Ok(t) => t,
            Err(e) => return Ok(serialization::err(&e)),
        };
        match self.dry_run(request.item_id, trigger).await {
            Ok(report) => Ok(ok(report)),
            Err(e) => Ok(serialization::err(&e)),
        }
    }

    #[tool(description = "Create a root item with children, dependencies, and initial notes, rolling back any items already created if a later step fails")]
    async fn create_work_tree(
        &self,
        request: CreateWorkTreeRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.build_work_tree(request).await {
            Ok(summary) => Ok(ok(summary)),
            Err(e) => Ok(serialization::err(&e)),
        }
    }

    #[tool(description = "Batch-complete a set of items (TERMINAL via 'complete'), applying cascade along the way")]
    async fn complete_tree(
        &self,
        request: CompleteTreeRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        let mut results = Vec::with_capacity(request.item_ids.len());
        for item_id in request.item_ids {
            match transition::advance(item_id, Trigger::Complete, request.summary.clone(), &self.repos, &self.schema, &self.config).await {
                Ok(outcome) => results.push(json!({
                    "itemId": item_id,
                    "success": true,
                    "newRole": outcome.item.role,
                    "cascadeEvents": outcome.cascade_events,
                    "cleanedUpChildren": outcome.cleaned_up_children,
                })),
                Err(e) => results.push(transition_failure(item_id, &e)),
            }
        }
        Ok(ok(results))
    }

    #[tool(description = "An item's active note schema, expected notes, gate status, and guidance; or a fleet-wide summary without an id")]
    async fn get_context(
        &self,
        request: GetContextRequest,
    ) -> std::result::Result<CallToolResult, McpError> {
        match request.item_id {
            Some(id) => match self.item_context(id).await {
                Ok(context) => Ok(ok(context)),
                Err(e) => Ok(serialization::err(&e)),
            },
            None => match self.fleet_summary().await {
                Ok(summary) => Ok(ok(summary)),
                Err(e) => Ok(serialization::err(&e)),
            },
        }
    }
}

fn parse_note_role(raw: Option<&str>) -> CoreResult<Option<NoteRole>> {
    match raw {
        None => Ok(None),
        Some(s) => NoteRole::parse(s)
            .map(Some)
            .ok_or_else(|| OrchestratorError::Validation(format!("unknown note role '{s}'"))),
    }
}

fn parse_dependency_type_opt(raw: Option<&str>) -> CoreResult<Option<DependencyType>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_dependency_type(s).map(Some),
    }
}

fn transition_failure(item_id: i64, err: &OrchestratorError) -> serde_json::Value {
    json!({
        "itemId": item_id,
        "success": false,
        "error": crate::error::ErrorPayload::from(err),
    })
}

/// The non-`#[tool]` implementation: multi-step logic each tool method
/// above delegates to, kept out of the `#[tool_router]` impl block
/// because the macro only looks at bare `#[tool]`-annotated methods.
impl WorkOrchestratorHandler {
    async fn export_all(&self) -> CoreResult<serde_json::Value> {
        let items = self.repos.items.search(WorkItemFilter::default()).await?;
        let mut notes = Vec::new();
        let mut dependencies = Vec::new();
        for item in &items {
            notes.extend(self.repos.notes.list_for_item(item.id, None).await?);
            dependencies.extend(self.repos.dependencies.by_from_item(item.id).await?);
        }
        Ok(json!({ "items": items, "notes": notes, "dependencies": dependencies }))
    }

    async fn walk_dependency_graph(
        &self,
        item_id: i64,
        dependency_type: Option<DependencyType>,
    ) -> CoreResult<serde_json::Value> {
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        let mut edges = Vec::new();
        queue.push_back(item_id);
        visited.insert(item_id);

        while let Some(current) = queue.pop_front() {
            let neighbors = self.repos.dependencies.by_item(current).await?;
            for dep in neighbors.into_iter().filter(|d| dependency_type.map_or(true, |t| d.dependency_type == t)) {
                let other = if dep.from_item_id == current { dep.to_item_id } else { dep.from_item_id };
                edges.push(dep.clone());
                if visited.insert(other) {
                    queue.push_back(other);
                }
            }
        }
        Ok(json!({
            "nodes": visited.into_iter().collect::<Vec<_>>(),
            "edges": edges,
        }))
    }

    async fn recommend_next(&self, parent_id: Option<i64>, limit: u32) -> CoreResult<Vec<WorkItem>> {
        let mut candidates = Vec::new();
        for role in [Role::Queue, Role::Work, Role::Review] {
            let filter = WorkItemFilter {
                role: Some(role),
                parent_id,
                ..Default::default()
            };
            candidates.extend(self.repos.items.search(filter).await?);
        }
        candidates.sort_by_key(|i| (i.priority.sort_rank(), i.created_at));

        let mut recommended = Vec::new();
        for item in candidates {
            if unmet_blockers(&item, &self.repos).await?.is_empty() {
                recommended.push(item);
                if recommended.len() as u32 >= limit {
                    break;
                }
            }
        }
        Ok(recommended)
    }

    async fn blocked_report(&self) -> CoreResult<serde_json::Value> {
        let role_blocked = self
            .repos
            .items
            .search(WorkItemFilter { role: Some(Role::Blocked), ..Default::default() })
            .await?;

        let active = self.repos.items.search(WorkItemFilter::default()).await?;
        let mut dependency_blocked = Vec::new();
        for item in active.into_iter().filter(|i| !i.is_terminal() && i.role != Role::Blocked) {
            let blockers = unmet_blockers(&item, &self.repos).await?;
            if !blockers.is_empty() {
                dependency_blocked.push(json!({ "item": item, "blockers": blockers }));
            }
        }

        Ok(json!({
            "roleBlocked": role_blocked,
            "dependencyBlocked": dependency_blocked,
        }))
    }

    async fn dry_run(&self, item_id: i64, trigger: Trigger) -> CoreResult<serde_json::Value> {
        let item = self
            .repos
            .items
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found_item(item_id))?;

        let has_review = self.schema.has_review_phase(&item.tags);
        let resolution = transition::resolve(item.role, trigger, has_review, item.previous_role)?;
        let outcome = transition::validate(&item, trigger, resolution.target_role, &self.repos, &self.schema).await?;

        let (validation, missing_notes, blockers) = match outcome {
            transition::ValidationOutcome::Valid => ("valid", Vec::new(), Vec::new()),
            transition::ValidationOutcome::NotesMissing(keys) => ("notes_missing", keys, Vec::new()),
            transition::ValidationOutcome::DependenciesUnsatisfied(b) => ("dependencies_unsatisfied", Vec::new(), b),
        };

        Ok(json!({
            "itemId": item_id,
            "currentRole": item.role,
            "trigger": trigger,
            "wouldTransitionTo": resolution.target_role,
            "validation": validation,
            "missingNotes": missing_notes,
            "blockers": blockers,
        }))
    }

    /// Builds the tree, compensating on failure: work items are created
    /// one at a time through the plain repository, so a later step (a
    /// cyclic dependency, an unresolved local id) can fail after some
    /// items already persisted. On any error, every item created during
    /// this call is deleted, in reverse creation order (descendants
    /// before ancestors) so no orphaned fragment survives — the closest
    /// approximation to a single transaction the four separate repository
    /// traits allow.
    async fn build_work_tree(&self, request: CreateWorkTreeRequest) -> CoreResult<serde_json::Value> {
        let mut created_item_ids: Vec<i64> = Vec::new();
        match self.try_build_work_tree(request, &mut created_item_ids).await {
            Ok(value) => Ok(value),
            Err(e) => {
                for id in created_item_ids.into_iter().rev() {
                    let _ = self.repos.items.delete(id).await;
                }
                Err(e)
            }
        }
    }

    async fn try_build_work_tree(
        &self,
        request: CreateWorkTreeRequest,
        created_item_ids: &mut Vec<i64>,
    ) -> CoreResult<serde_json::Value> {
        let mut ids: HashMap<String, i64> = HashMap::new();

        let root_priority = parse_priority(request.root.priority.as_deref())?;
        let root = self
            .repos
            .items
            .create(NewWorkItem {
                title: request.root.title.clone(),
                summary: request.root.summary.clone(),
                tags: request.root.tags.clone(),
                priority: root_priority,
                parent_id: None,
                template_ids: request.root.template_ids.clone(),
            })
            .await?;
        created_item_ids.push(root.id);
        let root_local_id = request.root.local_id.clone();
        ids.insert(root_local_id.clone(), root.id);
        let mut created_items = vec![root];

        let mut pending: Vec<TreeItemInput> = request.children;
        while !pending.is_empty() {
            let mut progressed = false;
            let mut still_pending = Vec::new();
            for child in pending {
                let parent_key = child.parent_local_id.clone().unwrap_or_else(|| root_local_id.clone());
                match ids.get(&parent_key).copied() {
                    Some(parent_id) => {
                        let priority = parse_priority(child.priority.as_deref())?;
                        let saved = self
                            .repos
                            .items
                            .create(NewWorkItem {
                                title: child.title.clone(),
                                summary: child.summary.clone(),
                                tags: child.tags.clone(),
                                priority,
                                parent_id: Some(parent_id),
                                template_ids: child.template_ids.clone(),
                            })
                            .await?;
                        created_item_ids.push(saved.id);
                        ids.insert(child.local_id.clone(), saved.id);
                        created_items.push(saved);
                        progressed = true;
                    }
                    None => still_pending.push(child),
                }
            }
            if !progressed {
                return Err(OrchestratorError::Validation(
                    "create_work_tree: unresolved parent_local_id among children".to_string(),
                ));
            }
            pending = still_pending;
        }

        let mut new_deps = Vec::with_capacity(request.dependencies.len());
        for dep in &request.dependencies {
            let from_item_id = resolve_local_id(&ids, &dep.from_local_id)?;
            let to_item_id = resolve_local_id(&ids, &dep.to_local_id)?;
            new_deps.push(NewDependency {
                from_item_id,
                to_item_id,
                dependency_type: parse_dependency_type(&dep.dependency_type)?,
                unblock_at: parse_role(dep.unblock_at.as_deref())?,
            });
        }
        let created_deps = if new_deps.is_empty() {
            Vec::new()
        } else {
            self.repos.dependencies.create_batch(new_deps).await?
        };

        let mut created_notes = Vec::with_capacity(request.notes.len());
        for note in &request.notes {
            let item_id = resolve_local_id(&ids, &note.local_id)?;
            let role = NoteRole::parse(&note.role)
                .ok_or_else(|| OrchestratorError::Validation(format!("unknown note role '{}'", note.role)))?;
            created_notes.push(
                self.repos
                    .notes
                    .upsert(NoteUpsert { item_id, key: note.key.clone(), role, body: note.body.clone() })
                    .await?,
            );
        }

        Ok(json!({
            "items": created_items,
            "dependencies": created_deps,
            "notes": created_notes,
            "localIds": ids,
        }))
    }

    async fn item_context(&self, item_id: i64) -> CoreResult<serde_json::Value> {
        let item = self
            .repos
            .items
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found_item(item_id))?;

        let expected_notes = transition::expected_notes_for(&item, &self.repos, &self.schema).await?;
        let missing_required_notes: Vec<&str> = expected_notes
            .iter()
            .filter(|n| n.required && !n.exists)
            .map(|n| n.key.as_str())
            .collect();
        let blockers = unmet_blockers(&item, &self.repos).await?;
        let can_advance = missing_required_notes.is_empty() && blockers.is_empty();
        let guidance_pointer = self
            .schema
            .entries_for_tags(&item.tags)
            .iter()
            .find(|e| e.required && !e.description.is_empty() && missing_required_notes.contains(&e.key.as_str()))
            .and_then(|e| e.guidance.clone());

        Ok(json!({
            "item": item,
            "schemaFree": self.schema.is_schema_free(&item.tags),
            "expectedNotes": expected_notes,
            "gateStatus": {
                "canAdvance": can_advance,
                "missingRequiredNotes": missing_required_notes,
                "unsatisfiedDependencies": blockers,
            },
            "guidancePointer": guidance_pointer,
        }))
    }

    async fn fleet_summary(&self) -> CoreResult<serde_json::Value> {
        let items = self.repos.items.search(WorkItemFilter::default()).await?;
        let mut counts = task_core::repository::RoleCounts::default();
        let mut stalled = Vec::new();
        let cutoff = Utc::now() - Duration::hours(STALLED_AFTER_HOURS);

        for item in &items {
            match item.role {
                Role::Queue => counts.queue += 1,
                Role::Work => counts.work += 1,
                Role::Review => counts.review += 1,
                Role::Terminal => counts.terminal += 1,
                Role::Blocked => counts.blocked += 1,
            }
            if matches!(item.role, Role::Work | Role::Review) && item.role_changed_at < cutoff {
                stalled.push(item.id);
            }
        }

        Ok(json!({
            "totalItems": items.len(),
            "roleCounts": counts,
            "stalledItemIds": stalled,
        }))
    }
}

fn resolve_local_id(ids: &HashMap<String, i64>, local_id: &str) -> CoreResult<i64> {
    ids.get(local_id)
        .copied()
        .ok_or_else(|| OrchestratorError::Validation(format!("unknown local_id '{local_id}' in work tree")))
}

#[tool_handler]
impl ServerHandler for WorkOrchestratorHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Task orchestration server: work items move Queue -> Work -> Review -> Terminal \
                 (with Blocked as a side-state), gated by schema-defined notes and typed \
                 dependencies. Use get_context and get_next_status before advance_item to \
                 understand what a transition requires."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocks::in_memory_repositories;

    fn handler() -> WorkOrchestratorHandler {
        WorkOrchestratorHandler::new(in_memory_repositories(), NoteSchemaService::empty(), WorkflowConfig::default())
    }

    #[tokio::test]
    async fn manage_items_create_then_query_items_get_round_trip() {
        let h = handler();
        let created = h
            .manage_items(ManageItemsRequest {
                operation: "create".into(),
                items: vec![CreateItemInput {
                    title: "root task".into(),
                    summary: String::new(),
                    tags: vec![],
                    priority: None,
                    parent_id: None,
                    template_ids: vec![],
                }],
                updates: vec![],
                ids: vec![],
            })
            .await
            .unwrap();
        assert_eq!(created.is_error, Some(false));

        let fetched = h
            .query_items(QueryItemsRequest {
                operation: "get".into(),
                id: Some(1),
                filter: ItemFilterInput::default(),
                root_id: None,
            })
            .await
            .unwrap();
        assert_eq!(fetched.is_error, Some(false));
    }

    #[tokio::test]
    async fn advance_item_unknown_trigger_reports_validation_error() {
        let h = handler();
        let result = h
            .advance_item(AdvanceItemRequest {
                transitions: vec![TransitionInput { item_id: 1, trigger: "nonsense".into(), summary: None }],
            })
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
    }

    #[tokio::test]
    async fn create_work_tree_resolves_parent_local_ids() {
        let h = handler();
        let result = h
            .create_work_tree(CreateWorkTreeRequest {
                root: TreeItemInput {
                    local_id: "root".into(),
                    parent_local_id: None,
                    title: "feature".into(),
                    summary: String::new(),
                    tags: vec![],
                    priority: None,
                    template_ids: vec![],
                },
                children: vec![TreeItemInput {
                    local_id: "child-1".into(),
                    parent_local_id: Some("root".into()),
                    title: "subtask".into(),
                    summary: String::new(),
                    tags: vec![],
                    priority: None,
                    template_ids: vec![],
                }],
                dependencies: vec![],
                notes: vec![],
            })
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
    }
}
