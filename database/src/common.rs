//! Row <-> model conversions and SQLite error mapping, shared by every
//! repository implementation in [`crate::sqlite`].

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use task_core::error::OrchestratorError;
use task_core::models::{
    Dependency, DependencyType, Note, NoteRole, Priority, Role, RoleTransitionRecord, Trigger,
    WorkItem,
};

pub fn role_to_string(role: Role) -> &'static str {
    role.as_str()
}

pub fn string_to_role(s: &str) -> Result<Role, OrchestratorError> {
    Role::parse(s).ok_or_else(|| OrchestratorError::Database(format!("invalid role in database: {s}")))
}

pub fn priority_to_string(priority: Priority) -> &'static str {
    priority.as_str()
}

pub fn string_to_priority(s: &str) -> Result<Priority, OrchestratorError> {
    Priority::parse(s)
        .ok_or_else(|| OrchestratorError::Database(format!("invalid priority in database: {s}")))
}

pub fn note_role_to_string(role: NoteRole) -> &'static str {
    role.as_str()
}

pub fn string_to_note_role(s: &str) -> Result<NoteRole, OrchestratorError> {
    NoteRole::parse(s)
        .ok_or_else(|| OrchestratorError::Database(format!("invalid note role in database: {s}")))
}

pub fn dependency_type_to_string(t: DependencyType) -> &'static str {
    t.as_str()
}

pub fn string_to_dependency_type(s: &str) -> Result<DependencyType, OrchestratorError> {
    DependencyType::parse(s)
        .ok_or_else(|| OrchestratorError::Database(format!("invalid dependency type in database: {s}")))
}

pub fn trigger_to_string(t: Trigger) -> &'static str {
    t.as_str()
}

pub fn string_to_trigger(s: &str) -> Result<Trigger, OrchestratorError> {
    Trigger::parse(s)
        .ok_or_else(|| OrchestratorError::Database(format!("invalid trigger in database: {s}")))
}

fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn json_to_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn tags_column(tags: &[String]) -> String {
    tags_to_json(tags)
}

pub fn row_to_work_item(row: &SqliteRow) -> Result<WorkItem, OrchestratorError> {
    let role_str: String = row.get("role");
    let priority_str: String = row.get("priority");
    let tags_raw: String = row.get("tags");
    let previous_role_str: Option<String> = row.try_get("previous_role").ok().flatten();

    Ok(WorkItem {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        tags: json_to_tags(&tags_raw),
        priority: string_to_priority(&priority_str)?,
        parent_id: row.try_get("parent_id").ok().flatten(),
        depth: row.get("depth"),
        role: string_to_role(&role_str)?,
        previous_role: previous_role_str.map(|s| string_to_role(&s)).transpose()?,
        status_label: row.try_get("status_label").ok().flatten(),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        modified_at: row.get::<DateTime<Utc>, _>("modified_at"),
        role_changed_at: row.get::<DateTime<Utc>, _>("role_changed_at"),
        summary_on_complete: row.try_get("summary_on_complete").ok().flatten(),
    })
}

pub fn row_to_note(row: &SqliteRow) -> Result<Note, OrchestratorError> {
    let role_str: String = row.get("role");
    Ok(Note {
        id: row.get("id"),
        item_id: row.get("item_id"),
        key: row.get("key"),
        role: string_to_note_role(&role_str)?,
        body: row.get("body"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        modified_at: row.get::<DateTime<Utc>, _>("modified_at"),
    })
}

pub fn row_to_dependency(row: &SqliteRow) -> Result<Dependency, OrchestratorError> {
    let type_str: String = row.get("dependency_type");
    let unblock_at_str: Option<String> = row.try_get("unblock_at").ok().flatten();
    Ok(Dependency {
        id: row.get("id"),
        from_item_id: row.get("from_item_id"),
        to_item_id: row.get("to_item_id"),
        dependency_type: string_to_dependency_type(&type_str)?,
        unblock_at: unblock_at_str.map(|s| string_to_role(&s)).transpose()?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

pub fn row_to_role_transition(row: &SqliteRow) -> Result<RoleTransitionRecord, OrchestratorError> {
    let from_role_str: String = row.get("from_role");
    let to_role_str: String = row.get("to_role");
    let trigger_str: String = row.get("trigger");
    Ok(RoleTransitionRecord {
        id: row.get("id"),
        item_id: row.get("item_id"),
        from_role: string_to_role(&from_role_str)?,
        to_role: string_to_role(&to_role_str)?,
        from_status_label: row.try_get("from_status_label").ok().flatten(),
        to_status_label: row.try_get("to_status_label").ok().flatten(),
        trigger: string_to_trigger(&trigger_str)?,
        summary: row.try_get("summary").ok().flatten(),
        transitioned_at: row.get::<DateTime<Utc>, _>("transitioned_at"),
    })
}

/// Maps a `sqlx::Error` onto the domain taxonomy, recognizing SQLite's
/// unique-constraint violations as `Conflict` rather than a generic
/// `Database` error.
pub fn sqlx_error_to_domain_error(err: sqlx::Error) -> OrchestratorError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.message().contains("UNIQUE constraint") {
            return OrchestratorError::Conflict(format!("constraint violation: {}", db_err.message()));
        }
    }
    OrchestratorError::Database(err.to_string())
}
