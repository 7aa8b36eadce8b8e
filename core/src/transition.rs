//! The transition handler: the three-phase algorithm (resolve, validate,
//! apply) that is the core of the orchestration engine.
//!
//! Phase 1 (`resolve`) is a pure function over the current role, trigger,
//! schema-review-phase flag, and previous role. Phase 2 (`validate`)
//! reads dependencies, blockers' current roles, and notes. Phase 3
//! (`advance`, which also drives phases 1-2) writes the change, appends
//! the audit row, computes cascade suggestions, and runs completion
//! cleanup. All three are exercised together by `advance`; `resolve` and
//! `validate` are also exposed standalone for `get_next_status`'s
//! read-only dry run.

use chrono::Utc;

use crate::cascade::{self, CascadeEvent};
use crate::error::{Blocker, OrchestratorError, Result};
use crate::models::{NoteRole, Role, RoleTransitionRecord, Trigger, WorkItem};
use crate::repository::Repositories;
use crate::schema::NoteSchemaService;
use crate::workflow_config::WorkflowConfig;

/// What happens to `status_label` when a resolution is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLabelAction {
    Preserve,
    Clear,
    Set(String),
}

/// Phase 1's output: the target role and how to handle `status_label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target_role: Role,
    pub status_label_action: StatusLabelAction,
}

impl Resolution {
    fn forward(target: Role) -> Self {
        Self {
            target_role: target,
            status_label_action: StatusLabelAction::Clear,
        }
    }

    fn to_blocked() -> Self {
        Self {
            target_role: Role::Blocked,
            status_label_action: StatusLabelAction::Preserve,
        }
    }

    fn cancel() -> Self {
        Self {
            target_role: Role::Terminal,
            status_label_action: StatusLabelAction::Set("cancelled".to_string()),
        }
    }
}

/// Phase 1 — no I/O. Maps `(currentRole, trigger, hasReviewPhase,
/// previousRole?)` to a target role.
pub fn resolve(
    current: Role,
    trigger: Trigger,
    has_review: bool,
    previous_role: Option<Role>,
) -> Result<Resolution> {
    use Role::*;
    use Trigger::*;

    match (current, trigger) {
        (Terminal, Start) | (Terminal, Complete) | (Terminal, Cancel) => {
            Err(OrchestratorError::already_terminal())
        }
        (Terminal, Block) | (Terminal, Hold) => Err(OrchestratorError::Validation(
            "cannot block a terminal item".to_string(),
        )),
        (Terminal, Resume) => Err(OrchestratorError::resume_on_non_blocked()),

        (Blocked, Start) | (Blocked, Complete) => Err(OrchestratorError::must_resume_first()),
        (Blocked, Block) | (Blocked, Hold) => Err(OrchestratorError::Validation(
            "item is already blocked".to_string(),
        )),
        (Blocked, Resume) => match previous_role {
            Some(role) => Ok(Resolution::forward(role)),
            None => Err(OrchestratorError::resume_without_previous_role()),
        },
        (Blocked, Cancel) => Ok(Resolution::cancel()),

        (Queue, Start) => Ok(Resolution::forward(Work)),
        (Work, Start) => Ok(Resolution::forward(if has_review { Review } else { Terminal })),
        (Review, Start) => Ok(Resolution::forward(Terminal)),

        (_, Complete) => Ok(Resolution::forward(Terminal)),
        (_, Block) | (_, Hold) => Ok(Resolution::to_blocked()),
        (_, Resume) => Err(OrchestratorError::resume_on_non_blocked()),
        (_, Cancel) => Ok(Resolution::cancel()),
    }
}

/// Phase 2's output.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    NotesMissing(Vec<String>),
    DependenciesUnsatisfied(Vec<Blocker>),
}

fn note_role_for(role: Role) -> Option<NoteRole> {
    match role {
        Role::Queue => Some(NoteRole::Queue),
        Role::Work => Some(NoteRole::Work),
        Role::Review => Some(NoteRole::Review),
        Role::Terminal | Role::Blocked => None,
    }
}

/// Phase 2 — reads dependencies and blockers' current roles, and (for a
/// forward `start`) the notes for the phase being left.
///
/// Gate checks are skipped entirely for `resume` and `cancel`: resume
/// only restores a role the item already earned its way into, and cancel
/// is the escape hatch that must always succeed regardless of blockers.
/// Both are implementation decisions recorded in DESIGN.md.
pub async fn validate(
    item: &WorkItem,
    trigger: Trigger,
    target: Role,
    repos: &Repositories,
    schema: &NoteSchemaService,
) -> Result<ValidationOutcome> {
    if target == Role::Blocked {
        return Ok(ValidationOutcome::Valid);
    }
    if !matches!(trigger, Trigger::Start | Trigger::Complete) {
        return Ok(ValidationOutcome::Valid);
    }

    let incoming = repos.dependencies.by_to_item(item.id).await?;
    let mut blockers = Vec::new();
    for dep in incoming.iter().filter(|d| d.dependency_type.is_blocking()) {
        let blocker_id = dep.blocker_item_id();
        let blocker = repos.items.get_by_id(blocker_id).await?;
        let satisfied = blocker
            .as_ref()
            .map(|b| dep.threshold_met(b.role))
            .unwrap_or(false);
        if !satisfied {
            blockers.push(Blocker {
                dependency_id: dep.id,
                blocker_item_id: blocker_id,
                blocker_role: blocker
                    .map(|b| b.role.as_str().to_string())
                    .unwrap_or_else(|| "MISSING".to_string()),
                required_role: dep.threshold().as_str().to_string(),
            });
        }
    }
    if !blockers.is_empty() {
        return Ok(ValidationOutcome::DependenciesUnsatisfied(blockers));
    }

    if trigger == Trigger::Start {
        if let Some(phase_left) = note_role_for(item.role) {
            let required = schema.required_entries_for_role(&item.tags, phase_left);
            let mut missing = Vec::new();
            for entry in required {
                let note = repos.notes.get(item.id, &entry.key).await?;
                let satisfied = note.map(|n| !n.body.trim().is_empty()).unwrap_or(false);
                if !satisfied {
                    missing.push(entry.key.clone());
                }
            }
            if !missing.is_empty() {
                return Ok(ValidationOutcome::NotesMissing(missing));
            }
        }
    }

    Ok(ValidationOutcome::Valid)
}

/// A note the active schema expects for the item's current or next
/// phase, annotated with whether it already exists. Used by
/// `advance_item`'s response and by `get_context`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExpectedNote {
    pub key: String,
    pub role: NoteRole,
    pub required: bool,
    pub exists: bool,
}

/// The full result of a successful `advance`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransitionOutcome {
    pub item: WorkItem,
    pub audit: RoleTransitionRecord,
    pub expected_notes: Vec<ExpectedNote>,
    pub cascade_events: Vec<CascadeEvent>,
    pub cleaned_up_children: Vec<i64>,
}

/// Drives all three phases for a single trigger and, if `auto_cascade`
/// is enabled, recursively re-enters itself for any parent-advancement
/// suggestions. Returns `DEPENDENCY_ERROR`/`VALIDATION_ERROR`-shaped
/// errors (via [`crate::error::OrchestratorError`]) on a refused gate.
pub async fn advance(
    item_id: i64,
    trigger: Trigger,
    summary: Option<String>,
    repos: &Repositories,
    schema: &NoteSchemaService,
    config: &WorkflowConfig,
) -> Result<TransitionOutcome> {
    let item = repos
        .items
        .get_by_id(item_id)
        .await?
        .ok_or_else(|| OrchestratorError::not_found_item(item_id))?;

    let has_review = schema.has_review_phase(&item.tags);
    let resolution = resolve(item.role, trigger, has_review, item.previous_role)?;

    match validate(&item, trigger, resolution.target_role, repos, schema).await? {
        ValidationOutcome::Valid => {}
        ValidationOutcome::NotesMissing(keys) => {
            return Err(OrchestratorError::missing_notes(keys));
        }
        ValidationOutcome::DependenciesUnsatisfied(blockers) => {
            return Err(OrchestratorError::Dependency(blockers));
        }
    }

    // Phase 3: re-read for the optimistic-concurrency check.
    let current = repos
        .items
        .get_by_id(item_id)
        .await?
        .ok_or_else(|| OrchestratorError::not_found_item(item_id))?;
    if current.role != item.role {
        return Err(OrchestratorError::Conflict(
            "item role changed since validation, retry the transition".to_string(),
        ));
    }

    let mut updated = current.clone();
    let now = Utc::now();
    updated.role = resolution.target_role;
    updated.role_changed_at = now;
    updated.modified_at = now;

    match resolution.target_role {
        Role::Blocked => updated.previous_role = Some(current.role),
        _ => {
            if current.role == Role::Blocked {
                updated.previous_role = None;
            }
        }
    }

    match &resolution.status_label_action {
        StatusLabelAction::Preserve => {}
        StatusLabelAction::Clear => updated.status_label = None,
        StatusLabelAction::Set(label) => updated.status_label = Some(label.clone()),
    }

    if resolution.target_role == Role::Terminal {
        if let Some(ref s) = summary {
            updated.summary_on_complete = Some(s.clone());
        }
    }

    let saved = repos.items.apply_role_change(&updated).await?;

    let audit = repos
        .transitions
        .append(
            item_id,
            current.role,
            saved.role,
            current.status_label.clone(),
            saved.status_label.clone(),
            trigger,
            summary,
        )
        .await?;

    let cascade_events = cascade::detect(&saved, repos).await?;
    if config.auto_cascade.enabled {
        cascade::apply_auto_cascade(cascade_events.clone(), repos, schema, config).await?;
    }

    let cleaned_up_children = cascade::cleanup_on_completion(&saved, repos, config).await?;

    let expected_notes = expected_notes_for(&saved, repos, schema).await?;

    Ok(TransitionOutcome {
        item: saved,
        audit,
        expected_notes,
        cascade_events,
        cleaned_up_children,
    })
}

/// The schema entries relevant to an item's *next* phase (the one it
/// would need to clear to advance again), with existence flags — used
/// to populate `advance_item`'s `expectedNotes` and `get_context`.
pub async fn expected_notes_for(
    item: &WorkItem,
    repos: &Repositories,
    schema: &NoteSchemaService,
) -> Result<Vec<ExpectedNote>> {
    let Some(phase) = note_role_for(item.role) else {
        return Ok(Vec::new());
    };
    let entries = schema.entries_for_tags(&item.tags);
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries.iter().filter(|e| e.role == phase) {
        let exists = repos
            .notes
            .get(item.id, &entry.key)
            .await?
            .map(|n| !n.body.trim().is_empty())
            .unwrap_or(false);
        out.push(ExpectedNote {
            key: entry.key.clone(),
            role: entry.role,
            required: entry.required,
            exists,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_start_goes_to_work() {
        let r = resolve(Role::Queue, Trigger::Start, true, None).unwrap();
        assert_eq!(r.target_role, Role::Work);
    }

    #[test]
    fn work_start_respects_review_phase() {
        let r = resolve(Role::Work, Trigger::Start, true, None).unwrap();
        assert_eq!(r.target_role, Role::Review);
        let r = resolve(Role::Work, Trigger::Start, false, None).unwrap();
        assert_eq!(r.target_role, Role::Terminal);
    }

    #[test]
    fn review_start_goes_to_terminal() {
        let r = resolve(Role::Review, Trigger::Start, true, None).unwrap();
        assert_eq!(r.target_role, Role::Terminal);
    }

    #[test]
    fn terminal_start_or_complete_errors() {
        assert!(resolve(Role::Terminal, Trigger::Start, true, None).is_err());
        assert!(resolve(Role::Terminal, Trigger::Complete, true, None).is_err());
    }

    #[test]
    fn blocked_start_or_complete_requires_resume() {
        let err = resolve(Role::Blocked, Trigger::Start, true, Some(Role::Work)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn complete_jumps_straight_to_terminal() {
        let r = resolve(Role::Queue, Trigger::Complete, true, None).unwrap();
        assert_eq!(r.target_role, Role::Terminal);
    }

    #[test]
    fn block_and_hold_are_aliases_and_preserve_status() {
        for trigger in [Trigger::Block, Trigger::Hold] {
            let r = resolve(Role::Work, trigger, true, None).unwrap();
            assert_eq!(r.target_role, Role::Blocked);
            assert_eq!(r.status_label_action, StatusLabelAction::Preserve);
        }
    }

    #[test]
    fn resume_restores_previous_role() {
        let r = resolve(Role::Blocked, Trigger::Resume, true, Some(Role::Review)).unwrap();
        assert_eq!(r.target_role, Role::Review);
    }

    #[test]
    fn resume_without_previous_role_errors() {
        assert!(resolve(Role::Blocked, Trigger::Resume, true, None).is_err());
    }

    #[test]
    fn resume_on_non_blocked_errors() {
        assert!(resolve(Role::Work, Trigger::Resume, true, None).is_err());
    }

    #[test]
    fn cancel_sets_cancelled_label_except_from_terminal() {
        let r = resolve(Role::Work, Trigger::Cancel, true, None).unwrap();
        assert_eq!(r.target_role, Role::Terminal);
        assert_eq!(
            r.status_label_action,
            StatusLabelAction::Set("cancelled".to_string())
        );
        assert!(resolve(Role::Terminal, Trigger::Cancel, true, None).is_err());
    }
}
