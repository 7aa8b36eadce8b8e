//! Workflow ancillaries: cascade detection/application and completion
//! cleanup.
//!
//! Cascade detection runs after every successful transition and returns
//! suggestions. When `auto_cascade.enabled`, `apply_auto_cascade`
//! re-enters the transition handler for each `AdvanceParent` suggestion,
//! bounded by `max_depth` re-entries. `DependentsUnblocked` is always
//! advisory — nothing auto-applies from it, it only tells a caller which
//! dependents just became eligible to start.

use crate::error::Result;
use crate::models::{Role, Trigger, WorkItem};
use crate::repository::Repositories;
use crate::schema::NoteSchemaService;
use crate::transition;
use crate::workflow_config::WorkflowConfig;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeEvent {
    /// All of `parent_id`'s direct children reached TERMINAL, or the
    /// first child entered WORK under a QUEUE parent; `suggested_trigger`
    /// is the trigger that would advance the parent.
    AdvanceParent {
        parent_id: i64,
        suggested_trigger: Trigger,
    },
    /// Item ids whose remaining blocking dependencies all cleared their
    /// threshold once `unblocked_by` crossed its own threshold.
    DependentsUnblocked {
        unblocked_by: i64,
        item_ids: Vec<i64>,
    },
}

/// Phase-4 detection: compute suggestions from the freshly-written
/// item's new state. Never mutates anything.
pub async fn detect(item: &WorkItem, repos: &Repositories) -> Result<Vec<CascadeEvent>> {
    let mut events = Vec::new();

    if let Some(parent_id) = item.parent_id {
        if let Some(parent) = repos.items.get_by_id(parent_id).await? {
            let siblings = repos.items.children(parent_id).await?;

            if item.role == Role::Terminal
                && !siblings.is_empty()
                && siblings.iter().all(|s| s.role == Role::Terminal)
                && parent.role != Role::Terminal
                && parent.role != Role::Blocked
            {
                // `Start` (not `Complete`) so `resolve` can route a WORK
                // parent to REVIEW when its schema has a review phase,
                // rather than jumping straight to TERMINAL.
                events.push(CascadeEvent::AdvanceParent {
                    parent_id,
                    suggested_trigger: Trigger::Start,
                });
            } else if item.role == Role::Work
                && parent.role == Role::Queue
                && siblings
                    .iter()
                    .filter(|s| s.id != item.id)
                    .all(|s| s.role == Role::Queue)
            {
                events.push(CascadeEvent::AdvanceParent {
                    parent_id,
                    suggested_trigger: Trigger::Start,
                });
            }
        }
    }

    let dependents = dependents_unblocked_by(item, repos).await?;
    if !dependents.is_empty() {
        events.push(CascadeEvent::DependentsUnblocked {
            unblocked_by: item.id,
            item_ids: dependents,
        });
    }

    Ok(events)
}

/// Dependents whose blocking edges are all now satisfied now that
/// `blocker` has reached its current role.
async fn dependents_unblocked_by(blocker: &WorkItem, repos: &Repositories) -> Result<Vec<i64>> {
    let edges = repos.dependencies.by_item(blocker.id).await?;
    let mut candidates = Vec::new();
    for edge in &edges {
        if !edge.dependency_type.is_blocking() || edge.blocker_item_id() != blocker.id {
            continue;
        }
        let dependent_id = if edge.blocker_item_id() == edge.from_item_id {
            edge.to_item_id
        } else {
            edge.from_item_id
        };
        if !edge.threshold_met(blocker.role) {
            continue;
        }
        candidates.push(dependent_id);
    }
    candidates.sort_unstable();
    candidates.dedup();

    let mut unblocked = Vec::new();
    for dependent_id in candidates {
        let all_deps = repos.dependencies.by_to_item(dependent_id).await?;
        let mut fully_satisfied = true;
        for dep in all_deps.iter().filter(|d| d.dependency_type.is_blocking()) {
            let blocker_role = repos.items.get_by_id(dep.blocker_item_id()).await?.map(|i| i.role);
            let satisfied = matches!(blocker_role, Some(r) if dep.threshold_met(r));
            if !satisfied {
                fully_satisfied = false;
                break;
            }
        }
        if fully_satisfied {
            unblocked.push(dependent_id);
        }
    }
    Ok(unblocked)
}

/// Recursively applies `AdvanceParent` suggestions, re-entering the full
/// three-phase transition handler for each one so every invariant holds
/// regardless of whether a user trigger or a cascade drove it. Bounded
/// by `max_depth` levels: a level-ordered queue rather than recursion,
/// since an async fn can't straightforwardly call itself without boxing.
pub async fn apply_auto_cascade(
    events: Vec<CascadeEvent>,
    repos: &Repositories,
    schema: &NoteSchemaService,
    config: &WorkflowConfig,
) -> Result<()> {
    let mut queue: std::collections::VecDeque<(CascadeEvent, u32)> =
        events.into_iter().map(|e| (e, 0)).collect();

    while let Some((event, depth)) = queue.pop_front() {
        if depth >= config.auto_cascade.max_depth {
            continue;
        }
        if let CascadeEvent::AdvanceParent {
            parent_id,
            suggested_trigger,
        } = event
        {
            if let Ok(outcome) =
                transition::advance(parent_id, suggested_trigger, None, repos, schema, config).await
            {
                for next in outcome.cascade_events {
                    queue.push_back((next, depth + 1));
                }
            }
        }
    }
    Ok(())
}

/// Completion cleanup: when a feature-class item (one that currently has
/// direct children) reaches TERMINAL, delete its direct children except
/// those carrying a retained tag. Grandchildren, projects with no
/// children, and standalone items are never touched.
pub async fn cleanup_on_completion(
    item: &WorkItem,
    repos: &Repositories,
    config: &WorkflowConfig,
) -> Result<Vec<i64>> {
    if !config.completion_cleanup.enabled || item.role != Role::Terminal {
        return Ok(Vec::new());
    }
    let children = repos.items.children(item.id).await?;
    if children.is_empty() {
        return Ok(Vec::new());
    }
    repos
        .items
        .delete_children_except_tags(item.id, &config.completion_cleanup.retain_tags)
        .await
}
