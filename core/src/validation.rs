//! Domain-invariant validation for work items, notes, and dependencies.
//!
//! These checks are pure: they never touch the repositories. Invariants
//! that require a read (depth-from-parent, cycle detection, duplicate
//! keys) are enforced by the repository implementations at write time,
//! since they need the current state of the store.

use crate::error::{OrchestratorError, Result};
use crate::models::{NewDependency, NewWorkItem, NoteUpsert, WorkItem};

/// Validation for work-item creation and update payloads.
pub struct WorkItemValidator;

impl WorkItemValidator {
    pub fn validate_new(item: &NewWorkItem) -> Result<()> {
        if item.title.trim().is_empty() {
            return Err(OrchestratorError::Validation("title must not be empty".into()));
        }
        Self::validate_tags(&item.tags)?;
        Ok(())
    }

    pub fn validate_tags(tags: &[String]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for tag in tags {
            if tag.trim().is_empty() {
                return Err(OrchestratorError::Validation("tags must not be empty strings".into()));
            }
            if !seen.insert(tag.as_str()) {
                return Err(OrchestratorError::Validation(format!(
                    "duplicate tag: {tag}"
                )));
            }
        }
        Ok(())
    }

    /// Given a parent's depth (`None` for a root item), computes the
    /// child's depth and rejects anything beyond [`WorkItem::MAX_DEPTH`].
    pub fn validate_depth(parent_depth: Option<i32>) -> Result<i32> {
        let depth = parent_depth.map(|d| d + 1).unwrap_or(0);
        if depth > WorkItem::MAX_DEPTH {
            return Err(OrchestratorError::depth_overflow(depth));
        }
        Ok(depth)
    }
}

/// Validation for note upserts.
pub struct NoteValidator;

impl NoteValidator {
    /// Keys are kebab-case identifiers: lowercase alphanumerics and
    /// hyphens, not starting or ending with a hyphen.
    pub fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(OrchestratorError::Validation("note key must not be empty".into()));
        }
        let valid = key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !key.starts_with('-')
            && !key.ends_with('-')
            && !key.contains("--");
        if !valid {
            return Err(OrchestratorError::Validation(format!(
                "note key '{key}' must be kebab-case (lowercase, digits, single hyphens)"
            )));
        }
        Ok(())
    }

    pub fn validate_upsert(note: &NoteUpsert) -> Result<()> {
        Self::validate_key(&note.key)?;
        if note.body.trim().is_empty() {
            return Err(OrchestratorError::Validation("note body must not be empty".into()));
        }
        Ok(())
    }
}

/// Validation for dependency creation.
pub struct DependencyValidator;

impl DependencyValidator {
    pub fn validate_new(dep: &NewDependency) -> Result<()> {
        if dep.from_item_id == dep.to_item_id {
            return Err(OrchestratorError::Validation(
                "a work item cannot depend on itself".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyType, NoteRole};

    #[test]
    fn rejects_empty_title() {
        let item = NewWorkItem {
            title: "   ".into(),
            ..Default::default()
        };
        assert!(WorkItemValidator::validate_new(&item).is_err());
    }

    #[test]
    fn rejects_duplicate_tags() {
        let item = NewWorkItem {
            title: "x".into(),
            tags: vec!["a".into(), "a".into()],
            ..Default::default()
        };
        assert!(WorkItemValidator::validate_new(&item).is_err());
    }

    #[test]
    fn depth_overflow_rejected_at_four() {
        assert_eq!(WorkItemValidator::validate_depth(None).unwrap(), 0);
        assert_eq!(WorkItemValidator::validate_depth(Some(2)).unwrap(), 3);
        assert!(WorkItemValidator::validate_depth(Some(3)).is_err());
    }

    #[test]
    fn note_keys_must_be_kebab_case() {
        assert!(NoteValidator::validate_key("requirements").is_ok());
        assert!(NoteValidator::validate_key("design-notes").is_ok());
        assert!(NoteValidator::validate_key("Bad_Key").is_err());
        assert!(NoteValidator::validate_key("-leading").is_err());
        assert!(NoteValidator::validate_key("double--hyphen").is_err());
    }

    #[test]
    fn dependency_cannot_self_reference() {
        let dep = NewDependency {
            from_item_id: 1,
            to_item_id: 1,
            dependency_type: DependencyType::Blocks,
            unblock_at: None,
        };
        assert!(DependencyValidator::validate_new(&dep).is_err());
    }

    #[test]
    fn note_upsert_rejects_empty_body() {
        let note = NoteUpsert {
            item_id: 1,
            key: "requirements".into(),
            role: NoteRole::Queue,
            body: "".into(),
        };
        assert!(NoteValidator::validate_upsert(&note).is_err());
    }
}
