//! Note schema service: a pure read-through over an in-memory map of
//! tag -> ordered note contracts, loaded once at process start from
//! `<project>/.taskorchestrator/config.yaml` by the server crate.
//!
//! The service never touches the repositories or the filesystem itself;
//! it is handed an already-parsed map so it stays trivially testable
//! and so a missing or malformed config file degrades to schema-free
//! mode rather than aborting startup (loading/parsing lives in the
//! server crate's config module, which logs the warning).

use std::collections::HashMap;

use crate::models::{NoteRole, NoteSchema};

#[derive(Debug, Clone, Default)]
pub struct NoteSchemaService {
    schemas: HashMap<String, NoteSchema>,
}

impl NoteSchemaService {
    pub fn new(schemas: HashMap<String, NoteSchema>) -> Self {
        Self { schemas }
    }

    /// Schema-free mode: no schemas configured at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The active schema for an item is the entry list of the first tag
    /// (in order) that matches a known schema key; `None` means the item
    /// is in schema-free mode.
    pub fn schema_for_tags(&self, tags: &[String]) -> Option<&NoteSchema> {
        tags.iter().find_map(|tag| self.schemas.get(tag))
    }

    /// `true` iff the matched schema has any entry whose role is
    /// `review`; an unmatched item is treated as "skip REVIEW".
    pub fn has_review_phase(&self, tags: &[String]) -> bool {
        self.schema_for_tags(tags)
            .map(|entries| entries.iter().any(|e| e.role == NoteRole::Review))
            .unwrap_or(false)
    }

    /// Required entries for a given phase (e.g. the phase being left on
    /// a forward transition), used by the transition handler's gate
    /// check and by `get_context`.
    pub fn required_entries_for_role<'a>(
        &'a self,
        tags: &[String],
        role: NoteRole,
    ) -> Vec<&'a crate::models::NoteSchemaEntry> {
        self.schema_for_tags(tags)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.required && e.role == role)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All entries for the matched schema, in declared order; empty for
    /// schema-free items.
    pub fn entries_for_tags<'a>(&'a self, tags: &[String]) -> &'a [crate::models::NoteSchemaEntry] {
        self.schema_for_tags(tags).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_schema_free(&self, tags: &[String]) -> bool {
        self.schema_for_tags(tags).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteSchemaEntry;

    fn sample_schema() -> NoteSchema {
        vec![
            NoteSchemaEntry {
                key: "requirements".into(),
                role: NoteRole::Queue,
                required: true,
                description: "what must be true".into(),
                guidance: None,
            },
            NoteSchemaEntry {
                key: "design".into(),
                role: NoteRole::Queue,
                required: true,
                description: "approach".into(),
                guidance: None,
            },
            NoteSchemaEntry {
                key: "review-notes".into(),
                role: NoteRole::Review,
                required: false,
                description: "reviewer comments".into(),
                guidance: None,
            },
        ]
    }

    #[test]
    fn first_matching_tag_wins() {
        let mut map = HashMap::new();
        map.insert("feature-implementation".to_string(), sample_schema());
        let svc = NoteSchemaService::new(map);

        let tags = vec!["unrelated".to_string(), "feature-implementation".to_string()];
        assert!(svc.schema_for_tags(&tags).is_some());
        assert!(svc.schema_for_tags(&["other".to_string()]).is_none());
    }

    #[test]
    fn has_review_phase_reflects_schema() {
        let mut map = HashMap::new();
        map.insert("feature-implementation".to_string(), sample_schema());
        let svc = NoteSchemaService::new(map);
        assert!(svc.has_review_phase(&["feature-implementation".to_string()]));
        assert!(!svc.has_review_phase(&["unmatched".to_string()]));
    }

    #[test]
    fn required_entries_filtered_by_role() {
        let mut map = HashMap::new();
        map.insert("feature-implementation".to_string(), sample_schema());
        let svc = NoteSchemaService::new(map);
        let required =
            svc.required_entries_for_role(&["feature-implementation".to_string()], NoteRole::Queue);
        assert_eq!(required.len(), 2);
        let required_review =
            svc.required_entries_for_role(&["feature-implementation".to_string()], NoteRole::Review);
        assert!(required_review.is_empty());
    }

    #[test]
    fn empty_service_is_schema_free() {
        let svc = NoteSchemaService::empty();
        assert!(svc.is_schema_free(&["anything".to_string()]));
        assert!(!svc.has_review_phase(&["anything".to_string()]));
    }
}
