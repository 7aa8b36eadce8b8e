//! Builder pattern implementations for easy test data construction.

use task_core::models::{
    DependencyType, NewDependency, NewWorkItem, NoteUpsert, Priority, Role, UpdateWorkItem,
    WorkItemFilter,
};

#[derive(Default)]
pub struct NewWorkItemBuilder {
    item: NewWorkItem,
}

impl NewWorkItemBuilder {
    pub fn new() -> Self {
        Self {
            item: NewWorkItem {
                title: "Test item".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.item.title = title.into();
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.item.summary = summary.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.item.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.item.priority = Some(priority);
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.item.parent_id = Some(parent_id);
        self
    }

    pub fn build(self) -> NewWorkItem {
        self.item
    }
}

#[derive(Default)]
pub struct UpdateWorkItemBuilder {
    update: UpdateWorkItem,
}

impl UpdateWorkItemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.update.title = Some(title.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.update.summary = Some(summary.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.update.priority = Some(priority);
        self
    }

    pub fn build(self) -> UpdateWorkItem {
        self.update
    }
}

#[derive(Default)]
pub struct WorkItemFilterBuilder {
    filter: WorkItemFilter,
}

impl WorkItemFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.filter.role = Some(role);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.filter.priority = Some(priority);
        self
    }

    pub fn with_parent_id(mut self, parent_id: i64) -> Self {
        self.filter.parent_id = Some(parent_id);
        self
    }

    pub fn with_tag_substring(mut self, tag: impl Into<String>) -> Self {
        self.filter.tag_substring = Some(tag.into());
        self
    }

    pub fn build(self) -> WorkItemFilter {
        self.filter
    }
}

pub struct NoteUpsertBuilder {
    note: NoteUpsert,
}

impl NoteUpsertBuilder {
    pub fn new(item_id: i64, key: impl Into<String>) -> Self {
        Self {
            note: NoteUpsert {
                item_id,
                key: key.into(),
                role: task_core::models::NoteRole::Queue,
                body: "test note body".to_string(),
            },
        }
    }

    pub fn with_role(mut self, role: task_core::models::NoteRole) -> Self {
        self.note.role = role;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.note.body = body.into();
        self
    }

    pub fn build(self) -> NoteUpsert {
        self.note
    }
}

pub struct NewDependencyBuilder {
    dep: NewDependency,
}

impl NewDependencyBuilder {
    pub fn blocks(from_item_id: i64, to_item_id: i64) -> Self {
        Self {
            dep: NewDependency {
                from_item_id,
                to_item_id,
                dependency_type: DependencyType::Blocks,
                unblock_at: None,
            },
        }
    }

    pub fn relates_to(from_item_id: i64, to_item_id: i64) -> Self {
        Self {
            dep: NewDependency {
                from_item_id,
                to_item_id,
                dependency_type: DependencyType::RelatesTo,
                unblock_at: None,
            },
        }
    }

    pub fn with_threshold(mut self, role: Role) -> Self {
        self.dep.unblock_at = Some(role);
        self
    }

    pub fn build(self) -> NewDependency {
        self.dep
    }
}
