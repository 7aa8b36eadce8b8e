use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role in a work item's lifecycle.
///
/// Roles form the gated progression `Queue -> Work -> Review -> Terminal`,
/// with `Blocked` reachable from any of the first three and resumable back
/// to whichever role it was entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Queue,
    Work,
    Review,
    Terminal,
    Blocked,
}

impl Role {
    /// Ordinal used for dependency-threshold comparisons. `Blocked` sits
    /// below every other role and never satisfies a threshold.
    pub fn ordinal(self) -> i8 {
        match self {
            Role::Blocked => -1,
            Role::Queue => 0,
            Role::Work => 1,
            Role::Review => 2,
            Role::Terminal => 3,
        }
    }

    pub fn lowercase_name(self) -> &'static str {
        match self {
            Role::Queue => "queue",
            Role::Work => "work",
            Role::Review => "review",
            Role::Terminal => "terminal",
            Role::Blocked => "blocked",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Queue => "QUEUE",
            Role::Work => "WORK",
            Role::Review => "REVIEW",
            Role::Terminal => "TERMINAL",
            Role::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "QUEUE" => Some(Role::Queue),
            "WORK" => Some(Role::Work),
            "REVIEW" => Some(Role::Review),
            "TERMINAL" => Some(Role::Terminal),
            "BLOCKED" => Some(Role::Blocked),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The trigger driving a requested role transition. `Block` and `Hold` are
/// aliases for the same transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Complete,
    Block,
    Hold,
    Resume,
    Cancel,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Start => "start",
            Trigger::Complete => "complete",
            Trigger::Block => "block",
            Trigger::Hold => "hold",
            Trigger::Resume => "resume",
            Trigger::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Some(Trigger::Start),
            "complete" => Some(Trigger::Complete),
            "block" => Some(Trigger::Block),
            "hold" => Some(Trigger::Hold),
            "resume" => Some(Trigger::Resume),
            "cancel" => Some(Trigger::Cancel),
            _ => None,
        }
    }

    pub fn all() -> &'static [Trigger] {
        &[
            Trigger::Start,
            Trigger::Complete,
            Trigger::Block,
            Trigger::Hold,
            Trigger::Resume,
            Trigger::Cancel,
        ]
    }

    /// `block` and `hold` resolve identically.
    pub fn is_block_alias(self) -> bool {
        matches!(self, Trigger::Block | Trigger::Hold)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }

    /// Ordinal for descending sort (critical first).
    pub fn sort_rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work in the tree, depth 0-3, progressing through `Role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub parent_id: Option<i64>,
    pub depth: i32,
    pub role: Role,
    pub previous_role: Option<Role>,
    pub status_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub role_changed_at: DateTime<Utc>,
    pub summary_on_complete: Option<String>,
}

impl WorkItem {
    pub const MAX_DEPTH: i32 = 3;

    pub fn is_terminal(&self) -> bool {
        self.role == Role::Terminal
    }
}

/// Parameters for creating a new work item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Template ids referenced by a create call; unrecognized ones are
    /// silently ignored (no template registry exists in this core).
    #[serde(default)]
    pub template_ids: Vec<String>,
}

/// Partial update to a work item's non-role fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWorkItem {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
}

/// Filter/search parameters over work items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItemFilter {
    pub tag_substring: Option<String>,
    pub role: Option<Role>,
    pub priority: Option<Priority>,
    pub parent_id: Option<i64>,
    pub depth: Option<i32>,
    pub title_contains: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A structured note attached to a work item, gating transitions out of
/// its role's phase when required by the active schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub item_id: i64,
    pub key: String,
    pub role: NoteRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteRole {
    Queue,
    Work,
    Review,
}

impl NoteRole {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteRole::Queue => "queue",
            NoteRole::Work => "work",
            NoteRole::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "queue" => Some(NoteRole::Queue),
            "work" => Some(NoteRole::Work),
            "review" => Some(NoteRole::Review),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoteRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpsert {
    pub item_id: i64,
    pub key: String,
    pub role: NoteRole,
    pub body: String,
}

/// A typed link between two work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    Blocks,
    IsBlockedBy,
    RelatesTo,
}

impl DependencyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyType::Blocks => "BLOCKS",
            DependencyType::IsBlockedBy => "IS_BLOCKED_BY",
            DependencyType::RelatesTo => "RELATES_TO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BLOCKS" => Some(DependencyType::Blocks),
            "IS_BLOCKED_BY" => Some(DependencyType::IsBlockedBy),
            "RELATES_TO" => Some(DependencyType::RelatesTo),
            _ => None,
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, DependencyType::Blocks | DependencyType::IsBlockedBy)
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: i64,
    pub from_item_id: i64,
    pub to_item_id: i64,
    pub dependency_type: DependencyType,
    pub unblock_at: Option<Role>,
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    /// The item whose role must cross the threshold: for `IS_BLOCKED_BY`
    /// the blocker is the edge's `to_item_id`, otherwise its `from_item_id`.
    pub fn blocker_item_id(&self) -> i64 {
        if self.dependency_type == DependencyType::IsBlockedBy {
            self.to_item_id
        } else {
            self.from_item_id
        }
    }

    pub fn threshold(&self) -> Role {
        self.unblock_at.unwrap_or(Role::Terminal)
    }

    /// Whether a blocker currently at `blocker_role` satisfies this
    /// dependency's threshold. `Blocked` never satisfies any threshold,
    /// including on an `IS_BLOCKED_BY` edge — a blocked blocker can never
    /// unblock a dependent (see DESIGN.md).
    pub fn threshold_met(&self, blocker_role: Role) -> bool {
        blocker_role != Role::Blocked && blocker_role.ordinal() >= self.threshold().ordinal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDependency {
    pub from_item_id: i64,
    pub to_item_id: i64,
    pub dependency_type: DependencyType,
    pub unblock_at: Option<Role>,
}

/// Append-only audit row written on every successful role change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTransitionRecord {
    pub id: i64,
    pub item_id: i64,
    pub from_role: Role,
    pub to_role: Role,
    pub from_status_label: Option<String>,
    pub to_status_label: Option<String>,
    pub trigger: Trigger,
    pub summary: Option<String>,
    pub transitioned_at: DateTime<Utc>,
}

/// A single entry in a note schema, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSchemaEntry {
    pub key: String,
    pub role: NoteRole,
    pub required: bool,
    pub description: String,
    #[serde(default)]
    pub guidance: Option<String>,
}

/// An ordered schema of notes expected for items carrying a given tag.
pub type NoteSchema = Vec<NoteSchemaEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordinals_rank_blocked_lowest() {
        assert_eq!(Role::Blocked.ordinal(), -1);
        assert!(Role::Blocked.ordinal() < Role::Queue.ordinal());
        assert!(Role::Queue.ordinal() < Role::Work.ordinal());
        assert!(Role::Work.ordinal() < Role::Review.ordinal());
        assert!(Role::Review.ordinal() < Role::Terminal.ordinal());
    }

    #[test]
    fn role_parse_round_trips() {
        for role in [Role::Queue, Role::Work, Role::Review, Role::Terminal, Role::Blocked] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("nonsense"), None);
    }

    #[test]
    fn trigger_block_and_hold_are_aliases() {
        assert!(Trigger::Block.is_block_alias());
        assert!(Trigger::Hold.is_block_alias());
        assert!(!Trigger::Start.is_block_alias());
    }

    #[test]
    fn dependency_blocker_is_inverted_for_is_blocked_by() {
        let dep = Dependency {
            id: 1,
            from_item_id: 10,
            to_item_id: 20,
            dependency_type: DependencyType::IsBlockedBy,
            unblock_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(dep.blocker_item_id(), 20);

        let dep = Dependency {
            dependency_type: DependencyType::Blocks,
            ..dep
        };
        assert_eq!(dep.blocker_item_id(), 10);
    }

    #[test]
    fn dependency_threshold_defaults_to_terminal() {
        let dep = Dependency {
            id: 1,
            from_item_id: 1,
            to_item_id: 2,
            dependency_type: DependencyType::Blocks,
            unblock_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(dep.threshold(), Role::Terminal);

        let dep = Dependency {
            unblock_at: Some(Role::Work),
            ..dep
        };
        assert_eq!(dep.threshold(), Role::Work);
    }
}
