//! Domain-level policy knobs read from `<project>/.taskorchestrator/config.yaml`:
//! `completion_cleanup` and `auto_cascade`. Parsing the YAML lives in the
//! server crate; this struct is the shape the domain layer consumes.

#[derive(Debug, Clone)]
pub struct CompletionCleanupConfig {
    pub enabled: bool,
    pub retain_tags: Vec<String>,
}

impl Default for CompletionCleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retain_tags: vec![
                "bug".to_string(),
                "bugfix".to_string(),
                "fix".to_string(),
                "hotfix".to_string(),
                "critical".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoCascadeConfig {
    pub enabled: bool,
    pub max_depth: u32,
}

impl Default for AutoCascadeConfig {
    fn default() -> Self {
        // Defaulted to enabled, depth 3 (see DESIGN.md).
        Self {
            enabled: true,
            max_depth: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    pub completion_cleanup: CompletionCleanupConfig,
    pub auto_cascade: AutoCascadeConfig,
}
