//! Process-level configuration.
//!
//! Two layers, loaded independently:
//! - [`ServerConfig`] — connection/runtime knobs, read from bare
//!   environment variables via the `config` crate's [`Environment`]
//!   source (no prefix: `DATABASE_PATH`, `USE_FLYWAY`, `AGENT_CONFIG_DIR`,
//!   `LOG_LEVEL`, `DATABASE_MAX_CONNECTIONS`, `DATABASE_SHOW_SQL`).
//! - [`WorkflowSettings`] — domain policy (note schemas, completion
//!   cleanup, auto-cascade), read from
//!   `<AGENT_CONFIG_DIR or cwd>/.taskorchestrator/config.yaml`. A missing
//!   file means schema-free mode with default workflow policy; a
//!   malformed entry is skipped with a `tracing::warn!`, not a fatal
//!   error, so one bad tag never blocks the whole server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment};
use serde::Deserialize;

use task_core::{AutoCascadeConfig, CompletionCleanupConfig, NoteSchema, WorkflowConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub database_path: String,
    #[serde(default)]
    pub use_flyway: bool,
    pub agent_config_dir: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub database_show_sql: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl ServerConfig {
    /// `DATABASE_PATH` is the only variable without a production-ready
    /// default; it falls back to a relative `taskorchestrator.sqlite` so
    /// an un-configured run still has somewhere to write.
    pub fn from_env() -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .set_default("database_path", "taskorchestrator.sqlite")?
            .set_default("use_flyway", false)?
            .set_default("log_level", "info")?
            .set_default("database_max_connections", 5)?
            .set_default("database_show_sql", false)?
            .add_source(Environment::default().separator("_").try_parsing(true));

        let config = builder.build().context("failed to build server configuration")?;
        config
            .try_deserialize()
            .context("failed to deserialize server configuration")
    }

    /// Catches the values the `config` crate's deserializer can't reject
    /// on its own (an empty path, an unrecognized log level).
    pub fn validate(&self) -> Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("DATABASE_PATH must not be empty");
        }
        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "LOG_LEVEL must be one of trace, debug, info, warn, error; got '{other}'"
            ),
        }
        Ok(())
    }

    /// Directory that holds `.taskorchestrator/config.yaml` — the
    /// configured `AGENT_CONFIG_DIR`, or the process's current directory.
    pub fn agent_config_dir(&self) -> PathBuf {
        match &self.agent_config_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn workflow_config_path(&self) -> PathBuf {
        self.agent_config_dir()
            .join(".taskorchestrator")
            .join("config.yaml")
    }
}

/// On-disk shape of `.taskorchestrator/config.yaml`. Every field is
/// optional: an absent or empty file is valid and means "no note
/// schemas, default workflow policy".
#[derive(Debug, Clone, Default, Deserialize)]
struct WorkflowFileConfig {
    #[serde(default)]
    note_schemas: HashMap<String, NoteSchema>,
    #[serde(default)]
    completion_cleanup: Option<CompletionCleanupFile>,
    #[serde(default)]
    auto_cascade: Option<AutoCascadeFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionCleanupFile {
    enabled: Option<bool>,
    #[serde(rename = "retainTags", alias = "retain_tags")]
    retain_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct AutoCascadeFile {
    enabled: Option<bool>,
    #[serde(rename = "maxDepth", alias = "max_depth")]
    max_depth: Option<u32>,
}

/// The parsed product of `.taskorchestrator/config.yaml`: a note-schema
/// map ready for [`task_core::NoteSchemaService::new`] plus the workflow
/// policy struct the transition and cascade handlers consume.
pub struct WorkflowSettings {
    pub note_schemas: HashMap<String, NoteSchema>,
    pub workflow: WorkflowConfig,
}

/// Loads and validates `path`. A missing file is not an error — it is the
/// documented way to run the server in schema-free mode. A file that
/// exists but fails to parse as YAML is a startup error, since that
/// almost always means a typo the operator wants surfaced immediately
/// rather than silently discarded.
pub fn load_workflow_settings(path: &Path) -> Result<WorkflowSettings> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no workflow config file found, running schema-free");
        return Ok(WorkflowSettings {
            note_schemas: HashMap::new(),
            workflow: WorkflowConfig::default(),
        });
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: WorkflowFileConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse {} as YAML", path.display()))?;

    let mut note_schemas = HashMap::new();
    for (tag, entries) in parsed.note_schemas {
        if entries.iter().any(|e| e.key.trim().is_empty()) {
            tracing::warn!(tag = %tag, "skipping note schema with a blank entry key");
            continue;
        }
        note_schemas.insert(tag, entries);
    }

    let completion_cleanup = parsed
        .completion_cleanup
        .map(|file| CompletionCleanupConfig {
            enabled: file.enabled.unwrap_or(true),
            retain_tags: file
                .retain_tags
                .unwrap_or_else(|| CompletionCleanupConfig::default().retain_tags),
        })
        .unwrap_or_default();

    let auto_cascade = parsed
        .auto_cascade
        .map(|file| AutoCascadeConfig {
            enabled: file.enabled.unwrap_or(true),
            max_depth: file.max_depth.unwrap_or(3),
        })
        .unwrap_or_default();

    Ok(WorkflowSettings {
        note_schemas,
        workflow: WorkflowConfig {
            completion_cleanup,
            auto_cascade,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_schema_free() {
        let settings = load_workflow_settings(Path::new("/nonexistent/config.yaml")).unwrap();
        assert!(settings.note_schemas.is_empty());
        assert!(settings.workflow.auto_cascade.enabled);
    }

    #[test]
    fn parses_schemas_and_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
note_schemas:
  feature:
    - key: acceptance-criteria
      role: queue
      required: true
      description: "What done looks like"
completion_cleanup:
  enabled: false
  retainTags: [bug]
auto_cascade:
  enabled: true
  maxDepth: 1
"#
        )
        .unwrap();

        let settings = load_workflow_settings(file.path()).unwrap();
        assert_eq!(settings.note_schemas["feature"].len(), 1);
        assert!(!settings.workflow.completion_cleanup.enabled);
        assert_eq!(settings.workflow.completion_cleanup.retain_tags, vec!["bug"]);
        assert_eq!(settings.workflow.auto_cascade.max_depth, 1);
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
note_schemas:
  broken:
    - key: ""
      role: queue
      required: true
      description: "blank key, should be skipped"
  fine:
    - key: summary
      role: work
      required: false
      description: "kept"
"#
        )
        .unwrap();

        let settings = load_workflow_settings(file.path()).unwrap();
        assert!(!settings.note_schemas.contains_key("broken"));
        assert!(settings.note_schemas.contains_key("fine"));
    }

    #[test]
    fn server_config_rejects_empty_path() {
        let mut config = ServerConfig {
            database_path: String::new(),
            use_flyway: false,
            agent_config_dir: None,
            log_level: "info".into(),
            database_max_connections: 5,
            database_show_sql: false,
        };
        assert!(config.validate().is_err());
        config.database_path = "db.sqlite".into();
        assert!(config.validate().is_ok());
    }
}
