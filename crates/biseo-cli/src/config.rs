//! Application configuration loaded from `config/default.toml`.
//!
//! Every section and key is optional.  A missing file yields the defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use biseo_adapters::{GOOGLE_CALENDAR_BASE_URL, GOOGLE_TASKS_BASE_URL};
use biseo_intent::WorkflowConfig;
use chrono::FixedOffset;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assistant: AssistantSection,
    pub sessions: SessionSection,
    pub matching: MatchingSection,
    pub google: GoogleSection,
    pub llm: LlmSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantSection {
    pub timezone_offset_hours: i32,
    pub user_id: String,
    pub history_limit: usize,
    pub title_display_chars: usize,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            timezone_offset_hours: 9,
            user_id: "local".into(),
            history_limit: 5,
            title_display_chars: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub delete_ttl_secs: u64,
    pub query_ttl_secs: u64,
    pub task_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            delete_ttl_secs: 600,
            query_ttl_secs: 1800,
            task_ttl_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSection {
    pub floor: f64,
    pub auto_commit: f64,
    pub max_candidates: usize,
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            floor: 0.30,
            auto_commit: 0.80,
            max_candidates: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleSection {
    pub calendar_id: String,
    pub calendar_base_url: String,
    pub tasks_base_url: String,
    pub timeout_secs: u64,
}

impl Default for GoogleSection {
    fn default() -> Self {
        Self {
            calendar_id: "primary".into(),
            calendar_base_url: GOOGLE_CALENDAR_BASE_URL.into(),
            tasks_base_url: GOOGLE_TASKS_BASE_URL.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl AppConfig {
    /// Read `path`, or return the defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.assistant.timezone_offset_hours * 3600).with_context(|| {
            format!(
                "timezone offset {}h is out of range",
                self.assistant.timezone_offset_hours
            )
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sessions.sweep_interval_secs.max(1))
    }

    /// Engine settings derived from this file.
    pub fn workflow(&self) -> Result<WorkflowConfig> {
        Ok(WorkflowConfig {
            timezone: self.timezone()?,
            match_floor: self.matching.floor,
            auto_commit_score: self.matching.auto_commit,
            max_delete_candidates: self.matching.max_candidates,
            delete_session_ttl: Duration::from_secs(self.sessions.delete_ttl_secs),
            query_session_ttl: Duration::from_secs(self.sessions.query_ttl_secs),
            task_session_ttl: Duration::from_secs(self.sessions.task_ttl_secs),
            model_timeout: Duration::from_secs(self.llm.timeout_secs),
            history_limit: self.assistant.history_limit,
            title_display_chars: self.assistant.title_display_chars,
            ..WorkflowConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.assistant.user_id, "local");
        assert_eq!(config.sessions.query_ttl_secs, 1800);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[matching]\nfloor = 0.4\n\n[assistant]\nuser_id = \"minji\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.assistant.user_id, "minji");
        assert_eq!(config.assistant.timezone_offset_hours, 9);

        let workflow = config.workflow().unwrap();
        assert_eq!(workflow.match_floor, 0.4);
        assert_eq!(workflow.auto_commit_score, 0.80);
        assert_eq!(workflow.query_session_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[matching\nfloor = ").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn out_of_range_timezone_is_rejected() {
        let mut config = AppConfig::default();
        config.assistant.timezone_offset_hours = 30;
        assert!(config.workflow().is_err());
    }

    #[test]
    fn shipped_config_parses() {
        let text = include_str!("../../../config/default.toml");
        let config: AppConfig = toml::from_str(text).unwrap();
        assert_eq!(config.google.calendar_id, "primary");
        assert_eq!(config.llm.timeout_secs, 10);
    }
}
