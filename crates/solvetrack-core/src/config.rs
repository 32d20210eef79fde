use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::Difficulty;

/// Directory under the project root holding the store and config.
pub const STATE_DIR: &str = ".solvetrack";
/// Store file name inside [`STATE_DIR`].
pub const DB_FILE: &str = "solvetrack.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub points: PointsTable,
}

impl ProjectConfig {
    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.source.endpoint.trim().is_empty() {
            bail!("source.endpoint must not be empty");
        }
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be at least 1");
        }
        if self.source.fetch_limit == 0 {
            bail!("source.fetch_limit must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

impl SourceConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

/// Reward points credited per solved problem, by difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTable {
    #[serde(default = "default_easy_points")]
    pub easy: u32,
    #[serde(default = "default_medium_points")]
    pub medium: u32,
    #[serde(default = "default_hard_points")]
    pub hard: u32,
}

impl PointsTable {
    #[must_use]
    pub const fn points_for(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            easy: default_easy_points(),
            medium: default_medium_points(),
            hard: default_hard_points(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Path of the store database for a project root.
#[must_use]
pub fn db_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join(DB_FILE)
}

/// Load `.solvetrack/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(STATE_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("solvetrack/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config, and environment into one view.
///
/// # Errors
///
/// Returns an error if either config file is unreadable or invalid.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_endpoint() -> String {
    "https://leetcode.com/graphql".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_fetch_limit() -> u32 {
    20
}

const fn default_easy_points() -> u32 {
    1
}

const fn default_medium_points() -> u32 {
    2
}

const fn default_hard_points() -> u32 {
    3
}

/// Default `config.toml` written by `st init`.
pub const DEFAULT_CONFIG_TOML: &str = "[source]\n\
    endpoint = \"https://leetcode.com/graphql\"\n\
    timeout_secs = 10\n\
    fetch_limit = 20\n\
    \n\
    [points]\n\
    easy = 1\n\
    medium = 2\n\
    hard = 3\n";

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project_config(body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        let state = dir.path().join(STATE_DIR);
        std::fs::create_dir_all(&state).expect("create state dir");
        std::fs::write(state.join("config.toml"), body).expect("write config");
        dir
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.source.endpoint, "https://leetcode.com/graphql");
        assert_eq!(cfg.source.fetch_limit, 20);
        assert_eq!(cfg.source.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.points, PointsTable::default());
    }

    #[test]
    fn default_template_parses_to_defaults() {
        let cfg: ProjectConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("parse template");
        assert_eq!(cfg, ProjectConfig::default());
    }

    #[test]
    fn partial_points_table_keeps_other_defaults() {
        let dir = write_project_config("[points]\nmedium = 5\nhard = 7\n");
        let cfg = load_project_config(dir.path()).expect("load");
        assert_eq!(cfg.points.easy, 1);
        assert_eq!(cfg.points.points_for(Difficulty::Medium), 5);
        assert_eq!(cfg.points.points_for(Difficulty::Hard), 7);
    }

    #[test]
    fn zero_fetch_limit_is_rejected() {
        let dir = write_project_config("[source]\nfetch_limit = 0\n");
        let err = load_project_config(dir.path()).expect_err("must reject");
        assert!(format!("{err:#}").contains("fetch_limit"));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let dir = write_project_config("[points\neasy = 1\n");
        let err = load_project_config(dir.path()).expect_err("must fail");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_wins_over_user_config() {
        let output = resolve_output(false, Some("json".to_string()), Some("human".to_string()));
        assert_eq!(output, "pretty");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let text = resolve_output(false, Some("table".to_string()), Some("bogus".to_string()));
        assert_eq!(text, "text");
    }

    #[test]
    fn db_path_lives_under_state_dir() {
        let path = db_path(Path::new("/srv/club"));
        assert_eq!(path, PathBuf::from("/srv/club/.solvetrack/solvetrack.db"));
    }
}
