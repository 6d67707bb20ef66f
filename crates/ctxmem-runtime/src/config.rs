use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Retrieval and worker defaults, loadable from a TOML file at the
/// memory home and overridable per-field by environment variables
/// (env always wins over file, file always wins over these defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_fallback_min_score")]
    pub fallback_min_score: f64,
    #[serde(default)]
    pub search_default: Option<String>,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
    #[serde(default = "default_consolidation_interval_mins")]
    pub consolidation_interval_mins: i64,
    #[serde(default = "default_replication_interval_secs")]
    pub replication_interval_secs: u64,
}

fn default_max_count() -> usize {
    10
}

fn default_min_score() -> f64 {
    0.65
}

fn default_fallback_min_score() -> f64 {
    0.5
}

fn default_embedding_batch_size() -> usize {
    32
}

fn default_consolidation_interval_mins() -> i64 {
    15
}

fn default_replication_interval_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            max_count: default_max_count(),
            min_score: default_min_score(),
            fallback_min_score: default_fallback_min_score(),
            search_default: None,
            embedding_batch_size: default_embedding_batch_size(),
            consolidation_interval_mins: default_consolidation_interval_mins(),
            replication_interval_secs: default_replication_interval_secs(),
        }
    }
}

impl Config {
    /// Load from `<home>/config.toml`, falling back to defaults if the
    /// file doesn't exist, then apply environment overrides.
    pub fn load(home: &Path) -> crate::Result<Self> {
        let mut config = Self::load_from(&home.join("config.toml"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `CLAUDE_MEMORY_DEBUG`, `CLAUDE_MEMORY_MAX_COUNT`,
    /// `CLAUDE_MEMORY_MIN_SCORE`, `CLAUDE_MEMORY_FALLBACK_MIN_SCORE`,
    /// `CLAUDE_MEMORY_SEARCH`. Unparsable values are ignored rather than
    /// treated as fatal — an operator's typo shouldn't take retrieval down.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("CLAUDE_MEMORY_DEBUG") {
            self.debug = matches!(raw.trim(), "1" | "true" | "yes");
        }
        if let Some(v) = env_parsed("CLAUDE_MEMORY_MAX_COUNT") {
            self.max_count = v;
        }
        if let Some(v) = env_parsed("CLAUDE_MEMORY_MIN_SCORE") {
            self.min_score = v;
        }
        if let Some(v) = env_parsed("CLAUDE_MEMORY_FALLBACK_MIN_SCORE") {
            self.fallback_min_score = v;
        }
        if let Ok(raw) = std::env::var("CLAUDE_MEMORY_SEARCH") {
            self.search_default = Some(raw);
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Per-project mongo sync credentials, persisted at `0600` alongside the
/// project's event log since it carries a connection string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSyncConfig {
    pub uri: String,
    pub project_key: String,
    #[serde(default = "default_direction")]
    pub direction: SyncDirection,
    #[serde(default = "default_mongo_batch_size")]
    pub batch_size: i64,
}

fn default_direction() -> SyncDirection {
    SyncDirection::Both
}

fn default_mongo_batch_size() -> i64 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    Push,
    Pull,
    Both,
}

impl MongoSyncConfig {
    pub fn load_from(path: &Path) -> crate::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Writes the file then restricts it to owner read/write — credentials
    /// in plaintext must never be group- or world-readable.
    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        restrict_to_owner(path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> crate::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> crate::Result<()> {
    Ok(())
}

pub fn default_config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.max_count, 10);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.max_count = 25;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.max_count, 25);
    }

    #[test]
    fn env_override_takes_priority_over_file_value() {
        std::env::set_var("CLAUDE_MEMORY_MAX_COUNT", "99");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("CLAUDE_MEMORY_MAX_COUNT");
        assert_eq!(config.max_count, 99);
    }

    #[test]
    fn mongo_sync_config_is_written_owner_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mongo-sync.json");
        let cfg = MongoSyncConfig {
            uri: "mongodb://localhost/test".to_string(),
            project_key: "proj".to_string(),
            direction: SyncDirection::Both,
            batch_size: 100,
        };
        cfg.save_to(&path).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
