use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub github: GithubConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub scoring: ScoringConfig,
    pub region: RegionConfig,
    pub blocklist: BlocklistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub endpoint: String,
    /// Environment variable holding the access token
    pub token_env: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    /// Upper bound on pages per walk
    pub max_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.github.com/graphql".to_string(),
            token_env: "GITHUB_ACCESS_TOKEN".to_string(),
            timeout_secs: 30,
            page_size: 100,
            max_pages: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay_secs: 3600,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ghledger"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub window_days: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Exact location string that always matches
    pub name: String,
    /// Substrings that match anywhere in a location
    pub keywords: Vec<String>,
    /// Locations used in search queries during discovery
    pub search_locations: Vec<String>,
    /// Creation date lower bound used when the store is empty (YYYY-MM-DD)
    pub discovery_start: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            name: "jordan".to_string(),
            keywords: strings(&[
                "Irbid",
                "Aqaba",
                "Al-Karak",
                "Amman",
                "Madaba",
                "Zarqa",
                "Al-Zarqa",
                "AlSalt",
                "Ajloun",
                "Al-Mafraq",
                "Maan",
                "Jerash",
                "AlKarak",
            ]),
            search_locations: strings(&[
                "Jordan", "Amman", "Aqaba", "Madaba", "Irbid", "Zarqa", "Jerash", "Al-Karak", "Maan", "Ajloun",
            ]),
            discovery_start: "2008-01-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlocklistConfig {
    /// Optional YAML file with `repositories` and `users` lists
    pub path: Option<PathBuf>,
    pub repositories: Vec<String>,
    pub users: Vec<String>,
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            path: None,
            repositories: vec!["first-contributions".to_string()],
            users: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            github: GithubConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            scoring: ScoringConfig::default(),
            region: RegionConfig::default(),
            blocklist: BlocklistConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            eyre::bail!("retry.attempts must be >= 1");
        }
        if !(1..=100).contains(&self.github.page_size) {
            eyre::bail!("github.page_size must be in 1..=100");
        }
        if self.github.max_pages == 0 {
            eyre::bail!("github.max_pages must be >= 1");
        }
        if self.scoring.window_days == 0 {
            eyre::bail!("scoring.window_days must be >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry.attempts, 2);
        assert_eq!(config.retry.delay(), Duration::from_secs(3600));
        assert_eq!(config.scoring.window_days, 30);
        assert_eq!(config.region.name, "jordan");
        assert!(config.region.keywords.iter().any(|k| k == "Amman"));
        assert_eq!(config.blocklist.repositories, vec!["first-contributions"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ghledger.yml");
        fs::write(
            &path,
            "retry:\n  attempts: 5\n  delay_secs: 10\nstorage:\n  data_dir: /tmp/ledger\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.delay_secs, 10);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.github.page_size, 100);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ghledger.yml");
        fs::write(&path, "retry:\n  attempts: 0\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut config = Config::default();
        config.github.page_size = 101;
        assert!(config.validate().is_err());
        config.github.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let path = PathBuf::from("/nonexistent/ghledger.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
