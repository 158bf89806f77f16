use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::github::{RetryConfig, Slug};
use crate::telemetry::LogFormat;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pullwarden.toml";

/// Main configuration structure for pullwarden
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PullwardenConfig {
    pub github: GitHubConfig,
    pub scratch: ScratchConfig,
    pub polling: PollingConfig,
    pub conflicts: ConflictsConfig,
    pub rebase: RebaseConfig,
    pub stale: StaleConfig,
    pub reviews: ReviewsConfig,
    pub lock: LockConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token (can be set via env var)
    pub token: Option<String>,
    /// Tracked repositories, owner/repo. Several slugs form one monotree.
    pub repos: Vec<String>,
    /// REST endpoint override, e.g. for GitHub Enterprise
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScratchConfig {
    /// Root of the long-lived clones and disposable copies
    pub dir: PathBuf,
    /// Clone URLs are `<clone_base_url>/<owner>/<repo>`
    pub clone_base_url: String,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("pullwarden"),
            clone_base_url: "https://github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_delay_ms: 3_000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConflictsConfig {
    /// `ort` or `resolve`
    pub merge_strategy: String,
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            merge_strategy: "ort".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RebaseConfig {
    pub label: String,
    /// Posted below the needs-rebase marker when the label is added
    pub comment: String,
}

impl Default for RebaseConfig {
    fn default() -> Self {
        Self {
            label: "Needs rebase".to_string(),
            comment: concat!(
                "\n🐙 This pull request conflicts with the target branch and [needs rebase]",
                "(https://github.com/bitcoin/bitcoin/blob/master/CONTRIBUTING.md",
                "#rebasing-changes).\n",
            )
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaleConfig {
    pub inactive_rebase_days: i64,
    pub comment: String,
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            inactive_rebase_days: 90,
            comment: concat!(
                "There hasn't been much activity lately and the patch still needs rebase. ",
                "What is the status here?\n",
                "\n",
                "* Is it still relevant? ➡️ Please solve the conflicts to make it ready for ",
                "review and to ensure the CI passes.\n",
                "* Is it no longer relevant? ➡️ Please close.\n",
                "* Did the author lose interest or time to work on this? ➡️ Please close it ",
                "and mark it 'Up for grabs' with the label, so that it can be picked up in ",
                "the future.\n",
            )
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReviewsConfig {
    /// Linked from the reviews section
    pub guideline_url: String,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            guideline_url:
                "https://github.com/bitcoin/bitcoin/blob/master/CONTRIBUTING.md#code-review"
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LockConfig {
    /// Lock a closed issue or pull request after this many days of inactivity
    pub inactive_days: i64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { inactive_days: 365 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl PullwardenConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`path`, or pullwarden.toml if present)
    /// 3. Environment variables (PULLWARDEN__SECTION__KEY)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("PULLWARDEN")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("github.repos")
                .try_parsing(true),
        );

        let mut config: PullwardenConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.github.token.is_none() {
            config.github.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists. Returns whether one was loaded.
    pub fn load_env_file() -> Result<bool> {
        if !Path::new(".env").exists() {
            return Ok(false);
        }
        dotenvy::dotenv().context("Failed to load .env file")?;
        Ok(true)
    }

    pub fn slugs(&self) -> Result<Vec<Slug>> {
        self.github
            .repos
            .iter()
            .map(|r| r.parse::<Slug>().map_err(anyhow::Error::from))
            .collect()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.polling.max_attempts,
            base_delay: Duration::from_millis(self.polling.base_delay_ms),
            max_delay: Duration::from_millis(self.polling.max_delay_ms),
            jitter: self.polling.jitter,
        }
    }
}
