use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::{PullwardenConfig, DEFAULT_CONFIG_FILE};

/// Writes the effective configuration to a file, without the access token
pub struct InitCommand {
    config: PullwardenConfig,
    path: Option<PathBuf>,
    force: bool,
    dry_run: bool,
}

impl InitCommand {
    pub fn new(config: PullwardenConfig) -> Self {
        Self {
            config,
            path: None,
            force: false,
            dry_run: false,
        }
    }

    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn execute(&self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if path.exists() && !self.force {
            bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                path.display()
            );
        }
        if self.dry_run {
            println!("Would create configuration file: {}", path.display());
            return Ok(path);
        }

        let mut config = self.config.clone();
        // read from GITHUB_TOKEN instead
        config.github.token = None;
        config.save_to_file(&path)?;
        tracing::info!(path = %path.display(), "Wrote configuration file");
        println!("Created configuration file: {}", path.display());
        Ok(path)
    }
}
