use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::AnalysisParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_min_group")]
    pub min_group: usize,
}

/// Default input locations; `~/` is expanded when resolved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    #[serde(default)]
    pub hr_path: String,
    #[serde(default)]
    pub entitlements_path: String,
    #[serde(default)]
    pub users_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub threshold: Option<f64>,
    pub min_group: Option<usize>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/role-miner/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(threshold) = overrides.threshold {
            self.analysis.threshold = threshold;
        }
        if let Some(min_group) = overrides.min_group {
            self.analysis.min_group = min_group;
        }
    }

    /// Validated engine parameters from the `[analysis]` section.
    pub fn analysis_params(&self) -> Result<AnalysisParams> {
        AnalysisParams::new(self.analysis.threshold, self.analysis.min_group)
            .context("invalid [analysis] settings")
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"[analysis]
# Share of a group's members that must hold an entitlement (0.50 - 1.00)
threshold = 0.75
min_group = 3

[data]
hr_path = "~/role-miner/hr_data.csv"
entitlements_path = "~/role-miner/entitlements.csv"
users_path = "~/role-miner/user_list.csv"

[server]
host = "127.0.0.1"
port = 3001
"#;
        template.to_string()
    }
}

impl DataConfig {
    pub fn resolved(path: &str) -> Option<PathBuf> {
        if path.trim().is_empty() {
            None
        } else {
            Some(expand_tilde(path))
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_group: default_min_group(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_threshold() -> f64 {
    0.75
}

fn default_min_group() -> usize {
    3
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}
