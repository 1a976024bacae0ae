//! Folio engine configuration.
//!
//! Config file: $XDG_CONFIG_HOME/folio/config.toml (missing file = defaults).
//!
//! ```toml
//! strict_catalog = true
//!
//! [level_curve]
//! kind = "linear"
//! xp_per_level = 1000
//!
//! [visit]
//! cooldown_ms = 5000
//! first_visit_xp = 50
//! repeat_visit_xp = 10
//!
//! [rewards]
//! skill_xp = 150
//! puzzle_xp = 100
//! anime_xp = 200
//!
//! [storage]
//! path = "/home/me/.local/share/folio/storage.json"
//! ```

use crate::catalog::ItemKind;
use crate::kv_store::FileBackend;
use crate::levels::LevelCurve;
use crate::rate_limit::DEFAULT_VISIT_COOLDOWN_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Page-visit awards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitConfig {
    pub cooldown_ms: u64,
    pub first_visit_xp: u64,
    /// 0 disables repeat-visit awards
    pub repeat_visit_xp: u64,
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_VISIT_COOLDOWN_MS,
            first_visit_xp: 50,
            repeat_visit_xp: 10,
        }
    }
}

/// Default one-shot rewards per item kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub skill_xp: u64,
    pub puzzle_xp: u64,
    pub anime_xp: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            skill_xp: 150,
            puzzle_xp: 100,
            anime_xp: 200,
        }
    }
}

impl RewardConfig {
    pub fn for_kind(&self, kind: ItemKind) -> u64 {
        match kind {
            ItemKind::Skill => self.skill_xp,
            ItemKind::Puzzle => self.puzzle_xp,
            ItemKind::Anime => self.anime_xp,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store file; None uses the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reject one-shot item ids missing from the catalog
    #[serde(default = "default_true")]
    pub strict_catalog: bool,

    #[serde(default)]
    pub level_curve: LevelCurve,

    #[serde(default)]
    pub visit: VisitConfig,

    #[serde(default)]
    pub rewards: RewardConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_catalog: true,
            level_curve: LevelCurve::default(),
            visit: VisitConfig::default(),
            rewards: RewardConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl EngineConfig {
    /// ~/.config/folio/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(config_dir.join("folio").join("config.toml"))
    }

    /// Load the user config, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::user_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML")?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Effective store location
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(FileBackend::default_path)
    }
}
