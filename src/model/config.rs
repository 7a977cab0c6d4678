use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one `<project>.json` per project.
    /// Absent = `$XDG_DATA_HOME/hydrokit/projects`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Seed the sample projects on `hk init`
    #[serde(default = "default_true")]
    pub seed_samples: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            dir: None,
            seed_samples: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Project used when `--project` is not given
    #[serde(default)]
    pub default_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Parts catalog: JSON array of `{part_number, description}`
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_fuzzy_limit")]
    pub fuzzy_limit: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            catalog: None,
            fuzzy_limit: default_fuzzy_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fuzzy_limit() -> usize {
    200
}
