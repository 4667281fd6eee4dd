//! Snitch configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or none at all) is a valid configuration.
//!
//! ```toml
//! database = "/var/lib/snitch/rules.db"
//! page_size = 50
//! snapshot = "authorization-details.json"
//! match_cache_capacity = 8192
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// Default rule database, relative to the working directory
pub const DEFAULT_DATABASE: &str = ".snitch.db";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct SnitchConfig {
    /// SQLite database holding compiled rules
    pub database: PathBuf,

    /// Roles requested per identity-source page
    #[validate(range(min = 1, max = 1000))]
    pub page_size: usize,

    /// Authorization-details snapshot to refresh from
    pub snapshot: Option<PathBuf>,

    /// Match results kept by the query engine
    #[validate(range(min = 1, max = 1_000_000))]
    pub match_cache_capacity: usize,
}

impl Default for SnitchConfig {
    fn default() -> Self {
        SnitchConfig {
            database: PathBuf::from(DEFAULT_DATABASE),
            page_size: crate::core::source::DEFAULT_PAGE_SIZE,
            snapshot: None,
            match_cache_capacity: crate::core::query::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SnitchConfig {
    /// Read and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Loading config from {:?}", path.as_ref());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SnitchConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Validate field ranges
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_snapshot(mut self, snapshot: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }
}
