//! ProgressionEngine - immutable rules, catalog and config
//!
//! The engine holds no progression state between calls. Every operation
//! takes the caller's `ProgressionState` explicitly.

use crate::achievements::Catalog;
use crate::config::EngineConfig;
use crate::rules::Rulebook;

#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    config: EngineConfig,
    rules: Rulebook,
    catalog: Catalog,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ProgressionEngine {
    /// Engine with the built-in rulebook and catalog.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rules: Rulebook::standard(),
            catalog: Catalog::standard(),
        }
    }

    pub fn with_rules(mut self, rules: Rulebook) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &Rulebook {
        &self.rules
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
