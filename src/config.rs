//! Operator-wide configuration
//!
//! Global labels and annotations are stamped onto every object the operator
//! renders. Renderers never read them from ambient state; they are handed a
//! [`ConfigManager`] at construction and only ever read through it.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Operator Configuration
// =============================================================================

/// Operator configuration as stored in the operator's config file/ConfigMap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    /// Annotations added to every rendered object
    #[serde(default)]
    pub global_annotations: BTreeMap<String, String>,

    /// Labels added to every rendered object, overriding computed labels
    #[serde(default)]
    pub global_labels: BTreeMap<String, String>,

    /// Drop the topology name prefix from object names for topologies that
    /// defer to the global naming policy
    #[serde(default)]
    pub remove_topology_prefix: bool,
}

impl OperatorConfig {
    /// Parse a configuration document
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration document from disk
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading operator config from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Reject keys the API server would refuse
    pub fn validate(&self) -> Result<()> {
        for key in self
            .global_labels
            .keys()
            .chain(self.global_annotations.keys())
        {
            if key.trim().is_empty() {
                return Err(Error::Configuration(
                    "global metadata keys must not be empty".into(),
                ));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Config Accessor
// =============================================================================

/// Read-only view of the operator configuration
pub trait ConfigManager: Send + Sync {
    /// Global (annotations, labels)
    fn get_all_metadata(&self) -> (BTreeMap<String, String>, BTreeMap<String, String>);

    /// Global remove-prefix naming policy
    fn remove_topology_prefix(&self) -> bool;
}

impl ConfigManager for OperatorConfig {
    fn get_all_metadata(&self) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        (self.global_annotations.clone(), self.global_labels.clone())
    }

    fn remove_topology_prefix(&self) -> bool {
        self.remove_topology_prefix
    }
}

/// Configuration that an outer watcher can swap while renderers read it
#[derive(Debug, Default)]
pub struct ManagedConfig {
    inner: RwLock<OperatorConfig>,
}

impl ManagedConfig {
    /// Create a managed config
    pub fn new(config: OperatorConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(config),
        })
    }

    /// Replace the configuration
    pub fn update(&self, config: OperatorConfig) {
        info!(
            "Updating operator config ({} global labels, {} global annotations)",
            config.global_labels.len(),
            config.global_annotations.len()
        );
        *self.inner.write() = config;
    }

    /// Copy of the configuration in effect
    pub fn snapshot(&self) -> OperatorConfig {
        self.inner.read().clone()
    }
}

impl ConfigManager for ManagedConfig {
    fn get_all_metadata(&self) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        self.inner.read().get_all_metadata()
    }

    fn remove_topology_prefix(&self) -> bool {
        self.inner.read().remove_topology_prefix
    }
}
