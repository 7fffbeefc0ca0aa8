//! Topology CRD
//!
//! A Topology describes a multi-node network emulation workload. Only the
//! parts the claims reconciler consumes are modelled here: the definition the
//! node set is derived from, the persistence policy and the naming policy.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;

// =============================================================================
// Topology CRD
// =============================================================================

/// Topology is the owner of every per-node child object
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "topology.netlab.io",
    version = "v1alpha1",
    kind = "Topology",
    plural = "topologies",
    shortname = "topo",
    printcolumn = r#"{"name": "Naming", "type": "string", "jsonPath": ".spec.naming"}"#,
    printcolumn = r#"{"name": "Persistence", "type": "boolean", "jsonPath": ".spec.deployment.persistence.enabled"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TopologySpec {
    /// Source definition the nodes are derived from
    #[serde(default)]
    pub definition: Definition,

    /// Deployment settings
    #[serde(default)]
    pub deployment: Deployment,

    /// Object naming policy
    #[serde(default)]
    pub naming: Naming,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Topology definition; exactly one of the fields is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    /// Containerlab topology file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerlab: Option<String>,

    /// KNE topology file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kne: Option<String>,
}

/// Deployment settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Per-node persistence of the lab directory
    #[serde(default)]
    pub persistence: Persistence,
}

/// Persistence policy for per-node claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    /// Give every node a claim
    #[serde(default)]
    pub enabled: bool,

    /// Claim size (e.g., "10Gi"); empty uses the default
    #[serde(default)]
    pub claim_size: String,

    /// Storage class; empty leaves the cluster default in charge
    #[serde(default)]
    pub storage_class_name: String,

    /// "block" or "filesystem"; anything else falls back to filesystem
    #[serde(default)]
    pub volume_mode: String,
}

/// Naming policy for rendered child objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Naming {
    /// Defer to the operator-wide setting
    #[default]
    Global,
    /// Always prefix object names with the topology name
    Prefixed,
    /// Never prefix object names
    NonPrefixed,
}

impl std::fmt::Display for Naming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Naming::Global => write!(f, "global"),
            Naming::Prefixed => write!(f, "prefixed"),
            Naming::NonPrefixed => write!(f, "non-prefixed"),
        }
    }
}

/// Kind of definition a topology was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Containerlab,
    Kne,
}

impl std::fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyKind::Containerlab => write!(f, "containerlab"),
            TopologyKind::Kne => write!(f, "kne"),
        }
    }
}

// =============================================================================
// Implementations
// =============================================================================

impl Topology {
    /// Definition kind; containerlab wins when both are set
    pub fn kind(&self) -> TopologyKind {
        let definition = &self.spec.definition;

        if definition.containerlab.is_none() && definition.kne.is_some() {
            TopologyKind::Kne
        } else {
            TopologyKind::Containerlab
        }
    }

    /// Persistence policy
    pub fn persistence(&self) -> &Persistence {
        &self.spec.deployment.persistence
    }

    /// Namespace child objects are created in
    pub fn namespace_or_default(&self) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }
}

/// Whether child object names drop the `{topology}-` prefix
pub fn resolve_remove_prefix(topology: &Topology, config: &dyn ConfigManager) -> bool {
    match topology.spec.naming {
        Naming::Prefixed => false,
        Naming::NonPrefixed => true,
        Naming::Global => config.remove_topology_prefix(),
    }
}
