//! Node extraction from topology definitions
//!
//! The reconciler only needs the set of node names a topology declares. The
//! per-node fragments are kept as opaque YAML values so callers can hand the
//! resulting map straight to the resolver.

use std::collections::BTreeMap;

use kube::ResourceExt;
use serde::Deserialize;
use serde_yaml::Value;

use super::topology::Topology;
use crate::error::{Error, Result};

/// Per-node definition fragments keyed by node name
pub type NodeConfigs = BTreeMap<String, Value>;

#[derive(Debug, Deserialize)]
struct ContainerlabDefinition {
    #[serde(default)]
    topology: ContainerlabTopology,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerlabTopology {
    #[serde(default)]
    nodes: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct KneDefinition {
    #[serde(default)]
    nodes: Vec<KneNode>,
}

#[derive(Debug, Deserialize)]
struct KneNode {
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

/// Per-node fragments declared by the topology's definition
pub fn node_configs(topology: &Topology) -> Result<NodeConfigs> {
    let definition = &topology.spec.definition;
    let fail = |reason: String| Error::Definition {
        topology: topology.name_any(),
        reason,
    };

    let nodes = if let Some(raw) = &definition.containerlab {
        let parsed: ContainerlabDefinition = serde_yaml::from_str(raw)
            .map_err(|e| fail(format!("invalid containerlab definition: {}", e)))?;
        parsed.topology.nodes
    } else if let Some(raw) = &definition.kne {
        let parsed: KneDefinition = serde_yaml::from_str(raw)
            .map_err(|e| fail(format!("invalid kne definition: {}", e)))?;

        let mut nodes = BTreeMap::new();
        for node in parsed.nodes {
            if node.name.is_empty() {
                return Err(fail("kne node without a name".into()));
            }
            let fragment = serde_yaml::to_value(&node.rest)
                .map_err(|e| fail(format!("invalid kne node {}: {}", node.name, e)))?;
            if nodes.insert(node.name.clone(), fragment).is_some() {
                return Err(fail(format!("duplicate kne node {}", node.name)));
            }
        }
        nodes
    } else {
        return Err(fail("no containerlab or kne definition".into()));
    };

    if nodes.is_empty() {
        return Err(fail("definition declares no nodes".into()));
    }

    if let Some(bad) = nodes.keys().find(|name| name.trim().is_empty()) {
        return Err(fail(format!("invalid node name {:?}", bad)));
    }

    Ok(nodes)
}
