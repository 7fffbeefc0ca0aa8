//! Per-node PersistentVolumeClaim reconciler
//!
//! Renders, diffs and validates the optional claim that persists the lab
//! directory of every node in a topology. Nothing here talks to the API
//! server; callers list the owned claims, hand them in, and act on the
//! returned diff, rendered claims and conformance verdicts.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::config::ConfigManager;
use crate::constants::{
    APP_NAME, DEFAULT_CLAIM_SIZE, LABEL_APP, LABEL_NAME, LABEL_TOPOLOGY_KIND,
    LABEL_TOPOLOGY_NODE, LABEL_TOPOLOGY_OWNER, STORAGE_RESOURCE,
};
use crate::crd::{resolve_remove_prefix, Topology};
use crate::error::{Error, Result};
use crate::util::{
    existing_map_contains_all_expected, merge_metadata, parse_quantity, parse_with_fallback,
    quantity_value, FallbackWarning, ObjectDiffer,
};

/// The only access mode a node claim is ever rendered with
pub const ACCESS_MODE_READ_WRITE_ONCE: &str = "ReadWriteOnce";

// =============================================================================
// Volume Mode
// =============================================================================

/// Volume mode of a rendered claim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VolumeMode {
    Block,
    #[default]
    Filesystem,
}

impl VolumeMode {
    /// API representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeMode::Block => "Block",
            VolumeMode::Filesystem => "Filesystem",
        }
    }

    /// Case-insensitive parse of a topology's volume mode setting
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        match raw.to_lowercase().as_str() {
            "block" => Ok(VolumeMode::Block),
            "filesystem" => Ok(VolumeMode::Filesystem),
            _ => Err("expected \"block\" or \"filesystem\"".to_string()),
        }
    }
}

impl std::fmt::Display for VolumeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Conformance
// =============================================================================

/// First difference found between an existing and a rendered claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// Rendered claim asks for more storage than the existing one has
    ClaimSize { existing: String, rendered: String },
    /// A rendered annotation is missing or different on the existing claim
    Annotations,
    /// A rendered label is missing or different on the existing claim
    Labels,
    /// Existing claim does not have exactly one owner reference
    OwnerReferenceCount(usize),
    /// Existing claim is owned by something else
    OwnerUid { found: String },
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Drift::ClaimSize { existing, rendered } => {
                write!(f, "claim size {} must grow to {}", existing, rendered)
            }
            Drift::Annotations => write!(f, "annotations differ"),
            Drift::Labels => write!(f, "labels differ"),
            Drift::OwnerReferenceCount(count) => {
                write!(f, "expected one owner reference, found {}", count)
            }
            Drift::OwnerUid { found } => write!(f, "owned by unexpected uid {}", found),
        }
    }
}

/// A requested shrink that was ignored because claims can only grow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkIgnored {
    pub existing: String,
    pub rendered: String,
}

/// Outcome of comparing an existing claim with its rendered form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformanceReport {
    /// Why the existing claim must be updated, if it must
    pub drift: Option<Drift>,
    /// Set when the rendered claim is smaller than the existing one
    pub shrink_ignored: Option<ShrinkIgnored>,
}

impl ConformanceReport {
    pub fn is_conformant(&self) -> bool {
        self.drift.is_none()
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Storage request of a claim, if it has one
pub fn storage_request(claim: &PersistentVolumeClaim) -> Option<&Quantity> {
    claim
        .spec
        .as_ref()?
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get(STORAGE_RESOURCE)
}

/// Renders and validates the per-node claims of a topology
///
/// Holds nothing but a read-only configuration accessor, so one instance can
/// serve concurrent reconciles of any number of topologies.
#[derive(Clone)]
pub struct PersistentVolumeClaimReconciler {
    config: Arc<dyn ConfigManager>,
}

impl PersistentVolumeClaimReconciler {
    /// Create a reconciler reading operator-wide metadata from `config`
    pub fn new(config: Arc<dyn ConfigManager>) -> Self {
        Self { config }
    }

    /// Classify the claims owned by `topology` against its nodes
    ///
    /// Fails without a partial result when any claim lacks the node label,
    /// since such a claim cannot be attributed to a node.
    pub fn resolve<V>(
        &self,
        owned_claims: &[PersistentVolumeClaim],
        node_configs: &BTreeMap<String, V>,
        topology: &Topology,
    ) -> Result<ObjectDiffer<PersistentVolumeClaim>> {
        let mut current = BTreeMap::new();

        for claim in owned_claims {
            let Some(labels) = claim.metadata.labels.as_ref() else {
                return Err(Error::InvalidData(format!(
                    "claim {} has no labels, but we expect to see the topology node label",
                    claim.name_any()
                )));
            };

            let node_name = match labels.get(LABEL_TOPOLOGY_NODE) {
                Some(node_name) if !node_name.is_empty() => node_name,
                _ => {
                    return Err(Error::InvalidData(format!(
                        "claim {} topology node label is missing or empty",
                        claim.name_any()
                    )))
                }
            };

            current.insert(node_name.clone(), claim.clone());
        }

        let mut claims = ObjectDiffer::new(current);

        if topology.persistence().enabled {
            let all_nodes: Vec<&str> = node_configs.keys().map(String::as_str).collect();

            claims.set_missing(&all_nodes[..]);
            claims.set_extra(Some(&all_nodes[..]));
        } else {
            claims.set_extra::<&str>(None);
        }

        debug!(
            "Resolved claims for topology {}: {} current, {} missing, {} extra",
            topology.name_any(),
            claims.current.len(),
            claims.missing.len(),
            claims.extra.len()
        );

        Ok(claims)
    }

    /// Name of the claim for `node_name`
    pub fn claim_name(&self, topology: &Topology, node_name: &str) -> String {
        if resolve_remove_prefix(topology, self.config.as_ref()) {
            node_name.to_string()
        } else {
            format!("{}-{}", topology.name_any(), node_name)
        }
    }

    fn render_base(&self, topology: &Topology, node_name: &str) -> PersistentVolumeClaim {
        let owning_topology_name = topology.name_any();
        let name = self.claim_name(topology, node_name);

        let (annotations, global_labels) = self.config.get_all_metadata();

        let kind_labels = BTreeMap::from([(
            LABEL_TOPOLOGY_KIND.to_string(),
            topology.kind().to_string(),
        )]);

        let selector_labels = BTreeMap::from([
            (LABEL_APP.to_string(), APP_NAME.to_string()),
            (LABEL_NAME.to_string(), name.clone()),
            (LABEL_TOPOLOGY_OWNER.to_string(), owning_topology_name),
            (LABEL_TOPOLOGY_NODE.to_string(), node_name.to_string()),
        ]);

        let labels = merge_metadata([&kind_labels, &selector_labels, &global_labels]);

        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name),
                namespace: topology.namespace(),
                annotations: Some(annotations),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn render_spec(
        &self,
        topology: &Topology,
        existing: Option<&PersistentVolumeClaim>,
    ) -> (PersistentVolumeClaimSpec, Vec<FallbackWarning>) {
        let persistence = topology.persistence();
        let mut warnings = Vec::new();

        let storage_class_name = Some(persistence.storage_class_name.clone())
            .filter(|storage_class| !storage_class.is_empty());

        let (claim_size, warning) = parse_with_fallback(
            "claim size",
            &persistence.claim_size,
            Quantity(DEFAULT_CLAIM_SIZE.to_string()),
            parse_quantity,
        );
        warnings.extend(warning);

        let (volume_mode, warning) = parse_with_fallback(
            "volume mode",
            &persistence.volume_mode,
            VolumeMode::Filesystem,
            VolumeMode::parse,
        );
        warnings.extend(warning);

        let spec = PersistentVolumeClaimSpec {
            access_modes: Some(vec![ACCESS_MODE_READ_WRITE_ONCE.to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    STORAGE_RESOURCE.to_string(),
                    claim_size,
                )])),
                ..Default::default()
            }),
            storage_class_name,
            volume_mode: Some(volume_mode.as_str().to_string()),
            // Bound volume name is immutable once provisioned
            volume_name: existing
                .and_then(|claim| claim.spec.as_ref())
                .and_then(|spec| spec.volume_name.clone()),
            ..Default::default()
        };

        (spec, warnings)
    }

    /// Render the claim for `node_name`, returning recoverable input warnings
    pub fn render_with_warnings(
        &self,
        topology: &Topology,
        node_name: &str,
        existing: Option<&PersistentVolumeClaim>,
    ) -> (PersistentVolumeClaim, Vec<FallbackWarning>) {
        let mut claim = self.render_base(topology, node_name);
        let (spec, warnings) = self.render_spec(topology, existing);
        claim.spec = Some(spec);

        (claim, warnings)
    }

    /// Render the claim for `node_name`
    ///
    /// Pass the existing claim when re-rendering one that is already in the
    /// cluster so its bound volume name is carried over.
    pub fn render(
        &self,
        topology: &Topology,
        node_name: &str,
        existing: Option<&PersistentVolumeClaim>,
    ) -> PersistentVolumeClaim {
        let (claim, warnings) = self.render_with_warnings(topology, node_name, existing);

        for warning in warnings {
            warn!(
                "Topology {} node {}: {}",
                topology.name_any(),
                node_name,
                warning
            );
        }

        claim
    }

    /// Render claims for nodes that do not have one yet
    pub fn render_all<S: AsRef<str>>(
        &self,
        topology: &Topology,
        node_names: &[S],
    ) -> Vec<PersistentVolumeClaim> {
        node_names
            .iter()
            .map(|node_name| self.render(topology, node_name.as_ref(), None))
            .collect()
    }

    /// Compare an existing claim with its rendered form
    ///
    /// Storage may grow but never shrink; metadata on the existing claim must
    /// be a superset of the rendered metadata; the claim must be owned by
    /// exactly `expected_owner_uid`. Other claim spec fields are immutable after
    /// creation and are not compared.
    pub fn conformance(
        &self,
        existing: &PersistentVolumeClaim,
        rendered: &PersistentVolumeClaim,
        expected_owner_uid: &str,
    ) -> ConformanceReport {
        let mut report = ConformanceReport::default();

        let existing_request = storage_request(existing);
        let rendered_request = storage_request(rendered);
        let existing_size = quantity_value(existing_request);
        let rendered_size = quantity_value(rendered_request);

        let show = |q: Option<&Quantity>| q.map(|q| q.0.clone()).unwrap_or_default();

        if rendered_size > existing_size {
            report.drift = Some(Drift::ClaimSize {
                existing: show(existing_request),
                rendered: show(rendered_request),
            });
            return report;
        }

        if rendered_size < existing_size {
            let shrink = ShrinkIgnored {
                existing: show(existing_request),
                rendered: show(rendered_request),
            };
            warn!(
                "Existing claim size of {:?} is larger than desired claim size of {:?}, \
                 however claim size can only be increased, not shrunk, ignoring...",
                shrink.existing,
                shrink.rendered
            );
            report.shrink_ignored = Some(shrink);
        }

        if !existing_map_contains_all_expected(
            existing.metadata.annotations.as_ref(),
            rendered.metadata.annotations.as_ref(),
        ) {
            report.drift = Some(Drift::Annotations);
            return report;
        }

        if !existing_map_contains_all_expected(
            existing.metadata.labels.as_ref(),
            rendered.metadata.labels.as_ref(),
        ) {
            report.drift = Some(Drift::Labels);
            return report;
        }

        let owner_references = existing.metadata.owner_references.as_deref().unwrap_or_default();

        if owner_references.len() != 1 {
            report.drift = Some(Drift::OwnerReferenceCount(owner_references.len()));
            return report;
        }

        if owner_references[0].uid != expected_owner_uid {
            report.drift = Some(Drift::OwnerUid {
                found: owner_references[0].uid.clone(),
            });
        }

        report
    }

    /// Whether the existing claim satisfies the rendered one
    pub fn conforms(
        &self,
        existing: &PersistentVolumeClaim,
        rendered: &PersistentVolumeClaim,
        expected_owner_uid: &str,
    ) -> bool {
        self.conformance(existing, rendered, expected_owner_uid)
            .is_conformant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorConfig;
    use crate::crd::{Naming, TopologySpec};
    use assert_matches::assert_matches;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    const OWNER_UID: &str = "4b7c2a6e-0f2d-4d55-9a0e-2f7a2c1d9e11";

    fn reconciler_with(config: OperatorConfig) -> PersistentVolumeClaimReconciler {
        PersistentVolumeClaimReconciler::new(Arc::new(config))
    }

    fn reconciler() -> PersistentVolumeClaimReconciler {
        reconciler_with(OperatorConfig::default())
    }

    fn topology(enabled: bool, claim_size: &str, volume_mode: &str) -> Topology {
        let mut topo = Topology::new("lab", TopologySpec::default());
        topo.metadata.namespace = Some("netlab".into());
        topo.metadata.uid = Some(OWNER_UID.into());

        let persistence = &mut topo.spec.deployment.persistence;
        persistence.enabled = enabled;
        persistence.claim_size = claim_size.into();
        persistence.volume_mode = volume_mode.into();
        topo
    }

    fn nodes(names: &[&str]) -> BTreeMap<String, ()> {
        names.iter().map(|n| (n.to_string(), ())).collect()
    }

    fn owned(
        reconciler: &PersistentVolumeClaimReconciler,
        topo: &Topology,
        node: &str,
    ) -> PersistentVolumeClaim {
        let mut claim = reconciler.render(topo, node, None);
        claim.metadata.owner_references = Some(vec![owner_ref(OWNER_UID)]);
        claim
    }

    fn owner_ref(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "topology.netlab.io/v1alpha1".into(),
            kind: "Topology".into(),
            name: "lab".into(),
            uid: uid.into(),
            controller: Some(true),
            ..Default::default()
        }
    }

    fn with_size(mut claim: PersistentVolumeClaim, size: &str) -> PersistentVolumeClaim {
        claim
            .spec
            .as_mut()
            .and_then(|s| s.resources.as_mut())
            .and_then(|r| r.requests.as_mut())
            .unwrap()
            .insert(STORAGE_RESOURCE.into(), Quantity(size.into()));
        claim
    }

    // =========================================================================
    // Resolve
    // =========================================================================

    #[test]
    fn test_resolve_disabled_drains_all() {
        let r = reconciler();
        let topo = topology(false, "", "");
        let existing = vec![owned(&r, &topo, "leaf1"), owned(&r, &topo, "leaf2")];

        let diff = r
            .resolve(&existing, &nodes(&["leaf1", "leaf2", "spine1"]), &topo)
            .unwrap();

        assert!(diff.missing.is_empty());
        assert_eq!(diff.extra, vec!["leaf1", "leaf2"]);
        assert_eq!(diff.current_object_names(), vec!["leaf1", "leaf2"]);
    }

    #[test]
    fn test_resolve_enabled_nothing_exists() {
        let r = reconciler();
        let topo = topology(true, "", "");

        let diff = r.resolve(&[], &nodes(&["a", "b", "c"]), &topo).unwrap();

        assert_eq!(diff.missing, vec!["a", "b", "c"]);
        assert!(diff.extra.is_empty());
        assert!(diff.current.is_empty());
    }

    #[test]
    fn test_resolve_enabled_mixed() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let existing = vec![owned(&r, &topo, "a"), owned(&r, &topo, "old")];

        let diff = r.resolve(&existing, &nodes(&["a", "b"]), &topo).unwrap();

        assert_eq!(diff.missing, vec!["b"]);
        assert_eq!(diff.extra, vec!["old"]);
        assert_eq!(diff.current["a"].name_any(), "lab-a");
    }

    #[test]
    fn test_resolve_rejects_unlabeled_claims() {
        let r = reconciler();
        let topo = topology(true, "", "");

        let mut no_labels = owned(&r, &topo, "a");
        no_labels.metadata.labels = None;
        assert_matches!(
            r.resolve(&[no_labels], &nodes(&["a"]), &topo),
            Err(Error::InvalidData(_))
        );

        let mut empty_node = owned(&r, &topo, "a");
        empty_node
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert(LABEL_TOPOLOGY_NODE.into(), String::new());
        let good = owned(&r, &topo, "b");
        assert_matches!(
            r.resolve(&[good, empty_node], &nodes(&["a", "b"]), &topo),
            Err(Error::InvalidData(_))
        );

        let mut missing_node = owned(&r, &topo, "a");
        missing_node
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .remove(LABEL_TOPOLOGY_NODE);
        assert_matches!(
            r.resolve(&[missing_node], &nodes(&["a"]), &topo),
            Err(Error::InvalidData(_))
        );
    }

    proptest! {
        #[test]
        fn prop_resolve_partitions_nodes(
            wanted in proptest::collection::btree_set("[a-e]", 0..5),
            present in proptest::collection::btree_set("[a-e]", 0..5),
            enabled in any::<bool>(),
        ) {
            let r = reconciler();
            let topo = topology(enabled, "", "");
            let existing: Vec<_> = present.iter().map(|n| owned(&r, &topo, n)).collect();
            let node_configs: BTreeMap<String, ()> =
                wanted.iter().map(|n| (n.clone(), ())).collect();

            let diff = r.resolve(&existing, &node_configs, &topo).unwrap();

            let current: BTreeSet<String> = diff.current.keys().cloned().collect();
            let missing: BTreeSet<String> = diff.missing.iter().cloned().collect();
            let extra: BTreeSet<String> = diff.extra.iter().cloned().collect();

            prop_assert_eq!(&current, &present);
            prop_assert!(missing.is_disjoint(&current));
            prop_assert!(missing.is_disjoint(&extra));

            if enabled {
                let expect_missing: BTreeSet<String> =
                    wanted.difference(&present).cloned().collect();
                let expect_extra: BTreeSet<String> =
                    present.difference(&wanted).cloned().collect();
                prop_assert_eq!(&missing, &expect_missing);
                prop_assert_eq!(&extra, &expect_extra);

                let kept: BTreeSet<String> = present.intersection(&wanted).cloned().collect();
                let union: BTreeSet<String> = present.union(&wanted).cloned().collect();
                let mut covered = missing.clone();
                covered.extend(extra.iter().cloned());
                covered.extend(kept.iter().cloned());
                prop_assert_eq!(
                    missing.len() + extra.len() + kept.len(),
                    union.len()
                );
                prop_assert_eq!(covered, union);
            } else {
                prop_assert!(missing.is_empty());
                prop_assert_eq!(&extra, &present);
            }
        }
    }

    // =========================================================================
    // Render
    // =========================================================================

    #[test]
    fn test_render_defaults() {
        let r = reconciler();
        let topo = topology(true, "", "");

        let (claim, warnings) = r.render_with_warnings(&topo, "srl1", None);
        assert!(warnings.is_empty());

        assert_eq!(claim.name_any(), "lab-srl1");
        assert_eq!(claim.namespace().as_deref(), Some("netlab"));

        let labels = claim.labels();
        assert_eq!(labels[LABEL_APP], APP_NAME);
        assert_eq!(labels[LABEL_NAME], "lab-srl1");
        assert_eq!(labels[LABEL_TOPOLOGY_OWNER], "lab");
        assert_eq!(labels[LABEL_TOPOLOGY_NODE], "srl1");
        assert_eq!(labels[LABEL_TOPOLOGY_KIND], "containerlab");

        let spec = claim.spec.as_ref().unwrap();
        assert_eq!(
            spec.access_modes.as_deref(),
            Some(&[ACCESS_MODE_READ_WRITE_ONCE.to_string()][..])
        );
        assert_eq!(spec.volume_mode.as_deref(), Some("Filesystem"));
        assert_eq!(spec.storage_class_name, None);
        assert_eq!(spec.volume_name, None);
        assert_eq!(storage_request(&claim), Some(&Quantity("5Gi".into())));
    }

    #[test]
    fn test_render_overrides() {
        let r = reconciler();
        let mut topo = topology(true, "20Gi", "BLOCK");
        topo.spec.deployment.persistence.storage_class_name = "fast-ssd".into();

        let (claim, warnings) = r.render_with_warnings(&topo, "srl1", None);
        assert!(warnings.is_empty());

        let spec = claim.spec.as_ref().unwrap();
        assert_eq!(spec.volume_mode.as_deref(), Some("Block"));
        assert_eq!(spec.storage_class_name.as_deref(), Some("fast-ssd"));
        assert_eq!(storage_request(&claim), Some(&Quantity("20Gi".into())));
    }

    #[test]
    fn test_render_bad_claim_size_falls_back() {
        let r = reconciler();
        let topo = topology(true, "ten gigs", "");

        let (claim, warnings) = r.render_with_warnings(&topo, "srl1", None);

        assert_eq!(storage_request(&claim), Some(&Quantity("5Gi".into())));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "claim size");
        assert_eq!(warnings[0].raw, "ten gigs");
    }

    #[test]
    fn test_render_bad_volume_mode_falls_back() {
        let r = reconciler();
        let topo = topology(true, "", "blocky");

        let (claim, warnings) = r.render_with_warnings(&topo, "srl1", None);

        assert_eq!(
            claim.spec.as_ref().unwrap().volume_mode.as_deref(),
            Some("Filesystem")
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "volume mode");
        assert_eq!(warnings[0].raw, "blocky");
    }

    #[test]
    fn test_render_explicit_filesystem_does_not_warn() {
        let r = reconciler();
        let (_, warnings) = r.render_with_warnings(&topology(true, "", "Filesystem"), "n", None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_render_metadata_precedence() {
        let mut config = OperatorConfig::default();
        config
            .global_labels
            .insert(LABEL_TOPOLOGY_KIND.into(), "override".into());
        config.global_labels.insert("team".into(), "net".into());
        config
            .global_annotations
            .insert("netlab/managed-by".into(), "platform".into());
        let r = reconciler_with(config);

        let claim = r.render(&topology(true, "", ""), "srl1", None);

        assert_eq!(claim.labels()[LABEL_TOPOLOGY_KIND], "override");
        assert_eq!(claim.labels()["team"], "net");
        assert_eq!(claim.annotations()["netlab/managed-by"], "platform");
    }

    #[test]
    fn test_render_remove_prefix() {
        let r = reconciler();
        let mut topo = topology(true, "", "");
        topo.spec.naming = Naming::NonPrefixed;

        let claim = r.render(&topo, "srl1", None);

        assert_eq!(claim.name_any(), "srl1");
        assert_eq!(claim.labels()[LABEL_NAME], "srl1");

        let global = reconciler_with(OperatorConfig {
            remove_topology_prefix: true,
            ..Default::default()
        });
        assert_eq!(global.claim_name(&topology(true, "", ""), "srl1"), "srl1");
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = reconciler();
        let topo = topology(true, "7Gi", "block");
        let mut existing = owned(&r, &topo, "srl1");
        existing.spec.as_mut().unwrap().volume_name = Some("pvc-1234".into());

        let first = r.render(&topo, "srl1", Some(&existing));
        let second = r.render(&topo, "srl1", Some(&existing));

        assert_eq!(first, second);
    }

    #[test]
    fn test_render_carries_volume_name() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let mut existing = owned(&r, &topo, "srl1");
        existing.spec.as_mut().unwrap().volume_name = Some("pvc-0a1b2c".into());

        let rerendered = r.render(&topo, "srl1", Some(&existing));
        assert_eq!(
            rerendered.spec.as_ref().unwrap().volume_name.as_deref(),
            Some("pvc-0a1b2c")
        );

        let fresh = r.render(&topo, "srl1", None);
        assert_eq!(fresh.spec.as_ref().unwrap().volume_name, None);
    }

    #[test]
    fn test_render_all() {
        let r = reconciler();
        let claims = r.render_all(&topology(true, "", ""), &["a", "b"]);

        let names: Vec<String> = claims.iter().map(|c| c.name_any()).collect();
        assert_eq!(names, vec!["lab-a", "lab-b"]);
        assert!(claims
            .iter()
            .all(|c| c.spec.as_ref().unwrap().volume_name.is_none()));
    }

    // =========================================================================
    // Conformance
    // =========================================================================

    #[test]
    fn test_conforms_identical() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let existing = owned(&r, &topo, "srl1");
        let rendered = r.render(&topo, "srl1", Some(&existing));

        assert!(r.conforms(&existing, &rendered, OWNER_UID));
    }

    #[test]
    fn test_conforms_shrink_tolerated() {
        let r = reconciler();
        let existing = with_size(owned(&r, &topology(true, "", ""), "srl1"), "5Gi");
        let topo = topology(true, "3Gi", "");
        let rendered = r.render(&topo, "srl1", Some(&existing));

        let report = r.conformance(&existing, &rendered, OWNER_UID);
        assert!(report.is_conformant());
        assert_eq!(
            report.shrink_ignored,
            Some(ShrinkIgnored {
                existing: "5Gi".into(),
                rendered: "3Gi".into(),
            })
        );
    }

    #[test]
    fn test_conforms_growth_required() {
        let r = reconciler();
        let existing = with_size(owned(&r, &topology(true, "", ""), "srl1"), "5Gi");
        let rendered = r.render(&topology(true, "10Gi", ""), "srl1", Some(&existing));

        let report = r.conformance(&existing, &rendered, OWNER_UID);
        assert_eq!(
            report.drift,
            Some(Drift::ClaimSize {
                existing: "5Gi".into(),
                rendered: "10Gi".into(),
            })
        );
        assert!(!r.conforms(&existing, &rendered, OWNER_UID));
    }

    #[test]
    fn test_conforms_equal_sizes_in_different_units() {
        let r = reconciler();
        let existing = with_size(owned(&r, &topology(true, "", ""), "srl1"), "5120Mi");
        let rendered = r.render(&topology(true, "5Gi", ""), "srl1", Some(&existing));

        let report = r.conformance(&existing, &rendered, OWNER_UID);
        assert!(report.is_conformant());
        assert!(report.shrink_ignored.is_none());
    }

    #[test]
    fn test_conforms_label_superset() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let mut existing = owned(&r, &topo, "srl1");
        existing
            .labels_mut()
            .insert("unmanaged/extra".into(), "yes".into());
        existing
            .annotations_mut()
            .insert("kubectl.kubernetes.io/last-applied".into(), "{}".into());
        let rendered = r.render(&topo, "srl1", Some(&existing));

        assert!(r.conforms(&existing, &rendered, OWNER_UID));
    }

    #[test]
    fn test_conforms_label_drift() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let rendered = r.render(&topo, "srl1", None);

        let mut changed = owned(&r, &topo, "srl1");
        changed
            .labels_mut()
            .insert(LABEL_TOPOLOGY_OWNER.into(), "other".into());
        assert_eq!(
            r.conformance(&changed, &rendered, OWNER_UID).drift,
            Some(Drift::Labels)
        );

        let mut missing = owned(&r, &topo, "srl1");
        missing.labels_mut().remove(LABEL_APP);
        assert!(!r.conforms(&missing, &rendered, OWNER_UID));
    }

    #[test]
    fn test_conforms_annotation_drift() {
        let mut config = OperatorConfig::default();
        config
            .global_annotations
            .insert("netlab/managed-by".into(), "platform".into());
        let r = reconciler_with(config);
        let topo = topology(true, "", "");
        let rendered = r.render(&topo, "srl1", None);

        let mut existing = owned(&r, &topo, "srl1");
        existing.metadata.annotations = None;

        assert_eq!(
            r.conformance(&existing, &rendered, OWNER_UID).drift,
            Some(Drift::Annotations)
        );
    }

    #[test]
    fn test_conforms_ownership_gate() {
        let r = reconciler();
        let topo = topology(true, "", "");
        let rendered = r.render(&topo, "srl1", None);

        let mut orphan = owned(&r, &topo, "srl1");
        orphan.metadata.owner_references = None;
        assert_eq!(
            r.conformance(&orphan, &rendered, OWNER_UID).drift,
            Some(Drift::OwnerReferenceCount(0))
        );

        let mut shared = owned(&r, &topo, "srl1");
        shared.metadata.owner_references =
            Some(vec![owner_ref(OWNER_UID), owner_ref("another-uid")]);
        assert_eq!(
            r.conformance(&shared, &rendered, OWNER_UID).drift,
            Some(Drift::OwnerReferenceCount(2))
        );

        let mut foreign = owned(&r, &topo, "srl1");
        foreign.metadata.owner_references = Some(vec![owner_ref("another-uid")]);
        assert_eq!(
            r.conformance(&foreign, &rendered, OWNER_UID).drift,
            Some(Drift::OwnerUid {
                found: "another-uid".into()
            })
        );
    }

    proptest! {
        #[test]
        fn prop_size_is_monotonic(existing_gi in 1u32..512, rendered_gi in 1u32..512) {
            let r = reconciler();
            let existing = with_size(
                owned(&r, &topology(true, "", ""), "srl1"),
                &format!("{}Gi", existing_gi),
            );
            let topo = topology(true, &format!("{}Gi", rendered_gi), "");
            let rendered = r.render(&topo, "srl1", Some(&existing));

            let report = r.conformance(&existing, &rendered, OWNER_UID);
            prop_assert_eq!(report.is_conformant(), rendered_gi <= existing_gi);
            prop_assert_eq!(report.shrink_ignored.is_some(), rendered_gi < existing_gi);
        }
    }
}
