//! Reconcile plan for a topology's claims
//!
//! Turns one resolve pass into the concrete writes an outer loop has to
//! issue: claims to create, claims to delete and claims to update.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use tracing::debug;

use super::persistent_volume_claim::{storage_request, PersistentVolumeClaimReconciler};
use crate::constants::STORAGE_RESOURCE;
use crate::crd::Topology;
use crate::error::{Error, Result};
use crate::util::quantity_value;

/// Writes required to converge a topology's claims
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcilePlan {
    /// Claims to create, already owned by the topology
    pub create: Vec<PersistentVolumeClaim>,
    /// Names of claims to delete
    pub delete: Vec<String>,
    /// Existing claims with drift corrected
    pub update: Vec<PersistentVolumeClaim>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty() && self.update.is_empty()
    }
}

/// Controller owner reference pointing at `topology`
pub fn owner_reference(topology: &Topology) -> Result<OwnerReference> {
    topology.controller_owner_ref(&()).ok_or_else(|| {
        Error::InvalidData(format!(
            "topology {} has no uid, cannot own claims",
            topology.name_any()
        ))
    })
}

/// Apply the rendered metadata and storage request onto an existing claim
///
/// Everything else on the existing object is kept; claim specs are immutable
/// apart from the storage request, which is only ever raised.
fn corrected(
    existing: &PersistentVolumeClaim,
    rendered: &PersistentVolumeClaim,
    owner: &OwnerReference,
) -> PersistentVolumeClaim {
    let mut updated = existing.clone();

    updated
        .labels_mut()
        .extend(rendered.labels().iter().map(|(k, v)| (k.clone(), v.clone())));
    updated
        .annotations_mut()
        .extend(rendered.annotations().iter().map(|(k, v)| (k.clone(), v.clone())));
    updated.metadata.owner_references = Some(vec![owner.clone()]);

    let rendered_request = storage_request(rendered);
    if quantity_value(rendered_request) > quantity_value(storage_request(existing)) {
        if let Some(request) = rendered_request {
            let spec = updated.spec.get_or_insert_with(Default::default);
            let resources = spec.resources.get_or_insert_with(Default::default);
            resources
                .requests
                .get_or_insert_with(BTreeMap::new)
                .insert(STORAGE_RESOURCE.to_string(), request.clone());
        }
    }

    updated
}

/// Plan the writes that converge `owned_claims` with `topology`
pub fn plan_claims<V>(
    reconciler: &PersistentVolumeClaimReconciler,
    owned_claims: &[PersistentVolumeClaim],
    node_configs: &BTreeMap<String, V>,
    topology: &Topology,
) -> Result<ReconcilePlan> {
    let owner = owner_reference(topology)?;
    let claims = reconciler.resolve(owned_claims, node_configs, topology)?;

    let mut plan = ReconcilePlan::default();

    for mut claim in reconciler.render_all(topology, &claims.missing[..]) {
        claim.metadata.owner_references = Some(vec![owner.clone()]);
        plan.create.push(claim);
    }

    plan.delete = claims
        .extra
        .iter()
        .filter_map(|node_name| claims.current.get(node_name))
        .map(|claim| claim.name_any())
        .collect();

    for (node_name, existing) in claims.retained() {
        let rendered = reconciler.render(topology, node_name, Some(existing));
        let report = reconciler.conformance(existing, &rendered, &owner.uid);

        if let Some(drift) = report.drift {
            debug!(
                "Claim {} for node {} does not conform: {}",
                existing.name_any(),
                node_name,
                drift
            );
            plan.update.push(corrected(existing, &rendered, &owner));
        }
    }

    Ok(plan)
}
