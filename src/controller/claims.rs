//! Single reconcile pass over a topology's claims
//!
//! Lists what the topology owns, plans against it and issues the writes.
//! Scheduling, retries and watches belong to whoever calls [`ClaimsController::reconcile`].

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::ResourceExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::crd::Topology;
use crate::domain::{ClaimAction, ClaimStore};
use crate::error::Result;
use crate::metrics::ClaimMetrics;
use crate::reconciler::{plan_claims, PersistentVolumeClaimReconciler};

/// Claim names touched by one reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
    pub updated: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }
}

/// Converges the claims of a topology through a [`ClaimStore`]
pub struct ClaimsController {
    store: Arc<dyn ClaimStore>,
    reconciler: PersistentVolumeClaimReconciler,
    metrics: Option<ClaimMetrics>,
}

impl ClaimsController {
    /// Create a controller
    pub fn new(store: Arc<dyn ClaimStore>, reconciler: PersistentVolumeClaimReconciler) -> Self {
        Self {
            store,
            reconciler,
            metrics: None,
        }
    }

    /// Count issued writes in `metrics`
    pub fn with_metrics(mut self, metrics: ClaimMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, action: ClaimAction) {
        if let Some(metrics) = &self.metrics {
            metrics.record(action);
        }
    }

    /// Run one reconcile pass for `topology`
    ///
    /// Extra claims are deleted first, then missing claims created, then
    /// drifted claims replaced. The first failing write aborts the pass; the
    /// next pass recomputes everything from scratch.
    pub async fn reconcile<V: Sync>(
        &self,
        topology: &Topology,
        node_configs: &BTreeMap<String, V>,
    ) -> Result<ReconcileSummary> {
        let namespace = topology.namespace_or_default();
        let topology_name = topology.name_any();

        let owned = self.store.list_owned(&namespace, &topology_name).await?;
        let plan = plan_claims(&self.reconciler, &owned, node_configs, topology)?;

        if plan.is_empty() {
            debug!("Claims for topology {}/{} are converged", namespace, topology_name);
            return Ok(ReconcileSummary::default());
        }

        let mut summary = ReconcileSummary::default();

        for name in plan.delete {
            info!("Deleting claim {}/{}", namespace, name);
            self.store.delete(&namespace, &name).await?;
            self.record(ClaimAction::Delete);
            summary.deleted.push(name);
        }

        for claim in plan.create {
            info!("Creating claim {}/{}", namespace, claim.name_any());
            let created = self.store.create(&namespace, &claim).await?;
            self.record(ClaimAction::Create);
            summary.created.push(created.name_any());
        }

        for claim in plan.update {
            info!("Updating claim {}/{}", namespace, claim.name_any());
            let updated = self.store.replace(&namespace, &claim).await?;
            self.record(ClaimAction::Update);
            summary.updated.push(updated.name_any());
        }

        Ok(summary)
    }
}
