//! Domain Ports - boundaries between the reconciler and the cluster
//!
//! The reconciler itself is pure. Reading and writing claims goes through
//! [`ClaimStore`], implemented against the Kubernetes API by
//! [`crate::controller::KubeClaimStore`].

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use serde::{Deserialize, Serialize};

// =============================================================================
// Claim Actions
// =============================================================================

/// Write issued against a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimAction {
    Create,
    Delete,
    Update,
}

impl ClaimAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimAction::Create => "create",
            ClaimAction::Delete => "delete",
            ClaimAction::Update => "update",
        }
    }
}

impl std::fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Port Traits
// =============================================================================

/// Storage of a topology's claims
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Claims labelled as owned by `topology_name`
    async fn list_owned(
        &self,
        namespace: &str,
        topology_name: &str,
    ) -> Result<Vec<PersistentVolumeClaim>>;

    /// Create a claim
    async fn create(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim>;

    /// Replace an existing claim
    async fn replace(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim>;

    /// Delete a claim; deleting a claim that is already gone succeeds
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}
