//! Kubernetes-backed claim store

use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::constants::{FIELD_MANAGER, LABEL_TOPOLOGY_OWNER};
use crate::domain::ClaimStore;
use crate::error::{Error, Result};

/// [`ClaimStore`] over the cluster's PersistentVolumeClaim API
#[derive(Clone)]
pub struct KubeClaimStore {
    client: Client,
}

impl KubeClaimStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

/// Label selector matching the claims of one topology
pub fn owner_selector(topology_name: &str) -> String {
    format!("{}={}", LABEL_TOPOLOGY_OWNER, topology_name)
}

#[async_trait]
impl ClaimStore for KubeClaimStore {
    async fn list_owned(
        &self,
        namespace: &str,
        topology_name: &str,
    ) -> Result<Vec<PersistentVolumeClaim>> {
        let params = ListParams::default().labels(&owner_selector(topology_name));
        let claims = self.api(namespace).list(&params).await?;

        debug!(
            "Listed {} claims owned by {}/{}",
            claims.items.len(),
            namespace,
            topology_name
        );

        Ok(claims.items)
    }

    async fn create(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim> {
        Ok(self
            .api(namespace)
            .create(&Self::post_params(), claim)
            .await?)
    }

    async fn replace(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim> {
        let name = claim.name_any();

        Ok(self
            .api(namespace)
            .replace(&name, &Self::post_params(), claim)
            .await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("Claim {}/{} already deleted", namespace, name);
                Ok(())
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }
}
