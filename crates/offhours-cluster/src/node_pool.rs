//! AKS node pool scaling through the Azure Resource Manager API.
//!
//! The agent pool resource is read, its `properties.count` replaced, and the
//! whole resource written back, which is how the Azure CLI performs
//! `az aks nodepool scale`.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ClusterError, Result};
use crate::types::AzureConfig;

/// Resource Manager API version used for agent pools.
pub const AGENT_POOL_API_VERSION: &str = "2024-05-01";

/// Client for scaling AKS agent pools.
#[derive(Debug, Clone)]
pub struct AksNodePoolClient {
    client: reqwest::Client,
    config: AzureConfig,
}

impl AksNodePoolClient {
    /// Create a new node pool client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AzureConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClusterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// The agent pool resource URL.
    #[must_use]
    pub fn agent_pool_url(&self, pool_name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ContainerService/managedClusters/{}/agentPools/{}?api-version={}",
            self.config.management_url.trim_end_matches('/'),
            self.config.subscription_id,
            self.config.resource_group,
            self.config.cluster_name,
            pool_name,
            AGENT_POOL_API_VERSION,
        )
    }

    /// Scale an agent pool to `node_count` nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be read or the update is rejected.
    pub async fn scale(&self, pool_name: &str, node_count: u32) -> Result<()> {
        let url = self.agent_pool_url(pool_name);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let mut pool: Value = Self::check(response).await?.json().await?;

        let current = pool
            .pointer("/properties/count")
            .and_then(Value::as_u64)
            .unwrap_or_default();
        debug!(pool = pool_name, current, target = node_count, "Fetched agent pool");

        let properties = pool
            .get_mut("properties")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ClusterError::CloudApi {
                status: 200,
                message: format!("agent pool {pool_name} has no properties"),
            })?;
        properties.insert("count".to_string(), Value::from(node_count));
        // Read-only fields are rejected on write.
        properties.remove("provisioningState");

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.access_token)
            .json(&pool)
            .send()
            .await?;
        Self::check(response).await?;

        info!(
            pool = pool_name,
            cluster = %self.config.cluster_name,
            from = current,
            to = node_count,
            "Scaled node pool"
        );
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ClusterError::CloudApi { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POOL_PATH: &str = "/subscriptions/sub-1/resourceGroups/rg-aks-demo-dev/providers/Microsoft.ContainerService/managedClusters/aks-aks-demo-dev/agentPools/agentpool";

    fn test_config(url: &str) -> AzureConfig {
        AzureConfig {
            subscription_id: "sub-1".to_string(),
            resource_group: "rg-aks-demo-dev".to_string(),
            cluster_name: "aks-aks-demo-dev".to_string(),
            access_token: "token-abc".to_string(),
            management_url: url.to_string(),
        }
    }

    #[test]
    fn url_layout() {
        let client = AksNodePoolClient::new(test_config("https://management.azure.com/")).unwrap();
        assert_eq!(
            client.agent_pool_url("agentpool"),
            format!("https://management.azure.com{POOL_PATH}?api-version={AGENT_POOL_API_VERSION}")
        );
    }

    #[tokio::test]
    async fn scale_reads_then_writes_count() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(POOL_PATH))
            .and(query_param("api-version", AGENT_POOL_API_VERSION))
            .and(header("authorization", "Bearer token-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "agentpool",
                "properties": {
                    "count": 2,
                    "vmSize": "Standard_B2s",
                    "provisioningState": "Succeeded"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path(POOL_PATH))
            .and(body_partial_json(json!({
                "properties": { "count": 0, "vmSize": "Standard_B2s" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = AksNodePoolClient::new(test_config(&server.uri())).unwrap();
        client.scale("agentpool", 0).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_update_surfaces_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(POOL_PATH))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("AuthorizationFailed"),
            )
            .mount(&server)
            .await;

        let client = AksNodePoolClient::new(test_config(&server.uri())).unwrap();
        let err = client.scale("agentpool", 2).await.unwrap_err();

        match err {
            ClusterError::CloudApi { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "AuthorizationFailed");
            }
            other => panic!("expected CloudApi error, got {other:?}"),
        }
    }
}
