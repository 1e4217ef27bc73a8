//! Reqwest-backed client for the cluster-manager REST API.
//!
//! Tenant objects are namespace-like resources, secrets live under a
//! namespace. Every list call carries the managed-by selector so only
//! console-owned objects are ever visible, plus the resource-type selector
//! for tenant objects.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use console_core::ResourceType;
use console_core::meta::{
    MANAGED_BY_LABEL, MANAGED_BY_VALUE, ORGANIZATION_LABEL, RESOURCE_TYPE_LABEL,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{SecretObject, TenantObject};
use crate::store::TenantStore;
use async_trait::async_trait;

/// Connection settings for the cluster-manager API.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Base URL of the API server.
    pub base_url: String,
    /// Bearer token of the service account, if any.
    pub token: Option<String>,
}

/// The production [`TenantStore`] implementation.
pub struct ClusterClient {
    client: Client,
    config: ClusterConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deletion_timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceManifest {
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default = "namespace_kind")]
    kind: String,
    metadata: ObjectMeta,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretManifest {
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default = "secret_kind")]
    kind: String,
    metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ListManifest<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn namespace_kind() -> String {
    "Namespace".to_string()
}

fn secret_kind() -> String {
    "Secret".to_string()
}

impl From<NamespaceManifest> for TenantObject {
    fn from(manifest: NamespaceManifest) -> Self {
        Self {
            name: manifest.metadata.name,
            labels: manifest.metadata.labels,
            annotations: manifest.metadata.annotations,
            deletion_pending: manifest.metadata.deletion_timestamp.is_some(),
            resource_version: manifest.metadata.resource_version,
        }
    }
}

impl From<&TenantObject> for NamespaceManifest {
    fn from(object: &TenantObject) -> Self {
        Self {
            api_version: default_api_version(),
            kind: namespace_kind(),
            metadata: ObjectMeta {
                name: object.name.clone(),
                labels: object.labels.clone(),
                annotations: object.annotations.clone(),
                resource_version: object.resource_version.clone(),
                deletion_timestamp: None,
            },
        }
    }
}

impl SecretManifest {
    fn into_object(self, parent_project: &str) -> StoreResult<SecretObject> {
        let mut data = BTreeMap::new();
        for (key, value) in self.data {
            let bytes = BASE64.decode(value.as_bytes()).map_err(|e| StoreError::Other {
                message: format!("secret {} carries undecodable data {key:?}: {e}", self.metadata.name),
            })?;
            data.insert(key, bytes);
        }
        Ok(SecretObject {
            name: self.metadata.name,
            parent_project: parent_project.to_string(),
            data,
            labels: self.metadata.labels,
            annotations: self.metadata.annotations,
            deletion_pending: self.metadata.deletion_timestamp.is_some(),
            resource_version: self.metadata.resource_version,
        })
    }

    fn from_object(secret: &SecretObject) -> Self {
        let data = secret
            .data
            .iter()
            .map(|(key, value)| (key.clone(), BASE64.encode(value)))
            .collect();
        Self {
            api_version: default_api_version(),
            kind: secret_kind(),
            metadata: ObjectMeta {
                name: secret.name.clone(),
                labels: secret.labels.clone(),
                annotations: secret.annotations.clone(),
                resource_version: secret.resource_version.clone(),
                deletion_timestamp: None,
            },
            data,
        }
    }
}

/// How a 409 from the store should be classified for the current operation.
#[derive(Clone, Copy)]
enum ConflictKind {
    AlreadyExists,
    Version,
}

impl ClusterClient {
    /// Creates a client using the given HTTP client; connection pooling and
    /// TLS settings (including any extra root CA) come with the client.
    #[must_use]
    pub fn new(config: ClusterConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn namespaces_url(&self) -> String {
        format!("{}/api/v1/namespaces", self.config.base_url)
    }

    fn namespace_url(&self, name: &str) -> String {
        format!("{}/api/v1/namespaces/{name}", self.config.base_url)
    }

    fn secrets_url(&self, namespace: &str) -> String {
        format!("{}/api/v1/namespaces/{namespace}/secrets", self.config.base_url)
    }

    fn secret_url(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{namespace}/secrets/{name}",
            self.config.base_url
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn classify(
        response: reqwest::Response,
        name: &str,
        on_conflict: ConflictKind,
    ) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound {
                name: name.to_string(),
            },
            StatusCode::CONFLICT => match on_conflict {
                ConflictKind::AlreadyExists => StoreError::AlreadyExists {
                    name: name.to_string(),
                },
                ConflictKind::Version => StoreError::Conflict {
                    name: name.to_string(),
                },
            },
            StatusCode::FORBIDDEN => StoreError::Forbidden { message },
            StatusCode::UNAUTHORIZED => StoreError::Unauthorized { message },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::BadRequest { message }
            }
            status if status.is_server_error() => StoreError::Unavailable {
                message: format!("{status}: {message}"),
            },
            status => StoreError::Other {
                message: format!("{status}: {message}"),
            },
        })
    }

    fn tenant_selector(resource_type: ResourceType) -> String {
        format!(
            "{MANAGED_BY_LABEL}={MANAGED_BY_VALUE},{RESOURCE_TYPE_LABEL}={}",
            resource_type.as_str()
        )
    }

    async fn fetch_namespace(&self, storage_name: &str) -> StoreResult<(TenantObject, String)> {
        let response = self
            .request(self.client.get(self.namespace_url(storage_name)))
            .send()
            .await?;
        let response = Self::classify(response, storage_name, ConflictKind::Version).await?;
        let raw = response.text().await?;
        let manifest: NamespaceManifest = serde_json::from_str(&raw)?;
        Ok((manifest.into(), raw))
    }

    fn require_tenant(
        resource_type: ResourceType,
        storage_name: &str,
        object: TenantObject,
    ) -> StoreResult<TenantObject> {
        if !object.is_managed()
            || object.resource_type() != Some(resource_type)
            || object.deletion_pending
        {
            return Err(StoreError::NotFound {
                name: storage_name.to_string(),
            });
        }
        Ok(object)
    }
}

#[async_trait]
impl TenantStore for ClusterClient {
    async fn list_tenant_objects(
        &self,
        resource_type: ResourceType,
    ) -> StoreResult<Vec<TenantObject>> {
        let selector = Self::tenant_selector(resource_type);
        debug!(%selector, "Listing tenant objects");
        let response = self
            .request(self.client.get(self.namespaces_url()))
            .query(&[("labelSelector", selector.as_str())])
            .send()
            .await?;
        let response = Self::classify(response, "", ConflictKind::Version).await?;
        let list: ListManifest<NamespaceManifest> = response.json().await?;
        Ok(list
            .items
            .into_iter()
            .map(TenantObject::from)
            .filter(|object| !object.deletion_pending)
            .collect())
    }

    async fn get_tenant_object(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<TenantObject> {
        let (object, _) = self.fetch_namespace(storage_name).await?;
        Self::require_tenant(resource_type, storage_name, object)
    }

    async fn get_tenant_object_raw(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<(TenantObject, String)> {
        let (object, raw) = self.fetch_namespace(storage_name).await?;
        let object = Self::require_tenant(resource_type, storage_name, object)?;
        Ok((object, raw))
    }

    async fn create_tenant_object(&self, object: TenantObject) -> StoreResult<TenantObject> {
        let manifest = NamespaceManifest::from(&object);
        let response = self
            .request(self.client.post(self.namespaces_url()))
            .json(&manifest)
            .send()
            .await?;
        let response = Self::classify(response, &object.name, ConflictKind::AlreadyExists).await?;
        let created: NamespaceManifest = response.json().await?;
        Ok(created.into())
    }

    async fn update_tenant_object(&self, object: TenantObject) -> StoreResult<TenantObject> {
        let manifest = NamespaceManifest::from(&object);
        let response = self
            .request(self.client.put(self.namespace_url(&object.name)))
            .json(&manifest)
            .send()
            .await?;
        let response = Self::classify(response, &object.name, ConflictKind::Version).await?;
        let updated: NamespaceManifest = response.json().await?;
        Ok(updated.into())
    }

    async fn delete_tenant_object(
        &self,
        _resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<()> {
        let response = self
            .request(self.client.delete(self.namespace_url(storage_name)))
            .send()
            .await?;
        Self::classify(response, storage_name, ConflictKind::Version).await?;
        Ok(())
    }

    async fn list_projects_by_org(&self, org_logical: &str) -> StoreResult<Vec<TenantObject>> {
        let selector = format!(
            "{},{ORGANIZATION_LABEL}={org_logical}",
            Self::tenant_selector(ResourceType::Project)
        );
        let response = self
            .request(self.client.get(self.namespaces_url()))
            .query(&[("labelSelector", selector.as_str())])
            .send()
            .await?;
        let response = Self::classify(response, "", ConflictKind::Version).await?;
        let list: ListManifest<NamespaceManifest> = response.json().await?;
        Ok(list
            .items
            .into_iter()
            .map(TenantObject::from)
            .filter(|object| !object.deletion_pending)
            .collect())
    }

    async fn list_secrets(&self, project_storage: &str) -> StoreResult<Vec<SecretObject>> {
        let selector = format!("{MANAGED_BY_LABEL}={MANAGED_BY_VALUE}");
        let response = self
            .request(self.client.get(self.secrets_url(project_storage)))
            .query(&[("labelSelector", selector.as_str())])
            .send()
            .await?;
        let response = Self::classify(response, project_storage, ConflictKind::Version).await?;
        let list: ListManifest<SecretManifest> = response.json().await?;
        let mut secrets = Vec::with_capacity(list.items.len());
        for manifest in list.items {
            let secret = manifest.into_object(project_storage)?;
            if !secret.deletion_pending {
                secrets.push(secret);
            }
        }
        Ok(secrets)
    }

    async fn get_secret(&self, project_storage: &str, name: &str) -> StoreResult<SecretObject> {
        let response = self
            .request(self.client.get(self.secret_url(project_storage, name)))
            .send()
            .await?;
        let response = Self::classify(response, name, ConflictKind::Version).await?;
        let manifest: SecretManifest = response.json().await?;
        let secret = manifest.into_object(project_storage)?;
        if !secret.is_managed() || secret.deletion_pending {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(secret)
    }

    async fn create_secret(&self, secret: SecretObject) -> StoreResult<SecretObject> {
        let manifest = SecretManifest::from_object(&secret);
        let response = self
            .request(self.client.post(self.secrets_url(&secret.parent_project)))
            .json(&manifest)
            .send()
            .await?;
        let response = Self::classify(response, &secret.name, ConflictKind::AlreadyExists).await?;
        let created: SecretManifest = response.json().await?;
        created.into_object(&secret.parent_project)
    }

    async fn update_secret(&self, secret: SecretObject) -> StoreResult<SecretObject> {
        let manifest = SecretManifest::from_object(&secret);
        let response = self
            .request(
                self.client
                    .put(self.secret_url(&secret.parent_project, &secret.name)),
            )
            .json(&manifest)
            .send()
            .await?;
        let response = Self::classify(response, &secret.name, ConflictKind::Version).await?;
        let updated: SecretManifest = response.json().await?;
        updated.into_object(&secret.parent_project)
    }

    async fn delete_secret(&self, project_storage: &str, name: &str) -> StoreResult<()> {
        let response = self
            .request(self.client.delete(self.secret_url(project_storage, name)))
            .send()
            .await?;
        Self::classify(response, name, ConflictKind::Version).await?;
        Ok(())
    }

    async fn ready(&self) -> StoreResult<()> {
        let response = self
            .request(self.client.get(format!("{}/readyz", self.config.base_url)))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                message: format!("readiness probe returned {}", response.status()),
            })
        }
    }
}
