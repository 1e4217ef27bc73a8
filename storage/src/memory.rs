//! In-memory store mirroring the cluster-manager semantics.
//!
//! Used by handler and integration tests: same visibility rules (managed-by
//! label, resource-type label, deletion_pending treated as absent) and the
//! same optimistic-concurrency behavior as the real store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use console_core::ResourceType;
use console_core::meta::ORGANIZATION_LABEL;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::object::{SecretObject, TenantObject};
use crate::store::TenantStore;

#[derive(Default)]
struct Inner {
    namespaces: BTreeMap<String, TenantObject>,
    secrets: BTreeMap<(String, String), SecretObject>,
}

/// An in-process [`TenantStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    version: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_version(&self) -> String {
        self.version.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Seeds a tenant object, bypassing create semantics.
    pub async fn put_tenant_object(&self, mut object: TenantObject) {
        object.resource_version = Some(self.next_version());
        self.inner
            .write()
            .await
            .namespaces
            .insert(object.name.clone(), object);
    }

    /// Seeds a secret, bypassing create semantics.
    pub async fn put_secret(&self, mut secret: SecretObject) {
        secret.resource_version = Some(self.next_version());
        self.inner
            .write()
            .await
            .secrets
            .insert((secret.parent_project.clone(), secret.name.clone()), secret);
    }

    fn visible_tenant(object: &TenantObject, resource_type: ResourceType) -> bool {
        object.is_managed()
            && object.resource_type() == Some(resource_type)
            && !object.deletion_pending
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn list_tenant_objects(
        &self,
        resource_type: ResourceType,
    ) -> StoreResult<Vec<TenantObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .namespaces
            .values()
            .filter(|object| Self::visible_tenant(object, resource_type))
            .cloned()
            .collect())
    }

    async fn get_tenant_object(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<TenantObject> {
        let inner = self.inner.read().await;
        inner
            .namespaces
            .get(storage_name)
            .filter(|object| Self::visible_tenant(object, resource_type))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: storage_name.to_string(),
            })
    }

    async fn get_tenant_object_raw(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<(TenantObject, String)> {
        let object = self.get_tenant_object(resource_type, storage_name).await?;
        let raw = serde_json::to_string(&object)?;
        Ok((object, raw))
    }

    async fn create_tenant_object(&self, mut object: TenantObject) -> StoreResult<TenantObject> {
        let mut inner = self.inner.write().await;
        if inner.namespaces.contains_key(&object.name) {
            return Err(StoreError::AlreadyExists {
                name: object.name.clone(),
            });
        }
        object.resource_version = Some(self.next_version());
        inner
            .namespaces
            .insert(object.name.clone(), object.clone());
        Ok(object)
    }

    async fn update_tenant_object(&self, mut object: TenantObject) -> StoreResult<TenantObject> {
        let mut inner = self.inner.write().await;
        let existing = inner.namespaces.get(&object.name).ok_or_else(|| {
            StoreError::NotFound {
                name: object.name.clone(),
            }
        })?;
        if object.resource_version.is_some()
            && existing.resource_version != object.resource_version
        {
            return Err(StoreError::Conflict {
                name: object.name.clone(),
            });
        }
        object.resource_version = Some(self.next_version());
        inner
            .namespaces
            .insert(object.name.clone(), object.clone());
        Ok(object)
    }

    async fn delete_tenant_object(
        &self,
        _resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .namespaces
            .remove(storage_name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                name: storage_name.to_string(),
            })
    }

    async fn list_projects_by_org(&self, org_logical: &str) -> StoreResult<Vec<TenantObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .namespaces
            .values()
            .filter(|object| Self::visible_tenant(object, ResourceType::Project))
            .filter(|object| object.label(ORGANIZATION_LABEL) == Some(org_logical))
            .cloned()
            .collect())
    }

    async fn list_secrets(&self, project_storage: &str) -> StoreResult<Vec<SecretObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .secrets
            .values()
            .filter(|secret| secret.parent_project == project_storage)
            .filter(|secret| secret.is_managed() && !secret.deletion_pending)
            .cloned()
            .collect())
    }

    async fn get_secret(&self, project_storage: &str, name: &str) -> StoreResult<SecretObject> {
        let inner = self.inner.read().await;
        inner
            .secrets
            .get(&(project_storage.to_string(), name.to_string()))
            .filter(|secret| secret.is_managed() && !secret.deletion_pending)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }

    async fn create_secret(&self, mut secret: SecretObject) -> StoreResult<SecretObject> {
        let mut inner = self.inner.write().await;
        let key = (secret.parent_project.clone(), secret.name.clone());
        if inner.secrets.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                name: secret.name.clone(),
            });
        }
        secret.resource_version = Some(self.next_version());
        inner.secrets.insert(key, secret.clone());
        Ok(secret)
    }

    async fn update_secret(&self, mut secret: SecretObject) -> StoreResult<SecretObject> {
        let mut inner = self.inner.write().await;
        let key = (secret.parent_project.clone(), secret.name.clone());
        let existing = inner.secrets.get(&key).ok_or_else(|| StoreError::NotFound {
            name: secret.name.clone(),
        })?;
        if secret.resource_version.is_some()
            && existing.resource_version != secret.resource_version
        {
            return Err(StoreError::Conflict {
                name: secret.name.clone(),
            });
        }
        secret.resource_version = Some(self.next_version());
        inner.secrets.insert(key, secret.clone());
        Ok(secret)
    }

    async fn delete_secret(&self, project_storage: &str, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .secrets
            .remove(&(project_storage.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_string(),
            })
    }

    async fn ready(&self) -> StoreResult<()> {
        Ok(())
    }
}
