//! The store seam the RPC handlers program against.

use async_trait::async_trait;
use console_core::ResourceType;

use crate::error::StoreResult;
use crate::object::{SecretObject, TenantObject};

/// Typed CRUD over tenant objects and secret objects.
///
/// Implementations must treat objects pending deletion as absent for both
/// list and get, and must only ever surface objects carrying the console's
/// managed-by label. Writes are optimistic: `update_*` sends the version
/// token from the preceding read and fails with
/// [`StoreError::Conflict`](crate::StoreError::Conflict) when the store has
/// moved on.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Lists managed tenant objects of the given resource type.
    async fn list_tenant_objects(
        &self,
        resource_type: ResourceType,
    ) -> StoreResult<Vec<TenantObject>>;

    /// Reads one tenant object by storage name, requiring the given
    /// resource type.
    async fn get_tenant_object(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<TenantObject>;

    /// Reads one tenant object together with the stored JSON the decision
    /// will be made from.
    async fn get_tenant_object_raw(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<(TenantObject, String)>;

    /// Creates a tenant object; the name must be unused.
    async fn create_tenant_object(&self, object: TenantObject) -> StoreResult<TenantObject>;

    /// Updates a tenant object using its resource version for optimistic
    /// concurrency.
    async fn update_tenant_object(&self, object: TenantObject) -> StoreResult<TenantObject>;

    /// Deletes a tenant object by storage name.
    async fn delete_tenant_object(
        &self,
        resource_type: ResourceType,
        storage_name: &str,
    ) -> StoreResult<()>;

    /// Lists the projects linked to an organization by its logical name.
    async fn list_projects_by_org(&self, org_logical: &str) -> StoreResult<Vec<TenantObject>>;

    /// Lists managed secrets in a project namespace.
    async fn list_secrets(&self, project_storage: &str) -> StoreResult<Vec<SecretObject>>;

    /// Reads one managed secret.
    async fn get_secret(&self, project_storage: &str, name: &str) -> StoreResult<SecretObject>;

    /// Creates a secret; the name must be unused within the project.
    async fn create_secret(&self, secret: SecretObject) -> StoreResult<SecretObject>;

    /// Updates a secret using its resource version for optimistic
    /// concurrency.
    async fn update_secret(&self, secret: SecretObject) -> StoreResult<SecretObject>;

    /// Deletes a secret.
    async fn delete_secret(&self, project_storage: &str, name: &str) -> StoreResult<()>;

    /// Probes the backing API; used by the readiness endpoint.
    async fn ready(&self) -> StoreResult<()>;
}
