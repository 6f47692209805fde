//! Typed CRUD access to one resource kind
//!
//! [`ResourceClient`] wraps `kube::Api<K>` with the small surface tests use:
//! create, list, get, edit by name, replace and delete. API failures are
//! mapped onto [`crate::Error`] variants, and deleting a missing object
//! reports `false` instead of failing.

use crate::{Error, Result};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

/// Entry point handing out typed resource clients over one `kube::Client`
#[derive(Clone)]
pub struct KubernetesClient {
    client: kube::Client,
}

impl KubernetesClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// The underlying `kube::Client`, for calls outside the typed surface.
    pub fn kube_client(&self) -> kube::Client {
        self.client.clone()
    }

    pub fn storage_classes(&self) -> ResourceClient<StorageClass> {
        ResourceClient::all(self.client.clone())
    }

    /// Client over all objects of `K`; the form for cluster-scoped kinds.
    pub fn resources<K>(&self) -> ResourceClient<K>
    where
        K: Resource<DynamicType = ()>,
    {
        ResourceClient::all(self.client.clone())
    }

    /// Client over the objects of `K` in one namespace.
    pub fn namespaced<K>(&self, namespace: &str) -> ResourceClient<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        ResourceClient::namespaced(self.client.clone(), namespace)
    }
}

/// Typed CRUD client for one resource kind
pub struct ResourceClient<K> {
    api: Api<K>,
    namespace: Option<String>,
}

impl<K> ResourceClient<K>
where
    K: Resource<DynamicType = ()>,
{
    pub fn all(client: kube::Client) -> Self {
        Self {
            api: Api::all(client),
            namespace: None,
        }
    }

    pub fn namespaced(client: kube::Client, namespace: &str) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: Some(namespace.to_string()),
        }
    }
}

impl<K> ResourceClient<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug,
{
    fn map_err(&self, err: kube::Error, name: &str) -> Error {
        Error::from_kube(
            err,
            &K::kind(&()),
            name,
            self.namespace.as_deref().unwrap_or(""),
        )
    }

    fn name_of(obj: &K) -> Result<String> {
        obj.meta()
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidRequest(format!("{} has no metadata.name", K::kind(&()))))
    }

    /// Create `obj`; fails with [`Error::AlreadyExists`] if the name is taken.
    ///
    /// Returns the stored object with server-assigned metadata.
    pub async fn create(&self, obj: &K) -> Result<K> {
        let name = Self::name_of(obj)?;
        let created = self
            .api
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| self.map_err(e, &name))?;
        debug!("Created {} {}", K::kind(&()), name);
        Ok(created)
    }

    /// Snapshot of every object, ordered by name.
    pub async fn list(&self) -> Result<Vec<K>> {
        self.list_with(&ListParams::default()).await
    }

    /// List with label/field selectors or a limit.
    pub async fn list_with(&self, params: &ListParams) -> Result<Vec<K>> {
        let list = self
            .api
            .list(params)
            .await
            .map_err(|e| self.map_err(e, ""))?;
        Ok(list.items)
    }

    pub async fn get(&self, name: &str) -> Result<K> {
        self.api.get(name).await.map_err(|e| self.map_err(e, name))
    }

    /// Like [`ResourceClient::get`] but `Ok(None)` when the object is absent.
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        match self.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Full update. A stale `resourceVersion` fails with [`Error::Conflict`].
    pub async fn replace(&self, obj: &K) -> Result<K> {
        let name = Self::name_of(obj)?;
        self.api
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| self.map_err(e, &name))
    }

    /// Delete `obj` by its name; `Ok(false)` if it does not exist.
    pub async fn delete(&self, obj: &K) -> Result<bool> {
        let name = Self::name_of(obj)?;
        self.delete_by_name(&name).await
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<bool> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                debug!("Deleted {} {}", K::kind(&()), name);
                Ok(true)
            }
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(false),
            Err(e) => Err(self.map_err(e, name)),
        }
    }

    /// Operations on a single object addressed by name.
    pub fn with_name(&self, name: impl Into<String>) -> NamedResource<'_, K> {
        NamedResource {
            client: self,
            name: name.into(),
        }
    }
}

/// One object of kind `K`, addressed by name
pub struct NamedResource<'a, K> {
    client: &'a ResourceClient<K>,
    name: String,
}

impl<K> NamedResource<'_, K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self) -> Result<K> {
        self.client.get(&self.name).await
    }

    pub async fn delete(&self) -> Result<bool> {
        self.client.delete_by_name(&self.name).await
    }

    /// Fetch the object, apply `mutate` to it and persist the difference.
    ///
    /// Only the fields `mutate` touched are sent, as an RFC 6902 JSON patch, so
    /// concurrent changes to other fields are kept. Fails with
    /// [`Error::NotFound`] if the object does not exist.
    ///
    /// ```rust
    /// # use kube_mock_server::{MockServer, StorageClassBuilder};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let server = MockServer::new();
    /// # let storage_classes = server.client().storage_classes();
    /// # storage_classes.create(&StorageClassBuilder::new("standard").build()).await?;
    /// let edited = storage_classes
    ///     .with_name("standard")
    ///     .edit(|sc| {
    ///         sc.metadata
    ///             .labels
    ///             .get_or_insert_with(Default::default)
    ///             .insert("key1".to_string(), "value1".to_string());
    ///     })
    ///     .await?;
    /// assert_eq!(edited.metadata.labels.unwrap().len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn edit<F>(&self, mutate: F) -> Result<K>
    where
        F: FnOnce(&mut K),
    {
        let current = self.get().await?;
        let before = serde_json::to_value(&current)?;

        let mut edited = current.clone();
        mutate(&mut edited);
        if edited.meta().name.as_deref() != Some(self.name.as_str()) {
            return Err(Error::InvalidRequest(
                "metadata.name field is immutable".to_string(),
            ));
        }
        let after = serde_json::to_value(&edited)?;

        let diff = json_patch::diff(&before, &after);
        if diff.0.is_empty() {
            return Ok(current);
        }

        self.client
            .api
            .patch(&self.name, &PatchParams::default(), &Patch::<K>::Json(diff))
            .await
            .map_err(|e| self.client.map_err(e, &self.name))
    }

    /// Add or overwrite labels with a merge patch, leaving other labels intact.
    pub async fn patch_labels<I, L, V>(&self, labels: I) -> Result<K>
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<String>,
    {
        let labels: BTreeMap<String, String> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let patch = serde_json::json!({ "metadata": { "labels": labels } });

        self.client
            .api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| self.client.map_err(e, &self.name))
    }
}
