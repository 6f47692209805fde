//! The mock API server and its builder

use crate::client_utils::extract_gvk;
use crate::discovery::{ResourceRegistry, Scope};
use crate::interceptor;
use crate::mock_service::{Backend, MockService};
use crate::resource_client::KubernetesClient;
use crate::tracker::ObjectTracker;
use crate::{Error, Result};
use kube::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// In-process Kubernetes API server backed by an in-memory store
///
/// Every `MockServer` owns its own store, so tests never see each other's
/// objects. Clients obtained from [`MockServer::client`] or
/// [`MockServer::kube_client`] all talk to the same store.
///
/// ```rust
/// use kube_mock_server::{MockServer, StorageClassBuilder};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let server = MockServer::new();
/// let storage_classes = server.client().storage_classes();
///
/// let sc = StorageClassBuilder::new("standard")
///     .with_provisioner("kubernetes.io/aws-ebs")
///     .build();
/// storage_classes.create(&sc).await?;
///
/// assert_eq!(storage_classes.list().await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MockServer {
    backend: Arc<Backend>,
}

impl MockServer {
    /// An empty server with no interceptors and only built-in resource types.
    pub fn new() -> Self {
        Self::builder().build_empty()
    }

    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Typed client entry point. Same runtime requirement as
    /// [`MockServer::kube_client`].
    pub fn client(&self) -> KubernetesClient {
        KubernetesClient::new(self.kube_client())
    }

    /// A stock `kube::Client` whose requests are served by this server.
    ///
    /// Must be called from within a Tokio runtime, as `kube::Client` spawns
    /// its request buffer task on creation.
    pub fn kube_client(&self) -> kube::Client {
        let service = MockService::new(Arc::clone(&self.backend));
        kube::Client::new(service, self.backend.default_namespace.clone())
    }

    /// Direct access to the backing store, bypassing HTTP.
    pub fn tracker(&self) -> &ObjectTracker {
        &self.backend.tracker
    }

    /// Remove every stored object, returning the server to its empty state.
    pub fn reset(&self) -> Result<()> {
        self.backend.tracker.clear()
    }

    /// Total number of stored objects across all resource types.
    pub fn object_count(&self) -> Result<usize> {
        self.backend.tracker.len()
    }

    /// Seed an object directly into the store after the server was built.
    pub fn add_object<K>(&self, obj: &K) -> Result<Value>
    where
        K: Resource + Serialize,
    {
        self.add_value(serde_json::to_value(obj)?)
    }

    fn add_value(&self, obj: Value) -> Result<Value> {
        let gvk = extract_gvk(&obj)?;
        let info = self
            .backend
            .registry
            .by_gvk(&gvk)
            .ok_or_else(|| Error::UnknownResource {
                group: gvk.group.clone(),
                version: gvk.version.clone(),
                resource: format!("{} (kind)", gvk.kind),
            })?;

        let namespace = if info.namespaced {
            obj.get("metadata")
                .and_then(|m| m.get("namespace"))
                .and_then(|n| n.as_str())
                .unwrap_or(&self.backend.default_namespace)
                .to_string()
        } else {
            String::new()
        };

        self.backend.tracker.add(&info.gvr(), &gvk, obj, &namespace)
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`MockServer`]
///
/// - initial objects, typed or loaded from YAML fixtures
/// - custom resource types
/// - interceptors
/// - the default namespace for namespaced requests without one
pub struct ServerBuilder {
    initial_objects: Vec<Value>,
    registry: ResourceRegistry,
    default_namespace: String,
    fixture_dir: Option<PathBuf>,
    interceptors: interceptor::Funcs,
    pending_error: Option<Error>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            initial_objects: Vec::new(),
            registry: ResourceRegistry::new(),
            default_namespace: "default".to_string(),
            fixture_dir: None,
            interceptors: interceptor::Funcs::new(),
            pending_error: None,
        }
    }

    /// Add an object to seed the store with.
    ///
    /// Serialization failures are reported by [`ServerBuilder::build`].
    pub fn with_object<K>(mut self, obj: K) -> Self
    where
        K: Resource + Serialize,
    {
        match serde_json::to_value(&obj) {
            Ok(value) => self.initial_objects.push(value),
            Err(e) => {
                self.pending_error.get_or_insert(e.into());
            }
        }
        self
    }

    pub fn with_objects<K>(self, objects: impl IntoIterator<Item = K>) -> Self
    where
        K: Resource + Serialize,
    {
        objects.into_iter().fold(self, Self::with_object)
    }

    /// Register a custom resource type, like installing its CRD.
    ///
    /// ```rust
    /// use kube::CustomResource;
    /// use kube_mock_server::MockServer;
    /// use schemars::JsonSchema;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
    /// #[kube(group = "example.com", version = "v1", kind = "Volume")]
    /// pub struct VolumeSpec {
    ///     pub size: String,
    /// }
    ///
    /// let server = MockServer::builder()
    ///     .with_resource::<Volume>()
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_resource<K>(self) -> Self
    where
        K: Resource<DynamicType = ()>,
        K::Scope: Scope,
    {
        self.registry.register::<K>();
        self
    }

    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn with_interceptor_funcs(mut self, interceptors: interceptor::Funcs) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Base directory for [`ServerBuilder::load_fixture`] paths.
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    /// Load objects from a YAML file; multi-document files (`---`) are supported.
    pub fn load_fixture(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let fixture_path = match &self.fixture_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        };

        let content = std::fs::read_to_string(&fixture_path)
            .map_err(|e| Error::Fixture(format!("failed to read {:?}: {}", fixture_path, e)))?;

        for document in serde_yaml::Deserializer::from_str(&content) {
            let value = Value::deserialize(document).map_err(|e| {
                Error::Fixture(format!("failed to parse YAML in {:?}: {}", fixture_path, e))
            })?;
            // Empty documents, e.g. a trailing `---`
            if value.is_null() {
                continue;
            }
            self.initial_objects.push(value);
        }

        Ok(self)
    }

    pub fn load_fixtures<P>(mut self, paths: impl IntoIterator<Item = P>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.load_fixture(path)?;
        }
        Ok(self)
    }

    fn build_empty(self) -> MockServer {
        MockServer {
            backend: Arc::new(Backend {
                tracker: ObjectTracker::new(),
                registry: self.registry,
                interceptors: self.interceptors,
                default_namespace: self.default_namespace,
            }),
        }
    }

    /// Build the server and seed it with the configured objects.
    ///
    /// # Errors
    ///
    /// Fails if a seeded object could not be serialized, has no name, or is of
    /// a kind that is neither built in nor registered.
    pub fn build(mut self) -> Result<MockServer> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }
        let objects = std::mem::take(&mut self.initial_objects);
        let server = self.build_empty();
        let count = objects.len();
        for obj in objects {
            server.add_value(obj)?;
        }
        debug!("Mock server ready with {} seeded objects", count);
        Ok(server)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
