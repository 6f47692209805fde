//! In-process mock Kubernetes API server with a typed CRUD resource client.
//!
//! [`MockServer`] keeps objects in memory and answers the Kubernetes REST
//! protocol through a `tower::Service`, so a stock `kube::Client` can talk to
//! it without a network. [`KubernetesClient`] hands out [`ResourceClient`]s
//! that wrap the create / list / get / edit / delete round trip for one kind.
//!
//! # Examples
//!
//! ## StorageClass lifecycle
//!
//! ```rust
//! use kube_mock_server::{MockServer, StorageClassBuilder};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockServer::new();
//! let storage_classes = server.client().storage_classes();
//!
//! let sc = StorageClassBuilder::new("standard")
//!     .with_provisioner("kubernetes.io/aws-ebs")
//!     .with_parameter("type", "gp2")
//!     .build();
//! storage_classes.create(&sc).await?;
//!
//! let edited = storage_classes
//!     .with_name("standard")
//!     .edit(|sc| {
//!         sc.metadata
//!             .labels
//!             .get_or_insert_with(Default::default)
//!             .insert("tier".to_string(), "gold".to_string());
//!     })
//!     .await?;
//! assert_eq!(edited.metadata.labels.unwrap()["tier"], "gold");
//!
//! assert!(storage_classes.delete(&sc).await?);
//! assert!(storage_classes.list().await?.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Plain `kube::Api`
//!
//! ```rust
//! use kube_mock_server::MockServer;
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use kube::api::{Api, PostParams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockServer::new();
//! let config_maps: Api<ConfigMap> = Api::namespaced(server.kube_client(), "default");
//!
//! let mut cm = ConfigMap::default();
//! cm.metadata.name = Some("settings".to_string());
//!
//! config_maps.create(&PostParams::default(), &cm).await?;
//! # Ok(())
//! # }
//! ```

mod client_utils;
pub mod discovery;
mod error;
pub mod interceptor;
mod mock_service;
mod resource_client;
pub mod selectors;
mod server;
mod storage_class;
mod tracker;
mod utils;

#[cfg(test)]
mod resource_client_test;
#[cfg(test)]
mod tracker_test;

pub use error::{Error, Result};
pub use kube::Client;
pub use mock_service::MockService;
pub use resource_client::{KubernetesClient, NamedResource, ResourceClient};
pub use server::{MockServer, ServerBuilder};
pub use storage_class::StorageClassBuilder;
pub use tracker::{ObjectTracker, GVK, GVR};
