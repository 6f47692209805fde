//! Resource discovery for the mock API server
//!
//! Maps between the plural resource names used in URL paths and the kinds
//! carried in object bodies, and records whether a resource is namespaced.
//! Built-in kinds come from a static table; custom resources are added at
//! runtime through [`ResourceRegistry::register`].

use crate::tracker::{GVK, GVR};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;
use std::collections::HashMap;
use std::sync::RwLock;

/// Discovery data for one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl ResourceInfo {
    pub fn gvk(&self) -> GVK {
        GVK::new(&self.group, &self.version, &self.kind)
    }

    pub fn gvr(&self) -> GVR {
        GVR::new(&self.group, &self.version, &self.plural)
    }
}

// (group, version, kind, plural, namespaced)
const BUILTIN: &[(&str, &str, &str, &str, bool)] = &[
    ("", "v1", "ConfigMap", "configmaps", true),
    ("", "v1", "Endpoints", "endpoints", true),
    ("", "v1", "Event", "events", true),
    ("", "v1", "Namespace", "namespaces", false),
    ("", "v1", "Node", "nodes", false),
    ("", "v1", "PersistentVolume", "persistentvolumes", false),
    ("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", true),
    ("", "v1", "Pod", "pods", true),
    ("", "v1", "Secret", "secrets", true),
    ("", "v1", "Service", "services", true),
    ("", "v1", "ServiceAccount", "serviceaccounts", true),
    ("apps", "v1", "DaemonSet", "daemonsets", true),
    ("apps", "v1", "Deployment", "deployments", true),
    ("apps", "v1", "ReplicaSet", "replicasets", true),
    ("apps", "v1", "StatefulSet", "statefulsets", true),
    ("batch", "v1", "CronJob", "cronjobs", true),
    ("batch", "v1", "Job", "jobs", true),
    ("networking.k8s.io", "v1", "Ingress", "ingresses", true),
    ("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies", true),
    ("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", false),
    ("rbac.authorization.k8s.io", "v1", "ClusterRoleBinding", "clusterrolebindings", false),
    ("rbac.authorization.k8s.io", "v1", "Role", "roles", true),
    ("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", true),
    ("storage.k8s.io", "v1", "CSIDriver", "csidrivers", false),
    ("storage.k8s.io", "v1", "CSINode", "csinodes", false),
    ("storage.k8s.io", "v1", "StorageClass", "storageclasses", false),
    ("storage.k8s.io", "v1", "VolumeAttachment", "volumeattachments", false),
];

fn builtin(entry: &(&str, &str, &str, &str, bool)) -> ResourceInfo {
    let (group, version, kind, plural, namespaced) = *entry;
    ResourceInfo {
        group: group.to_string(),
        version: version.to_string(),
        kind: kind.to_string(),
        plural: plural.to_string(),
        namespaced,
    }
}

/// Scope of a `kube::Resource` type, known at compile time.
pub trait Scope {
    const NAMESPACED: bool;
}

impl Scope for NamespaceResourceScope {
    const NAMESPACED: bool = true;
}

impl Scope for ClusterResourceScope {
    const NAMESPACED: bool = false;
}

/// Registry of resource types the mock server can serve
///
/// Lookups check the built-in table first, then registered custom resources.
/// Like a real cluster, a custom resource must be registered (its CRD
/// "installed") before requests for it succeed.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    custom: RwLock<HashMap<GVR, ResourceInfo>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type from its `kube::Resource` implementation.
    pub fn register<K>(&self)
    where
        K: Resource<DynamicType = ()>,
        K::Scope: Scope,
    {
        self.register_info(ResourceInfo {
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            plural: K::plural(&()).into_owned(),
            namespaced: <K::Scope as Scope>::NAMESPACED,
        });
    }

    pub fn register_info(&self, info: ResourceInfo) {
        if let Ok(mut custom) = self.custom.write() {
            custom.insert(info.gvr(), info);
        }
    }

    /// Look up by URL coordinates: group, version and plural.
    pub fn by_gvr(&self, gvr: &GVR) -> Option<ResourceInfo> {
        BUILTIN
            .iter()
            .find(|(g, v, _, p, _)| *g == gvr.group && *v == gvr.version && *p == gvr.resource)
            .map(builtin)
            .or_else(|| self.custom.read().ok()?.get(gvr).cloned())
    }

    /// Look up by body coordinates: group, version and kind.
    pub fn by_gvk(&self, gvk: &GVK) -> Option<ResourceInfo> {
        BUILTIN
            .iter()
            .find(|(g, v, k, _, _)| *g == gvk.group && *v == gvk.version && *k == gvk.kind)
            .map(builtin)
            .or_else(|| {
                self.custom
                    .read()
                    .ok()?
                    .values()
                    .find(|info| info.gvk() == *gvk)
                    .cloned()
            })
    }
}
