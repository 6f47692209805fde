//! In-memory object store backing the mock server

use crate::utils::{ensure_metadata, extract_metadata};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GVR {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GVR {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GVK {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GVK {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Value,
    gvk: GVK,
}

// BTreeMaps keep list output ordered by namespace, then name.
type ObjectsByName = BTreeMap<String, StoredObject>;
type ObjectsByNamespace = BTreeMap<String, ObjectsByName>;
type ObjectStorage = HashMap<GVR, ObjectsByNamespace>;

/// Stores objects by resource, namespace and name.
///
/// Cluster-scoped resources are stored under the empty namespace. Resource
/// versions come from a single counter shared by every resource type, so they
/// are strictly increasing across the whole store like etcd revisions.
pub struct ObjectTracker {
    objects: RwLock<ObjectStorage>,
    revision: AtomicU64,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ObjectStorage>> {
        self.objects
            .read()
            .map_err(|_| Error::Internal("object store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ObjectStorage>> {
        self.objects
            .write()
            .map_err(|_| Error::Internal("object store lock poisoned".to_string()))
    }

    fn next_resource_version(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Resource version of the most recent write, reported on list responses.
    pub fn current_resource_version(&self) -> String {
        self.revision.load(Ordering::SeqCst).to_string()
    }

    fn not_found(gvr: &GVR, namespace: &str, name: &str) -> Error {
        Error::NotFound {
            kind: gvr.resource.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Seed an object, replacing any existing object with the same name.
    ///
    /// A resource version already present on the object is kept.
    pub fn add(&self, gvr: &GVR, gvk: &GVK, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Adding object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::InvalidRequest("Object name is required".to_string()))?;

        if meta.resource_version.as_ref().is_none_or(|rv| rv.is_empty()) {
            meta.resource_version = Some(self.next_resource_version());
        }
        ensure_metadata(&mut meta, namespace);
        object["metadata"] = serde_json::to_value(&meta)?;

        let mut objects = self.write()?;
        objects
            .entry(gvr.clone())
            .or_default()
            .entry(namespace.to_string())
            .or_default()
            .insert(
                name.clone(),
                StoredObject {
                    data: object.clone(),
                    gvk: gvk.clone(),
                },
            );

        debug!("Added object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn create(
        &self,
        gvr: &GVR,
        gvk: &GVK,
        mut object: Value,
        namespace: &str,
    ) -> Result<Value> {
        trace!("Creating object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidRequest("Object name is required".to_string()))?;

        if meta
            .resource_version
            .as_ref()
            .is_some_and(|rv| !rv.is_empty())
        {
            return Err(Error::InvalidRequest(
                "resourceVersion can not be set for Create requests".to_string(),
            ));
        }

        let mut objects = self.write()?;
        let ns_objects = objects
            .entry(gvr.clone())
            .or_default()
            .entry(namespace.to_string())
            .or_default();

        if ns_objects.contains_key(&name) {
            return Err(Error::AlreadyExists {
                kind: gvk.kind.clone(),
                name,
                namespace: namespace.to_string(),
            });
        }

        meta.resource_version = Some(self.next_resource_version());
        meta.deletion_timestamp = None;
        ensure_metadata(&mut meta, namespace);
        object["metadata"] = serde_json::to_value(&meta)?;

        ns_objects.insert(
            name.clone(),
            StoredObject {
                data: object.clone(),
                gvk: gvk.clone(),
            },
        );

        debug!("Created object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn get(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Getting object: {:?} {}/{}", gvr, namespace, name);

        let objects = self.read()?;
        objects
            .get(gvr)
            .and_then(|by_ns| by_ns.get(namespace))
            .and_then(|by_name| by_name.get(name))
            .map(|stored| stored.data.clone())
            .ok_or_else(|| Self::not_found(gvr, namespace, name))
    }

    /// Replace an existing object.
    ///
    /// A non-empty `resourceVersion` on the incoming object must match the stored
    /// one. `uid` and `creationTimestamp` always come from the stored object.
    pub fn update(&self, gvr: &GVR, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Updating object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::InvalidRequest("Object name is required".to_string()))?;

        let mut objects = self.write()?;
        let stored = objects
            .get_mut(gvr)
            .and_then(|by_ns| by_ns.get_mut(namespace))
            .and_then(|by_name| by_name.get_mut(&name))
            .ok_or_else(|| Self::not_found(gvr, namespace, &name))?;

        let existing_meta = extract_metadata(&stored.data)?;
        if let (Some(provided), Some(current)) =
            (&meta.resource_version, &existing_meta.resource_version)
        {
            if !provided.is_empty() && provided != current {
                return Err(Error::Conflict(format!(
                    "the object has been modified; resource version mismatch: expected {}, got {}",
                    current, provided
                )));
            }
        }

        meta.resource_version = Some(self.next_resource_version());
        meta.uid = existing_meta.uid;
        meta.creation_timestamp = existing_meta.creation_timestamp;
        ensure_metadata(&mut meta, namespace);
        object["metadata"] = serde_json::to_value(&meta)?;

        stored.data = object.clone();

        debug!("Updated object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn delete(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Deleting object: {:?} {}/{}", gvr, namespace, name);

        let mut objects = self.write()?;
        let stored = objects
            .get_mut(gvr)
            .and_then(|by_ns| by_ns.get_mut(namespace))
            .and_then(|by_name| by_name.remove(name))
            .ok_or_else(|| Self::not_found(gvr, namespace, name))?;

        debug!("Deleted object: {}/{}", namespace, name);
        Ok(stored.data)
    }

    /// List objects of one resource, in a single namespace or across all of them.
    ///
    /// A resource with nothing stored yields an empty list.
    pub fn list(&self, gvr: &GVR, namespace: Option<&str>) -> Result<Vec<Value>> {
        trace!("Listing objects: {:?} in namespace: {:?}", gvr, namespace);

        let objects = self.read()?;
        let Some(by_ns) = objects.get(gvr) else {
            return Ok(Vec::new());
        };

        let result = match namespace {
            Some(ns) => by_ns
                .get(ns)
                .map(|by_name| by_name.values().map(|s| s.data.clone()).collect())
                .unwrap_or_default(),
            None => by_ns
                .values()
                .flat_map(|by_name| by_name.values().map(|s| s.data.clone()))
                .collect(),
        };

        Ok(result)
    }

    /// Kinds currently holding at least one object, with their object counts.
    pub fn kinds(&self) -> Result<BTreeMap<String, usize>> {
        let objects = self.read()?;
        let mut counts = BTreeMap::new();
        for stored in objects.values().flat_map(|ns| ns.values()).flat_map(|n| n.values()) {
            *counts.entry(stored.gvk.kind.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.kinds()?.values().sum())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every object. The resource version counter keeps running.
    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        debug!("Cleared object tracker");
        Ok(())
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}
