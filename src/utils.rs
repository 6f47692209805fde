use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use serde_json::Value;

/// Fill in the fields the API server owns on first write.
///
/// The namespace always follows the store key: cluster-scoped objects (empty
/// `namespace`) never carry one.
pub fn ensure_metadata(meta: &mut ObjectMeta, namespace: &str) {
    meta.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
    if meta.creation_timestamp.is_none() {
        meta.creation_timestamp = Some(Time(chrono::Utc::now()));
    }
    if meta.uid.is_none() {
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
    }
    meta.labels.get_or_insert_with(Default::default);
}

pub fn extract_metadata(object: &Value) -> Result<ObjectMeta> {
    let meta_value = object
        .get("metadata")
        .ok_or_else(|| Error::Metadata("Object missing metadata field".to_string()))?;

    serde_json::from_value(meta_value.clone())
        .map_err(|e| Error::Metadata(format!("Failed to parse metadata: {}", e)))
}

pub fn object_name(object: &Value) -> Option<&str> {
    object
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
}
