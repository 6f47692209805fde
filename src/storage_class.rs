//! Fluent construction of `StorageClass` objects

use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Builder for `storage.k8s.io/v1` `StorageClass` objects
///
/// ```rust
/// use kube_mock_server::StorageClassBuilder;
///
/// let sc = StorageClassBuilder::new("fast")
///     .with_provisioner("kubernetes.io/aws-ebs")
///     .with_parameter("type", "io1")
///     .with_label("tier", "gold")
///     .build();
///
/// assert_eq!(sc.provisioner, "kubernetes.io/aws-ebs");
/// assert_eq!(sc.parameters.unwrap()["type"], "io1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StorageClassBuilder {
    name: String,
    provisioner: String,
    parameters: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    reclaim_policy: Option<String>,
    volume_binding_mode: Option<String>,
    allow_volume_expansion: Option<bool>,
}

impl StorageClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_provisioner(mut self, provisioner: impl Into<String>) -> Self {
        self.provisioner = provisioner.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// `Delete` or `Retain`
    pub fn with_reclaim_policy(mut self, policy: impl Into<String>) -> Self {
        self.reclaim_policy = Some(policy.into());
        self
    }

    /// `Immediate` or `WaitForFirstConsumer`
    pub fn with_volume_binding_mode(mut self, mode: impl Into<String>) -> Self {
        self.volume_binding_mode = Some(mode.into());
        self
    }

    pub fn with_allow_volume_expansion(mut self, allow: bool) -> Self {
        self.allow_volume_expansion = Some(allow);
        self
    }

    /// Empty parameter, label and annotation maps are left unset.
    pub fn build(self) -> StorageClass {
        let non_empty = |map: BTreeMap<String, String>| (!map.is_empty()).then_some(map);

        StorageClass {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: non_empty(self.labels),
                annotations: non_empty(self.annotations),
                ..Default::default()
            },
            provisioner: self.provisioner,
            parameters: non_empty(self.parameters),
            reclaim_policy: self.reclaim_policy,
            volume_binding_mode: self.volume_binding_mode,
            allow_volume_expansion: self.allow_volume_expansion,
            ..Default::default()
        }
    }
}
