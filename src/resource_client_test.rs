#[cfg(test)]
mod tests {
    use crate::{Error, MockServer, StorageClassBuilder};
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::api::storage::v1::StorageClass;
    use kube::api::ListParams;
    use std::collections::BTreeMap;

    fn storage_class(name: &str) -> StorageClass {
        StorageClassBuilder::new(name)
            .with_provisioner("kubernetes.io/aws-ebs")
            .with_parameter("key", "value")
            .build()
    }

    fn labels(sc: &StorageClass) -> BTreeMap<String, String> {
        sc.metadata.labels.clone().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_storage_class_crud() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        let sc = storage_class("standard");

        storage_classes.create(&sc).await.unwrap();

        let list = storage_classes.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].metadata.name.as_deref(), Some("standard"));
        assert_eq!(list[0].parameters.as_ref().unwrap()["key"], "value");
        assert!(labels(&list[0]).is_empty());

        let edited = storage_classes
            .with_name("standard")
            .edit(|sc| {
                sc.metadata
                    .labels
                    .get_or_insert_with(Default::default)
                    .insert("key1".to_string(), "value1".to_string());
            })
            .await
            .unwrap();
        assert_eq!(labels(&edited).len(), 1);
        assert_eq!(labels(&edited)["key1"], "value1");

        assert!(storage_classes.delete(&sc).await.unwrap());
        assert!(storage_classes.list().await.unwrap().is_empty());

        assert!(!storage_classes.delete(&sc).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_returns_server_metadata() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        let created = storage_classes.create(&storage_class("fast")).await.unwrap();

        assert!(created.metadata.uid.is_some());
        assert!(created.metadata.resource_version.is_some());
        assert!(created.metadata.creation_timestamp.is_some());
        assert_eq!(created.metadata.namespace, None);
        assert_eq!(created.provisioner, "kubernetes.io/aws-ebs");
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        storage_classes.create(&storage_class("standard")).await.unwrap();
        let err = storage_classes
            .create(&storage_class("standard"))
            .await
            .unwrap_err();

        match err {
            Error::AlreadyExists { kind, name, .. } => {
                assert_eq!(kind, "StorageClass");
                assert_eq!(name, "standard");
            }
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_without_name_fails() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        let err = storage_classes
            .create(&StorageClass::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(server.object_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_and_get_opt() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        storage_classes.create(&storage_class("standard")).await.unwrap();

        let sc = storage_classes.get("standard").await.unwrap();
        assert_eq!(sc.metadata.name.as_deref(), Some("standard"));

        let err = storage_classes.get("missing").await.unwrap_err();
        assert!(err.is_not_found());

        assert!(storage_classes.get_opt("missing").await.unwrap().is_none());
        assert!(storage_classes.get_opt("standard").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_edit_missing_fails_with_not_found() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        let err = storage_classes
            .with_name("missing")
            .edit(|sc| {
                sc.provisioner = "changed".to_string();
            })
            .await
            .unwrap_err();

        match err {
            Error::NotFound { kind, name, .. } => {
                assert_eq!(kind, "StorageClass");
                assert_eq!(name, "missing");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_edit_keeps_untouched_fields() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        let created = storage_classes.create(&storage_class("standard")).await.unwrap();

        let edited = storage_classes
            .with_name("standard")
            .edit(|sc| {
                sc.allow_volume_expansion = Some(true);
            })
            .await
            .unwrap();

        assert_eq!(edited.allow_volume_expansion, Some(true));
        assert_eq!(edited.parameters, created.parameters);
        assert_eq!(edited.metadata.uid, created.metadata.uid);
        assert_ne!(
            edited.metadata.resource_version,
            created.metadata.resource_version
        );
    }

    #[tokio::test]
    async fn test_edit_without_changes_is_a_no_op() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        let created = storage_classes.create(&storage_class("standard")).await.unwrap();

        let edited = storage_classes.with_name("standard").edit(|_| {}).await.unwrap();

        assert_eq!(
            edited.metadata.resource_version,
            created.metadata.resource_version
        );
    }

    #[tokio::test]
    async fn test_edit_rejects_rename() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        storage_classes.create(&storage_class("standard")).await.unwrap();

        let err = storage_classes
            .with_name("standard")
            .edit(|sc| {
                sc.metadata.name = Some("renamed".to_string());
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(storage_classes.get_opt("standard").await.unwrap().is_some());
        assert!(storage_classes.get_opt("renamed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_labels_merges() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        let sc = StorageClassBuilder::new("standard")
            .with_provisioner("kubernetes.io/aws-ebs")
            .with_label("tier", "gold")
            .build();
        storage_classes.create(&sc).await.unwrap();

        let patched = storage_classes
            .with_name("standard")
            .patch_labels([("zone", "us-east-1a")])
            .await
            .unwrap();

        let labels = labels(&patched);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["tier"], "gold");
        assert_eq!(labels["zone"], "us-east-1a");
    }

    #[tokio::test]
    async fn test_replace_with_stale_resource_version_conflicts() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        let created = storage_classes.create(&storage_class("standard")).await.unwrap();

        storage_classes
            .with_name("standard")
            .patch_labels([("tier", "gold")])
            .await
            .unwrap();

        let mut stale = created.clone();
        stale.provisioner = "ebs.csi.aws.com".to_string();
        let err = storage_classes.replace(&stale).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let mut fresh = storage_classes.get("standard").await.unwrap();
        fresh.provisioner = "ebs.csi.aws.com".to_string();
        let replaced = storage_classes.replace(&fresh).await.unwrap();
        assert_eq!(replaced.provisioner, "ebs.csi.aws.com");
        assert_eq!(labels(&replaced)["tier"], "gold");
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        for name in ["slow", "fast", "standard"] {
            storage_classes.create(&storage_class(name)).await.unwrap();
        }

        let names: Vec<String> = storage_classes
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|sc| sc.metadata.name)
            .collect();
        assert_eq!(names, vec!["fast", "slow", "standard"]);
    }

    #[tokio::test]
    async fn test_list_with_selectors() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        for (name, tier) in [("gold-1", "gold"), ("gold-2", "gold"), ("bronze-1", "bronze")] {
            let sc = StorageClassBuilder::new(name)
                .with_provisioner("kubernetes.io/aws-ebs")
                .with_label("tier", tier)
                .build();
            storage_classes.create(&sc).await.unwrap();
        }

        let gold = storage_classes
            .list_with(&ListParams::default().labels("tier=gold"))
            .await
            .unwrap();
        assert_eq!(gold.len(), 2);

        let not_gold = storage_classes
            .list_with(&ListParams::default().labels("tier!=gold"))
            .await
            .unwrap();
        assert_eq!(not_gold.len(), 1);
        assert_eq!(not_gold[0].metadata.name.as_deref(), Some("bronze-1"));

        let by_name = storage_classes
            .list_with(&ListParams::default().fields("metadata.name=gold-2"))
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let limited = storage_classes
            .list_with(&ListParams::default().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_list_with_set_based_selectors() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();

        for (name, tier) in [("gold-1", "gold"), ("gold-2", "gold"), ("bronze-1", "bronze")] {
            let sc = StorageClassBuilder::new(name)
                .with_provisioner("kubernetes.io/aws-ebs")
                .with_label("tier", tier)
                .build();
            storage_classes.create(&sc).await.unwrap();
        }
        let legacy = StorageClassBuilder::new("legacy")
            .with_provisioner("kubernetes.io/aws-ebs")
            .with_label("legacy", "true")
            .build();
        storage_classes.create(&legacy).await.unwrap();

        let names = |list: Vec<StorageClass>| -> Vec<String> {
            list.into_iter().filter_map(|sc| sc.metadata.name).collect()
        };

        let gold = storage_classes
            .list_with(&ListParams::default().labels("tier in (gold)"))
            .await
            .unwrap();
        assert_eq!(names(gold), vec!["gold-1", "gold-2"]);

        let not_gold = storage_classes
            .list_with(&ListParams::default().labels("tier notin (gold)"))
            .await
            .unwrap();
        assert_eq!(names(not_gold), vec!["bronze-1", "legacy"]);

        let tiered = storage_classes
            .list_with(&ListParams::default().labels("tier in (gold, bronze),!legacy"))
            .await
            .unwrap();
        assert_eq!(tiered.len(), 3);

        let untiered = storage_classes
            .list_with(&ListParams::default().labels("!tier"))
            .await
            .unwrap();
        assert_eq!(names(untiered), vec!["legacy"]);
    }

    #[tokio::test]
    async fn test_delete_by_name() {
        let server = MockServer::new();
        let storage_classes = server.client().storage_classes();
        storage_classes.create(&storage_class("standard")).await.unwrap();

        assert!(storage_classes.with_name("standard").delete().await.unwrap());
        assert!(!storage_classes.delete_by_name("standard").await.unwrap());
        assert_eq!(server.object_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_namespaced_client() {
        let server = MockServer::new();
        let client = server.client();
        let team_a = client.namespaced::<ConfigMap>("team-a");
        let team_b = client.namespaced::<ConfigMap>("team-b");

        let mut cm = ConfigMap::default();
        cm.metadata.name = Some("settings".to_string());

        let created = team_a.create(&cm).await.unwrap();
        assert_eq!(created.metadata.namespace.as_deref(), Some("team-a"));

        assert_eq!(team_a.list().await.unwrap().len(), 1);
        assert!(team_b.list().await.unwrap().is_empty());
        assert!(team_b.get("settings").await.unwrap_err().is_not_found());

        let mut foreign = cm.clone();
        foreign.metadata.name = Some("foreign".to_string());
        foreign.metadata.namespace = Some("prod".to_string());
        let err = team_a.create(&foreign).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(client
            .namespaced::<ConfigMap>("prod")
            .get_opt("foreign")
            .await
            .unwrap()
            .is_none());

        // A second object with the same name in another namespace is fine
        team_b.create(&cm).await.unwrap();
        assert_eq!(client.resources::<ConfigMap>().list().await.unwrap().len(), 2);
    }
}
