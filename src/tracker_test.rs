#[cfg(test)]
mod tests {
    use crate::tracker::*;
    use serde_json::json;

    fn storage_classes() -> (GVR, GVK) {
        (
            GVR::new("storage.k8s.io", "v1", "storageclasses"),
            GVK::new("storage.k8s.io", "v1", "StorageClass"),
        )
    }

    fn create_test_object(name: &str) -> serde_json::Value {
        json!({
            "apiVersion": "storage.k8s.io/v1",
            "kind": "StorageClass",
            "metadata": { "name": name },
            "provisioner": "kubernetes.io/aws-ebs",
            "parameters": { "type": "gp2" }
        })
    }

    #[test]
    fn test_create_assigns_server_metadata() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();

        let created = tracker
            .create(&gvr, &gvk, create_test_object("standard"), "")
            .unwrap();

        assert_eq!(created["metadata"]["name"], "standard");
        assert_eq!(created["metadata"]["resourceVersion"], "1");
        assert!(created["metadata"]["uid"].is_string());
        assert!(created["metadata"]["creationTimestamp"].is_string());
        assert_eq!(created["metadata"]["labels"], json!({}));
        assert!(created["metadata"].get("namespace").is_none());

        let retrieved = tracker.get(&gvr, "", "standard").unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_create_duplicate_fails() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();

        tracker
            .create(&gvr, &gvk, create_test_object("standard"), "")
            .unwrap();
        let result = tracker.create(&gvr, &gvk, create_test_object("standard"), "");

        assert!(matches!(result, Err(crate::Error::AlreadyExists { .. })));
    }

    #[test]
    fn test_create_errors_if_resource_version_set() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        let mut obj = create_test_object("standard");
        obj["metadata"]["resourceVersion"] = json!("7");

        let result = tracker.create(&gvr, &gvk, obj, "");
        match result {
            Err(crate::Error::InvalidRequest(msg)) => {
                assert!(msg.contains("resourceVersion can not be set"))
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_create_requires_name() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        let obj = json!({"apiVersion": "storage.k8s.io/v1", "kind": "StorageClass", "metadata": {}});

        assert!(matches!(
            tracker.create(&gvr, &gvk, obj, ""),
            Err(crate::Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_resource_versions_increase_across_objects() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();

        let a = tracker.create(&gvr, &gvk, create_test_object("a"), "").unwrap();
        let b = tracker.create(&gvr, &gvk, create_test_object("b"), "").unwrap();

        let rv_a: u64 = a["metadata"]["resourceVersion"].as_str().unwrap().parse().unwrap();
        let rv_b: u64 = b["metadata"]["resourceVersion"].as_str().unwrap().parse().unwrap();
        assert!(rv_b > rv_a);
        assert_eq!(tracker.current_resource_version(), rv_b.to_string());
    }

    #[test]
    fn test_add_preserves_existing_resource_version() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        let mut obj = create_test_object("standard");
        obj["metadata"]["resourceVersion"] = json!("42");

        let added = tracker.add(&gvr, &gvk, obj, "").unwrap();
        assert_eq!(added["metadata"]["resourceVersion"], "42");
    }

    #[test]
    fn test_add_replaces_existing_object() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();

        tracker.add(&gvr, &gvk, create_test_object("standard"), "").unwrap();
        let mut replacement = create_test_object("standard");
        replacement["provisioner"] = json!("ebs.csi.aws.com");
        tracker.add(&gvr, &gvk, replacement, "").unwrap();

        let stored = tracker.get(&gvr, "", "standard").unwrap();
        assert_eq!(stored["provisioner"], "ebs.csi.aws.com");
        assert_eq!(tracker.len().unwrap(), 1);
    }

    #[test]
    fn test_update_keeps_identity_and_bumps_version() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        let created = tracker
            .create(&gvr, &gvk, create_test_object("standard"), "")
            .unwrap();

        let mut changed = created.clone();
        changed["metadata"]["labels"] = json!({"tier": "gold"});
        changed["metadata"]["uid"] = json!("something-else");

        let updated = tracker.update(&gvr, changed, "").unwrap();
        assert_eq!(updated["metadata"]["labels"]["tier"], "gold");
        assert_eq!(updated["metadata"]["uid"], created["metadata"]["uid"]);
        assert_eq!(updated["metadata"]["resourceVersion"], "2");
    }

    #[test]
    fn test_update_conflict_on_stale_version() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        let created = tracker
            .create(&gvr, &gvk, create_test_object("standard"), "")
            .unwrap();

        tracker.update(&gvr, created.clone(), "").unwrap();
        let result = tracker.update(&gvr, created, "");

        assert!(matches!(result, Err(crate::Error::Conflict(_))));
    }

    #[test]
    fn test_update_missing_object() {
        let tracker = ObjectTracker::new();
        let (gvr, _) = storage_classes();

        let result = tracker.update(&gvr, create_test_object("ghost"), "");
        assert!(matches!(result, Err(crate::Error::NotFound { .. })));
    }

    #[test]
    fn test_delete() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        tracker
            .create(&gvr, &gvk, create_test_object("standard"), "")
            .unwrap();

        let deleted = tracker.delete(&gvr, "", "standard").unwrap();
        assert_eq!(deleted["metadata"]["name"], "standard");
        assert!(tracker.get(&gvr, "", "standard").is_err());

        let again = tracker.delete(&gvr, "", "standard");
        assert!(matches!(again, Err(crate::Error::NotFound { .. })));
    }

    #[test]
    fn test_list_is_ordered_and_empty_when_unknown() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();

        assert!(tracker.list(&gvr, None).unwrap().is_empty());

        for name in ["zeta", "alpha", "mid"] {
            tracker.create(&gvr, &gvk, create_test_object(name), "").unwrap();
        }

        let names: Vec<String> = tracker
            .list(&gvr, None)
            .unwrap()
            .iter()
            .map(|o| o["metadata"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_list_by_namespace() {
        let tracker = ObjectTracker::new();
        let gvr = GVR::new("", "v1", "configmaps");
        let gvk = GVK::new("", "v1", "ConfigMap");
        let cm = |name: &str| json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": name}});

        tracker.create(&gvr, &gvk, cm("a"), "default").unwrap();
        tracker.create(&gvr, &gvk, cm("b"), "kube-system").unwrap();

        assert_eq!(tracker.list(&gvr, Some("default")).unwrap().len(), 1);
        assert_eq!(tracker.list(&gvr, Some("other")).unwrap().len(), 0);
        assert_eq!(tracker.list(&gvr, None).unwrap().len(), 2);
    }

    #[test]
    fn test_clear_and_kinds() {
        let tracker = ObjectTracker::new();
        let (gvr, gvk) = storage_classes();
        tracker.create(&gvr, &gvk, create_test_object("a"), "").unwrap();
        tracker.create(&gvr, &gvk, create_test_object("b"), "").unwrap();

        assert_eq!(tracker.kinds().unwrap().get("StorageClass"), Some(&2));

        tracker.clear().unwrap();
        assert!(tracker.is_empty().unwrap());
        assert!(tracker.list(&gvr, None).unwrap().is_empty());
    }
}
