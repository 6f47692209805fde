//! StorageClass create / list / edit / delete against the mock server

use kube_mock_server::{MockServer, StorageClassBuilder};
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server = MockServer::builder()
        .with_object(
            StorageClassBuilder::new("standard")
                .with_provisioner("kubernetes.io/aws-ebs")
                .with_parameter("type", "gp2")
                .build(),
        )
        .build()?;
    let storage_classes = server.client().storage_classes();

    let fast = StorageClassBuilder::new("fast")
        .with_provisioner("ebs.csi.aws.com")
        .with_parameter("type", "io1")
        .with_reclaim_policy("Retain")
        .with_allow_volume_expansion(true)
        .build();
    let created = storage_classes.create(&fast).await?;
    println!(
        "Created storage class: {} (resourceVersion {})",
        created.metadata.name.as_deref().unwrap_or_default(),
        created.metadata.resource_version.as_deref().unwrap_or_default()
    );

    println!("Storage classes:");
    for sc in storage_classes.list().await? {
        println!(
            "  - {} -> {}",
            sc.metadata.name.as_deref().unwrap_or_default(),
            sc.provisioner
        );
    }

    let edited = storage_classes
        .with_name("fast")
        .edit(|sc| {
            sc.metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert("tier".to_string(), "gold".to_string());
        })
        .await?;
    println!("Labels after edit: {:?}", edited.metadata.labels);

    let patched = storage_classes
        .with_name("standard")
        .patch_labels([("tier", "bronze")])
        .await?;
    println!("Labels after patch: {:?}", patched.metadata.labels);

    println!("Deleted fast: {}", storage_classes.delete(&fast).await?);
    println!("Deleted fast again: {}", storage_classes.delete(&fast).await?);
    println!("Remaining: {}", storage_classes.list().await?.len());

    Ok(())
}
