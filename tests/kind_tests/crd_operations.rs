//! Integration tests for CRD operations
//!
//! These tests tell the story of how application teams interact with
//! Appoperator resources through the Kubernetes API.

use kube::api::{Api, PostParams};

use app_operator::crd::Appoperator;

use super::helpers::{ensure_test_cluster, fresh_namespace, sample_app};

/// Story: a team declares an application
///
/// The resource is accepted by the API server and reads back with the same
/// image and replica count.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_team_creates_appoperator() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "appop-crd-create";
    fresh_namespace(&client, ns).await;
    let api: Api<Appoperator> = Api::namespaced(client.clone(), ns);

    let created = api
        .create(&PostParams::default(), &sample_app("web", ns, "nginx:1.25", Some(3)))
        .await
        .expect("failed to create Appoperator");

    assert_eq!(created.metadata.name.as_deref(), Some("web"));
    assert_eq!(created.spec.image, "nginx:1.25");
    assert_eq!(created.spec.replicas, Some(3));

    let fetched = api.get("web").await.expect("failed to read Appoperator");
    assert_eq!(fetched.spec, created.spec);
}

/// Story: a minimal Appoperator with no fields set is still accepted
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_empty_spec_is_accepted() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "appop-crd-empty";
    fresh_namespace(&client, ns).await;
    let api: Api<Appoperator> = Api::namespaced(client.clone(), ns);

    let created = api
        .create(&PostParams::default(), &sample_app("bare", ns, "", None))
        .await
        .expect("failed to create Appoperator");

    assert!(created.spec.image.is_empty());
    assert_eq!(created.spec.replicas, None);
}
