//! Integration tests for the reconciliation lifecycle
//!
//! Each story drives the reconciler directly against a real API server, one
//! pass at a time, and checks the Deployment the cluster ends up with.

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DeleteParams, PostParams};
use kube::runtime::reflector::ObjectRef;
use kube::Client;

use app_operator::config::ControllerConfig;
use app_operator::controller::{reconcile_key, Context, Outcome};
use app_operator::crd::Appoperator;
use app_operator::workload;

use super::helpers::{ensure_test_cluster, fresh_namespace, sample_app};

// =============================================================================
// Test Fixtures
// =============================================================================

fn key(name: &str, ns: &str) -> ObjectRef<Appoperator> {
    ObjectRef::new(name).within(ns)
}

async fn setup(ns: &str) -> (Client, Api<Appoperator>, Api<Deployment>) {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    fresh_namespace(&client, ns).await;
    (
        client.clone(),
        Api::namespaced(client.clone(), ns),
        Api::namespaced(client, ns),
    )
}

// =============================================================================
// Lifecycle Stories
// =============================================================================

/// Story: the "web" application from first deploy through a scale-up
///
/// Expected behavior:
/// - First pass creates a Deployment named "web" with 3 replicas of nginx:1.25
/// - Second pass with nothing changed leaves the resourceVersion untouched
/// - Scaling the Appoperator to 5 updates the Deployment and keeps the image
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_web_is_created_then_scaled() {
    let ns = "appop-web";
    let (client, apps, deployments) = setup(ns).await;
    let ctx = Context::new(client, &ControllerConfig::default());

    apps.create(&PostParams::default(), &sample_app("web", ns, "nginx:1.25", Some(3)))
        .await
        .expect("failed to create Appoperator");

    let outcome = reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("first pass");
    assert_eq!(outcome, Outcome::Created);

    let created = deployments.get("web").await.expect("Deployment exists");
    assert_eq!(workload::replicas(&created), Some(3));
    assert_eq!(workload::first_container_image(&created), Some("nginx:1.25"));

    let outcome = reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("second pass");
    assert_eq!(outcome, Outcome::Unchanged);
    let unchanged = deployments.get("web").await.expect("Deployment exists");
    assert_eq!(
        unchanged.metadata.resource_version,
        created.metadata.resource_version
    );

    let mut app = apps.get("web").await.expect("Appoperator exists");
    app.spec.replicas = Some(5);
    apps.replace("web", &PostParams::default(), &app)
        .await
        .expect("failed to scale Appoperator");

    let outcome = reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("third pass");
    assert!(outcome.wrote());

    let scaled = deployments.get("web").await.expect("Deployment exists");
    assert_eq!(workload::replicas(&scaled), Some(5));
    assert_eq!(workload::first_container_image(&scaled), Some("nginx:1.25"));
}

/// Story: a new image rolls out through the Deployment
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_image_update_rolls_out() {
    let ns = "appop-image";
    let (client, apps, deployments) = setup(ns).await;
    let ctx = Context::new(client, &ControllerConfig::default());

    apps.create(&PostParams::default(), &sample_app("api", ns, "nginx:1.25", Some(1)))
        .await
        .expect("failed to create Appoperator");
    reconcile_key(&key("api", ns), &ctx)
        .await
        .expect("create pass");

    let mut app = apps.get("api").await.expect("Appoperator exists");
    app.spec.image = "nginx:1.26".to_string();
    apps.replace("api", &PostParams::default(), &app)
        .await
        .expect("failed to update image");

    reconcile_key(&key("api", ns), &ctx)
        .await
        .expect("update pass");
    let deployment = deployments.get("api").await.expect("Deployment exists");
    assert_eq!(workload::first_container_image(&deployment), Some("nginx:1.26"));
    assert_eq!(workload::replicas(&deployment), Some(1));
}

/// Story: an out-of-band scale is undone on the next pass
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_manual_scale_is_reverted() {
    let ns = "appop-drift";
    let (client, apps, deployments) = setup(ns).await;
    let ctx = Context::new(client, &ControllerConfig::default());

    apps.create(&PostParams::default(), &sample_app("web", ns, "nginx:1.25", Some(2)))
        .await
        .expect("failed to create Appoperator");
    reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("create pass");

    let mut live = deployments.get("web").await.expect("Deployment exists");
    if let Some(spec) = live.spec.as_mut() {
        spec.replicas = Some(7);
    }
    deployments
        .replace("web", &PostParams::default(), &live)
        .await
        .expect("failed to scale Deployment by hand");

    reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("correcting pass");
    let corrected = deployments.get("web").await.expect("Deployment exists");
    assert_eq!(workload::replicas(&corrected), Some(2));
}

/// Story: deleting an Appoperator settles quietly
///
/// Without owner references nothing removes the Deployment; the reconciler
/// treats the missing Appoperator as success and writes nothing.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_appoperator_is_ignored() {
    let ns = "appop-delete";
    let (client, apps, deployments) = setup(ns).await;
    let ctx = Context::new(client, &ControllerConfig::default());

    apps.create(&PostParams::default(), &sample_app("web", ns, "nginx:1.25", Some(1)))
        .await
        .expect("failed to create Appoperator");
    reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("create pass");

    apps.delete("web", &DeleteParams::default())
        .await
        .expect("failed to delete Appoperator");

    let outcome = reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("absent pass");
    assert_eq!(outcome, Outcome::DesiredAbsent);
    assert!(deployments
        .get_opt("web")
        .await
        .expect("Deployment lookup")
        .is_some());
}

/// Story: with owner references on, the Deployment points at its Appoperator
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_owner_reference_links_deployment() {
    let ns = "appop-owner";
    let (client, apps, deployments) = setup(ns).await;
    let config = ControllerConfig {
        owner_references: true,
        ..Default::default()
    };
    let ctx = Context::new(client, &config);

    let app = apps
        .create(&PostParams::default(), &sample_app("web", ns, "nginx:1.25", Some(1)))
        .await
        .expect("failed to create Appoperator");
    reconcile_key(&key("web", ns), &ctx)
        .await
        .expect("create pass");

    let deployment = deployments.get("web").await.expect("Deployment exists");
    let owner = deployment
        .metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.first())
        .expect("owner reference set");
    assert_eq!(owner.kind, "Appoperator");
    assert_eq!(Some(owner.uid.as_str()), app.metadata.uid.as_deref());
}
