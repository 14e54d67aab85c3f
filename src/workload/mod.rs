//! Managed workload construction and drift detection
//!
//! The managed workload of an Appoperator is a Deployment with the same name
//! and namespace, a `{app: <name>}` selector, and a pod template holding
//! exactly one container ([`crate::CONTAINER_NAME`]) running the desired image.
//!
//! Only two fields are tracked for drift: the replica count and the image of
//! the first container. Everything else on a live Deployment is ignored when
//! deciding whether to write, but discarded when a write does happen, because
//! the update replaces the whole spec.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};

use crate::crd::Appoperator;
use crate::{Error, APP_LABEL_KEY, CONTAINER_NAME};

/// Labels shared by the selector and the pod template
pub fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), name.to_string())])
}

/// Build the Deployment an Appoperator asks for
///
/// Pure function of the resource's name, namespace and spec. An unspecified
/// replica count stays unspecified and an empty image is left unset.
///
/// # Errors
///
/// Returns a validation error when the resource has no name or namespace.
pub fn desired_deployment(app: &Appoperator) -> Result<Deployment, Error> {
    let name = app
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::validation("Appoperator has no metadata.name"))?;
    let namespace = app
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::validation(format!("Appoperator {name} has no namespace")))?;

    let labels = app_labels(name);
    let image = (!app.spec.image.is_empty()).then(|| app.spec.image.clone());

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: app.spec.replicas,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image,
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// Attach a controller owner reference pointing at the Appoperator
///
/// Returns false (and leaves the Deployment untouched) if the resource has no
/// UID yet, which only happens for objects that never reached the API server.
pub fn set_owner(deployment: &mut Deployment, app: &Appoperator) -> bool {
    match app.controller_owner_ref(&()) {
        Some(owner) => {
            deployment.owner_references_mut().push(owner);
            true
        }
        None => false,
    }
}

/// Replica count declared on a Deployment
pub fn replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|s| s.replicas)
}

/// Image of the first container in a Deployment's pod template
pub fn first_container_image(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|p| p.containers.first())
        .and_then(|c| c.image.as_deref())
}

/// Which tracked fields differ between a live Deployment and its target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Drift {
    /// Replica count differs
    pub replicas: bool,
    /// First container image differs
    pub image: bool,
}

impl Drift {
    /// Compare the tracked fields of `existing` against `target`
    ///
    /// An unspecified target replica count never counts as drift: the API
    /// server defaults it on write, so there is nothing to converge to.
    pub fn between(existing: &Deployment, target: &Deployment) -> Self {
        let replicas = match replicas(target) {
            Some(want) => replicas(existing) != Some(want),
            None => false,
        };
        let image = first_container_image(existing).unwrap_or_default()
            != first_container_image(target).unwrap_or_default();
        Self { replicas, image }
    }

    /// True when neither tracked field differs
    pub fn is_none(&self) -> bool {
        !self.replicas && !self.image
    }
}

/// Overwrite `existing`'s spec with the target spec, keeping its metadata
///
/// Metadata (resourceVersion, labels, owner references) is kept so the update
/// is an optimistic-concurrency replace of the live object.
pub fn apply_target_spec(existing: &mut Deployment, target: &Deployment) {
    existing.spec = target.spec.clone();
}

/// Human-readable identifier used in logs (`namespace/name`)
pub fn display_name(deployment: &Deployment) -> String {
    format!(
        "{}/{}",
        deployment.namespace().unwrap_or_default(),
        deployment.name_any()
    )
}
