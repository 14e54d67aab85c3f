//! Appoperator controller implementation
//!
//! This module implements the reconciliation logic for Appoperator resources.
//! Each pass reads the desired state, builds the target Deployment, reads the
//! live Deployment, and issues at most one write:
//!
//! - Deployment missing: create it
//! - replicas or first container image differ: replace the whole spec
//! - otherwise: nothing
//!
//! Store errors are returned unchanged; retry timing is left to
//! [`error_policy`].

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use super::backoff::Backoff;
use crate::config::ControllerConfig;
use crate::crd::Appoperator;
use crate::workload::{self, Drift};
use crate::{Error, FIELD_MANAGER};

/// Trait abstracting Kubernetes client operations for the Appoperator controller
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production. Getters return `Ok(None)` for 404s.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AppKubeClient: Send + Sync {
    /// Get an Appoperator by name and namespace
    async fn get_appoperator(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Appoperator>, Error>;

    /// Get a Deployment by name and namespace
    async fn get_deployment(&self, name: &str, namespace: &str)
        -> Result<Option<Deployment>, Error>;

    /// Create a Deployment
    async fn create_deployment(&self, namespace: &str, deployment: &Deployment)
        -> Result<(), Error>;

    /// Replace an existing Deployment (full update, resourceVersion checked)
    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl AppKubeClient for KubeClientImpl {
    async fn get_appoperator(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Appoperator>, Error> {
        let api: Api<Appoperator> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await.map_err(Error::from) {
            Ok(app) => Ok(Some(app)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await.map_err(Error::from) {
            Ok(deployment) => Ok(Some(deployment)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.create(&post_params(), deployment).await?;
        Ok(())
    }

    async fn replace_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<(), Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.replace(&deployment.name_any(), &post_params(), deployment)
            .await?;
        Ok(())
    }
}

/// Controller context shared across all reconciliations
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn AppKubeClient>,
    /// Attach a controller owner reference to created Deployments
    pub owner_references: bool,
    /// Per-object retry backoff for failed reconciliations
    pub backoff: Backoff,
}

impl Context {
    /// Create a context backed by a real Kubernetes client
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        Self::with_kube_client(Arc::new(KubeClientImpl::new(client)), config)
    }

    /// Create a context around any [`AppKubeClient`] implementation
    pub fn with_kube_client(kube: Arc<dyn AppKubeClient>, config: &ControllerConfig) -> Self {
        Self {
            kube,
            owner_references: config.owner_references,
            backoff: Backoff::new(config.backoff.clone()),
        }
    }

    /// Create a context for testing with default configuration
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn AppKubeClient>) -> Self {
        Self::with_kube_client(kube, &ControllerConfig::default())
    }
}

/// What a single reconciliation pass did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The Appoperator no longer exists; nothing was done
    DesiredAbsent,
    /// The Deployment was missing and has been created
    Created,
    /// The Deployment had drifted and its spec was replaced
    Updated(Drift),
    /// The Deployment already matched; no write was issued
    Unchanged,
}

impl Outcome {
    /// True if this pass wrote to the API server
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Created | Self::Updated(_))
    }
}

/// Reconcile the Appoperator identified by `key`
///
/// The desired state is always re-read from the API server rather than taken
/// from the watch cache, so a resource deleted since the trigger fired is seen
/// as absent and settles without error.
///
/// # Errors
///
/// Any API error other than a 404 on the Appoperator is returned unchanged.
#[instrument(skip(key, ctx), fields(appoperator = %key.name, namespace = ?key.namespace))]
pub async fn reconcile_key(key: &ObjectRef<Appoperator>, ctx: &Context) -> Result<Outcome, Error> {
    let name = key.name.as_str();
    let namespace = key
        .namespace
        .as_deref()
        .ok_or_else(|| Error::validation(format!("Appoperator {name} has no namespace")))?;

    let app = match ctx.kube.get_appoperator(name, namespace).await {
        Ok(Some(app)) => app,
        Ok(None) => {
            debug!("Appoperator not found, nothing to do");
            return Ok(Outcome::DesiredAbsent);
        }
        Err(e) => {
            error!(error = %e, "failed to fetch Appoperator");
            return Err(e);
        }
    };

    let mut target = match workload::desired_deployment(&app) {
        Ok(target) => target,
        Err(e) => {
            error!(error = %e, "failed to build Deployment");
            return Err(e);
        }
    };

    let existing = match ctx.kube.get_deployment(name, namespace).await {
        Ok(existing) => existing,
        Err(e) => {
            error!(error = %e, "failed to fetch Deployment");
            return Err(e);
        }
    };

    match existing {
        None => {
            if ctx.owner_references && !workload::set_owner(&mut target, &app) {
                warn!("Appoperator has no uid, creating Deployment without owner reference");
            }
            if let Err(e) = ctx.kube.create_deployment(namespace, &target).await {
                error!(error = %e, "failed to create Deployment");
                return Err(e);
            }
            info!(
                deployment = %workload::display_name(&target),
                replicas = ?workload::replicas(&target),
                image = workload::first_container_image(&target).unwrap_or_default(),
                "created Deployment"
            );
            Ok(Outcome::Created)
        }
        Some(mut existing) => {
            let drift = Drift::between(&existing, &target);
            if drift.is_none() {
                debug!("Deployment up to date");
                return Ok(Outcome::Unchanged);
            }

            workload::apply_target_spec(&mut existing, &target);
            if let Err(e) = ctx.kube.replace_deployment(namespace, &existing).await {
                error!(error = %e, "failed to update Deployment");
                return Err(e);
            }
            info!(
                deployment = %workload::display_name(&existing),
                replicas_changed = drift.replicas,
                image_changed = drift.image,
                "updated Deployment"
            );
            Ok(Outcome::Updated(drift))
        }
    }
}

/// Reconcile an Appoperator delivered by the controller runtime
///
/// Successful passes never ask for a requeue; the next watch event on the
/// Appoperator is the next trigger.
pub async fn reconcile(app: Arc<Appoperator>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = ObjectRef::from_obj(app.as_ref());
    let outcome = reconcile_key(&key, &ctx).await?;
    ctx.backoff.reset(&key);
    debug!(?outcome, appoperator = %key.name, "reconciliation finished");
    Ok(Action::await_change())
}

/// Error policy for the Appoperator controller
///
/// Requeues the same object after a per-object exponential backoff. The
/// failure itself was logged at error level where it happened.
pub fn error_policy(app: Arc<Appoperator>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ObjectRef::from_obj(app.as_ref());
    let delay = ctx.backoff.next_delay(&key);
    warn!(
        error = %error,
        appoperator = %app.name_any(),
        namespace = ?app.namespace(),
        attempt = ctx.backoff.attempts(&key),
        retry_in = ?delay,
        "requeueing Appoperator"
    );
    Action::requeue(delay)
}
