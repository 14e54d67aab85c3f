//! Controller startup: CRD install and the watch loop

use std::sync::Arc;

use futures::{future, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{DynamicObject, Patch, PatchParams};
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};

use super::appoperator::{error_policy, reconcile, Context};
use crate::config::ControllerConfig;
use crate::crd::Appoperator;
use crate::{Error, CONTROLLER_NAME, FIELD_MANAGER};

/// Ensure the Appoperator CRD is installed
///
/// Uses server-side apply so the installed schema always matches this binary.
pub async fn ensure_crd_installed(client: &Client) -> Result<(), Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let crd = Appoperator::crd_name();

    tracing::info!(crd, "Installing Appoperator CRD...");
    crds.patch(crd, &params, &Patch::Apply(&Appoperator::crd()))
        .await?;
    tracing::info!(crd, "Appoperator CRD installed/updated");
    Ok(())
}

/// Handle one item from the controller's output stream
///
/// Reconcile failures were already logged by the reconciler, so they are only
/// traced here. An object that vanished while a retry was pending has its
/// backoff entry dropped.
fn handle_reconcile_result(
    result: Result<(ObjectRef<Appoperator>, Action), controller::Error<Error, watcher::Error>>,
    ctx: &Context,
) {
    match result {
        Ok((obj, action)) => {
            tracing::debug!(
                controller = CONTROLLER_NAME,
                object = %obj.name,
                namespace = ?obj.namespace,
                ?action,
                "Appoperator reconciliation completed"
            );
        }
        Err(controller::Error::ObjectNotFound(obj)) => {
            ctx.backoff.reset(&appoperator_ref(&obj));
            tracing::debug!(
                controller = CONTROLLER_NAME,
                object = %obj.name,
                namespace = ?obj.namespace,
                "Appoperator deleted before retry"
            );
        }
        Err(controller::Error::ReconcilerFailed(_, obj)) => {
            tracing::debug!(
                controller = CONTROLLER_NAME,
                object = %obj.name,
                namespace = ?obj.namespace,
                "Appoperator reconciliation failed, retry scheduled"
            );
        }
        Err(e) => {
            tracing::error!(controller = CONTROLLER_NAME, error = ?e, "Appoperator controller error");
        }
    }
}

fn appoperator_ref(obj: &ObjectRef<DynamicObject>) -> ObjectRef<Appoperator> {
    let key = ObjectRef::new(&obj.name);
    match obj.namespace.as_deref() {
        Some(ns) => key.within(ns),
        None => key,
    }
}

/// Run the Appoperator controller until SIGINT/SIGTERM
///
/// Only Appoperators are watched. Deployment edits are not observed, so a
/// Deployment changed out of band is corrected on the next Appoperator event
/// or watch resync.
pub async fn run(client: Client, config: &ControllerConfig) -> Result<(), Error> {
    if config.install_crd {
        ensure_crd_installed(&client).await?;
    }

    let apps: Api<Appoperator> = match config.namespace.as_deref() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let ctx = Arc::new(Context::new(client, config));

    tracing::info!(
        controller = CONTROLLER_NAME,
        namespace = config.namespace.as_deref().unwrap_or("<all>"),
        owner_references = config.owner_references,
        "Starting Appoperator controller"
    );

    Controller::new(
        apps,
        WatcherConfig::default().timeout(config.watch_timeout_secs),
    )
    .shutdown_on_signal()
    .run(reconcile, error_policy, ctx.clone())
    .for_each(move |result| {
        handle_reconcile_result(result, &ctx);
        future::ready(())
    })
    .await;

    tracing::info!(controller = CONTROLLER_NAME, "Appoperator controller stopped");
    Ok(())
}
