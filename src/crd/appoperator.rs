//! Appoperator Custom Resource Definition
//!
//! An Appoperator declares the image and replica count of a single-container
//! workload. The controller realises it as a Deployment of the same name in
//! the same namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// Specification for an Appoperator
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "tools.vorozhko.net",
    version = "v1beta1",
    kind = "Appoperator",
    plural = "appoperators",
    shortname = "app",
    status = "AppoperatorStatus",
    namespaced,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppoperatorSpec {
    /// Container image for the managed Deployment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// Replica count for the managed Deployment
    ///
    /// Absent means "unspecified", which is not the same as zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

/// Status for an Appoperator
///
/// Declared for forward compatibility; the controller never writes it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppoperatorStatus {
    /// Latest available observations of the resource's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
