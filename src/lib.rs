//! app-operator - keeps one Deployment in step with each Appoperator resource
//!
//! An `Appoperator` declares an image and a replica count. The controller
//! watches those resources and converges a same-named Deployment to match:
//! create it when missing, overwrite its spec when the replica count or the
//! first container's image has drifted, and leave it alone otherwise.
//!
//! # Modules
//!
//! - [`crd`] - The `Appoperator` custom resource definition
//! - [`workload`] - Target Deployment construction and drift detection
//! - [`controller`] - Reconciliation logic, error policy and controller wiring
//! - [`config`] - Command line / environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//! - [`rbac`] - ClusterRole manifest for the controller
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod rbac;
pub mod telemetry;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name the controller registers under; also used as the event/log component
pub const CONTROLLER_NAME: &str = "appoperator";

/// Field manager recorded on every write issued by the controller
pub const FIELD_MANAGER: &str = "appoperator-controller";

/// Name of the single container in every managed pod template
pub const CONTAINER_NAME: &str = "app-container";

/// Label key used for the Deployment selector and pod template labels
pub const APP_LABEL_KEY: &str = "app";
