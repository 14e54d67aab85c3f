//! Custom Resource Definitions for the operator
//!
//! This module contains the Appoperator CRD and its supporting types.

mod appoperator;
mod types;

pub use appoperator::{Appoperator, AppoperatorSpec, AppoperatorStatus};
pub use types::{Condition, ConditionStatus};

use kube::CustomResourceExt;

/// Render the Appoperator CRD as a YAML manifest
pub fn crd_yaml() -> crate::Result<String> {
    Ok(serde_yaml::to_string(&Appoperator::crd())?)
}
