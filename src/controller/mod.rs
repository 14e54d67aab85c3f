//! Controller for Appoperator resources
//!
//! The controller follows the Kubernetes observe-diff-act loop: each
//! Appoperator is turned into a target Deployment, compared against the live
//! one, and converged with at most one write.

mod appoperator;
mod backoff;
mod runner;

pub use appoperator::{
    error_policy, reconcile, reconcile_key, AppKubeClient, Context, KubeClientImpl, Outcome,
};
pub use backoff::{Backoff, BackoffConfig};
pub use runner::{ensure_crd_installed, run};
