//! Integration tests for app-operator
//!
//! These tests require a Kubernetes cluster (kind) and tell the story of how
//! an application team's Appoperator resources turn into Deployments.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating and reading Appoperator
//!   resources through the Kubernetes API
//!
//! - `reconcile_lifecycle`: Stories about the reconciler converging real
//!   Deployments (create, no-op, scale, image rollout, deletion)
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod crd_operations;
mod reconcile_lifecycle;
