//! ClusterRole for the controller's service account

use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

use crate::crd::Appoperator;

/// Name of the generated ClusterRole
pub const CLUSTER_ROLE_NAME: &str = "app-operator-manager-role";

const ALL_VERBS: &[&str] = &["get", "list", "watch", "create", "update", "patch", "delete"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// ClusterRole granting everything the controller needs
pub fn cluster_role() -> ClusterRole {
    let group = Appoperator::group(&()).to_string();
    let plural = Appoperator::plural(&()).to_string();

    ClusterRole {
        metadata: ObjectMeta {
            name: Some(CLUSTER_ROLE_NAME.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            PolicyRule {
                api_groups: Some(vec![group.clone()]),
                resources: Some(vec![plural.clone()]),
                verbs: strings(ALL_VERBS),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![group.clone()]),
                resources: Some(vec![format!("{plural}/status")]),
                verbs: strings(&["get", "update", "patch"]),
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![group]),
                resources: Some(vec![format!("{plural}/finalizers")]),
                verbs: strings(&["update"]),
                ..Default::default()
            },
            // Managed workloads
            PolicyRule {
                api_groups: Some(vec!["apps".to_string()]),
                resources: Some(vec!["deployments".to_string()]),
                verbs: strings(ALL_VERBS),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

/// Render [`cluster_role`] as a YAML manifest
pub fn cluster_role_yaml() -> crate::Result<String> {
    Ok(serde_yaml::to_string(&cluster_role())?)
}
