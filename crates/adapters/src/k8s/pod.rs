// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod spec construction for training nodes.

use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use muster_core::{LaunchSpec, PodPriority};
use std::collections::BTreeMap;

use super::{JOB_NAME_LABEL, NODE_SERVICE_PORT, REPLICA_INDEX_LABEL, REPLICA_TYPE_LABEL};

/// Container image for training pods.
fn image() -> String {
    std::env::var("MUSTER_K8S_IMAGE").unwrap_or_else(|_| "elastic-train:latest".to_string())
}

/// Build the Pod for one training node.
///
/// Restart policy is `Never` — relaunch decisions belong to the node
/// manager, not the kubelet.
pub(super) fn build_pod(job_name: &str, spec: &LaunchSpec) -> Pod {
    let labels = BTreeMap::from([
        (JOB_NAME_LABEL.to_string(), job_name.to_string()),
        (REPLICA_TYPE_LABEL.to_string(), spec.role.to_string()),
        (REPLICA_INDEX_LABEL.to_string(), spec.id.to_string()),
    ]);

    let requests = BTreeMap::from([
        ("cpu".to_string(), Quantity(spec.resource.cpu.to_string())),
        ("memory".to_string(), Quantity(format!("{}Mi", spec.resource.memory_mb))),
    ]);

    let container = Container {
        name: "train".to_string(),
        image: Some(image()),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(NODE_SERVICE_PORT),
            ..Default::default()
        }]),
        resources: Some(ResourceRequirements {
            requests: Some(requests),
            ..Default::default()
        }),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            priority_class_name: Some(priority_class(spec.priority)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn priority_class(priority: PodPriority) -> String {
    match priority {
        PodPriority::High => "high-priority".to_string(),
        PodPriority::Low => "low-priority".to_string(),
    }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
