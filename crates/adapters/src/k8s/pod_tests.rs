// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_core::{NodeResource, NodeRole};

fn launch_spec() -> LaunchSpec {
    LaunchSpec {
        role: NodeRole::Worker,
        id: 4,
        name: "train-worker-4".to_string(),
        resource: NodeResource::new(4.0, 8192),
        priority: PodPriority::High,
    }
}

#[test]
fn pod_carries_job_labels() {
    let pod = build_pod("train", &launch_spec());
    let labels = pod.metadata.labels.unwrap();
    assert_eq!(labels.get(JOB_NAME_LABEL).map(String::as_str), Some("train"));
    assert_eq!(labels.get(REPLICA_TYPE_LABEL).map(String::as_str), Some("worker"));
    assert_eq!(labels.get(REPLICA_INDEX_LABEL).map(String::as_str), Some("4"));
    assert_eq!(pod.metadata.name.as_deref(), Some("train-worker-4"));
}

#[test]
fn pod_requests_the_spec_resources() {
    let pod = build_pod("train", &launch_spec());
    let spec = pod.spec.unwrap();
    let requests = spec.containers[0].resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests["cpu"].0, "4");
    assert_eq!(requests["memory"].0, "8192Mi");
    assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
}

#[test]
fn priority_maps_to_class_name() {
    let mut spec = launch_spec();
    spec.priority = PodPriority::Low;
    let pod = build_pod("train", &spec);
    assert_eq!(pod.spec.unwrap().priority_class_name.as_deref(), Some("low-priority"));
}
