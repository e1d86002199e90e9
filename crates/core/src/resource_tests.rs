// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::node::{NodeRole, NodeStatus};

fn job_resource() -> JobResource {
    let mut resource = JobResource::new();
    resource.add_group(NodeRole::Worker, 3, NodeResource::new(4.0, 8192), PodPriority::High);
    resource.add_group(NodeRole::Ps, 2, NodeResource::new(2.0, 4096), PodPriority::High);
    resource
}

#[test]
fn init_creates_dense_initial_nodes_per_role() {
    let index = job_resource().init_job_nodes(
        2,
        |role, id| format!("{role}-{id}.svc:2222"),
        |role, id| format!("train-{role}-{id}"),
    );

    let workers = &index[&NodeRole::Worker];
    assert_eq!(workers.len(), 3);
    for id in 0..3 {
        let node = &workers[&id];
        assert_eq!(node.status, NodeStatus::Initial);
        assert_eq!(node.max_relaunch_count, 2);
        assert_eq!(node.config_resource, NodeResource::new(4.0, 8192));
        assert_eq!(node.name, format!("train-worker-{id}"));
        assert_eq!(node.service_addr, format!("worker-{id}.svc:2222"));
    }
    assert_eq!(index[&NodeRole::Ps].len(), 2);
}

#[test]
fn roles_without_a_group_get_empty_maps() {
    let index = job_resource().init_job_nodes(0, |_, _| String::new(), |_, _| String::new());
    assert!(index[&NodeRole::Chief].is_empty());
    assert!(index[&NodeRole::Evaluator].is_empty());
    assert_eq!(index.len(), NodeRole::ALL.len());
}

#[yare::parameterized(
    unset    = { None, PodPriority::High },
    explicit = { Some(PodPriority::Low), PodPriority::Low },
    high     = { Some(PodPriority::High), PodPriority::High },
)]
fn evaluator_priority_rule(requested: Option<PodPriority>, expected: PodPriority) {
    assert_eq!(PodPriority::for_evaluator(requested), expected);
}

#[test]
fn evaluator_group_applies_the_rule() {
    let mut resource = JobResource::new();
    resource.add_evaluator_group(1, NodeResource::new(1.0, 2048), None);
    assert_eq!(resource.group(NodeRole::Evaluator).map(|g| g.priority), Some(PodPriority::High));
}

#[test]
fn scale_plan_merge_concatenates() {
    let mut plan = ScalePlan::new();
    assert!(plan.is_empty());
    plan.remove.push("train-worker-0".to_string());

    let mut other = ScalePlan::new();
    other.remove.push("train-ps-1".to_string());
    other.launch.push(LaunchSpec {
        role: NodeRole::Worker,
        id: 3,
        name: "train-worker-3".to_string(),
        resource: NodeResource::new(4.0, 8192),
        priority: PodPriority::High,
    });

    plan.merge(other);
    assert_eq!(plan.remove, vec!["train-worker-0", "train-ps-1"]);
    assert_eq!(plan.launch.len(), 1);
    assert!(!plan.is_empty());
}

#[test]
fn group_count_defaults_to_zero() {
    assert_eq!(job_resource().count(NodeRole::Evaluator), 0);
    assert_eq!(job_resource().count(NodeRole::Worker), 3);
}
