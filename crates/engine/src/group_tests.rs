// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use muster_adapters::FakeCluster;
use muster_core::{NodeResource, PodPriority, MAX_MEMORY_MB};

fn worker_group() -> (NodeGroup, Arc<FakeCluster>) {
    let shared: SharedHandle = Arc::new(Mutex::new(SharedNodes::default()));
    let cluster = Arc::new(FakeCluster::new());
    let mut job_resource = JobResource::new();
    job_resource.add_group(
        NodeRole::Worker,
        2,
        NodeResource::new(4.0, 8192),
        PodPriority::Low,
    );
    let group =
        NodeGroup::new(NodeRole::Worker, shared, Arc::new(job_resource), cluster.clone());
    (group, cluster)
}

fn populate(group: &NodeGroup, statuses: &[NodeStatus]) {
    let nodes = statuses
        .iter()
        .enumerate()
        .map(|(id, status)| {
            let id = id as u32;
            let node = Node::builder()
                .role(group.role())
                .id(id)
                .name(format!("train-worker-{id}"))
                .status(*status)
                .build();
            (id, node)
        })
        .collect();
    group.update_nodes(nodes);
}

#[test]
fn empty_group_predicates_resolve_true() {
    let (group, _) = worker_group();
    assert!(group.all_nodes_exited());
    assert!(group.all_nodes_failed());
    assert!(group.all_nodes_deleted());
    assert!(group.get_running_nodes().is_empty());
}

#[test]
fn live_node_blocks_exited() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Succeeded, NodeStatus::Running]);
    assert!(!group.all_nodes_exited());
    populate(&group, &[NodeStatus::Succeeded, NodeStatus::Failed]);
    assert!(group.all_nodes_exited());
    assert!(!group.all_nodes_failed());
    populate(&group, &[NodeStatus::Failed, NodeStatus::Failed]);
    assert!(group.all_nodes_failed());
}

#[test]
fn running_snapshot_excludes_released() {
    let (group, _) = worker_group();
    let mut released = Node::builder().id(1).status(NodeStatus::Running).build();
    released.is_released = true;
    let nodes = std::collections::HashMap::from([
        (0, Node::builder().id(0).status(NodeStatus::Running).build()),
        (1, released),
    ]);
    group.update_nodes(nodes);
    let running = group.get_running_nodes();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, 0);
}

#[test]
fn remove_node_tombstones_and_plans_teardown() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Running]);
    let plan = group.remove_node(0).unwrap();
    assert_eq!(plan.remove, vec!["train-worker-0"]);

    let shared = group.shared().lock();
    let node = &shared.index[&NodeRole::Worker][&0];
    assert!(node.is_released);
    assert!(!node.critical);
    assert!(!node.relaunchable);
    assert_eq!(node.status, NodeStatus::Deleted);
}

#[test]
fn remove_unknown_node_errors() {
    let (group, _) = worker_group();
    populate(&group, &[]);
    assert!(matches!(
        group.remove_node(7),
        Err(EngineError::NodeNotFound { role: NodeRole::Worker, id: 7 })
    ));
}

#[test]
fn relaunch_allocates_the_next_dense_id() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Running, NodeStatus::Failed]);
    let failed = group.shared().lock().index[&NodeRole::Worker][&1].clone();

    let spec = group.prepare_relaunch(&failed).unwrap();
    assert_eq!(spec.id, 2);
    assert_eq!(spec.name, "train-worker-2");
    assert_eq!(spec.priority, PodPriority::Low);

    let shared = group.shared().lock();
    let replacement = &shared.index[&NodeRole::Worker][&2];
    assert_eq!(replacement.status, NodeStatus::Initial);
    assert_eq!(replacement.max_relaunch_count, failed.max_relaunch_count);
    assert_eq!(replacement.relaunch_count, failed.relaunch_count);
}

#[test]
fn recovered_oom_relaunch_doubles_memory() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Failed]);
    let mut failed = group.shared().lock().index[&NodeRole::Worker][&0].clone();
    failed.config_resource = NodeResource::new(4.0, 8192);
    failed.is_recovered_oom = true;

    let spec = group.prepare_relaunch(&failed).unwrap();
    assert_eq!(spec.resource.memory_mb, 16_384);
}

#[test]
fn oom_memory_bump_caps_at_the_ceiling() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Failed]);
    let mut failed = group.shared().lock().index[&NodeRole::Worker][&0].clone();
    failed.config_resource = NodeResource::new(4.0, MAX_MEMORY_MB - 10);
    failed.is_recovered_oom = true;

    let spec = group.prepare_relaunch(&failed).unwrap();
    assert_eq!(spec.resource.memory_mb, MAX_MEMORY_MB);
}

#[test]
fn relaunch_without_a_group_spec_errors() {
    let shared: SharedHandle = Arc::new(Mutex::new(SharedNodes::default()));
    let cluster = Arc::new(FakeCluster::new());
    // Job resource knows nothing about evaluators.
    let group = NodeGroup::new(
        NodeRole::Evaluator,
        shared,
        Arc::new(JobResource::new()),
        cluster,
    );
    populate(&group, &[NodeStatus::Failed]);
    let failed = group.shared().lock().index[&NodeRole::Evaluator][&0].clone();

    assert!(matches!(
        group.prepare_relaunch(&failed),
        Err(EngineError::RoleNotFound(NodeRole::Evaluator))
    ));
}

#[test]
fn relaunch_inherits_critical_flag() {
    let (group, _) = worker_group();
    populate(&group, &[NodeStatus::Failed]);
    let mut failed = group.shared().lock().index[&NodeRole::Worker][&0].clone();
    failed.critical = true;

    group.prepare_relaunch(&failed).unwrap();
    let shared = group.shared().lock();
    assert!(shared.index[&NodeRole::Worker][&1].critical);
}
