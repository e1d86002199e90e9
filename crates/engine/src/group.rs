// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-role node containers.
//!
//! [`NodeGroup`] is the parametric container shared by every role: it
//! operates on its role's slice of the coordinator index, under the one
//! coordinator mutex. Role-specific behavior (PS cluster views, worker
//! deferral) is layered on by composition in [`crate::ps`] and
//! [`crate::worker`].

use crate::error::EngineError;
use muster_adapters::ElasticJob;
use muster_core::{
    JobResource, LaunchSpec, Node, NodeIndex, NodeRole, NodeStatus, ScalePlan, MAX_MEMORY_MB,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// State behind the coordinator mutex: the cross-role index plus the
/// pending-relaunch counter that `wait_pending_relaunch` jobs consult.
#[derive(Default)]
pub(crate) struct SharedNodes {
    pub(crate) index: NodeIndex,
    pub(crate) pending_relaunch_count: u32,
}

pub(crate) type SharedHandle = Arc<Mutex<SharedNodes>>;

/// One role's view of the node index.
#[derive(Clone)]
pub struct NodeGroup {
    role: NodeRole,
    shared: SharedHandle,
    job_resource: Arc<JobResource>,
    elastic_job: Arc<dyn ElasticJob>,
}

impl NodeGroup {
    pub(crate) fn new(
        role: NodeRole,
        shared: SharedHandle,
        job_resource: Arc<JobResource>,
        elastic_job: Arc<dyn ElasticJob>,
    ) -> Self {
        Self { role, shared, job_resource, elastic_job }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Replace the owned view after (re)initialization.
    pub fn update_nodes(&self, nodes: HashMap<u32, Node>) {
        self.shared.lock().index.insert(self.role, nodes);
    }

    /// Tombstone one node and emit the plan naming the pod to tear down.
    pub fn remove_node(&self, id: u32) -> Result<ScalePlan, EngineError> {
        let mut shared = self.shared.lock();
        let node = shared
            .index
            .get_mut(&self.role)
            .and_then(|nodes| nodes.get_mut(&id))
            .ok_or(EngineError::NodeNotFound { role: self.role, id })?;
        node.mark_removed();
        let mut plan = ScalePlan::new();
        plan.remove.push(node.name.clone());
        Ok(plan)
    }

    /// True when no node in the group still counts as live. An empty
    /// group has trivially exited.
    pub fn all_nodes_exited(&self) -> bool {
        self.for_all(|node| node.is_released || node.is_exited_status())
    }

    pub fn all_nodes_failed(&self) -> bool {
        self.for_all(|node| node.status == NodeStatus::Failed)
    }

    pub fn all_nodes_deleted(&self) -> bool {
        self.for_all(|node| node.status == NodeStatus::Deleted)
    }

    /// Snapshot of the group's running nodes.
    pub fn get_running_nodes(&self) -> Vec<Node> {
        let shared = self.shared.lock();
        shared
            .index
            .get(&self.role)
            .map(|nodes| {
                nodes
                    .values()
                    .filter(|n| n.status == NodeStatus::Running && !n.is_released)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Register a replacement node for `failed` and describe its launch.
    ///
    /// The replacement gets the next dense id and inherits the failed
    /// node's flags and budget accounting. A recovered-OOM failure doubles
    /// the memory request, capped at the system ceiling. The caller hands
    /// the spec to the launcher outside the coordinator lock.
    pub(crate) fn prepare_relaunch(&self, failed: &Node) -> Result<LaunchSpec, EngineError> {
        let priority = self
            .job_resource
            .group(self.role)
            .map(|g| g.priority)
            .ok_or(EngineError::RoleNotFound(self.role))?;

        let mut shared = self.shared.lock();
        let nodes = shared.index.entry(self.role).or_default();
        let id = nodes.keys().max().map_or(0, |max| max + 1);

        let mut node = Node::new(self.role, id);
        node.name = self.elastic_job.node_name(self.role, id);
        node.service_addr = self.elastic_job.node_service_addr(self.role, id);
        node.critical = failed.critical;
        node.relaunch_count = failed.relaunch_count;
        node.max_relaunch_count = failed.max_relaunch_count;

        let mut resource = failed.config_resource;
        if failed.is_recovered_oom {
            resource.memory_mb = (resource.memory_mb * 2).min(MAX_MEMORY_MB);
        }
        node.config_resource = resource;

        let spec = LaunchSpec { role: self.role, id, name: node.name.clone(), resource, priority };
        nodes.insert(id, node);
        Ok(spec)
    }

    pub(crate) fn shared(&self) -> &SharedHandle {
        &self.shared
    }

    pub(crate) fn elastic_job(&self) -> &Arc<dyn ElasticJob> {
        &self.elastic_job
    }

    fn for_all(&self, predicate: impl Fn(&Node) -> bool) -> bool {
        let shared = self.shared.lock();
        shared
            .index
            .get(&self.role)
            .map(|nodes| nodes.values().all(predicate))
            .unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
