// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job resource description and scale plans.
//!
//! [`JobResource`] is the per-role group descriptor consumed once, at
//! `init_job_nodes` time, to populate the node index. [`ScalePlan`] is the
//! value handed to the external launcher when nodes must be torn down or
//! created.

use crate::node::{Node, NodeIndex, NodeRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard ceiling on a single node's memory request, in MB.
pub const MAX_MEMORY_MB: u64 = 65_536;

/// Implementation ceiling on any relaunch budget.
pub const MAX_RELAUNCH_COUNT: u32 = 5;

/// Requested or observed resources of one node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeResource {
    pub cpu: f64,
    pub memory_mb: u64,
}

impl NodeResource {
    pub fn new(cpu: f64, memory_mb: u64) -> Self {
        Self { cpu, memory_mb }
    }
}

/// Scheduling priority of a role's pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodPriority {
    #[default]
    High,
    Low,
}

impl PodPriority {
    /// Evaluators run low-priority only when explicitly asked to; anything
    /// else (including "unset") maps to high, same as workers.
    pub fn for_evaluator(requested: Option<PodPriority>) -> PodPriority {
        match requested {
            Some(PodPriority::Low) => PodPriority::Low,
            _ => PodPriority::High,
        }
    }
}

crate::simple_display! {
    PodPriority {
        High => "high",
        Low => "low",
    }
}

/// Group descriptor for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupSpec {
    pub count: u32,
    pub resource: NodeResource,
    pub priority: PodPriority,
}

/// Per-role group descriptors for a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResource {
    groups: HashMap<NodeRole, NodeGroupSpec>,
}

impl JobResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(
        &mut self,
        role: NodeRole,
        count: u32,
        resource: NodeResource,
        priority: PodPriority,
    ) {
        self.groups.insert(role, NodeGroupSpec { count, resource, priority });
    }

    /// Add the evaluator group, applying the evaluator priority rule.
    pub fn add_evaluator_group(
        &mut self,
        count: u32,
        resource: NodeResource,
        priority: Option<PodPriority>,
    ) {
        self.add_group(NodeRole::Evaluator, count, resource, PodPriority::for_evaluator(priority));
    }

    pub fn group(&self, role: NodeRole) -> Option<&NodeGroupSpec> {
        self.groups.get(&role)
    }

    pub fn count(&self, role: NodeRole) -> u32 {
        self.groups.get(&role).map_or(0, |g| g.count)
    }

    /// Populate the node index with dense-id `Initial` records.
    ///
    /// Every role gets an entry (possibly empty) so reconciliation can key
    /// its exist-set by role. Service addresses and names are resolved
    /// through the launcher-provided resolvers.
    pub fn init_job_nodes(
        &self,
        default_relaunch_budget: u32,
        resolve_addr: impl Fn(NodeRole, u32) -> String,
        resolve_name: impl Fn(NodeRole, u32) -> String,
    ) -> NodeIndex {
        let mut index = NodeIndex::new();
        for role in NodeRole::ALL {
            let mut nodes = HashMap::new();
            if let Some(spec) = self.groups.get(&role) {
                for id in 0..spec.count {
                    let mut node = Node::new(role, id);
                    node.max_relaunch_count = default_relaunch_budget;
                    node.config_resource = spec.resource;
                    node.service_addr = resolve_addr(role, id);
                    node.name = resolve_name(role, id);
                    nodes.insert(id, node);
                }
            }
            index.insert(role, nodes);
        }
        index
    }
}

/// Request to create one pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub role: NodeRole,
    pub id: u32,
    pub name: String,
    pub resource: NodeResource,
    pub priority: PodPriority,
}

/// Consolidated launch/removal request for the external launcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalePlan {
    pub launch: Vec<LaunchSpec>,
    pub remove: Vec<String>,
}

impl ScalePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.launch.is_empty() && self.remove.is_empty()
    }

    pub fn merge(&mut self, other: ScalePlan) {
        self.launch.extend(other.launch);
        self.remove.extend(other.remove);
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
