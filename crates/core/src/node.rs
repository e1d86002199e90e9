// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Training node record and status vocabulary.
//!
//! A [`Node`] is the in-memory model of one cluster-scheduled training
//! process. Records are created by [`crate::resource::JobResource`] at job
//! start and mutated only by the coordinator under its lock; the record
//! itself performs no locking.

use crate::resource::NodeResource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Role a node plays in the training topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Parameter server.
    Ps,
    /// Chief worker (runs checkpointing and evaluation hand-off).
    Chief,
    Worker,
    Evaluator,
}

impl NodeRole {
    /// All roles, in the order groups are initialized.
    pub const ALL: [NodeRole; 4] =
        [NodeRole::Ps, NodeRole::Chief, NodeRole::Worker, NodeRole::Evaluator];
}

crate::simple_display! {
    NodeRole {
        Ps => "ps",
        Chief => "chief",
        Worker => "worker",
        Evaluator => "evaluator",
    }
}

impl std::str::FromStr for NodeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ps" => Ok(NodeRole::Ps),
            "chief" => Ok(NodeRole::Chief),
            "worker" => Ok(NodeRole::Worker),
            "evaluator" => Ok(NodeRole::Evaluator),
            other => Err(format!("unknown node role: {other:?}")),
        }
    }
}

/// Lifecycle status of a node.
///
/// `Initial` is assigned at job-resource initialization, before the cluster
/// has ever reported the node. Every other status mirrors what the cluster
/// last told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Initial,
    Pending,
    Running,
    Succeeded,
    Failed,
    Deleted,
}

impl NodeStatus {
    /// Statuses that hold (or are about to hold) cluster resources.
    pub fn is_live(self) -> bool {
        matches!(self, NodeStatus::Initial | NodeStatus::Pending | NodeStatus::Running)
    }

    /// Terminal statuses — the process is gone one way or another.
    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }
}

crate::simple_display! {
    NodeStatus {
        Initial => "initial",
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Deleted => "deleted",
    }
}

/// Why an exited node exited. Absent while the node is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Evicted or externally killed (SIGKILL, preemption).
    Killed,
    Oom,
    /// Unrecoverable application error; relaunch is pointless.
    FatalError,
    Unknown,
}

crate::simple_display! {
    ExitReason {
        Killed => "killed",
        Oom => "oom",
        FatalError => "fatal_error",
        Unknown => "unknown",
    }
}

/// Cross-role node index, keyed by `(role, id)`. Ids are dense per role.
pub type NodeIndex = HashMap<NodeRole, HashMap<u32, Node>>;

/// One cluster-scheduled training process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub role: NodeRole,
    /// Unique within the role.
    pub id: u32,
    /// Pod name assigned at launch; empty until first observed.
    pub name: String,
    pub status: NodeStatus,
    pub exit_reason: Option<ExitReason>,
    /// Requested resources (relaunches may bump this).
    pub config_resource: NodeResource,
    /// Last observed usage. Advisory only; never consulted by the state machine.
    pub used_resource: NodeResource,
    pub create_time: Option<u64>,
    pub start_time: Option<u64>,
    pub relaunch_count: u32,
    pub max_relaunch_count: u32,
    /// Critical nodes are never voluntarily removed and gate job completion.
    pub critical: bool,
    /// Eligible in principle to be restarted on failure.
    pub relaunchable: bool,
    /// Tombstone. No further transitions or callbacks once set.
    pub is_released: bool,
    /// Set by the relaunch policy after an in-budget OOM; tells the
    /// launcher to bump the memory request.
    pub is_recovered_oom: bool,
    /// Service address resolved at init time.
    pub service_addr: String,
}

impl Node {
    pub fn new(role: NodeRole, id: u32) -> Self {
        Self {
            role,
            id,
            name: String::new(),
            status: NodeStatus::Initial,
            exit_reason: None,
            config_resource: NodeResource::default(),
            used_resource: NodeResource::default(),
            create_time: None,
            start_time: None,
            relaunch_count: 0,
            max_relaunch_count: 0,
            critical: false,
            relaunchable: true,
            is_released: false,
            is_recovered_oom: false,
            service_addr: String::new(),
        }
    }

    /// Refresh metadata reported by the cluster. `None` times leave the
    /// stored values untouched.
    pub fn update_info(&mut self, name: &str, create_time: Option<u64>, start_time: Option<u64>) {
        if !name.is_empty() {
            self.name = name.to_string();
        }
        if create_time.is_some() {
            self.create_time = create_time;
        }
        if start_time.is_some() {
            self.start_time = start_time;
        }
    }

    pub fn update_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub fn set_exit_reason(&mut self, reason: Option<ExitReason>) {
        self.exit_reason = reason;
    }

    pub fn update_resource_usage(&mut self, cpu: f64, memory_mb: u64) {
        self.used_resource = NodeResource { cpu, memory_mb };
    }

    pub fn inc_relaunch_count(&mut self) {
        self.relaunch_count += 1;
    }

    /// True while the node still counts toward the live set.
    pub fn is_live(&self) -> bool {
        !self.is_released && self.status.is_live()
    }

    /// True once the node's status is terminal, released or not.
    pub fn is_exited_status(&self) -> bool {
        self.status.is_terminal()
    }

    /// Tombstone the node ahead of an externally driven removal.
    ///
    /// Clears both the critical and relaunchable flags so neither the
    /// completion gate nor the relaunch policy will ever consider it again.
    pub fn mark_removed(&mut self) {
        self.critical = false;
        self.relaunchable = false;
        self.is_released = true;
        self.status = NodeStatus::Deleted;
    }
}

crate::builder! {
    pub struct NodeBuilder => Node {
        into {
            name: String = "worker-0",
            service_addr: String = "",
        }
        set {
            role: NodeRole = NodeRole::Worker,
            id: u32 = 0,
            status: NodeStatus = NodeStatus::Initial,
            exit_reason: Option<ExitReason> = None,
            config_resource: NodeResource = NodeResource::default(),
            used_resource: NodeResource = NodeResource::default(),
            create_time: Option<u64> = None,
            start_time: Option<u64> = None,
            relaunch_count: u32 = 0,
            max_relaunch_count: u32 = 3,
            critical: bool = false,
            relaunchable: bool = true,
            is_released: bool = false,
            is_recovered_oom: bool = false,
        }
    }
}

/// Mark the nodes whose failure the completion gate cannot ignore.
///
/// Chief nodes are always critical. Parameter servers are critical iff
/// `ps_is_critical`, with the PS relaunch budget. Workers listed in
/// `critical_worker_index` are critical with their per-index budget.
/// Critical nodes always keep a relaunch budget of at least one.
pub fn set_critical_node(
    index: &mut NodeIndex,
    ps_is_critical: bool,
    ps_relaunch_max_num: u32,
    critical_worker_index: &BTreeMap<u32, u32>,
) {
    if ps_is_critical {
        if let Some(nodes) = index.get_mut(&NodeRole::Ps) {
            for node in nodes.values_mut() {
                node.critical = true;
                node.max_relaunch_count = ps_relaunch_max_num.max(1);
            }
        }
    }
    if let Some(nodes) = index.get_mut(&NodeRole::Chief) {
        for node in nodes.values_mut() {
            node.critical = true;
            node.max_relaunch_count = node.max_relaunch_count.max(1);
        }
    }
    if let Some(nodes) = index.get_mut(&NodeRole::Worker) {
        for (id, budget) in critical_worker_index {
            if let Some(node) = nodes.get_mut(id) {
                node.critical = true;
                node.max_relaunch_count = (*budget).max(1);
            }
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
