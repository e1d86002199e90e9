// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingress events from the cluster watcher.

use crate::node::{ExitReason, Node, NodeRole, NodeStatus};
use serde::{Deserialize, Serialize};

/// Kind of change the cluster reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

crate::simple_display! {
    EventType {
        Added => "added",
        Modified => "modified",
        Deleted => "deleted",
    }
}

/// Point-in-time view of one node as the cluster reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub role: NodeRole,
    pub id: u32,
    pub name: String,
    pub status: NodeStatus,
    pub exit_reason: Option<ExitReason>,
    pub create_time: Option<u64>,
    pub start_time: Option<u64>,
}

impl NodeSnapshot {
    /// Snapshot of an in-memory record, as the watcher would report it.
    pub fn of(node: &Node) -> Self {
        Self {
            role: node.role,
            id: node.id,
            name: node.name.clone(),
            status: node.status,
            exit_reason: node.exit_reason,
            create_time: node.create_time,
            start_time: node.start_time,
        }
    }
}

/// One lifecycle event from the watch stream (or synthesized from a list
/// snapshot during reconciliation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub event_type: EventType,
    pub node: NodeSnapshot,
}

impl NodeEvent {
    pub fn new(event_type: EventType, node: NodeSnapshot) -> Self {
        Self { event_type, node }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
