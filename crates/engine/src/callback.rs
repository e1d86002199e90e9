// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle-event fan-out to subscribers.
//!
//! Subscribers implement [`NodeEventCallback`] and are dispatched
//! synchronously by the coordinator, under its lock, after the node's
//! status is updated and before the relaunch step. The contract:
//! callbacks must be prompt, must not block, and must not re-enter
//! mutating coordinator operations. [`ClusterContext`] gives them the
//! read-only view they are allowed instead.

use muster_core::{Node, NodeIndex, NodeRole, NodeStatus, ScalePlan, StateFlow};
use parking_lot::Mutex;
use thiserror::Error;

/// A subscriber failure. Logged and swallowed; never aborts dispatch.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Capability handed to subscribers during dispatch: read-only access to
/// the node index plus the ability to enqueue scaling plans for the
/// scaler to pick up.
pub struct ClusterContext<'a> {
    nodes: &'a NodeIndex,
    plans: &'a Mutex<Vec<ScalePlan>>,
}

impl<'a> ClusterContext<'a> {
    pub(crate) fn new(nodes: &'a NodeIndex, plans: &'a Mutex<Vec<ScalePlan>>) -> Self {
        Self { nodes, plans }
    }

    pub fn node(&self, role: NodeRole, id: u32) -> Option<&Node> {
        self.nodes.get(&role)?.get(&id)
    }

    pub fn role_nodes(&self, role: NodeRole) -> Vec<&Node> {
        self.nodes.get(&role).map(|m| m.values().collect()).unwrap_or_default()
    }

    pub fn running_count(&self, role: NodeRole) -> usize {
        self.nodes
            .get(&role)
            .map(|m| {
                m.values().filter(|n| n.status == NodeStatus::Running && !n.is_released).count()
            })
            .unwrap_or(0)
    }

    /// Queue a scaling plan for the job driver to drain.
    pub fn enqueue_plan(&self, plan: ScalePlan) {
        self.plans.lock().push(plan);
    }
}

/// Subscriber capability set. All hooks default to no-ops so subscribers
/// implement only what they care about.
pub trait NodeEventCallback: Send + Sync {
    fn on_node_started(&self, _node: &Node, _ctx: &ClusterContext<'_>) -> Result<(), CallbackError> {
        Ok(())
    }

    fn on_node_succeeded(
        &self,
        _node: &Node,
        _ctx: &ClusterContext<'_>,
    ) -> Result<(), CallbackError> {
        Ok(())
    }

    fn on_node_failed(&self, _node: &Node, _ctx: &ClusterContext<'_>) -> Result<(), CallbackError> {
        Ok(())
    }

    fn on_node_deleted(&self, _node: &Node, _ctx: &ClusterContext<'_>) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Dispatch one transition to every subscriber, keyed by the target
/// status. Deletion fires only when the node was never observed as failed
/// or succeeded — those already got their terminal hook.
pub(crate) fn dispatch(
    callbacks: &[Box<dyn NodeEventCallback>],
    flow: &StateFlow,
    node: &Node,
    ctx: &ClusterContext<'_>,
) {
    for callback in callbacks {
        let result = match flow.to_status {
            NodeStatus::Running => callback.on_node_started(node, ctx),
            NodeStatus::Succeeded => callback.on_node_succeeded(node, ctx),
            NodeStatus::Failed => callback.on_node_failed(node, ctx),
            NodeStatus::Deleted
                if flow.from_status != NodeStatus::Failed
                    && flow.from_status != NodeStatus::Succeeded =>
            {
                callback.on_node_deleted(node, ctx)
            }
            _ => Ok(()),
        };
        if let Err(error) = result {
            tracing::warn!(node = %node.name, %error, "node event callback failed");
        }
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
