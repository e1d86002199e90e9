// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parameter-server group.
//!
//! Composes the generic [`NodeGroup`] with the two PS cluster views the
//! training runtime consumes: the cluster currently serving training, and
//! the proposal that replaces it once every surviving PS is running.

use crate::group::{NodeGroup, SharedHandle};
use muster_adapters::ElasticJob;
use muster_core::{JobResource, Node, NodeRole, NodeStatus};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct PsClusterState {
    /// Ids of the PS set the training runtime is currently wired to.
    training: Vec<u32>,
    /// Ids of the proposed next PS set.
    next: Vec<u32>,
}

pub struct PsGroup {
    pub(crate) base: NodeGroup,
    cluster: Mutex<PsClusterState>,
}

impl PsGroup {
    pub(crate) fn new(
        shared: SharedHandle,
        job_resource: Arc<JobResource>,
        elastic_job: Arc<dyn ElasticJob>,
    ) -> Self {
        Self {
            base: NodeGroup::new(NodeRole::Ps, shared, job_resource, elastic_job),
            cluster: Mutex::new(PsClusterState::default()),
        }
    }

    /// Reset both cluster views to the current PS ids. Called after the
    /// index is (re)initialized.
    pub(crate) fn sync_cluster_view(&self) {
        let ids = self.sorted_alive_ids();
        let mut cluster = self.cluster.lock();
        cluster.training = ids.clone();
        cluster.next = ids;
    }

    /// PS nodes serving the current training cluster.
    pub fn get_training_ps_cluster(&self) -> Vec<Node> {
        let ids = self.cluster.lock().training.clone();
        self.nodes_for_ids(&ids)
    }

    /// PS nodes of the next training cluster.
    ///
    /// The proposal advances to the full surviving set once every member
    /// of it is running; until then the previous proposal stands.
    pub fn get_next_training_ps_cluster(&self) -> Vec<Node> {
        if self.get_ready_for_new_ps_cluster() {
            let ids = self.sorted_alive_ids();
            self.cluster.lock().next = ids;
        }
        let ids = self.cluster.lock().next.clone();
        self.nodes_for_ids(&ids)
    }

    /// Whether every surviving PS is running.
    pub fn get_ready_for_new_ps_cluster(&self) -> bool {
        let shared = self.base.shared().lock();
        shared
            .index
            .get(&NodeRole::Ps)
            .map(|nodes| {
                nodes
                    .values()
                    .filter(|n| !n.is_released)
                    .all(|n| n.status == NodeStatus::Running)
            })
            .unwrap_or(true)
    }

    /// Service addresses of the current training PS cluster, resolved via
    /// the launcher.
    pub fn get_ps_addrs(&self) -> Vec<String> {
        let ids = self.cluster.lock().training.clone();
        ids.iter().map(|id| self.base.elastic_job().node_service_addr(NodeRole::Ps, *id)).collect()
    }

    fn sorted_alive_ids(&self) -> Vec<u32> {
        let shared = self.base.shared().lock();
        let mut ids: Vec<u32> = shared
            .index
            .get(&NodeRole::Ps)
            .map(|nodes| {
                nodes.values().filter(|n| !n.is_released).map(|n| n.id).collect()
            })
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    fn nodes_for_ids(&self, ids: &[u32]) -> Vec<Node> {
        let shared = self.base.shared().lock();
        let Some(nodes) = shared.index.get(&NodeRole::Ps) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| nodes.get(id)).cloned().collect()
    }
}

#[cfg(test)]
#[path = "ps_tests.rs"]
mod tests;
