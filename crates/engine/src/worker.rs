// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker group.
//!
//! Composes the generic [`NodeGroup`] with the deferral list for workers
//! whose (re)launch must wait until the PS cluster is fully running.

use crate::group::{NodeGroup, SharedHandle};
use muster_adapters::ElasticJob;
use muster_core::{JobResource, LaunchSpec, NodeRole};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct WorkerGroup {
    pub(crate) base: NodeGroup,
    waiting_ps_running: Mutex<Vec<LaunchSpec>>,
}

impl WorkerGroup {
    pub(crate) fn new(
        shared: SharedHandle,
        job_resource: Arc<JobResource>,
        elastic_job: Arc<dyn ElasticJob>,
    ) -> Self {
        Self {
            base: NodeGroup::new(NodeRole::Worker, shared, job_resource, elastic_job),
            waiting_ps_running: Mutex::new(Vec::new()),
        }
    }

    /// Park a launch until the PS cluster reports all-running.
    pub(crate) fn defer_until_ps_running(&self, spec: LaunchSpec) {
        tracing::info!(node = %spec.name, "deferring worker launch until the ps cluster is running");
        self.waiting_ps_running.lock().push(spec);
    }

    /// Take every parked launch. Called when the last PS turns running.
    pub(crate) fn drain_waiting(&self) -> Vec<LaunchSpec> {
        std::mem::take(&mut *self.waiting_ps_running.lock())
    }

    /// Workers currently parked behind the PS cluster.
    pub fn waiting_count(&self) -> usize {
        self.waiting_ps_running.lock().len()
    }
}
