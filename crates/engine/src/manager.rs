// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-manager coordinator.
//!
//! Exactly one coordinator exists per job, owned by the job driver. All
//! node-state transitions funnel through [`Coordinator::process_event`]
//! under the single coordinator mutex; relaunch hand-off to the launcher
//! happens after the lock is released so no adapter I/O runs under it.

use crate::callback::{self, ClusterContext, NodeEventCallback};
use crate::error::EngineError;
use crate::group::{NodeGroup, SharedHandle, SharedNodes};
use crate::monitor;
use crate::policy;
use crate::ps::PsGroup;
use crate::worker::WorkerGroup;
use muster_core::flow;
use muster_core::{
    set_critical_node, Clock, EventType, JobConfig, JobResource, Node, NodeEvent, NodeRole,
    NodeSnapshot, NodeStatus, ScalePlan, SystemClock,
};
use muster_adapters::{ElasticJob, NodeWatcher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle to the per-job coordinator. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct NodeManager<C: Clock = SystemClock> {
    inner: Arc<Coordinator<C>>,
}

pub(crate) struct Coordinator<C: Clock> {
    pub(crate) config: JobConfig,
    job_resource: Arc<JobResource>,
    clock: C,
    pub(crate) elastic_job: Arc<dyn ElasticJob>,
    pub(crate) watcher: Arc<dyn NodeWatcher>,
    shared: SharedHandle,
    callbacks: Mutex<Vec<Box<dyn NodeEventCallback>>>,
    scale_plans: Mutex<Vec<ScalePlan>>,
    ps: PsGroup,
    chief: NodeGroup,
    worker: WorkerGroup,
    evaluator: NodeGroup,
    job_uuid: Mutex<Option<String>>,
    relaunch_enabled: AtomicBool,
    stop_monitor: AtomicBool,
    monitor_task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeManager<SystemClock> {
    pub fn new(
        config: JobConfig,
        job_resource: JobResource,
        elastic_job: Arc<dyn ElasticJob>,
        watcher: Arc<dyn NodeWatcher>,
    ) -> Self {
        Self::with_clock(config, job_resource, elastic_job, watcher, SystemClock)
    }
}

impl<C: Clock + 'static> NodeManager<C> {
    pub fn with_clock(
        config: JobConfig,
        job_resource: JobResource,
        elastic_job: Arc<dyn ElasticJob>,
        watcher: Arc<dyn NodeWatcher>,
        clock: C,
    ) -> Self {
        let job_resource = Arc::new(job_resource);
        let shared: SharedHandle = Arc::new(Mutex::new(SharedNodes::default()));
        let ps = PsGroup::new(shared.clone(), job_resource.clone(), elastic_job.clone());
        let chief = NodeGroup::new(
            NodeRole::Chief,
            shared.clone(),
            job_resource.clone(),
            elastic_job.clone(),
        );
        let worker = WorkerGroup::new(shared.clone(), job_resource.clone(), elastic_job.clone());
        let evaluator = NodeGroup::new(
            NodeRole::Evaluator,
            shared.clone(),
            job_resource.clone(),
            elastic_job.clone(),
        );
        Self {
            inner: Arc::new(Coordinator {
                config,
                job_resource,
                clock,
                elastic_job,
                watcher,
                shared,
                callbacks: Mutex::new(Vec::new()),
                scale_plans: Mutex::new(Vec::new()),
                ps,
                chief,
                worker,
                evaluator,
                job_uuid: Mutex::new(None),
                relaunch_enabled: AtomicBool::new(true),
                stop_monitor: AtomicBool::new(false),
                monitor_task: Mutex::new(None),
            }),
        }
    }

    /// Obtain the job uuid, populate the index, and spawn the monitor task.
    pub async fn start(&self) -> Result<(), EngineError> {
        self.inner.validate_config()?;
        let uuid = self.inner.elastic_job.job_uuid().await?;
        tracing::info!(job = %self.inner.config.job_name, %uuid, "starting node manager");
        *self.inner.job_uuid.lock() = Some(uuid);
        self.inner.init_job_nodes();

        let coordinator = self.inner.clone();
        let handle = tokio::spawn(async move { monitor::run(coordinator).await });
        *self.inner.monitor_task.lock() = Some(handle);
        Ok(())
    }

    /// Cooperative shutdown: disable relaunch, release every node, and
    /// let the monitor exit at its next stream boundary.
    pub fn stop(&self) {
        self.inner.relaunch_enabled.store(false, Ordering::SeqCst);
        {
            let mut shared = self.inner.shared.lock();
            for nodes in shared.index.values_mut() {
                for node in nodes.values_mut() {
                    node.critical = false;
                    node.is_released = true;
                }
            }
        }
        self.inner.stop_monitor.store(true, Ordering::SeqCst);
        tracing::info!(job = %self.inner.config.job_name, "node manager stopped");
    }

    pub fn add_node_event_callback(&self, callback: Box<dyn NodeEventCallback>) {
        self.inner.callbacks.lock().push(callback);
    }

    pub fn job_uuid(&self) -> Option<String> {
        self.inner.job_uuid.lock().clone()
    }

    /// Remove one worker. Critical workers are logged and left alone.
    pub async fn remove_worker(&self, worker_id: u32) -> Result<Option<ScalePlan>, EngineError> {
        let critical = {
            let shared = self.inner.shared.lock();
            shared
                .index
                .get(&NodeRole::Worker)
                .and_then(|nodes| nodes.get(&worker_id))
                .ok_or(EngineError::NodeNotFound { role: NodeRole::Worker, id: worker_id })?
                .critical
        };
        if critical {
            tracing::info!(worker_id, "skipping removal of critical worker");
            return Ok(None);
        }
        let plan = self.inner.worker.base.remove_node(worker_id)?;
        tracing::info!(worker_id, plan = ?plan.remove, "removing worker");
        for name in &plan.remove {
            self.inner.elastic_job.remove(name).await?;
        }
        Ok(Some(plan))
    }

    pub fn update_node_resource_usage(
        &self,
        role: NodeRole,
        id: u32,
        cpu: f64,
        memory_mb: u64,
    ) -> Result<(), EngineError> {
        let mut shared = self.inner.shared.lock();
        let node = shared
            .index
            .get_mut(&role)
            .and_then(|nodes| nodes.get_mut(&id))
            .ok_or(EngineError::NodeNotFound { role, id })?;
        node.update_resource_usage(cpu, memory_mb);
        Ok(())
    }

    pub fn all_workers_exited(&self) -> bool {
        self.inner.chief.all_nodes_exited()
            && self.inner.worker.base.all_nodes_exited()
            && self.inner.evaluator.all_nodes_exited()
    }

    pub fn all_workers_failed(&self) -> bool {
        self.inner.chief.all_nodes_failed()
            && self.inner.worker.base.all_nodes_failed()
            && self.inner.evaluator.all_nodes_failed()
    }

    pub fn all_workers_deleted(&self) -> bool {
        self.inner.chief.all_nodes_deleted()
            && self.inner.worker.base.all_nodes_deleted()
            && self.inner.evaluator.all_nodes_deleted()
    }

    /// True iff no critical node is still live. Gates job completion.
    pub fn all_critical_node_completed(&self) -> bool {
        let shared = self.inner.shared.lock();
        let alive: Vec<(NodeRole, u32)> = shared
            .index
            .values()
            .flat_map(|nodes| nodes.values())
            .filter(|node| node.critical && node.status.is_live())
            .map(|node| (node.role, node.id))
            .collect();
        if !alive.is_empty() {
            tracing::info!(nodes = ?alive, "critical nodes are still running");
        }
        alive.is_empty()
    }

    /// Union of the running chief/worker/evaluator sets plus the current
    /// PS training cluster.
    pub fn get_running_nodes(&self) -> Vec<Node> {
        let mut nodes = self.inner.chief.get_running_nodes();
        nodes.extend(self.inner.worker.base.get_running_nodes());
        nodes.extend(self.inner.evaluator.get_running_nodes());
        nodes.extend(self.inner.ps.get_training_ps_cluster());
        nodes
    }

    /// PS nodes in the current training cluster.
    pub fn get_cur_cluster_ps(&self) -> Vec<Node> {
        self.inner.ps.get_training_ps_cluster()
    }

    /// PS nodes in the next training cluster.
    pub fn get_next_cluster_ps(&self) -> Vec<Node> {
        self.inner.ps.get_next_training_ps_cluster()
    }

    pub fn ready_for_new_ps_cluster(&self) -> bool {
        self.inner.ps.get_ready_for_new_ps_cluster()
    }

    /// Service addresses of the current PS cluster.
    pub fn get_ps_addrs(&self) -> Vec<String> {
        self.inner.ps.get_ps_addrs()
    }

    /// Tear down every PS and worker still pending or running, returning
    /// the consolidated removal plan.
    pub fn remove_training_nodes(&self) -> ScalePlan {
        let mut plan = ScalePlan::new();
        let mut shared = self.inner.shared.lock();
        for role in [NodeRole::Worker, NodeRole::Ps] {
            let Some(nodes) = shared.index.get_mut(&role) else { continue };
            for node in nodes.values_mut() {
                let stoppable =
                    matches!(node.status, NodeStatus::Running | NodeStatus::Pending);
                if stoppable && !node.is_released {
                    node.mark_removed();
                    tracing::info!(node = %node.name, "removing training node");
                    plan.remove.push(node.name.clone());
                }
            }
        }
        plan
    }

    /// Relaunches counted but not yet confirmed running.
    pub fn pending_relaunch_count(&self) -> u32 {
        self.inner.shared.lock().pending_relaunch_count
    }

    /// Drain the scaling plans subscribers have enqueued.
    pub fn drain_scale_plans(&self) -> Vec<ScalePlan> {
        std::mem::take(&mut *self.inner.scale_plans.lock())
    }

    /// Workers parked until the PS cluster is fully running.
    pub fn waiting_worker_count(&self) -> usize {
        self.inner.worker.waiting_count()
    }

    /// Snapshot of one node, for observability.
    pub fn get_node(&self, role: NodeRole, id: u32) -> Option<Node> {
        self.inner.shared.lock().index.get(&role)?.get(&id).cloned()
    }

    #[cfg(test)]
    pub(crate) fn coordinator(&self) -> &Arc<Coordinator<C>> {
        &self.inner
    }
}

impl<C: Clock> Coordinator<C> {
    /// Reject configurations the monitor could never run with.
    pub(crate) fn validate_config(&self) -> Result<(), EngineError> {
        if self.config.job_name.is_empty() {
            return Err(EngineError::InvalidConfig("job name is empty".to_string()));
        }
        let worker_count = self.job_resource.count(NodeRole::Worker);
        if let Some(index) =
            self.config.critical_worker_index.keys().find(|index| **index >= worker_count)
        {
            return Err(EngineError::InvalidConfig(format!(
                "critical worker index {index} is outside the {worker_count}-worker group"
            )));
        }
        Ok(())
    }

    /// Populate the index from the job resource and mark critical nodes.
    pub(crate) fn init_job_nodes(&self) {
        let elastic_job = &self.elastic_job;
        let mut index = self.job_resource.init_job_nodes(
            self.config.relaunch_on_worker_failure,
            |role, id| elastic_job.node_service_addr(role, id),
            |role, id| elastic_job.node_name(role, id),
        );
        let now = self.clock.epoch_ms();
        for nodes in index.values_mut() {
            for node in nodes.values_mut() {
                node.create_time = Some(now);
            }
        }
        set_critical_node(
            &mut index,
            self.config.ps_is_critical,
            self.config.ps_relaunch_max_num,
            &self.config.critical_worker_index,
        );
        {
            let mut shared = self.shared.lock();
            shared.index = index;
            shared.pending_relaunch_count = 0;
        }
        self.ps.sync_cluster_view();
    }

    pub(crate) fn stopped(&self) -> bool {
        self.stop_monitor.load(Ordering::SeqCst)
    }

    /// Apply one lifecycle event to the index.
    ///
    /// Everything except the relaunch hand-off happens under the
    /// coordinator mutex: info refresh, flow lookup, status and
    /// exit-reason update, callback dispatch, and the policy verdict.
    pub(crate) async fn process_event(&self, event: &NodeEvent) -> Result<(), EngineError> {
        let role = event.node.role;
        let id = event.node.id;
        let mut relaunch_node: Option<Node> = None;
        let transition;
        {
            let mut shared = self.shared.lock();
            let shared = &mut *shared;
            let node = shared
                .index
                .get_mut(&role)
                .and_then(|nodes| nodes.get_mut(&id))
                .ok_or(EngineError::NodeNotFound { role, id })?;
            if node.is_released {
                return Ok(());
            }
            node.update_info(&event.node.name, event.node.create_time, event.node.start_time);

            let old_status = node.status;
            let Some(flow) = flow::resolve(old_status, event.event_type, event.node.status)
            else {
                return Ok(());
            };
            // A succeeded node is absorbing; even its deletion is silent.
            if flow.from_status == NodeStatus::Succeeded {
                return Ok(());
            }
            node.update_status(flow.to_status);
            node.set_exit_reason(event.node.exit_reason);
            let node_view = node.clone();

            {
                let callbacks = self.callbacks.lock();
                let ctx = ClusterContext::new(&shared.index, &self.scale_plans);
                callback::dispatch(callbacks.as_slice(), &flow, &node_view, &ctx);
            }

            let node = shared
                .index
                .get_mut(&role)
                .and_then(|nodes| nodes.get_mut(&id))
                .ok_or(EngineError::NodeNotFound { role, id })?;
            let should_relaunch = policy::should_relaunch(
                node,
                &flow,
                self.relaunch_enabled.load(Ordering::SeqCst),
            );
            if should_relaunch {
                if self.config.wait_pending_relaunch {
                    shared.pending_relaunch_count += 1;
                }
                relaunch_node = Some(node.clone());
            }
            transition = (node.name.clone(), old_status, flow.to_status);
        }

        let (name, old_status, new_status) = transition;
        tracing::info!(
            node = %name,
            from = %old_status,
            to = %new_status,
            event = %event.event_type,
            "node status change"
        );

        if let Some(node) = relaunch_node {
            self.dispatch_relaunch(&node).await?;
        }
        if role == NodeRole::Ps && new_status == NodeStatus::Running {
            self.flush_waiting_workers().await;
        }
        Ok(())
    }

    /// Hand a positive relaunch verdict to the owning group and launcher.
    /// Runs outside the coordinator lock.
    async fn dispatch_relaunch(&self, node: &Node) -> Result<(), EngineError> {
        tracing::info!(node = %node.name, role = %node.role, "relaunching node");
        let spec = match node.role {
            NodeRole::Ps => self.ps.base.prepare_relaunch(node)?,
            NodeRole::Chief => self.chief.prepare_relaunch(node)?,
            NodeRole::Evaluator => self.evaluator.prepare_relaunch(node)?,
            NodeRole::Worker => {
                let spec = self.worker.base.prepare_relaunch(node)?;
                let ps_pending = self.job_resource.count(NodeRole::Ps) > 0
                    && !self.ps.get_ready_for_new_ps_cluster();
                if ps_pending {
                    self.worker.defer_until_ps_running(spec);
                    return Ok(());
                }
                spec
            }
        };
        self.elastic_job.launch(&spec).await?;
        Ok(())
    }

    /// Launch every worker parked behind the PS cluster, if it is now
    /// fully running. Individual launch failures are logged; the next
    /// list snapshot reconciles.
    async fn flush_waiting_workers(&self) {
        if !self.ps.get_ready_for_new_ps_cluster() {
            return;
        }
        for spec in self.worker.drain_waiting() {
            tracing::info!(node = %spec.name, "launching worker deferred on ps cluster");
            if let Err(error) = self.elastic_job.launch(&spec).await {
                tracing::warn!(node = %spec.name, %error, "deferred worker launch failed");
            }
        }
    }

    /// Reconcile the index against a full list snapshot.
    ///
    /// Each listed node is replayed as a synthetic event (the recovery
    /// path for lost watch events — idempotent because transitions are a
    /// function of `(old_status, event, new_status)` only). Nodes absent
    /// from the snapshot that were ever observed are released with no
    /// callback.
    pub(crate) async fn reconcile(&self, snapshot: Vec<NodeSnapshot>) {
        let mut exist: HashMap<NodeRole, HashSet<u32>> =
            NodeRole::ALL.iter().map(|role| (*role, HashSet::new())).collect();
        for snap in snapshot {
            exist.entry(snap.role).or_default().insert(snap.id);
            let event_type = if snap.status == NodeStatus::Deleted {
                EventType::Deleted
            } else {
                EventType::Modified
            };
            let event = NodeEvent::new(event_type, snap);
            if let Err(error) = self.process_event(&event).await {
                tracing::warn!(%error, "failed to process synthesized list event");
            }
        }

        let mut shared = self.shared.lock();
        for (role, nodes) in shared.index.iter_mut() {
            let Some(seen) = exist.get(role) else { continue };
            for (id, node) in nodes.iter_mut() {
                if node.status != NodeStatus::Initial
                    && !node.is_released
                    && !seen.contains(id)
                {
                    tracing::info!(role = %role, id = *id, "node deleted without the event");
                    node.is_released = true;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
