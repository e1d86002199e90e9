// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes cluster adapter — training nodes run as labelled pods.
//!
//! # Module layout
//!
//! - [`pod`] — Pod spec construction helpers
//!
//! Pods belonging to a job carry three labels: the job name, the replica
//! type (role), and the dense replica index within the role. Both the list
//! and watch paths filter on the job-name label and map pods back to
//! [`NodeSnapshot`]s; pods without the full label set are ignored.

mod pod;

pub use convert::pod_to_snapshot;

use crate::cluster::{ClusterError, ElasticJob, NodeEventStream, NodeWatcher};
use async_trait::async_trait;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams, WatchEvent, WatchParams};
use kube::Client;
use muster_core::{EventType, LaunchSpec, NodeEvent, NodeRole, NodeSnapshot};

/// Label carrying the owning job's name.
pub const JOB_NAME_LABEL: &str = "elasticjob-name";
/// Label carrying the node's role.
pub const REPLICA_TYPE_LABEL: &str = "replica-type";
/// Label carrying the node's dense index within its role.
pub const REPLICA_INDEX_LABEL: &str = "replica-index";

/// Port every training node listens on behind its headless service.
pub const NODE_SERVICE_PORT: u16 = 2222;

/// Construct the Kubernetes watcher/launcher pair for `engine`.
///
/// Only the `"k8s"` engine is supported; anything else is rejected rather
/// than silently falling back.
pub async fn connect_cluster(
    engine: &str,
    job_name: &str,
    namespace: &str,
) -> Result<(KubernetesJob, KubernetesWatcher), ClusterError> {
    if engine != "k8s" {
        return Err(ClusterError::UnsupportedEngine(engine.to_string()));
    }
    let client = Client::try_default()
        .await
        .map_err(|e| ClusterError::Api(format!("failed to create kube client: {e}")))?;
    let job = KubernetesJob::new(client.clone(), job_name, namespace);
    let watcher = KubernetesWatcher::new(client, job_name, namespace);
    Ok((job, watcher))
}

/// Watches the job's pods via the Kubernetes list/watch API.
#[derive(Clone)]
pub struct KubernetesWatcher {
    pods: Api<Pod>,
    job_name: String,
}

impl KubernetesWatcher {
    pub fn new(client: Client, job_name: &str, namespace: &str) -> Self {
        Self { pods: Api::namespaced(client, namespace), job_name: job_name.to_string() }
    }

    fn selector(&self) -> String {
        format!("{JOB_NAME_LABEL}={}", self.job_name)
    }
}

#[async_trait]
impl NodeWatcher for KubernetesWatcher {
    async fn list(&self) -> Result<Vec<NodeSnapshot>, ClusterError> {
        let lp = ListParams::default().labels(&self.selector());
        let pods = self.pods.list(&lp).await.map_err(|e| ClusterError::Api(e.to_string()))?;
        Ok(pods.iter().filter_map(pod_to_snapshot).collect())
    }

    async fn watch(&self) -> Result<NodeEventStream, ClusterError> {
        let wp = WatchParams::default().labels(&self.selector());
        let stream = self
            .pods
            .watch(&wp, "0")
            .await
            .map_err(|e| ClusterError::WatchFailed(e.to_string()))?;

        let stream = stream.filter_map(|item| {
            futures_util::future::ready(match item {
                Ok(WatchEvent::Added(p)) => watch_item(EventType::Added, &p),
                Ok(WatchEvent::Modified(p)) => watch_item(EventType::Modified, &p),
                Ok(WatchEvent::Deleted(p)) => watch_item(EventType::Deleted, &p),
                Ok(WatchEvent::Bookmark(_)) => None,
                Ok(WatchEvent::Error(e)) => Some(Err(ClusterError::WatchFailed(e.message))),
                Err(e) => Some(Err(ClusterError::WatchFailed(e.to_string()))),
            })
        });
        Ok(stream.boxed())
    }
}

fn watch_item(event_type: EventType, pod: &Pod) -> Option<Result<NodeEvent, ClusterError>> {
    pod_to_snapshot(pod).map(|snapshot| Ok(NodeEvent::new(event_type, snapshot)))
}

/// Launches and removes the job's pods.
#[derive(Clone)]
pub struct KubernetesJob {
    pods: Api<Pod>,
    job_name: String,
    namespace: String,
    uuid: String,
}

impl KubernetesJob {
    pub fn new(client: Client, job_name: &str, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            job_name: job_name.to_string(),
            namespace: namespace.to_string(),
            // No CRD backs the job here; mint the identity locally. A
            // CRD-backed launcher would return the resource uid instead.
            uuid: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl ElasticJob for KubernetesJob {
    async fn job_uuid(&self) -> Result<String, ClusterError> {
        Ok(self.uuid.clone())
    }

    fn node_service_addr(&self, role: NodeRole, id: u32) -> String {
        format!(
            "{job}-{role}-{id}.{ns}.svc:{NODE_SERVICE_PORT}",
            job = self.job_name,
            ns = self.namespace,
        )
    }

    fn node_name(&self, role: NodeRole, id: u32) -> String {
        format!("{job}-{role}-{id}", job = self.job_name)
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<(), ClusterError> {
        let pod_spec = pod::build_pod(&self.job_name, spec);
        tracing::info!(pod = %spec.name, role = %spec.role, id = spec.id, "creating pod");
        self.pods
            .create(&PostParams::default(), &pod_spec)
            .await
            .map_err(|e| ClusterError::LaunchFailed(format!("pod creation failed: {e}")))?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ClusterError> {
        tracing::info!(pod = %name, "deleting pod");
        self.pods
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| ClusterError::Api(format!("pod deletion failed: {e}")))?;
        Ok(())
    }
}

mod convert {
    use super::*;
    use muster_core::{ExitReason, NodeStatus};

    /// Map a pod to a node snapshot. `None` when the pod is missing the
    /// job's label set (not one of ours).
    pub fn pod_to_snapshot(pod: &Pod) -> Option<NodeSnapshot> {
        let labels = pod.metadata.labels.as_ref()?;
        let role: NodeRole = labels.get(REPLICA_TYPE_LABEL)?.parse().ok()?;
        let id: u32 = labels.get(REPLICA_INDEX_LABEL)?.parse().ok()?;
        let name = pod.metadata.name.clone().unwrap_or_default();

        let status = pod_status(pod);
        let exit_reason = exit_reason(pod);
        let create_time =
            pod.metadata.creation_timestamp.as_ref().map(|t| t.0.timestamp_millis().max(0) as u64);
        let start_time = pod
            .status
            .as_ref()
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0.timestamp_millis().max(0) as u64);

        Some(NodeSnapshot { role, id, name, status, exit_reason, create_time, start_time })
    }

    fn pod_status(pod: &Pod) -> NodeStatus {
        if pod.metadata.deletion_timestamp.is_some() {
            return NodeStatus::Deleted;
        }
        match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
            Some("Running") => NodeStatus::Running,
            Some("Succeeded") => NodeStatus::Succeeded,
            Some("Failed") => NodeStatus::Failed,
            // "Unknown" and missing phases are treated as not-yet-scheduled.
            _ => NodeStatus::Pending,
        }
    }

    /// Classify the main container's terminated state.
    ///
    /// OOMKilled beats the exit code; SIGKILL/SIGTERM codes mean the pod
    /// was evicted or externally killed; exit 1 is an application error
    /// that a relaunch will not fix.
    fn exit_reason(pod: &Pod) -> Option<ExitReason> {
        let statuses = pod.status.as_ref()?.container_statuses.as_ref()?;
        let terminated = statuses.iter().find_map(|cs| cs.state.as_ref()?.terminated.as_ref())?;
        if terminated.reason.as_deref() == Some("OOMKilled") {
            return Some(ExitReason::Oom);
        }
        match terminated.exit_code {
            0 => None,
            137 | 143 => Some(ExitReason::Killed),
            1 => Some(ExitReason::FatalError),
            _ => Some(ExitReason::Unknown),
        }
    }
}
