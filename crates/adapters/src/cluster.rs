// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster ports the coordinator depends on.
//!
//! The engine only ever sees these two traits. `KubernetesWatcher` /
//! `KubernetesJob` implement them against a real cluster;
//! `FakeCluster` implements both for tests.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use muster_core::{LaunchSpec, NodeEvent, NodeRole, NodeSnapshot};
use thiserror::Error;

/// Errors from cluster adapter operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster api error: {0}")]
    Api(String),
    #[error("watch stream failed: {0}")]
    WatchFailed(String),
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported engine: {0:?}")]
    UnsupportedEngine(String),
}

/// Incremental event stream from a watch session.
///
/// An `Err` item means the stream is broken; the consumer re-lists and
/// re-watches. The stream ending cleanly means the same without the error.
pub type NodeEventStream = BoxStream<'static, Result<NodeEvent, ClusterError>>;

/// Read side of the cluster: full snapshots and incremental events.
///
/// The coordinator tolerates both loss and duplication from this port —
/// reconciliation against `list` covers loss, idempotent transitions cover
/// duplication.
#[async_trait]
pub trait NodeWatcher: Send + Sync {
    /// Complete snapshot of the job's nodes as the cluster sees them.
    async fn list(&self) -> Result<Vec<NodeSnapshot>, ClusterError>;

    /// Open an incremental event stream.
    async fn watch(&self) -> Result<NodeEventStream, ClusterError>;
}

/// Write side of the cluster: identity resolution and pod lifecycle.
#[async_trait]
pub trait ElasticJob: Send + Sync {
    /// Stable identifier of the running job.
    async fn job_uuid(&self) -> Result<String, ClusterError>;

    /// Service address a node is reachable at once running.
    fn node_service_addr(&self, role: NodeRole, id: u32) -> String;

    /// Pod name assigned to a node at launch.
    fn node_name(&self, role: NodeRole, id: u32) -> String;

    /// Create the pod described by `spec`.
    async fn launch(&self, spec: &LaunchSpec) -> Result<(), ClusterError>;

    /// Tear down a pod by name.
    async fn remove(&self, name: &str) -> Result<(), ClusterError>;
}
