// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cluster for tests.
//!
//! `FakeCluster` implements both ports. Tests script the list snapshot,
//! push watch events, break the stream on demand, and inspect the
//! launches/removals the engine issued.

use crate::cluster::{ClusterError, ElasticJob, NodeEventStream, NodeWatcher};
use async_trait::async_trait;
use futures_util::StreamExt;
use muster_core::{LaunchSpec, NodeEvent, NodeRole, NodeSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

type WatchItem = Result<NodeEvent, ClusterError>;

#[derive(Default)]
struct FakeState {
    snapshots: Vec<NodeSnapshot>,
    watchers: Vec<mpsc::UnboundedSender<WatchItem>>,
    launches: Vec<LaunchSpec>,
    removed: Vec<String>,
    watch_sessions: u32,
    fail_next_launch: bool,
}

/// Scriptable in-memory cluster adapter.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot returned by `list`.
    pub fn set_list(&self, snapshots: Vec<NodeSnapshot>) {
        self.state.lock().snapshots = snapshots;
    }

    /// Deliver an event to every open watch stream.
    pub fn push_event(&self, event: NodeEvent) {
        let mut state = self.state.lock();
        state.watchers.retain(|tx| tx.send(Ok(event.clone())).is_ok());
    }

    /// Deliver a stream error to every open watch stream, then close them.
    pub fn break_watch_streams(&self) {
        let mut state = self.state.lock();
        for tx in state.watchers.drain(..) {
            let _ = tx.send(Err(ClusterError::WatchFailed("stream dropped".to_string())));
        }
    }

    /// Close every open watch stream cleanly.
    pub fn close_watch_streams(&self) {
        self.state.lock().watchers.clear();
    }

    /// Make the next `launch` call fail.
    pub fn fail_next_launch(&self) {
        self.state.lock().fail_next_launch = true;
    }

    /// Launches the engine has issued so far.
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state.lock().launches.clone()
    }

    /// Pod names the engine has asked to remove.
    pub fn removed(&self) -> Vec<String> {
        self.state.lock().removed.clone()
    }

    /// How many watch sessions have been opened.
    pub fn watch_sessions(&self) -> u32 {
        self.state.lock().watch_sessions
    }

    /// Number of currently open watch streams.
    pub fn open_watchers(&self) -> usize {
        let mut state = self.state.lock();
        state.watchers.retain(|tx| !tx.is_closed());
        state.watchers.len()
    }
}

#[async_trait]
impl NodeWatcher for FakeCluster {
    async fn list(&self) -> Result<Vec<NodeSnapshot>, ClusterError> {
        Ok(self.state.lock().snapshots.clone())
    }

    async fn watch(&self) -> Result<NodeEventStream, ClusterError> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock();
            state.watchers.push(tx);
            state.watch_sessions += 1;
        }
        let stream =
            futures_util::stream::unfold(rx, |mut rx| async { rx.recv().await.map(|i| (i, rx)) });
        Ok(stream.boxed())
    }
}

#[async_trait]
impl ElasticJob for FakeCluster {
    async fn job_uuid(&self) -> Result<String, ClusterError> {
        Ok("fake-job-uuid".to_string())
    }

    fn node_service_addr(&self, role: NodeRole, id: u32) -> String {
        format!("{role}-{id}.fake.svc:2222")
    }

    fn node_name(&self, role: NodeRole, id: u32) -> String {
        format!("train-{role}-{id}")
    }

    async fn launch(&self, spec: &LaunchSpec) -> Result<(), ClusterError> {
        let mut state = self.state.lock();
        if state.fail_next_launch {
            state.fail_next_launch = false;
            return Err(ClusterError::LaunchFailed("injected launch failure".to_string()));
        }
        state.launches.push(spec.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ClusterError> {
        self.state.lock().removed.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
