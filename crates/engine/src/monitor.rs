// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background monitor loop.
//!
//! One cooperative task per job: list the cluster, reconcile, then drain
//! the watch stream. Malformed events are logged and skipped; a broken
//! stream backs off and restarts from a fresh list. The stop flag is
//! observed at stream boundaries — in-flight event processing always
//! completes.

use crate::manager::Coordinator;
use futures_util::StreamExt;
use muster_core::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Back-off before re-listing after a broken watch stream.
fn watch_retry_delay() -> Duration {
    std::env::var("MUSTER_WATCH_RETRY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

pub(crate) async fn run<C: Clock + 'static>(coordinator: Arc<Coordinator<C>>) {
    loop {
        if coordinator.stopped() {
            break;
        }

        let snapshot = match coordinator.watcher.list().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(%error, "node list failed");
                tokio::time::sleep(watch_retry_delay()).await;
                continue;
            }
        };
        coordinator.reconcile(snapshot).await;

        if coordinator.stopped() {
            break;
        }
        let mut stream = match coordinator.watcher.watch().await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(%error, "node watch failed");
                tokio::time::sleep(watch_retry_delay()).await;
                continue;
            }
        };

        let mut stream_failed = false;
        while let Some(item) = stream.next().await {
            if coordinator.stopped() {
                break;
            }
            match item {
                Ok(event) => {
                    if let Err(error) = coordinator.process_event(&event).await {
                        tracing::warn!(%error, "failed to process node event");
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "node watch stream error");
                    stream_failed = true;
                    break;
                }
            }
        }

        if coordinator.stopped() {
            break;
        }
        if stream_failed {
            tokio::time::sleep(watch_retry_delay()).await;
        }
        // A cleanly ended stream re-lists immediately.
    }
    tracing::info!("stopped processing node events");
}
