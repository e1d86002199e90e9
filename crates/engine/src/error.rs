// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.

use muster_adapters::ClusterError;
use muster_core::NodeRole;
use thiserror::Error;

/// Errors from coordinator operations.
///
/// `NodeNotFound` covers events for pods the index has never heard of —
/// the monitor loop logs these at warn and moves on. `RoleNotFound`
/// means the job resource carries no group spec for a role a relaunch
/// needs. `InvalidConfig` is rejected before the monitor ever starts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown {role} node: {id}")]
    NodeNotFound { role: NodeRole, id: u32 },
    #[error("no {0} group in the job resource")]
    RoleNotFound(NodeRole),
    #[error("invalid job config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}
