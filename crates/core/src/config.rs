// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-manager configuration surface.
//!
//! [`JobConfig`] is the constructor parameter block of the coordinator.
//! Both relaunch budgets are clamped to [`MAX_RELAUNCH_COUNT`] at the
//! setter, so downstream code never re-checks the ceiling.

use crate::resource::MAX_RELAUNCH_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// How training is distributed across the worker roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    ParameterServer,
    Allreduce,
    Custom,
    Local,
}

crate::simple_display! {
    DistributionStrategy {
        ParameterServer => "parameter_server",
        Allreduce => "allreduce",
        Custom => "custom",
        Local => "local",
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid critical worker index entry: {0:?}")]
    InvalidCriticalIndex(String),
}

/// Constructor parameters of the node manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_name: String,
    pub namespace: String,
    /// Relaunch budget for non-critical workers. Clamped to the ceiling.
    pub relaunch_on_worker_failure: u32,
    pub ps_is_critical: bool,
    /// Worker index → relaunch budget for critical workers.
    pub critical_worker_index: BTreeMap<u32, u32>,
    /// Count relaunches that have not yet produced a running pod.
    pub wait_pending_relaunch: bool,
    /// Relaunch budget for parameter servers. Clamped to the ceiling.
    pub ps_relaunch_max_num: u32,
    pub use_ddp: bool,
    /// Cluster engine backing the watcher/launcher pair.
    pub engine: String,
}

impl JobConfig {
    pub fn new(job_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            namespace: namespace.into(),
            relaunch_on_worker_failure: 0,
            ps_is_critical: true,
            critical_worker_index: BTreeMap::new(),
            wait_pending_relaunch: false,
            ps_relaunch_max_num: 1,
            use_ddp: false,
            engine: "k8s".to_string(),
        }
    }

    crate::setters! {
        into {
            engine: String,
        }
        set {
            ps_is_critical: bool,
            use_ddp: bool,
            wait_pending_relaunch: bool,
            critical_worker_index: BTreeMap<u32, u32>,
        }
    }

    pub fn relaunch_on_worker_failure(mut self, budget: u32) -> Self {
        self.relaunch_on_worker_failure = budget.min(MAX_RELAUNCH_COUNT);
        self
    }

    pub fn ps_relaunch_max_num(mut self, budget: u32) -> Self {
        self.ps_relaunch_max_num = budget.min(MAX_RELAUNCH_COUNT);
        self
    }

    /// Derive the strategy-dependent knobs.
    ///
    /// Worker relaunch only makes sense under parameter-server or custom
    /// strategies; for anything else the budget is forced to zero and the
    /// critical map emptied. Custom strategies must not declare the job
    /// done while relaunched pods are still pending.
    pub fn apply_strategy(
        mut self,
        strategy: DistributionStrategy,
        critical_spec: &str,
    ) -> Result<Self, ConfigError> {
        match strategy {
            DistributionStrategy::ParameterServer | DistributionStrategy::Custom => {
                self.critical_worker_index =
                    critical_worker_index(strategy, critical_spec, self.relaunch_on_worker_failure)?;
            }
            _ => {
                self.relaunch_on_worker_failure = 0;
                self.critical_worker_index.clear();
            }
        }
        self.wait_pending_relaunch = strategy == DistributionStrategy::Custom;
        Ok(self)
    }
}

/// Parse the critical-worker spec from the front-end.
///
/// `"default"` marks worker 0 critical under the parameter-server strategy
/// (the chief's stand-in) and nothing otherwise; `"none"` is empty; any
/// other value is a comma-separated list of `index:budget` pairs.
pub fn critical_worker_index(
    strategy: DistributionStrategy,
    spec: &str,
    default_budget: u32,
) -> Result<BTreeMap<u32, u32>, ConfigError> {
    let mut map = BTreeMap::new();
    match spec {
        "default" => {
            if strategy == DistributionStrategy::ParameterServer {
                map.insert(0, default_budget);
            }
        }
        "none" | "" => {}
        _ => {
            for entry in spec.split(',') {
                let (index, budget) = entry
                    .split_once(':')
                    .ok_or_else(|| ConfigError::InvalidCriticalIndex(entry.to_string()))?;
                let index: u32 = index
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidCriticalIndex(entry.to_string()))?;
                let budget: u32 = budget
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidCriticalIndex(entry.to_string()))?;
                map.insert(index, budget);
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
