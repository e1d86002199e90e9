// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relaunch decision policy.
//!
//! A pure decision over `(node, flow, coordinator flag)` apart from two
//! documented node mutations: `is_recovered_oom` on an in-budget OOM and
//! the relaunch-count increment on a true verdict.

use muster_core::{ExitReason, Node, StateFlow, MAX_MEMORY_MB};

/// Decide whether a transition warrants relaunching the node.
///
/// Check order, short-circuiting: the flow/enabled/relaunchable gate, the
/// fatal-error veto, the OOM branch (memory ceiling, then budget with `>=`),
/// the generic-error branch (budget with `>`), and finally the killed
/// fall-through which always relaunches. The `>=`/`>` asymmetry between the
/// OOM and generic branches is deliberate and pinned by tests.
pub fn should_relaunch(node: &mut Node, flow: &StateFlow, relaunch_enabled: bool) -> bool {
    let mut verdict = flow.should_relaunch && relaunch_enabled && node.relaunchable;
    if verdict {
        match node.exit_reason {
            Some(ExitReason::FatalError) => {
                verdict = false;
            }
            Some(ExitReason::Oom) => {
                let memory_mb = node.used_resource.memory_mb;
                if memory_mb > MAX_MEMORY_MB {
                    verdict = false;
                    tracing::warn!(
                        node = %node.name,
                        memory_mb,
                        limit_mb = MAX_MEMORY_MB,
                        "node memory is beyond the limit, not relaunching"
                    );
                } else if node.relaunch_count >= node.max_relaunch_count {
                    verdict = false;
                    tracing::warn!(
                        node = %node.name,
                        relaunch_count = node.relaunch_count,
                        max_relaunch_count = node.max_relaunch_count,
                        "relaunch budget exhausted"
                    );
                } else {
                    node.is_recovered_oom = true;
                }
            }
            Some(ExitReason::Killed) => {}
            _ => {
                if node.relaunch_count > node.max_relaunch_count {
                    verdict = false;
                    tracing::warn!(
                        node = %node.name,
                        relaunch_count = node.relaunch_count,
                        max_relaunch_count = node.max_relaunch_count,
                        "relaunch budget for error exhausted"
                    );
                }
            }
        }
    }
    if verdict {
        node.inc_relaunch_count();
    }
    verdict
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
