// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative node state-transition table.
//!
//! [`resolve`] is a pure lookup keyed by `(from_status, event_type)` and
//! validated against the target status. No matching entry means the event
//! is ignored — that is the normal signal for duplicates, stale reports,
//! and reconciliation re-deliveries, not an error.

use crate::event::EventType;
use crate::node::NodeStatus;

/// One matched transition: what the node moves to and whether the
/// relaunch policy should be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFlow {
    pub from_status: NodeStatus,
    pub to_status: NodeStatus,
    pub should_relaunch: bool,
    pub is_terminal: bool,
}

struct FlowEntry {
    from: NodeStatus,
    to: NodeStatus,
    events: &'static [EventType],
    should_relaunch: bool,
    is_terminal: bool,
}

const OBSERVED: &[EventType] = &[EventType::Added, EventType::Modified];
const REMOVED: &[EventType] = &[EventType::Deleted];

use NodeStatus::{Deleted, Failed, Initial, Pending, Running, Succeeded};

#[rustfmt::skip]
const NODE_STATE_FLOWS: &[FlowEntry] = &[
    FlowEntry { from: Initial,   to: Pending,   events: OBSERVED, should_relaunch: false, is_terminal: false },
    FlowEntry { from: Initial,   to: Running,   events: OBSERVED, should_relaunch: false, is_terminal: false },
    FlowEntry { from: Pending,   to: Running,   events: OBSERVED, should_relaunch: false, is_terminal: false },
    FlowEntry { from: Initial,   to: Succeeded, events: OBSERVED, should_relaunch: false, is_terminal: true },
    FlowEntry { from: Pending,   to: Succeeded, events: OBSERVED, should_relaunch: false, is_terminal: true },
    FlowEntry { from: Running,   to: Succeeded, events: OBSERVED, should_relaunch: false, is_terminal: true },
    FlowEntry { from: Initial,   to: Failed,    events: OBSERVED, should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Pending,   to: Failed,    events: OBSERVED, should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Running,   to: Failed,    events: OBSERVED, should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Initial,   to: Deleted,   events: REMOVED,  should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Pending,   to: Deleted,   events: REMOVED,  should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Running,   to: Deleted,   events: REMOVED,  should_relaunch: true,  is_terminal: true },
    FlowEntry { from: Succeeded, to: Deleted,   events: REMOVED,  should_relaunch: false, is_terminal: true },
    FlowEntry { from: Failed,    to: Deleted,   events: REMOVED,  should_relaunch: false, is_terminal: true },
];

/// Look up the transition for `(from_status, event_type, new_status)`.
///
/// A `Deleted` event forces the target status to `Deleted` regardless of
/// what the snapshot claims. Same-status lookups never match, which is
/// what makes re-processing an already-applied event a no-op.
pub fn resolve(
    from_status: NodeStatus,
    event_type: EventType,
    new_status: NodeStatus,
) -> Option<StateFlow> {
    let to_status = if event_type == EventType::Deleted { Deleted } else { new_status };
    if to_status == from_status {
        return None;
    }
    NODE_STATE_FLOWS
        .iter()
        .find(|e| e.from == from_status && e.to == to_status && e.events.contains(&event_type))
        .map(|e| StateFlow {
            from_status: e.from,
            to_status: e.to,
            should_relaunch: e.should_relaunch,
            is_terminal: e.is_terminal,
        })
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
