// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    initial_pending  = { Initial, EventType::Added,    Pending,   Pending,   false },
    initial_running  = { Initial, EventType::Modified, Running,   Running,   false },
    pending_running  = { Pending, EventType::Modified, Running,   Running,   false },
    running_failed   = { Running, EventType::Modified, Failed,    Failed,    true },
    pending_failed   = { Pending, EventType::Modified, Failed,    Failed,    true },
    running_success  = { Running, EventType::Modified, Succeeded, Succeeded, false },
    pending_success  = { Pending, EventType::Added,    Succeeded, Succeeded, false },
    running_deleted  = { Running, EventType::Deleted,  Running,   Deleted,   true },
    pending_deleted  = { Pending, EventType::Deleted,  Pending,   Deleted,   true },
    initial_deleted  = { Initial, EventType::Deleted,  Initial,   Deleted,   true },
)]
fn matched_transitions(
    from: NodeStatus,
    event: EventType,
    reported: NodeStatus,
    expect_to: NodeStatus,
    expect_relaunch: bool,
) {
    let flow = resolve(from, event, reported).unwrap();
    assert_eq!(flow.from_status, from);
    assert_eq!(flow.to_status, expect_to);
    assert_eq!(flow.should_relaunch, expect_relaunch);
}

#[yare::parameterized(
    succeeded = { Succeeded },
    failed    = { Failed },
)]
fn deletion_after_exit_never_relaunches(from: NodeStatus) {
    let flow = resolve(from, EventType::Deleted, from).unwrap();
    assert_eq!(flow.to_status, Deleted);
    assert!(!flow.should_relaunch);
    assert!(flow.is_terminal);
}

#[test]
fn succeeded_ignores_observed_events() {
    assert_eq!(resolve(Succeeded, EventType::Modified, Running), None);
    assert_eq!(resolve(Succeeded, EventType::Modified, Failed), None);
    assert_eq!(resolve(Succeeded, EventType::Added, Pending), None);
}

#[test]
fn same_status_is_a_no_op() {
    assert_eq!(resolve(Running, EventType::Modified, Running), None);
    assert_eq!(resolve(Pending, EventType::Added, Pending), None);
    assert_eq!(resolve(Deleted, EventType::Deleted, Deleted), None);
}

#[test]
fn deleted_event_forces_deleted_target() {
    // The snapshot may still claim Running when the deletion arrives.
    let flow = resolve(Running, EventType::Deleted, Running).unwrap();
    assert_eq!(flow.to_status, Deleted);
}

#[test]
fn backwards_transitions_are_ignored() {
    assert_eq!(resolve(Running, EventType::Modified, Pending), None);
    assert_eq!(resolve(Failed, EventType::Modified, Running), None);
}

fn any_status() -> impl Strategy<Value = NodeStatus> {
    prop_oneof![
        Just(Initial),
        Just(Pending),
        Just(Running),
        Just(Succeeded),
        Just(Failed),
        Just(Deleted),
    ]
}

fn any_event() -> impl Strategy<Value = EventType> {
    prop_oneof![Just(EventType::Added), Just(EventType::Modified), Just(EventType::Deleted)]
}

proptest! {
    // Re-resolving from the transition target never matches the same
    // entry again — the property reconciliation relies on.
    #[test]
    fn double_apply_is_a_no_op(from in any_status(), event in any_event(), reported in any_status()) {
        if let Some(flow) = resolve(from, event, reported) {
            // Applying the same event from the new status either matches
            // nothing or moves somewhere else; it never repeats the flow.
            if let Some(second) = resolve(flow.to_status, event, reported) {
                prop_assert_ne!(second.from_status, flow.from_status);
            }
        }
    }

    #[test]
    fn deleted_events_only_target_deleted(from in any_status(), reported in any_status()) {
        if let Some(flow) = resolve(from, EventType::Deleted, reported) {
            prop_assert_eq!(flow.to_status, Deleted);
        }
    }

    #[test]
    fn nothing_leaves_succeeded_via_observation(event in any_event(), reported in any_status()) {
        if event != EventType::Deleted {
            prop_assert_eq!(resolve(Succeeded, event, reported), None);
        }
    }
}
