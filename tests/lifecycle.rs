//! Node lifecycle specs
//!
//! Relaunch policy outcomes and terminal-state behavior as seen through
//! the full monitor loop.

use crate::prelude::*;

#[tokio::test]
async fn worker_oom_within_budget_is_relaunched() {
    let job = launch_job(worker_config(), job_resource(2, 0)).await;
    job.manager.update_node_resource_usage(NodeRole::Worker, 0, 1.0, 8192).unwrap();

    job.cluster.push_event(failure(NodeRole::Worker, 0, ExitReason::Oom));

    let launched = {
        let cluster = job.cluster.clone();
        wait_for(move || !cluster.launches().is_empty()).await
    };
    assert!(launched, "oom within budget should relaunch");

    let node = job.manager.get_node(NodeRole::Worker, 0).unwrap();
    assert_eq!(node.status, NodeStatus::Failed);
    assert!(node.is_recovered_oom);
    assert_eq!(node.relaunch_count, 1);
    assert_eq!(job.recorder.fired(), vec!["failed:train-worker-0"]);

    // The replacement asks for more memory.
    assert_eq!(job.cluster.launches()[0].resource.memory_mb, 16_384);
}

#[tokio::test]
async fn worker_oom_beyond_memory_limit_is_not_relaunched() {
    let job = launch_job(worker_config(), job_resource(2, 0)).await;
    job.manager.update_node_resource_usage(NodeRole::Worker, 0, 1.0, 70_000).unwrap();

    job.cluster.push_event(failure(NodeRole::Worker, 0, ExitReason::Oom));

    let failed = {
        let manager = job.manager.clone();
        wait_for(move || {
            manager
                .get_node(NodeRole::Worker, 0)
                .is_some_and(|n| n.status == NodeStatus::Failed)
        })
        .await
    };
    assert!(failed);
    settle().await;

    let node = job.manager.get_node(NodeRole::Worker, 0).unwrap();
    assert_eq!(node.relaunch_count, 0);
    assert!(job.cluster.launches().is_empty());
}

#[tokio::test]
async fn fatal_error_fires_failed_without_relaunch() {
    let job = launch_job(worker_config(), job_resource(2, 0)).await;
    job.cluster.push_event(failure(NodeRole::Worker, 1, ExitReason::FatalError));

    let observed = {
        let recorder = job.recorder.clone();
        wait_for(move || recorder.count("failed") == 1).await
    };
    assert!(observed);
    settle().await;
    assert!(job.cluster.launches().is_empty());
}

#[tokio::test]
async fn success_is_absorbing() {
    let job = launch_job(worker_config(), job_resource(1, 0)).await;
    job.cluster.push_event(succeeded(NodeRole::Worker, 0));

    let done = {
        let recorder = job.recorder.clone();
        wait_for(move || recorder.count("succeeded") == 1).await
    };
    assert!(done);

    // A spurious later running report must be ignored.
    job.cluster.push_event(running(NodeRole::Worker, 0));
    settle().await;

    let node = job.manager.get_node(NodeRole::Worker, 0).unwrap();
    assert_eq!(node.status, NodeStatus::Succeeded);
    assert_eq!(job.recorder.fired(), vec!["succeeded:train-worker-0"]);
}

#[tokio::test]
async fn stop_silences_all_further_callbacks() {
    let job = launch_job(worker_config(), job_resource(2, 0)).await;
    job.cluster.push_event(running(NodeRole::Worker, 0));
    let started = {
        let recorder = job.recorder.clone();
        wait_for(move || recorder.count("started") == 1).await
    };
    assert!(started);

    job.manager.stop();
    job.cluster.push_event(failure(NodeRole::Worker, 0, ExitReason::Oom));
    job.cluster.push_event(running(NodeRole::Worker, 1));
    settle().await;

    assert_eq!(job.recorder.fired(), vec!["started:train-worker-0"]);
    assert!(job.cluster.launches().is_empty());
}
