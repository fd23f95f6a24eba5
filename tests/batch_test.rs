mod common;

use std::sync::Arc;
use std::time::Duration;

use auto_order::error::BatchError;
use auto_order::models::{OrderSpec, RunStatus, Step};
use auto_order::orchestrator::{BatchConfig, BatchCoordinator, BatchPhase};
use common::{orders, FakeExecutor, RecordingSink, Scripted};

fn coordinator(executor: Arc<FakeExecutor>) -> (Arc<BatchCoordinator>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let coordinator = Arc::new(BatchCoordinator::new(
        executor.clone(),
        sink.clone(),
        BatchConfig {
            inter_order_delay: Duration::ZERO,
        },
    ));
    executor.attach(&coordinator);
    (coordinator, sink)
}

const FIVE: &[&str] = &["A", "B", "C", "D", "E"];

#[tokio::test]
async fn test_runs_all_orders_in_sequence() {
    let executor = Arc::new(FakeExecutor::new());
    let (coordinator, sink) = coordinator(executor.clone());

    let report = coordinator.run_batch(orders(FIVE)).await.unwrap();

    assert_eq!(executor.executed(), FIVE);
    assert_eq!(report.total_count, 5);
    assert_eq!(report.success_count, 5);
    assert_eq!(report.skipped_count, 0);
    assert!(!report.stopped);
    let indices: Vec<usize> = report.results.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);

    let progress = executor.progress_seen.lock().unwrap().clone();
    assert_eq!(progress.len(), 5);
    assert_eq!(progress[2].current, 3);
    assert_eq!(progress[2].total, 5);
    assert_eq!(progress[2].results.len(), 2);

    let status = coordinator.status().await;
    assert_eq!(status.phase, BatchPhase::Completed);
    assert!(!status.can_resume);
    assert_eq!(status.last_report, Some(report));

    let last = sink.updates().last().cloned().unwrap();
    assert_eq!(last.step, Step::BatchDone);
    assert_eq!(last.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_stop_then_resume_runs_each_order_once() {
    let executor = Arc::new(FakeExecutor::new().stop_after(3));
    let (coordinator, sink) = coordinator(executor.clone());

    let stopped = coordinator.run_batch(orders(FIVE)).await.unwrap();

    assert!(stopped.stopped);
    assert_eq!(stopped.results.len(), 3);
    assert_eq!(stopped.skipped_count, 2);
    assert_eq!(executor.executed(), ["A", "B", "C"]);
    assert_eq!(sink.updates().last().unwrap().step, Step::BatchStopped);

    let status = coordinator.status().await;
    assert_eq!(status.phase, BatchPhase::StoppedResumable);
    assert!(status.can_resume);

    let run = coordinator.resume().await.unwrap();
    assert_eq!(run.remaining(), 2);
    let finished = run.run().await;

    assert_eq!(executor.executed(), FIVE);
    assert!(!finished.stopped);
    assert_eq!(finished.results.len(), 5);
    assert_eq!(finished.success_count, 5);
    assert_eq!(coordinator.status().await.phase, BatchPhase::Completed);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let executor = Arc::new(FakeExecutor::new().with_delay(Duration::from_millis(50)));
    let (coordinator, _sink) = coordinator(executor.clone());

    let handle = coordinator.start(orders(&["A", "B"])).await.unwrap().spawn();

    let second = coordinator.start(orders(&["X"])).await;
    assert!(matches!(second, Err(BatchError::AlreadyRunning)));
    assert!(matches!(
        coordinator.resume().await,
        Err(BatchError::AlreadyRunning)
    ));

    let report = handle.await.unwrap();
    assert_eq!(report.success_count, 2);
    assert_eq!(executor.executed(), ["A", "B"]);
}

#[tokio::test]
async fn test_stop_and_resume_without_batch() {
    let executor = Arc::new(FakeExecutor::new());
    let (coordinator, _sink) = coordinator(executor);

    assert_eq!(coordinator.stop().await, Err(BatchError::NotRunning));
    assert!(matches!(
        coordinator.resume().await,
        Err(BatchError::NothingToResume)
    ));

    coordinator.run_batch(orders(&["A"])).await.unwrap();
    assert_eq!(coordinator.stop().await, Err(BatchError::NotRunning));
    assert!(matches!(
        coordinator.resume().await,
        Err(BatchError::NothingToResume)
    ));
}

#[tokio::test]
async fn test_executor_failures_become_failed_entries() {
    let executor = Arc::new(FakeExecutor::new().with_script(|order: &OrderSpec| {
        match order.product.as_str() {
            "PANIC" => Scripted::Panic,
            "BUSY" => Scripted::Busy,
            "FAIL" => Scripted::Fail,
            _ => Scripted::Succeed,
        }
    }));
    let (coordinator, _sink) = coordinator(executor.clone());

    let report = coordinator
        .run_batch(orders(&["A", "PANIC", "BUSY", "FAIL", "E"]))
        .await
        .unwrap();

    assert_eq!(executor.executed(), ["A", "PANIC", "BUSY", "FAIL", "E"]);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 3);
    let success: Vec<bool> = report.results.iter().map(|r| r.success).collect();
    assert_eq!(success, vec![true, false, false, false, true]);
    assert!(report.results[1].message.contains("任务异常终止"));
    assert!(report.results[2].status.is_none());
    assert_eq!(coordinator.status().await.phase, BatchPhase::Completed);
}

#[tokio::test]
async fn test_new_start_discards_stopped_batch() {
    let executor = Arc::new(FakeExecutor::new().stop_after(1));
    let (coordinator, _sink) = coordinator(executor.clone());

    let stopped = coordinator.run_batch(orders(&["A", "B", "C"])).await.unwrap();
    assert!(stopped.stopped);
    assert!(coordinator.status().await.can_resume);

    let report = coordinator.run_batch(orders(&["X", "Y"])).await.unwrap();
    assert!(!report.stopped);
    assert_eq!(report.total_count, 2);

    assert!(matches!(
        coordinator.resume().await,
        Err(BatchError::NothingToResume)
    ));
    assert_eq!(executor.executed(), ["A", "X", "Y"]);
}

#[tokio::test]
async fn test_stop_during_last_order_completes() {
    let executor = Arc::new(FakeExecutor::new().stop_after(2));
    let (coordinator, sink) = coordinator(executor.clone());

    let report = coordinator.run_batch(orders(&["A", "B"])).await.unwrap();

    assert!(!report.stopped);
    assert_eq!(report.results.len(), 2);
    let status = coordinator.status().await;
    assert_eq!(status.phase, BatchPhase::Completed);
    assert!(!status.can_resume);
    assert_eq!(sink.updates().last().unwrap().step, Step::BatchDone);
}

#[tokio::test]
async fn test_waits_only_between_orders() {
    let executor = Arc::new(FakeExecutor::new());
    let sink = Arc::new(RecordingSink::default());
    let coordinator = Arc::new(BatchCoordinator::new(
        executor.clone(),
        sink.clone(),
        BatchConfig {
            inter_order_delay: Duration::from_millis(100),
        },
    ));

    let started = std::time::Instant::now();
    coordinator.run_batch(orders(&["A", "B", "C"])).await.unwrap();
    let elapsed = started.elapsed();

    // 三个订单之间只有两次等待
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(290), "{elapsed:?}");

    let steps: Vec<Step> = sink
        .updates()
        .iter()
        .map(|u| u.step)
        .filter(|s| matches!(s, Step::Batch | Step::BatchWait | Step::BatchDone))
        .collect();
    assert_eq!(
        steps,
        vec![
            Step::Batch,
            Step::BatchWait,
            Step::Batch,
            Step::BatchWait,
            Step::Batch,
            Step::BatchDone,
        ]
    );
}

#[tokio::test]
async fn test_dropped_run_releases_coordinator() {
    let executor = Arc::new(FakeExecutor::new());
    let (coordinator, _sink) = coordinator(executor.clone());

    drop(coordinator.start(orders(&["A", "B"])).await.unwrap());

    let status = coordinator.status().await;
    assert_eq!(status.phase, BatchPhase::Idle);
    assert!(!status.running);
    assert_eq!(coordinator.stop().await, Err(BatchError::NotRunning));

    let report = coordinator.run_batch(orders(&["X"])).await.unwrap();
    assert_eq!(report.success_count, 1);
    assert_eq!(executor.executed(), ["X"]);
}

#[tokio::test]
async fn test_dropped_resume_keeps_checkpoint() {
    let executor = Arc::new(FakeExecutor::new().stop_after(1));
    let (coordinator, _sink) = coordinator(executor.clone());

    coordinator.run_batch(orders(&["A", "B", "C"])).await.unwrap();
    let run = coordinator.resume().await.unwrap();
    assert_eq!(run.remaining(), 2);
    drop(run);

    let status = coordinator.status().await;
    assert_eq!(status.phase, BatchPhase::StoppedResumable);
    assert!(status.can_resume);

    let finished = coordinator.resume().await.unwrap().run().await;
    assert!(!finished.stopped);
    assert_eq!(executor.executed(), ["A", "B", "C"]);
}
