//! 批处理协调器 - 编排层
//!
//! 顺序执行一批订单，支持停止和从停止位置继续。
//!
//! 状态转换：
//!
//! ```text
//! Idle ──start──▶ Running ──全部完成──▶ Completed
//!                   │  ▲
//!                 stop  resume
//!                   ▼  │
//!             StoppedResumable
//! ```
//!
//! 停止请求只让当前批次的运行标识失效；循环在两个订单之间看到失效后
//! 保存检查点并退出，正在执行的订单不会被打断。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::BatchError;
use crate::models::order::OrderSpec;
use crate::models::result::BatchEntry;
use crate::models::status::{BatchProgress, RunStatus, Step, StatusUpdate};
use crate::services::StatusSink;
use crate::workflow::OrderExecutor;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// 两个订单之间的等待（最后一个订单之后不等待）
    pub inter_order_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_order_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchPhase {
    Idle,
    Running,
    StoppedResumable,
    Completed,
}

/// 批处理汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// 停止时尚未执行的订单数
    pub skipped_count: usize,
    pub stopped: bool,
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn from_results(total: usize, results: Vec<BatchEntry>, stopped: bool) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            total_count: total,
            success_count,
            failure_count: results.len() - success_count,
            skipped_count: total.saturating_sub(results.len()),
            stopped,
            results,
        }
    }
}

/// 批处理状态查询结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub phase: BatchPhase,
    pub running: bool,
    pub can_resume: bool,
    pub progress: Option<BatchProgress>,
    pub last_report: Option<BatchReport>,
}

/// 停止时保存的位置
#[derive(Debug, Clone)]
struct Checkpoint {
    queue: Arc<Vec<OrderSpec>>,
    /// 下一个要执行的订单，总是等于 `results.len()`
    cursor: usize,
    results: Vec<BatchEntry>,
}

struct BatchInner {
    phase: BatchPhase,
    active_run: Option<u64>,
    checkpoint: Option<Checkpoint>,
    progress: Option<BatchProgress>,
    last_report: Option<BatchReport>,
}

pub struct BatchCoordinator {
    executor: Arc<dyn OrderExecutor>,
    sink: Arc<dyn StatusSink>,
    config: BatchConfig,
    inner: Mutex<BatchInner>,
    next_run: AtomicU64,
}

/// 一次已获准的批处理运行
///
/// 由 `start` / `resume` 返回，调用 `run` 或 `spawn` 后才真正执行。
/// 未执行就丢弃时，协调器回到获准之前的状态。
#[must_use = "批处理需要调用 run() 或 spawn() 才会执行"]
pub struct BatchRun {
    coordinator: Arc<BatchCoordinator>,
    run_id: u64,
    /// 来自 `resume`，丢弃时要把检查点放回去
    resumed: bool,
    /// `run` 取走之后为 `None`
    checkpoint: Option<Checkpoint>,
}

impl BatchRun {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// 本次运行还要执行的订单数
    pub fn remaining(&self) -> usize {
        self.checkpoint
            .as_ref()
            .map_or(0, |c| c.queue.len() - c.cursor)
    }

    pub async fn run(mut self) -> BatchReport {
        let Some(checkpoint) = self.checkpoint.take() else {
            return BatchReport::from_results(0, Vec::new(), false);
        };
        let coordinator = self.coordinator.clone();
        coordinator.drive(self.run_id, checkpoint).await
    }

    pub fn spawn(self) -> JoinHandle<BatchReport> {
        tokio::spawn(self.run())
    }
}

impl Drop for BatchRun {
    fn drop(&mut self) {
        let Some(checkpoint) = self.checkpoint.take() else {
            return;
        };
        let (run_id, resumed) = (self.run_id, self.resumed);
        if let Ok(mut inner) = self.coordinator.inner.try_lock() {
            inner.abandon(run_id, resumed, checkpoint);
            return;
        }

        let coordinator = self.coordinator.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    coordinator
                        .inner
                        .lock()
                        .await
                        .abandon(run_id, resumed, checkpoint);
                });
            }
            Err(_) => warn!("⚠️ 批次 #{} 未执行即被丢弃，无法复位状态", run_id),
        }
    }
}

impl BatchInner {
    /// 撤销一次从未执行的运行
    fn abandon(&mut self, run_id: u64, resumed: bool, checkpoint: Checkpoint) {
        // stop() 可能已经清掉了运行标识
        let ours = self.active_run.map_or(true, |id| id == run_id);
        if self.phase != BatchPhase::Running || !ours {
            return;
        }
        self.active_run = None;
        if resumed {
            self.checkpoint = Some(checkpoint);
            self.phase = BatchPhase::StoppedResumable;
        } else {
            self.phase = BatchPhase::Idle;
        }
        info!("批次 #{} 未执行即被丢弃", run_id);
    }
}

impl BatchCoordinator {
    pub fn new(
        executor: Arc<dyn OrderExecutor>,
        sink: Arc<dyn StatusSink>,
        config: BatchConfig,
    ) -> Self {
        Self {
            executor,
            sink,
            config,
            inner: Mutex::new(BatchInner {
                phase: BatchPhase::Idle,
                active_run: None,
                checkpoint: None,
                progress: None,
                last_report: None,
            }),
            next_run: AtomicU64::new(1),
        }
    }

    /// 开始新批次
    ///
    /// 已有批次在运行时拒绝；之前停止的批次的检查点会被丢弃。
    pub async fn start(self: &Arc<Self>, orders: Vec<OrderSpec>) -> Result<BatchRun, BatchError> {
        let mut inner = self.inner.lock().await;
        if inner.phase == BatchPhase::Running {
            warn!("⚠️ 已有批次正在运行，拒绝新的批次");
            return Err(BatchError::AlreadyRunning);
        }

        let run_id = self.next_run.fetch_add(1, Ordering::SeqCst);
        if inner.checkpoint.take().is_some() {
            info!("丢弃之前停止的批次");
        }
        inner.phase = BatchPhase::Running;
        inner.active_run = Some(run_id);
        inner.last_report = None;
        inner.progress = None;

        info!("📦 批次 #{} 开始: 共 {} 个订单", run_id, orders.len());
        Ok(BatchRun {
            coordinator: self.clone(),
            run_id,
            resumed: false,
            checkpoint: Some(Checkpoint {
                queue: Arc::new(orders),
                cursor: 0,
                results: Vec::new(),
            }),
        })
    }

    /// 从停止的位置继续
    pub async fn resume(self: &Arc<Self>) -> Result<BatchRun, BatchError> {
        let mut inner = self.inner.lock().await;
        if inner.phase == BatchPhase::Running {
            return Err(BatchError::AlreadyRunning);
        }
        let checkpoint = inner.checkpoint.take().ok_or(BatchError::NothingToResume)?;

        let run_id = self.next_run.fetch_add(1, Ordering::SeqCst);
        inner.phase = BatchPhase::Running;
        inner.active_run = Some(run_id);
        inner.last_report = None;

        info!(
            "▶️ 批次 #{} 从第 {}/{} 个订单继续",
            run_id,
            checkpoint.cursor + 1,
            checkpoint.queue.len()
        );
        Ok(BatchRun {
            coordinator: self.clone(),
            run_id,
            resumed: true,
            checkpoint: Some(checkpoint),
        })
    }

    /// 请求停止当前批次
    ///
    /// 当前订单会执行完；批次在下一个订单开始前停下。
    pub async fn stop(&self) -> Result<(), BatchError> {
        let mut inner = self.inner.lock().await;
        match (inner.phase, inner.active_run.take()) {
            (BatchPhase::Running, Some(run_id)) => {
                info!("⏸️ 已请求停止批次 #{}", run_id);
                Ok(())
            }
            _ => Err(BatchError::NotRunning),
        }
    }

    pub async fn status(&self) -> BatchStatus {
        let inner = self.inner.lock().await;
        BatchStatus {
            phase: inner.phase,
            running: inner.phase == BatchPhase::Running,
            can_resume: inner.phase != BatchPhase::Running && inner.checkpoint.is_some(),
            progress: inner.progress.clone(),
            last_report: inner.last_report.clone(),
        }
    }

    /// 开始并等待整批完成
    pub async fn run_batch(self: &Arc<Self>, orders: Vec<OrderSpec>) -> Result<BatchReport, BatchError> {
        Ok(self.start(orders).await?.run().await)
    }

    async fn drive(&self, run_id: u64, checkpoint: Checkpoint) -> BatchReport {
        let Checkpoint {
            queue,
            cursor,
            mut results,
        } = checkpoint;
        let total = queue.len();
        let mut stopped = false;

        for index in cursor..total {
            let order = &queue[index];
            let progress = BatchProgress {
                current: index + 1,
                total,
                order_id: order.order_id.clone(),
                product: order.product.clone(),
                results: results.clone(),
            };

            {
                let mut inner = self.inner.lock().await;
                if inner.active_run != Some(run_id) {
                    inner.checkpoint = Some(Checkpoint {
                        queue: queue.clone(),
                        cursor: index,
                        results: results.clone(),
                    });
                    stopped = true;
                    break;
                }
                inner.progress = Some(progress.clone());
            }

            info!("\n{}", "=".repeat(60));
            info!("📦 订单 {}/{}: {}", index + 1, total, order.label());
            info!("{}", "=".repeat(60));
            self.sink.publish(
                StatusUpdate::new(
                    RunStatus::Running,
                    Step::Batch,
                    batch_percent(index, total),
                    format!("[{}/{}] {} 处理中", index + 1, total, order.product),
                )
                .with_batch(Some(progress.clone())),
            );

            let entry = self.execute_one(index, order, progress).await;
            if entry.success {
                info!("✓ 订单 {}/{} 完成", index + 1, total);
            } else {
                warn!("✗ 订单 {}/{} 失败: {}", index + 1, total, entry.message);
            }
            results.push(entry);

            if index + 1 < total {
                self.sink.publish(StatusUpdate::new(
                    RunStatus::Running,
                    Step::BatchWait,
                    batch_percent(index + 1, total),
                    format!("下一个订单准备中... ({}/{})", index + 2, total),
                ));
                sleep(self.config.inter_order_delay).await;
            }
        }

        let report = BatchReport::from_results(total, results, stopped);
        self.finish(run_id, &report).await;
        report
    }

    /// 执行单个订单，执行器的任何失败都转换为失败记录
    async fn execute_one(&self, index: usize, order: &OrderSpec, progress: BatchProgress) -> BatchEntry {
        let executor = self.executor.clone();
        let order_owned = order.clone();
        let handle = tokio::spawn(async move { executor.execute(&order_owned, Some(progress)).await });

        match handle.await {
            Ok(Ok(result)) => BatchEntry::from_result(index, result),
            Ok(Err(e)) => {
                error!("[订单 {}] ❌ 无法执行: {}", index + 1, e);
                BatchEntry::failed(index, order.clone(), e.to_string())
            }
            Err(e) => {
                error!("[订单 {}] 任务执行失败: {}", index + 1, e);
                BatchEntry::failed(index, order.clone(), format!("任务异常终止: {}", e))
            }
        }
    }

    async fn finish(&self, run_id: u64, report: &BatchReport) {
        {
            let mut inner = self.inner.lock().await;
            if inner.active_run == Some(run_id) {
                inner.active_run = None;
            }
            inner.phase = if report.stopped {
                BatchPhase::StoppedResumable
            } else {
                BatchPhase::Completed
            };
            inner.progress = None;
            inner.last_report = Some(report.clone());
        }

        let summary = format!(
            "成功 {}/{}，失败 {}，未执行 {}",
            report.success_count, report.total_count, report.failure_count, report.skipped_count
        );
        let update = if report.stopped {
            info!("⏸️ 批次 #{} 已停止: {}", run_id, summary);
            StatusUpdate::new(
                RunStatus::Stopped,
                Step::BatchStopped,
                batch_percent(report.results.len(), report.total_count),
                format!("批处理已停止: {}", summary),
            )
        } else {
            info!("🏁 批次 #{} 完成: {}", run_id, summary);
            StatusUpdate::new(
                RunStatus::Completed,
                Step::BatchDone,
                100,
                format!("批处理完成: {}", summary),
            )
        };
        self.sink.publish(update);
    }
}

fn batch_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as f64 / total as f64) * 100.0).round() as u8
}
