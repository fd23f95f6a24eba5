//! 对外推送的进度状态

use serde::{Deserialize, Serialize};

use crate::models::result::BatchEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Error,
    Stopped,
}

/// 当前所处的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Idle,
    Init,
    Navigate,
    Options,
    #[serde(rename = "addToCart")]
    AddToCart,
    Done,
    OptionFailed,
    DisabledOption,
    Error,
    Batch,
    BatchWait,
    BatchDone,
    BatchStopped,
}

/// 批次进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// 当前订单序号（从 1 开始）
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub product: String,
    pub results: Vec<BatchEntry>,
}

/// 一次状态推送
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: RunStatus,
    pub message: String,
    pub step: Step,
    /// 0..=100
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_progress: Option<BatchProgress>,
}

impl StatusUpdate {
    pub fn new(status: RunStatus, step: Step, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            step,
            progress: progress.min(100),
            batch_progress: None,
        }
    }

    pub fn with_batch(mut self, batch: Option<BatchProgress>) -> Self {
        self.batch_progress = batch;
        self
    }

    pub fn idle() -> Self {
        Self::new(RunStatus::Idle, Step::Idle, 0, "")
    }
}

/// 选项阶段的进度：10% 起步，按字段线性推进到 80%
pub fn option_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 80;
    }
    let ratio = index.min(total) as f64 / total as f64;
    (10.0 + ratio * 70.0).round() as u8
}
