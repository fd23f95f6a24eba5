//! 进度推送
//!
//! 流水线和批处理只管发布 `StatusUpdate`，由谁消费（日志、SSE、轮询）不在本层决定。

use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::models::status::{RunStatus, StatusUpdate};

pub trait StatusSink: Send + Sync {
    fn publish(&self, update: StatusUpdate);
}

/// 丢弃所有更新
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&self, _update: StatusUpdate) {}
}

/// 保存最新状态并广播每一次更新
pub struct StatusHub {
    latest: watch::Sender<StatusUpdate>,
    stream: broadcast::Sender<StatusUpdate>,
}

impl StatusHub {
    pub fn new(capacity: usize) -> Self {
        let (latest, _) = watch::channel(StatusUpdate::idle());
        let (stream, _) = broadcast::channel(capacity.max(1));
        Self { latest, stream }
    }

    /// 当前状态（轮询接口使用）
    pub fn latest(&self) -> StatusUpdate {
        self.latest.borrow().clone()
    }

    /// 订阅后续的所有更新（推送接口使用）
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.stream.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<StatusUpdate> {
        self.latest.subscribe()
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StatusSink for StatusHub {
    fn publish(&self, update: StatusUpdate) {
        match update.status {
            RunStatus::Error => debug!("[{:>3}%] ❌ {}", update.progress, update.message),
            _ => debug!("[{:>3}%] {}", update.progress, update.message),
        }
        self.latest.send_replace(update.clone());
        // 没有订阅者时发送失败是正常的
        let _ = self.stream.send(update);
    }
}
