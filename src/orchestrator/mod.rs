//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_coordinator` - 批处理协调器
//! - 顺序执行一批订单
//! - 停止 / 继续，保存检查点
//! - 汇总每个订单的结果
//!
//! ### `app` - 应用入口
//! - 装配所有组件
//! - 提供对外操作
//!
//! ## 层次关系
//!
//! ```text
//! app (装配 + 对外操作)
//!     ↓
//! batch_coordinator (处理 Vec<OrderSpec>)
//!     ↓
//! workflow::OrderPipeline (处理单个订单)
//!     ↓
//! services (能力层：匹配 / 解析 / 进度 / 报告)
//!     ↓
//! session + infrastructure (页面资源)
//! ```

pub mod app;
pub mod batch_coordinator;

pub use app::App;
pub use batch_coordinator::{
    BatchConfig, BatchCoordinator, BatchPhase, BatchReport, BatchRun, BatchStatus,
};
