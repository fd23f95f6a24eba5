//! 流程层（Workflow Layer）
//!
//! 定义"一个订单"的完整处理流程，不持有页面资源。

pub mod order_ctx;
pub mod order_pipeline;

pub use order_ctx::OrderCtx;
pub use order_pipeline::{OrderExecutor, OrderPipeline, PipelineConfig};
