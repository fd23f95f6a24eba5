//! # Auto Order
//!
//! 通过浏览器远程调试通道，在商品定制页面上自动选择选项并加入购物车。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 页面驱动 trait、注入脚本、`JsExecutor`
//! - `browser/` - 基于 chromiumoxide 的 CDP 实现
//! - `session/` - `SessionController`，维持一个可用页面，失效时分层恢复
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 选项匹配、字段解析、进度推送、报告写入
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - `OrderPipeline`，单个订单的完整流程
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - `BatchCoordinator` 批处理和 `App` 装配
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ExecutionResult, ExecutionStatus, OrderSpec};
pub use orchestrator::{App, BatchCoordinator, BatchReport};
pub use session::SessionController;
pub use workflow::{OrderExecutor, OrderPipeline};
