//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：装配会话、商品目录、流水线、批处理协调器
//! 2. **对外操作**：开始 / 停止 / 继续批次、查询状态、执行单个订单
//! 3. **命令行运行**：加载订单文件，运行整批，Ctrl-C 时停止，写报告
//!
//! 只有本模块知道具体的浏览器实现（`CdpConnector`），其余层只依赖 trait。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::browser::CdpConnector;
use crate::config::Config;
use crate::error::{BatchError, PipelineError};
use crate::infrastructure::BrowserConnector;
use crate::models::{self, ExecutionResult, OrderSpec, ProductCatalog, StaticCatalog, StatusUpdate};
use crate::orchestrator::batch_coordinator::{BatchCoordinator, BatchReport, BatchRun, BatchStatus};
use crate::services::{OptionResolver, ReportWriter, StatusHub};
use crate::session::SessionController;
use crate::utils::logging;
use crate::workflow::{OrderExecutor, OrderPipeline};

/// 应用主结构
pub struct App {
    config: Config,
    session: Arc<SessionController>,
    pipeline: Arc<OrderPipeline>,
    coordinator: Arc<BatchCoordinator>,
    status: Arc<StatusHub>,
}

impl App {
    /// 使用 CDP 连接初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);
        let connector = Arc::new(CdpConnector::new(config.browser_endpoint()));
        Self::with_connector(config, connector).await
    }

    /// 使用指定的浏览器连接方式初始化应用
    pub async fn with_connector(
        config: Config,
        connector: Arc<dyn BrowserConnector>,
    ) -> Result<Self> {
        config.validate()?;

        let catalog: Arc<dyn ProductCatalog> = match &config.catalog_file {
            Some(path) => Arc::new(models::load_catalog(Path::new(path)).await?),
            None => Arc::new(StaticCatalog::builtin()),
        };

        let status = Arc::new(StatusHub::default());
        let session = Arc::new(SessionController::new(connector, config.session_config()));
        let pipeline = Arc::new(OrderPipeline::new(
            session.clone(),
            catalog,
            OptionResolver::new(config.resolver_config()),
            status.clone(),
            config.pipeline_config(),
        ));
        let coordinator = Arc::new(BatchCoordinator::new(
            pipeline.clone(),
            status.clone(),
            config.batch_config(),
        ));

        Ok(Self {
            config,
            session,
            pipeline,
            coordinator,
            status,
        })
    }

    // ========== 对外操作 ==========

    pub async fn start_batch(&self, orders: Vec<OrderSpec>) -> Result<BatchRun, BatchError> {
        self.coordinator.start(orders).await
    }

    pub async fn stop_batch(&self) -> Result<(), BatchError> {
        self.coordinator.stop().await
    }

    pub async fn resume_batch(&self) -> Result<BatchRun, BatchError> {
        self.coordinator.resume().await
    }

    pub async fn batch_status(&self) -> BatchStatus {
        self.coordinator.status().await
    }

    pub async fn execute_single_order(
        &self,
        order: &OrderSpec,
    ) -> Result<ExecutionResult, PipelineError> {
        self.pipeline.execute(order, None).await
    }

    /// 最新的进度状态
    pub fn latest_status(&self) -> StatusUpdate {
        self.status.latest()
    }

    pub fn status_hub(&self) -> Arc<StatusHub> {
        self.status.clone()
    }

    pub async fn is_browser_connected(&self) -> bool {
        self.session.is_connected().await
    }

    // ========== 命令行运行 ==========

    /// 运行订单文件中的整批订单
    pub async fn run(&self) -> Result<()> {
        let orders = self.load_orders().await?;

        if orders.is_empty() {
            warn!("⚠️ 订单文件中没有订单，程序结束");
            return Ok(());
        }
        logging::log_orders_loaded(orders.len(), &self.config.orders_file);

        let report = self.run_until_done_or_interrupted(orders).await?;

        ReportWriter::with_path(self.config.report_file.clone())
            .write(&report)
            .await
            .with_context(|| format!("无法写入报告文件: {}", self.config.report_file))?;
        logging::print_final_stats(&report, &self.config.report_file);

        Ok(())
    }

    async fn load_orders(&self) -> Result<Vec<OrderSpec>> {
        info!("\n📁 正在加载订单: {}", self.config.orders_file);
        models::load_orders(Path::new(&self.config.orders_file)).await
    }

    async fn run_until_done_or_interrupted(&self, orders: Vec<OrderSpec>) -> Result<BatchReport> {
        let handle = self.coordinator.start(orders).await?.spawn();

        let coordinator = self.coordinator.clone();
        let stopper = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，当前订单完成后停止");
                if let Err(e) = coordinator.stop().await {
                    warn!("停止批次失败: {}", e);
                }
            }
        });

        let report = handle.await.context("批处理任务异常终止")?;
        stopper.abort();
        Ok(report)
    }
}
