//! 订单处理流程 - 流程层
//!
//! 核心职责：定义"一个订单"的完整处理流程
//!
//! 流程顺序：
//! 1. 查找商品页面 → 取得可用页面
//! 2. 导航到商品页面并等待渲染
//! 3. 按系列顺序逐个设置选项
//! 4. 加入购物车（试运行时跳过）
//!
//! 遇到不可选的选项立即停止并保留页面，供人工处理；
//! 页面层面的异常视为致命错误，释放会话。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{DriverError, DriverResult, PipelineError};
use crate::infrastructure::{PageDriver, SubmitClick};
use crate::models::order::{OrderSpec, PlannedField, DEFAULT_SETTLE};
use crate::models::product::ProductCatalog;
use crate::models::result::{
    ExecutionResult, ExecutionStatus, FieldRef, StepOutcome, StepResult, SubmitOutcome,
};
use crate::models::status::{option_progress, BatchProgress, RunStatus, Step, StatusUpdate};
use crate::services::{OptionResolver, Resolution, StatusSink};
use crate::session::SessionController;
use crate::workflow::order_ctx::OrderCtx;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 导航后等待页面脚本渲染选项的时间
    pub navigation_settle: Duration,
    /// 等待加入购物车按钮可点的上限
    pub submit_ready_timeout: Duration,
    /// 点击后等待跳转到购物车的上限
    pub submit_navigation_timeout: Duration,
    /// 没有观察到跳转时的额外等待
    pub submit_fallback_wait: Duration,
    pub poll_interval: Duration,
    /// 只设置选项，不加入购物车
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            navigation_settle: Duration::from_millis(3000),
            submit_ready_timeout: Duration::from_millis(5000),
            submit_navigation_timeout: Duration::from_millis(10_000),
            submit_fallback_wait: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(200),
            dry_run: false,
        }
    }
}

/// 执行单个订单的能力
///
/// 批处理只依赖这个 trait。
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// 执行一个订单
    ///
    /// 订单本身的失败通过 `ExecutionResult.status` 表达；
    /// 只有已有订单在执行时才返回 `Err`。
    async fn execute(
        &self,
        order: &OrderSpec,
        batch: Option<BatchProgress>,
    ) -> Result<ExecutionResult, PipelineError>;
}

struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 订单处理流程
///
/// - 编排单个订单的完整流程
/// - 页面资源由 `SessionController` 持有
/// - 同一时间只执行一个订单
pub struct OrderPipeline {
    session: Arc<SessionController>,
    catalog: Arc<dyn ProductCatalog>,
    resolver: OptionResolver,
    sink: Arc<dyn StatusSink>,
    config: PipelineConfig,
    executing: AtomicBool,
}

impl OrderPipeline {
    pub fn new(
        session: Arc<SessionController>,
        catalog: Arc<dyn ProductCatalog>,
        resolver: OptionResolver,
        sink: Arc<dyn StatusSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            session,
            catalog,
            resolver,
            sink,
            config,
            executing: AtomicBool::new(false),
        }
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    async fn run(&self, order: &OrderSpec, ctx: &OrderCtx) -> ExecutionResult {
        let mut steps = Vec::new();

        self.publish(ctx, RunStatus::Running, Step::Init, 5, "浏览器状态确认中...");

        let Some(target) = self.catalog.resolve(&order.product) else {
            let message = format!("找不到商品页面: {}", order.product);
            return self.fatal(ctx, order, steps, message, false).await;
        };
        debug!("{} 商品页面: {} ({})", ctx, target.url, target.family.code());

        let page = match self.session.acquire_page().await {
            Ok(page) => page,
            Err(e) => return self.fatal(ctx, order, steps, e.to_string(), false).await,
        };

        // ========== 导航 ==========
        info!("{} 🌐 打开商品页面: {}", ctx, target.name);
        self.publish(
            ctx,
            RunStatus::Running,
            Step::Navigate,
            10,
            format!("商品页面加载中: {}", target.name),
        );
        if let Err(e) = page.goto(&target.url).await {
            let message = format!("打开商品页面失败: {}", e);
            return self.fatal(ctx, order, steps, message, true).await;
        }
        sleep(self.config.navigation_settle).await;

        // ========== 选项 ==========
        let plan = order.plan(target.family);
        info!(
            "{} 📋 需要设置 {} 个选项 (系列 {})",
            ctx,
            plan.len(),
            target.family.code()
        );

        let mut failed_fields = Vec::new();
        for (i, field) in plan.iter().enumerate() {
            self.publish(
                ctx,
                RunStatus::Running,
                Step::Options,
                option_progress(i, plan.len()),
                format!("{} 设置中: {}", field.display_name(), field.value),
            );

            let resolution = match self.resolve_field(page.as_ref(), field).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    steps.push(StepResult {
                        field: field.key.clone(),
                        requested_value: field.value.clone(),
                        outcome: StepOutcome::TransientError,
                        detail: Some(e.to_string()),
                    });
                    let message = format!("{} 设置失败: {}", field.display_name(), e);
                    return self.fatal(ctx, order, steps, message, true).await;
                }
            };
            steps.push(step_result(field, &resolution));

            match resolution.outcome {
                StepOutcome::Applied => sleep(field.settle).await,
                StepOutcome::AlreadyApplied => {}
                StepOutcome::NotFound => {
                    warn!(
                        "{} ⚠️ {}: 未找到 \"{}\" ({})",
                        ctx,
                        field.display_name(),
                        field.value,
                        resolution.detail.as_deref().unwrap_or("-")
                    );
                    failed_fields.push(field_ref(field));
                }
                StepOutcome::Disabled => {
                    return self.disabled(ctx, order, steps, field);
                }
                StepOutcome::TransientError => {
                    let message = format!(
                        "{} 设置失败: {}",
                        field.display_name(),
                        resolution.detail.as_deref().unwrap_or("页面状态异常")
                    );
                    return self.fatal(ctx, order, steps, message, true).await;
                }
            }
        }

        if !failed_fields.is_empty() {
            let names: Vec<String> = failed_fields
                .iter()
                .map(|f| format!("{}={}", f.field, f.value))
                .collect();
            let message = format!("以下选项未找到: {}", names.join(", "));
            warn!("{} ❌ {}", ctx, message);
            self.publish(ctx, RunStatus::Error, Step::OptionFailed, 100, message.clone());
            return ExecutionResult {
                order: order.clone(),
                status: ExecutionStatus::OptionFailure,
                message,
                steps,
                failed_fields,
                disabled_field: None,
                submission: None,
            };
        }

        // ========== 加入购物车 ==========
        let submission = if self.config.dry_run {
            info!("{} 🧪 试运行，跳过加入购物车", ctx);
            SubmitOutcome::Skipped
        } else {
            self.publish(ctx, RunStatus::Running, Step::AddToCart, 90, "加入购物车...");
            match self.submit(page.as_ref(), order, ctx).await {
                Ok(outcome) => outcome,
                Err(message) => return self.fatal(ctx, order, steps, message, true).await,
            }
        };

        let message = match submission {
            SubmitOutcome::Confirmed => "已加入购物车",
            SubmitOutcome::Provisional => "已点击加入购物车（未确认跳转）",
            SubmitOutcome::Skipped => "选项设置完成（试运行）",
        };
        info!("{} ✅ {}", ctx, message);
        self.publish(ctx, RunStatus::Completed, Step::Done, 100, message);

        ExecutionResult {
            order: order.clone(),
            status: ExecutionStatus::Completed,
            message: message.to_string(),
            steps,
            failed_fields: Vec::new(),
            disabled_field: None,
            submission: Some(submission),
        }
    }

    /// 设置单个字段；页面导航中或元素失效时重试一次
    async fn resolve_field(
        &self,
        page: &dyn PageDriver,
        field: &PlannedField,
    ) -> DriverResult<Resolution> {
        match self.resolver.resolve(page, field).await {
            Ok(resolution) if resolution.outcome != StepOutcome::TransientError => Ok(resolution),
            Ok(_) | Err(DriverError::Navigating(_)) | Err(DriverError::Timeout(_)) => {
                debug!("{} 页面状态不稳定，稍后重试", field.display_name());
                sleep(DEFAULT_SETTLE).await;
                self.resolver.resolve(page, field).await
            }
            Err(e) => Err(e),
        }
    }

    /// 点击加入购物车并等待跳转
    async fn submit(
        &self,
        page: &dyn PageDriver,
        order: &OrderSpec,
        ctx: &OrderCtx,
    ) -> Result<SubmitOutcome, String> {
        if order.quantity > 1 {
            match page.set_quantity(order.quantity).await {
                Ok(true) => info!("{} 数量: {}", ctx, order.quantity),
                Ok(false) => {
                    return Err(format!("页面没有数量输入框，无法设置数量 {}", order.quantity))
                }
                Err(e) => return Err(format!("设置数量失败: {}", e)),
            }
        }

        let deadline = Instant::now() + self.config.submit_ready_timeout;
        loop {
            match page.click_submit().await {
                Ok(SubmitClick::Clicked) => break,
                Ok(state) => {
                    if Instant::now() >= deadline {
                        return Err(format!("加入购物车按钮不可用: {:?}", state));
                    }
                }
                Err(e) if e.is_dead_handle() => return Err(format!("加入购物车失败: {}", e)),
                Err(e) => {
                    debug!("{} 点击加入购物车出错: {}", ctx, e);
                    if Instant::now() >= deadline {
                        return Err(format!("加入购物车失败: {}", e));
                    }
                }
            }
            sleep(self.config.poll_interval).await;
        }
        info!("{} 🛒 已点击加入购物车", ctx);

        let deadline = Instant::now() + self.config.submit_navigation_timeout;
        while Instant::now() < deadline {
            sleep(self.config.poll_interval).await;
            if let Ok(Some(url)) = page.current_url().await {
                if url.contains("/cart") {
                    return Ok(SubmitOutcome::Confirmed);
                }
            }
        }

        warn!("{} ⚠️ 没有观察到购物车页面跳转，按已提交处理", ctx);
        sleep(self.config.submit_fallback_wait).await;
        Ok(SubmitOutcome::Provisional)
    }

    fn disabled(
        &self,
        ctx: &OrderCtx,
        order: &OrderSpec,
        steps: Vec<StepResult>,
        field: &PlannedField,
    ) -> ExecutionResult {
        let message = format!(
            "{} 的选项 \"{}\" 不可选，请在页面上手动处理",
            field.display_name(),
            field.value
        );
        warn!("{} 🚫 {}", ctx, message);
        self.publish(ctx, RunStatus::Error, Step::DisabledOption, 100, message.clone());
        ExecutionResult {
            order: order.clone(),
            status: ExecutionStatus::DisabledOptionFailure,
            message,
            steps,
            failed_fields: Vec::new(),
            disabled_field: Some(field_ref(field)),
            submission: None,
        }
    }

    async fn fatal(
        &self,
        ctx: &OrderCtx,
        order: &OrderSpec,
        steps: Vec<StepResult>,
        message: String,
        release: bool,
    ) -> ExecutionResult {
        error!("{} ❌ {}", ctx, message);
        self.publish(ctx, RunStatus::Error, Step::Error, 100, message.clone());
        if release {
            self.session.release().await;
        }
        ExecutionResult {
            order: order.clone(),
            status: ExecutionStatus::FatalError,
            message,
            steps,
            failed_fields: Vec::new(),
            disabled_field: None,
            submission: None,
        }
    }

    fn publish(
        &self,
        ctx: &OrderCtx,
        status: RunStatus,
        step: Step,
        progress: u8,
        message: impl Into<String>,
    ) {
        let message = message.into();
        let message = match &ctx.batch {
            Some(batch) => format!("[{}/{}] {}", batch.current, batch.total, message),
            None => message,
        };
        self.sink.publish(
            StatusUpdate::new(status, step, progress, message).with_batch(ctx.batch.clone()),
        );
    }
}

#[async_trait]
impl OrderExecutor for OrderPipeline {
    async fn execute(
        &self,
        order: &OrderSpec,
        batch: Option<BatchProgress>,
    ) -> Result<ExecutionResult, PipelineError> {
        let _flight = FlightGuard::try_acquire(&self.executing).ok_or_else(|| {
            warn!("已有订单正在执行，拒绝: {}", order.label());
            PipelineError::OrderInFlight
        })?;

        let ctx = OrderCtx::new(order, batch);
        info!("{} 🚀 开始处理", ctx);
        let started = Instant::now();

        let result = self.run(order, &ctx).await;

        info!(
            "{} 结束: {:?} (耗时 {:.1}s)",
            ctx,
            result.status,
            started.elapsed().as_secs_f64()
        );
        Ok(result)
    }
}

fn step_result(field: &PlannedField, resolution: &Resolution) -> StepResult {
    StepResult {
        field: field.key.clone(),
        requested_value: field.value.clone(),
        outcome: resolution.outcome,
        detail: resolution.detail.clone(),
    }
}

fn field_ref(field: &PlannedField) -> FieldRef {
    FieldRef {
        field: field.key.clone(),
        value: field.value.clone(),
    }
}
