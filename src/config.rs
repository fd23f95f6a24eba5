use std::time::Duration;

use crate::error::ConfigError;
use crate::orchestrator::BatchConfig;
use crate::services::ResolverConfig;
use crate::session::SessionConfig;
use crate::workflow::PipelineConfig;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试地址
    pub browser_debug_host: String,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 待执行订单文件（TOML）
    pub orders_file: String,
    /// 额外的商品目录文件（TOML，可选）
    pub catalog_file: Option<String>,
    /// 批处理报告文件
    pub report_file: String,
    /// 只选择选项，不点击加入购物车
    pub dry_run: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 各阶段等待时间（毫秒） ---
    pub navigation_settle_ms: u64,
    pub reveal_settle_ms: u64,
    pub inter_order_delay_ms: u64,
    // --- 会话恢复 ---
    pub probe_timeout_ms: u64,
    pub recovery_wait_ms: u64,
    pub recovery_poll_ms: u64,
    pub connect_timeout_ms: u64,
    // --- 提交 ---
    pub submit_ready_timeout_ms: u64,
    pub submit_navigation_timeout_ms: u64,
    pub submit_fallback_wait_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_host: "localhost".to_string(),
            browser_debug_port: 9222,
            orders_file: "orders.toml".to_string(),
            catalog_file: None,
            report_file: "batch_report.txt".to_string(),
            dry_run: false,
            verbose_logging: false,
            navigation_settle_ms: 3000,
            reveal_settle_ms: 500,
            inter_order_delay_ms: 1000,
            probe_timeout_ms: 2000,
            recovery_wait_ms: 3000,
            recovery_poll_ms: 100,
            connect_timeout_ms: 10_000,
            submit_ready_timeout_ms: 5000,
            submit_navigation_timeout_ms: 10_000,
            submit_fallback_wait_ms: 2000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_host: std::env::var("BROWSER_DEBUG_HOST").unwrap_or(default.browser_debug_host),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            orders_file: std::env::var("ORDERS_FILE").unwrap_or(default.orders_file),
            catalog_file: std::env::var("CATALOG_FILE").ok().filter(|v| !v.trim().is_empty()),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            dry_run: std::env::var("DRY_RUN").ok().and_then(|v| v.parse().ok()).unwrap_or(default.dry_run),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            navigation_settle_ms: env_u64("NAVIGATION_SETTLE_MS", default.navigation_settle_ms),
            reveal_settle_ms: env_u64("REVEAL_SETTLE_MS", default.reveal_settle_ms),
            inter_order_delay_ms: env_u64("INTER_ORDER_DELAY_MS", default.inter_order_delay_ms),
            probe_timeout_ms: env_u64("PROBE_TIMEOUT_MS", default.probe_timeout_ms),
            recovery_wait_ms: env_u64("RECOVERY_WAIT_MS", default.recovery_wait_ms),
            recovery_poll_ms: env_u64("RECOVERY_POLL_MS", default.recovery_poll_ms),
            connect_timeout_ms: env_u64("CONNECT_TIMEOUT_MS", default.connect_timeout_ms),
            submit_ready_timeout_ms: env_u64("SUBMIT_READY_TIMEOUT_MS", default.submit_ready_timeout_ms),
            submit_navigation_timeout_ms: env_u64("SUBMIT_NAVIGATION_TIMEOUT_MS", default.submit_navigation_timeout_ms),
            submit_fallback_wait_ms: env_u64("SUBMIT_FALLBACK_WAIT_MS", default.submit_fallback_wait_ms),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser_debug_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser_debug_port".to_string(),
                reason: "端口不能为 0".to_string(),
            });
        }
        if self.recovery_poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recovery_poll_ms".to_string(),
                reason: "轮询间隔必须大于 0".to_string(),
            });
        }
        if self.recovery_poll_ms > self.recovery_wait_ms {
            return Err(ConfigError::InvalidValue {
                field: "recovery_poll_ms".to_string(),
                reason: format!(
                    "轮询间隔 {}ms 大于等待上限 {}ms",
                    self.recovery_poll_ms, self.recovery_wait_ms
                ),
            });
        }
        Ok(())
    }

    /// 浏览器远程调试端点
    pub fn browser_endpoint(&self) -> String {
        format!("http://{}:{}", self.browser_debug_host, self.browser_debug_port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            recovery_wait_ceiling: Duration::from_millis(self.recovery_wait_ms),
            recovery_poll_interval: Duration::from_millis(self.recovery_poll_ms),
            tier_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            reveal_settle: Duration::from_millis(self.reveal_settle_ms),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            navigation_settle: Duration::from_millis(self.navigation_settle_ms),
            submit_ready_timeout: Duration::from_millis(self.submit_ready_timeout_ms),
            submit_navigation_timeout: Duration::from_millis(self.submit_navigation_timeout_ms),
            submit_fallback_wait: Duration::from_millis(self.submit_fallback_wait_ms),
            poll_interval: Duration::from_millis(200),
            dry_run: self.dry_run,
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            inter_order_delay: Duration::from_millis(self.inter_order_delay_ms),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
