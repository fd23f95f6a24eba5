//! 错误类型
//!
//! 字段级的结果（未找到 / 已禁用）是值，不是错误，见 `models::result::StepOutcome`。
//! 这里只放真正会通过 `Result` 向上传播的错误。

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面驱动错误
    #[error("页面驱动错误: {0}")]
    Driver(#[from] DriverError),
    /// 会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 订单流水线错误
    #[error("订单流程错误: {0}")]
    Pipeline(#[from] PipelineError),
    /// 批处理错误
    #[error("批处理错误: {0}")]
    Batch(#[from] BatchError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 页面驱动错误
///
/// 远程页面返回的错误按"句柄是否还能用"分类，
/// 会话控制器只把 `Detached` 当作页面死亡。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// 页面 / 连接已经关闭
    #[error("页面句柄已失效: {0}")]
    Detached(String),
    /// 页面正在导航，执行上下文被替换
    #[error("页面正在导航: {0}")]
    Navigating(String),
    /// 等待超时
    #[error("操作超时: {0}")]
    Timeout(String),
    /// 页面脚本抛出异常或返回了无法解析的结果
    #[error("脚本执行失败: {0}")]
    Script(String),
    /// 其他协议层错误
    #[error("协议错误: {0}")]
    Protocol(String),
}

const NAVIGATING_MARKERS: &[&str] = &[
    "execution context was destroyed",
    "cannot find context with specified id",
    "inspected target navigated",
];

const DETACHED_MARKERS: &[&str] = &[
    "alreadyclosed",
    "already closed",
    "connectionclosed",
    "connection closed",
    "no target with given id",
    "target closed",
    "target crashed",
    "session with given id not found",
    "no such session",
    "channel closed",
    "browser closed",
    "not attached",
    "websocket",
];

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];

const SCRIPT_MARKERS: &[&str] = &["javascript", "exception", "evaluation"];

impl DriverError {
    /// 根据错误消息文本分类
    ///
    /// CDP 错误只能通过消息文本区分，顺序有意义：导航优先于失效判断。
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let hit = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

        if hit(NAVIGATING_MARKERS) {
            DriverError::Navigating(message)
        } else if hit(DETACHED_MARKERS) {
            DriverError::Detached(message)
        } else if hit(TIMEOUT_MARKERS) {
            DriverError::Timeout(message)
        } else if hit(SCRIPT_MARKERS) {
            DriverError::Script(message)
        } else {
            DriverError::Protocol(message)
        }
    }

    /// 是否表示句柄已失效
    pub fn is_dead_handle(&self) -> bool {
        matches!(self, DriverError::Detached(_))
    }
}

impl From<CdpError> for DriverError {
    fn from(err: CdpError) -> Self {
        match err {
            // 连接断开时的通道错误，消息文本里不带任何失效标记
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                DriverError::Detached(err.to_string())
            }
            other => DriverError::classify(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Script(format!("无法解析页面返回值: {}", err))
    }
}

/// 会话错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// 三级恢复全部失败
    #[error("浏览器控制通道不可达: {0}")]
    Unreachable(String),
}

/// 订单流水线错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// 同一控制器上已有订单在执行
    #[error("已有订单正在执行，拒绝并发执行")]
    OrderInFlight,
}

/// 批处理错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    /// 已有批次在运行
    #[error("已有批次正在运行")]
    AlreadyRunning,
    /// 没有正在运行的批次
    #[error("没有正在运行的批次")]
    NotRunning,
    /// 没有可以继续的批次
    #[error("没有可以继续的批次")]
    NothingToResume,
}

/// 配置错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建会话不可达错误
    pub fn unreachable(reason: impl Into<String>) -> Self {
        AppError::Session(SessionError::Unreachable(reason.into()))
    }

    /// 创建配置值不合法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

impl From<CdpError> for AppError {
    fn from(err: CdpError) -> Self {
        AppError::Driver(err.into())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 页面驱动结果类型
pub type DriverResult<T> = Result<T, DriverError>;
