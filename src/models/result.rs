use serde::{Deserialize, Serialize};

use crate::models::order::OrderSpec;

/// 单个字段的解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// 已点击 / 填写
    Applied,
    /// 页面上已是该值，没有任何操作
    AlreadyApplied,
    /// 字段或选项不存在
    NotFound,
    /// 选项存在但不可选
    Disabled,
    /// 页面状态瞬时异常（导航中、元素失效）
    TransientError,
}

impl StepOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, StepOutcome::Applied | StepOutcome::AlreadyApplied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub field: String,
    pub requested_value: String,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 订单终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Completed,
    OptionFailure,
    DisabledOptionFailure,
    FatalError,
}

/// 加入购物车的确认程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitOutcome {
    /// 页面已跳转到购物车
    Confirmed,
    /// 点击了按钮但没有观察到跳转
    Provisional,
    /// 试运行，没有点击
    Skipped,
}

/// 字段名 + 期望值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub field: String,
    pub value: String,
}

/// 一个订单的执行结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub order: OrderSpec,
    pub status: ExecutionStatus,
    pub message: String,
    pub steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_fields: Vec<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_field: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmitOutcome>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

/// 批处理中单个订单的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    /// 在批次中的位置（从 0 开始）
    pub index: usize,
    pub order: OrderSpec,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
}

impl BatchEntry {
    pub fn from_result(index: usize, result: ExecutionResult) -> Self {
        Self {
            index,
            success: result.is_success(),
            message: result.message,
            status: Some(result.status),
            order: result.order,
        }
    }

    /// 执行器本身出错时的记录
    pub fn failed(index: usize, order: OrderSpec, message: impl Into<String>) -> Self {
        Self {
            index,
            order,
            success: false,
            message: message.into(),
            status: None,
        }
    }
}
