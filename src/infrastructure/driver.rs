//! 页面驱动接口 - 基础设施层
//!
//! 会话控制器和选项解析只通过这里的 trait 操作浏览器，
//! CDP 实现见 `browser/`，测试用的内存实现见 `tests/common`。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverResult;
use crate::models::order::PlannedField;

/// 控件形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlShape {
    /// 单选按钮组（label 包着 radio）
    Pill,
    /// 原生下拉框
    Select,
    /// 需要先点开的色块下拉
    SwatchDropdown,
    /// 直接可点的色块
    Swatch,
    /// 文本输入框
    TextInput,
}

/// 页面上的一个候选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    /// 页面脚本分配的序号，激活时用它找回元素
    pub index: usize,
    pub shape: ControlShape,
    pub text: String,
    pub value: Option<String>,
    pub visible: bool,
    pub selected: bool,
    pub control_disabled: bool,
    pub opacity: f64,
    pub pointer_events_none: bool,
    /// 带有 disabled / unavailable / out-of-stock 之类的类名
    pub marker_disabled: bool,
    pub aria_disabled: bool,
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            index: 0,
            shape: ControlShape::Pill,
            text: String::new(),
            value: None,
            visible: true,
            selected: false,
            control_disabled: false,
            opacity: 1.0,
            pointer_events_none: false,
            marker_disabled: false,
            aria_disabled: false,
        }
    }
}

impl Candidate {
    pub fn new(index: usize, shape: ControlShape, text: impl Into<String>) -> Self {
        Self {
            index,
            shape,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// 字段查询条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldQuery {
    /// 字段名，页面脚本用它标记候选元素
    pub key: String,
    /// 依次尝试的字段标题
    pub titles: Vec<String>,
    /// 找不到标题时是否在整页范围内查找单选按钮
    pub global_fallback: bool,
}

impl FieldQuery {
    pub fn for_field(field: &PlannedField) -> Self {
        Self {
            key: field.key.clone(),
            titles: field.labels.clone(),
            global_fallback: field.page_wide,
        }
    }
}

/// 某个字段当前在页面上的样子
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldSnapshot {
    /// 是否找到了带标题的字段容器
    pub container_found: bool,
    /// 容器内的控件形态（整页兜底时为空）
    pub shape: Option<ControlShape>,
    /// 容器本身被禁用
    pub container_disabled: bool,
    pub candidates: Vec<Candidate>,
}

/// 点击加入购物车按钮的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitClick {
    Clicked,
    Disabled,
    Missing,
}

/// 一个可操作的页面
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 轻量存活检查
    async fn probe(&self) -> DriverResult<()>;

    /// 导航并等待 DOM 就绪
    async fn goto(&self, url: &str) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<Option<String>>;

    /// 读取字段的候选项
    async fn snapshot_field(&self, query: &FieldQuery) -> DriverResult<FieldSnapshot>;

    /// 点开两段式下拉；找不到触发器时返回 false
    async fn reveal_field(&self, query: &FieldQuery) -> DriverResult<bool>;

    /// 选中候选项；候选元素已不在页面上时返回 false
    async fn activate(&self, query: &FieldQuery, candidate: &Candidate) -> DriverResult<bool>;

    /// 填写文本输入框
    async fn fill_text(
        &self,
        query: &FieldQuery,
        candidate: &Candidate,
        value: &str,
    ) -> DriverResult<bool>;

    /// 设置购买数量；页面没有数量输入框时返回 false
    async fn set_quantity(&self, quantity: u32) -> DriverResult<bool>;

    async fn click_submit(&self) -> DriverResult<SubmitClick>;
}

pub type PageHandle = Arc<dyn PageDriver>;

/// 一条浏览器控制连接
#[async_trait]
pub trait BrowserLink: Send + Sync {
    /// 默认上下文中的页面
    async fn context_pages(&self) -> DriverResult<Vec<PageHandle>>;

    /// 所有上下文中的页面
    async fn all_pages(&self) -> DriverResult<Vec<PageHandle>>;

    /// 新开一个空白页面
    async fn open_page(&self) -> DriverResult<PageHandle>;

    /// 关闭本连接打开的页面（不关闭浏览器本身）
    async fn close_owned(&self) -> DriverResult<()>;
}

/// 建立浏览器控制连接
#[async_trait]
pub trait BrowserConnector: Send + Sync {
    async fn connect(&self) -> DriverResult<Arc<dyn BrowserLink>>;

    fn endpoint(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OptionField;

    #[test]
    fn test_candidate_defaults_are_enabled_and_visible() {
        let candidate: Candidate = serde_json::from_str(r#"{"index": 3, "text": "LEFT"}"#).unwrap();
        assert_eq!(candidate.index, 3);
        assert!(candidate.visible);
        assert_eq!(candidate.opacity, 1.0);
        assert!(!candidate.control_disabled);
    }

    #[test]
    fn test_snapshot_parses_page_payload() {
        let payload = serde_json::json!({
            "containerFound": true,
            "shape": "swatchDropdown",
            "containerDisabled": false,
            "candidates": [
                { "index": 0, "shape": "swatchDropdown", "text": "Black", "selected": true },
                { "index": 1, "shape": "swatchDropdown", "text": "Red", "opacity": 0.3 }
            ]
        });
        let snapshot: FieldSnapshot = serde_json::from_value(payload).unwrap();
        assert_eq!(snapshot.shape, Some(ControlShape::SwatchDropdown));
        assert_eq!(snapshot.candidates.len(), 2);
        assert!(snapshot.candidates[0].selected);
        assert_eq!(snapshot.candidates[1].opacity, 0.3);
    }

    #[test]
    fn test_only_pill_groups_search_page_wide() {
        let hand = FieldQuery::for_field(&PlannedField::known(OptionField::Hand, "LEFT"));
        assert!(hand.global_fallback);
        assert_eq!(hand.titles, vec!["Hand".to_string()]);

        let color = FieldQuery::for_field(&PlannedField::known(OptionField::PutterColor, "Red"));
        assert!(!color.global_fallback);
        let custom = FieldQuery::for_field(&PlannedField::custom("gripColor", "Black"));
        assert!(!custom.global_fallback);
    }

    #[test]
    fn test_submit_click_parses_lowercase() {
        let click: SubmitClick = serde_json::from_str("\"disabled\"").unwrap();
        assert_eq!(click, SubmitClick::Disabled);
    }
}
