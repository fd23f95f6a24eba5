//! 订单规格
//!
//! `OrderSpec` 由外部解析层构造，进入核心后不再修改。

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::product::ProductFamily;

/// 表示"保持页面默认值"的占位值
pub const UNTOUCHED_PLACEHOLDER: &str = "-";

/// 一个订单的意图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    /// 外部订单号（仅用于日志和报告）
    #[serde(default)]
    pub order_id: Option<String>,
    /// 商品名，用于查找目标页面
    pub product: String,
    /// 数量
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// 选项字段（camelCase 字段名 → 值；`None` 表示不动该字段）
    #[serde(default)]
    pub options: BTreeMap<String, Option<String>>,
}

fn default_quantity() -> u32 {
    1
}

impl OrderSpec {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            order_id: None,
            product: product.into(),
            quantity: 1,
            options: BTreeMap::new(),
        }
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    pub fn with_option(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(field.into(), Some(value.into()));
        self
    }

    /// 显式声明某字段保持页面默认值
    pub fn without_option(mut self, field: impl Into<String>) -> Self {
        self.options.insert(field.into(), None);
        self
    }

    /// 取字段的有效值（空值和占位值视为未设置）
    pub fn option(&self, field: &str) -> Option<&str> {
        self.options
            .get(field)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != UNTOUCHED_PLACEHOLDER)
    }

    /// 用于日志的订单标识
    pub fn label(&self) -> String {
        match &self.order_id {
            Some(id) => format!("{} {}", id, self.product),
            None => self.product.clone(),
        }
    }

    /// 按商品系列给出字段的解析顺序
    ///
    /// 已知字段按系列顺序排列，系列顺序里没有的已知字段随后，
    /// 未知字段按名称排在最后；未设置的字段不会出现在计划中。
    pub fn plan(&self, family: ProductFamily) -> Vec<PlannedField> {
        let order = family.field_order();
        let has_mark = self.option(OptionField::AlignmentMark.key()).is_some();
        let mut seen: Vec<OptionField> = Vec::new();
        let mut planned = Vec::new();

        let mut push = |field: OptionField, planned: &mut Vec<PlannedField>| {
            if seen.contains(&field) {
                return;
            }
            seen.push(field);
            if let Some(value) = self.option(field.key()) {
                planned.push(PlannedField::known(field, value));
            }
        };

        for field in order {
            let field = match field {
                OptionField::AlignmentFront | OptionField::AlignmentBack if has_mark => {
                    // 该系列没有统一的 Alignment 字段时，由前标记位置承接
                    if *field == OptionField::AlignmentFront
                        && !order.contains(&OptionField::AlignmentMark)
                    {
                        OptionField::AlignmentMark
                    } else {
                        continue;
                    }
                }
                other => *other,
            };
            push(field, &mut planned);
        }

        for field in OptionField::ALL {
            if has_mark
                && matches!(field, OptionField::AlignmentFront | OptionField::AlignmentBack)
            {
                continue;
            }
            push(field, &mut planned);
        }

        for key in self.options.keys() {
            if OptionField::from_key(key).is_some() {
                continue;
            }
            if let Some(value) = self.option(key) {
                planned.push(PlannedField::custom(key, value));
            }
        }

        planned
    }
}

/// 已知的选项字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionField {
    Hand,
    PuttingStyle,
    HeadWeight,
    Shaft,
    ShaftLength,
    ShaftLean,
    LieAngle,
    Riser,
    PutterColor,
    Insert,
    AlignmentMark,
    AlignmentFront,
    AlignmentBack,
    GripSelection,
    Headcover,
    BuildTime,
    PlayerName,
}

impl OptionField {
    pub const ALL: [OptionField; 17] = [
        OptionField::Hand,
        OptionField::PuttingStyle,
        OptionField::HeadWeight,
        OptionField::Shaft,
        OptionField::ShaftLength,
        OptionField::ShaftLean,
        OptionField::LieAngle,
        OptionField::Riser,
        OptionField::PutterColor,
        OptionField::Insert,
        OptionField::AlignmentMark,
        OptionField::AlignmentFront,
        OptionField::AlignmentBack,
        OptionField::GripSelection,
        OptionField::Headcover,
        OptionField::BuildTime,
        OptionField::PlayerName,
    ];

    /// 订单数据中的字段名
    pub fn key(self) -> &'static str {
        match self {
            OptionField::Hand => "hand",
            OptionField::PuttingStyle => "puttingStyle",
            OptionField::HeadWeight => "headWeight",
            OptionField::Shaft => "shaft",
            OptionField::ShaftLength => "shaftLength",
            OptionField::ShaftLean => "shaftLean",
            OptionField::LieAngle => "lieAngle",
            OptionField::Riser => "riser",
            OptionField::PutterColor => "putterColor",
            OptionField::Insert => "insert",
            OptionField::AlignmentMark => "alignmentMark",
            OptionField::AlignmentFront => "alignmentFront",
            OptionField::AlignmentBack => "alignmentBack",
            OptionField::GripSelection => "gripSelection",
            OptionField::Headcover => "headcover",
            OptionField::BuildTime => "buildTime",
            OptionField::PlayerName => "playerName",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// 页面上可能出现的字段标题，按顺序尝试
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            OptionField::Hand => &["Hand"],
            OptionField::PuttingStyle => &["Putting style"],
            OptionField::HeadWeight => &["Head weight"],
            OptionField::Shaft => &["Shaft"],
            OptionField::ShaftLength => &["Shaft length"],
            OptionField::ShaftLean => &["Shaft lean"],
            OptionField::LieAngle => &["Lie angle"],
            OptionField::Riser => &["Riser"],
            OptionField::PutterColor => &["Putter color", "Color"],
            OptionField::Insert => &["Insert"],
            OptionField::AlignmentMark => &["Alignment mark", "Alignment"],
            OptionField::AlignmentFront => &["Alignment Mark Front", "Alignment"],
            OptionField::AlignmentBack => &["Alignment Mark Back"],
            OptionField::GripSelection => &["Grip selection", "Grip"],
            OptionField::Headcover => &["Headcover selection", "Headcover"],
            OptionField::BuildTime => &["Putter build time", "Build time"],
            OptionField::PlayerName => &["Player name"],
        }
    }

    /// 始终渲染为单选按钮组的字段
    ///
    /// 只有这些字段在找不到标题时允许整页查找。
    pub fn is_pill_group(self) -> bool {
        matches!(
            self,
            OptionField::Hand | OptionField::PuttingStyle | OptionField::HeadWeight
        )
    }

    /// 选中后等待页面渲染下游字段的时间
    pub fn settle(self) -> Duration {
        match self {
            OptionField::Hand
            | OptionField::PuttingStyle
            | OptionField::HeadWeight
            | OptionField::BuildTime
            | OptionField::PlayerName => Duration::from_millis(300),
            OptionField::Shaft => Duration::from_millis(1000),
            // Grip selection 要等 Shaft lean 选完才会出现
            OptionField::ShaftLean => Duration::from_millis(2000),
            _ => DEFAULT_SETTLE,
        }
    }
}

/// 默认的字段等待时间
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// 计划中的单个字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedField {
    /// 字段名（camelCase）
    pub key: String,
    /// 页面标题族
    pub labels: Vec<String>,
    /// 期望值
    pub value: String,
    /// 选中后的等待时间
    pub settle: Duration,
    /// 找不到标题时是否允许整页查找
    pub page_wide: bool,
}

impl PlannedField {
    pub fn known(field: OptionField, value: &str) -> Self {
        Self {
            key: field.key().to_string(),
            labels: field.labels().iter().map(|l| l.to_string()).collect(),
            value: value.to_string(),
            settle: field.settle(),
            page_wide: field.is_pill_group(),
        }
    }

    pub fn custom(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            labels: vec![humanize_key(key)],
            value: value.to_string(),
            settle: DEFAULT_SETTLE,
            page_wide: false,
        }
    }

    /// 用于日志和报告的字段名
    pub fn display_name(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.key)
    }
}

/// `gripColor` → `Grip color`
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            out.extend(ch.to_uppercase());
        } else if ch.is_uppercase() {
            out.push(' ');
            out.extend(ch.to_lowercase());
        } else if ch == '_' {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}
