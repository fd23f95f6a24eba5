//! 商品系列与商品目录

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::models::order::OptionField;

/// 商品系列
///
/// 决定字段的解析顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductFamily {
    #[serde(rename = "oz1i-hs")]
    Oz1iHs,
    #[serde(rename = "oz1i")]
    Oz1i,
    #[serde(rename = "oz1")]
    Oz1,
    #[serde(rename = "mezz1-max")]
    Mezz1Max,
    #[serde(rename = "mezz1")]
    Mezz1,
    #[serde(rename = "link1")]
    Link1,
    #[serde(rename = "df3")]
    Df3,
    #[serde(rename = "df3i")]
    Df3i,
    #[serde(rename = "df21")]
    Df21,
}

use OptionField::*;

const OZ1I_HS_ORDER: &[OptionField] = &[
    Hand,
    PuttingStyle,
    HeadWeight,
    Shaft,
    ShaftLength,
    ShaftLean,
    GripSelection,
    Riser,
    LieAngle,
    PutterColor,
    Insert,
    AlignmentFront,
    AlignmentBack,
    Headcover,
    BuildTime,
    PlayerName,
];

const MEZZ1_MAX_ORDER: &[OptionField] = &[
    Hand,
    PuttingStyle,
    HeadWeight,
    Shaft,
    ShaftLength,
    LieAngle,
    PutterColor,
    AlignmentMark,
    GripSelection,
    Headcover,
    BuildTime,
    PlayerName,
];

const DEFAULT_ORDER: &[OptionField] = &[
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
];

impl ProductFamily {
    /// 系列代码
    pub fn code(self) -> &'static str {
        match self {
            ProductFamily::Oz1iHs => "oz1i-hs",
            ProductFamily::Oz1i => "oz1i",
            ProductFamily::Oz1 => "oz1",
            ProductFamily::Mezz1Max => "mezz1-max",
            ProductFamily::Mezz1 => "mezz1",
            ProductFamily::Link1 => "link1",
            ProductFamily::Df3 => "df3",
            ProductFamily::Df3i => "df3i",
            ProductFamily::Df21 => "df21",
        }
    }

    /// 从系列代码解析
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "oz1i-hs" => Some(ProductFamily::Oz1iHs),
            "oz1i" => Some(ProductFamily::Oz1i),
            "oz1" => Some(ProductFamily::Oz1),
            "mezz1-max" => Some(ProductFamily::Mezz1Max),
            "mezz1" => Some(ProductFamily::Mezz1),
            "link1" => Some(ProductFamily::Link1),
            "df3" => Some(ProductFamily::Df3),
            "df3i" => Some(ProductFamily::Df3i),
            "df21" => Some(ProductFamily::Df21),
            _ => None,
        }
    }

    /// 从商品名推断系列（无法识别时归为 oz1i-hs）
    pub fn detect(product: &str) -> Self {
        let name = product.to_lowercase();
        let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();

        if compact.contains("oz.1i") || compact.contains("oz1i") {
            if compact.contains("hs") {
                ProductFamily::Oz1iHs
            } else {
                ProductFamily::Oz1i
            }
        } else if compact.contains("oz.1") || compact.contains("oz1") {
            ProductFamily::Oz1
        } else if compact.contains("mezz") {
            if compact.contains("max") {
                ProductFamily::Mezz1Max
            } else {
                ProductFamily::Mezz1
            }
        } else if compact.contains("link") {
            ProductFamily::Link1
        } else if compact.contains("df3i") {
            ProductFamily::Df3i
        } else if compact.contains("df3") {
            ProductFamily::Df3
        } else if compact.contains("df2.1") || compact.contains("df21") {
            ProductFamily::Df21
        } else {
            ProductFamily::Oz1iHs
        }
    }

    /// 字段解析顺序
    pub fn field_order(self) -> &'static [OptionField] {
        match self {
            ProductFamily::Oz1iHs => OZ1I_HS_ORDER,
            ProductFamily::Mezz1Max => MEZZ1_MAX_ORDER,
            _ => DEFAULT_ORDER,
        }
    }
}

/// 内置的批发站商品页面
static BUILTIN_PRODUCTS: phf::Map<&'static str, &'static str> = phf_map! {
    "OZ.1i - CUSTOM" => "https://wholesale.labgolf.com/products/oz1i-custom",
    "OZ.1i HS - CUSTOM" => "https://wholesale.labgolf.com/products/oz1i-hs-custom",
    "OZ.1 - CUSTOM" => "https://wholesale.labgolf.com/products/oz1-custom",
    "MEZZ.1 MAX Custom" => "https://wholesale.labgolf.com/products/mezz-1-max-custom",
    "MEZZ.1 Custom" => "https://wholesale.labgolf.com/products/mezz1",
    "LINK.1 Custom" => "https://wholesale.labgolf.com/products/link-1-custom",
    "DF3 CUSTOM" => "https://wholesale.labgolf.com/products/df3-custom",
    "DF 2.1 CUSTOM" => "https://wholesale.labgolf.com/products/custom-df21",
    "DF3i CUSTOM" => "https://wholesale.labgolf.com/products/df3i-custom",
};

/// 商品页面目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTarget {
    pub name: String,
    pub url: String,
    pub family: ProductFamily,
}

/// 商品名 → 页面地址 + 系列
pub trait ProductCatalog: Send + Sync {
    fn resolve(&self, product: &str) -> Option<ProductTarget>;
}

/// 目录条目（也是 TOML 目录文件中的 `[[products]]`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub family: Option<ProductFamily>,
}

/// 静态商品目录
///
/// 自定义条目优先于内置条目。
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    /// 只包含内置条目
    pub fn builtin() -> Self {
        let mut entries: Vec<CatalogEntry> = BUILTIN_PRODUCTS
            .entries()
            .map(|(name, url)| CatalogEntry {
                name: name.to_string(),
                url: url.to_string(),
                family: None,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// 空目录
    pub fn empty() -> Self {
        Self::default()
    }

    /// 追加自定义条目（同名覆盖已有条目）
    pub fn with_entries(mut self, extra: Vec<CatalogEntry>) -> Self {
        for entry in extra.into_iter().rev() {
            self.entries
                .retain(|e| !e.name.eq_ignore_ascii_case(&entry.name));
            self.entries.insert(0, entry);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn target(entry: &CatalogEntry, product: &str) -> ProductTarget {
        ProductTarget {
            name: entry.name.clone(),
            url: entry.url.clone(),
            family: entry
                .family
                .unwrap_or_else(|| ProductFamily::detect(product)),
        }
    }
}

impl ProductCatalog for StaticCatalog {
    fn resolve(&self, product: &str) -> Option<ProductTarget> {
        let product = product.trim();
        if product.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.name == product) {
            return Some(Self::target(entry, product));
        }

        // 部分匹配：取最长的命中项，避免 "OZ.1i" 抢走 "OZ.1i HS"
        let wanted = product.to_lowercase();
        self.entries
            .iter()
            .filter_map(|e| {
                let key = strip_custom_suffix(&e.name);
                (!key.is_empty() && wanted.contains(&key)).then_some((key.len(), e))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, entry)| Self::target(entry, product))
    }
}

fn strip_custom_suffix(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_suffix(" - custom")
        .or_else(|| lower.strip_suffix(" custom"))
        .unwrap_or(&lower)
        .trim()
        .to_string()
}
