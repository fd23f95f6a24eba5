use crate::models::order::OrderSpec;
use crate::models::product::{CatalogEntry, StaticCatalog};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct OrdersFile {
    #[serde(default)]
    orders: Vec<OrderSpec>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<CatalogEntry>,
}

/// 解析 `[[orders]]` 列表
pub fn parse_orders(content: &str) -> Result<Vec<OrderSpec>> {
    let file: OrdersFile = toml::from_str(content).context("无法解析订单内容")?;
    Ok(file.orders)
}

/// 从 TOML 文件加载订单列表
pub async fn load_orders(path: &Path) -> Result<Vec<OrderSpec>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取订单文件: {}", path.display()))?;

    let orders = parse_orders(&content)
        .with_context(|| format!("无法解析订单文件: {}", path.display()))?;

    for (i, order) in orders.iter().enumerate() {
        if order.product.trim().is_empty() {
            anyhow::bail!("订单文件 {} 第 {} 个订单缺少商品名", path.display(), i + 1);
        }
    }

    Ok(orders)
}

/// 从 TOML 文件加载商品目录，并叠加在内置目录之上
pub async fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取商品目录文件: {}", path.display()))?;

    let file: CatalogFile = toml::from_str(&content)
        .with_context(|| format!("无法解析商品目录文件: {}", path.display()))?;

    tracing::info!("从 {} 加载了 {} 个自定义商品", path.display(), file.products.len());

    Ok(StaticCatalog::builtin().with_entries(file.products))
}
