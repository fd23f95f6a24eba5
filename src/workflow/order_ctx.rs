//! 订单处理上下文
//!
//! 封装"我正在处理批次中的第几个订单"这一信息

use std::fmt::Display;

use crate::models::order::OrderSpec;
use crate::models::status::BatchProgress;

#[derive(Debug, Clone)]
pub struct OrderCtx {
    /// 订单标识（仅用于日志显示）
    pub label: String,

    /// 所在批次的进度，单独执行时为空
    pub batch: Option<BatchProgress>,
}

impl OrderCtx {
    pub fn new(order: &OrderSpec, batch: Option<BatchProgress>) -> Self {
        Self {
            label: order.label(),
            batch,
        }
    }
}

impl Display for OrderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.batch {
            Some(batch) => write!(f, "[订单 {}/{} {}]", batch.current, batch.total, self.label),
            None => write!(f, "[订单 {}]", self.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_batch() {
        let order = OrderSpec::new("DF3 CUSTOM").with_order_id("W-7");
        assert_eq!(OrderCtx::new(&order, None).to_string(), "[订单 W-7 DF3 CUSTOM]");

        let batch = BatchProgress {
            current: 2,
            total: 5,
            order_id: order.order_id.clone(),
            product: order.product.clone(),
            results: Vec::new(),
        };
        assert_eq!(
            OrderCtx::new(&order, Some(batch)).to_string(),
            "[订单 2/5 W-7 DF3 CUSTOM]"
        );
    }
}
