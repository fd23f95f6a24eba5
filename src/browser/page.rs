//! `PageDriver` 的 CDP 实现

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::infrastructure::{
    Candidate, FieldQuery, FieldSnapshot, JsExecutor, PageDriver, SubmitClick,
};

pub struct CdpPage {
    executor: JsExecutor,
}

impl CdpPage {
    pub fn new(page: chromiumoxide::Page) -> Self {
        Self {
            executor: JsExecutor::new(page),
        }
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn probe(&self) -> DriverResult<()> {
        let alive: bool = self.executor.eval_as("true").await?;
        if alive {
            Ok(())
        } else {
            Err(DriverError::Script("存活检查返回了意外的值".to_string()))
        }
    }

    async fn goto(&self, url: &str) -> DriverResult<()> {
        debug!("导航到: {}", url);
        self.executor.page().goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<Option<String>> {
        Ok(self.executor.page().url().await?)
    }

    async fn snapshot_field(&self, query: &FieldQuery) -> DriverResult<FieldSnapshot> {
        self.executor.call("snapshot", query).await
    }

    async fn reveal_field(&self, query: &FieldQuery) -> DriverResult<bool> {
        self.executor.call("reveal", query).await
    }

    async fn activate(&self, query: &FieldQuery, candidate: &Candidate) -> DriverResult<bool> {
        self.executor
            .call("activate", &json!({ "key": query.key, "index": candidate.index }))
            .await
    }

    async fn fill_text(
        &self,
        query: &FieldQuery,
        candidate: &Candidate,
        value: &str,
    ) -> DriverResult<bool> {
        self.executor
            .call(
                "fill",
                &json!({ "key": query.key, "index": candidate.index, "value": value }),
            )
            .await
    }

    async fn set_quantity(&self, quantity: u32) -> DriverResult<bool> {
        self.executor
            .call("quantity", &json!({ "quantity": quantity }))
            .await
    }

    async fn click_submit(&self) -> DriverResult<SubmitClick> {
        self.executor.call("submit", &json!({})).await
    }
}
