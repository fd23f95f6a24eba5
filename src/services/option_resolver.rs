//! 选项解析服务 - 业务能力层
//!
//! 把"字段 = 值"落到页面上，只处理单个字段，不关心字段顺序。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::DriverResult;
use crate::infrastructure::{ControlShape, FieldQuery, FieldSnapshot, PageDriver};
use crate::models::order::PlannedField;
use crate::models::result::StepOutcome;
use crate::services::matcher::{is_disabled, match_candidate, MatchOutcome, MatchRule};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// 点开两段式下拉后等待选项渲染的时间
    pub reveal_settle: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            reveal_settle: Duration::from_millis(500),
        }
    }
}

/// 单个字段的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: StepOutcome,
    /// 命中的选项文本，或失败原因
    pub detail: Option<String>,
}

impl Resolution {
    fn new(outcome: StepOutcome, detail: impl Into<String>) -> Self {
        Self {
            outcome,
            detail: Some(detail.into()),
        }
    }
}

/// 选项解析服务
///
/// 对已经是目标值的字段不产生任何点击，重复调用是安全的。
pub struct OptionResolver {
    config: ResolverConfig,
}

impl OptionResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// 把字段设置为期望值
    ///
    /// 页面层面的错误通过 `Err` 返回，由调用方决定是否重试。
    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        field: &PlannedField,
    ) -> DriverResult<Resolution> {
        let query = FieldQuery::for_field(field);
        let snapshot = page.snapshot_field(&query).await?;
        debug!(
            "字段 {} 快照: 容器={} 形态={:?} 候选={}",
            field.display_name(),
            snapshot.container_found,
            snapshot.shape,
            snapshot.candidates.len()
        );

        match snapshot.shape {
            Some(ControlShape::SwatchDropdown) => {
                self.resolve_dropdown(page, &query, field, snapshot).await
            }
            Some(ControlShape::TextInput) => self.resolve_text(page, &query, field, &snapshot).await,
            _ if snapshot.candidates.is_empty() => Ok(Resolution::new(
                StepOutcome::NotFound,
                if snapshot.container_found {
                    "字段中没有可选项"
                } else {
                    "页面上找不到该字段"
                },
            )),
            _ => self.select(page, &query, field, &snapshot).await,
        }
    }

    /// 两段式下拉：先点开，等待，再重新读取选项
    async fn resolve_dropdown(
        &self,
        page: &dyn PageDriver,
        query: &FieldQuery,
        field: &PlannedField,
        closed: FieldSnapshot,
    ) -> DriverResult<Resolution> {
        // 收起时只有当前值可见，宽松规则命中时仍要展开比较
        if let MatchOutcome::Matched { position, rule } =
            match_candidate(&closed.candidates, &field.value)
        {
            let candidate = &closed.candidates[position];
            if matches!(rule, MatchRule::Exact | MatchRule::Normalized)
                && candidate.selected
                && !is_disabled(candidate, closed.container_disabled)
            {
                return Ok(Resolution::new(StepOutcome::AlreadyApplied, candidate.text.clone()));
            }
        }

        if !page.reveal_field(query).await? {
            return Ok(Resolution::new(StepOutcome::NotFound, "找不到下拉触发器"));
        }
        sleep(self.config.reveal_settle).await;

        let opened = page.snapshot_field(query).await?;
        if !opened.container_found {
            return Ok(Resolution::new(StepOutcome::NotFound, "展开后字段消失"));
        }
        self.select(page, query, field, &opened).await
    }

    async fn resolve_text(
        &self,
        page: &dyn PageDriver,
        query: &FieldQuery,
        field: &PlannedField,
        snapshot: &FieldSnapshot,
    ) -> DriverResult<Resolution> {
        let Some(input) = snapshot.candidates.first() else {
            return Ok(Resolution::new(StepOutcome::NotFound, "找不到输入框"));
        };
        if is_disabled(input, snapshot.container_disabled) {
            return Ok(Resolution::new(StepOutcome::Disabled, "输入框不可编辑"));
        }
        if input.value.as_deref().map(str::trim) == Some(field.value.as_str()) {
            return Ok(Resolution::new(StepOutcome::AlreadyApplied, field.value.clone()));
        }
        if page.fill_text(query, input, &field.value).await? {
            info!("  ✓ {}: 已填写 {}", field.display_name(), field.value);
            Ok(Resolution::new(StepOutcome::Applied, field.value.clone()))
        } else {
            Ok(Resolution::new(StepOutcome::TransientError, "输入框已从页面消失"))
        }
    }

    async fn select(
        &self,
        page: &dyn PageDriver,
        query: &FieldQuery,
        field: &PlannedField,
        snapshot: &FieldSnapshot,
    ) -> DriverResult<Resolution> {
        let (position, rule) = match match_candidate(&snapshot.candidates, &field.value) {
            MatchOutcome::Matched { position, rule } => (position, rule),
            MatchOutcome::NoMatch => {
                let available: Vec<&str> = snapshot
                    .candidates
                    .iter()
                    .filter(|c| c.visible && !c.text.is_empty())
                    .map(|c| c.text.as_str())
                    .collect();
                debug!("字段 {} 可见选项: {:?}", field.display_name(), available);
                return Ok(Resolution::new(
                    StepOutcome::NotFound,
                    format!("没有匹配 \"{}\" 的选项", field.value),
                ));
            }
        };

        let candidate = &snapshot.candidates[position];
        // 没有找到字段标题时，候选项来自整页
        let detail = if snapshot.container_found {
            candidate.text.clone()
        } else {
            debug!("  {}: 未找到字段标题，使用整页匹配", field.display_name());
            format!("{} (整页匹配)", candidate.text)
        };
        if is_disabled(candidate, snapshot.container_disabled) {
            warn!(
                "  ⚠️ {}: 选项 \"{}\" 不可选",
                field.display_name(),
                candidate.text
            );
            return Ok(Resolution::new(StepOutcome::Disabled, detail));
        }

        if candidate.selected {
            debug!("  {}: \"{}\" 已是当前值", field.display_name(), candidate.text);
            return Ok(Resolution::new(StepOutcome::AlreadyApplied, detail));
        }

        if page.activate(query, candidate).await? {
            info!(
                "  ✓ {}: {} ({:?})",
                field.display_name(),
                candidate.text,
                rule
            );
            Ok(Resolution::new(StepOutcome::Applied, detail))
        } else {
            Ok(Resolution::new(
                StepOutcome::TransientError,
                "选项元素已从页面消失",
            ))
        }
    }
}

impl Default for OptionResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
