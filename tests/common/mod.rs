//! 测试用的内存页面、连接和执行器
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use auto_order::error::{DriverError, DriverResult, PipelineError};
use auto_order::infrastructure::{
    BrowserConnector, BrowserLink, Candidate, ControlShape, FieldQuery, FieldSnapshot, PageDriver,
    PageHandle, SubmitClick,
};
use auto_order::models::{
    BatchProgress, ExecutionResult, ExecutionStatus, OrderSpec, StatusUpdate,
};
use auto_order::orchestrator::BatchCoordinator;
use auto_order::services::StatusSink;
use auto_order::workflow::OrderExecutor;

// ========== 页面 ==========

#[derive(Debug, Clone)]
pub struct FakeOption {
    pub text: String,
    pub value: Option<String>,
    pub selected: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone)]
pub struct FakeField {
    pub title: String,
    pub shape: ControlShape,
    pub options: Vec<FakeOption>,
    pub container_disabled: bool,
    /// 文本框当前值
    pub text_value: String,
}

impl FakeField {
    fn with_options(title: &str, shape: ControlShape, texts: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            shape,
            options: texts
                .iter()
                .map(|t| FakeOption {
                    text: t.to_string(),
                    value: None,
                    selected: false,
                    disabled: false,
                })
                .collect(),
            container_disabled: false,
            text_value: String::new(),
        }
    }

    pub fn pills(title: &str, texts: &[&str]) -> Self {
        Self::with_options(title, ControlShape::Pill, texts)
    }

    pub fn swatches(title: &str, texts: &[&str]) -> Self {
        Self::with_options(title, ControlShape::Swatch, texts)
    }

    /// 两段式下拉，默认选中第一个
    pub fn swatch_dropdown(title: &str, texts: &[&str]) -> Self {
        Self::with_options(title, ControlShape::SwatchDropdown, texts).selected(0)
    }

    /// 原生下拉框，默认选中第一个
    pub fn select(title: &str, options: &[(&str, &str)]) -> Self {
        let mut field = Self::with_options(
            title,
            ControlShape::Select,
            &options.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        );
        for (opt, (_, value)) in field.options.iter_mut().zip(options) {
            opt.value = Some(value.to_string());
        }
        field.selected(0)
    }

    pub fn text(title: &str) -> Self {
        Self::with_options(title, ControlShape::TextInput, &[])
    }

    pub fn selected(mut self, index: usize) -> Self {
        for (i, opt) in self.options.iter_mut().enumerate() {
            opt.selected = i == index;
        }
        self
    }

    pub fn disabled(mut self, index: usize) -> Self {
        self.options[index].disabled = true;
        self
    }

    pub fn container_disabled(mut self) -> Self {
        self.container_disabled = true;
        self
    }
}

pub struct FakePage {
    pub name: String,
    fields: Mutex<Vec<FakeField>>,
    revealed: Mutex<HashSet<String>>,
    url: Mutex<Option<String>>,
    dead: AtomicBool,
    busy: AtomicBool,
    submit_state: Mutex<SubmitClick>,
    cart_redirect: AtomicBool,
    has_quantity_input: bool,
    pub quantity: Mutex<Option<u32>>,
    pub gotos: Mutex<Vec<String>>,
    pub activations: AtomicUsize,
    pub reveals: AtomicUsize,
    pub submits: AtomicUsize,
    pub snapshots: AtomicUsize,
}

impl FakePage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Mutex::new(Vec::new()),
            revealed: Mutex::new(HashSet::new()),
            url: Mutex::new(Some("about:blank".to_string())),
            dead: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            submit_state: Mutex::new(SubmitClick::Clicked),
            cart_redirect: AtomicBool::new(true),
            has_quantity_input: true,
            quantity: Mutex::new(None),
            gotos: Mutex::new(Vec::new()),
            activations: AtomicUsize::new(0),
            reveals: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            snapshots: AtomicUsize::new(0),
        }
    }

    pub fn with_field(self, field: FakeField) -> Self {
        self.fields.lock().unwrap().push(field);
        self
    }

    pub fn with_submit(self, state: SubmitClick) -> Self {
        *self.submit_state.lock().unwrap() = state;
        self
    }

    pub fn without_cart_redirect(self) -> Self {
        self.cart_redirect.store(false, Ordering::SeqCst);
        self
    }

    pub fn without_quantity_input(mut self) -> Self {
        self.has_quantity_input = false;
        self
    }

    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// 存活检查返回"正在导航"
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn touched(&self) -> bool {
        !self.gotos.lock().unwrap().is_empty() || self.snapshots.load(Ordering::SeqCst) > 0
    }

    /// 字段当前选中的文本
    pub fn selected_text(&self, title: &str) -> Option<String> {
        let fields = self.fields.lock().unwrap();
        let field = fields.iter().find(|f| f.title == title)?;
        if field.shape == ControlShape::TextInput {
            return Some(field.text_value.clone());
        }
        field
            .options
            .iter()
            .find(|o| o.selected)
            .map(|o| o.text.clone())
    }

    fn check_alive(&self) -> DriverResult<()> {
        if self.dead.load(Ordering::SeqCst) {
            Err(DriverError::Detached(format!("{}: Target closed", self.name)))
        } else {
            Ok(())
        }
    }

    /// 整页范围内的单选按钮，按字段顺序编号
    fn page_wide_pills(fields: &[FakeField]) -> Vec<(usize, usize)> {
        fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.shape == ControlShape::Pill)
            .flat_map(|(fi, f)| (0..f.options.len()).map(move |oi| (fi, oi)))
            .collect()
    }

    fn find_field(fields: &[FakeField], query: &FieldQuery) -> Option<usize> {
        query.titles.iter().find_map(|title| {
            fields
                .iter()
                .position(|f| f.title.eq_ignore_ascii_case(title))
        })
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn probe(&self) -> DriverResult<()> {
        self.check_alive()?;
        if self.busy.load(Ordering::SeqCst) {
            return Err(DriverError::Navigating(
                "Execution context was destroyed".to_string(),
            ));
        }
        Ok(())
    }

    async fn goto(&self, url: &str) -> DriverResult<()> {
        self.check_alive()?;
        self.gotos.lock().unwrap().push(url.to_string());
        *self.url.lock().unwrap() = Some(url.to_string());
        self.revealed.lock().unwrap().clear();
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<Option<String>> {
        self.check_alive()?;
        Ok(self.url.lock().unwrap().clone())
    }

    async fn snapshot_field(&self, query: &FieldQuery) -> DriverResult<FieldSnapshot> {
        self.check_alive()?;
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        let fields = self.fields.lock().unwrap();
        let Some(pos) = Self::find_field(&fields, query) else {
            if !query.global_fallback {
                return Ok(FieldSnapshot::default());
            }
            let candidates: Vec<Candidate> = Self::page_wide_pills(&fields)
                .into_iter()
                .enumerate()
                .map(|(i, (fi, oi))| {
                    let opt = &fields[fi].options[oi];
                    Candidate {
                        selected: opt.selected,
                        control_disabled: opt.disabled,
                        ..Candidate::new(i, ControlShape::Pill, opt.text.clone())
                    }
                })
                .collect();
            return Ok(FieldSnapshot {
                container_found: false,
                shape: (!candidates.is_empty()).then_some(ControlShape::Pill),
                container_disabled: false,
                candidates,
            });
        };
        let field = &fields[pos];
        let open = self.revealed.lock().unwrap().contains(&field.title);

        let candidates = if field.shape == ControlShape::TextInput {
            vec![Candidate {
                value: Some(field.text_value.clone()),
                ..Candidate::new(0, ControlShape::TextInput, "")
            }]
        } else {
            field
                .options
                .iter()
                .enumerate()
                .map(|(i, opt)| Candidate {
                    value: opt.value.clone(),
                    selected: opt.selected,
                    control_disabled: opt.disabled,
                    visible: field.shape != ControlShape::SwatchDropdown || open || opt.selected,
                    ..Candidate::new(i, field.shape, opt.text.clone())
                })
                .collect()
        };

        Ok(FieldSnapshot {
            container_found: true,
            shape: Some(field.shape),
            container_disabled: field.container_disabled,
            candidates,
        })
    }

    async fn reveal_field(&self, query: &FieldQuery) -> DriverResult<bool> {
        self.check_alive()?;
        let fields = self.fields.lock().unwrap();
        match Self::find_field(&fields, query) {
            Some(pos) if fields[pos].shape == ControlShape::SwatchDropdown => {
                self.reveals.fetch_add(1, Ordering::SeqCst);
                self.revealed
                    .lock()
                    .unwrap()
                    .insert(fields[pos].title.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn activate(&self, query: &FieldQuery, candidate: &Candidate) -> DriverResult<bool> {
        self.check_alive()?;
        let mut fields = self.fields.lock().unwrap();
        let Some(pos) = Self::find_field(&fields, query) else {
            if !query.global_fallback {
                return Ok(false);
            }
            let Some(&(fi, oi)) = Self::page_wide_pills(&fields).get(candidate.index) else {
                return Ok(false);
            };
            for (i, opt) in fields[fi].options.iter_mut().enumerate() {
                opt.selected = i == oi;
            }
            self.activations.fetch_add(1, Ordering::SeqCst);
            return Ok(true);
        };
        let field = &mut fields[pos];
        if candidate.index >= field.options.len() {
            return Ok(false);
        }
        for (i, opt) in field.options.iter_mut().enumerate() {
            opt.selected = i == candidate.index;
        }
        self.revealed.lock().unwrap().remove(&field.title);
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn fill_text(
        &self,
        query: &FieldQuery,
        _candidate: &Candidate,
        value: &str,
    ) -> DriverResult<bool> {
        self.check_alive()?;
        let mut fields = self.fields.lock().unwrap();
        let Some(pos) = Self::find_field(&fields, query) else {
            return Ok(false);
        };
        fields[pos].text_value = value.to_string();
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn set_quantity(&self, quantity: u32) -> DriverResult<bool> {
        self.check_alive()?;
        if !self.has_quantity_input {
            return Ok(false);
        }
        *self.quantity.lock().unwrap() = Some(quantity);
        Ok(true)
    }

    async fn click_submit(&self) -> DriverResult<SubmitClick> {
        self.check_alive()?;
        let state = *self.submit_state.lock().unwrap();
        if state == SubmitClick::Clicked {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if self.cart_redirect.load(Ordering::SeqCst) {
                *self.url.lock().unwrap() = Some("https://shop.test/cart".to_string());
            }
        }
        Ok(state)
    }
}

// ========== 连接 ==========

pub struct FakeLink {
    context: Mutex<Vec<Arc<FakePage>>>,
    others: Mutex<Vec<Arc<FakePage>>>,
    fresh: Mutex<VecDeque<Arc<FakePage>>>,
    context_delay: Duration,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl FakeLink {
    pub fn new(context: Vec<Arc<FakePage>>) -> Self {
        Self {
            context: Mutex::new(context),
            others: Mutex::new(Vec::new()),
            fresh: Mutex::new(VecDeque::new()),
            context_delay: Duration::ZERO,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    /// 只在"所有上下文"中可见的页面
    pub fn with_other_pages(self, pages: Vec<Arc<FakePage>>) -> Self {
        *self.others.lock().unwrap() = pages;
        self
    }

    /// `open_page` 依次返回的页面
    pub fn with_fresh_pages(self, pages: Vec<Arc<FakePage>>) -> Self {
        *self.fresh.lock().unwrap() = pages.into();
        self
    }

    /// 默认上下文的页面列表迟迟不返回
    pub fn with_context_delay(mut self, delay: Duration) -> Self {
        self.context_delay = delay;
        self
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn handles(pages: &[Arc<FakePage>]) -> Vec<PageHandle> {
        pages.iter().map(|p| p.clone() as PageHandle).collect()
    }
}

#[async_trait]
impl BrowserLink for FakeLink {
    async fn context_pages(&self) -> DriverResult<Vec<PageHandle>> {
        if !self.context_delay.is_zero() {
            tokio::time::sleep(self.context_delay).await;
        }
        Ok(Self::handles(&self.context.lock().unwrap()))
    }

    async fn all_pages(&self) -> DriverResult<Vec<PageHandle>> {
        let mut pages = Self::handles(&self.context.lock().unwrap());
        pages.extend(Self::handles(&self.others.lock().unwrap()));
        Ok(pages)
    }

    async fn open_page(&self) -> DriverResult<PageHandle> {
        let page = self
            .fresh
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DriverError::Protocol("no fresh page".to_string()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.context.lock().unwrap().push(page.clone());
        Ok(page)
    }

    async fn close_owned(&self) -> DriverResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeConnector {
    links: Mutex<VecDeque<Arc<FakeLink>>>,
    delay: Duration,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(links: Vec<Arc<FakeLink>>) -> Self {
        Self {
            links: Mutex::new(links.into()),
            delay: Duration::ZERO,
            connects: AtomicUsize::new(0),
        }
    }

    /// 永远连不上
    pub fn unreachable() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserConnector for FakeConnector {
    async fn connect(&self) -> DriverResult<Arc<dyn BrowserLink>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let link = self.links.lock().unwrap().pop_front();
        match link {
            Some(link) => Ok(link as Arc<dyn BrowserLink>),
            None => Err(DriverError::Protocol(
                "error sending request: Connection refused".to_string(),
            )),
        }
    }

    fn endpoint(&self) -> String {
        "fake://browser".to_string()
    }
}

/// 只有一个页面的浏览器
pub fn single_page_browser(page: FakePage) -> (Arc<FakePage>, Arc<FakeConnector>) {
    let page = Arc::new(page);
    let link = Arc::new(FakeLink::new(vec![page.clone()]));
    (page, Arc::new(FakeConnector::new(vec![link])))
}

// ========== 执行器 ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    Succeed,
    Fail,
    Busy,
    Panic,
}

/// 按商品名决定结果的执行器
pub struct FakeExecutor {
    pub executed: Mutex<Vec<String>>,
    pub progress_seen: Mutex<Vec<BatchProgress>>,
    delay: Duration,
    stop_after: Option<usize>,
    coordinator: OnceLock<Weak<BatchCoordinator>>,
    script: fn(&OrderSpec) -> Scripted,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            progress_seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            stop_after: None,
            coordinator: OnceLock::new(),
            script: |_| Scripted::Succeed,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_script(mut self, script: fn(&OrderSpec) -> Scripted) -> Self {
        self.script = script;
        self
    }

    /// 执行第 `n` 个订单时请求停止批次
    pub fn stop_after(mut self, n: usize) -> Self {
        self.stop_after = Some(n);
        self
    }

    pub fn attach(&self, coordinator: &Arc<BatchCoordinator>) {
        let _ = self.coordinator.set(Arc::downgrade(coordinator));
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderExecutor for FakeExecutor {
    async fn execute(
        &self,
        order: &OrderSpec,
        batch: Option<BatchProgress>,
    ) -> Result<ExecutionResult, PipelineError> {
        let count = {
            let mut executed = self.executed.lock().unwrap();
            executed.push(order.product.clone());
            executed.len()
        };
        if let Some(progress) = batch {
            self.progress_seen.lock().unwrap().push(progress);
        }

        if self.stop_after == Some(count) {
            if let Some(coordinator) = self.coordinator.get().and_then(Weak::upgrade) {
                coordinator.stop().await.unwrap();
            }
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let status = match (self.script)(order) {
            Scripted::Succeed => ExecutionStatus::Completed,
            Scripted::Fail => ExecutionStatus::OptionFailure,
            Scripted::Busy => return Err(PipelineError::OrderInFlight),
            Scripted::Panic => panic!("scripted panic for {}", order.product),
        };
        Ok(ExecutionResult {
            order: order.clone(),
            status,
            message: format!("{:?}", status),
            steps: Vec::new(),
            failed_fields: Vec::new(),
            disabled_field: None,
            submission: None,
        })
    }
}

// ========== 状态 ==========

#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, update: StatusUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

pub fn orders(products: &[&str]) -> Vec<OrderSpec> {
    products.iter().map(|p| OrderSpec::new(*p)).collect()
}
