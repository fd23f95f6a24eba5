//! 会话控制器
//!
//! 持有当前连接和当前页面，负责在页面失效后重新找到一个可用页面。
//! 恢复按层级进行：
//! 1. 当前上下文中的页面
//! 2. 所有上下文中的页面
//! 3. 重新连接后再走一遍 1、2，仍没有页面时新开一个
//!
//! 同一时间只有一个调用方执行恢复，其余调用方等待其结果。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::infrastructure::{BrowserConnector, BrowserLink, PageHandle};

/// 会话恢复参数
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 单次存活检查的超时
    pub probe_timeout: Duration,
    /// 等待他人恢复的上限
    pub recovery_wait_ceiling: Duration,
    /// 等待他人恢复时的轮询间隔
    pub recovery_poll_interval: Duration,
    /// 每一层恢复操作（连接、列出页面）的超时
    pub tier_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(2),
            recovery_wait_ceiling: Duration::from_secs(3),
            recovery_poll_interval: Duration::from_millis(100),
            tier_timeout: Duration::from_secs(10),
        }
    }
}

/// 存活检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// 检查超时或页面正在导航，句柄本身仍然有效
    Busy,
    Dead,
}

impl Liveness {
    pub fn is_usable(self) -> bool {
        !matches!(self, Liveness::Dead)
    }
}

/// 会话状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub has_link: bool,
    pub has_page: bool,
    pub recovering: bool,
}

#[derive(Default)]
struct Slots {
    link: Option<Arc<dyn BrowserLink>>,
    page: Option<PageHandle>,
}

/// 恢复标志的守卫，离开作用域（包括被取消）时复位
struct RecoveryGuard<'a>(&'a AtomicBool);

impl Drop for RecoveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SessionController {
    connector: Arc<dyn BrowserConnector>,
    config: SessionConfig,
    slots: RwLock<Slots>,
    recovering: AtomicBool,
}

impl SessionController {
    pub fn new(connector: Arc<dyn BrowserConnector>, config: SessionConfig) -> Self {
        Self {
            connector,
            config,
            slots: RwLock::new(Slots::default()),
            recovering: AtomicBool::new(false),
        }
    }

    /// 取得一个可用页面
    ///
    /// 缓存的页面仍然可用时直接返回，否则进入恢复流程。
    pub async fn acquire_page(&self) -> Result<PageHandle, SessionError> {
        if let Some(page) = self.cached_page().await {
            match self.probe(&page).await {
                Liveness::Alive => return Ok(page),
                Liveness::Busy => {
                    debug!("缓存页面暂时无响应，继续使用");
                    return Ok(page);
                }
                Liveness::Dead => {
                    info!("⚠️ 缓存页面已失效，开始恢复会话");
                }
            }
        }
        self.recover().await
    }

    /// 缓存的页面是否仍然可用
    pub async fn is_connected(&self) -> bool {
        match self.cached_page().await {
            Some(page) => self.probe(&page).await.is_usable(),
            None => false,
        }
    }

    pub async fn state(&self) -> SessionState {
        let slots = self.slots.read().await;
        SessionState {
            has_link: slots.link.is_some(),
            has_page: slots.page.is_some(),
            recovering: self.recovering.load(Ordering::SeqCst),
        }
    }

    /// 重新建立可用页面
    pub async fn recover(&self) -> Result<PageHandle, SessionError> {
        if self
            .recovering
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return self.wait_for_recovery().await;
        }
        let _guard = RecoveryGuard(&self.recovering);

        match self.run_recovery().await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!("❌ 会话恢复失败: {}", e);
                let stale = {
                    let mut slots = self.slots.write().await;
                    std::mem::take(&mut *slots).link
                };
                if let Some(link) = stale {
                    self.close_link(&link).await;
                }
                Err(e)
            }
        }
    }

    /// 释放会话
    ///
    /// 无论关闭是否成功，本地缓存都会被清空。
    pub async fn release(&self) {
        let link = {
            let mut slots = self.slots.write().await;
            slots.page = None;
            slots.link.take()
        };

        if let Some(link) = link {
            self.close_link(&link).await;
        }
        info!("会话已释放");
    }

    /// 关闭一条连接上本会话打开的页面
    async fn close_link(&self, link: &Arc<dyn BrowserLink>) {
        match timeout(self.config.tier_timeout, link.close_owned()).await {
            Ok(Ok(())) => debug!("已关闭本会话打开的页面"),
            Ok(Err(e)) => warn!("关闭页面失败: {}", e),
            Err(_) => warn!("关闭页面超时"),
        }
    }

    async fn cached_page(&self) -> Option<PageHandle> {
        self.slots.read().await.page.clone()
    }

    async fn probe(&self, page: &PageHandle) -> Liveness {
        match timeout(self.config.probe_timeout, page.probe()).await {
            Ok(Ok(())) => Liveness::Alive,
            Ok(Err(e)) if e.is_dead_handle() => {
                debug!("页面句柄已失效: {}", e);
                Liveness::Dead
            }
            Ok(Err(e)) => {
                debug!("存活检查出错，但句柄仍有效: {}", e);
                Liveness::Busy
            }
            Err(_) => {
                debug!("存活检查超时");
                Liveness::Busy
            }
        }
    }

    async fn wait_for_recovery(&self) -> Result<PageHandle, SessionError> {
        debug!("已有恢复在进行，等待其结果");
        let deadline = Instant::now() + self.config.recovery_wait_ceiling;
        while self.recovering.load(Ordering::SeqCst) && Instant::now() < deadline {
            sleep(self.config.recovery_poll_interval).await;
        }

        if self.recovering.load(Ordering::SeqCst) {
            return Err(SessionError::Unreachable(format!(
                "等待并发恢复超过 {}ms",
                self.config.recovery_wait_ceiling.as_millis()
            )));
        }

        self.cached_page().await.ok_or_else(|| {
            SessionError::Unreachable("等待并发恢复后仍没有可用页面".to_string())
        })
    }

    async fn run_recovery(&self) -> Result<PageHandle, SessionError> {
        let existing = self.slots.read().await.link.clone();

        if let Some(link) = &existing {
            if let Some(page) = self.scan_link(link).await {
                self.store(link.clone(), page.clone()).await;
                return Ok(page);
            }
            info!("现有连接上没有可用页面，重新连接浏览器");
        }

        let endpoint = self.connector.endpoint();
        let link = match timeout(self.config.tier_timeout, self.connector.connect()).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                return Err(SessionError::Unreachable(format!(
                    "无法连接 {}: {}",
                    endpoint, e
                )))
            }
            Err(_) => {
                return Err(SessionError::Unreachable(format!(
                    "连接 {} 超时",
                    endpoint
                )))
            }
        };

        // 旧连接不再使用，先收回它打开的页面
        if let Some(old) = existing {
            *self.slots.write().await = Slots::default();
            self.close_link(&old).await;
        }

        if let Some(page) = self.scan_link(&link).await {
            self.store(link, page.clone()).await;
            return Ok(page);
        }

        let page = match timeout(self.config.tier_timeout, link.open_page()).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                return Err(SessionError::Unreachable(format!("无法创建新页面: {}", e)))
            }
            Err(_) => return Err(SessionError::Unreachable("创建新页面超时".to_string())),
        };
        self.store(link, page.clone()).await;
        info!("✓ 已在新连接中打开页面");
        Ok(page)
    }

    /// 在一条连接上依次扫描当前上下文和所有上下文
    async fn scan_link(&self, link: &Arc<dyn BrowserLink>) -> Option<PageHandle> {
        match timeout(self.config.tier_timeout, link.context_pages()).await {
            Ok(Ok(pages)) => {
                if let Some(page) = self.first_usable(pages).await {
                    debug!("在当前上下文中找到可用页面");
                    return Some(page);
                }
            }
            Ok(Err(e)) => debug!("列出当前上下文页面失败: {}", e),
            Err(_) => debug!("列出当前上下文页面超时"),
        }

        match timeout(self.config.tier_timeout, link.all_pages()).await {
            Ok(Ok(pages)) => {
                if let Some(page) = self.first_usable(pages).await {
                    debug!("在其他上下文中找到可用页面");
                    return Some(page);
                }
            }
            Ok(Err(e)) => debug!("列出所有页面失败: {}", e),
            Err(_) => debug!("列出所有页面超时"),
        }

        None
    }

    async fn first_usable(&self, pages: Vec<PageHandle>) -> Option<PageHandle> {
        for page in pages {
            if self.probe(&page).await.is_usable() {
                return Some(page);
            }
        }
        None
    }

    async fn store(&self, link: Arc<dyn BrowserLink>, page: PageHandle) {
        let mut slots = self.slots.write().await;
        slots.link = Some(link);
        slots.page = Some(page);
        info!("✓ 会话已就绪");
    }
}
