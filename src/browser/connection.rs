//! 浏览器连接
//!
//! 只连接已经运行、开启了远程调试端口的浏览器，从不启动或关闭浏览器进程。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::page::CdpPage;
use crate::error::DriverResult;
use crate::infrastructure::{BrowserConnector, BrowserLink, PageHandle};

/// 通过 CDP 端点建立连接
pub struct CdpConnector {
    endpoint: String,
}

impl CdpConnector {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl BrowserConnector for CdpConnector {
    async fn connect(&self) -> DriverResult<Arc<dyn BrowserLink>> {
        info!("正在连接到浏览器: {}", self.endpoint);

        let (browser, mut handler) = Browser::connect(&self.endpoint).await.map_err(|e| {
            error!("连接浏览器失败: {}", e);
            e
        })?;
        debug!("浏览器连接成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("浏览器事件处理出错: {}", e);
                }
            }
            debug!("浏览器事件流已结束");
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        Ok(Arc::new(CdpLink::new(browser, handler_task)))
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

/// 一条 CDP 连接
pub struct CdpLink {
    browser: Mutex<Browser>,
    owned: Mutex<Vec<Page>>,
    handler_task: JoinHandle<()>,
}

impl CdpLink {
    fn new(browser: Browser, handler_task: JoinHandle<()>) -> Self {
        Self {
            browser: Mutex::new(browser),
            owned: Mutex::new(Vec::new()),
            handler_task,
        }
    }

    fn wrap(pages: Vec<Page>) -> Vec<PageHandle> {
        pages
            .into_iter()
            .map(|page| Arc::new(CdpPage::new(page)) as PageHandle)
            .collect()
    }
}

#[async_trait]
impl BrowserLink for CdpLink {
    async fn context_pages(&self) -> DriverResult<Vec<PageHandle>> {
        let browser = self.browser.lock().await;
        let pages = browser.pages().await?;
        debug!("当前上下文中有 {} 个页面", pages.len());
        Ok(Self::wrap(pages))
    }

    async fn all_pages(&self) -> DriverResult<Vec<PageHandle>> {
        let mut browser = self.browser.lock().await;
        let targets = browser.fetch_targets().await?;
        let page_targets = targets.iter().filter(|t| t.r#type == "page").count();
        debug!("浏览器中共有 {} 个页面目标", page_targets);

        // 目标需要一点时间被事件循环登记为页面
        let mut pages = browser.pages().await?;
        for _ in 0..10 {
            if pages.len() >= page_targets {
                break;
            }
            sleep(Duration::from_millis(50)).await;
            pages = browser.pages().await?;
        }
        Ok(Self::wrap(pages))
    }

    async fn open_page(&self) -> DriverResult<PageHandle> {
        let browser = self.browser.lock().await;
        let page = browser.new_page("about:blank").await.map_err(|e| {
            error!("创建空白页面失败: {}", e);
            e
        })?;
        info!("已创建新的空白页面");
        self.owned.lock().await.push(page.clone());
        Ok(Arc::new(CdpPage::new(page)))
    }

    async fn close_owned(&self) -> DriverResult<()> {
        let pages: Vec<Page> = self.owned.lock().await.drain(..).collect();
        for page in pages {
            if let Err(e) = page.close().await {
                warn!("关闭页面失败: {}", e);
            }
        }
        Ok(())
    }
}

impl Drop for CdpLink {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
