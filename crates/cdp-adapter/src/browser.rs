//! Single-tab chromiumoxide session behind the `BrowserDriver` seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use research_core::{
    duration_ms, AgentError, BrowserDriver, ElementQuery, ElementSnapshot, PageInfo, WaitPolicy,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChromiumConfig;
use crate::error::CdpError;
use crate::scripts;

const READY_POLL: Duration = Duration::from_millis(100);
const BLANK_PAGE: &str = "about:blank";

pub struct ChromiumBrowser {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChromiumBrowser {
    /// Launch Chrome and open one blank tab.
    pub async fn launch(config: ChromiumConfig) -> Result<Self, CdpError> {
        let browser_config = config.browser_config()?;
        info!(
            target: "cdp",
            headless = config.headless,
            sandbox = !config.disable_sandbox,
            "launching chromium"
        );
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| CdpError::Launch(err.to_string()))?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp", %err, "handler event error");
                }
            }
            debug!(target: "cdp", "handler loop finished");
        });

        let page = match browser.new_page(BLANK_PAGE).await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(target: "cdp", %close_err, "failed to close browser after launch error");
                }
                handle.abort();
                return Err(CdpError::Launch(format!("failed to open tab: {err}")));
            }
        };

        Ok(Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), CdpError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CdpError::Closed)
        } else {
            Ok(())
        }
    }

    async fn element(&self, selector: &str) -> Result<Element, CdpError> {
        self.ensure_open()?;
        self.page
            .find_element(selector)
            .await
            .map_err(|_| CdpError::NoElement(selector.to_string()))
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        script: String,
    ) -> Result<T, CdpError> {
        self.ensure_open()?;
        self.page
            .evaluate(script)
            .await
            .map_err(|err| CdpError::protocol(operation, err))?
            .into_value::<T>()
            .map_err(|err| CdpError::protocol(operation, err))
    }

    async fn wait_until(&self, check: &'static str) -> Result<(), CdpError> {
        loop {
            let ready = self
                .evaluate::<bool>("readyState", check.to_string())
                .await
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn navigate_inner(&self, url: &str, wait: WaitPolicy) -> Result<(), CdpError> {
        self.ensure_open()?;
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|err| CdpError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        if let Some(reason) = response.result.error_text.clone() {
            return Err(CdpError::Navigation {
                url: url.to_string(),
                reason,
            });
        }
        if let Some(check) = scripts::ready_state_check(wait) {
            self.wait_until(check).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumBrowser {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), AgentError> {
        debug!(target: "cdp", url, ?wait, "navigate");
        match tokio::time::timeout(timeout, self.navigate_inner(url, wait)).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(AgentError::timeout(
                format!("navigate {url}"),
                duration_ms(timeout),
            )),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), AgentError> {
        self.element(selector)
            .await?
            .click()
            .await
            .map_err(|err| CdpError::protocol("click", err))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), AgentError> {
        let element = self.element(selector).await?;
        element
            .click()
            .await
            .map_err(|err| CdpError::protocol("focus", err))?
            .type_str(text)
            .await
            .map_err(|err| CdpError::protocol("type", err))?;
        Ok(())
    }

    async fn get_attribute(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Option<String>, AgentError> {
        let value = self
            .element(selector)
            .await?
            .attribute(attribute)
            .await
            .map_err(|err| CdpError::protocol("getAttribute", err))?;
        Ok(value)
    }

    async fn get_text(&self, selector: &str) -> Result<String, AgentError> {
        let text = self
            .element(selector)
            .await?
            .inner_text()
            .await
            .map_err(|err| CdpError::protocol("getText", err))?;
        Ok(text.unwrap_or_default())
    }

    async fn get_all_elements(
        &self,
        selector: &str,
        query: ElementQuery,
    ) -> Result<Vec<ElementSnapshot>, AgentError> {
        let script = scripts::collect_elements(selector, &query.attribute, query.limit);
        let snapshots = self
            .evaluate::<Vec<ElementSnapshot>>("getAllElements", script)
            .await?;
        Ok(snapshots)
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), AgentError> {
        self.element(selector)
            .await?
            .scroll_into_view()
            .await
            .map_err(|err| CdpError::protocol("scrollIntoView", err))?;
        Ok(())
    }

    async fn current_page_info(&self) -> Result<PageInfo, AgentError> {
        self.ensure_open()?;
        let url = self
            .page
            .url()
            .await
            .map_err(|err| CdpError::protocol("url", err))?;
        let title = self
            .page
            .get_title()
            .await
            .map_err(|err| CdpError::protocol("title", err))?;
        Ok(PageInfo {
            url: url.unwrap_or_else(|| BLANK_PAGE.to_string()),
            title: title.unwrap_or_default(),
        })
    }

    async fn close(&self) -> Result<(), AgentError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp", %err, "browser close command failed");
            }
            if let Err(err) = browser.wait().await {
                warn!(target: "cdp", %err, "waiting for browser exit failed");
            }
        }
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
        info!(target: "cdp", "browser closed");
        Ok(())
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        if let Some(handle) = self.handler.get_mut().take() {
            handle.abort();
        }
    }
}
