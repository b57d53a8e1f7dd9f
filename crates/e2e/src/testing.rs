//! In-memory page model implementing `PageDriver`.
//!
//! Used to exercise runners and suites without a browser. Pages are
//! described as flat element lists; CSS selectors are matched literally
//! against the selectors each element declares.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use pagecheck_common::{LoadMilestone, Locator};

use crate::driver::{DriverFactory, NodeHandle, PageDriver, RuntimeErrorLog};
use crate::error::DriverError;

/// One element of a scripted page
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    pub text: String,
    pub role: Option<String>,
    pub accessible_name: Option<String>,
    pub tag: String,
    /// Selectors this element answers to, e.g. `.background`, `#principles`
    pub selectors: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub styles: BTreeMap<String, String>,
    pub visible: bool,
    /// Number of `locate` calls on the page before the element renders
    pub appears_after: u32,
}

impl MemoryElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn heading(name: &str) -> Self {
        Self::new("h2").role("heading", name).text(name)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn role(mut self, role: &str, name: &str) -> Self {
        self.role = Some(role.to_string());
        self.accessible_name = Some(name.to_string());
        self
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selectors.push(selector.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn appears_after(mut self, locates: u32) -> Self {
        self.appears_after = locates;
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Text { text } => self.text.contains(text.as_str()),
            Locator::Role { role, name, .. } => {
                self.role.as_deref() == Some(role.as_str())
                    && name
                        .as_ref()
                        .map(|n| n.matches(self.accessible_name.as_deref().unwrap_or("")))
                        .unwrap_or(true)
            }
            Locator::Attribute { attribute, value, tag, .. } => {
                tag.as_deref().map(|t| t == self.tag).unwrap_or(true)
                    && value.matches(self.attributes.get(attribute).map(String::as_str))
            }
            Locator::Css { selector, .. } => self.selectors.iter().any(|s| s == selector),
        }
    }
}

/// A scripted document
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub title: String,
    pub elements: Vec<MemoryElement>,
    /// Errors raised while the page loads
    pub runtime_errors: Vec<String>,
}

impl MemoryPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn element(mut self, element: MemoryElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn runtime_error(mut self, message: &str) -> Self {
        self.runtime_errors.push(message.to_string());
        self
    }
}

/// Paths to pages, plus navigation failures to inject
#[derive(Debug, Clone, Default)]
pub struct MemorySite {
    pages: HashMap<String, MemoryPage>,
    failing_navigations: HashMap<String, u32>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, page: MemoryPage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    /// Fail the next `times` navigations to `path` with a timeout
    pub fn failing_navigation(mut self, path: &str, times: u32) -> Self {
        self.failing_navigations.insert(path.to_string(), times);
        self
    }
}

/// Calls observed by a `MemoryDriver`, shared with the test
#[derive(Debug, Default)]
pub struct DriverLog {
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub hovers: usize,
    pub closed: bool,
    /// Navigations currently in flight for this session
    pub in_flight: usize,
    pub max_in_flight: usize,
}

struct LoadedPage {
    path: String,
    url: String,
    page: MemoryPage,
    locates: u32,
    errors: RuntimeErrorLog,
}

/// `PageDriver` over a `MemorySite`
pub struct MemoryDriver {
    site: Arc<Mutex<MemorySite>>,
    base_url: String,
    current: Option<LoadedPage>,
    /// Handles issued since the last navigation, mapping to element indices
    handles: HashMap<NodeHandle, usize>,
    next_handle: u64,
    log: Arc<Mutex<DriverLog>>,
}

impl MemoryDriver {
    pub fn new(site: MemorySite) -> Self {
        Self::shared(Arc::new(Mutex::new(site)), Arc::new(Mutex::new(DriverLog::default())))
    }

    pub fn shared(site: Arc<Mutex<MemorySite>>, log: Arc<Mutex<DriverLog>>) -> Self {
        Self {
            site,
            base_url: "http://site.test".to_string(),
            current: None,
            handles: HashMap::new(),
            next_handle: 1,
            log,
        }
    }

    pub fn log(&self) -> Arc<Mutex<DriverLog>> {
        Arc::clone(&self.log)
    }

    fn loaded(&mut self) -> Result<&mut LoadedPage, DriverError> {
        self.current
            .as_mut()
            .ok_or_else(|| DriverError::Protocol("no page loaded".to_string()))
    }

    fn element(&self, node: NodeHandle) -> Result<&MemoryElement, DriverError> {
        let index = *self.handles.get(&node).ok_or(DriverError::StaleNode(node.0))?;
        self.current
            .as_ref()
            .and_then(|p| p.page.elements.get(index))
            .ok_or(DriverError::StaleNode(node.0))
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.log.lock().closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for MemoryDriver {
    async fn navigate(&mut self, path: &str, _milestone: LoadMilestone) -> Result<(), DriverError> {
        self.ensure_open()?;
        {
            let mut log = self.log.lock();
            log.navigations.push(path.to_string());
            log.in_flight += 1;
            log.max_in_flight = log.max_in_flight.max(log.in_flight);
        }
        tokio::task::yield_now().await;
        self.log.lock().in_flight -= 1;

        self.handles.clear();
        self.current = None;

        let url = format!("{}{}", self.base_url, path);
        let mut site = self.site.lock();
        if let Some(remaining) = site.failing_navigations.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Timeout {
                    operation: format!("navigate {}", url),
                    ms: 0,
                });
            }
        }

        let page = site.pages.get(path).cloned().ok_or_else(|| DriverError::Navigation {
            url: url.clone(),
            reason: "HTTP 404 Not Found".to_string(),
        })?;

        let errors = page.runtime_errors.iter().cloned().collect();
        self.current = Some(LoadedPage {
            path: path.to_string(),
            url,
            page,
            locates: 0,
            errors,
        });
        Ok(())
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.loaded()?.page.title.clone())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.loaded()?.url.clone())
    }

    async fn locate(&mut self, locator: &Locator) -> Result<Vec<NodeHandle>, DriverError> {
        let loaded = self.loaded()?;
        loaded.locates += 1;
        let locates = loaded.locates;

        let indices: Vec<usize> = loaded
            .page
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.appears_after < locates && e.matches(locator))
            .map(|(i, _)| i)
            .collect();

        let mut nodes = Vec::with_capacity(indices.len());
        for index in indices {
            let handle = NodeHandle(self.next_handle);
            self.next_handle += 1;
            self.handles.insert(handle, index);
            nodes.push(handle);
        }
        Ok(nodes)
    }

    async fn is_visible(&mut self, node: NodeHandle) -> Result<bool, DriverError> {
        Ok(self.element(node)?.visible)
    }

    async fn attribute_value(&mut self, node: NodeHandle, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self.element(node)?.attributes.get(name).cloned())
    }

    async fn computed_style(&mut self, node: NodeHandle, property: &str) -> Result<String, DriverError> {
        Ok(self
            .element(node)?
            .styles
            .get(property)
            .cloned()
            .unwrap_or_else(|| "none".to_string()))
    }

    /// Same-page `#fragment` links update the URL; anything else is recorded only
    async fn click(&mut self, node: NodeHandle) -> Result<(), DriverError> {
        let href = self.element(node)?.attributes.get("href").cloned();
        let loaded = self.loaded()?;
        if let Some(fragment) = href.as_deref().filter(|h| h.starts_with('#')) {
            let base = loaded.url.split('#').next().unwrap_or_default().to_string();
            loaded.url = format!("{}{}", base, fragment);
        }
        let path = loaded.path.clone();
        self.log.lock().clicks.push(format!("{} {}", path, href.unwrap_or_default()));
        Ok(())
    }

    async fn hover(&mut self, node: NodeHandle) -> Result<(), DriverError> {
        self.element(node)?;
        self.log.lock().hovers += 1;
        Ok(())
    }

    async fn collect_errors(&mut self) -> Result<RuntimeErrorLog, DriverError> {
        Ok(self.loaded()?.errors.clone())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.log.lock().closed = true;
        Ok(())
    }
}

/// Hands out `MemoryDriver`s over one shared site, each with its own log
#[derive(Clone, Default)]
pub struct MemoryFactory {
    site: Arc<Mutex<MemorySite>>,
    logs: Arc<Mutex<Vec<Arc<Mutex<DriverLog>>>>>,
    fail_open: bool,
}

impl MemoryFactory {
    pub fn new(site: MemorySite) -> Self {
        Self {
            site: Arc::new(Mutex::new(site)),
            ..Default::default()
        }
    }

    /// Every `open` fails, as when the browser cannot launch
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    /// Logs of every driver opened so far, in open order
    pub fn logs(&self) -> Vec<Arc<Mutex<DriverLog>>> {
        self.logs.lock().clone()
    }
}

#[async_trait]
impl DriverFactory for MemoryFactory {
    type Driver = MemoryDriver;

    async fn open(&self) -> Result<Self::Driver, DriverError> {
        if self.fail_open {
            return Err(DriverError::BridgeNotFound("no browser in memory factory".to_string()));
        }
        let log = Arc::new(Mutex::new(DriverLog::default()));
        self.logs.lock().push(Arc::clone(&log));
        Ok(MemoryDriver::shared(Arc::clone(&self.site), log))
    }
}
