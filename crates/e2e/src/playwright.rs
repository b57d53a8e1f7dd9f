//! Playwright browser automation
//!
//! A `node` sidecar runs the embedded bridge script, which owns one browser
//! page. Requests and replies travel as line-delimited JSON over the
//! sidecar's stdin/stdout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use pagecheck_common::config::join_url;
use pagecheck_common::{BrowserKind, HarnessConfig, LoadMilestone, Locator};

use crate::driver::{DriverFactory, DriverTimeouts, NodeHandle, PageDriver, RuntimeErrorLog};
use crate::error::DriverError;

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Configuration for Playwright sessions
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub node_binary: PathBuf,
    /// Directory whose node_modules provides `playwright`
    pub node_project_dir: PathBuf,
    pub timeouts: DriverTimeouts,
    /// Budget for launching the browser
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: PathBuf::from("node"),
            node_project_dir: PathBuf::from("."),
            timeouts: DriverTimeouts::default(),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&HarnessConfig> for PlaywrightConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            browser: config.browser.engine,
            headless: config.browser.headless,
            viewport_width: config.browser.viewport_width,
            viewport_height: config.browser.viewport_height,
            node_binary: config.browser.node_binary.clone(),
            node_project_dir: config.browser.node_project_dir.clone(),
            timeouts: DriverTimeouts {
                navigation: config.timeouts.navigation(),
                action: config.timeouts.locate(),
            },
            ..Default::default()
        }
    }
}

/// Request sent to the bridge
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Navigate {
        url: String,
        wait_until: &'static str,
        timeout_ms: u64,
    },
    Title,
    Url,
    Locate {
        locator: &'a Locator,
    },
    Visible {
        node: NodeHandle,
    },
    Attribute {
        node: NodeHandle,
        name: &'a str,
    },
    Style {
        node: NodeHandle,
        property: &'a str,
    },
    Click {
        node: NodeHandle,
        timeout_ms: u64,
    },
    Hover {
        node: NodeHandle,
        timeout_ms: u64,
    },
    Errors,
    Close,
}

impl BridgeRequest<'_> {
    fn name(&self) -> &'static str {
        match self {
            BridgeRequest::Navigate { .. } => "navigate",
            BridgeRequest::Title => "title",
            BridgeRequest::Url => "url",
            BridgeRequest::Locate { .. } => "locate",
            BridgeRequest::Visible { .. } => "visible",
            BridgeRequest::Attribute { .. } => "attribute",
            BridgeRequest::Style { .. } => "style",
            BridgeRequest::Click { .. } => "click",
            BridgeRequest::Hover { .. } => "hover",
            BridgeRequest::Errors => "errors",
            BridgeRequest::Close => "close",
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a BridgeRequest<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadyLine {
    ready: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A live Playwright page session
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    base_url: String,
    timeouts: DriverTimeouts,
    closed: bool,
    /// Keeps the staged bridge script alive for the session
    _bridge_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Launch the bridge and wait until its browser page is ready
    pub async fn launch(config: PlaywrightConfig) -> Result<Self, DriverError> {
        Self::check_playwright_installed(&config)?;

        let bridge_dir = tempfile::tempdir()?;
        let script_path = bridge_dir.path().join("pagecheck-bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        info!(
            "Launching {} ({}) via Playwright bridge",
            config.browser,
            if config.headless { "headless" } else { "headed" }
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.node_project_dir)
            .env("PAGECHECK_BROWSER", config.browser.as_str())
            .env("PAGECHECK_HEADLESS", if config.headless { "1" } else { "0" })
            .env("PAGECHECK_VIEWPORT_WIDTH", config.viewport_width.to_string())
            .env("PAGECHECK_VIEWPORT_HEIGHT", config.viewport_height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DriverError::BridgeNotFound(format!("failed to spawn {}: {}", config.node_binary.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Bridge("bridge stdout unavailable".to_string()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            base_url: config.base_url,
            timeouts: config.timeouts,
            closed: false,
            _bridge_dir: bridge_dir,
        };

        driver.wait_ready(config.launch_timeout).await?;
        debug!("Playwright bridge ready (pid: {:?})", driver.child.id());
        Ok(driver)
    }

    /// Check that node can resolve the playwright package
    fn check_playwright_installed(config: &PlaywrightConfig) -> Result<(), DriverError> {
        let status = Command::new(&config.node_binary)
            .args(["-e", "require.resolve('playwright', { paths: [process.cwd()] })"])
            .current_dir(&config.node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(DriverError::BridgeNotFound(format!(
                "playwright is not resolvable from {}",
                config.node_project_dir.display()
            ))),
            Err(e) => Err(DriverError::BridgeNotFound(format!(
                "{} not runnable: {}",
                config.node_binary.display(),
                e
            ))),
        }
    }

    async fn wait_ready(&mut self, limit: Duration) -> Result<(), DriverError> {
        let line = timeout(limit, self.stdout.next_line())
            .await
            .map_err(|_| DriverError::Timeout {
                operation: "browser launch".to_string(),
                ms: limit.as_millis() as u64,
            })??
            .ok_or(DriverError::Closed)?;

        let ready: ReadyLine = serde_json::from_str(&line)?;
        if ready.ready {
            Ok(())
        } else {
            Err(DriverError::Bridge(
                ready.error.unwrap_or_else(|| "browser failed to launch".to_string()),
            ))
        }
    }

    /// Send one request and wait for its reply
    async fn request(&mut self, request: BridgeRequest<'_>, limit: Duration) -> Result<serde_json::Value, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, request: &request })?;
        line.push('\n');
        debug!("bridge <- #{} {}", id, request.name());

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = timeout(limit, self.read_reply(id))
            .await
            .map_err(|_| DriverError::Timeout {
                operation: request.name().to_string(),
                ms: limit.as_millis() as u64,
            })??;

        if reply.ok {
            Ok(reply.result)
        } else {
            Err(DriverError::Bridge(
                reply.error.unwrap_or_else(|| format!("{} failed", request.name())),
            ))
        }
    }

    /// Read until the reply for `id`; replies to timed-out requests are skipped
    async fn read_reply(&mut self, id: u64) -> Result<BridgeReply, DriverError> {
        loop {
            let line = self.stdout.next_line().await?.ok_or(DriverError::Closed)?;
            let reply: BridgeReply = match serde_json::from_str(&line) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!("bridge -> (non-protocol) {}", line);
                    continue;
                }
            };

            match reply.id {
                Some(reply_id) if reply_id == id => return Ok(reply),
                Some(stale) => debug!("Discarding stale bridge reply #{}", stale),
                None => {
                    return Err(DriverError::Protocol(
                        reply.error.unwrap_or_else(|| "reply without id".to_string()),
                    ))
                }
            }
        }
    }

    fn action_timeout_ms(&self) -> u64 {
        self.timeouts.action.as_millis() as u64
    }

    /// Outer budget for a request that carries its own inner timeout
    fn outer_limit(&self, inner: Duration) -> Duration {
        inner + Duration::from_secs(5)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, DriverError> {
    serde_json::from_value(value).map_err(DriverError::from)
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&mut self, path: &str, milestone: LoadMilestone) -> Result<(), DriverError> {
        let url = join_url(&self.base_url, path);
        let inner = self.timeouts.navigation;
        let limit = self.outer_limit(inner);

        let result = self
            .request(
                BridgeRequest::Navigate {
                    url: url.clone(),
                    wait_until: milestone.as_wait_until(),
                    timeout_ms: inner.as_millis() as u64,
                },
                limit,
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(DriverError::Bridge(reason)) => Err(DriverError::Navigation { url, reason }),
            Err(e) => Err(e),
        }
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Title, limit).await?)
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Url, limit).await?)
    }

    async fn locate(&mut self, locator: &Locator) -> Result<Vec<NodeHandle>, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Locate { locator }, limit).await?)
    }

    async fn is_visible(&mut self, node: NodeHandle) -> Result<bool, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Visible { node }, limit).await?)
    }

    async fn attribute_value(&mut self, node: NodeHandle, name: &str) -> Result<Option<String>, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Attribute { node, name }, limit).await?)
    }

    async fn computed_style(&mut self, node: NodeHandle, property: &str) -> Result<String, DriverError> {
        let limit = self.timeouts.action;
        decode(self.request(BridgeRequest::Style { node, property }, limit).await?)
    }

    async fn click(&mut self, node: NodeHandle) -> Result<(), DriverError> {
        let timeout_ms = self.action_timeout_ms();
        let limit = self.outer_limit(self.timeouts.action);
        self.request(BridgeRequest::Click { node, timeout_ms }, limit).await?;
        Ok(())
    }

    async fn hover(&mut self, node: NodeHandle) -> Result<(), DriverError> {
        let timeout_ms = self.action_timeout_ms();
        let limit = self.outer_limit(self.timeouts.action);
        self.request(BridgeRequest::Hover { node, timeout_ms }, limit).await?;
        Ok(())
    }

    async fn collect_errors(&mut self) -> Result<RuntimeErrorLog, DriverError> {
        let limit = self.timeouts.action;
        let messages: Vec<String> = decode(self.request(BridgeRequest::Errors, limit).await?)?;
        Ok(messages.into_iter().collect())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }

        let limit = self.timeouts.action;
        if let Err(e) = self.request(BridgeRequest::Close, limit).await {
            warn!("Bridge did not close cleanly: {}", e);
        }
        self.closed = true;

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited: {}", status),
            _ => {
                warn!("Playwright bridge still running, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

/// Opens a fresh Playwright session per runner
#[derive(Debug, Clone)]
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
}

impl PlaywrightFactory {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory for PlaywrightFactory {
    type Driver = PlaywrightDriver;

    async fn open(&self) -> Result<Self::Driver, DriverError> {
        PlaywrightDriver::launch(self.config.clone()).await
    }
}
