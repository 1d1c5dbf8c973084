//! Playwright-backed browser engine.
//!
//! Each [`PlaywrightBridge::launch`] spawns its own `node` process running an
//! embedded driver script (`driver.js`) that speaks line-delimited JSON over
//! stdin/stdout. One process drives exactly one browser, so tests never share
//! engine state. The child is spawned with `kill_on_drop`, which tears the
//! browser down even when a session is dropped without being released.
//!
//! The `playwright` npm package must be resolvable by node; set
//! `TESTPILOT_NODE_PATH` when it is installed outside the working directory.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{
    Browser, BrowserContext, BrowserError, BrowserLauncher, BrowserResult, Page, Viewport,
};
use crate::config::BrowserSettings;
use crate::intent::BrowserKind;

const DRIVER_SCRIPT: &str = include_str!("driver.js");

/// Timeout applied to `fill`, which has no caller-supplied timeout
const FILL_TIMEOUT_MS: u64 = 5_000;

/// How long to wait for node to exit after the browser is closed
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Launcher that drives Playwright through a node subprocess
#[derive(Debug, Clone)]
pub struct PlaywrightBridge {
    node_binary: String,
    node_path: Option<String>,
}

impl PlaywrightBridge {
    pub fn new(node_binary: impl Into<String>) -> Self {
        Self {
            node_binary: node_binary.into(),
            node_path: None,
        }
    }

    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            node_binary: settings.node_binary.clone(),
            node_path: settings.node_path.clone(),
        }
    }

    /// Set `NODE_PATH` for the bridge process
    pub fn node_path(mut self, node_path: impl Into<String>) -> Self {
        self.node_path = Some(node_path.into());
        self
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut command = Command::new(&self.node_binary);
        command
            .arg("-e")
            .arg(DRIVER_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_path) = &self.node_path {
            command.env("NODE_PATH", node_path);
        }
        command.spawn()
    }
}

impl Default for PlaywrightBridge {
    fn default() -> Self {
        Self::from_settings(&crate::config::get().browser)
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightBridge {
    async fn launch(&self, engine: BrowserKind, headless: bool) -> BrowserResult<Box<dyn Browser>> {
        let launch_error = |message: String| BrowserError::Launch { engine, message };

        let mut child = self
            .spawn()
            .map_err(|e| launch_error(format!("cannot start {}: {}", self.node_binary, e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| launch_error("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| launch_error("bridge stdout unavailable".to_string()))?;

        let connection = Arc::new(Connection {
            process: Mutex::new(BridgeProcess {
                child,
                stdin: Some(stdin),
                lines: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        });

        connection
            .call("launch", json!({ "engine": engine.as_str(), "headless": headless }))
            .await
            .map_err(|e| launch_error(e.to_string()))?;
        debug!(engine = %engine, "playwright browser launched");

        Ok(Box::new(BridgeBrowser { connection }))
    }

    fn backend_name(&self) -> &str {
        "playwright"
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Request/response channel to one node process; one command in flight at a time
struct Connection {
    process: Mutex<BridgeProcess>,
}

impl Connection {
    async fn call(&self, command: &str, args: Value) -> BrowserResult<Value> {
        let mut process = self.process.lock().await;
        process.next_id += 1;
        let id = process.next_id;

        let mut message = match args {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        message.insert("id".to_string(), json!(id));
        message.insert("cmd".to_string(), json!(command));
        let mut line = Value::Object(message).to_string();
        line.push('\n');

        let stdin = process.stdin.as_mut().ok_or(BrowserError::Closed)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        loop {
            let Some(line) = process.lines.next_line().await? else {
                return Err(BrowserError::Closed);
            };
            let reply: BridgeReply = serde_json::from_str(&line)
                .map_err(|e| BrowserError::Protocol(format!("{}: {}", e, line)))?;
            if reply.id != Some(id) {
                warn!(expected = id, got = ?reply.id, "discarding stale bridge reply");
                continue;
            }
            return if reply.ok {
                Ok(reply.value)
            } else {
                Err(BrowserError::operation(
                    command,
                    reply.error.unwrap_or_else(|| "unknown error".to_string()),
                ))
            };
        }
    }

    /// Close stdin so the driver exits, then reap the process
    async fn shutdown(&self) {
        let mut process = self.process.lock().await;
        process.stdin.take();
        match tokio::time::timeout(EXIT_GRACE, process.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "bridge process exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to reap bridge process"),
            Err(_) => {
                warn!("bridge process did not exit; killing it");
                if let Err(e) = process.child.kill().await {
                    warn!(error = %e, "failed to kill bridge process");
                }
            }
        }
    }
}

fn handle_of(value: &Value, what: &str) -> BrowserResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| BrowserError::Protocol(format!("expected {} handle, got {}", what, value)))
}

struct BridgeBrowser {
    connection: Arc<Connection>,
}

#[async_trait]
impl Browser for BridgeBrowser {
    async fn new_context(
        &self,
        viewport: Viewport,
        user_agent: &str,
    ) -> BrowserResult<Box<dyn BrowserContext>> {
        let value = self
            .connection
            .call(
                "new_context",
                json!({
                    "width": viewport.width,
                    "height": viewport.height,
                    "user_agent": user_agent,
                }),
            )
            .await?;
        Ok(Box::new(BridgeContext {
            connection: Arc::clone(&self.connection),
            handle: handle_of(&value, "context")?,
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        let result = self.connection.call("close", json!({})).await.map(|_| ());
        self.connection.shutdown().await;
        result
    }
}

struct BridgeContext {
    connection: Arc<Connection>,
    handle: u64,
}

#[async_trait]
impl BrowserContext for BridgeContext {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        let value = self
            .connection
            .call("new_page", json!({ "context": self.handle }))
            .await?;
        Ok(Box::new(BridgePage {
            connection: Arc::clone(&self.connection),
            handle: handle_of(&value, "page")?,
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        self.connection
            .call("close_context", json!({ "context": self.handle }))
            .await
            .map(|_| ())
    }
}

struct BridgePage {
    connection: Arc<Connection>,
    handle: u64,
}

impl BridgePage {
    async fn call(&self, command: &str, mut args: Value) -> BrowserResult<Value> {
        args["page"] = json!(self.handle);
        self.connection.call(command, args).await
    }
}

#[async_trait]
impl Page for BridgePage {
    async fn goto(&self, url: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.call(
            "goto",
            json!({ "url": url, "timeout": timeout_ms }),
        )
        .await
        .map(|_| ())
    }

    async fn click(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.call("click", json!({ "selector": selector, "timeout": timeout_ms }))
            .await
            .map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        self.call(
            "fill",
            json!({ "selector": selector, "text": text, "timeout": FILL_TIMEOUT_MS }),
        )
        .await
        .map(|_| ())
    }

    async fn screenshot(&self, full_page: bool) -> BrowserResult<Vec<u8>> {
        let value = self
            .call("screenshot", json!({ "full_page": full_page }))
            .await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("screenshot was not a string".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::Protocol(format!("invalid screenshot encoding: {}", e)))
    }

    async fn title(&self) -> BrowserResult<String> {
        let value = self.call("title", json!({})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.call(
            "wait_for_selector",
            json!({ "selector": selector, "timeout": timeout_ms }),
        )
        .await
        .map(|_| ())
    }

    async fn wait_for_timeout(&self, ms: u64) -> BrowserResult<()> {
        self.call("wait_for_timeout", json!({ "ms": ms }))
            .await
            .map(|_| ())
    }
}
