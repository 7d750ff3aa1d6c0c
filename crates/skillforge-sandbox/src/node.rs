//! Node-backed sandbox.
//!
//! Each session is one `node` child process running an embedded driver
//! script. The driver evaluates the submission inside a `vm` context
//! that exposes only the capability set from the execution profile,
//! then serves invocation requests over stdin/stdout. The host never
//! shares memory with the submission; if the wall-clock bound expires
//! the process is killed and any partial output discarded.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use skillforge_core::results::ExecutionOutcome;
use skillforge_core::traits::{ExecutionProfile, SandboxExecutor, SandboxSession, SessionStart};

use crate::protocol::{parse_event, DriverEvent, InvokeRequest};

/// Driver script executed by the child process. Reads the submission
/// path, entry point, and profile JSON from argv.
const DRIVER_JS: &str = r#"'use strict';
const vm = require('vm');
const fs = require('fs');
const readline = require('readline');

const [, , sourcePath, entryPoint, profileJson] = process.argv;
const profile = JSON.parse(profileJson);
const source = fs.readFileSync(sourcePath, 'utf8');

function send(event) {
  process.stdout.write(JSON.stringify(event) + '\n');
}

function message(err) {
  return String((err && err.message) || err);
}

// The capability set is the whole world the submission sees.
const capabilities = {
  console: { log() {}, error() {}, warn() {}, info() {} },
  setTimeout(fn, delay) {
    return setTimeout(fn, Math.min(delay || 0, 5000));
  },
  clearTimeout,
  Math,
  JSON,
};
if (profile.allow_network) {
  capabilities.fetch = () => Promise.reject(new Error('network access is disabled'));
}
const context = vm.createContext(capabilities);

let script;
try {
  script = new vm.Script(source, { filename: 'submission.js' });
} catch (err) {
  send({ event: 'syntax', message: message(err) });
  process.exit(0);
}
try {
  script.runInContext(context, { timeout: 5000 });
} catch (err) {
  send({ event: 'syntax', message: message(err) });
  process.exit(0);
}
const target = context[entryPoint];
if (typeof target !== 'function') {
  send({ event: 'syntax', message: 'entry point "' + entryPoint + '" is not a function' });
  process.exit(0);
}
send({ event: 'ready' });

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', async (line) => {
  let args;
  try {
    args = JSON.parse(line).args;
  } catch (err) {
    send({ event: 'error', message: 'malformed invocation: ' + message(err), stack: null });
    return;
  }
  try {
    const value = Array.isArray(args) ? target.apply(null, args) : target(args);
    const resolved = await Promise.resolve(value);
    send({ event: 'value', value: resolved === undefined ? null : resolved });
  } catch (err) {
    send({
      event: 'error',
      message: message(err),
      stack: err && err.stack ? String(err.stack) : null,
    });
  }
});
"#;

/// Sandbox backed by a `node` child process per session.
pub struct NodeSandbox {
    node_binary: String,
    startup_timeout: Duration,
}

impl NodeSandbox {
    pub fn new() -> Self {
        Self {
            node_binary: "node".to_string(),
            startup_timeout: Duration::from_secs(10),
        }
    }

    /// Use a specific `node` binary instead of resolving from PATH.
    pub fn with_node_binary(mut self, binary: &str) -> Self {
        self.node_binary = binary.to_string();
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

impl Default for NodeSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxExecutor for NodeSandbox {
    fn name(&self) -> &str {
        "node"
    }

    async fn start(&self, source: &str, profile: &ExecutionProfile) -> Result<SessionStart> {
        let work_dir = TempDir::new().context("failed to create sandbox directory")?;
        let submission_path = work_dir.path().join("submission.js");
        let driver_path = work_dir.path().join("driver.js");
        std::fs::write(&submission_path, source).context("failed to write submission")?;
        std::fs::write(&driver_path, DRIVER_JS).context("failed to write driver")?;

        let profile_json =
            serde_json::to_string(profile).context("failed to encode execution profile")?;

        let mut child = Command::new(&self.node_binary)
            .arg(&driver_path)
            .arg(&submission_path)
            .arg(&profile.entry_point)
            .arg(&profile_json)
            .current_dir(work_dir.path())
            .env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.node_binary))?;

        let stdin = child.stdin.take().context("child stdin unavailable")?;
        let stdout = child.stdout.take().context("child stdout unavailable")?;
        let mut lines = BufReader::new(stdout).lines();

        // Handshake: the driver announces readiness or a load failure.
        let first = tokio::time::timeout(self.startup_timeout, lines.next_line())
            .await
            .context("sandbox did not come up within the startup bound")?
            .context("failed to read from sandbox")?;
        let Some(line) = first else {
            bail!("sandbox exited before the handshake");
        };

        match parse_event(&line)? {
            DriverEvent::Ready => {
                tracing::debug!(sandbox = self.name(), "session ready");
                Ok(SessionStart::Ready(Box::new(NodeSession {
                    child,
                    stdin,
                    lines,
                    _work_dir: work_dir,
                    dead: false,
                })))
            }
            DriverEvent::Syntax { message } => {
                let _ = child.kill().await;
                Ok(SessionStart::SyntaxFailure(message))
            }
            other => bail!("unexpected handshake event: {other:?}"),
        }
    }
}

struct NodeSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    /// Keeps the sandbox directory alive for the session's lifetime.
    _work_dir: TempDir,
    dead: bool,
}

impl NodeSession {
    async fn kill(&mut self) {
        if !self.dead {
            self.dead = true;
            if let Err(err) = self.child.kill().await {
                tracing::warn!("failed to kill sandbox process: {err}");
            }
        }
    }
}

#[async_trait]
impl SandboxSession for NodeSession {
    async fn invoke(&mut self, args: &Value, timeout: Duration) -> ExecutionOutcome {
        if self.dead {
            return ExecutionOutcome::RuntimeFailure {
                message: "sandbox already terminated".to_string(),
                stack: None,
            };
        }

        let request = match serde_json::to_string(&InvokeRequest { args }) {
            Ok(request) => request,
            Err(err) => {
                return ExecutionOutcome::RuntimeFailure {
                    message: format!("failed to encode invocation: {err}"),
                    stack: None,
                };
            }
        };
        if let Err(err) = self.stdin.write_all(format!("{request}\n").as_bytes()).await {
            self.kill().await;
            return ExecutionOutcome::RuntimeFailure {
                message: format!("failed to reach sandbox: {err}"),
                stack: None,
            };
        }

        let reply = match tokio::time::timeout(timeout, self.lines.next_line()).await {
            Err(_) => {
                // Bound expired. Kill the unit; partial output is gone.
                self.kill().await;
                return ExecutionOutcome::TimedOut;
            }
            Ok(Err(err)) => {
                self.kill().await;
                return ExecutionOutcome::RuntimeFailure {
                    message: format!("failed to read from sandbox: {err}"),
                    stack: None,
                };
            }
            Ok(Ok(None)) => {
                self.kill().await;
                return ExecutionOutcome::RuntimeFailure {
                    message: "sandbox exited unexpectedly".to_string(),
                    stack: None,
                };
            }
            Ok(Ok(Some(line))) => line,
        };

        match parse_event(&reply).map(DriverEvent::into_outcome) {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => {
                self.kill().await;
                ExecutionOutcome::RuntimeFailure {
                    message: format!("malformed sandbox reply: {reply}"),
                    stack: None,
                }
            }
        }
    }

    async fn terminate(&mut self) {
        self.kill().await;
    }
}
