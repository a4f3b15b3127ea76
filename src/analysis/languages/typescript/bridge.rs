//! Out-of-process syntax tree producer for script sources.
//!
//! Each parse spawns `node` running an embedded script that loads
//! `@babel/parser`, feeds it the source on stdin and reads the program
//! tree as JSON from stdout. Parses are capped in number and bounded in
//! time; any failure is a [`BridgeError`] that callers answer with the
//! line-oriented fallback.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::BridgeConfig;

const SCRIPT: &str = include_str!("bridge.js");

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parser timed out after {0:?}")]
    Timeout(Duration),
    #[error("parser exited with status {status}: {stderr}")]
    Exit { status: i32, stderr: String },
    #[error("undecodable parser output: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("i/o error talking to parser: {0}")]
    Io(#[from] std::io::Error),
    #[error("bridge unavailable: {0}")]
    Unavailable(String),
}

pub struct BabelBridge {
    node_binary: String,
    parser_module: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    permits: Arc<Semaphore>,
    runtime: Runtime,
}

impl BabelBridge {
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        Ok(Self {
            node_binary: config.node_binary.clone(),
            parser_module: config.parser_module.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            working_dir: None,
            permits: Arc::new(Semaphore::new(config.concurrency().max(1))),
            runtime,
        })
    }

    /// Directory node resolves the parser module from, usually the repository root.
    pub fn with_working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Parse an empty program once to check that node and the parser
    /// module can be started from the working directory.
    pub fn probe(&self) -> Result<(), BridgeError> {
        self.parse("").map(|_| ())
    }

    /// Parse `source`, blocking the calling thread.
    ///
    /// Must not be called from inside an async context.
    pub fn parse(&self, source: &str) -> Result<Value, BridgeError> {
        self.runtime.block_on(self.parse_async(source))
    }

    pub async fn parse_async(&self, source: &str) -> Result<Value, BridgeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;

        match timeout(self.timeout, self.run(source)).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(self.timeout)),
        }
    }

    async fn run(&self, source: &str) -> Result<Value, BridgeError> {
        let mut cmd = Command::new(&self.node_binary);
        cmd.arg("-e")
            .arg(SCRIPT)
            .env("GROUNDCHECK_PARSER_MODULE", &self.parser_module)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| BridgeError::Spawn {
            binary: self.node_binary.clone(),
            source,
        })?;

        // The script reads all of stdin before it writes anything. A child
        // that exits early reports through its exit status below.
        if let Some(mut stdin) = child.stdin.take() {
            if stdin.write_all(source.as_bytes()).await.is_ok() {
                let _ = stdin.shutdown().await;
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(BridgeError::Exit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let config = BridgeConfig {
            node_binary: "groundcheck-no-such-node-binary".into(),
            ..BridgeConfig::default()
        };
        let bridge = BabelBridge::new(&config).unwrap();
        let err = bridge.parse("const a = 1;").unwrap_err();
        assert!(matches!(err, BridgeError::Spawn { .. }));
        assert!(matches!(bridge.probe(), Err(BridgeError::Spawn { .. })));
    }

    #[test]
    fn test_parses_when_node_and_babel_are_present() {
        let bridge = BabelBridge::new(&BridgeConfig::default()).unwrap();
        match bridge.parse("export const App = () => <div />;") {
            Ok(program) => assert_eq!(program["type"], "Program"),
            // Skips itself when node or @babel/parser is unavailable.
            Err(BridgeError::Spawn { .. })
            | Err(BridgeError::Exit { .. })
            | Err(BridgeError::Timeout(_)) => {}
            Err(e) => panic!("unexpected bridge error: {}", e),
        }
    }
}
