//! Shared test utilities for integration tests
//!
//! Provides a scripted transport that records every call, and isolated environment
//! setup for configuration tests.

use async_trait::async_trait;
use nanoforge::error::AttemptError;
use nanoforge::provider::{GenerationTransport, HttpExchange};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Reply for one scripted call.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, Value),
    Network(&'static str),
}

impl Reply {
    pub fn image(data: &str) -> Self {
        Reply::Status(
            200,
            json!({"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": data}}]}}]}),
        )
    }

    pub fn text(content: &str) -> Self {
        Reply::Status(
            200,
            json!({"candidates": [{"content": {"parts": [{"text": content}]}}]}),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: Option<Value>,
}

type Script = dyn Fn(usize, &str) -> Reply + Send + Sync;

/// Transport answering from a closure of (call number, url).
pub struct ScriptedTransport {
    script: Box<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize, &str) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn answer(&self, url: &str, body: Option<&Value>) -> Result<HttpExchange, AttemptError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                url: url.to_string(),
                body: body.cloned(),
            });
            calls.len() - 1
        };
        match (self.script)(call, url) {
            Reply::Status(status, body) => Ok(HttpExchange {
                status,
                body: body.to_string(),
            }),
            Reply::Network(message) => Err(AttemptError::network(message)),
        }
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpExchange, AttemptError> {
        self.answer(url, Some(body))
    }

    async fn get(&self, url: &str) -> Result<HttpExchange, AttemptError> {
        self.answer(url, None)
    }
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

const ISOLATED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "NANOFORGE_ENV",
    "NANOFORGE__RETRY__MAX_ATTEMPTS",
    "NANOFORGE__API__API_KEY",
];

/// Run `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir` and nanoforge
/// variables cleared; `vars` are set on top. Everything is restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(&str, Option<String>)> = ISOLATED_VARS
        .iter()
        .map(|name| (*name, std::env::var(name).ok()))
        .collect();

    let home = test_dir.path().join("home");
    let config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&config_home).unwrap();

    for name in ISOLATED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", &config_home);
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = f();

    for (name, _) in vars {
        std::env::remove_var(name);
    }
    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    result
}
