//! Command transport seam.
//!
//! The codec never opens a connection itself. Anything that can send a
//! command string and hand back the raw response (serial, TCP, VISA) plugs in
//! through [`CommandTransport`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Sends command strings to an instrument.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send a query command and return the raw response.
    async fn query(&self, command: &str) -> Result<String>;

    /// Send a command without expecting a response.
    async fn command(&self, command: &str) -> Result<()>;
}

/// In-memory transport with scripted responses.
///
/// Responses queued for a command are returned in order; a query with no
/// queued response fails. Every command and query is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<String>>>,
    sent: Mutex<Vec<String>>,
}

impl MockTransport {
    /// A transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for the next `query(command)`.
    pub async fn respond(&self, command: &str, response: impl Into<String>) {
        self.responses
            .lock()
            .await
            .entry(command.to_string())
            .or_default()
            .push_back(response.into());
    }

    /// Builder form of [`MockTransport::respond`] for use before sharing.
    pub fn with_response(mut self, command: &str, response: impl Into<String>) -> Self {
        self.responses
            .get_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(response.into());
        self
    }

    /// Everything sent so far, oldest first.
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl CommandTransport for MockTransport {
    async fn query(&self, command: &str) -> Result<String> {
        self.sent.lock().await.push(command.to_string());
        self.responses
            .lock()
            .await
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| anyhow!("no scripted response for '{command}'"))
    }

    async fn command(&self, command: &str) -> Result<()> {
        self.sent.lock().await.push(command.to_string());
        Ok(())
    }
}
