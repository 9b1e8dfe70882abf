//! Client for the managed agent REST API (Assistants-style)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::definition::AgentDefinition;
use crate::tools::ToolDefinition;

/// A remote agent as reported by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteAgent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Still working; poll again
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }
}

/// A function call the agent is waiting on
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// One execution of an agent over a thread
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    pub tool_calls: Vec<ToolCall>,
    pub last_error: Option<String>,
}

/// Operations the router needs from the managed agent service
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<RemoteAgent>>;
    async fn create_agent(&self, definition: &AgentDefinition, tools: &[ToolDefinition]) -> Result<RemoteAgent>;
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
    async fn create_thread(&self) -> Result<String>;
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()>;
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run>;
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;
    async fn submit_tool_outputs(&self, thread_id: &str, run_id: &str, outputs: &[ToolOutput]) -> Result<Run>;
    /// Stop a run so the thread accepts new messages again
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;
    /// Text of the newest assistant message on the thread
    async fn latest_assistant_text(&self, thread_id: &str) -> Result<Option<String>>;
}

/// HTTP implementation of [`AgentService`]
pub struct HttpAgentService {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl std::fmt::Debug for HttpAgentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAgentService")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl HttpAgentService {
    pub fn new(endpoint: &str, api_key: String, api_version: String, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(endpoint)
            .with_context(|| format!("Invalid agent service endpoint: {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("Agent service endpoint must be http(s): {}", endpoint));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.endpoint, path))
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to agent service", what))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Agent service {} failed with status {}: {}",
                what,
                status,
                error_text
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse agent service {} response", what))
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn list_agents(&self) -> Result<Vec<RemoteAgent>> {
        let mut agents = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut req = self
                .request(reqwest::Method::GET, "/assistants")
                .query(&[("limit", "100")]);
            if let Some(cursor) = &after {
                req = req.query(&[("after", cursor.as_str())]);
            }

            let page: ListPage<RemoteAgent> = self.send(req, "list agents").await?;
            let last = page.data.last().map(|a| a.id.clone());
            agents.extend(page.data);

            match (page.has_more, last) {
                (true, Some(id)) => after = Some(id),
                _ => break,
            }
        }

        debug!("Agent service lists {} agents", agents.len());
        Ok(agents)
    }

    async fn create_agent(&self, definition: &AgentDefinition, tools: &[ToolDefinition]) -> Result<RemoteAgent> {
        let body = serde_json::json!({
            "model": definition.model,
            "name": definition.name,
            "instructions": definition.instructions,
            "tools": tools.iter().map(|t| serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })).collect::<Vec<_>>(),
        });
        let req = self.request(reqwest::Method::POST, "/assistants").json(&body);
        self.send(req, "create agent").await
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let req = self.request(reqwest::Method::DELETE, &format!("/assistants/{}", agent_id));
        let _: serde_json::Value = self.send(req, "delete agent").await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        let req = self
            .request(reqwest::Method::POST, "/threads")
            .json(&serde_json::json!({}));
        let thread: IdOnly = self.send(req, "create thread").await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let req = self
            .request(reqwest::Method::POST, &format!("/threads/{}/messages", thread_id))
            .json(&serde_json::json!({ "role": "user", "content": content }));
        let _: IdOnly = self.send(req, "add message").await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let req = self
            .request(reqwest::Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&serde_json::json!({ "assistant_id": agent_id }));
        let run: WireRun = self.send(req, "create run").await?;
        Ok(run.into())
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let req = self.request(
            reqwest::Method::GET,
            &format!("/threads/{}/runs/{}", thread_id, run_id),
        );
        let run: WireRun = self.send(req, "get run").await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(&self, thread_id: &str, run_id: &str, outputs: &[ToolOutput]) -> Result<Run> {
        let req = self
            .request(
                reqwest::Method::POST,
                &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            )
            .json(&serde_json::json!({ "tool_outputs": outputs }));
        let run: WireRun = self.send(req, "submit tool outputs").await?;
        Ok(run.into())
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        let req = self.request(
            reqwest::Method::POST,
            &format!("/threads/{}/runs/{}/cancel", thread_id, run_id),
        );
        let _: WireRun = self.send(req, "cancel run").await?;
        Ok(())
    }

    async fn latest_assistant_text(&self, thread_id: &str) -> Result<Option<String>> {
        let req = self
            .request(reqwest::Method::GET, &format!("/threads/{}/messages", thread_id))
            .query(&[("order", "desc"), ("limit", "20")]);
        let page: ListPage<WireMessage> = self.send(req, "list messages").await?;

        let text = page
            .data
            .into_iter()
            .find(|m| m.role == "assistant")
            .and_then(|m| {
                m.content
                    .into_iter()
                    .find_map(|c| c.text.map(|t| t.value))
            });
        Ok(text)
    }
}

// ── Agent service wire types ──

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireRun {
    id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<WireRequiredAction>,
    #[serde(default)]
    last_error: Option<WireRunError>,
}

#[derive(Debug, Deserialize)]
struct WireRequiredAction {
    #[serde(default)]
    submit_tool_outputs: Option<WireSubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
struct WireSubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireRunError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Vec<WireMessageContent>,
}

#[derive(Debug, Deserialize)]
struct WireMessageContent {
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    value: String,
}

impl From<WireRun> for Run {
    fn from(run: WireRun) -> Self {
        let tool_calls = run
            .required_action
            .and_then(|a| a.submit_tool_outputs)
            .map(|s| {
                s.tool_calls
                    .into_iter()
                    .map(|c| ToolCall {
                        id: c.id,
                        name: c.function.name,
                        arguments: c.function.arguments,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: run.id,
            status: run.status,
            tool_calls,
            last_error: run.last_error.map(|e| e.message),
        }
    }
}
