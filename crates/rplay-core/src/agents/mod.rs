//! Managed agents: definitions, the remote agent service, and the agent pool

pub mod definition;
pub mod managed;
pub mod pool;
pub mod service;

pub use definition::{AgentDefinition, AgentKind, default_definitions};
pub use managed::{AgentReply, ManagedAgent, RunLimits, ToolCallRecord};
pub use pool::{AgentPool, AgentStatus, PoolStatus};
pub use service::{AgentService, HttpAgentService, RemoteAgent, Run, RunStatus, ToolCall, ToolOutput};
