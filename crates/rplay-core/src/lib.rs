//! rplay-core - AI response routing for the advisor training simulator
//!
//! This crate provides:
//! - The AI response router with managed-agent first, direct-completion second fallback
//! - Managed agent pool with per-session thread affinity and a tool-call loop
//! - HTTP clients for the agent service and the OpenAI chat-completions API
//! - Read-only tools, prompts, and output parsing for each use case
//! - A JSON-file context catalog of competencies and rubrics

pub mod agents;
pub mod catalog;
pub mod config;
pub mod error;
pub mod parse;
pub mod prompts;
pub mod providers;
pub mod requests;
pub mod router;
pub mod session;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentDefinition, AgentKind, AgentPool, AgentService, HttpAgentService, ManagedAgent, RunLimits};
pub use catalog::{BuiltinCatalog, ContextStore, JsonCatalog};
pub use config::RouterConfig;
pub use error::{RouterError, RouterResult, Tier, TransportError};
pub use providers::{CompletionOptions, CompletionProvider, OpenAiProvider};
pub use requests::{
    ClientReply, ClientResponseContext, GeneratedProfile, Guidance, GuidanceContext,
    ObjectiveEvaluation, ProfileRequest, Review, ReviewContext, Starter,
};
pub use router::{AiRouter, HealthReport, HealthState, RouterStatus};
pub use session::{SessionThread, SessionThreads};
pub use tools::{ToolContext, ToolHandler, ToolRegistry};
pub use types::{
    ClientProfile, ConversationTurn, Difficulty, ObjectiveProgress, PerformanceReview,
    ResponseSource, TurnRole,
};
