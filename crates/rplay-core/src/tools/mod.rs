//! Tool registry for managed-agent function calls
//!
//! Every tool is read-only: it answers from the per-request [`ToolContext`]
//! (or echoes its arguments back) and never mutates router state.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{BuiltinCatalog, ContextStore};
use crate::types::{ClientProfile, Competency, Objective, PersonalitySettings, Rubric, SimulationSettings};

pub mod client;
pub mod evaluation;
pub mod guidance;
pub mod profile;

/// Function tool advertised to a remote agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Context bundle tool calls are resolved against
#[derive(Clone)]
pub struct ToolContext {
    pub profile: Option<ClientProfile>,
    pub personality: PersonalitySettings,
    pub simulation: SimulationSettings,
    pub competencies: Vec<Competency>,
    pub rubrics: Vec<Rubric>,
    pub objectives: Vec<Objective>,
    pub catalog: Arc<dyn ContextStore>,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            profile: None,
            personality: PersonalitySettings::default(),
            simulation: SimulationSettings::default(),
            competencies: Vec::new(),
            rubrics: Vec::new(),
            objectives: Vec::new(),
            catalog: Arc::new(BuiltinCatalog),
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("profile", &self.profile.as_ref().map(|p| p.display_name()))
            .field("simulation", &self.simulation)
            .field("competencies", &self.competencies.len())
            .field("rubrics", &self.rubrics.len())
            .field("objectives", &self.objectives.len())
            .finish()
    }
}

impl ToolContext {
    pub fn with_catalog(catalog: Arc<dyn ContextStore>) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }
}

/// Individual tool handler
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every built-in simulation tool
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(client::GetClientProfileTool));
        registry.register(Arc::new(client::GetEmotionalStateTool));
        registry.register(Arc::new(client::TrackObjectivesTool));
        registry.register(Arc::new(evaluation::GetCompetenciesTool));
        registry.register(Arc::new(evaluation::GetRubricsTool));
        registry.register(Arc::new(evaluation::CalculateScoresTool));
        registry.register(Arc::new(evaluation::TrackObjectiveProgressTool));
        registry.register(Arc::new(profile::GetIndustrySettingsTool));
        registry.register(Arc::new(profile::GetDifficultySettingsTool));
        registry.register(Arc::new(profile::ValidateProfileTool));
        registry.register(Arc::new(guidance::GetObjectivesTool));
        registry.register(Arc::new(guidance::GetSimulationContextTool));
        registry
    }

    /// Register a tool handler
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, handler);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool definitions for only the named tools, in the order given
    pub fn filter_tools(&self, names: &[&str]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(*name))
            .map(|handler| ToolDefinition {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                parameters: handler.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, tool_name: &str, input: Value, ctx: &ToolContext) -> Result<Value> {
        debug!("Executing tool: {} with input: {:?}", tool_name, input);

        let handler = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        match handler.execute(input, ctx).await {
            Ok(result) => {
                debug!("Tool {} succeeded", tool_name);
                Ok(result)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_name, e);
                Err(e)
            }
        }
    }

    /// Resolve a tool call into the JSON string submitted back to the agent.
    /// Failures become an `{"error": ...}` payload so the run can continue.
    pub async fn resolve(&self, tool_name: &str, arguments: &str, ctx: &ToolContext) -> String {
        let input = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str(arguments) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Tool {} got malformed arguments: {}", tool_name, e);
                    return error_payload(format!("Invalid arguments for {}: {}", tool_name, e));
                }
            }
        };

        match self.execute(tool_name, input, ctx).await {
            Ok(value) => value.to_string(),
            Err(e) => error_payload(e.to_string()),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn error_payload(message: String) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Helper function to create a JSON schema for tool input
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
