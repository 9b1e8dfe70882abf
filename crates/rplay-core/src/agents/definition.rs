//! Agent definitions: identity, instructions, model, and tool set

use serde::{Deserialize, Serialize};

use crate::prompts::{
    EVALUATION_INSTRUCTIONS, EXPERT_GUIDANCE_INSTRUCTIONS, PROFILE_GENERATION_INSTRUCTIONS,
    SIMULATION_CLIENT_INSTRUCTIONS,
};

/// The four managed agents, one per family of use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    SimulationClient,
    ProfileGeneration,
    Evaluation,
    ExpertGuidance,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        Self::SimulationClient,
        Self::ProfileGeneration,
        Self::Evaluation,
        Self::ExpertGuidance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SimulationClient => "simulation-client",
            Self::ProfileGeneration => "profile-generation",
            Self::Evaluation => "evaluation",
            Self::ExpertGuidance => "expert-guidance",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Self::SimulationClient => SIMULATION_CLIENT_INSTRUCTIONS,
            Self::ProfileGeneration => PROFILE_GENERATION_INSTRUCTIONS,
            Self::Evaluation => EVALUATION_INSTRUCTIONS,
            Self::ExpertGuidance => EXPERT_GUIDANCE_INSTRUCTIONS,
        }
    }

    /// Names of the tools this agent may call
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Self::SimulationClient => &["get_client_profile", "get_emotional_state", "track_objectives"],
            Self::ProfileGeneration => &[
                "get_industry_settings",
                "get_difficulty_settings",
                "validate_profile",
            ],
            Self::Evaluation => &[
                "get_competencies",
                "get_rubrics",
                "calculate_scores",
                "track_objective_progress",
            ],
            Self::ExpertGuidance => &["get_objectives", "get_simulation_context"],
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to look up or create one remote agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub kind: AgentKind,
    /// Remote name, including the configured prefix
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<String>,
}

impl AgentDefinition {
    pub fn new(kind: AgentKind, name_prefix: &str, model: impl Into<String>) -> Self {
        Self {
            kind,
            name: format!("{}{}", name_prefix, kind.as_str()),
            model: model.into(),
            instructions: kind.instructions().to_string(),
            tools: kind.tool_names().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Check if a tool is allowed for this agent
    pub fn is_tool_allowed(&self, tool_name: &str) -> bool {
        self.tools.iter().any(|t| t == tool_name)
    }

    pub fn tool_name_refs(&self) -> Vec<&str> {
        self.tools.iter().map(|s| s.as_str()).collect()
    }
}

/// Definitions for every agent the router uses
pub fn default_definitions(name_prefix: &str, model: &str) -> Vec<AgentDefinition> {
    AgentKind::ALL
        .iter()
        .map(|kind| AgentDefinition::new(*kind, name_prefix, model))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    #[test]
    fn test_definition_name_prefixed() {
        let def = AgentDefinition::new(AgentKind::Evaluation, "rplay-", "gpt-4o");
        assert_eq!(def.name, "rplay-evaluation");
        assert_eq!(def.model, "gpt-4o");
        assert!(def.is_tool_allowed("get_rubrics"));
        assert!(!def.is_tool_allowed("get_client_profile"));
    }

    #[test]
    fn test_every_declared_tool_is_registered() {
        let registry = ToolRegistry::with_builtin_tools();
        for def in default_definitions("rplay-", "gpt-4o") {
            let defs = registry.filter_tools(&def.tool_name_refs());
            assert_eq!(defs.len(), def.tools.len(), "missing tool for {}", def.kind);
        }
    }

    #[test]
    fn test_agent_kind_serde() {
        assert_eq!(
            serde_json::to_string(&AgentKind::ExpertGuidance).unwrap(),
            "\"expert-guidance\""
        );
        assert_eq!(AgentKind::SimulationClient.to_string(), "simulation-client");
    }
}
