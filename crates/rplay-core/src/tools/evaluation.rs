//! Tools for the evaluation agent

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{ToolContext, ToolHandler, json_schema};
use crate::catalog::{default_competencies, default_rubrics};

pub struct GetCompetenciesTool;

#[async_trait]
impl ToolHandler for GetCompetenciesTool {
    fn name(&self) -> &str {
        "get_competencies"
    }

    fn description(&self) -> &str {
        "Get the competency definitions being evaluated."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let competencies = if ctx.competencies.is_empty() {
            default_competencies()
        } else {
            ctx.competencies.clone()
        };
        Ok(serde_json::to_value(competencies)?)
    }
}

pub struct GetRubricsTool;

#[async_trait]
impl ToolHandler for GetRubricsTool {
    fn name(&self) -> &str {
        "get_rubrics"
    }

    fn description(&self) -> &str {
        "Get the evaluation rubrics with criteria and weights."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let rubrics = if ctx.rubrics.is_empty() {
            default_rubrics()
        } else {
            ctx.rubrics.clone()
        };
        Ok(serde_json::to_value(rubrics)?)
    }
}

/// Collates the agent's own observations into a per-competency map
pub struct CalculateScoresTool;

#[async_trait]
impl ToolHandler for CalculateScoresTool {
    fn name(&self) -> &str {
        "calculate_scores"
    }

    fn description(&self) -> &str {
        "Calculate competency scores based on observations."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "observations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "competency": {"type": "string"},
                            "score": {"type": "number"},
                            "evidence": {"type": "string"}
                        }
                    },
                    "description": "List of competency observations with scores and evidence"
                }
            }),
            vec!["observations"],
        )
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value> {
        let mut scores = Map::new();
        let observations = input
            .get("observations")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for obs in observations {
            let competency = obs
                .get("competency")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            scores.insert(
                competency,
                json!({
                    "score": obs.get("score").cloned().unwrap_or(json!(0)),
                    "evidence": obs.get("evidence").cloned().unwrap_or(json!("")),
                }),
            );
        }

        Ok(json!({ "calculated_scores": scores }))
    }
}

/// Structured channel for objective progress; the arguments are echoed back
/// and also picked up by the router when the final text is not JSON.
pub struct TrackObjectiveProgressTool;

pub const TRACK_OBJECTIVE_PROGRESS: &str = "track_objective_progress";

#[async_trait]
impl ToolHandler for TrackObjectiveProgressTool {
    fn name(&self) -> &str {
        TRACK_OBJECTIVE_PROGRESS
    }

    fn description(&self) -> &str {
        "Track progress on simulation objectives based on the conversation."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "rapport": {
                    "type": "number",
                    "description": "Progress percentage (0-100) on building rapport"
                },
                "needs": {
                    "type": "number",
                    "description": "Progress percentage (0-100) on needs assessment"
                },
                "objections": {
                    "type": "number",
                    "description": "Progress percentage (0-100) on handling objections"
                },
                "recommendations": {
                    "type": "number",
                    "description": "Progress percentage (0-100) on providing recommendations"
                },
                "explanation": {
                    "type": "string",
                    "description": "Brief explanation of progress assessment"
                }
            }),
            vec!["rapport", "needs", "objections", "recommendations", "explanation"],
        )
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value> {
        let field = |name: &str, default: Value| input.get(name).cloned().unwrap_or(default);
        Ok(json!({
            "rapport": field("rapport", json!(0)),
            "needs": field("needs", json!(0)),
            "objections": field("objections", json!(0)),
            "recommendations": field("recommendations", json!(0)),
            "explanation": field("explanation", json!("")),
        }))
    }
}
