//! Tools for the simulated client persona

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{ToolContext, ToolHandler, json_schema};

pub struct GetClientProfileTool;

#[async_trait]
impl ToolHandler for GetClientProfileTool {
    fn name(&self) -> &str {
        "get_client_profile"
    }

    fn description(&self) -> &str {
        "Get the current client profile including name, age, occupation, income, goals, and background."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let Some(profile) = &ctx.profile else {
            return Ok(json!({
                "name": "Unknown Client",
                "age": "Unknown",
                "occupation": "Unknown",
                "income": "Unknown",
                "family": "Unknown",
                "goals": [],
                "concerns": [],
                "background": "",
            }));
        };

        let or_unknown = |s: &str| if s.is_empty() { "Unknown".to_string() } else { s.to_string() };
        let name = if profile.name.is_empty() {
            "Unknown Client"
        } else {
            profile.name.as_str()
        };

        Ok(json!({
            "name": name,
            "age": profile.age.map(Value::from).unwrap_or_else(|| Value::from("Unknown")),
            "occupation": or_unknown(&profile.occupation),
            "income": or_unknown(&profile.income),
            "family": or_unknown(&profile.family),
            "goals": profile.goals,
            "concerns": profile.concerns,
            "background": profile.background,
        }))
    }
}

pub struct GetEmotionalStateTool;

#[async_trait]
impl ToolHandler for GetEmotionalStateTool {
    fn name(&self) -> &str {
        "get_emotional_state"
    }

    fn description(&self) -> &str {
        "Get the client's current emotional state and mood for appropriate response tone."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let difficulty = ctx.simulation.difficulty;
        Ok(json!({
            "mood": ctx.personality.mood,
            "archetype": ctx.personality.archetype,
            "difficulty": difficulty.as_str(),
            "traits": ctx.personality.traits,
            "guidelines": difficulty.guidelines(),
        }))
    }
}

/// Lets the persona note how the advisor is doing. The values are echoed, not stored.
pub struct TrackObjectivesTool;

#[async_trait]
impl ToolHandler for TrackObjectivesTool {
    fn name(&self) -> &str {
        "track_objectives"
    }

    fn description(&self) -> &str {
        "Track and evaluate progress on conversation objectives like rapport building and needs assessment."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "rapport_progress": {
                    "type": "number",
                    "description": "Progress on building rapport (0-100)"
                },
                "needs_progress": {
                    "type": "number",
                    "description": "Progress on needs assessment (0-100)"
                },
                "observation": {
                    "type": "string",
                    "description": "Brief observation about advisor's approach"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value> {
        debug!("Objectives tracked: {}", input);
        Ok(json!({
            "status": "tracked",
            "rapport": input.get("rapport_progress").cloned().unwrap_or(json!(0)),
            "needs": input.get("needs_progress").cloned().unwrap_or(json!(0)),
        }))
    }
}
