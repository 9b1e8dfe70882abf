//! Tools for the expert-guidance agent

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ToolContext, ToolHandler, json_schema};
use crate::catalog::default_competencies;
use crate::types::Objective;

pub struct GetObjectivesTool;

#[async_trait]
impl ToolHandler for GetObjectivesTool {
    fn name(&self) -> &str {
        "get_objectives"
    }

    fn description(&self) -> &str {
        "Get the current objectives and their progress in the simulation."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let objectives = if ctx.objectives.is_empty() {
            default_competencies()
                .into_iter()
                .map(|c| Objective {
                    name: c.name,
                    progress: 0.0,
                })
                .collect()
        } else {
            ctx.objectives.clone()
        };

        let overall = objectives.iter().map(|o| o.progress).sum::<f64>() / objectives.len().max(1) as f64;

        Ok(json!({
            "objectives": objectives,
            "overall_progress": overall,
        }))
    }
}

pub struct GetSimulationContextTool;

#[async_trait]
impl ToolHandler for GetSimulationContextTool {
    fn name(&self) -> &str {
        "get_simulation_context"
    }

    fn description(&self) -> &str {
        "Get the simulation context including client profile, industry, and difficulty."
    }

    fn input_schema(&self) -> Value {
        json_schema(json!({}), vec![])
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<Value> {
        let sim = &ctx.simulation;
        let client = match &ctx.profile {
            Some(p) => json!({
                "name": p.display_name(),
                "occupation": or_unknown(&p.occupation),
                "goals": p.goals,
                "concerns": p.concerns,
            }),
            None => json!({
                "name": "Unknown",
                "occupation": "Unknown",
                "goals": [],
                "concerns": [],
            }),
        };

        Ok(json!({
            "industry": or_unknown(&sim.industry),
            "subcategory": sim.subcategory,
            "difficulty": sim.difficulty.as_str(),
            "competencies": sim.competencies,
            "client": client,
        }))
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "Unknown" } else { s }
}
