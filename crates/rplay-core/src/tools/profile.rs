//! Tools for the profile-generation agent

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ToolContext, ToolHandler, json_schema};
use crate::types::Difficulty;

const REQUIRED_FIELDS: [&str; 4] = ["name", "age", "occupation", "goals"];
const RECOMMENDED_FIELDS: [&str; 4] = ["income", "family", "concerns", "background"];

pub struct GetIndustrySettingsTool;

#[async_trait]
impl ToolHandler for GetIndustrySettingsTool {
    fn name(&self) -> &str {
        "get_industry_settings"
    }

    fn description(&self) -> &str {
        "Get industry-specific settings including common concerns, goals, and terminology."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "industry": {
                    "type": "string",
                    "description": "The industry to get settings for"
                }
            }),
            vec!["industry"],
        )
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let industry = input
            .get("industry")
            .and_then(|v| v.as_str())
            .unwrap_or(&ctx.simulation.industry);
        Ok(serde_json::to_value(ctx.catalog.industry_settings(industry))?)
    }
}

pub struct GetDifficultySettingsTool;

#[async_trait]
impl ToolHandler for GetDifficultySettingsTool {
    fn name(&self) -> &str {
        "get_difficulty_settings"
    }

    fn description(&self) -> &str {
        "Get difficulty level parameters including complexity requirements."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "level": {
                    "type": "string",
                    "description": "The difficulty level (beginner, intermediate, advanced)"
                }
            }),
            vec!["level"],
        )
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value> {
        let difficulty = input
            .get("level")
            .and_then(|v| v.as_str())
            .map(Difficulty::from_name)
            .unwrap_or(ctx.simulation.difficulty);
        Ok(serde_json::to_value(ctx.catalog.difficulty_settings(difficulty))?)
    }
}

pub struct ValidateProfileTool;

#[async_trait]
impl ToolHandler for ValidateProfileTool {
    fn name(&self) -> &str {
        "validate_profile"
    }

    fn description(&self) -> &str {
        "Validate that a generated profile has all required fields."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            json!({
                "profile": {
                    "type": "object",
                    "description": "The profile object to validate"
                }
            }),
            vec!["profile"],
        )
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value> {
        let profile = input.get("profile").cloned().unwrap_or(json!({}));

        let missing: Vec<&str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|f| profile.get(*f).is_none_or(is_blank))
            .collect();
        let has_all_recommended = RECOMMENDED_FIELDS
            .into_iter()
            .all(|f| profile.get(f).is_some());

        Ok(json!({
            "valid": missing.is_empty(),
            "missing_fields": missing,
            "has_all_recommended": has_all_recommended,
        }))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
