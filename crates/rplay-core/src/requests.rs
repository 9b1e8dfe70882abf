//! Request contexts and normalized responses for each router operation
//!
//! Contexts accept the camelCase field names the simulator front end sends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{
    ClientProfile, Competency, Difficulty, Objective, ObjectiveProgress, PerformanceReview,
    PersonalitySettings, ResponseSource, Rubric, SimulationSettings,
};

/// Guidance replies are always tier 3 (expert)
pub const GUIDANCE_TIER: u8 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientResponseContext {
    #[serde(default, alias = "clientProfile")]
    pub profile: ClientProfile,
    #[serde(default, alias = "personalitySettings")]
    pub personality: PersonalitySettings,
    #[serde(default, alias = "simulationSettings")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReply {
    pub message: String,
    pub source: ResponseSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_progress: Option<ObjectiveProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Extra generation hints, passed through to the prompt
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedProfile {
    #[serde(flatten)]
    pub profile: ClientProfile,
    pub source: ResponseSource,
    pub parse_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Starter {
    pub message: String,
    pub source: ResponseSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewContext {
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub rubrics: Vec<Rubric>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    #[serde(flatten)]
    pub review: PerformanceReview,
    pub source: ResponseSource,
    pub parse_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveEvaluation {
    #[serde(flatten)]
    pub progress: ObjectiveProgress,
    pub source: ResponseSource,
    pub parse_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceContext {
    #[serde(default, alias = "clientProfile")]
    pub profile: ClientProfile,
    #[serde(default, alias = "simulationSettings")]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    pub message: String,
    pub tier: u8,
    pub source: ResponseSource,
}
