//! Simulation domain types shared by the router, agents, and providers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Who produced a turn in the simulated meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    #[serde(alias = "user")]
    Advisor,
    #[serde(alias = "assistant")]
    Client,
}

/// A single turn in the advisor/client conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    #[serde(alias = "content")]
    pub text: String,
}

impl ConversationTurn {
    pub fn advisor(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Advisor,
            text: text.into(),
        }
    }

    pub fn client(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Client,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            text: text.into(),
        }
    }
}

/// Which backend tier produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseSource {
    #[serde(rename = "managed-agent")]
    ManagedAgent,
    #[serde(rename = "direct-api")]
    DirectApi,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManagedAgent => "managed-agent",
            Self::DirectApi => "direct-api",
        }
    }
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Parse a difficulty name, falling back to beginner for anything unrecognized
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "intermediate" => Self::Intermediate,
            "advanced" => Self::Advanced,
            _ => Self::Beginner,
        }
    }

    /// Map a numeric simulation level onto a difficulty
    pub fn from_level(level: u32) -> Self {
        match level {
            0..=1 => Self::Beginner,
            2 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }

    /// Map a catalog rubric level (1-5) onto a difficulty
    pub fn from_rubric_level(level: u32) -> Self {
        match level {
            0..=2 => Self::Beginner,
            3..=4 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }

    /// Numeric rubric level used by the catalog (1, 3, 5)
    pub fn rubric_level(&self) -> u32 {
        match self {
            Self::Beginner => 1,
            Self::Intermediate => 3,
            Self::Advanced => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// How the simulated client should behave at this difficulty
    pub fn guidelines(&self) -> &'static str {
        match self {
            Self::Beginner => {
                "Be friendly, cooperative, and open. Provide information readily when asked. \
                 You have basic financial knowledge but need explanations for industry-specific concepts."
            }
            Self::Intermediate => {
                "Be somewhat reserved and hesitant to share all information immediately. \
                 Some of your financial details and goals should only be revealed when asked \
                 specifically or when trust is established."
            }
            Self::Advanced => {
                "Be skeptical, challenging, and resistant initially. You should question \
                 recommendations, raise objections, and only reveal sensitive information \
                 after significant trust-building."
            }
        }
    }
}

// Accepts names in any case as well as numeric levels
impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Level(u32),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Name(name) => Self::from_name(&name),
            Raw::Level(level) => Self::from_level(level),
        })
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The simulated client. Generated once per simulation and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub income: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub personality_traits: Vec<String>,
    #[serde(default)]
    pub communication_style: String,
    /// Anything else the generator produced
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Generators sometimes emit the age as a string ("45") or a float
fn lenient_age<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u32),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl ClientProfile {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unknown"
        } else {
            &self.name
        }
    }

    /// Profile returned when a generator's output could not be parsed
    pub fn placeholder(background: &str) -> Self {
        Self {
            name: "Generated Client".to_string(),
            age: Some(40),
            occupation: "Professional".to_string(),
            income: "$75,000 - $100,000".to_string(),
            family: "Not specified".to_string(),
            goals: vec!["Financial planning".to_string()],
            concerns: vec!["General financial concerns".to_string()],
            background: background.chars().take(200).collect(),
            personality_traits: vec!["practical".to_string()],
            communication_style: "direct".to_string(),
            extra: Map::new(),
        }
    }
}

/// Progress on the four meeting objectives, each a percentage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    #[serde(default)]
    pub rapport: f64,
    #[serde(default)]
    pub needs: f64,
    #[serde(default)]
    pub objections: f64,
    #[serde(default)]
    pub recommendations: f64,
    #[serde(default)]
    pub explanation: String,
}

impl ObjectiveProgress {
    /// Clamp every percentage into [0, 100]
    pub fn clamped(mut self) -> Self {
        for v in [
            &mut self.rapport,
            &mut self.needs,
            &mut self.objections,
            &mut self.recommendations,
        ] {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySettings {
    #[serde(default = "default_mood")]
    pub mood: String,
    #[serde(default = "default_archetype")]
    pub archetype: String,
    #[serde(default)]
    pub traits: HashMap<String, Value>,
    #[serde(default = "default_influence")]
    pub influence: String,
}

fn default_mood() -> String {
    "neutral".to_string()
}

fn default_archetype() -> String {
    "Standard Client".to_string()
}

fn default_influence() -> String {
    "balanced".to_string()
}

impl Default for PersonalitySettings {
    fn default() -> Self {
        Self {
            mood: default_mood(),
            archetype: default_archetype(),
            traits: HashMap::new(),
            influence: default_influence(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    #[serde(default)]
    pub simulation_id: Option<String>,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub competencies: Vec<String>,
}

impl SimulationSettings {
    /// "Industry - Subcategory", or just the industry
    pub fn industry_label(&self) -> String {
        let industry = if self.industry.is_empty() {
            "Unknown"
        } else {
            &self.industry
        };
        match &self.subcategory {
            Some(sub) if !sub.is_empty() => format!("{} - {}", industry, sub),
            _ => industry.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    #[serde(default)]
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competency {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub competency_id: String,
    #[serde(default)]
    pub difficulty_level: u32,
    pub criteria: String,
    #[serde(default = "default_rubric_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_rubric_weight() -> f64 {
    10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyScore {
    pub name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub expectation: String,
}

/// End-of-simulation performance review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReview {
    #[serde(default)]
    pub overall_score: f64,
    #[serde(default)]
    pub competency_scores: Vec<CompetencyScore>,
    #[serde(default)]
    pub general_strengths: Vec<String>,
    #[serde(default)]
    pub general_improvements: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl PerformanceReview {
    /// Review returned when the evaluator's output could not be parsed
    pub fn placeholder(raw: &str) -> Self {
        let summary = if raw.trim().is_empty() {
            "Review generation failed".to_string()
        } else {
            raw.chars().take(500).collect()
        };
        Self {
            overall_score: 5.0,
            competency_scores: Vec::new(),
            general_strengths: vec!["Unable to parse detailed feedback".to_string()],
            general_improvements: vec!["Please try generating the review again".to_string()],
            summary,
        }
    }
}
