//! Read-only context catalog backed by flat JSON files
//!
//! Supplies competencies, rubrics, and industry/difficulty settings to the
//! router's prompt builders and to agent tool calls. Nothing here is ever
//! written back.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{Competency, Difficulty, Rubric};

pub const COMPETENCIES_FILE: &str = "competencies.json";
pub const INDUSTRY_COMPETENCIES_FILE: &str = "industry-competencies.json";
pub const RUBRICS_FILE: &str = "rubrics.json";

/// Industry-specific material for profile generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustrySettings {
    pub common_goals: Vec<String>,
    pub common_concerns: Vec<String>,
    pub terminology: Vec<String>,
}

impl IndustrySettings {
    pub fn builtin(industry: &str) -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        match industry.trim().to_lowercase().as_str() {
            "financial services" => Self {
                common_goals: owned(&[
                    "retirement planning",
                    "investment growth",
                    "debt management",
                    "college savings",
                    "estate planning",
                ]),
                common_concerns: owned(&[
                    "market volatility",
                    "inflation",
                    "tax efficiency",
                    "risk tolerance",
                    "liquidity needs",
                ]),
                terminology: owned(&[
                    "portfolio",
                    "diversification",
                    "asset allocation",
                    "ROI",
                    "compound interest",
                ]),
            },
            "insurance" => Self {
                common_goals: owned(&[
                    "life protection",
                    "income replacement",
                    "health coverage",
                    "property protection",
                ]),
                common_concerns: owned(&[
                    "premium costs",
                    "coverage gaps",
                    "claims process",
                    "policy terms",
                ]),
                terminology: owned(&[
                    "premium",
                    "deductible",
                    "coverage limits",
                    "beneficiary",
                    "underwriting",
                ]),
            },
            "real estate" => Self {
                common_goals: owned(&[
                    "home purchase",
                    "investment properties",
                    "downsizing",
                    "rental income",
                ]),
                common_concerns: owned(&[
                    "market conditions",
                    "financing options",
                    "property values",
                    "location factors",
                ]),
                terminology: owned(&["mortgage", "equity", "closing costs", "appraisal", "escrow"]),
            },
            _ => Self {
                common_goals: owned(&["financial security", "growth", "protection"]),
                common_concerns: owned(&["costs", "risks", "complexity"]),
                terminology: Vec::new(),
            },
        }
    }
}

/// How complex a generated profile should be at a given difficulty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    pub complexity: String,
    pub num_goals: String,
    pub num_concerns: String,
    pub objection_level: String,
    pub information_sharing: String,
    pub decision_style: String,
}

impl DifficultySettings {
    pub fn builtin(difficulty: Difficulty) -> Self {
        let (complexity, goals, concerns, objections, sharing, decision) = match difficulty {
            Difficulty::Beginner => ("low", "1-2", "1-2", "minimal", "open", "straightforward"),
            Difficulty::Intermediate => ("medium", "2-3", "2-3", "moderate", "gradual", "considered"),
            Difficulty::Advanced => ("high", "3-5", "3-5", "high", "guarded", "skeptical"),
        };
        Self {
            complexity: complexity.to_string(),
            num_goals: goals.to_string(),
            num_concerns: concerns.to_string(),
            objection_level: objections.to_string(),
            information_sharing: sharing.to_string(),
            decision_style: decision.to_string(),
        }
    }
}

/// The four core advisor competencies used when nothing else is configured
pub fn default_competencies() -> Vec<Competency> {
    [
        ("rapport", "Building Rapport", "Establishing connection and trust with clients"),
        ("needs", "Needs Assessment", "Discovering client's financial situation and goals"),
        ("objections", "Handling Objections", "Addressing concerns professionally"),
        (
            "recommendations",
            "Providing Recommendations",
            "Suggesting appropriate financial solutions",
        ),
    ]
    .into_iter()
    .map(|(id, name, description)| Competency {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category: None,
        weight: None,
    })
    .collect()
}

pub fn default_rubrics() -> Vec<Rubric> {
    [
        "Active listening and empathy",
        "Questioning techniques",
        "Problem-solving ability",
        "Communication clarity",
    ]
    .into_iter()
    .enumerate()
    .map(|(i, criteria)| Rubric {
        id: format!("default-{}", i + 1),
        competency_id: String::new(),
        difficulty_level: 0,
        criteria: criteria.to_string(),
        weight: 25.0,
        description: None,
    })
    .collect()
}

/// Read-only access to simulation context
pub trait ContextStore: Send + Sync {
    /// Competencies evaluated for an industry (and optional subcategory)
    fn competencies(&self, industry: &str, subcategory: Option<&str>) -> Vec<Competency>;

    /// Rubrics for the given competencies at a difficulty
    fn rubrics(&self, competency_ids: &[String], difficulty: Difficulty) -> Vec<Rubric>;

    fn industry_settings(&self, industry: &str) -> IndustrySettings {
        IndustrySettings::builtin(industry)
    }

    fn difficulty_settings(&self, difficulty: Difficulty) -> DifficultySettings {
        DifficultySettings::builtin(difficulty)
    }
}

/// Catalog with no files behind it: built-in settings and default competencies
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl ContextStore for BuiltinCatalog {
    fn competencies(&self, _industry: &str, _subcategory: Option<&str>) -> Vec<Competency> {
        default_competencies()
    }

    fn rubrics(&self, _competency_ids: &[String], _difficulty: Difficulty) -> Vec<Rubric> {
        default_rubrics()
    }
}

// industry-competencies.json maps industry -> subcategory -> ids, where the
// leaf is either a bare list or an object carrying a `competencies` list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CompetencyIds {
    List(Vec<String>),
    Nested { competencies: Vec<String> },
}

impl CompetencyIds {
    fn ids(&self) -> &[String] {
        match self {
            Self::List(ids) => ids,
            Self::Nested { competencies } => competencies,
        }
    }
}

/// Catalog loaded from `competencies.json`, `industry-competencies.json`, and
/// `rubrics.json` in a data directory
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    dir: PathBuf,
    competencies: Vec<Competency>,
    industries: HashMap<String, BTreeMap<String, CompetencyIds>>,
    rubrics: Vec<Rubric>,
}

impl JsonCatalog {
    /// Load every catalog file from `dir`. Missing files are treated as empty;
    /// malformed files are an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let competencies: Vec<Competency> =
            read_json_file(&dir.join(COMPETENCIES_FILE))?.unwrap_or_default();
        let industries: HashMap<String, BTreeMap<String, CompetencyIds>> =
            read_json_file(&dir.join(INDUSTRY_COMPETENCIES_FILE))?.unwrap_or_default();
        let rubrics: Vec<Rubric> = read_json_file(&dir.join(RUBRICS_FILE))?.unwrap_or_default();

        info!(
            "Loaded catalog from {}: {} competencies, {} industries, {} rubrics",
            dir.display(),
            competencies.len(),
            industries.len(),
            rubrics.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            competencies,
            industries: industries
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            rubrics,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn competency_count(&self) -> usize {
        self.competencies.len()
    }

    pub fn rubric_count(&self) -> usize {
        self.rubrics.len()
    }

    fn industry_competency_ids(&self, industry: &str, subcategory: Option<&str>) -> Option<&[String]> {
        let subcategories = self.industries.get(&industry.to_lowercase())?;
        subcategory
            .and_then(|s| subcategories.get(s))
            .or_else(|| subcategories.get("default"))
            .or_else(|| subcategories.values().next())
            .map(|ids| ids.ids())
    }
}

impl ContextStore for JsonCatalog {
    fn competencies(&self, industry: &str, subcategory: Option<&str>) -> Vec<Competency> {
        if self.competencies.is_empty() {
            return default_competencies();
        }

        match self.industry_competency_ids(industry, subcategory) {
            Some(ids) => self
                .competencies
                .iter()
                .filter(|c| ids.contains(&c.id))
                .cloned()
                .collect(),
            None => {
                debug!("No competency mapping for industry '{}', using all", industry);
                self.competencies.clone()
            }
        }
    }

    fn rubrics(&self, competency_ids: &[String], difficulty: Difficulty) -> Vec<Rubric> {
        if self.rubrics.is_empty() {
            return default_rubrics();
        }

        self.rubrics
            .iter()
            .filter(|r| competency_ids.is_empty() || competency_ids.contains(&r.competency_id))
            .filter(|r| Difficulty::from_rubric_level(r.difficulty_level) == difficulty)
            .cloned()
            .collect()
    }
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!("Catalog file {} not found, treating as empty", path.display());
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}
