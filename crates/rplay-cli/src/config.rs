use anyhow::{Context, Result};
use rplay_core::RouterConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RplayConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Direct completion tier
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_openai_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_openai_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_openai_timeout_secs() -> u64 {
    60
}

/// Managed agent tier
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Timeout for each individual HTTP call to the agent service
    #[serde(default = "default_agents_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AgentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &mask_secret(&self.api_key))
            .field("api_version", &self.api_version)
            .field("model", &self.model)
            .field("name_prefix", &self.name_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_api_version(),
            model: default_openai_model(),
            name_prefix: default_name_prefix(),
            timeout_secs: default_agents_timeout_secs(),
        }
    }
}

impl AgentsConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_api_version() -> String {
    "2025-05-01".to_string()
}
fn default_name_prefix() -> String {
    "rplay-".to_string()
}
fn default_agents_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding competencies.json, industry-competencies.json and
    /// rubrics.json. Empty means built-in defaults only.
    #[serde(default)]
    pub dir: String,
}

impl DataConfig {
    pub fn dir(&self) -> Option<PathBuf> {
        let dir = self.dir.trim();
        if dir.is_empty() {
            None
        } else {
            Some(expand_home(dir))
        }
    }
}

pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rplay")
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(s: &str) -> PathBuf {
    match (s.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(s),
    }
}

impl RplayConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `rplay init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        if config.openai.api_key.starts_with("sk-") {
            warn!(
                "OpenAI API key is hardcoded in config file. For security, use environment variables: api_key = \"${{OPENAI_API_KEY}}\""
            );
        }
        if !config.openai.is_configured() && !config.agents.is_configured() {
            warn!("Neither [openai] nor [agents] has credentials; every request will fail");
        }

        Ok(config)
    }

    /// Parse config text, expanding allowlisted `${VAR}` references first
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// Copy with every secret masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.openai.api_key = mask_secret(&config.openai.api_key);
        config.agents.api_key = mask_secret(&config.agents.api_key);
        config
    }
}

/// Environment variables a config file may reference as `${NAME}`. Any other
/// reference is kept verbatim.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "AZURE_AI_PROJECT_ENDPOINT",
    "AZURE_AI_API_KEY",
    "RPLAY_DATA_DIR",
];

/// Substitute allowlisted `${NAME}` references in one left-to-right pass.
/// Substituted values are not scanned again; unset variables become empty.
fn expand_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let reference = &rest[start..];
        let Some(end) = reference.find('}') else {
            rest = reference;
            break;
        };

        let name = &reference[2..end];
        if ALLOWED_ENV_VARS.contains(&name) {
            out.push_str(&std::env::var(name).unwrap_or_default());
        } else {
            warn!("Config references ${{{}}}, which rplay does not expand", name);
            out.push_str(&reference[..=end]);
        }
        rest = &reference[end + 1..];
    }

    out.push_str(rest);
    out
}
