use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rplay_core::agents::default_definitions;
use rplay_core::types::{Objective, PersonalitySettings, SimulationSettings};
use rplay_core::{
    AgentPool, AiRouter, BuiltinCatalog, ClientProfile, ClientResponseContext, CompletionProvider,
    ContextStore, ConversationTurn, Difficulty, GuidanceContext, HttpAgentService, JsonCatalog,
    ObjectiveProgress, OpenAiProvider, ProfileRequest, ReviewContext, ToolRegistry,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::RplayConfig;

#[derive(Parser)]
#[command(name = "rplay")]
#[command(version)]
#[command(about = "AI response router for advisor training simulations")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration with secrets masked
    Config,

    /// Initialize managed agents and report status and health
    Status {
        /// Delete the remote agents afterwards
        #[arg(long)]
        cleanup: bool,
    },

    /// Generate a client profile
    Profile {
        #[arg(short, long)]
        industry: String,

        #[arg(long, default_value = "beginner")]
        difficulty: String,

        /// JSON file with extra generation parameters
        #[arg(long)]
        parameters: Option<PathBuf>,
    },

    /// Generate a client's opening message from a profile JSON file
    Starter { profile: PathBuf },

    /// Generate the client's next reply from a request JSON file
    Respond { request: PathBuf },

    /// Generate a performance review from a request JSON file
    Review { request: PathBuf },

    /// Evaluate objective progress from a request JSON file
    Objectives { request: PathBuf },

    /// Get expert guidance from a request JSON file
    Guidance { request: PathBuf },

    /// Run an interactive simulation with you as the advisor
    Chat {
        /// Client profile JSON file; generated when omitted
        #[arg(long)]
        profile: Option<PathBuf>,

        #[arg(short, long, default_value = "Financial Services")]
        industry: String,

        #[arg(long, default_value = "beginner")]
        difficulty: String,
    },
}

// ── Request files ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RespondRequest {
    #[serde(default)]
    messages: Vec<ConversationTurn>,
    #[serde(flatten)]
    context: ClientResponseContext,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    #[serde(default)]
    messages: Vec<ConversationTurn>,
    #[serde(flatten)]
    context: ReviewContext,
    /// Used to look up competencies and rubrics when none are given
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectivesRequest {
    #[serde(default)]
    messages: Vec<ConversationTurn>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuidanceRequest {
    #[serde(default)]
    messages: Vec<ConversationTurn>,
    #[serde(flatten)]
    context: GuidanceContext,
    #[serde(default)]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays machine-readable
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Status { cleanup } => cmd_status(&cli.config, cleanup).await,
        Commands::Profile {
            industry,
            difficulty,
            parameters,
        } => cmd_profile(&cli.config, industry, &difficulty, parameters.as_deref()).await,
        Commands::Starter { profile } => cmd_starter(&cli.config, &profile).await,
        Commands::Respond { request } => cmd_respond(&cli.config, &request).await,
        Commands::Review { request } => cmd_review(&cli.config, &request).await,
        Commands::Objectives { request } => cmd_objectives(&cli.config, &request).await,
        Commands::Guidance { request } => cmd_guidance(&cli.config, &request).await,
        Commands::Chat {
            profile,
            industry,
            difficulty,
        } => cmd_chat(&cli.config, profile.as_deref(), industry, &difficulty).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    let data_dir = config_dir.join("data");
    tokio::fs::create_dir_all(&data_dir).await?;

    println!("rplay initialized at {}", config_dir.display());
    println!("Edit {} to configure your API keys.", config_path.display());
    println!(
        "Place competencies.json, industry-competencies.json and rubrics.json in {} and set [data] dir.",
        data_dir.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_status(config_path: &Option<PathBuf>, cleanup: bool) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;

    print_json(&router.status().await)?;
    print_json(&router.health().await)?;

    if cleanup {
        router.shutdown().await;
        println!("Remote agents deleted.");
    }
    Ok(())
}

async fn cmd_profile(
    config_path: &Option<PathBuf>,
    industry: String,
    difficulty: &str,
    parameters: Option<&Path>,
) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;

    let parameters = match parameters {
        Some(path) => read_json(path)?,
        None => Default::default(),
    };
    let request = ProfileRequest {
        industry,
        difficulty: Difficulty::from_name(difficulty),
        parameters,
    };

    print_json(&router.generate_profile(&request).await?)
}

async fn cmd_starter(config_path: &Option<PathBuf>, profile: &Path) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let profile: ClientProfile = read_json(profile)?;

    print_json(&router.generate_conversation_starter(&profile).await?)
}

async fn cmd_respond(config_path: &Option<PathBuf>, request: &Path) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let request: RespondRequest = read_json(request)?;

    let reply = router
        .generate_client_response(&request.messages, &request.context, request.session_id.as_deref())
        .await?;
    print_json(&reply)
}

async fn cmd_review(config_path: &Option<PathBuf>, request: &Path) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let request: ReviewRequest = read_json(request)?;

    let mut context = request.context;
    if let Some(industry) = &request.industry {
        fill_from_catalog(router.catalog().as_ref(), &mut context, industry, request.subcategory.as_deref());
    }

    print_json(&router.generate_review(&request.messages, &context).await?)
}

async fn cmd_objectives(config_path: &Option<PathBuf>, request: &Path) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let request: ObjectivesRequest = read_json(request)?;

    print_json(&router.evaluate_objectives(&request.messages).await?)
}

async fn cmd_guidance(config_path: &Option<PathBuf>, request: &Path) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let request: GuidanceRequest = read_json(request)?;

    let guidance = router
        .generate_guidance(&request.messages, &request.context, request.session_id.as_deref())
        .await?;
    print_json(&guidance)
}

async fn cmd_chat(
    config_path: &Option<PathBuf>,
    profile_path: Option<&Path>,
    industry: String,
    difficulty: &str,
) -> Result<()> {
    let cfg = RplayConfig::load(config_path)?;
    let router = init_router(&cfg).await?;
    let difficulty = Difficulty::from_name(difficulty);

    let profile = match profile_path {
        Some(path) => read_json::<ClientProfile>(path)?,
        None => {
            info!("Generating a {} client profile for {}...", difficulty, industry);
            let generated = router
                .generate_profile(&ProfileRequest {
                    industry: industry.clone(),
                    difficulty,
                    parameters: Default::default(),
                })
                .await?;
            if generated.parse_error {
                warn!("Profile generator returned unparseable output, using a placeholder client");
            }
            generated.profile
        }
    };

    let simulation = SimulationSettings {
        industry: industry.clone(),
        difficulty,
        ..Default::default()
    };
    let ctx = ClientResponseContext {
        profile: profile.clone(),
        personality: PersonalitySettings::default(),
        simulation: simulation.clone(),
    };
    let session_id = uuid::Uuid::new_v4().to_string();
    info!("Chat session {}", session_id);

    let name = profile.display_name().to_string();
    println!("\n  Simulated client: {} ({}, {})", name, industry, difficulty);
    println!("  Commands: /guidance  /objectives  /review  /quit\n");

    let starter = router.generate_conversation_starter(&profile).await?;
    println!("{}: {}\n", name, starter.message);
    let mut turns = vec![ConversationTurn::client(starter.message)];
    let mut objectives: Vec<Objective> = Vec::new();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("advisor> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/guidance" => {
                let guidance_ctx = GuidanceContext {
                    profile: profile.clone(),
                    simulation: simulation.clone(),
                    objectives: objectives.clone(),
                };
                match router
                    .generate_guidance(&turns, &guidance_ctx, Some(&session_id))
                    .await
                {
                    Ok(guidance) => println!("\n[expert] {}\n", guidance.message),
                    Err(e) => eprintln!("Guidance failed: {}", e),
                }
            }
            "/objectives" => match router.evaluate_objectives(&turns).await {
                Ok(eval) => {
                    objectives = objectives_from(&eval.progress);
                    print_objectives(&eval.progress);
                }
                Err(e) => eprintln!("Objective evaluation failed: {}", e),
            },
            "/review" => {
                let mut review_ctx = ReviewContext {
                    difficulty: Some(difficulty),
                    ..Default::default()
                };
                fill_from_catalog(router.catalog().as_ref(), &mut review_ctx, &industry, None);
                match router.generate_review(&turns, &review_ctx).await {
                    Ok(review) => print_json(&review)?,
                    Err(e) => eprintln!("Review failed: {}", e),
                }
            }
            text => {
                turns.push(ConversationTurn::advisor(text));
                match router
                    .generate_client_response(&turns, &ctx, Some(&session_id))
                    .await
                {
                    Ok(reply) => {
                        println!("{}: {}  [{}]\n", name, reply.message, reply.source);
                        if let Some(progress) = &reply.objective_progress {
                            objectives = objectives_from(progress);
                            print_objectives(progress);
                        }
                        turns.push(ConversationTurn::client(reply.message));
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        turns.pop();
                    }
                }
            }
        }
    }

    println!("\nSession ended after {} turns.", turns.len());
    Ok(())
}

// ── Helpers ──

fn build_router(cfg: &RplayConfig) -> Result<AiRouter> {
    let direct: Option<Arc<dyn CompletionProvider>> = if cfg.openai.is_configured() {
        let provider = OpenAiProvider::new(
            cfg.openai.api_key.clone(),
            cfg.openai.model.clone(),
            cfg.openai.base_url.clone(),
            cfg.openai.timeout(),
        )?
        .with_temperature(cfg.openai.temperature)
        .with_max_tokens(cfg.openai.max_tokens);
        info!("Direct API client initialized (model: {})", cfg.openai.model);
        Some(Arc::new(provider))
    } else {
        info!("OpenAI API key not set, direct fallback disabled");
        None
    };

    let agents = if cfg.agents.is_configured() {
        let service = HttpAgentService::new(
            &cfg.agents.endpoint,
            cfg.agents.api_key.clone(),
            cfg.agents.api_version.clone(),
            cfg.agents.timeout(),
        )?;
        let pool = AgentPool::new(
            Arc::new(service),
            Arc::new(ToolRegistry::with_builtin_tools()),
            default_definitions(&cfg.agents.name_prefix, &cfg.agents.model),
            cfg.router.run_limits(),
        );
        Some(Arc::new(pool))
    } else {
        None
    };

    let catalog: Arc<dyn ContextStore> = match cfg.data.dir() {
        Some(dir) => Arc::new(JsonCatalog::load(&dir)?),
        None => Arc::new(BuiltinCatalog),
    };

    Ok(AiRouter::new(cfg.router.clone(), agents, direct).with_catalog(catalog))
}

async fn init_router(cfg: &RplayConfig) -> Result<AiRouter> {
    let router = build_router(cfg)?;
    router.initialize().await;
    Ok(router)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Fill missing competencies and rubrics from the catalog
fn fill_from_catalog(catalog: &dyn ContextStore, context: &mut ReviewContext, industry: &str, subcategory: Option<&str>) {
    if context.competencies.is_empty() {
        context.competencies = catalog.competencies(industry, subcategory);
    }
    if context.rubrics.is_empty() {
        let ids: Vec<String> = context.competencies.iter().map(|c| c.id.clone()).collect();
        context.rubrics = catalog.rubrics(&ids, context.difficulty.unwrap_or_default());
    }
}

fn objectives_from(progress: &ObjectiveProgress) -> Vec<Objective> {
    [
        ("Building Rapport", progress.rapport),
        ("Needs Assessment", progress.needs),
        ("Handling Objections", progress.objections),
        ("Providing Recommendations", progress.recommendations),
    ]
    .into_iter()
    .map(|(name, value)| Objective {
        name: name.to_string(),
        progress: value,
    })
    .collect()
}

fn print_objectives(progress: &ObjectiveProgress) {
    println!(
        "  [objectives] rapport {:.0}% · needs {:.0}% · objections {:.0}% · recommendations {:.0}%",
        progress.rapport, progress.needs, progress.objections, progress.recommendations
    );
    if !progress.explanation.is_empty() {
        println!("  {}\n", progress.explanation);
    }
}
