//! AI response router: managed agents first, direct completion second
//!
//! Every use case goes through the same path. If the agent pool is available
//! and the use case's agent is initialized, the request is sent to that agent
//! (on the session's thread when a session id is given). Any failure there is
//! logged and the request falls through to one direct completion call. Only
//! when every configured tier fails does the caller see an error.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agents::{AgentKind, AgentPool, AgentReply, AgentStatus};
use crate::catalog::{BuiltinCatalog, ContextStore};
use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult, Tier, TransportError};
use crate::parse::{clean_starter, parse_objectives, parse_profile, parse_review};
use crate::prompts::{
    EVALUATION_INSTRUCTIONS, EXPERT_GUIDANCE_INSTRUCTIONS, PROFILE_GENERATION_INSTRUCTIONS,
    STARTER_SYSTEM_PROMPT, client_system_prompt, client_turn_prompt, guidance_prompt,
    objectives_prompt, profile_prompt, review_prompt, starter_prompt,
};
use crate::providers::{CompletionOptions, CompletionProvider};
use crate::requests::{
    ClientReply, ClientResponseContext, GUIDANCE_TIER, GeneratedProfile, Guidance,
    GuidanceContext, ObjectiveEvaluation, ProfileRequest, Review, ReviewContext, Starter,
};
use crate::tools::ToolContext;
use crate::tools::evaluation::TRACK_OBJECTIVE_PROGRESS;
use crate::types::{ClientProfile, ConversationTurn, ResponseSource, SimulationSettings};

/// Per-request routing states, traced at debug level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    NotStarted,
    AgentAttempt,
    AgentSucceeded,
    AgentFailed,
    DirectAttempt,
    DirectSucceeded,
    DirectFailed,
    Terminal,
}

fn trace_state(use_case: &str, state: RequestState) {
    debug!("[{}] {:?}", use_case, state);
}

/// Everything one use case needs on either tier
struct RoutedRequest<'a> {
    use_case: &'static str,
    agent: AgentKind,
    session_id: Option<&'a str>,
    agent_prompt: String,
    tools: ToolContext,
    system: String,
    turns: Cow<'a, [ConversationTurn]>,
    options: CompletionOptions,
}

struct Routed {
    text: String,
    agent_reply: Option<AgentReply>,
    source: ResponseSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectStatus {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterStatus {
    pub configured: bool,
    pub available: bool,
    pub agents: BTreeMap<AgentKind, AgentStatus>,
    pub errors: BTreeMap<AgentKind, String>,
    pub direct: Option<DirectStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unconfigured,
    Unavailable,
    Degraded,
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub agents_total: usize,
    pub agents_initialized: usize,
    pub fallback_available: bool,
}

pub struct AiRouter {
    config: RouterConfig,
    agents: Option<Arc<AgentPool>>,
    direct: Option<Arc<dyn CompletionProvider>>,
    catalog: Arc<dyn ContextStore>,
}

impl std::fmt::Debug for AiRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiRouter")
            .field("config", &self.config)
            .field("agents", &self.agents)
            .field("direct", &self.direct.as_ref().map(|d| d.provider_name().to_string()))
            .finish()
    }
}

impl AiRouter {
    pub fn new(
        config: RouterConfig,
        agents: Option<Arc<AgentPool>>,
        direct: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self {
            config,
            agents,
            direct,
            catalog: Arc::new(BuiltinCatalog),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ContextStore>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn ContextStore> {
        &self.catalog
    }

    pub fn agents(&self) -> Option<&Arc<AgentPool>> {
        self.agents.as_ref()
    }

    /// True when at least one tier has credentials
    pub fn is_configured(&self) -> bool {
        self.agents.is_some() || self.direct.is_some()
    }

    /// Initialize the agent pool, if there is one. Returns agent availability.
    pub async fn initialize(&self) -> bool {
        match &self.agents {
            Some(pool) => pool.initialize_all().await,
            None => {
                info!("Managed agents not configured, using direct API only");
                false
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = &self.agents {
            pool.cleanup_all().await;
        }
    }

    pub async fn status(&self) -> RouterStatus {
        let pool = match &self.agents {
            Some(pool) => Some(pool.status().await),
            None => None,
        };
        RouterStatus {
            configured: pool.is_some(),
            available: pool.as_ref().is_some_and(|p| p.available),
            agents: pool.as_ref().map(|p| p.agents.clone()).unwrap_or_default(),
            errors: pool.map(|p| p.errors).unwrap_or_default(),
            direct: self.direct.as_ref().map(|d| DirectStatus {
                provider: d.provider_name().to_string(),
                model: d.model().to_string(),
            }),
        }
    }

    pub async fn health(&self) -> HealthReport {
        let status = self.status().await;
        let agents_total = status.agents.len();
        let agents_initialized = status.agents.values().filter(|a| a.initialized).count();

        let state = if !status.configured {
            HealthState::Unconfigured
        } else if !status.available {
            HealthState::Unavailable
        } else if agents_initialized < agents_total {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        HealthReport {
            status: state,
            agents_total,
            agents_initialized,
            fallback_available: self.direct.is_some(),
        }
    }

    fn tool_context(&self) -> ToolContext {
        ToolContext::with_catalog(self.catalog.clone())
    }

    async fn route(&self, request: RoutedRequest<'_>) -> RouterResult<Routed> {
        let use_case = request.use_case;
        if !self.is_configured() {
            return Err(RouterError::Configuration(
                "neither a managed agent service nor a direct completion API is configured"
                    .to_string(),
            ));
        }

        trace_state(use_case, RequestState::NotStarted);
        let mut attempts = Vec::new();

        if let Some(pool) = &self.agents {
            match pool.ready(request.agent).await {
                Some(agent) => {
                    trace_state(use_case, RequestState::AgentAttempt);
                    match agent
                        .respond(request.session_id, &request.agent_prompt, &request.tools)
                        .await
                    {
                        Ok(reply) => {
                            trace_state(use_case, RequestState::AgentSucceeded);
                            trace_state(use_case, RequestState::Terminal);
                            return Ok(Routed {
                                text: reply.text.clone(),
                                agent_reply: Some(reply),
                                source: ResponseSource::ManagedAgent,
                            });
                        }
                        Err(e) => {
                            warn!("[{}] Managed agent {} failed: {:#}", use_case, agent.name(), e);
                            trace_state(use_case, RequestState::AgentFailed);
                            attempts.push(TransportError::new(Tier::ManagedAgent, e));
                        }
                    }
                }
                None => debug!("[{}] Agent {} not ready, skipping managed tier", use_case, request.agent),
            }
        }

        if let Some(direct) = &self.direct {
            trace_state(use_case, RequestState::DirectAttempt);
            match direct
                .complete(&request.system, &request.turns, &request.options)
                .await
            {
                Ok(text) => {
                    trace_state(use_case, RequestState::DirectSucceeded);
                    if !attempts.is_empty() {
                        info!("[{}] Served by direct API after managed agent failure", use_case);
                    }
                    trace_state(use_case, RequestState::Terminal);
                    return Ok(Routed {
                        text,
                        agent_reply: None,
                        source: ResponseSource::DirectApi,
                    });
                }
                Err(e) => {
                    warn!("[{}] Direct API ({}) failed: {:#}", use_case, direct.provider_name(), e);
                    trace_state(use_case, RequestState::DirectFailed);
                    attempts.push(TransportError::new(Tier::DirectApi, e));
                }
            }
        }

        trace_state(use_case, RequestState::Terminal);
        if attempts.is_empty() {
            attempts.push(TransportError::new(
                Tier::ManagedAgent,
                format!("agent {} is not initialized and no direct API is configured", request.agent),
            ));
        }
        Err(RouterError::Upstream { attempts })
    }

    /// The simulated client's next reply. Objective progress is attached on a
    /// best-effort basis once the conversation is long enough.
    pub async fn generate_client_response(
        &self,
        turns: &[ConversationTurn],
        ctx: &ClientResponseContext,
        session_id: Option<&str>,
    ) -> RouterResult<ClientReply> {
        let tools = ToolContext {
            profile: Some(ctx.profile.clone()),
            personality: ctx.personality.clone(),
            simulation: ctx.simulation.clone(),
            ..self.tool_context()
        };

        let routed = self
            .route(RoutedRequest {
                use_case: "client_response",
                agent: AgentKind::SimulationClient,
                session_id,
                agent_prompt: client_turn_prompt(turns, &ctx.profile, &ctx.personality, &ctx.simulation),
                tools,
                system: client_system_prompt(&ctx.profile, &ctx.personality, &ctx.simulation),
                turns: Cow::Borrowed(turns),
                options: CompletionOptions::default(),
            })
            .await?;

        let objective_progress = if turns.len() > self.config.objective_min_turns {
            match self.evaluate_objectives(turns).await {
                Ok(eval) if !eval.parse_error => Some(eval.progress),
                Ok(_) => None,
                Err(e) => {
                    warn!("Objective evaluation skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ClientReply {
            message: routed.text.trim().to_string(),
            source: routed.source,
            objective_progress,
        })
    }

    pub async fn generate_profile(&self, request: &ProfileRequest) -> RouterResult<GeneratedProfile> {
        let prompt = profile_prompt(&request.industry, request.difficulty, &request.parameters);
        let tools = ToolContext {
            simulation: SimulationSettings {
                industry: request.industry.clone(),
                difficulty: request.difficulty,
                ..Default::default()
            },
            ..self.tool_context()
        };

        let routed = self
            .route(RoutedRequest {
                use_case: "profile",
                agent: AgentKind::ProfileGeneration,
                session_id: None,
                agent_prompt: prompt.clone(),
                tools,
                system: PROFILE_GENERATION_INSTRUCTIONS.to_string(),
                turns: Cow::Owned(vec![ConversationTurn::advisor(prompt)]),
                options: CompletionOptions::new(0.8, 800).json(),
            })
            .await?;

        let parsed = parse_profile(&routed.text);
        Ok(GeneratedProfile {
            profile: parsed.value,
            source: routed.source,
            parse_error: parsed.parse_error,
        })
    }

    pub async fn generate_conversation_starter(&self, profile: &ClientProfile) -> RouterResult<Starter> {
        let prompt = starter_prompt(profile);
        let tools = ToolContext {
            profile: Some(profile.clone()),
            ..self.tool_context()
        };

        let routed = self
            .route(RoutedRequest {
                use_case: "starter",
                agent: AgentKind::ProfileGeneration,
                session_id: None,
                agent_prompt: prompt.clone(),
                tools,
                system: STARTER_SYSTEM_PROMPT.to_string(),
                turns: Cow::Owned(vec![ConversationTurn::advisor(prompt)]),
                options: CompletionOptions::new(0.8, 200),
            })
            .await?;

        Ok(Starter {
            message: clean_starter(&routed.text),
            source: routed.source,
        })
    }

    pub async fn generate_review(&self, turns: &[ConversationTurn], ctx: &ReviewContext) -> RouterResult<Review> {
        let prompt = review_prompt(turns, &ctx.competencies, &ctx.rubrics, ctx.difficulty);
        let mut tools = ToolContext {
            competencies: ctx.competencies.clone(),
            rubrics: ctx.rubrics.clone(),
            ..self.tool_context()
        };
        if let Some(difficulty) = ctx.difficulty {
            tools.simulation.difficulty = difficulty;
        }

        let routed = self
            .route(RoutedRequest {
                use_case: "review",
                agent: AgentKind::Evaluation,
                session_id: None,
                agent_prompt: prompt.clone(),
                tools,
                system: EVALUATION_INSTRUCTIONS.to_string(),
                turns: Cow::Owned(vec![ConversationTurn::advisor(prompt)]),
                options: CompletionOptions::new(0.3, 1000).json(),
            })
            .await?;

        let parsed = parse_review(&routed.text);
        Ok(Review {
            review: parsed.value,
            source: routed.source,
            parse_error: parsed.parse_error,
        })
    }

    pub async fn evaluate_objectives(&self, turns: &[ConversationTurn]) -> RouterResult<ObjectiveEvaluation> {
        let prompt = objectives_prompt(turns);

        let routed = self
            .route(RoutedRequest {
                use_case: "objectives",
                agent: AgentKind::Evaluation,
                session_id: None,
                agent_prompt: prompt.clone(),
                tools: self.tool_context(),
                system: EVALUATION_INSTRUCTIONS.to_string(),
                turns: Cow::Owned(vec![ConversationTurn::advisor(prompt)]),
                options: CompletionOptions::new(0.3, 500).json(),
            })
            .await?;

        let reported = routed
            .agent_reply
            .as_ref()
            .and_then(|r| r.last_call_arguments(TRACK_OBJECTIVE_PROGRESS));
        let parsed = parse_objectives(&routed.text, reported);
        Ok(ObjectiveEvaluation {
            progress: parsed.value,
            source: routed.source,
            parse_error: parsed.parse_error,
        })
    }

    pub async fn generate_guidance(
        &self,
        turns: &[ConversationTurn],
        ctx: &GuidanceContext,
        session_id: Option<&str>,
    ) -> RouterResult<Guidance> {
        let prompt = guidance_prompt(turns, &ctx.profile, &ctx.simulation, &ctx.objectives);
        let tools = ToolContext {
            profile: Some(ctx.profile.clone()),
            simulation: ctx.simulation.clone(),
            objectives: ctx.objectives.clone(),
            ..self.tool_context()
        };

        let routed = self
            .route(RoutedRequest {
                use_case: "guidance",
                agent: AgentKind::ExpertGuidance,
                session_id,
                agent_prompt: prompt.clone(),
                tools,
                system: EXPERT_GUIDANCE_INSTRUCTIONS.to_string(),
                turns: Cow::Owned(vec![ConversationTurn::advisor(prompt)]),
                options: CompletionOptions::new(0.7, 1000),
            })
            .await?;

        Ok(Guidance {
            message: routed.text.trim().to_string(),
            tier: GUIDANCE_TIER,
            source: routed.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::managed::tests::FakeAgentService;
    use crate::agents::{RunLimits, RunStatus, default_definitions};
    use crate::prompts::DEFAULT_STARTER;
    use crate::tools::ToolRegistry;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeProvider {
        responses: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<(String, Vec<ConversationTurn>, CompletionOptions)>>,
    }

    impl FakeProvider {
        fn replying(texts: &[&str]) -> Arc<Self> {
            let provider = Self::default();
            for text in texts {
                provider
                    .responses
                    .lock()
                    .unwrap()
                    .push_back(Ok(text.to_string()));
            }
            Arc::new(provider)
        }

        fn failing(message: &str) -> Arc<Self> {
            let provider = Self::default();
            provider
                .responses
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
            Arc::new(provider)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        fn provider_name(&self) -> &str {
            "fake"
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn complete(
            &self,
            system: &str,
            turns: &[ConversationTurn],
            options: &CompletionOptions,
        ) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system.to_string(), turns.to_vec(), options.clone()));
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(msg)) => Err(anyhow!(msg)),
                None => Err(anyhow!("no scripted response")),
            }
        }
    }

    fn pool_with(service: Arc<FakeAgentService>) -> Arc<AgentPool> {
        Arc::new(AgentPool::new(
            service,
            Arc::new(ToolRegistry::with_builtin_tools()),
            default_definitions("rplay-", "gpt-4o"),
            RunLimits {
                poll_interval: Duration::from_millis(1),
                ..Default::default()
            },
        ))
    }

    async fn ready_pool(service: Arc<FakeAgentService>) -> Arc<AgentPool> {
        let pool = pool_with(service);
        assert!(pool.initialize_all().await);
        pool
    }

    fn jane() -> ClientResponseContext {
        ClientResponseContext {
            profile: ClientProfile {
                name: "Jane".to_string(),
                goals: vec!["retire early".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unconfigured_router() {
        let router = AiRouter::new(RouterConfig::default(), None, None);
        let err = router
            .generate_client_response(&[ConversationTurn::advisor("Hi")], &jane(), None)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(router.health().await.status, HealthState::Unconfigured);
    }

    #[tokio::test]
    async fn test_direct_client_response() {
        let direct = FakeProvider::replying(&["Hello, I'm Jane."]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct.clone()));

        let reply = router
            .generate_client_response(&[ConversationTurn::advisor("Hi")], &jane(), None)
            .await
            .unwrap();

        assert_eq!(reply.message, "Hello, I'm Jane.");
        assert_eq!(reply.source, ResponseSource::DirectApi);
        assert!(reply.objective_progress.is_none());

        let calls = direct.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("retire early"));
        assert_eq!(calls[0].1, vec![ConversationTurn::advisor("Hi")]);
    }

    #[tokio::test]
    async fn test_unavailable_pool_makes_no_agent_calls() {
        let service = Arc::new(FakeAgentService::completing_with("agent reply"));
        let direct = FakeProvider::replying(&["direct reply"]);
        let router = AiRouter::new(
            RouterConfig::default(),
            Some(pool_with(service.clone())),
            Some(direct.clone()),
        );

        let reply = router
            .generate_client_response(&[ConversationTurn::advisor("Hi")], &jane(), Some("s1"))
            .await
            .unwrap();

        assert_eq!(reply.source, ResponseSource::DirectApi);
        assert_eq!(service.call_count(), 0);
        assert_eq!(direct.call_count(), 1);
    }

    #[tokio::test]
    async fn test_agent_failure_falls_back_to_direct_once() {
        let service = Arc::new(FakeAgentService::completing_with("agent reply"));
        let pool = ready_pool(service.clone()).await;
        service.fail("503 Service Unavailable");
        let direct = FakeProvider::replying(&["direct reply"]);
        let router = AiRouter::new(RouterConfig::default(), Some(pool), Some(direct.clone()));

        let reply = router
            .generate_client_response(&[ConversationTurn::advisor("Hi")], &jane(), Some("s1"))
            .await
            .unwrap();

        assert_eq!(reply.message, "direct reply");
        assert_eq!(reply.source, ResponseSource::DirectApi);
        assert_eq!(direct.call_count(), 1);
    }

    #[tokio::test]
    async fn test_both_tiers_fail() {
        let service = Arc::new(FakeAgentService::default());
        let pool = ready_pool(service.clone()).await;
        service.fail("agent down");
        let direct = FakeProvider::failing("direct down");
        let router = AiRouter::new(RouterConfig::default(), Some(pool), Some(direct.clone()));

        let err = router
            .generate_guidance(&[], &GuidanceContext::default(), None)
            .await
            .unwrap_err();

        match err {
            RouterError::Upstream { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].tier, Tier::ManagedAgent);
                assert!(attempts[0].message.contains("agent down"));
                assert_eq!(attempts[1].tier, Tier::DirectApi);
                assert!(attempts[1].message.contains("direct down"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
        assert_eq!(direct.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unready_agent_without_direct_is_upstream() {
        let service = Arc::new(FakeAgentService::default());
        let router = AiRouter::new(RouterConfig::default(), Some(pool_with(service)), None);
        let err = router.evaluate_objectives(&[]).await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_fenced_review_via_agent() {
        let service = Arc::new(FakeAgentService::completing_with(
            "```json\n{\"overallScore\": 7, \"competencyScores\": [{\"name\": \"Building Rapport\", \"score\": 8}], \"summary\": \"Good rapport\"}\n```",
        ));
        let pool = ready_pool(service.clone()).await;
        let direct = FakeProvider::replying(&[]);
        let router = AiRouter::new(RouterConfig::default(), Some(pool), Some(direct.clone()));

        let review = router
            .generate_review(
                &[
                    ConversationTurn::advisor("How can I help?"),
                    ConversationTurn::client("I want to retire early."),
                ],
                &ReviewContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(review.source, ResponseSource::ManagedAgent);
        assert!(!review.parse_error);
        assert_eq!(review.review.overall_score, 7.0);
        assert_eq!(review.review.competency_scores[0].score, 8.0);
        assert_eq!(direct.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_profile_is_flagged() {
        let direct = FakeProvider::replying(&["Sure! Here is a client named Raj who likes boats."]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct.clone()));

        let generated = router
            .generate_profile(&ProfileRequest {
                industry: "Insurance".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(generated.parse_error);
        assert!(!generated.profile.name.is_empty());
        assert!(!generated.profile.background.is_empty());
        let calls = direct.calls.lock().unwrap();
        assert!(calls[0].2.json_output);
        assert_eq!(calls[0].0, PROFILE_GENERATION_INSTRUCTIONS);
    }

    #[tokio::test]
    async fn test_session_thread_affinity() {
        let service = Arc::new(FakeAgentService::completing_with("Focus on discovery."));
        let pool = ready_pool(service.clone()).await;
        let router = AiRouter::new(RouterConfig::default(), Some(pool.clone()), None);
        let ctx = GuidanceContext::default();

        let guidance = router.generate_guidance(&[], &ctx, None).await.unwrap();
        assert_eq!(guidance.tier, 3);
        assert_eq!(guidance.source, ResponseSource::ManagedAgent);

        let agent = pool.get(AgentKind::ExpertGuidance).unwrap();
        assert_eq!(agent.threads().count().await, 0);

        router.generate_guidance(&[], &ctx, Some("s1")).await.unwrap();
        router.generate_guidance(&[], &ctx, Some("s1")).await.unwrap();
        assert_eq!(agent.threads().count().await, 1);
        assert_eq!(agent.threads().get("s1").await.unwrap().info().message_count, 2);
    }

    #[tokio::test]
    async fn test_client_response_attaches_objectives() {
        let direct = FakeProvider::replying(&[
            "I'm mostly worried about retiring too late.",
            r#"{"rapport": 30, "needs": 25, "objections": 0, "recommendations": 0, "explanation": "Good start"}"#,
        ]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct.clone()));
        let turns = vec![
            ConversationTurn::advisor("Hi, welcome in."),
            ConversationTurn::client("Hello, I'm Jane."),
            ConversationTurn::advisor("What brings you here today?"),
        ];

        let reply = router
            .generate_client_response(&turns, &jane(), None)
            .await
            .unwrap();

        let progress = reply.objective_progress.unwrap();
        assert_eq!(progress.rapport, 30.0);
        assert_eq!(progress.explanation, "Good start");
        assert_eq!(direct.call_count(), 2);
    }

    #[tokio::test]
    async fn test_objective_evaluation_failure_does_not_fail_reply() {
        let direct = FakeProvider::replying(&["Sounds good."]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct));
        let turns = vec![
            ConversationTurn::advisor("a"),
            ConversationTurn::client("b"),
            ConversationTurn::advisor("c"),
        ];

        let reply = router
            .generate_client_response(&turns, &jane(), None)
            .await
            .unwrap();
        assert_eq!(reply.message, "Sounds good.");
        assert!(reply.objective_progress.is_none());
    }

    #[tokio::test]
    async fn test_objectives_from_reported_tool_call() {
        let service = Arc::new(FakeAgentService::completing_with("I've recorded the progress."));
        service.push_run(
            RunStatus::RequiresAction,
            vec![(
                TRACK_OBJECTIVE_PROGRESS,
                r#"{"rapport": 40, "needs": 35, "objections": 10, "recommendations": 0, "explanation": "Building trust"}"#,
            )],
        );
        let pool = ready_pool(service.clone()).await;
        let router = AiRouter::new(RouterConfig::default(), Some(pool), None);

        let eval = router
            .evaluate_objectives(&[ConversationTurn::advisor("Tell me about your goals.")])
            .await
            .unwrap();

        assert_eq!(eval.source, ResponseSource::ManagedAgent);
        assert!(!eval.parse_error);
        assert_eq!(eval.progress.needs, 35.0);
        assert_eq!(service.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_starter_uses_default() {
        let direct = FakeProvider::replying(&["  \"\"  "]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct));
        let starter = router
            .generate_conversation_starter(&ClientProfile::default())
            .await
            .unwrap();
        assert_eq!(starter.message, DEFAULT_STARTER);
        assert_eq!(starter.source, ResponseSource::DirectApi);
    }

    #[tokio::test]
    async fn test_status_and_health() {
        let direct = FakeProvider::replying(&[]);
        let router = AiRouter::new(RouterConfig::default(), None, Some(direct.clone()));
        let health = router.health().await;
        assert_eq!(health.status, HealthState::Unconfigured);
        assert!(health.fallback_available);

        let service = Arc::new(FakeAgentService::default());
        let router = AiRouter::new(RouterConfig::default(), Some(pool_with(service)), Some(direct));
        assert_eq!(router.health().await.status, HealthState::Unavailable);

        assert!(router.initialize().await);
        let health = router.health().await;
        assert_eq!(health.status, HealthState::Healthy);
        assert_eq!(health.agents_total, 4);
        assert_eq!(health.agents_initialized, 4);

        let status = router.status().await;
        assert!(status.configured);
        assert!(status.available);
        assert_eq!(status.direct.unwrap().model, "fake-model");

        router.shutdown().await;
        assert_eq!(router.health().await.status, HealthState::Unavailable);
    }
}
