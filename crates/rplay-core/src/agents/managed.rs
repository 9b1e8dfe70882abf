//! A single managed agent: remote lifecycle, threads, and the run/tool loop

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::definition::AgentDefinition;
use super::service::{AgentService, Run, RunStatus, ToolOutput};
use crate::session::{SessionThread, SessionThreads};
use crate::tools::{ToolContext, ToolRegistry};

/// Bounds on one agent run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    pub poll_interval: Duration,
    pub run_timeout: Duration,
    pub max_tool_rounds: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            run_timeout: Duration::from_secs(120),
            max_tool_rounds: 20,
        }
    }
}

/// A tool call resolved during a run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub output: String,
}

/// Final text of a run plus the tool calls made along the way
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentReply {
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_rounds: usize,
}

impl AgentReply {
    /// Arguments of the most recent call to `tool_name`
    pub fn last_call_arguments(&self, tool_name: &str) -> Option<&str> {
        self.tool_calls
            .iter()
            .rev()
            .find(|c| c.name == tool_name)
            .map(|c| c.arguments.as_str())
    }
}

pub struct ManagedAgent {
    definition: AgentDefinition,
    service: Arc<dyn AgentService>,
    tools: Arc<ToolRegistry>,
    limits: RunLimits,
    agent_id: RwLock<Option<String>>,
    threads: SessionThreads,
}

impl std::fmt::Debug for ManagedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedAgent")
            .field("name", &self.definition.name)
            .field("limits", &self.limits)
            .finish()
    }
}

impl ManagedAgent {
    pub fn new(
        definition: AgentDefinition,
        service: Arc<dyn AgentService>,
        tools: Arc<ToolRegistry>,
        limits: RunLimits,
    ) -> Self {
        Self {
            definition,
            service,
            tools,
            limits,
            agent_id: RwLock::new(None),
            threads: SessionThreads::new(),
        }
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub async fn agent_id(&self) -> Option<String> {
        self.agent_id.read().await.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.agent_id.read().await.is_some()
    }

    pub fn threads(&self) -> &SessionThreads {
        &self.threads
    }

    /// Find the remote agent by name, creating it when absent
    pub async fn initialize(&self) -> Result<String> {
        info!("[{}] Initializing agent...", self.name());

        let existing = match self.service.list_agents().await {
            Ok(agents) => agents
                .into_iter()
                .find(|a| a.name.as_deref() == Some(self.name())),
            Err(e) => {
                warn!("[{}] Error listing agents: {:#}", self.name(), e);
                None
            }
        };

        let id = match existing {
            Some(agent) => {
                info!("[{}] Reusing existing agent: {}", self.name(), agent.id);
                agent.id
            }
            None => {
                let tools = self.tools.filter_tools(&self.definition.tool_name_refs());
                info!(
                    "[{}] No existing agent found, creating one with {} tools",
                    self.name(),
                    tools.len()
                );
                let agent = self.service.create_agent(&self.definition, &tools).await?;
                info!("[{}] Created agent: {}", self.name(), agent.id);
                agent.id
            }
        };

        *self.agent_id.write().await = Some(id.clone());
        Ok(id)
    }

    /// Create a thread that is not associated with any session
    pub async fn create_thread(&self) -> Result<String> {
        let thread_id = self.service.create_thread().await?;
        debug!("[{}] Created thread: {}", self.name(), thread_id);
        Ok(thread_id)
    }

    pub async fn get_or_create_thread(&self, session_id: &str) -> Result<Arc<SessionThread>> {
        self.threads
            .get_or_create(session_id, || self.create_thread())
            .await
    }

    /// Send one message on a session's thread, or on a fresh ephemeral thread
    /// when there is no session. Same-session calls queue behind each other.
    pub async fn respond(&self, session_id: Option<&str>, content: &str, ctx: &ToolContext) -> Result<AgentReply> {
        match session_id {
            Some(session_id) => {
                let thread = self.get_or_create_thread(session_id).await?;
                let _turn = thread.lock().await;
                let reply = self.send_message(&thread.thread_id, content, ctx).await?;
                thread.record_message();
                Ok(reply)
            }
            None => {
                let thread_id = self.create_thread().await?;
                self.send_message(&thread_id, content, ctx).await
            }
        }
    }

    /// Post a message and drive the run to completion within the run timeout.
    /// A run abandoned on timeout or error is cancelled so the thread stays usable.
    pub async fn send_message(&self, thread_id: &str, content: &str, ctx: &ToolContext) -> Result<AgentReply> {
        let agent_id = self
            .agent_id()
            .await
            .ok_or_else(|| anyhow!("[{}] Agent not initialized", self.name()))?;

        let mut active_run = None;
        let result = match tokio::time::timeout(
            self.limits.run_timeout,
            self.send_message_inner(&agent_id, thread_id, content, ctx, &mut active_run),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "[{}] Agent run timed out after {}s",
                self.name(),
                self.limits.run_timeout.as_secs()
            )),
        };

        if let (Err(_), Some(run_id)) = (&result, active_run.as_deref()) {
            self.cancel_run(thread_id, run_id).await;
        }
        result
    }

    /// `active_run` holds the id of a run that has started but not finished
    async fn send_message_inner(
        &self,
        agent_id: &str,
        thread_id: &str,
        content: &str,
        ctx: &ToolContext,
        active_run: &mut Option<String>,
    ) -> Result<AgentReply> {
        self.service.add_message(thread_id, content).await?;
        let mut run = self.service.create_run(thread_id, agent_id).await?;
        let mut reply = AgentReply::default();

        loop {
            *active_run = Some(run.id.clone());
            match run.status {
                RunStatus::Completed => break,
                RunStatus::RequiresAction if !run.tool_calls.is_empty() => {
                    reply.tool_rounds += 1;
                    if reply.tool_rounds > self.limits.max_tool_rounds {
                        warn!(
                            "[{}] Run exceeded maximum tool rounds ({})",
                            self.name(),
                            self.limits.max_tool_rounds
                        );
                        return Err(anyhow!(
                            "Agent run exceeded maximum tool rounds ({})",
                            self.limits.max_tool_rounds
                        ));
                    }
                    let outputs = self.resolve_tool_calls(&run, ctx, &mut reply).await;
                    run = self
                        .service
                        .submit_tool_outputs(thread_id, &run.id, &outputs)
                        .await?;
                }
                RunStatus::RequiresAction => {
                    tokio::time::sleep(self.limits.poll_interval).await;
                    run = self.service.get_run(thread_id, &run.id).await?;
                }
                status if status.is_pending() => {
                    debug!("[{}] Run {} is {:?}", self.name(), run.id, status);
                    tokio::time::sleep(self.limits.poll_interval).await;
                    run = self.service.get_run(thread_id, &run.id).await?;
                }
                RunStatus::Failed => {
                    *active_run = None;
                    let message = run.last_error.as_deref().unwrap_or("Unknown error");
                    error!("[{}] Run failed: {}", self.name(), message);
                    return Err(anyhow!("Agent run failed: {}", message));
                }
                other => {
                    *active_run = None;
                    return Err(anyhow!("Agent run ended with status {:?}", other));
                }
            }
        }
        *active_run = None;

        debug!(
            "[{}] Run {} completed (tool rounds: {}, tool calls: {})",
            self.name(),
            run.id,
            reply.tool_rounds,
            reply.tool_calls.len()
        );

        reply.text = self
            .service
            .latest_assistant_text(thread_id)
            .await?
            .unwrap_or_default();
        Ok(reply)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        match self.service.cancel_run(thread_id, run_id).await {
            Ok(()) => info!("[{}] Cancelled run {}", self.name(), run_id),
            Err(e) => warn!("[{}] Failed to cancel run {}: {:#}", self.name(), run_id, e),
        }
    }

    async fn resolve_tool_calls(&self, run: &Run, ctx: &ToolContext, reply: &mut AgentReply) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(run.tool_calls.len());
        for call in &run.tool_calls {
            info!("[{}] Executing tool: {}", self.name(), call.name);
            let output = if self.definition.is_tool_allowed(&call.name) {
                self.tools.resolve(&call.name, &call.arguments, ctx).await
            } else {
                warn!("[{}] Agent requested undeclared tool: {}", self.name(), call.name);
                serde_json::json!({ "error": format!("Unknown tool: {}", call.name) }).to_string()
            };
            reply.tool_calls.push(ToolCallRecord {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                output: output.clone(),
            });
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }
        outputs
    }

    /// Delete the remote agent and forget every thread
    pub async fn cleanup(&self) {
        let agent_id = self.agent_id.write().await.take();
        if let Some(id) = agent_id {
            match self.service.delete_agent(&id).await {
                Ok(()) => info!("[{}] Agent deleted: {}", self.name(), id),
                Err(e) => error!("[{}] Error during cleanup: {:#}", self.name(), e),
            }
        }
        self.threads.clear().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agents::definition::AgentKind;
    use crate::agents::service::{RemoteAgent, ToolCall};
    use crate::tools::ToolDefinition;
    use async_trait::async_trait;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted agent service. Runs replay `runs` in order: the first entry is
    /// returned from `create_run`, later ones from `get_run`/`submit_tool_outputs`.
    #[derive(Default)]
    pub(crate) struct FakeAgentService {
        pub existing: Vec<RemoteAgent>,
        pub runs: Mutex<VecDeque<Run>>,
        pub reply_text: Mutex<Option<String>>,
        pub fail_with: Mutex<Option<String>>,
        pub submitted: Mutex<Vec<Vec<ToolOutput>>>,
        pub messages: Mutex<Vec<(String, String)>>,
        pub calls: AtomicUsize,
        pub threads_created: AtomicUsize,
        pub created_agents: AtomicUsize,
        pub deleted_agents: Mutex<Vec<String>>,
        pub run_delay: Option<Duration>,
        /// Every run stays in progress while set
        pub stall: AtomicBool,
        /// Threads with a run that has not finished; they reject new messages
        pub active_threads: Mutex<HashSet<String>>,
        pub cancelled: Mutex<Vec<String>>,
        /// Runs started on a thread that already had one going
        pub overlapping_runs: AtomicUsize,
    }

    impl FakeAgentService {
        pub fn completing_with(text: &str) -> Self {
            let svc = Self::default();
            *svc.reply_text.lock().unwrap() = Some(text.to_string());
            svc
        }

        pub fn push_run(&self, status: RunStatus, tool_calls: Vec<(&str, &str)>) {
            let n = self.runs.lock().unwrap().len();
            self.runs.lock().unwrap().push_back(Run {
                id: format!("run_{}", n),
                status,
                tool_calls: tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, args))| ToolCall {
                        id: format!("call_{}_{}", n, i),
                        name: name.to_string(),
                        arguments: args.to_string(),
                    })
                    .collect(),
                last_error: None,
            });
        }

        pub fn fail(&self, message: &str) {
            *self.fail_with.lock().unwrap() = Some(message.to_string());
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with.lock().unwrap().clone() {
                Some(msg) => Err(anyhow!(msg)),
                None => Ok(()),
            }
        }

        fn next_run(&self, thread_id: &str) -> Run {
            let run = if self.stall.load(Ordering::SeqCst) {
                Run {
                    id: "run_stalled".to_string(),
                    status: RunStatus::InProgress,
                    tool_calls: Vec::new(),
                    last_error: None,
                }
            } else {
                self.runs.lock().unwrap().pop_front().unwrap_or(Run {
                    id: "run_done".to_string(),
                    status: RunStatus::Completed,
                    tool_calls: Vec::new(),
                    last_error: None,
                })
            };

            let mut active = self.active_threads.lock().unwrap();
            if run.status.is_pending() || run.status == RunStatus::RequiresAction {
                active.insert(thread_id.to_string());
            } else {
                active.remove(thread_id);
            }
            run
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AgentService for FakeAgentService {
        async fn list_agents(&self) -> Result<Vec<RemoteAgent>> {
            self.check()?;
            Ok(self.existing.clone())
        }

        async fn create_agent(&self, definition: &AgentDefinition, _tools: &[ToolDefinition]) -> Result<RemoteAgent> {
            self.check()?;
            let n = self.created_agents.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteAgent {
                id: format!("asst_{}", n),
                name: Some(definition.name.clone()),
            })
        }

        async fn delete_agent(&self, agent_id: &str) -> Result<()> {
            self.check()?;
            self.deleted_agents.lock().unwrap().push(agent_id.to_string());
            Ok(())
        }

        async fn create_thread(&self) -> Result<String> {
            self.check()?;
            let n = self.threads_created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("thread_{}", n))
        }

        async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
            self.check()?;
            if self.active_threads.lock().unwrap().contains(thread_id) {
                return Err(anyhow!("Thread {} already has an active run", thread_id));
            }
            self.messages
                .lock()
                .unwrap()
                .push((thread_id.to_string(), content.to_string()));
            Ok(())
        }

        async fn create_run(&self, thread_id: &str, _agent_id: &str) -> Result<Run> {
            self.check()?;
            if !self.active_threads.lock().unwrap().insert(thread_id.to_string()) {
                self.overlapping_runs.fetch_add(1, Ordering::SeqCst);
            }
            if let Some(delay) = self.run_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.next_run(thread_id))
        }

        async fn get_run(&self, thread_id: &str, _run_id: &str) -> Result<Run> {
            self.check()?;
            Ok(self.next_run(thread_id))
        }

        async fn submit_tool_outputs(&self, thread_id: &str, _run_id: &str, outputs: &[ToolOutput]) -> Result<Run> {
            self.check()?;
            self.submitted.lock().unwrap().push(outputs.to_vec());
            Ok(self.next_run(thread_id))
        }

        async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
            self.check()?;
            self.cancelled.lock().unwrap().push(run_id.to_string());
            self.active_threads.lock().unwrap().remove(thread_id);
            Ok(())
        }

        async fn latest_assistant_text(&self, _thread_id: &str) -> Result<Option<String>> {
            self.check()?;
            Ok(self.reply_text.lock().unwrap().clone())
        }
    }

    fn fast_limits() -> RunLimits {
        RunLimits {
            poll_interval: Duration::from_millis(1),
            run_timeout: Duration::from_secs(5),
            max_tool_rounds: 5,
        }
    }

    pub(crate) fn agent_with(kind: AgentKind, service: Arc<FakeAgentService>) -> ManagedAgent {
        ManagedAgent::new(
            AgentDefinition::new(kind, "rplay-", "gpt-4o"),
            service,
            Arc::new(ToolRegistry::with_builtin_tools()),
            fast_limits(),
        )
    }

    #[tokio::test]
    async fn test_initialize_reuses_existing_agent() {
        let service = Arc::new(FakeAgentService {
            existing: vec![RemoteAgent {
                id: "asst_existing".to_string(),
                name: Some("rplay-evaluation".to_string()),
            }],
            ..Default::default()
        });
        let agent = agent_with(AgentKind::Evaluation, service.clone());
        assert_eq!(agent.initialize().await.unwrap(), "asst_existing");
        assert_eq!(service.created_agents.load(Ordering::SeqCst), 0);
        assert!(agent.is_initialized().await);
    }

    #[tokio::test]
    async fn test_initialize_creates_when_absent() {
        let service = Arc::new(FakeAgentService::default());
        let agent = agent_with(AgentKind::ExpertGuidance, service.clone());
        assert_eq!(agent.initialize().await.unwrap(), "asst_0");
        assert_eq!(service.created_agents.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_before_initialize_fails() {
        let service = Arc::new(FakeAgentService::completing_with("hi"));
        let agent = agent_with(AgentKind::SimulationClient, service);
        let err = agent
            .send_message("thread_x", "Hi", &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_tool_loop_round_trips() {
        let service = Arc::new(FakeAgentService::completing_with("{\"overallScore\": 7}"));
        service.push_run(
            RunStatus::RequiresAction,
            vec![("get_competencies", "{}"), ("get_rubrics", "{}")],
        );
        service.push_run(RunStatus::RequiresAction, vec![("launch_rockets", "{}")]);
        service.push_run(RunStatus::InProgress, vec![]);
        service.push_run(RunStatus::Completed, vec![]);

        let agent = agent_with(AgentKind::Evaluation, service.clone());
        agent.initialize().await.unwrap();
        let reply = agent
            .send_message("thread_1", "Evaluate", &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(reply.text, "{\"overallScore\": 7}");
        assert_eq!(reply.tool_rounds, 2);
        assert_eq!(reply.tool_calls.len(), 3);

        let submitted = service.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 2);
        assert!(submitted[0][0].output.contains("Building Rapport"));
        assert_eq!(submitted[1][0].tool_call_id, "call_1_0");
        assert!(submitted[1][0].output.contains("Unknown tool: launch_rockets"));
    }

    #[tokio::test]
    async fn test_undeclared_tool_is_unknown() {
        let service = Arc::new(FakeAgentService::completing_with("ok"));
        service.push_run(RunStatus::RequiresAction, vec![("get_client_profile", "{}")]);
        let agent = agent_with(AgentKind::Evaluation, service.clone());
        agent.initialize().await.unwrap();
        agent
            .send_message("thread_1", "Evaluate", &ToolContext::default())
            .await
            .unwrap();
        let submitted = service.submitted.lock().unwrap();
        assert!(submitted[0][0].output.contains("Unknown tool: get_client_profile"));
    }

    #[tokio::test]
    async fn test_max_tool_rounds() {
        let service = Arc::new(FakeAgentService::completing_with("never"));
        for _ in 0..10 {
            service.push_run(RunStatus::RequiresAction, vec![("get_rubrics", "{}")]);
        }
        let agent = agent_with(AgentKind::Evaluation, service.clone());
        agent.initialize().await.unwrap();
        let err = agent
            .send_message("thread_1", "Evaluate", &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("maximum tool rounds"));
        assert_eq!(service.submitted.lock().unwrap().len(), 5);
        assert_eq!(*service.cancelled.lock().unwrap(), vec!["run_5".to_string()]);
        assert!(service.active_threads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_run() {
        let service = Arc::new(FakeAgentService::default());
        service.runs.lock().unwrap().push_back(Run {
            id: "run_0".to_string(),
            status: RunStatus::Failed,
            tool_calls: Vec::new(),
            last_error: Some("rate_limit_exceeded".to_string()),
        });
        let agent = agent_with(AgentKind::Evaluation, service.clone());
        agent.initialize().await.unwrap();
        let err = agent
            .send_message("thread_1", "Evaluate", &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate_limit_exceeded"));
        assert!(service.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let service = Arc::new(FakeAgentService {
            run_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let agent = ManagedAgent::new(
            AgentDefinition::new(AgentKind::Evaluation, "rplay-", "gpt-4o"),
            service,
            Arc::new(ToolRegistry::with_builtin_tools()),
            RunLimits {
                run_timeout: Duration::from_millis(20),
                ..fast_limits()
            },
        );
        agent.initialize().await.unwrap();
        let err = agent
            .send_message("thread_1", "Evaluate", &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_run_is_cancelled_and_session_recovers() {
        let service = Arc::new(FakeAgentService::completing_with("Sorry, where were we?"));
        service.stall.store(true, Ordering::SeqCst);
        let agent = ManagedAgent::new(
            AgentDefinition::new(AgentKind::SimulationClient, "rplay-", "gpt-4o"),
            service.clone(),
            Arc::new(ToolRegistry::with_builtin_tools()),
            RunLimits {
                run_timeout: Duration::from_millis(50),
                ..fast_limits()
            },
        );
        agent.initialize().await.unwrap();
        let ctx = ToolContext::default();

        let err = agent.respond(Some("s1"), "turn 1", &ctx).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(*service.cancelled.lock().unwrap(), vec!["run_stalled".to_string()]);

        service.stall.store(false, Ordering::SeqCst);
        let reply = agent.respond(Some("s1"), "turn 2", &ctx).await.unwrap();
        assert_eq!(reply.text, "Sorry, where were we?");

        let messages = service.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, messages[1].0);
        assert_eq!(service.threads_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_session_turns_do_not_overlap() {
        let service = Arc::new(FakeAgentService {
            run_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        *service.reply_text.lock().unwrap() = Some("ok".to_string());
        let agent = Arc::new(agent_with(AgentKind::SimulationClient, service.clone()));
        agent.initialize().await.unwrap();

        let first = {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .respond(Some("s1"), "turn 1", &ToolContext::default())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .respond(Some("s1"), "turn 2", &ToolContext::default())
                    .await
            })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(service.overlapping_runs.load(Ordering::SeqCst), 0);
        assert_eq!(agent.threads().list().await[0].message_count, 2);
        let messages = service.messages.lock().unwrap();
        let contents: Vec<&str> = messages.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(contents, vec!["turn 1", "turn 2"]);
        assert_eq!(messages[0].0, messages[1].0);
    }

    #[tokio::test]
    async fn test_respond_session_affinity() {
        let service = Arc::new(FakeAgentService::completing_with("Hello"));
        let agent = agent_with(AgentKind::SimulationClient, service.clone());
        agent.initialize().await.unwrap();
        let ctx = ToolContext::default();

        agent.respond(Some("s1"), "turn 1", &ctx).await.unwrap();
        agent.respond(Some("s1"), "turn 2", &ctx).await.unwrap();
        agent.respond(None, "one-off", &ctx).await.unwrap();

        assert_eq!(service.threads_created.load(Ordering::SeqCst), 2);
        assert_eq!(agent.threads().count().await, 1);
        let messages = service.messages.lock().unwrap();
        assert_eq!(messages[0].0, messages[1].0);
        assert_ne!(messages[0].0, messages[2].0);
        assert_eq!(agent.threads().list().await[0].message_count, 2);
    }

    #[tokio::test]
    async fn test_cleanup_deletes_agent() {
        let service = Arc::new(FakeAgentService::completing_with("Hello"));
        let agent = agent_with(AgentKind::SimulationClient, service.clone());
        agent.initialize().await.unwrap();
        agent
            .respond(Some("s1"), "Hi", &ToolContext::default())
            .await
            .unwrap();

        agent.cleanup().await;
        assert!(!agent.is_initialized().await);
        assert_eq!(agent.threads().count().await, 0);
        assert_eq!(*service.deleted_agents.lock().unwrap(), vec!["asst_0".to_string()]);
    }

    #[test]
    fn test_last_call_arguments() {
        let reply = AgentReply {
            text: String::new(),
            tool_calls: vec![
                ToolCallRecord {
                    name: "track_objective_progress".to_string(),
                    arguments: "{\"rapport\": 10}".to_string(),
                    output: String::new(),
                },
                ToolCallRecord {
                    name: "track_objective_progress".to_string(),
                    arguments: "{\"rapport\": 20}".to_string(),
                    output: String::new(),
                },
            ],
            tool_rounds: 2,
        };
        assert_eq!(
            reply.last_call_arguments("track_objective_progress"),
            Some("{\"rapport\": 20}")
        );
        assert!(reply.last_call_arguments("get_rubrics").is_none());
    }
}
