//! The set of managed agents and their shared availability

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::definition::{AgentDefinition, AgentKind};
use super::managed::{ManagedAgent, RunLimits};
use super::service::AgentService;
use crate::tools::ToolRegistry;

/// Per-agent status entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatus {
    pub name: String,
    pub initialized: bool,
    pub agent_id: Option<String>,
    pub sessions: usize,
}

/// Snapshot of the pool for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStatus {
    pub available: bool,
    pub agents: BTreeMap<AgentKind, AgentStatus>,
    pub errors: BTreeMap<AgentKind, String>,
}

impl PoolStatus {
    pub fn initialized_count(&self) -> usize {
        self.agents.values().filter(|a| a.initialized).count()
    }
}

pub struct AgentPool {
    agents: HashMap<AgentKind, Arc<ManagedAgent>>,
    available: AtomicBool,
    errors: RwLock<BTreeMap<AgentKind, String>>,
}

impl std::fmt::Debug for AgentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentPool")
            .field("agents", &self.agents.len())
            .field("available", &self.is_available())
            .finish()
    }
}

impl AgentPool {
    pub fn new(
        service: Arc<dyn AgentService>,
        tools: Arc<ToolRegistry>,
        definitions: Vec<AgentDefinition>,
        limits: RunLimits,
    ) -> Self {
        let agents = definitions
            .into_iter()
            .map(|def| {
                let kind = def.kind;
                let agent = ManagedAgent::new(def, service.clone(), tools.clone(), limits);
                (kind, Arc::new(agent))
            })
            .collect();

        Self {
            agents,
            available: AtomicBool::new(false),
            errors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Initialize every agent. The pool is available when at least one
    /// initialization succeeds.
    pub async fn initialize_all(&self) -> bool {
        info!("Initializing {} managed agents...", self.agents.len());
        let mut errors = BTreeMap::new();
        let mut succeeded = 0;

        for kind in AgentKind::ALL {
            let Some(agent) = self.agents.get(&kind) else {
                continue;
            };
            match agent.initialize().await {
                Ok(id) => {
                    info!("  ✓ {} ready ({})", agent.name(), id);
                    succeeded += 1;
                }
                Err(e) => {
                    error!("  ✗ {} failed: {:#}", agent.name(), e);
                    errors.insert(kind, format!("{:#}", e));
                }
            }
        }

        let available = succeeded > 0;
        self.available.store(available, Ordering::SeqCst);
        *self.errors.write().await = errors;

        if available {
            info!("{}/{} managed agents initialized", succeeded, self.agents.len());
        } else {
            warn!("No managed agents initialized, requests will use the direct API");
        }
        available
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, kind: AgentKind) -> Option<Arc<ManagedAgent>> {
        self.agents.get(&kind).cloned()
    }

    /// The agent for `kind`, only if the pool is available and that agent is initialized
    pub async fn ready(&self, kind: AgentKind) -> Option<Arc<ManagedAgent>> {
        if !self.is_available() {
            return None;
        }
        let agent = self.agents.get(&kind)?;
        agent.is_initialized().await.then(|| agent.clone())
    }

    pub async fn status(&self) -> PoolStatus {
        let mut agents = BTreeMap::new();
        for (kind, agent) in &self.agents {
            let agent_id = agent.agent_id().await;
            agents.insert(
                *kind,
                AgentStatus {
                    name: agent.name().to_string(),
                    initialized: agent_id.is_some(),
                    agent_id,
                    sessions: agent.threads().count().await,
                },
            );
        }
        PoolStatus {
            available: self.is_available(),
            agents,
            errors: self.errors.read().await.clone(),
        }
    }

    /// Delete every remote agent and mark the pool unavailable
    pub async fn cleanup_all(&self) {
        info!("Cleaning up managed agents...");
        self.available.store(false, Ordering::SeqCst);
        for kind in AgentKind::ALL {
            if let Some(agent) = self.agents.get(&kind) {
                agent.cleanup().await;
            }
        }
        self.errors.write().await.clear();
    }
}
