//! Session storage - conversation state kept between runs

use crate::audit::AuditTrail;
use agenthub_core::{AgentType, Message, Result, SessionId, UsageTotals};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub workspace: PathBuf,
    pub agent_type: AgentType,
    pub history: Vec<Message>,
    /// Running totals across every run in this session.
    pub usage: UsageTotals,
    /// Prompt to run as soon as a client connects. Cleared once taken.
    pub initial_prompt: Option<String>,
    pub audit: AuditTrail,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(workspace: impl Into<PathBuf>, agent_type: AgentType) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            workspace: workspace.into(),
            agent_type,
            history: Vec::new(),
            usage: UsageTotals::default(),
            initial_prompt: None,
            audit: AuditTrail::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_initial_prompt(mut self, prompt: Option<String>) -> Self {
        self.initial_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    /// Record the outcome of one run.
    pub fn record_run(&mut self, turn: Vec<Message>, usage: UsageTotals, trail: AuditTrail) {
        self.history.extend(turn);
        self.usage = usage;
        self.audit.extend(trail);
        self.updated_at = Utc::now();
    }
}

/// Where sessions live between runs. The transport only talks to this
/// trait, so a durable backend can replace the in-memory one.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Insert or replace.
    async fn put(&self, session: Session) -> Result<()>;

    /// Most recently created first.
    async fn list(&self, limit: usize) -> Result<Vec<Session>>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.value().clone()))
    }

    async fn put(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let mut all: Vec<Session> = self.sessions.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }
}
