//! Orchestration of user turns, continuation and diagnostics

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Config;
use crate::assembler::ContextAssembler;
use crate::compaction::HistoryCompactor;
use crate::continuation::SessionCarryOver;
use crate::error::{ContextError, Result};
use crate::presets::{Model, RolePreset};
use crate::remote::CompletionClient;
use crate::session::Session;
use crate::storage::{InMemoryStore, SessionHandle, SessionStore};
use crate::summarizer::Summarizer;
use crate::tokens::TokenEstimator;

/// Prefix of the reply shown when the primary completion fails
pub const ERROR_REPLY_PREFIX: &str = "Ошибка: ";

/// Read-only snapshot of a session's context usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextStatus {
    pub turn_count: usize,
    /// Estimated size of the full context before any eviction
    pub estimated_tokens: usize,
    pub is_compressed: bool,
    pub summary_count: usize,
    pub percent_of_budget: u8,
    /// The request is still over the ceiling after eviction
    pub over_budget: bool,
}

impl ContextStatus {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of one user turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    /// The remote call failed and `reply` carries the error marker
    pub failed: bool,
    pub status: ContextStatus,
}

/// Summary information about a stored session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub title: Option<String>,
    pub continued_from: Option<String>,
    pub model: Model,
    pub role_preset: RolePreset,
    pub turn_count: usize,
    pub summary_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionInfo {
    fn from_session(session: &Session) -> Self {
        Self {
            id: session.id(),
            title: session.title().map(str::to_string),
            continued_from: session.continued_from().map(str::to_string),
            model: session.model(),
            role_preset: session.role_preset(),
            turn_count: session.turns().len(),
            summary_count: session.summaries().len(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

/// Entry point for collaborators: owns the session registry and wires the
/// compactor, assembler and carry-over to one completion client.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    client: Arc<dyn CompletionClient>,
    compactor: HistoryCompactor,
    assembler: ContextAssembler,
    carry_over: SessionCarryOver,
    config: Config,
}

impl SessionManager {
    /// Create a session manager backed by an in-memory registry
    pub fn new(client: Arc<dyn CompletionClient>, config: Config) -> Result<Self> {
        Self::with_store(Arc::new(InMemoryStore::new()), client, config)
    }

    /// Create a session manager with a custom registry
    pub fn with_store(
        store: Arc<dyn SessionStore>,
        client: Arc<dyn CompletionClient>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        let summarizer = Summarizer::new(client.clone(), &config);
        Ok(Self {
            store,
            compactor: HistoryCompactor::new(summarizer.clone(), config.compress_threshold),
            assembler: ContextAssembler::new(
                TokenEstimator::new(),
                config.max_context_tokens,
                config.summary_delimiter.clone(),
            ),
            carry_over: SessionCarryOver::new(summarizer, config.continuation_fallback_chars),
            client,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one user turn.
    ///
    /// An unknown `session_id` starts a fresh session under that ID. The
    /// session stays locked from the append of the user turn until the reply
    /// is recorded, so turns against one session never interleave. Remote
    /// failures never surface as errors: the reply carries an error marker
    /// and is not added to the history.
    pub async fn handle_turn(
        &self,
        session_id: Uuid,
        user_text: &str,
        model_name: &str,
        role_name: &str,
    ) -> Result<TurnReply> {
        let model = Model::from_name(model_name);
        let preset = RolePreset::from_name(role_name);
        let (handle, created) = self
            .store
            .get_or_insert(Session::with_id(session_id, model, preset))?;
        if created {
            debug!("Unknown session {}, started a new one", session_id);
        }

        let mut session = handle.lock().await;
        session.select(model, preset);
        session.add_user_turn(user_text.to_string());

        self.compactor.compact(&mut session).await;

        let context = self.assembler.assemble(&session, preset);
        let outcome = self
            .client
            .complete(
                model.id(),
                &context.messages,
                self.config.reply_max_tokens,
                self.config.reply_temperature,
            )
            .await;

        let (reply, failed) = match outcome {
            Ok(reply) => {
                session.add_assistant_turn(reply.clone());
                (reply, false)
            }
            Err(e) => {
                warn!("Completion failed for session {}: {}", session_id, e);
                (format!("{}{}", ERROR_REPLY_PREFIX, e), true)
            }
        };

        Ok(TurnReply {
            reply,
            failed,
            status: self.status_of(&session),
        })
    }

    /// Continue a session in a fresh one that inherits its summarized memory.
    /// Returns the new session's ID; the old session is kept.
    pub async fn continue_session(&self, session_id: &Uuid) -> Result<Uuid> {
        let handle = self.handle(session_id)?;
        let old = handle.lock().await;
        let next = self.carry_over.carry_over(&old).await;
        drop(old);

        let next_id = next.id();
        self.store.put(next)?;
        Ok(next_id)
    }

    /// Diagnostic snapshot of a session's context usage
    pub async fn context_status(&self, session_id: &Uuid) -> Result<ContextStatus> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().await;
        Ok(self.status_of(&session))
    }

    /// Explicitly create an empty session
    pub fn new_session(&self, model_name: &str, role_name: &str) -> Result<Uuid> {
        let session = Session::new(Model::from_name(model_name), RolePreset::from_name(role_name));
        let id = session.id();
        self.store.put(session)?;
        info!("Created session {}", id);
        Ok(id)
    }

    /// Copy of a session's current state, e.g. for rendering its history
    pub async fn session_snapshot(&self, session_id: &Uuid) -> Result<Session> {
        let handle = self.handle(session_id)?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// Delete a session. Returns whether it existed.
    pub fn delete_session(&self, session_id: &Uuid) -> Result<bool> {
        self.store.delete(session_id)
    }

    /// Every session, most recently updated first
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let mut infos = Vec::new();
        for handle in self.store.list()? {
            let session = handle.lock().await;
            infos.push(SessionInfo::from_session(&session));
        }
        infos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(infos)
    }

    fn handle(&self, session_id: &Uuid) -> Result<SessionHandle> {
        self.store
            .get(session_id)?
            .ok_or_else(|| ContextError::SessionNotFound(session_id.to_string()))
    }

    fn status_of(&self, session: &Session) -> ContextStatus {
        let max = self.assembler.max_context_tokens();
        let preset = session.role_preset();
        let estimated_tokens = self.assembler.full_context_tokens(session, preset);
        ContextStatus {
            turn_count: session.turns().len(),
            estimated_tokens,
            is_compressed: session.is_compressed(),
            summary_count: session.summaries().len(),
            percent_of_budget: percent_of_budget(estimated_tokens, max),
            over_budget: self.assembler.assemble(session, preset).over_budget,
        }
    }
}

/// `min(100, round(estimated / max * 100))`
pub fn percent_of_budget(estimated_tokens: usize, max_context_tokens: usize) -> u8 {
    if max_context_tokens == 0 {
        return 100;
    }
    let percent = (estimated_tokens as f64 / max_context_tokens as f64 * 100.0).round();
    percent.min(100.0) as u8
}
