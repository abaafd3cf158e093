//! # chat-context
//!
//! Bounded context window management for multi-turn LLM conversations.
//!
//! This crate provides:
//! - Session state with append-only turns and accumulated summaries
//! - Turn-count triggered compaction that asks the model to summarize older turns
//! - Request assembly under a hard token ceiling with FIFO eviction
//! - Session continuation that carries summarized memory into a fresh session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chat_context::{Config, SessionManager};
//! use chat_context::remote::{OpenAiClient, RemoteConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new(RemoteConfig::default())?;
//! let manager = SessionManager::new(Arc::new(client), Config::default())?;
//!
//! let session_id = uuid::Uuid::new_v4();
//! let reply = manager
//!     .handle_turn(session_id, "Привет! Помоги с кодом.", "qwen-coder", "programmer")
//!     .await?;
//! println!("{} ({}% of budget)", reply.reply, reply.status.percent_of_budget);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod compaction;
pub mod continuation;
pub mod error;
pub mod manager;
pub mod presets;
pub mod remote;
pub mod session;
pub mod storage;
pub mod summarizer;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::{AssembledContext, ContextAssembler};
pub use compaction::{CompactionOutcome, HistoryCompactor};
pub use continuation::SessionCarryOver;
pub use error::{ContextError, Result};
pub use manager::{ContextStatus, SessionInfo, SessionManager, TurnReply};
pub use presets::{Model, RolePreset};
pub use remote::{CompletionClient, RemoteError, RequestMessage, RequestRole};
pub use session::{Session, Turn, TurnRole};
pub use storage::{InMemoryStore, SessionHandle, SessionStore};
pub use summarizer::{SummaryKind, Summarizer};
pub use tokens::TokenEstimator;

/// Context window configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on the estimated size of one outbound request
    pub max_context_tokens: usize,
    /// Turn count at which older turns are summarized
    pub compress_threshold: usize,
    /// Output bound for interim compaction summaries
    pub interim_summary_tokens: u32,
    /// Output bound for the final summary written at continuation
    pub final_summary_tokens: u32,
    /// Sampling temperature for summarization calls
    pub summary_temperature: f32,
    /// Output bound for ordinary replies
    pub reply_max_tokens: u32,
    /// Sampling temperature for ordinary replies
    pub reply_temperature: f32,
    /// Characters of raw transcript kept when the final summary cannot be produced
    pub continuation_fallback_chars: usize,
    /// Separator placed between accumulated summaries
    pub summary_delimiter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_context_tokens: 28_000,
            compress_threshold: 20,
            interim_summary_tokens: 2000,
            final_summary_tokens: 3000,
            summary_temperature: 0.3,
            reply_max_tokens: 4096,
            reply_temperature: 0.7,
            continuation_fallback_chars: 4000,
            summary_delimiter: "\n\n---\n\n".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    pub fn with_compress_threshold(mut self, turns: usize) -> Self {
        self.compress_threshold = turns;
        self
    }

    pub fn with_continuation_fallback_chars(mut self, chars: usize) -> Self {
        self.continuation_fallback_chars = chars;
        self
    }

    pub fn with_reply_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.reply_max_tokens = max_tokens;
        self.reply_temperature = temperature;
        self
    }

    /// Check that the settings describe a usable context window
    pub fn validate(&self) -> Result<()> {
        if self.max_context_tokens == 0 {
            return Err(ContextError::Config(
                "max_context_tokens must be greater than zero".to_string(),
            ));
        }
        // Below three turns the two-thirds split leaves nothing to summarize
        if self.compress_threshold < 3 {
            return Err(ContextError::Config(format!(
                "compress_threshold must be at least 3, got {}",
                self.compress_threshold
            )));
        }
        if self.interim_summary_tokens == 0
            || self.final_summary_tokens == 0
            || self.reply_max_tokens == 0
        {
            return Err(ContextError::Config(
                "output token limits must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("summary_temperature", self.summary_temperature),
            ("reply_temperature", self.reply_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ContextError::Config(format!(
                    "{} must be within 0.0..=2.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
