//! Outbound request assembly under a token ceiling

use tracing::{debug, warn};

use crate::presets::RolePreset;
use crate::remote::RequestMessage;
use crate::session::{Session, TurnRole};
use crate::tokens::TokenEstimator;

/// Header placed before the accumulated summaries
pub const SUMMARY_HEADER: &str = "Контекст предыдущей части разговора:";

/// The message list for one request, plus what it cost to fit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub messages: Vec<RequestMessage>,
    /// Estimated size of `messages`
    pub estimated_tokens: usize,
    /// Turns dropped from the front to respect the ceiling
    pub evicted_turns: usize,
    /// The request is still larger than the ceiling after eviction
    pub over_budget: bool,
}

impl AssembledContext {
    pub fn into_messages(self) -> Vec<RequestMessage> {
        self.messages
    }
}

/// Builds the ordered request: role instruction, accumulated summaries,
/// then turns in chronological order.
///
/// When the estimate exceeds the ceiling (strictly greater), the oldest turn
/// message is removed and the estimate recomputed. System messages are never
/// evicted and the newest turn always stays, so a request can still end up
/// over the ceiling; it is sent anyway and flagged `over_budget`.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    estimator: TokenEstimator,
    max_context_tokens: usize,
    summary_delimiter: String,
}

impl ContextAssembler {
    pub fn new(
        estimator: TokenEstimator,
        max_context_tokens: usize,
        summary_delimiter: String,
    ) -> Self {
        Self {
            estimator,
            max_context_tokens,
            summary_delimiter,
        }
    }

    pub fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    /// Assemble the request for `session`, evicting old turns to fit
    pub fn assemble(&self, session: &Session, preset: RolePreset) -> AssembledContext {
        let (mut messages, system_count) = self.build_messages(session, preset);
        let mut total = self.estimator.estimate_total(&messages);
        let mut evicted_turns = 0;

        while total > self.max_context_tokens && messages.len() > system_count + 1 {
            let removed = messages.remove(system_count);
            total -= self.estimator.estimate(&removed.content);
            evicted_turns += 1;
        }

        if evicted_turns > 0 {
            debug!(
                "Session {}: evicted {} oldest turns to fit {} tokens",
                session.id(),
                evicted_turns,
                self.max_context_tokens
            );
        }

        let over_budget = total > self.max_context_tokens;
        if over_budget {
            warn!(
                "Session {}: request of {} tokens still exceeds the {} token ceiling",
                session.id(),
                total,
                self.max_context_tokens
            );
        }

        AssembledContext {
            messages,
            estimated_tokens: total,
            evicted_turns,
            over_budget,
        }
    }

    /// Estimated size of the full request before any eviction
    pub fn full_context_tokens(&self, session: &Session, preset: RolePreset) -> usize {
        let (messages, _) = self.build_messages(session, preset);
        self.estimator.estimate_total(&messages)
    }

    /// The summaries joined into a single system message body
    pub fn summary_message(&self, summaries: &[String]) -> Option<String> {
        if summaries.is_empty() {
            return None;
        }
        Some(format!(
            "{}\n\n{}",
            SUMMARY_HEADER,
            summaries.join(&self.summary_delimiter)
        ))
    }

    fn build_messages(
        &self,
        session: &Session,
        preset: RolePreset,
    ) -> (Vec<RequestMessage>, usize) {
        let mut messages = Vec::with_capacity(session.turns().len() + 2);
        messages.push(RequestMessage::system(preset.instruction()));
        if let Some(summary) = self.summary_message(session.summaries()) {
            messages.push(RequestMessage::system(summary));
        }
        let system_count = messages.len();

        messages.extend(session.turns().iter().map(|turn| match turn.role {
            TurnRole::User => RequestMessage::user(turn.content.clone()),
            TurnRole::Assistant => RequestMessage::assistant(turn.content.clone()),
        }));

        (messages, system_count)
    }
}
