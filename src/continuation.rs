//! Carrying summarized memory into a successor session

use tracing::{info, warn};

use crate::session::{Session, truncate_chars};
use crate::summarizer::{Summarizer, SummaryKind};

/// Produces the successor of a session at a continuation boundary.
///
/// The outgoing session's turns are summarized one last time with the
/// continuation instruction; the successor inherits every earlier summary
/// followed by that final one. When the summary call fails, the first
/// `fallback_chars` characters of the raw transcript stand in for it.
#[derive(Clone)]
pub struct SessionCarryOver {
    summarizer: Summarizer,
    fallback_chars: usize,
}

impl SessionCarryOver {
    pub fn new(summarizer: Summarizer, fallback_chars: usize) -> Self {
        Self {
            summarizer,
            fallback_chars,
        }
    }

    /// Build the successor session. The old session is not modified.
    pub async fn carry_over(&self, old: &Session) -> Session {
        let mut summaries = old.summaries().to_vec();

        let transcript = old.transcript();
        if !transcript.is_empty() {
            let final_summary = match self
                .summarizer
                .summarize(&transcript, old.model().id(), SummaryKind::Continuation)
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(
                        "Final summary of session {} failed: {}; keeping first {} characters",
                        old.id(),
                        e,
                        self.fallback_chars
                    );
                    truncate_chars(&transcript, self.fallback_chars).to_string()
                }
            };
            summaries.push(final_summary);
        }

        let next = Session::continuation_of(old, summaries);
        info!(
            "Session {} continued as {} with {} summaries",
            old.id(),
            next.id(),
            next.summaries().len()
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::Config;
    use crate::presets::{Model, RolePreset};
    use crate::testing::ScriptedClient;

    fn carry_over(client: Arc<ScriptedClient>, fallback_chars: usize) -> SessionCarryOver {
        SessionCarryOver::new(Summarizer::new(client, &Config::default()), fallback_chars)
    }

    fn chatty_session() -> Session {
        let mut session = Session::new(Model::Llama, RolePreset::Teacher);
        session.add_user_turn("Объясни рекурсию".to_string());
        session.add_assistant_turn("Рекурсия это вызов функции из самой себя.".to_string());
        session
    }

    #[test]
    fn test_carry_over_appends_final_summary() {
        let client = Arc::new(ScriptedClient::with_replies(["итоговое резюме"]));
        let carry = carry_over(client.clone(), 4000);
        let mut old = chatty_session();
        old.fold_into_summary("раннее резюме".to_string(), 0);
        let before = old.clone();

        let next = tokio_test::block_on(carry.carry_over(&old));

        assert_eq!(
            next.summaries(),
            ["раннее резюме".to_string(), "итоговое резюме".to_string()]
        );
        assert!(next.turns().is_empty());
        assert_eq!(next.model(), Model::Llama);
        assert_eq!(next.role_preset(), RolePreset::Teacher);
        assert_eq!(next.continued_from(), Some("Объясни рекурсию"));
        assert_ne!(next.id(), old.id());

        // the old session is untouched
        assert_eq!(old.turns(), before.turns());
        assert_eq!(old.summaries(), before.summaries());

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_output_tokens, 3000);
        assert_eq!(calls[0].model_id, Model::Llama.id());
        assert_eq!(calls[0].messages[1].content, old.transcript());
    }

    #[test]
    fn test_empty_session_skips_summarization() {
        let client = Arc::new(ScriptedClient::new());
        let carry = carry_over(client.clone(), 4000);
        let old = Session::new(Model::default(), RolePreset::default());

        let next = tokio_test::block_on(carry.carry_over(&old));

        assert!(next.summaries().is_empty());
        assert_eq!(next.continued_from(), None);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_failure_falls_back_to_transcript_prefix() {
        let client = Arc::new(ScriptedClient::failing());
        let carry = carry_over(client, 20);
        let old = chatty_session();

        let next = tokio_test::block_on(carry.carry_over(&old));

        assert_eq!(next.summaries().len(), 1);
        let fallback = &next.summaries()[0];
        assert_eq!(fallback.chars().count(), 20);
        assert!(old.transcript().starts_with(fallback.as_str()));
    }

    #[test]
    fn test_summaries_keep_order_across_two_continuations() {
        let client = Arc::new(ScriptedClient::with_replies(["first final", "second final"]));
        let carry = carry_over(client, 4000);
        let mut old = chatty_session();
        old.fold_into_summary("s0".to_string(), 0);

        let mut middle = tokio_test::block_on(carry.carry_over(&old));
        middle.add_user_turn("Продолжим".to_string());
        let last = tokio_test::block_on(carry.carry_over(&middle));

        assert_eq!(
            last.summaries(),
            [
                "s0".to_string(),
                "first final".to_string(),
                "second final".to_string()
            ]
        );
        assert_eq!(last.continued_from(), Some("Продолжим"));
    }
}
