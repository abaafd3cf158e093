//! Model-driven transcript summarization
//!
//! A summary is produced by exactly one completion call: a fixed system
//! instruction followed by the verbatim transcript as the user message.
//! Failures are returned to the caller, which owns the fallback.

use std::sync::Arc;

use tracing::debug;

use crate::Config;
use crate::remote::{CompletionClient, RemoteError, RequestMessage};

const INTERIM_INSTRUCTION: &str = "\
Ты система сжатия контекста диалога. Составь плотное и подробное резюме \
приведённой ниже части разговора на русском языке.
Обязательно сохрани:
- фрагменты кода, команды и пути к файлам дословно;
- принятые решения и договорённости;
- имена, названия, числа, даты и версии;
- нерешённые вопросы и текущие задачи.
Не добавляй ничего от себя, не пиши вступлений и заключений. \
Выведи только текст резюме.";

const CONTINUATION_INSTRUCTION: &str = "\
Этот разговор будет продолжен в новой сессии, и твоё резюме станет \
единственной памятью о нём. Составь исчерпывающее резюме всего разговора \
на русском языке.
Сохрани без потерь:
- весь значимый код и команды дословно;
- все факты, решения и их причины;
- имена, названия, числа, даты, версии и настройки;
- что уже сделано, что осталось сделать и открытые вопросы.
Лучше сохранить лишнюю деталь, чем потерять важную. Не пиши вступлений, \
выведи только текст резюме.";

/// Which summary is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Compaction of older turns inside a live session
    Interim,
    /// Final summary of a session that is being continued
    Continuation,
}

impl SummaryKind {
    pub fn instruction(&self) -> &'static str {
        match self {
            SummaryKind::Interim => INTERIM_INSTRUCTION,
            SummaryKind::Continuation => CONTINUATION_INSTRUCTION,
        }
    }
}

/// Issues summarization calls through a [`CompletionClient`]
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn CompletionClient>,
    interim_max_tokens: u32,
    continuation_max_tokens: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(client: Arc<dyn CompletionClient>, config: &Config) -> Self {
        Self {
            client,
            interim_max_tokens: config.interim_summary_tokens,
            continuation_max_tokens: config.final_summary_tokens,
            temperature: config.summary_temperature,
        }
    }

    /// Output bound for a summary kind
    pub fn max_tokens(&self, kind: SummaryKind) -> u32 {
        match kind {
            SummaryKind::Interim => self.interim_max_tokens,
            SummaryKind::Continuation => self.continuation_max_tokens,
        }
    }

    /// Build the two-message summarization prompt
    pub fn build_request(transcript: &str, kind: SummaryKind) -> Vec<RequestMessage> {
        vec![
            RequestMessage::system(kind.instruction()),
            RequestMessage::user(transcript),
        ]
    }

    /// Summarize a transcript with one completion call
    pub async fn summarize(
        &self,
        transcript: &str,
        model_id: &str,
        kind: SummaryKind,
    ) -> Result<String, RemoteError> {
        let messages = Self::build_request(transcript, kind);
        let max_tokens = self.max_tokens(kind);
        debug!(
            "Summarizing {} chars of transcript with {} ({:?}, max {} tokens)",
            transcript.chars().count(),
            model_id,
            kind,
            max_tokens
        );

        let summary = self
            .client
            .complete(model_id, &messages, max_tokens, self.temperature)
            .await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(RemoteError::EmptyResponse);
        }
        Ok(summary.to_string())
    }
}
