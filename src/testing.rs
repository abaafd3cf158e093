//! Scripted completion client for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::remote::{CompletionClient, RemoteError, RequestMessage};

/// One recorded call to [`ScriptedClient::complete`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model_id: String,
    pub messages: Vec<RequestMessage>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Replays queued replies in order. An exhausted queue, or a client built
/// with [`ScriptedClient::failing`], answers with `RemoteError::Unavailable`.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    yield_mid_call: bool,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    /// Like [`ScriptedClient::with_replies`], but every call yields to the
    /// runtime once before answering
    pub fn yielding<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            yield_mid_call: true,
            ..Self::with_replies(replies)
        }
    }

    pub fn failing() -> Self {
        Self::new()
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        model_id: &str,
        messages: &[RequestMessage],
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model_id: model_id.to_string(),
            messages: messages.to_vec(),
            max_output_tokens,
            temperature,
        });
        if self.yield_mid_call {
            tokio::task::yield_now().await;
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(RemoteError::Unavailable(message)),
            None => Err(RemoteError::Unavailable("no scripted reply".to_string())),
        }
    }
}
