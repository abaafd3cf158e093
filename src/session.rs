//! Session state and conversation turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presets::{Model, RolePreset};
use crate::tokens::HasContent;

/// Maximum length of a session title, in characters
pub const TITLE_MAX_CHARS: usize = 60;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when a turn is flattened into a transcript
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "Пользователь",
            TurnRole::Assistant => "Ассистент",
        }
    }
}

/// One user message or one assistant reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub role: TurnRole,
    pub content: String,
    /// Cached display form, filled in by whoever renders the turn
    pub rendered: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: TurnRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            rendered: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: String) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: String) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

impl HasContent for Turn {
    fn content(&self) -> &str {
        &self.content
    }
}

/// A single conversation's full mutable state.
///
/// `turns` is append-only outside of compaction, `summaries` is append-only,
/// and both `title` and `continued_from` are written at most once. Fields are
/// private so those rules hold for every caller outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    model: Model,
    role_preset: RolePreset,
    turns: Vec<Turn>,
    summaries: Vec<String>,
    title: Option<String>,
    /// Set by the first user turn, even when that turn yields no title
    #[serde(default)]
    title_settled: bool,
    continued_from: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new(model: Model, role_preset: RolePreset) -> Self {
        Self::with_id(Uuid::new_v4(), model, role_preset)
    }

    /// Create a new, empty session under a caller-chosen id
    pub fn with_id(id: Uuid, model: Model, role_preset: RolePreset) -> Self {
        let now = Utc::now();
        Self {
            id,
            model,
            role_preset,
            turns: Vec::new(),
            summaries: Vec::new(),
            title: None,
            title_settled: false,
            continued_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Start a successor session that inherits summarized memory.
    ///
    /// The new session has a fresh id, no turns, the predecessor's model and
    /// role preset, and `continued_from` set to the predecessor's title.
    pub fn continuation_of(previous: &Session, summaries: Vec<String>) -> Self {
        let mut session = Self::new(previous.model, previous.role_preset);
        session.summaries = summaries;
        session.continued_from = previous.title.clone();
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn role_preset(&self) -> RolePreset {
        self.role_preset
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn summaries(&self) -> &[String] {
        &self.summaries
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn continued_from(&self) -> Option<&str> {
        self.continued_from.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether older turns have been folded into summaries
    pub fn is_compressed(&self) -> bool {
        !self.summaries.is_empty()
    }

    /// Switch the model and role preset used for subsequent requests
    pub fn select(&mut self, model: Model, role_preset: RolePreset) {
        self.model = model;
        self.role_preset = role_preset;
    }

    /// Append a turn. The first user turn names the session; a blank one
    /// leaves it untitled for good.
    pub fn add_turn(&mut self, turn: Turn) {
        if !self.title_settled && turn.role == TurnRole::User {
            self.title = make_title(&turn.content);
            self.title_settled = true;
        }
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    pub fn add_user_turn(&mut self, content: String) {
        self.add_turn(Turn::user(content));
    }

    pub fn add_assistant_turn(&mut self, content: String) {
        self.add_turn(Turn::assistant(content));
    }

    /// Cache the display form of a turn. Returns false if there is no such turn.
    pub fn set_rendered(&mut self, index: usize, rendered: String) -> bool {
        match self.turns.get_mut(index) {
            Some(turn) => {
                turn.rendered = Some(rendered);
                true
            }
            None => false,
        }
    }

    /// Get the most recent N turns
    pub fn recent_turns(&self, count: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(count);
        &self.turns[start..]
    }

    /// Flatten every turn into a transcript
    pub fn transcript(&self) -> String {
        render_transcript(&self.turns)
    }

    /// Record a summary of the turns before `keep_from` and drop those turns
    pub(crate) fn fold_into_summary(&mut self, summary: String, keep_from: usize) {
        self.summaries.push(summary);
        self.turns.drain(..keep_from.min(self.turns.len()));
        self.updated_at = Utc::now();
    }

    /// Keep only the most recent `count` turns, discarding the rest unsummarized
    pub(crate) fn retain_recent(&mut self, count: usize) -> usize {
        let dropped = self.turns.len().saturating_sub(count);
        self.turns.drain(..dropped);
        self.updated_at = Utc::now();
        dropped
    }
}

/// Render turns as `Label: content` blocks separated by blank lines
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Take at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn make_title(content: &str) -> Option<String> {
    let first_line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let title = truncate_chars(first_line, TITLE_MAX_CHARS);
    if title.len() < first_line.len() {
        Some(format!("{}...", title.trim_end()))
    } else {
        Some(title.to_string())
    }
}
