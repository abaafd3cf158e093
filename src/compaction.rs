//! Turn-count triggered history compaction

use tracing::{debug, info, warn};

use crate::session::{Session, render_transcript};
use crate::summarizer::{Summarizer, SummaryKind};

/// What a call to [`HistoryCompactor::compact`] did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Below the threshold, nothing changed
    Skipped,
    /// Older turns were replaced by one new summary
    Summarized {
        summarized_turns: usize,
        kept_turns: usize,
    },
    /// Summarization failed; older turns were dropped without a summary
    Truncated { dropped_turns: usize },
}

/// Folds the older part of a session's history into a summary once the turn
/// count reaches the threshold.
///
/// The split point is two thirds of the current turn count (floor). Only turn
/// count triggers compaction; request size is enforced later by the
/// assembler.
#[derive(Clone)]
pub struct HistoryCompactor {
    summarizer: Summarizer,
    threshold: usize,
}

impl HistoryCompactor {
    pub fn new(summarizer: Summarizer, threshold: usize) -> Self {
        Self {
            summarizer,
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a session has enough turns to compact
    pub fn needs_compaction(&self, session: &Session) -> bool {
        session.turns().len() >= self.threshold
    }

    /// Index that separates the old partition from the recent one
    pub fn split_index(turn_count: usize) -> usize {
        turn_count * 2 / 3
    }

    /// Compact the session in place. Never fails.
    pub async fn compact(&self, session: &mut Session) -> CompactionOutcome {
        if !self.needs_compaction(session) {
            return CompactionOutcome::Skipped;
        }

        let total = session.turns().len();
        let split = Self::split_index(total);
        let transcript = render_transcript(&session.turns()[..split]);
        debug!(
            "Compacting session {}: summarizing {} of {} turns",
            session.id(),
            split,
            total
        );

        match self
            .summarizer
            .summarize(&transcript, session.model().id(), SummaryKind::Interim)
            .await
        {
            Ok(summary) => {
                session.fold_into_summary(summary, split);
                info!(
                    "Session {} compacted: {} turns summarized, {} kept, {} summaries total",
                    session.id(),
                    split,
                    total - split,
                    session.summaries().len()
                );
                CompactionOutcome::Summarized {
                    summarized_turns: split,
                    kept_turns: total - split,
                }
            }
            Err(e) => {
                let dropped = session.retain_recent(self.threshold);
                warn!(
                    "Summarization failed for session {}: {}; dropped {} oldest turns",
                    session.id(),
                    e,
                    dropped
                );
                CompactionOutcome::Truncated {
                    dropped_turns: dropped,
                }
            }
        }
    }
}
