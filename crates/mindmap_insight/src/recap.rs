//! The weekly recap pipeline.
//!
//! Two phases across two endpoints: `prepare` finds the window and gathers
//! entry summaries; `analyze` makes the single LLM call, recovers the JSON,
//! and persists the recap exactly once per `(user, window)`.

use mindmap_core::{DateRange, JournalKind, NewRecap, Recap, RecapWindow, Result};
use mindmap_store::{RecapInsert, SqliteStore};
use serde::Serialize;
use std::sync::Arc;

use crate::llm::{CompletionParams, LlmClient};
use crate::parse::{parse_recap_analysis, RecapAnalysis};
use crate::prompts;

/// Phase 1 result.
#[derive(Debug)]
pub enum PrepareOutcome {
    /// A recap for this window already exists; nothing further to do.
    Existing { recap: Recap, range: DateRange },
    /// Summaries gathered; the caller may proceed to `analyze`.
    Ready {
        range: DateRange,
        analysis: AnalysisData,
    },
    /// No summarized entries fell inside the window.
    NoEntries { range: DateRange },
}

/// The merged summary text handed to the analyzer, plus descriptive counts.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisData {
    pub text: String,
    pub entry_count: usize,
    pub freeform_count: usize,
    pub guided_count: usize,
}

/// Phase 2 result.
#[derive(Debug)]
pub enum AnalyzeOutcome {
    /// The caller reported no entries; the LLM was never called.
    NoEntries,
    /// Another request persisted this window's recap first.
    AlreadyExists(Recap),
    Created {
        recap: Recap,
        analysis: RecapAnalysis,
    },
}

pub struct RecapPipeline {
    store: SqliteStore,
    llm: Arc<dyn LlmClient>,
    params: CompletionParams,
}

impl RecapPipeline {
    pub fn new(store: SqliteStore, llm: Arc<dyn LlmClient>, params: CompletionParams) -> Self {
        Self { store, llm, params }
    }

    /// Phase 1 against the most recently completed week.
    pub async fn prepare(&self, user_uid: &str) -> Result<PrepareOutcome> {
        self.prepare_for(user_uid, RecapWindow::current().range())
            .await
    }

    /// As [`prepare`](Self::prepare) with the window pinned by the caller.
    pub async fn prepare_for(&self, user_uid: &str, range: DateRange) -> Result<PrepareOutcome> {
        let scoped = self.store.for_user(user_uid);

        if let Some(recap) = scoped.find_recap(range).await? {
            return Ok(PrepareOutcome::Existing { recap, range });
        }

        let entries = scoped.journal_summaries(range).await?;
        if entries.is_empty() {
            return Ok(PrepareOutcome::NoEntries { range });
        }

        let freeform_count = entries
            .iter()
            .filter(|e| e.journal_type == JournalKind::Freeform)
            .count();
        let text = entries
            .iter()
            .map(|e| e.journal_summary.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(PrepareOutcome::Ready {
            range,
            analysis: AnalysisData {
                entry_count: entries.len(),
                guided_count: entries.len() - freeform_count,
                freeform_count,
                text,
            },
        })
    }

    /// Phase 2: one LLM attempt, no retry; the `(user, window)` uniqueness
    /// constraint plus a pre-insert re-check close the duplicate race.
    pub async fn analyze(
        &self,
        user_uid: &str,
        data: Option<&str>,
        range: DateRange,
    ) -> Result<AnalyzeOutcome> {
        let Some(data) = data.filter(|d| !d.trim().is_empty()) else {
            return Ok(AnalyzeOutcome::NoEntries);
        };

        let prompt = prompts::recap_user_prompt(data, range);
        let raw = self
            .llm
            .complete(prompts::RECAP_SYSTEM_PROMPT, &prompt, self.params.clone())
            .await?;
        let analysis = parse_recap_analysis(&raw)?;

        // Another request may have finished between the caller's prepare and
        // now; re-check before inserting.
        let scoped = self.store.for_user(user_uid);
        if let Some(existing) = scoped.find_recap(range).await? {
            return Ok(AnalyzeOutcome::AlreadyExists(existing));
        }

        let new = NewRecap {
            user_uid: user_uid.to_string(),
            range,
            weekly_summary: analysis.summary.clone(),
            mood: analysis.mood.clone(),
            feeling: analysis.feeling.clone(),
            contributing: analysis.contributing.clone(),
            moments: analysis.moments.clone(),
            cope: analysis.cope.clone(),
            remember: analysis.remember.clone(),
        };
        match scoped.insert_recap(&new).await? {
            RecapInsert::Inserted(recap) => Ok(AnalyzeOutcome::Created { recap, analysis }),
            RecapInsert::AlreadyExists(recap) => Ok(AnalyzeOutcome::AlreadyExists(recap)),
        }
    }
}
