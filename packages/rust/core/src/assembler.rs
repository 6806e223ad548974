//! Relevance-filtered context assembly.
//!
//! For each referenced paper the assembler downloads and segments the
//! document, asks the model about every section in turn (one scoped note per
//! call), keeps only the sections judged relevant, and folds their summaries
//! into the paper's placeholder note. One final model call on the augmented
//! conversation produces the answer.
//!
//! Everything runs sequentially: each prompt is built on the same
//! conversation, and extract order must follow section order.

use std::fmt;

use tracing::{debug, error, info, instrument, warn};

use scholarbot_document::{DocumentLayout, DocumentStore, LayoutExtractor};
use scholarbot_llm::{ChatModel, SectionExtraction, parse_extraction};
use scholarbot_segmenter::{SegmentedPaper, segment};
use scholarbot_shared::{ChatMessage, Result, ScholarbotError, SegmenterConfig, TurnId};

use crate::conversation::{Conversation, PaperRef};
use crate::progress::{ProgressSink, notify_best_effort};
use crate::prompts;

// ---------------------------------------------------------------------------
// Per-paper state
// ---------------------------------------------------------------------------

/// Where a paper is in its trip through the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperState {
    Pending,
    Downloading,
    Segmenting,
    /// Screening section `index` (1-based) of `total`.
    Extracting { index: usize, total: usize },
    Augmented,
}

impl fmt::Display for PaperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Downloading => write!(f, "downloading"),
            Self::Segmenting => write!(f, "segmenting"),
            Self::Extracting { index, total } => write!(f, "extracting {index}/{total}"),
            Self::Augmented => write!(f, "augmented"),
        }
    }
}

/// A relevant section's summary, kept in section order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionExtract {
    pub name: String,
    pub summary: String,
}

/// Fence each extract with its section name, separated by blank lines.
pub fn render_extracts(extracts: &[SectionExtract]) -> String {
    extracts
        .iter()
        .map(|e| prompts::fence_section(&e.name, &e.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The user-facing message for a turn that failed.
pub fn apology(err: &ScholarbotError) -> String {
    format!("Sorry I encountered an error: {}: {err}", err.category())
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Everything one answer turn needs. Owned by a single turn.
pub struct ContextAssembler<'a, M: ChatModel> {
    pub model: &'a M,
    pub documents: &'a mut DocumentStore,
    pub extractor: &'a dyn LayoutExtractor,
    pub segmenter: &'a SegmenterConfig,
    pub progress: &'a dyn ProgressSink,
    /// Attempts per progress notification.
    pub progress_retries: u32,
}

impl<M: ChatModel> ContextAssembler<'_, M> {
    /// Answer the conversation's pending question, turning any failure into
    /// an apology message.
    pub async fn run_turn(&mut self, conversation: Conversation, papers: &[PaperRef]) -> String {
        match self.answer(conversation, papers).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(category = e.category(), error = %e, "turn failed");
                apology(&e)
            }
        }
    }

    /// Augment every paper's note with relevant extracts, then answer.
    ///
    /// Every paper is screened against the conversation as it came in; the
    /// notes are only augmented once all papers are done. Failures on a
    /// single section are logged and skipped; failures while fetching or
    /// segmenting a paper, or in the final answer call, are returned.
    #[instrument(skip_all, fields(turn = %TurnId::new(), papers = papers.len()))]
    pub async fn answer(
        &mut self,
        mut conversation: Conversation,
        papers: &[PaperRef],
    ) -> Result<String> {
        let question = conversation
            .pending_question()
            .map(str::to_owned)
            .ok_or_else(|| ScholarbotError::validation("conversation has no question to answer"))?;

        let mut additions: Vec<(usize, String)> = Vec::with_capacity(papers.len());
        for paper in papers {
            let extracts = self.screen_paper(&conversation, paper, &question).await?;
            info!(
                paper = %paper.id,
                relevant = extracts.len(),
                "paper screened"
            );
            additions.push((paper.note_index, render_extracts(&extracts)));
        }

        for (note_index, addition) in &additions {
            conversation.append_to_note(*note_index, addition)?;
        }

        self.notify("Writing answer");
        let answer = self.model.complete(&conversation.messages()).await?;

        info!(answer_chars = answer.len(), "turn answered");
        Ok(answer)
    }

    /// Walk one paper through download, segmentation and section screening.
    async fn screen_paper(
        &mut self,
        conversation: &Conversation,
        paper: &PaperRef,
        question: &str,
    ) -> Result<Vec<SectionExtract>> {
        let mut state = PaperState::Pending;

        advance(&mut state, PaperState::Downloading, paper);
        self.notify(&format!("Downloading {}", paper.id));
        let document = self.documents.fetch(&paper.id).await?;
        let layout = self.extractor.extract(&document)?;

        advance(&mut state, PaperState::Segmenting, paper);
        self.notify(&format!("Finding sections in {}", paper.id));
        let segmented = segment(&layout.pages, self.segmenter)?;

        let total = segmented.len();
        let mut extracts = Vec::new();

        for (i, section) in segmented.sections().iter().enumerate() {
            advance(
                &mut state,
                PaperState::Extracting {
                    index: i + 1,
                    total,
                },
                paper,
            );
            self.notify(&format!("Reading section {}/{total}: {}", i + 1, section.name));

            match self
                .screen_section(conversation, &segmented, &layout, &section.name, question)
                .await
            {
                Ok(extraction) if extraction.relevant => extracts.push(SectionExtract {
                    name: section.name.clone(),
                    summary: extraction.summary,
                }),
                Ok(_) => debug!(section = %section.name, "section not relevant"),
                Err(e) => warn!(
                    section = %section.name,
                    category = e.category(),
                    error = %e,
                    "section skipped"
                ),
            }
        }

        advance(&mut state, PaperState::Augmented, paper);
        Ok(extracts)
    }

    /// Ask the model about one section with a scoped note.
    ///
    /// A reply that does not decode counts as "not relevant".
    async fn screen_section(
        &self,
        conversation: &Conversation,
        segmented: &SegmentedPaper,
        layout: &DocumentLayout,
        name: &str,
        question: &str,
    ) -> Result<SectionExtraction> {
        let text = segmented.section_text(name, layout)?;
        let scoped = ChatMessage::system(prompts::section_prompt(name, &text, question));

        let reply = self.model.complete(&conversation.scoped(&scoped)).await?;

        Ok(parse_extraction(&reply).unwrap_or_else(|e| {
            warn!(section = name, error = %e, "unparseable section reply");
            SectionExtraction::irrelevant()
        }))
    }

    fn notify(&self, text: &str) {
        notify_best_effort(self.progress, text, self.progress_retries);
    }
}

fn advance(state: &mut PaperState, next: PaperState, paper: &PaperRef) {
    debug!(paper = %paper.id, from = %state, to = %next, "paper state");
    *state = next;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
