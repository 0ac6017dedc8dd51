//! Research synthesis.
//!
//! Collects extracted text and image descriptions from completed files, bounds
//! them per item and globally, and asks the generation backend for a
//! structured Markdown analysis of the whole set.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use lens_core::defaults::{
    IMAGE_TRUNCATION_MARKER, MAX_CONTENT_ITEM_CHARS, MAX_IMAGE_ANALYSIS_CHARS, MAX_RESEARCH_CHARS,
    NO_RESEARCH_DATA, RESEARCH_ITEM_OVERHEAD, SYNTHESIS_TEMPERATURE, TEXT_TRUNCATION_MARKER,
    TRUNCATION_WARNING,
};
use lens_core::{
    Error, FileStatus, GenerationBackend, GenerationOptions, ResearchItem, ResearchKind, Result,
    UploadedFile,
};

const ITEM_SEPARATOR: &str = "\n\n---\nEnd of File Content\n---\n\n";

const GLOBAL_TRUNCATION_NOTE: &str = "\n\nNOTE: The provided research material was too extensive even after individual item review and has been globally truncated to fit within processing limits. The analysis is based on the initial portion of the combined data.";

const ITEM_TRUNCATION_NOTE: &str = "\n\nNOTE: Some individual research items were too long and their content was truncated before this combined analysis. The analysis considers these abridged versions.";

/// How much of the research material was cut before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    None,
    /// One or more items exceeded their per-item ceiling.
    PerItem,
    /// The packed set hit the global budget and trailing items were dropped.
    Global,
}

impl Truncation {
    /// User-facing advisory, if any truncation happened.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            Truncation::None => None,
            Truncation::PerItem | Truncation::Global => Some(TRUNCATION_WARNING),
        }
    }

    fn prompt_note(&self) -> &'static str {
        match self {
            Truncation::None => "",
            Truncation::PerItem => ITEM_TRUNCATION_NOTE,
            Truncation::Global => GLOBAL_TRUNCATION_NOTE,
        }
    }
}

/// Research items ready for synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchBundle {
    pub items: Vec<ResearchItem>,
    /// At least one item was cut to its per-item ceiling.
    pub item_truncated: bool,
}

impl ResearchBundle {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisOutcome {
    pub analysis: String,
    pub truncation: Truncation,
    /// Items actually sent to the model.
    pub items_used: usize,
    pub items_total: usize,
}

impl SynthesisOutcome {
    pub fn warning(&self) -> Option<&'static str> {
        self.truncation.warning()
    }
}

/// Cut `text` to at most `max_chars` characters, appending `marker` when cut.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (format!("{}{}", &text[..byte_index], marker), true),
        None => (text.to_string(), false),
    }
}

/// Gather research items from completed files, in file order.
///
/// A file contributes an extracted-text item and/or an image-description item
/// when the corresponding field is non-blank.
pub fn collect_research_items(files: &[UploadedFile]) -> ResearchBundle {
    let mut bundle = ResearchBundle::default();

    for file in files.iter().filter(|f| f.status == FileStatus::Completed) {
        if let Some(text) = file.extracted_text.as_deref().filter(|t| !t.trim().is_empty()) {
            let (content, cut) = truncate_chars(text, MAX_CONTENT_ITEM_CHARS, TEXT_TRUNCATION_MARKER);
            bundle.item_truncated |= cut;
            bundle.items.push(ResearchItem {
                kind: ResearchKind::Text,
                content,
                filename: file.name.clone(),
            });
        }

        if let Some(analysis) = file.image_analysis.as_deref().filter(|t| !t.trim().is_empty()) {
            let (content, cut) =
                truncate_chars(analysis, MAX_IMAGE_ANALYSIS_CHARS, IMAGE_TRUNCATION_MARKER);
            bundle.item_truncated |= cut;
            bundle.items.push(ResearchItem {
                kind: ResearchKind::ImageDescription,
                content,
                filename: file.name.clone(),
            });
        }
    }

    bundle
}

fn item_cost(item: &ResearchItem) -> usize {
    item.content.chars().count() + item.filename.chars().count() + RESEARCH_ITEM_OVERHEAD
}

/// Longest prefix of `items` that fits in `budget`. Packing stops at the first
/// item that does not fit; the flag reports whether anything was dropped.
pub fn pack_items(items: &[ResearchItem], budget: usize) -> (&[ResearchItem], bool) {
    let mut used = 0;
    for (index, item) in items.iter().enumerate() {
        let cost = item_cost(item);
        if used + cost > budget {
            return (&items[..index], true);
        }
        used += cost;
    }
    (items, false)
}

/// Render items as labeled blocks joined by the end-of-file separator.
pub fn format_items(items: &[ResearchItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "--- File: {} (Content Type: {}) ---\n{}",
                item.filename,
                item.kind.label(),
                item.content
            )
        })
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR)
}

/// Build the synthesis prompt.
pub fn build_synthesis_prompt(
    campaign_name: &str,
    formatted_items: &str,
    truncation: Truncation,
) -> String {
    format!(
        r#"You are an AI Research Analyst for ViralLens. Your task is to analyze the following collection of research materials for a campaign titled "{campaign}".
The materials include direct text extracted from documents AND AI-generated textual descriptions of images. You must synthesize insights from ALL available information.{note}

The combined research materials are as follows:
---
{items}
---

Based on ALL this research data, please provide:
1.  **Key Themes & Topics (3-5):** Identify the most prominent themes or topics emerging from the combined text and image descriptions. For each, provide a brief 1-2 sentence description.
2.  **Recurring Patterns & Keywords:** List significant recurring patterns, sentiments, or frequently mentioned keywords/phrases from both text and image data.
3.  **Cross-Modal Connections (if any):** Highlight any interesting connections or correlations between the textual information and the visual information.
4.  **Actionable AI Insights & Content Opportunities (2-3):** Suggest 2-3 high-level, actionable insights or content creation opportunities tailored to the "{campaign}" campaign.

Present your analysis in clear, structured Markdown, for example:

## ViralLens AI Research Analysis: {campaign}

### Overall Summary
A brief (2-3 sentences) high-level summary of the core findings from all research materials.

### Key Themes & Topics
*   **Theme 1:** [Description derived from all data]

### Recurring Patterns & Keywords
*   **Patterns:** [...]
*   **Keywords:** [...]

### Cross-Modal Connections
*   [...]

### Actionable AI Insights & Content Opportunities
1.  **Insight/Opportunity 1:** [...]
2.  **Insight/Opportunity 2:** [...]
"#,
        campaign = campaign_name,
        note = truncation.prompt_note(),
        items = formatted_items,
    )
}

/// Runs research synthesis against a generation backend.
pub struct ResearchSynthesizer {
    backend: Arc<dyn GenerationBackend>,
    budget: usize,
}

impl ResearchSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            budget: MAX_RESEARCH_CHARS,
        }
    }

    /// Override the global character budget.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Synthesize an analysis for the campaign from collected items.
    #[instrument(skip(self, bundle), fields(
        subsystem = "inference",
        component = "research",
        op = "synthesize",
        item_count = bundle.items.len(),
    ))]
    pub async fn synthesize(
        &self,
        campaign_name: &str,
        bundle: &ResearchBundle,
    ) -> Result<SynthesisOutcome> {
        if bundle.is_empty() {
            return Err(Error::Synthesis(NO_RESEARCH_DATA.to_string()));
        }

        let start = Instant::now();
        let (packed, dropped) = pack_items(&bundle.items, self.budget);
        let truncation = if dropped {
            Truncation::Global
        } else if bundle.item_truncated {
            Truncation::PerItem
        } else {
            Truncation::None
        };
        if truncation != Truncation::None {
            warn!(
                truncation = ?truncation,
                items_used = packed.len(),
                items_total = bundle.items.len(),
                "Research material truncated"
            );
        }

        let prompt = build_synthesis_prompt(campaign_name, &format_items(packed), truncation);
        debug!(prompt_len = prompt.len(), "Synthesis prompt built");

        let options = GenerationOptions::default().with_temperature(SYNTHESIS_TEMPERATURE);
        let analysis = self
            .backend
            .generate_with_options("", &prompt, &options)
            .await
            .map_err(|e| {
                Error::Synthesis(format!("Error during AI research analysis: {}", e.detail()))
            })?;

        let analysis = analysis.trim().to_string();
        if analysis.is_empty() {
            return Err(Error::Synthesis(
                "AI research analysis returned no content.".to_string(),
            ));
        }

        info!(
            response_len = analysis.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            model = self.backend.model_name(),
            "Research synthesis complete"
        );

        Ok(SynthesisOutcome {
            analysis,
            truncation,
            items_used: packed.len(),
            items_total: bundle.items.len(),
        })
    }
}
