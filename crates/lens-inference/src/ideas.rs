//! Content idea generation with strict response parsing.
//!
//! The model is asked for a JSON array of idea objects. The response is either
//! accepted whole or rejected with a typed [`IdeaParseError`]; a partially
//! valid list is never returned.

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use lens_core::defaults::{IDEA_COUNT, IDEA_TEMPERATURE, RAW_RESPONSE_PREVIEW_CHARS};
use lens_core::{
    ContentIdea, Error, GenerationBackend, GenerationOptions, ParameterSettings, Result,
};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("code fence pattern is valid")
});

/// Inputs for one idea generation call.
#[derive(Debug, Clone, Copy)]
pub struct IdeaRequest<'a> {
    pub analysis: &'a str,
    pub campaign_name: &'a str,
    pub parameters: &'a ParameterSettings,
    pub count: usize,
}

impl<'a> IdeaRequest<'a> {
    pub fn new(analysis: &'a str, campaign_name: &'a str, parameters: &'a ParameterSettings) -> Self {
        Self {
            analysis,
            campaign_name,
            parameters,
            count: IDEA_COUNT,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Why a model response could not be turned into ideas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdeaParseError {
    #[error("AI generated an empty list of ideas. Try adjusting parameters or research summary.")]
    Empty,

    #[error("AI response was valid JSON but not in the expected format for content ideas.")]
    UnexpectedShape,

    #[error("Failed to parse AI response as JSON. Raw text: {preview}")]
    InvalidJson { preview: String },
}

impl From<IdeaParseError> for Error {
    fn from(err: IdeaParseError) -> Self {
        Error::IdeaGeneration(err.to_string())
    }
}

/// Build the idea generation prompt.
pub fn build_idea_prompt(request: &IdeaRequest<'_>) -> String {
    let p = request.parameters;
    format!(
        r##"You are a Creative Content Strategist AI for ViralLens.
Your goal is to generate {count} distinct content ideas for a campaign titled "{campaign}".
These ideas should be based on the provided Research Analysis Summary and adhere to the specified Content Parameters.

**Research Analysis Summary:**
<research_summary>
{analysis}
</research_summary>

**Content Parameters:**
*   Tone: {tone}
*   Content Style: {style}
*   Complexity: {complexity}
*   Urgency/CTA Strength: {urgency}
*   Visual Style for Mockups: {visual}
*   Target Platform (or General): {platform}

For each of the {count} ideas, provide the following in a JSON array format. Each object in the array should have these keys:
- "id": A unique string identifier for the idea (e.g., "idea-1", "idea-2").
- "postText": The main text/copy for the content piece. This should be well-written and engaging.
- "platform": The primary platform this idea is best suited for (e.g., "Instagram Story", "TikTok Video", "LinkedIn Post"). If the target platform is "General", suggest the most fitting one.
- "contentType": A brief description of the content format (e.g., "Single Image Post", "Short Video Script Idea (30s)", "Carousel Post - 3 slides outline").
- "visualConceptPrompt": A concise (10-20 words) image generation prompt for a visual mockup of this idea, reflecting the Visual Style parameter.
- "hashtags": An array of 3-5 relevant hashtags (strings), like ["#tag1", "#tag2"].

Return ONLY the JSON array of content ideas. Do not include any other text or explanation outside the JSON structure.
"##,
        count = request.count,
        campaign = request.campaign_name,
        analysis = request.analysis,
        tone = p.tone.label(),
        style = p.content_style.label(),
        complexity = p.complexity.label(),
        urgency = p.urgency.label(),
        visual = p.visual_style.label(),
        platform = p.platform.label(),
    )
}

/// Remove one surrounding Markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(2)) {
        Some(body) if !body.as_str().is_empty() => body.as_str().trim(),
        _ => trimmed,
    }
}

/// `"#tag"` or `["#a", "#b"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Hashtags {
    One(String),
    Many(Vec<String>),
}

/// One idea object as the model returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdea {
    #[serde(default)]
    id: Option<JsonValue>,
    post_text: String,
    #[serde(default)]
    platform: String,
    #[serde(default)]
    content_type: String,
    visual_concept_prompt: String,
    #[serde(default)]
    hashtags: Option<Hashtags>,
}

fn preview(text: &str) -> String {
    text.chars().take(RAW_RESPONSE_PREVIEW_CHARS).collect()
}

/// Parse a model response into ideas.
///
/// Accepts a JSON array, or an object wrapping the array under `"ideas"`
/// (the envelope JSON-object response modes force). Missing or duplicate ids
/// become `idea-{now_ms}-{index}`.
pub fn parse_ideas(
    raw: &str,
    requested: usize,
    now_ms: i64,
) -> std::result::Result<Vec<ContentIdea>, IdeaParseError> {
    let body = strip_code_fence(raw);
    let value: JsonValue = serde_json::from_str(body).map_err(|_| IdeaParseError::InvalidJson {
        preview: preview(body),
    })?;

    let entries = match value {
        JsonValue::Array(entries) => entries,
        JsonValue::Object(mut map) => match map.remove("ideas") {
            Some(JsonValue::Array(entries)) => entries,
            _ => return Err(IdeaParseError::UnexpectedShape),
        },
        _ => return Err(IdeaParseError::UnexpectedShape),
    };

    if entries.is_empty() {
        return if requested > 0 {
            Err(IdeaParseError::Empty)
        } else {
            Ok(Vec::new())
        };
    }

    let mut seen = std::collections::HashSet::new();
    let mut ideas = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let raw: RawIdea =
            serde_json::from_value(entry).map_err(|_| IdeaParseError::UnexpectedShape)?;

        let id = match raw.id {
            Some(JsonValue::String(id)) if !id.trim().is_empty() && !seen.contains(&id) => id,
            _ => format!("idea-{}-{}", now_ms, index),
        };
        seen.insert(id.clone());

        let hashtags = match raw.hashtags {
            Some(Hashtags::Many(tags)) => tags,
            Some(Hashtags::One(tag)) => vec![tag],
            None => Vec::new(),
        };

        ideas.push(ContentIdea::generated(
            id,
            raw.post_text,
            raw.platform,
            raw.content_type,
            raw.visual_concept_prompt,
            hashtags,
        ));
    }

    Ok(ideas)
}

/// Generates content ideas through a generation backend.
pub struct IdeaGenerator {
    backend: Arc<dyn GenerationBackend>,
    json_mode: bool,
}

impl IdeaGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            json_mode: false,
        }
    }

    /// Ask the backend for a JSON-object response.
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    #[instrument(skip(self, request), fields(
        subsystem = "inference",
        component = "ideas",
        op = "generate_ideas",
        item_count = request.count,
    ))]
    pub async fn generate(&self, request: &IdeaRequest<'_>) -> Result<Vec<ContentIdea>> {
        let start = Instant::now();
        let prompt = build_idea_prompt(request);
        debug!(prompt_len = prompt.len(), "Idea prompt built");

        let mut options = GenerationOptions::default().with_temperature(IDEA_TEMPERATURE);
        if self.json_mode {
            options = options.json();
        }

        let raw = self
            .backend
            .generate_with_options("", &prompt, &options)
            .await
            .map_err(|e| {
                Error::IdeaGeneration(format!("Error generating content ideas: {}", e.detail()))
            })?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let ideas = parse_ideas(&raw, request.count, now_ms).map_err(|e| {
            warn!(error = %e, response_len = raw.len(), "Idea response rejected");
            Error::from(e)
        })?;

        info!(
            item_count = ideas.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            model = self.backend.model_name(),
            "Content ideas generated"
        );
        Ok(ideas)
    }
}
