//! Data model for campaign notebooks, uploaded files, and content ideas.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::{
    CUSTOM_REFINEMENT, DEFAULT_LIGHTING, DEFAULT_SCENERY, MANUAL_IDEA_CONTENT_TYPE,
    MANUAL_IDEA_PLATFORM,
};
use crate::error::{Error, Result};

/// Generate a time-ordered id with the given prefix, e.g. `nb-0190c3...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
}

// =============================================================================
// UPLOADED FILES
// =============================================================================

/// Lifecycle of an uploaded file.
///
/// Transitions only move forward: `pending -> processing -> {completed | error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl FileStatus {
    fn rank(self) -> u8 {
        match self {
            FileStatus::Pending => 0,
            FileStatus::Processing => 1,
            FileStatus::Completed | FileStatus::Error => 2,
        }
    }

    /// Whether no further automatic transition happens from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }

    /// Whether moving to `next` keeps the lifecycle monotonic.
    ///
    /// Re-applying the same status is allowed; terminal statuses never change.
    pub fn can_transition_to(self, next: FileStatus) -> bool {
        self == next || (!self.is_terminal() && next.rank() > self.rank())
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A file attached to a notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    /// Declared MIME type, or the `.ext` extension when the MIME was empty.
    pub file_type: String,
    pub size: u64,
    /// Binary content. In memory only; never persisted.
    #[serde(skip)]
    pub content: Option<Arc<Vec<u8>>>,
    /// Local preview reference (a data URL) for images. In memory only.
    #[serde(skip)]
    pub preview: Option<String>,
    pub status: FileStatus,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub image_analysis: Option<String>,
    #[serde(default)]
    pub processing_error: Option<String>,
    /// Latest human-readable progress message.
    #[serde(default)]
    pub progress: Option<String>,
}

impl UploadedFile {
    /// Whether text extraction applies to this file.
    pub fn is_text_parsable(&self) -> bool {
        crate::intake::is_text_parsable(&self.name, &self.file_type)
    }

    /// Whether image description applies to this file.
    pub fn is_image(&self) -> bool {
        crate::intake::is_image(&self.file_type)
    }

    /// Apply a partial update. Rejects non-monotonic status changes.
    pub fn apply(&mut self, patch: FilePatch) -> Result<()> {
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(Error::InvalidInput(format!(
                    "Invalid status transition for file {}: {} -> {}",
                    self.id, self.status, next
                )));
            }
            self.status = next;
        }
        if let Some(text) = patch.extracted_text {
            self.extracted_text = text;
        }
        if let Some(analysis) = patch.image_analysis {
            self.image_analysis = analysis;
        }
        if let Some(error) = patch.processing_error {
            self.processing_error = error;
        }
        if let Some(progress) = patch.progress {
            self.progress = Some(progress);
        }
        Ok(())
    }
}

/// Partial update for an [`UploadedFile`].
///
/// Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilePatch {
    pub status: Option<FileStatus>,
    pub extracted_text: Option<Option<String>>,
    pub image_analysis: Option<Option<String>>,
    pub processing_error: Option<Option<String>>,
    pub progress: Option<String>,
}

impl FilePatch {
    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            progress: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, message: impl Into<String>) -> Self {
        self.progress = Some(message.into());
        self
    }

    pub fn with_extracted_text(mut self, text: Option<String>) -> Self {
        self.extracted_text = Some(text);
        self
    }

    pub fn with_image_analysis(mut self, analysis: Option<String>) -> Self {
        self.image_analysis = Some(analysis);
        self
    }

    pub fn with_processing_error(mut self, error: Option<String>) -> Self {
        self.processing_error = Some(error);
        self
    }
}

/// Strategy used to pull text out of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Plain text and CSV, read as UTF-8.
    TextNative,
    /// PDF text layer.
    PdfText,
    /// Word documents (DOCX, DOC).
    OfficeConvert,
}

impl ExtractionStrategy {
    /// Pick a strategy from the declared type and file name, matching either.
    pub fn for_file(name: &str, file_type: &str) -> Option<Self> {
        let file_type = file_type.to_lowercase();
        let name = name.to_lowercase();
        let has = |mime: &str, ext: &str| file_type == mime || name.ends_with(ext);

        if has("application/pdf", ".pdf") {
            Some(Self::PdfText)
        } else if has(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ".docx",
        ) || has("application/msword", ".doc")
        {
            Some(Self::OfficeConvert)
        } else if has("text/plain", ".txt") || has("text/csv", ".csv") {
            Some(Self::TextNative)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TextNative => "text_native",
            Self::PdfText => "pdf_text",
            Self::OfficeConvert => "office_convert",
        };
        write!(f, "{}", s)
    }
}

/// Output of an extraction adapter.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub extracted_text: Option<String>,
    /// Adapter-specific metadata (char counts, converter, page info).
    pub metadata: JsonValue,
    /// Non-fatal note, e.g. a degraded fallback conversion.
    pub warning: Option<String>,
}

// =============================================================================
// PARAMETER SETTINGS
// =============================================================================

/// Declares a closed set of user-facing choices with display labels.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every choice, in presentation order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display label.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("Unknown {}: {}", stringify!($name), s))
                    })
            }
        }
    };
}

labeled_enum! {
    /// Voice of the generated copy.
    Tone default Casual {
        Professional => "Professional",
        Casual => "Casual",
        Playful => "Playful",
        Informative => "Informative",
        Witty => "Witty",
    }
}

labeled_enum! {
    /// Overall format intent.
    ContentStyle default Educational {
        Educational => "Educational",
        Entertainment => "Entertainment",
        Promotional => "Promotional",
        Storytelling => "Storytelling",
        News => "News",
    }
}

labeled_enum! {
    Complexity default Detailed {
        Simple => "Simple",
        Detailed => "Detailed",
        Technical => "Technical",
    }
}

labeled_enum! {
    /// Strength of the call to action.
    Urgency default Medium {
        Soft => "Soft",
        Medium => "Medium",
        Strong => "Strong",
    }
}

labeled_enum! {
    /// Visual style appended to every image prompt.
    VisualStyle default Bold {
        Minimalist => "Minimalist",
        Bold => "Bold",
        Artistic => "Artistic",
        Natural => "Natural",
        Futuristic => "Futuristic",
    }
}

labeled_enum! {
    Platform default General {
        Instagram => "Instagram",
        TikTok => "TikTok",
        LinkedIn => "LinkedIn",
        Twitter => "Twitter",
        Blog => "Blog",
        General => "General",
    }
}

labeled_enum! {
    /// Color tag for an idea card.
    IdeaColor default Default {
        Default => "Default",
        Rose => "Rose",
        Sky => "Sky",
        Teal => "Teal",
        Amber => "Amber",
        Violet => "Violet",
    }
}

/// Generation parameters chosen per notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParameterSettings {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub content_style: ContentStyle,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub visual_style: VisualStyle,
    #[serde(default)]
    pub platform: Platform,
}

impl ParameterSettings {
    /// Merge a partial update. Returns true when any field changed value.
    pub fn apply(&mut self, patch: ParameterPatch) -> bool {
        let before = *self;
        if let Some(v) = patch.tone {
            self.tone = v;
        }
        if let Some(v) = patch.content_style {
            self.content_style = v;
        }
        if let Some(v) = patch.complexity {
            self.complexity = v;
        }
        if let Some(v) = patch.urgency {
            self.urgency = v;
        }
        if let Some(v) = patch.visual_style {
            self.visual_style = v;
        }
        if let Some(v) = patch.platform {
            self.platform = v;
        }
        before != *self
    }
}

/// Partial update for [`ParameterSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterPatch {
    pub tone: Option<Tone>,
    pub content_style: Option<ContentStyle>,
    pub complexity: Option<Complexity>,
    pub urgency: Option<Urgency>,
    pub visual_style: Option<VisualStyle>,
    pub platform: Option<Platform>,
}

impl ParameterPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// CONTENT IDEAS
// =============================================================================

/// Per-idea overrides for visual generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementParameters {
    pub lighting: String,
    pub scenery: String,
    #[serde(default)]
    pub storyboard_notes: String,
    /// Replaces the composed prompt entirely when non-blank.
    #[serde(default)]
    pub custom_prompt_override: String,
}

impl Default for RefinementParameters {
    fn default() -> Self {
        Self {
            lighting: DEFAULT_LIGHTING.to_string(),
            scenery: DEFAULT_SCENERY.to_string(),
            storyboard_notes: String::new(),
            custom_prompt_override: String::new(),
        }
    }
}

impl RefinementParameters {
    /// Lighting value worth adding to a prompt, if any.
    pub fn effective_lighting(&self) -> Option<&str> {
        effective_choice(&self.lighting, DEFAULT_LIGHTING)
    }

    /// Scenery value worth adding to a prompt, if any.
    pub fn effective_scenery(&self) -> Option<&str> {
        effective_choice(&self.scenery, DEFAULT_SCENERY)
    }

    /// Trimmed override, if the user supplied one.
    pub fn prompt_override(&self) -> Option<&str> {
        let trimmed = self.custom_prompt_override.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn apply(&mut self, patch: RefinementPatch) {
        if let Some(v) = patch.lighting {
            self.lighting = v;
        }
        if let Some(v) = patch.scenery {
            self.scenery = v;
        }
        if let Some(v) = patch.storyboard_notes {
            self.storyboard_notes = v;
        }
        if let Some(v) = patch.custom_prompt_override {
            self.custom_prompt_override = v;
        }
    }
}

fn effective_choice<'a>(value: &'a str, default: &str) -> Option<&'a str> {
    (!value.is_empty() && value != CUSTOM_REFINEMENT && value != default).then_some(value)
}

/// Partial update for [`RefinementParameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementPatch {
    pub lighting: Option<String>,
    pub scenery: Option<String>,
    pub storyboard_notes: Option<String>,
    pub custom_prompt_override: Option<String>,
}

/// A suggested (or hand-written) piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIdea {
    pub id: String,
    pub post_text: String,
    pub platform: String,
    pub content_type: String,
    pub visual_concept_prompt: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_pinned: bool,
    /// True when written by the user rather than generated.
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub generated_image_url: Option<String>,
    #[serde(default)]
    pub image_generation_error: Option<String>,
    /// Visual generation in flight. Never persisted.
    #[serde(default)]
    pub is_generating_image: bool,
    #[serde(default)]
    pub color: IdeaColor,
    #[serde(default)]
    pub refinement: RefinementParameters,
}

impl ContentIdea {
    /// A generated idea with runtime fields at their defaults.
    pub fn generated(
        id: impl Into<String>,
        post_text: impl Into<String>,
        platform: impl Into<String>,
        content_type: impl Into<String>,
        visual_concept_prompt: impl Into<String>,
        hashtags: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            post_text: post_text.into(),
            platform: platform.into(),
            content_type: content_type.into(),
            visual_concept_prompt: visual_concept_prompt.into(),
            hashtags,
            is_selected: false,
            is_pinned: false,
            is_manual: false,
            generated_image_url: None,
            image_generation_error: None,
            is_generating_image: false,
            color: IdeaColor::Default,
            refinement: RefinementParameters::default(),
        }
    }

    /// Apply a visual generation state change.
    pub fn apply_visual(&mut self, patch: VisualPatch) {
        match patch {
            VisualPatch::Started => {
                self.is_generating_image = true;
                self.image_generation_error = None;
                self.generated_image_url = None;
            }
            VisualPatch::Finished { image_url, error } => {
                self.is_generating_image = false;
                self.generated_image_url = image_url;
                self.image_generation_error = error;
            }
        }
    }
}

/// User-entered fields for creating or editing an idea.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaDraft {
    pub post_text: String,
    pub platform: String,
    pub content_type: String,
    pub visual_concept_prompt: String,
    pub hashtags: Vec<String>,
    pub color: Option<IdeaColor>,
    pub is_pinned: Option<bool>,
    pub refinement: Option<RefinementParameters>,
}

impl IdeaDraft {
    /// Split a comma-separated hashtag field, dropping blanks.
    pub fn hashtags_from_csv(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Trim text fields and require post text and content type.
    pub fn validated(self) -> Result<Self> {
        let draft = Self {
            post_text: self.post_text.trim().to_string(),
            platform: self.platform.trim().to_string(),
            content_type: self.content_type.trim().to_string(),
            visual_concept_prompt: self.visual_concept_prompt.trim().to_string(),
            ..self
        };
        if draft.post_text.is_empty() {
            return Err(Error::InvalidInput("Post text is required.".to_string()));
        }
        if draft.content_type.is_empty() {
            return Err(Error::InvalidInput("Content type is required.".to_string()));
        }
        Ok(draft)
    }

    /// Build a new manual idea from this draft.
    pub(crate) fn into_manual_idea(self, id: String) -> ContentIdea {
        ContentIdea {
            id,
            post_text: self.post_text,
            platform: non_empty_or(self.platform, MANUAL_IDEA_PLATFORM),
            content_type: non_empty_or(self.content_type, MANUAL_IDEA_CONTENT_TYPE),
            visual_concept_prompt: self.visual_concept_prompt,
            hashtags: self.hashtags,
            is_selected: false,
            is_pinned: self.is_pinned.unwrap_or(false),
            is_manual: true,
            generated_image_url: None,
            image_generation_error: None,
            is_generating_image: false,
            color: self.color.unwrap_or_default(),
            refinement: self.refinement.unwrap_or_default(),
        }
    }

    /// Merge into an existing idea, keeping its manual/generated flag.
    pub(crate) fn merge_into(self, idea: &mut ContentIdea) {
        idea.post_text = self.post_text;
        idea.platform = self.platform;
        idea.content_type = self.content_type;
        idea.visual_concept_prompt = self.visual_concept_prompt;
        idea.hashtags = self.hashtags;
        if let Some(color) = self.color {
            idea.color = color;
        }
        if let Some(pinned) = self.is_pinned {
            idea.is_pinned = pinned;
        }
        if let Some(refinement) = self.refinement {
            idea.refinement = refinement;
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Visual generation state change for one idea.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualPatch {
    /// Mark in flight and clear the previous image and error.
    Started,
    /// Store the outcome and clear the in-flight flag.
    Finished {
        image_url: Option<String>,
        error: Option<String>,
    },
}

// =============================================================================
// NOTEBOOKS
// =============================================================================

/// A named workspace grouping files, settings, and ideas for one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    pub campaign_name: String,
    pub files: Vec<UploadedFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parameters: ParameterSettings,
    pub content_ideas: Vec<ContentIdea>,
    pub research_analysis: Option<String>,
}

impl Notebook {
    /// Create an empty notebook with default parameters.
    pub fn new(name: impl Into<String>, campaign_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(crate::defaults::NOTEBOOK_ID_PREFIX),
            name: name.into(),
            campaign_name: campaign_name.into(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
            parameters: ParameterSettings::default(),
            content_ideas: Vec::new(),
            research_analysis: None,
        }
    }

    pub fn file(&self, file_id: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn idea(&self, idea_id: &str) -> Option<&ContentIdea> {
        self.content_ideas.iter().find(|i| i.id == idea_id)
    }

    /// True when there is at least one file and every file is terminal.
    pub fn all_files_processed(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.status.is_terminal())
    }

    pub fn selected_idea_count(&self) -> usize {
        self.content_ideas.iter().filter(|i| i.is_selected).count()
    }
}

// =============================================================================
// RESEARCH ITEMS
// =============================================================================

/// Origin of a research item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchKind {
    Text,
    ImageDescription,
}

impl ResearchKind {
    /// Label used when presenting the item to the model.
    pub fn label(&self) -> &'static str {
        match self {
            ResearchKind::Text => "Extracted Text",
            ResearchKind::ImageDescription => "AI Image Description",
        }
    }
}

/// One labeled piece of content sent to research synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub kind: ResearchKind,
    pub content: String,
    pub filename: String,
}
