//! Centralized default constants for the ViralLens workspace.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers or user-facing strings.

// =============================================================================
// RESEARCH SYNTHESIS
// =============================================================================

/// Character ceiling for a single extracted-text research item.
pub const MAX_CONTENT_ITEM_CHARS: usize = 75_000;

/// Character ceiling for a single image-description research item.
pub const MAX_IMAGE_ANALYSIS_CHARS: usize = MAX_CONTENT_ITEM_CHARS / 2;

/// Character budget for the whole set of research items sent to synthesis.
pub const MAX_RESEARCH_CHARS: usize = 250_000;

/// Fixed per-item cost added to content and filename length when packing.
pub const RESEARCH_ITEM_OVERHEAD: usize = 100;

/// Marker appended to truncated extracted text.
pub const TEXT_TRUNCATION_MARKER: &str = "\n... [Content truncated due to length]";

/// Marker appended to truncated image analysis.
pub const IMAGE_TRUNCATION_MARKER: &str = "\n... [Image analysis truncated due to length]";

/// Advisory warning shown when any truncation happened.
pub const TRUNCATION_WARNING: &str = "Note: Research data was extensive and automatically summarized/truncated for AI analysis. Results may be based on a subset of your data.";

/// Error when no completed file produced usable content.
pub const NO_RESEARCH_DATA: &str = "No processed text or image descriptions available for analysis. Ensure files are uploaded and processed successfully.";

/// Sampling temperature for research synthesis.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.6;

// =============================================================================
// IDEA GENERATION
// =============================================================================

/// Number of ideas requested when the caller does not specify one.
pub const IDEA_COUNT: usize = 5;

/// Characters of the raw model response echoed back on a JSON parse failure.
pub const RAW_RESPONSE_PREVIEW_CHARS: usize = 1000;

/// Sampling temperature for idea generation.
pub const IDEA_TEMPERATURE: f32 = 0.75;

/// Error when idea generation is requested before synthesis.
pub const SYNTHESIS_REQUIRED: &str = "Please perform AI Research Synthesis first.";

/// Platform label for manually created ideas.
pub const MANUAL_IDEA_PLATFORM: &str = "General";

/// Content type label for manually created ideas.
pub const MANUAL_IDEA_CONTENT_TYPE: &str = "Post";

// =============================================================================
// VISUAL GENERATION
// =============================================================================

/// Default lighting refinement (never appended to prompts).
pub const DEFAULT_LIGHTING: &str = "Bright Studio";

/// Default scenery refinement (never appended to prompts).
pub const DEFAULT_SCENERY: &str = "Neutral Backdrop";

/// Refinement value meaning "described in the notes instead".
pub const CUSTOM_REFINEMENT: &str = "Custom";

/// Preset lighting options offered to users.
pub const LIGHTING_OPTIONS: &[&str] = &[
    "Bright Studio",
    "Golden Hour",
    "Dramatic Shadows",
    "Natural Daylight",
    "Neon Glow",
    "Soft Ambient",
    "Cinematic",
    "Custom",
];

/// Preset scenery options offered to users.
pub const SCENERY_OPTIONS: &[&str] = &[
    "Neutral Backdrop",
    "Urban Street",
    "Lush Forest",
    "Mountain Peak",
    "Beach Sunset",
    "Abstract Gradient",
    "Minimalist Interior",
    "Cyberpunk Cityscape",
    "Custom",
];

/// Message used for safety-policy rejections from the image model.
pub const IMAGE_SAFETY_BLOCKED: &str =
    "Image generation blocked due to safety policies. Please revise the prompt.";

/// MIME type of generated visuals.
pub const GENERATED_IMAGE_MIME: &str = "image/png";

// =============================================================================
// FILE PROCESSING
// =============================================================================

/// Note stored on files that have no text or image processing.
pub const NO_PROCESSING_NOTE: &str = "No specific text/image processing for this file type.";

/// Fallback message for unexpected per-file failures.
pub const OVERALL_PROCESSING_FAILED: &str = "Overall processing failed";

/// Progress message when a file is picked up.
pub const PROGRESS_STARTING: &str = "Starting processing...";

/// Progress message before text extraction.
pub const PROGRESS_EXTRACTING: &str = "Extracting text...";

/// Progress message after text extraction.
pub const PROGRESS_EXTRACTED: &str = "Text extracted.";

/// Progress message before image description.
pub const PROGRESS_ANALYZING_IMAGE: &str = "Analyzing image with AI...";

/// Progress message after image description.
pub const PROGRESS_IMAGE_ANALYZED: &str = "Image analyzed.";

/// Progress message after a text-only file completes.
pub const PROGRESS_COMPLETE: &str = "Processing complete.";

/// Progress message for files without applicable processing.
pub const PROGRESS_NOT_APPLICABLE: &str = "Not applicable for text/image processing.";

/// Error recorded on restored files whose processing never finished.
pub const PROCESSING_INTERRUPTED: &str =
    "Processing was interrupted before completion. Re-upload the file to process it.";

/// Warning kept on `.doc` files that were read as plain text.
pub const DOC_FALLBACK_WARNING: &str = "DOC parsing fallback to plain text; formatting lost.";

/// Fallback message when an image description fails without detail.
pub const IMAGE_ANALYSIS_FAILED: &str = "Image analysis failed";

/// Synthesis refuses to start while any file is still pending or processing.
pub const FILES_STILL_PROCESSING: &str =
    "Some files are still being processed. Wait for processing to finish before synthesis.";

/// Progress messages are cut to this many characters after the `Error: ` prefix.
pub const PROGRESS_ERROR_PREVIEW_CHARS: usize = 100;

/// Timeout for external extraction commands (pdftotext, pandoc, antiword).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

/// Sampling temperature for image descriptions.
pub const VISION_TEMPERATURE: f32 = 0.4;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default text generation model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Default vision model.
pub const VISION_MODEL: &str = "gpt-4o-mini";

/// Default image generation model.
pub const IMAGE_MODEL: &str = "gpt-image-1";

/// Default generated image size.
pub const IMAGE_SIZE: &str = "1024x1024";

/// HTTP timeout for generation requests.
pub const GEN_TIMEOUT_SECS: u64 = 300;

/// Timeout for health check probes.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Default Ollama endpoint for the local vision backend.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Environment variable naming the Ollama vision model.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

// =============================================================================
// EVENTS & PERSISTENCE
// =============================================================================

/// Broadcast channel capacity for workspace events.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Default path of the JSON notebook store.
pub const STORE_PATH: &str = "viral-lens-notebooks.json";

/// Prefix for notebook ids.
pub const NOTEBOOK_ID_PREFIX: &str = "nb";

/// Prefix for file ids.
pub const FILE_ID_PREFIX: &str = "file";

/// Prefix for idea ids.
pub const IDEA_ID_PREFIX: &str = "idea";
