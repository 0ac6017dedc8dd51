//! # lens-inference
//!
//! Generation backends and the AI stages of the ViralLens workflow.
//!
//! This crate provides:
//! - OpenAI-compatible chat, vision, and image generation backend (feature `openai`)
//! - Local Ollama vision backend for image description
//! - Research synthesis with per-item and global truncation
//! - Content idea generation with strict JSON parsing
//! - Visual prompt composition from idea refinements
//!
//! # Feature Flags
//!
//! - `openai` (default): Enable the OpenAI-compatible backend
//! - `mock`: Expose deterministic mock backends to dependent crates
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lens_inference::{OpenAIBackend, ResearchSynthesizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(OpenAIBackend::from_env().unwrap());
//!     let synthesizer = ResearchSynthesizer::new(backend);
//! }
//! ```

pub mod ideas;
pub mod image;
pub mod research;
pub mod vision;
pub mod visual;

#[cfg(feature = "openai")]
pub mod openai;

// Mock backends for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};

pub use ideas::{
    build_idea_prompt, parse_ideas, strip_code_fence, IdeaGenerator, IdeaParseError, IdeaRequest,
};
pub use image::ImageGenerationBackend;
pub use research::{
    build_synthesis_prompt, collect_research_items, pack_items, truncate_chars, ResearchBundle,
    ResearchSynthesizer, SynthesisOutcome, Truncation,
};
pub use vision::{campaign_image_prompt, OllamaVisionBackend, VisionBackend, DEFAULT_VISION_PROMPT};
pub use visual::compose_visual_prompt;
