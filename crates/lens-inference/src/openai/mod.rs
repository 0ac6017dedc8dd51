//! OpenAI-compatible inference backend.
//!
//! One backend covers the three generation services the workspace needs:
//! chat completions for synthesis and ideas, multimodal chat for image
//! descriptions, and `/images/generations` for visuals. Any endpoint speaking
//! the OpenAI wire format works, including OpenRouter, Ollama in
//! compatibility mode, vLLM and LocalAI.
//!
//! # Example
//!
//! ```rust,no_run
//! use lens_inference::openai::{OpenAIBackend, OpenAIConfig};
//! use lens_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OpenAIConfig::default()
//!         .with_base_url("http://localhost:11434/v1")
//!         .with_gen_model("llama3");
//!     let backend = OpenAIBackend::new(config).unwrap();
//!     let text = backend.generate("Say hello").await.unwrap();
//!     println!("{}", text);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_lens_error, OpenAIErrorCode};
pub use types::*;
