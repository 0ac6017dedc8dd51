//! Structured logging schema and field name constants for ViralLens.
//!
//! All crates use these field names in `tracing` macros so log aggregation
//! can query by the same keys across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied, save failures |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (research items, idea records) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "core", "inference", "jobs", "store", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pipeline", "research", "ideas", "openai", "json_file"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process_file", "synthesize", "generate_ideas", "save"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Notebook id being operated on.
pub const NOTEBOOK_ID: &str = "notebook_id";

/// Uploaded file id being processed.
pub const FILE_ID: &str = "file_id";

/// Content idea id being operated on.
pub const IDEA_ID: &str = "idea_id";

/// Original file name.
pub const FILE_NAME: &str = "file_name";

/// Declared or resolved MIME type.
pub const MIME_TYPE: &str = "mime_type";

/// Extraction strategy chosen for a file.
pub const STRATEGY: &str = "strategy";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of items (files, research items, ideas) involved.
pub const ITEM_COUNT: &str = "item_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

/// Truncation applied to research input ("none", "per_item", "global").
pub const TRUNCATION: &str = "truncation";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
