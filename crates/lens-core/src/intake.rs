//! File intake: validate raw uploads against an allow-list and stage them as
//! pending [`UploadedFile`]s.
//!
//! A file is accepted when its declared MIME type matches a rule exactly, or
//! when the declared type is generic (empty or `application/octet-stream`)
//! and its extension belongs to a rule. Optionally, generic uploads can be
//! resolved by sniffing their magic bytes.

use std::sync::Arc;

use base64::Engine;
use tracing::debug;

use crate::defaults::FILE_ID_PREFIX;
use crate::models::{new_id, ExtractionStrategy, FileStatus, UploadedFile};

/// One allow-list entry: a MIME type and the extensions that imply it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptRule {
    pub mime: String,
    /// Lower-case extensions including the dot, e.g. `.jpg`.
    pub extensions: Vec<String>,
}

impl AcceptRule {
    pub fn new(mime: &str, extensions: &[&str]) -> Self {
        Self {
            mime: mime.to_string(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }
}

/// Configurable acceptance policy for uploads.
#[derive(Debug, Clone)]
pub struct AcceptPolicy {
    pub rules: Vec<AcceptRule>,
    /// Declared types that carry no information and enable extension fallback.
    pub generic_types: Vec<String>,
    /// Resolve generic uploads by magic bytes before falling back to the extension.
    pub sniff_content: bool,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                AcceptRule::new("text/csv", &[".csv"]),
                AcceptRule::new("application/pdf", &[".pdf"]),
                AcceptRule::new(
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                    &[".docx"],
                ),
                AcceptRule::new("application/msword", &[".doc"]),
                AcceptRule::new("image/jpeg", &[".jpg", ".jpeg"]),
                AcceptRule::new("image/png", &[".png"]),
                AcceptRule::new("image/gif", &[".gif"]),
                AcceptRule::new("image/webp", &[".webp"]),
                AcceptRule::new("video/mp4", &[".mp4"]),
                AcceptRule::new("video/quicktime", &[".mov"]),
                AcceptRule::new("video/webm", &[".webm"]),
                AcceptRule::new("audio/mpeg", &[".mp3"]),
                AcceptRule::new("audio/wav", &[".wav"]),
                AcceptRule::new("audio/ogg", &[".ogg"]),
                AcceptRule::new("text/plain", &[".txt"]),
            ],
            generic_types: vec![String::new(), "application/octet-stream".to_string()],
            sniff_content: false,
        }
    }
}

impl AcceptPolicy {
    /// A policy with no rules; everything is rejected until rules are added.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            ..Default::default()
        }
    }

    pub fn with_rule(mut self, rule: AcceptRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_sniffing(mut self, enabled: bool) -> Self {
        self.sniff_content = enabled;
        self
    }

    fn is_generic(&self, declared_type: &str) -> bool {
        self.generic_types.iter().any(|g| g == declared_type)
    }

    fn knows_mime(&self, mime: &str) -> bool {
        self.rules.iter().any(|r| r.mime == mime)
    }

    fn knows_extension(&self, ext: &str) -> bool {
        self.rules.iter().any(|r| r.extensions.iter().any(|e| e == ext))
    }

    /// Whether a file with this name and declared type is accepted.
    pub fn accepts(&self, name: &str, declared_type: &str) -> bool {
        self.resolve_type(name, declared_type, &[]).is_some()
    }

    /// The type to store for an accepted file, or `None` when rejected.
    ///
    /// Exact MIME matches keep the declared MIME. Generic uploads resolve to
    /// the sniffed MIME (when sniffing is enabled and recognised), otherwise
    /// to the declared type, or the extension when nothing was declared.
    pub fn resolve_type(&self, name: &str, declared_type: &str, data: &[u8]) -> Option<String> {
        let declared = declared_type.trim();
        if !declared.is_empty() && self.knows_mime(declared) {
            return Some(declared.to_string());
        }
        if !self.is_generic(declared) {
            return None;
        }

        if self.sniff_content {
            if let Some(kind) = infer::get(data) {
                if self.knows_mime(kind.mime_type()) {
                    debug!(
                        file_name = name,
                        mime_type = kind.mime_type(),
                        "Resolved generic upload by content"
                    );
                    return Some(kind.mime_type().to_string());
                }
            }
        }

        let ext = extension(name)?;
        if !self.knows_extension(&ext) {
            return None;
        }
        if declared.is_empty() {
            Some(ext)
        } else {
            Some(declared.to_string())
        }
    }
}

impl AcceptPolicy {
    /// Best-guess MIME type for an upload that arrives without one.
    ///
    /// Magic bytes win when they name a known type; otherwise the MIME of the
    /// rule owning the extension. `None` when neither is known.
    pub fn guess_type(&self, name: &str, data: &[u8]) -> Option<String> {
        if let Some(kind) = infer::get(data) {
            if self.knows_mime(kind.mime_type()) {
                return Some(kind.mime_type().to_string());
            }
        }
        let ext = extension(name)?;
        self.rules
            .iter()
            .find(|r| r.extensions.contains(&ext))
            .map(|r| r.mime.clone())
    }
}

/// Lower-case extension including the dot.
pub fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_lowercase()))
}

/// Whether a text extraction strategy applies (PDF, DOCX, DOC, TXT, CSV).
pub fn is_text_parsable(name: &str, file_type: &str) -> bool {
    ExtractionStrategy::for_file(name, file_type).is_some()
}

/// Whether image description applies.
pub fn is_image(file_type: &str) -> bool {
    file_type.to_lowercase().starts_with("image/")
}

/// A raw upload before validation.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub declared_type: String,
    pub data: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            data,
        }
    }
}

/// An upload that did not pass the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub declared_type: String,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.declared_type.is_empty() {
            "unknown type"
        } else {
            &self.declared_type
        };
        write!(f, "File type not supported: {} ({})", self.name, shown)
    }
}

/// Result of validating a batch of uploads.
#[derive(Debug, Default)]
pub struct IntakeOutcome {
    pub accepted: Vec<UploadedFile>,
    pub rejected: Vec<Rejection>,
}

impl IntakeOutcome {
    /// Aggregated rejection message, or `None` when everything was accepted.
    pub fn error_message(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }
        Some(
            self.rejected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Validate uploads and stage the accepted ones with status `pending`.
///
/// Rejections never block the other files in the batch.
pub fn intake_files(files: Vec<IncomingFile>, policy: &AcceptPolicy) -> IntakeOutcome {
    let mut outcome = IntakeOutcome::default();

    for file in files {
        match policy.resolve_type(&file.name, &file.declared_type, &file.data) {
            Some(file_type) => {
                let preview = is_image(&file_type).then(|| data_url(&file_type, &file.data));
                outcome.accepted.push(UploadedFile {
                    id: new_id(FILE_ID_PREFIX),
                    name: file.name,
                    size: file.data.len() as u64,
                    file_type,
                    content: Some(Arc::new(file.data)),
                    preview,
                    status: FileStatus::Pending,
                    extracted_text: None,
                    image_analysis: None,
                    processing_error: None,
                    progress: None,
                });
            }
            None => {
                debug!(
                    file_name = %file.name,
                    mime_type = %file.declared_type,
                    "Rejected upload"
                );
                outcome.rejected.push(Rejection {
                    name: file.name,
                    declared_type: file.declared_type,
                });
            }
        }
    }

    outcome
}

/// Encode bytes as a `data:` URL.
pub fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}
