//! OpenAI-specific error handling.

use lens_core::defaults::IMAGE_SAFETY_BLOCKED;
use lens_core::Error;

use super::types::OpenAIError;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Prompt or output rejected by the provider's safety system.
    ContentPolicy,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error body.
    pub fn from_response(status: u16, error: &OpenAIError) -> Self {
        let code = error.code.as_deref().unwrap_or_default();
        let message = error.message.to_lowercase();
        match (status, error.error_type.as_str()) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            _ if code == "content_policy_violation"
                || message.contains("safety")
                || message.contains("policy violation") =>
            {
                Self::ContentPolicy
            }
            (400, t) if t.contains("context_length") || code.contains("context_length") => {
                Self::ContextLengthExceeded
            }
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert OpenAI error to a workspace Error.
pub fn to_lens_error(code: OpenAIErrorCode, message: &str) -> Error {
    match code {
        OpenAIErrorCode::AuthenticationError => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::RateLimitExceeded => {
            Error::Inference(format!("Rate limit exceeded: {}", message))
        }
        OpenAIErrorCode::ModelNotFound => Error::Config(format!("Model not found: {}", message)),
        OpenAIErrorCode::ContextLengthExceeded => {
            Error::Inference(format!("Context too long: {}", message))
        }
        OpenAIErrorCode::ContentPolicy => Error::ImageGeneration(IMAGE_SAFETY_BLOCKED.to_string()),
        OpenAIErrorCode::ServerError => Error::Inference(format!("Server error: {}", message)),
        OpenAIErrorCode::Unknown => Error::Inference(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(error_type: &str, code: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError {
            message: message.to_string(),
            error_type: error_type.to_string(),
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn test_error_code_from_status() {
        let plain = err("invalid_request_error", None, "bad");
        assert_eq!(
            OpenAIErrorCode::from_response(401, &plain),
            OpenAIErrorCode::AuthenticationError
        );
        assert_eq!(
            OpenAIErrorCode::from_response(429, &plain),
            OpenAIErrorCode::RateLimitExceeded
        );
        assert_eq!(
            OpenAIErrorCode::from_response(502, &plain),
            OpenAIErrorCode::ServerError
        );
        assert_eq!(
            OpenAIErrorCode::from_response(418, &plain),
            OpenAIErrorCode::Unknown
        );
    }

    #[test]
    fn test_error_code_model_not_found() {
        let e = err("model_not_found", None, "no such model");
        assert_eq!(
            OpenAIErrorCode::from_response(400, &e),
            OpenAIErrorCode::ModelNotFound
        );
    }

    #[test]
    fn test_error_code_context_length() {
        let e = err("invalid_request_error", Some("context_length_exceeded"), "too long");
        assert_eq!(
            OpenAIErrorCode::from_response(400, &e),
            OpenAIErrorCode::ContextLengthExceeded
        );
    }

    #[test]
    fn test_error_code_content_policy() {
        let by_code = err("image_generation_user_error", Some("content_policy_violation"), "x");
        assert_eq!(
            OpenAIErrorCode::from_response(400, &by_code),
            OpenAIErrorCode::ContentPolicy
        );
        let by_message = err("invalid_request_error", None, "Rejected by our Safety system");
        assert_eq!(
            OpenAIErrorCode::from_response(400, &by_message),
            OpenAIErrorCode::ContentPolicy
        );
    }

    #[test]
    fn test_retryable() {
        assert!(OpenAIErrorCode::RateLimitExceeded.is_retryable());
        assert!(OpenAIErrorCode::ServerError.is_retryable());
        assert!(!OpenAIErrorCode::ContentPolicy.is_retryable());
        assert!(!OpenAIErrorCode::AuthenticationError.is_retryable());
    }

    #[test]
    fn test_content_policy_maps_to_safety_message() {
        let e = to_lens_error(OpenAIErrorCode::ContentPolicy, "raw provider text");
        assert!(matches!(e, Error::ImageGeneration(_)));
        assert_eq!(e.detail(), IMAGE_SAFETY_BLOCKED);
    }

    #[test]
    fn test_auth_maps_to_config() {
        let e = to_lens_error(OpenAIErrorCode::AuthenticationError, "Invalid key");
        assert!(e.to_string().contains("Authentication failed"));
    }
}
