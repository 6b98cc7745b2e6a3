//! Provider abstraction for image generation backends.

use crate::request::GenerationRequest;
use driftcanvas_core::error::CanvasError;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Queue error: {0}")]
    Queue(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for CanvasError {
    fn from(err: ProviderError) -> Self {
        CanvasError::Provider(err.to_string())
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Boxed future for provider calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Images returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    /// Encoded image files, in the order the provider returned them.
    pub images: Vec<Vec<u8>>,
    pub description: Option<String>,
}

/// What a provider did with a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The provider answered synchronously.
    Immediate(GenerationOutput),
    /// The request was queued; status arrives later as job events.
    Queued { request_id: String },
}

/// Trait for generation backends.
///
/// Implementations talk to an external service. Queued providers report
/// progress by sending [`JobEvent`](crate::jobs::JobEvent)s for the returned
/// request id through a [`JobTracker`](crate::jobs::JobTracker) sender.
pub trait GenerationProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Submit a request.
    fn submit<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, ProviderResult<Submission>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_becomes_canvas_error() {
        let err: CanvasError = ProviderError::Http {
            status: 503,
            body: "busy".to_string(),
        }
        .into();
        assert_eq!(err, CanvasError::Provider("HTTP 503: busy".to_string()));
    }
}
