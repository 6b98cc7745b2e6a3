//! DriftCanvas Generate Library
//!
//! Turns the canvas selection, strokes and prompt into provider requests,
//! tracks the resulting jobs and places generated images back on the canvas.

pub mod jobs;
pub mod orchestrator;
pub mod provider;
pub mod request;

pub use jobs::{Job, JobEvent, JobId, JobStatus, JobTracker, reduce};
pub use orchestrator::{Generator, place_results};
pub use provider::{BoxFuture, GenerationOutput, GenerationProvider, ProviderError, ProviderResult, Submission};
pub use request::{EditRegion, GenerationRequest, InputImage, RequestKind, RequestParameters, build_request};
