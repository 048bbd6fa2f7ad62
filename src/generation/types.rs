use crate::error::AttemptError;
use crate::models::ResolvedModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Base64-encoded image returned by the remote API, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub base64: String,
}

impl ImagePayload {
    pub fn new(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
        }
    }
}

/// Reference image attached to a conversational request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Result of one settled attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Image(ImagePayload),
    Text(String),
    Error(AttemptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Error,
}

/// Progress notification for one attempt whose retry loop has finished.
#[derive(Debug, Clone, Copy)]
pub struct AttemptProgress<'a> {
    /// 1-based attempt index
    pub attempt: usize,
    pub total: usize,
    pub status: AttemptStatus,
    pub error: Option<&'a AttemptError>,
}

/// Receives one call per attempt, in completion order.
pub trait ProgressSink: Send + Sync {
    fn attempt_settled(&self, progress: AttemptProgress<'_>);
}

impl<F> ProgressSink for F
where
    F: Fn(AttemptProgress<'_>) + Send + Sync,
{
    fn attempt_settled(&self, progress: AttemptProgress<'_>) {
        self(progress)
    }
}

/// One user generation action.
#[derive(Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ResolvedModel,
    pub count: usize,
    pub reference_images: Vec<ReferenceImage>,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: ResolvedModel, count: usize) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            count,
            reference_images: Vec::new(),
            progress: None,
        }
    }

    pub fn with_reference(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("count", &self.count)
            .field("reference_images", &self.reference_images.len())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Summary of a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedResult {
    Success {
        images: Vec<ImagePayload>,
    },
    PartialSuccess {
        images: Vec<ImagePayload>,
        succeeded: usize,
        total: usize,
        failed: usize,
    },
    /// The model answered with prose instead of images
    TextFallback {
        content: String,
    },
    TotalFailure {
        representative_error: AttemptError,
        failed: usize,
        total: usize,
    },
}

impl AggregatedResult {
    pub fn images(&self) -> &[ImagePayload] {
        match self {
            AggregatedResult::Success { images } => images,
            AggregatedResult::PartialSuccess { images, .. } => images,
            _ => &[],
        }
    }

    /// Convert into the collaborator-facing output, turning total failure into an error.
    pub fn into_output(self) -> Result<GenerationOutput, crate::error::ApiError> {
        match self {
            AggregatedResult::Success { images } => Ok(GenerationOutput::Images {
                images,
                partial: None,
            }),
            AggregatedResult::PartialSuccess {
                images,
                succeeded,
                total,
                failed,
            } => Ok(GenerationOutput::Images {
                images,
                partial: Some(PartialSummary {
                    succeeded,
                    total,
                    failed,
                }),
            }),
            AggregatedResult::TextFallback { content } => Ok(GenerationOutput::Text(content)),
            AggregatedResult::TotalFailure {
                representative_error,
                failed,
                total,
            } => Err(crate::error::ApiError::GenerationFailed(format!(
                "{} of {} attempts failed: {}",
                failed, total, representative_error.message
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSummary {
    pub succeeded: usize,
    pub total: usize,
    pub failed: usize,
}

impl fmt::Display for PartialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated {} of {} images successfully. {} failed.",
            self.succeeded, self.total, self.failed
        )
    }
}

/// What a caller of `generate_images` receives on anything short of total failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutput {
    Images {
        images: Vec<ImagePayload>,
        partial: Option<PartialSummary>,
    },
    Text(String),
}
