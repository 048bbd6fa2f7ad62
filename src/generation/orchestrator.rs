//! Generation orchestrator: fans one prompt out into independent attempts and aggregates them.
//! Each attempt owns its retry loop; one attempt failing never cancels its siblings.

use crate::error::AttemptError;
use crate::generation::classify::ResponseClassifier;
use crate::generation::retry::RetryPolicy;
use crate::generation::types::{
    AggregatedResult, AttemptOutcome, AttemptProgress, AttemptStatus, GenerationRequest,
    ImagePayload,
};
use crate::models::ModelKind;
use crate::provider::{
    generate_content_payload, predict_payload, ApiEndpoints, GenerationTransport,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GenerationOrchestrator {
    transport: Arc<dyn GenerationTransport>,
    endpoints: ApiEndpoints,
    retry: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(transport: Arc<dyn GenerationTransport>, endpoints: ApiEndpoints) -> Self {
        Self {
            transport,
            endpoints,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn generate(&self, request: &GenerationRequest) -> AggregatedResult {
        let count = request.count.max(1);
        info!(
            model = %request.model.id,
            kind = request.model.kind.slug(),
            count,
            references = request.reference_images.len(),
            "Starting generation"
        );

        let result = match request.model.kind {
            ModelKind::ImageBatch => self.generate_batch(request, count).await,
            ModelKind::Conversational => self.generate_conversational(request, count).await,
        };

        match &result {
            AggregatedResult::Success { images } => {
                info!(images = images.len(), count, "Generation succeeded")
            }
            AggregatedResult::PartialSuccess {
                succeeded, failed, ..
            } => warn!(succeeded, failed, count, "Generation partially succeeded"),
            AggregatedResult::TextFallback { .. } => {
                info!(count, "Model answered with text instead of images")
            }
            AggregatedResult::TotalFailure {
                representative_error,
                ..
            } => warn!(
                count,
                kind = %representative_error.kind,
                error = %representative_error,
                "Generation failed"
            ),
        }
        result
    }

    /// One `:predict` call carrying the whole sample count.
    async fn generate_batch(&self, request: &GenerationRequest, count: usize) -> AggregatedResult {
        let url = self.endpoints.predict_url(&request.model.id);
        let payload = predict_payload(&request.prompt, count);
        debug!(url = %self.endpoints.redact(&url), "Submitting batch prediction");

        let settled = self
            .retry
            .execute(|| self.send_batch(&url, &payload))
            .await;

        if let Some(sink) = &request.progress {
            let (status, error) = match &settled {
                Ok(_) => (AttemptStatus::Success, None),
                Err(err) => (AttemptStatus::Error, Some(err)),
            };
            sink.attempt_settled(AttemptProgress {
                attempt: 1,
                total: count,
                status,
                error,
            });
        }

        match settled {
            Ok(images) => AggregatedResult::Success { images },
            Err(err) => AggregatedResult::TotalFailure {
                representative_error: err,
                failed: count,
                total: count,
            },
        }
    }

    async fn send_batch(
        &self,
        url: &str,
        payload: &Value,
    ) -> Result<Vec<ImagePayload>, AttemptError> {
        let exchange = self.transport.post_json(url, payload).await?;
        let mut images = Vec::new();
        for outcome in ResponseClassifier::classify_exchange_all(&exchange) {
            match outcome {
                AttemptOutcome::Image(image) => images.push(image),
                AttemptOutcome::Error(err) => return Err(err),
                AttemptOutcome::Text(_) => {}
            }
        }
        if images.is_empty() {
            return Err(AttemptError::malformed("No predictions returned"));
        }
        Ok(images)
    }

    /// `count` single-candidate calls in flight together, aggregated by attempt index.
    async fn generate_conversational(
        &self,
        request: &GenerationRequest,
        count: usize,
    ) -> AggregatedResult {
        let url = self.endpoints.generate_content_url(&request.model.id);
        let payload = generate_content_payload(&request.prompt, &request.reference_images);
        debug!(
            url = %self.endpoints.redact(&url),
            count,
            "Launching concurrent content generations"
        );

        let mut attempts = FuturesUnordered::new();
        for index in 0..count {
            let url = url.as_str();
            let payload = &payload;
            let progress = request.progress.as_ref();
            attempts.push(async move {
                let settled = self
                    .retry
                    .execute(|| self.send_single(url, payload))
                    .await;
                let outcome = match settled {
                    Ok(outcome) => outcome,
                    Err(err) => AttemptOutcome::Error(err),
                };
                debug!(
                    attempt = index + 1,
                    count,
                    outcome = outcome_label(&outcome),
                    "Attempt settled"
                );
                if let Some(sink) = progress {
                    let (status, error) = match &outcome {
                        AttemptOutcome::Error(err) => (AttemptStatus::Error, Some(err)),
                        _ => (AttemptStatus::Success, None),
                    };
                    sink.attempt_settled(AttemptProgress {
                        attempt: index + 1,
                        total: count,
                        status,
                        error,
                    });
                }
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<AttemptOutcome>> = vec![None; count];
        while let Some((index, outcome)) = attempts.next().await {
            outcomes[index] = Some(outcome);
        }

        aggregate(outcomes.into_iter().flatten().collect(), count)
    }

    async fn send_single(
        &self,
        url: &str,
        payload: &Value,
    ) -> Result<AttemptOutcome, AttemptError> {
        let exchange = self.transport.post_json(url, payload).await?;
        match ResponseClassifier::classify_exchange(&exchange) {
            AttemptOutcome::Error(err) => Err(err),
            outcome => Ok(outcome),
        }
    }
}

fn outcome_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Image(_) => "image",
        AttemptOutcome::Text(_) => "text",
        AttemptOutcome::Error(_) => "error",
    }
}

/// Reduce index-ordered outcomes. Images win over text; among texts the last one wins;
/// the first error represents a total failure.
///
/// Text answers are not errors: images with no errors are a `Success` even when some
/// attempts answered with text. Once any attempt errored, `failed` in a partial success
/// counts every attempt without an image, so `succeeded + failed == total`.
pub fn aggregate(outcomes: Vec<AttemptOutcome>, total: usize) -> AggregatedResult {
    let mut images = Vec::new();
    let mut text_fallback = None;
    let mut errors = Vec::new();

    for outcome in outcomes {
        match outcome {
            AttemptOutcome::Image(image) => images.push(image),
            AttemptOutcome::Text(text) => text_fallback = Some(text),
            AttemptOutcome::Error(err) => errors.push(err),
        }
    }

    if !images.is_empty() {
        if errors.is_empty() {
            return AggregatedResult::Success { images };
        }
        let succeeded = images.len();
        return AggregatedResult::PartialSuccess {
            images,
            succeeded,
            total,
            failed: total.saturating_sub(succeeded),
        };
    }

    if let Some(content) = text_fallback {
        return AggregatedResult::TextFallback { content };
    }

    let failed = errors.len().max(1);
    let representative_error = errors
        .into_iter()
        .next()
        .unwrap_or_else(|| AttemptError::malformed("No attempts produced a result"));
    AggregatedResult::TotalFailure {
        representative_error,
        failed,
        total,
    }
}
