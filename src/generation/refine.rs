//! Prompt refinement: asks a conversational model to rewrite a short prompt into a
//! detailed image-generation prompt, optionally grounded on a reference image.

use crate::error::ApiError;
use crate::generation::orchestrator::GenerationOrchestrator;
use crate::generation::types::{AggregatedResult, GenerationRequest, ReferenceImage};
use crate::models::{ModelKind, ResolvedModel};

const REFINE_INSTRUCTION: &str = "Refine this prompt into a single, highly detailed image generation prompt. \
Do not ask questions or provide alternatives. Focus on visual details, atmosphere, lighting, \
color palette, and composition. Output ONLY the refined prompt, nothing else.";

pub fn refinement_prompt(original: &str) -> String {
    format!("{}\n\nOriginal prompt: {}", REFINE_INSTRUCTION, original.trim())
}

pub async fn refine_prompt(
    orchestrator: &GenerationOrchestrator,
    model: &ResolvedModel,
    prompt: &str,
    reference: Option<ReferenceImage>,
) -> Result<String, ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Prompt cannot be empty".to_string()));
    }
    if model.kind != ModelKind::Conversational {
        return Err(ApiError::InvalidRequest(format!(
            "Model {} cannot answer with text; choose a conversational model",
            model.id
        )));
    }

    let mut request = GenerationRequest::new(refinement_prompt(prompt), model.clone(), 1);
    if let Some(reference) = reference {
        request = request.with_reference(reference);
    }

    match orchestrator.generate(&request).await {
        AggregatedResult::TextFallback { content } => Ok(content.trim().to_string()),
        AggregatedResult::TotalFailure {
            representative_error,
            ..
        } => Err(ApiError::RefinementFailed(representative_error.message)),
        _ => Err(ApiError::RefinementFailed(
            "Model returned an image instead of text".to_string(),
        )),
    }
}
