//! Generation API
//!
//! Collaborator-facing surface: resolve a model by name, run the pipeline, and hand
//! back images, a text answer, or one synthesized error when every attempt failed.

use crate::config::NanoforgeConfig;
use crate::error::ApiError;
use crate::generation::{
    refine_prompt, GenerationOrchestrator, GenerationOutput, GenerationRequest, ProgressSink,
    ReferenceImage, RetryPolicy,
};
use crate::models::{ModelRegistry, ResolvedModel};
use crate::provider::{fetch_available_models, ApiEndpoints, GenerationTransport, ReqwestTransport};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Per-call options for [`generate_images`].
#[derive(Clone)]
pub struct GenerateOptions {
    pub num_images: usize,
    pub reference_images: Vec<ReferenceImage>,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            num_images: 1,
            reference_images: Vec::new(),
            progress: None,
        }
    }
}

impl GenerateOptions {
    pub fn new(num_images: usize) -> Self {
        Self {
            num_images,
            ..Self::default()
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

impl fmt::Debug for GenerateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateOptions")
            .field("num_images", &self.num_images)
            .field("reference_images", &self.reference_images.len())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Configured pipeline: transport, endpoints, retry policy and model registry.
pub struct NanoforgeClient {
    transport: Arc<dyn GenerationTransport>,
    endpoints: ApiEndpoints,
    orchestrator: GenerationOrchestrator,
    registry: ModelRegistry,
}

impl NanoforgeClient {
    /// Build a client backed by reqwest from validated configuration.
    pub fn from_config(config: &NanoforgeConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let endpoints = config.api.endpoints()?;
        let transport: Arc<dyn GenerationTransport> =
            Arc::new(ReqwestTransport::from_config(&config.api)?);
        Ok(Self::with_transport(
            transport,
            endpoints,
            config.model_registry(),
            config.retry.policy(),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn GenerationTransport>,
        endpoints: ApiEndpoints,
        registry: ModelRegistry,
        retry: RetryPolicy,
    ) -> Self {
        let orchestrator = GenerationOrchestrator::new(Arc::clone(&transport), endpoints.clone())
            .with_retry_policy(retry);
        Self {
            transport,
            endpoints,
            orchestrator,
            registry,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn resolve_model(&self, name: &str) -> Result<ResolvedModel, ApiError> {
        self.registry.resolve(name)
    }

    /// Merge the live listing over the current registry and return the result.
    pub async fn refresh_models(&self) -> Result<ModelRegistry, ApiError> {
        let live = fetch_available_models(self.transport.as_ref(), &self.endpoints).await?;
        info!(models = live.len(), "Fetched live model listing");
        Ok(self.registry.merge(&live))
    }

    pub async fn generate_images(
        &self,
        model_name: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<GenerationOutput, ApiError> {
        if prompt.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }
        let model = self.resolve_model(model_name)?;

        let mut request = GenerationRequest::new(prompt, model, options.num_images.max(1));
        request.reference_images = options.reference_images;
        request.progress = options.progress;

        self.orchestrator.generate(&request).await.into_output()
    }

    pub async fn refine_prompt(
        &self,
        model_name: &str,
        prompt: &str,
        reference: Option<ReferenceImage>,
    ) -> Result<String, ApiError> {
        let model = self.resolve_model(model_name)?;
        refine_prompt(&self.orchestrator, &model, prompt, reference).await
    }
}

/// Generate `options.num_images` images for `prompt` with the named model.
pub async fn generate_images(
    client: &NanoforgeClient,
    model_name: &str,
    prompt: &str,
    options: GenerateOptions,
) -> Result<GenerationOutput, ApiError> {
    client.generate_images(model_name, prompt, options).await
}
