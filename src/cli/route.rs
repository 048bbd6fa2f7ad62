//! CLI route: single route table and run context. Dispatches to the generation API and presentation.

use crate::api::{GenerateOptions, NanoforgeClient};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_generate_json, format_generate_text, format_models_json, format_models_text,
};
use crate::config::{ConfigLoader, NanoforgeConfig};
use crate::error::ApiError;
use crate::generation::{
    AttemptProgress, AttemptStatus, GenerationOutput, ImagePayload, PartialSummary, ProgressSink,
    ReferenceImage,
};
use crate::models::ModelRegistry;
use crate::provider::GenerationTransport;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of `generate`, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub model: String,
    pub files: Vec<PathBuf>,
    pub partial: Option<PartialSummary>,
    pub text: Option<String>,
}

/// Outcome of `models`.
#[derive(Debug, Clone)]
pub struct ModelsReport {
    pub registry: ModelRegistry,
    pub live: bool,
    pub warning: Option<String>,
}

/// Counts settled attempts and reports "Generating k/N..." lines.
pub struct ProgressTally {
    settled: Mutex<usize>,
    lines: Mutex<Vec<String>>,
    echo: bool,
}

impl ProgressTally {
    /// A tally that also prints each line to stderr.
    pub fn stderr() -> Self {
        Self {
            settled: Mutex::new(0),
            lines: Mutex::new(Vec::new()),
            echo: true,
        }
    }

    pub fn silent() -> Self {
        Self {
            echo: false,
            ..Self::stderr()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ProgressSink for ProgressTally {
    fn attempt_settled(&self, progress: AttemptProgress<'_>) {
        let settled = {
            let mut settled = self.settled.lock();
            *settled += 1;
            *settled
        };
        let mut line = format!("Generating {}/{}...", settled, progress.total);
        if let (AttemptStatus::Error, Some(error)) = (progress.status, progress.error) {
            line.push_str(&format!(" (attempt {} failed: {})", progress.attempt, error));
        }
        if self.echo {
            eprintln!("{}", line);
        }
        self.lines.lock().push(line);
    }
}

/// Runtime context for CLI execution: workspace, loaded configuration and an optional
/// transport override used instead of the HTTP client.
pub struct RunContext {
    workspace_root: PathBuf,
    config: NanoforgeConfig,
    transport: Option<Arc<dyn GenerationTransport>>,
    echo_progress: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: NanoforgeConfig) -> Self {
        Self {
            workspace_root,
            config,
            transport: None,
            echo_progress: true,
        }
    }

    /// Route requests through `transport` instead of the network.
    pub fn with_transport(mut self, transport: Arc<dyn GenerationTransport>) -> Self {
        self.transport = Some(transport);
        self.echo_progress = false;
        self
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        info!(command = command.name(), "Executing command");
        let result = self.execute_inner(command);
        match &result {
            Ok(_) => info!(
                command = command.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Command finished"
            ),
            Err(e) => warn!(command = command.name(), error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                model,
                prompt,
                count,
                references,
                out_dir,
                format,
            } => {
                let report =
                    self.handle_generate(model, prompt, usize::from(*count), references, out_dir)?;
                if format == "json" {
                    format_generate_json(&report)
                } else {
                    Ok(format_generate_text(&report))
                }
            }
            Commands::Refine {
                model,
                prompt,
                reference,
            } => self.handle_refine(model, prompt, reference.as_deref()),
            Commands::Models { live, format } => {
                let report = self.handle_models(*live)?;
                if format == "json" {
                    format_models_json(&report)
                } else {
                    Ok(format_models_text(&report))
                }
            }
        }
    }

    fn client(&self) -> Result<NanoforgeClient, ApiError> {
        match &self.transport {
            Some(transport) => Ok(NanoforgeClient::with_transport(
                Arc::clone(transport),
                self.config.api.endpoints()?,
                self.config.model_registry(),
                self.config.retry.policy(),
            )),
            None => NanoforgeClient::from_config(&self.config),
        }
    }

    fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ProviderError(format!("Failed to create runtime: {}", e)))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn handle_generate(
        &self,
        model: &str,
        prompt: &str,
        count: usize,
        references: &[PathBuf],
        out_dir: &Path,
    ) -> Result<GenerateReport, ApiError> {
        let client = self.client()?;
        let resolved = client.resolve_model(model)?;

        let tally = Arc::new(if self.echo_progress {
            ProgressTally::stderr()
        } else {
            ProgressTally::silent()
        });
        let mut options = GenerateOptions::new(count).with_progress(tally);
        for path in references {
            options = options.with_reference(read_reference_image(&self.resolve_path(path))?);
        }

        let output = Self::runtime()?.block_on(client.generate_images(model, prompt, options))?;

        match output {
            GenerationOutput::Images { images, partial } => {
                let files = write_images(&images, &self.resolve_path(out_dir))?;
                info!(written = files.len(), model = %resolved.id, "Images written");
                Ok(GenerateReport {
                    model: resolved.id,
                    files,
                    partial,
                    text: None,
                })
            }
            GenerationOutput::Text(text) => Ok(GenerateReport {
                model: resolved.id,
                files: Vec::new(),
                partial: None,
                text: Some(text),
            }),
        }
    }

    fn handle_refine(
        &self,
        model: &str,
        prompt: &str,
        reference: Option<&Path>,
    ) -> Result<String, ApiError> {
        let client = self.client()?;
        let reference = reference
            .map(|path| read_reference_image(&self.resolve_path(path)))
            .transpose()?;
        Self::runtime()?.block_on(client.refine_prompt(model, prompt, reference))
    }

    fn handle_models(&self, live: bool) -> Result<ModelsReport, ApiError> {
        let configured = self.config.model_registry();
        if !live {
            return Ok(ModelsReport {
                registry: configured,
                live: false,
                warning: None,
            });
        }

        let refreshed = self
            .client()
            .and_then(|client| Self::runtime()?.block_on(client.refresh_models()));
        match refreshed {
            Ok(registry) => Ok(ModelsReport {
                registry,
                live: true,
                warning: None,
            }),
            Err(e) => {
                warn!(error = %e, "Live model listing unavailable, using configured models");
                Ok(ModelsReport {
                    registry: configured,
                    live: false,
                    warning: Some(format!("Live model listing unavailable: {}", e)),
                })
            }
        }
    }
}

/// Read an image from disk, inferring its MIME type from the extension.
pub fn read_reference_image(path: &Path) -> Result<ReferenceImage, ApiError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let mime_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => {
            return Err(ApiError::InvalidRequest(format!(
                "Unsupported reference image type: {}",
                path.display()
            )))
        }
    };
    let bytes = std::fs::read(path).map_err(|e| {
        ApiError::InvalidRequest(format!(
            "Failed to read reference image {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(ReferenceImage {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// File extension for decoded image bytes, from their magic number.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else {
        "png"
    }
}

/// Decode and write images as `image-<n>.<ext>` (1-based, in result order).
///
/// Every payload is decoded before anything is written, so an invalid payload
/// leaves `out_dir` untouched.
pub fn write_images(images: &[ImagePayload], out_dir: &Path) -> Result<Vec<PathBuf>, ApiError> {
    let decoded = images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let bytes = BASE64.decode(image.base64.trim()).map_err(|e| {
                ApiError::ProviderError(format!("Image {} is not valid base64: {}", index + 1, e))
            })?;
            let path = out_dir.join(format!("image-{}.{}", index + 1, image_extension(&bytes)));
            Ok((path, bytes))
        })
        .collect::<Result<Vec<(PathBuf, Vec<u8>)>, ApiError>>()?;

    std::fs::create_dir_all(out_dir)?;
    let mut files = Vec::with_capacity(decoded.len());
    for (path, bytes) in decoded {
        std::fs::write(&path, &bytes)?;
        files.push(path);
    }
    Ok(files)
}
