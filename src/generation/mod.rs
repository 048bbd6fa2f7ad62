pub mod classify;
pub mod orchestrator;
pub mod refine;
pub mod retry;
pub mod types;

pub use classify::ResponseClassifier;
pub use orchestrator::{aggregate, GenerationOrchestrator};
pub use refine::{refine_prompt, refinement_prompt};
pub use retry::RetryPolicy;
pub use types::{
    AggregatedResult, AttemptOutcome, AttemptProgress, AttemptStatus, GenerationOutput,
    GenerationRequest, ImagePayload, PartialSummary, ProgressSink, ReferenceImage,
};
