//! CLI domain: parse, route, output, and presentation only.
//! No generation logic; a single route table dispatches to the generation API.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_generate_json, format_generate_text, format_models_json, format_models_text,
};
pub use route::{
    image_extension, read_reference_image, write_images, GenerateReport, ModelsReport,
    ProgressTally, RunContext,
};
