//! Nanoforge: Resilient Image Generation
//!
//! Turns one prompt into N concurrent generation attempts against a Gemini-style
//! generative API, retrying transient failures with exponential backoff and
//! aggregating partial success into one result.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod models;
pub mod provider;
