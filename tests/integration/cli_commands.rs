//! Integration tests for CLI parsing and command routing

use super::test_utils::{Reply, ScriptedTransport};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;
use nanoforge::cli::{Cli, Commands, RunContext};
use nanoforge::config::NanoforgeConfig;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn test_config() -> NanoforgeConfig {
    let mut config = NanoforgeConfig::default();
    config.api.api_key = Some("cli-test-key".to_string());
    config.retry.initial_delay_ms = 1;
    config
}

fn context(workspace: &TempDir, transport: Arc<ScriptedTransport>) -> RunContext {
    RunContext::with_config(workspace.path().to_path_buf(), test_config()).with_transport(transport)
}

fn generate(count: u16, references: Vec<PathBuf>, format: &str) -> Commands {
    Commands::Generate {
        model: "Nano Banana".to_string(),
        prompt: "a red bicycle".to_string(),
        count,
        references,
        out_dir: PathBuf::from("out"),
        format: format.to_string(),
    }
}

#[test]
fn test_parse_generate_with_references() {
    let cli = Cli::try_parse_from([
        "nanoforge",
        "--verbose",
        "generate",
        "--model",
        "Imagen 3",
        "--prompt",
        "a lighthouse",
        "--count",
        "4",
        "--reference",
        "a.png",
        "--reference",
        "b.jpg",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::Generate {
            model,
            count,
            references,
            out_dir,
            format,
            ..
        } => {
            assert_eq!(model, "Imagen 3");
            assert_eq!(count, 4);
            assert_eq!(references, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
            assert_eq!(out_dir, PathBuf::from("."));
            assert_eq!(format, "text");
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_rejects_out_of_range_count_and_quiet_verbose() {
    let parse_count = |count: &str| {
        Cli::try_parse_from([
            "nanoforge", "generate", "--model", "m", "--prompt", "p", "--count", count,
        ])
    };
    assert!(parse_count("0").is_err());
    assert!(parse_count("9").is_err());
    assert!(parse_count("65535").is_err());
    assert!(parse_count("8").is_ok());
    assert!(Cli::try_parse_from(["nanoforge", "--quiet", "--verbose", "models"]).is_err());
}

#[test]
fn test_generate_writes_images_in_order() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|call, _| {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.push(call as u8);
        Reply::image(&BASE64.encode(bytes))
    });
    let context = context(&workspace, Arc::clone(&transport));

    let output = context.execute(&generate(2, vec![], "json")).unwrap();
    let report: Value = serde_json::from_str(&output).unwrap();

    assert_eq!(report["model"], "models/gemini-2.5-flash-image");
    assert!(report["partial"].is_null());
    let first = workspace.path().join("out/image-1.png");
    let second = workspace.path().join("out/image-2.png");
    assert_eq!(std::fs::read(&first).unwrap().last(), Some(&0));
    assert_eq!(std::fs::read(&second).unwrap().last(), Some(&1));
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_generate_reports_partial_success() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|call, _| {
        if call == 0 {
            Reply::Status(403, json!({"error": "forbidden"}))
        } else {
            Reply::image(&BASE64.encode(PNG_MAGIC))
        }
    });
    let context = context(&workspace, transport);

    let output = context.execute(&generate(3, vec![], "text")).unwrap();

    assert!(output.contains("Generated 2 of 3 images successfully. 1 failed."));
    assert!(output.contains("image-1.png"));
    assert!(output.contains("image-2.png"));
    assert!(!workspace.path().join("out/image-3.png").exists());
}

#[test]
fn test_generate_with_undecodable_image_writes_nothing() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|call, _| {
        if call == 1 {
            Reply::image("not base64!")
        } else {
            Reply::image(&BASE64.encode(PNG_MAGIC))
        }
    });
    let context = context(&workspace, transport);

    let err = context.execute(&generate(2, vec![], "text")).unwrap_err();

    assert!(err.to_string().contains("Image 2 is not valid base64"));
    assert!(!workspace.path().join("out/image-1.png").exists());
}

#[test]
fn test_generate_sends_reference_inline() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("sketch.png"), PNG_MAGIC).unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::image(&BASE64.encode(PNG_MAGIC)));
    let context = context(&workspace, Arc::clone(&transport));

    context
        .execute(&generate(1, vec![PathBuf::from("sketch.png")], "text"))
        .unwrap();

    let calls = transport.calls();
    let parts = &calls[0].body.as_ref().unwrap()["contents"][0]["parts"];
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
    assert_eq!(parts[1]["inline_data"]["data"], BASE64.encode(PNG_MAGIC));
}

#[test]
fn test_generate_text_fallback_is_printed() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::text("I can only describe it."));
    let context = context(&workspace, transport);

    let output = context.execute(&generate(1, vec![], "text")).unwrap();
    assert!(output.contains("I can only describe it."));
    assert!(!workspace.path().join("out").exists());
}

#[test]
fn test_generate_total_failure_is_error() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::Status(429, json!("quota")));
    let context = context(&workspace, Arc::clone(&transport));

    let err = context.execute(&generate(2, vec![], "text")).unwrap_err();
    let line = nanoforge::cli::map_error(&err);
    assert!(line.contains("2 of 2 attempts failed"));
    assert!(line.contains("Quota exceeded"));
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_refine_returns_trimmed_text() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, _| Reply::text("\nA weathered red bicycle at dawn.\n"));
    let context = context(&workspace, Arc::clone(&transport));

    let output = context
        .execute(&Commands::Refine {
            model: "Nano Banana".to_string(),
            prompt: "red bike".to_string(),
            reference: None,
        })
        .unwrap();

    assert_eq!(output, "A weathered red bicycle at dawn.");
    let calls = transport.calls();
    let prompt = calls[0].body.as_ref().unwrap()["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(prompt.ends_with("Original prompt: red bike"));
}

#[test]
fn test_live_models_merge_listing() {
    let workspace = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(|_, url| {
        assert!(url.ends_with("models?key=cli-test-key"));
        Reply::Status(
            200,
            json!({"models": [
                {"name": "models/imagen-4.0-generate-001", "displayName": "Imagen 4"},
                {"name": "models/gemini-2.5-pro", "displayName": "Gemini 2.5 Pro"}
            ]}),
        )
    });
    let context = context(&workspace, transport);

    let output = context
        .execute(&Commands::Models {
            live: true,
            format: "text".to_string(),
        })
        .unwrap();

    assert!(output.contains("Imagen 4"));
    assert!(output.contains("image_batch"));
    assert!(!output.contains("Gemini 2.5 Pro"));
    assert!(!output.contains("Warning"));
}
