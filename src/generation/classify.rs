//! Response classification for both upstream response shapes.
//!
//! Batch-prediction responses carry `predictions[]`; content-generation responses
//! carry `candidates[].content.parts[]`. Callers hand over the raw exchange and get
//! typed outcomes back without knowing which endpoint answered.

use crate::error::AttemptError;
use crate::generation::types::{AttemptOutcome, ImagePayload};
use crate::provider::HttpExchange;
use serde_json::Value;

pub struct ResponseClassifier;

impl ResponseClassifier {
    /// Classify a raw exchange, parsing the body as JSON on success.
    pub fn classify_exchange(exchange: &HttpExchange) -> AttemptOutcome {
        Self::classify_exchange_all(exchange)
            .into_iter()
            .next()
            .unwrap_or_else(|| AttemptOutcome::Error(AttemptError::malformed("Empty response")))
    }

    /// Like [`classify_exchange`](Self::classify_exchange), but keeps every image of a batch response.
    pub fn classify_exchange_all(exchange: &HttpExchange) -> Vec<AttemptOutcome> {
        if !is_success(exchange.status) {
            return vec![AttemptOutcome::Error(status_error(
                exchange.status,
                &exchange.body,
            ))];
        }
        match serde_json::from_str::<Value>(&exchange.body) {
            Ok(body) => Self::classify_all(exchange.status, &body),
            Err(e) => vec![AttemptOutcome::Error(AttemptError::malformed(format!(
                "Failed to parse response: {}",
                e
            )))],
        }
    }

    /// Single outcome for one exchange: the first image, the text, or the error.
    pub fn classify(status: u16, body: &Value) -> AttemptOutcome {
        Self::classify_all(status, body)
            .into_iter()
            .next()
            .unwrap_or_else(|| AttemptOutcome::Error(AttemptError::malformed("Empty response")))
    }

    /// Every outcome carried by one exchange. Only batch responses yield more than one.
    pub fn classify_all(status: u16, body: &Value) -> Vec<AttemptOutcome> {
        if !is_success(status) {
            let text = match body {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return vec![AttemptOutcome::Error(status_error(status, &text))];
        }

        if let Some(predictions) = body.get("predictions").and_then(Value::as_array) {
            let images: Vec<AttemptOutcome> = predictions
                .iter()
                .filter_map(prediction_payload)
                .map(|data| AttemptOutcome::Image(ImagePayload::new(data)))
                .collect();
            if !images.is_empty() {
                return images;
            }
        }

        let parts = body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array);

        if let Some(parts) = parts {
            if let Some(data) = parts.iter().find_map(inline_image_data) {
                return vec![AttemptOutcome::Image(ImagePayload::new(data))];
            }
            if let Some(text) = parts
                .first()
                .and_then(|part| part.get("text"))
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
            {
                return vec![AttemptOutcome::Text(text.to_string())];
            }
        }

        vec![AttemptOutcome::Error(empty_response_error(body))]
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn status_error(status: u16, body: &str) -> AttemptError {
    let message = match status {
        429 => format!("Quota exceeded (429): {}", body.trim()),
        404 => format!("Model not found (404): {}", body.trim()),
        _ => format!("API error ({}): {}", status, body.trim()),
    };
    AttemptError::from_status(status, message)
}

fn prediction_payload(prediction: &Value) -> Option<&str> {
    match prediction {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(obj) => obj
            .get("bytesBase64Encoded")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn inline_image_data(part: &Value) -> Option<&str> {
    part.get("inline_data")
        .or_else(|| part.get("inlineData"))
        .and_then(|inline| inline.get("data"))
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
}

fn empty_response_error(body: &Value) -> AttemptError {
    let block_reason = body
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str);
    match block_reason {
        Some(reason) => AttemptError::malformed(format!("Request blocked: {}", reason)),
        None => AttemptError::malformed("No usable content in response"),
    }
}
