//! Gemini `generateContent` with forced function calling

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ModelError, TermModel};
use crate::metrics::observe_upstream_call;

const FUNCTION_NAME: &str = "return_terms";

/// Gemini REST client
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiModel {
    /// `endpoint` is the API base, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    fn request_body(text: &str) -> Value {
        let prompt = format!(
            "Extract the important English words from the text below and call the \
             function {FUNCTION_NAME} with them, following its schema.\n\
             - original: base form\n\
             - text: exactly as it appears in the text\n\
             - partOfSpeech: n|v|adj|adv etc.\n\
             - meaning: Korean meaning\n\
             Leave out proper nouns (names of people, places, brands).\n\
             Only call the function; no explanations, comments or code fences.\n\n\
             Text:\n\"\"\"\n{text}\n\"\"\""
        );

        let term_schema = json!({
            "type": "object",
            "properties": {
                "original": { "type": "string" },
                "text": { "type": "string" },
                "partOfSpeech": { "type": "string" },
                "meaning": { "type": "string" }
            },
            "required": ["original", "text", "partOfSpeech", "meaning"]
        });

        let safety_settings: Vec<Value> = [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
        .collect();

        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{
                "functionDeclarations": [{
                    "name": FUNCTION_NAME,
                    "description": "Extract important English words from the input text and return them in a strict schema.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "terms": { "type": "array", "items": term_schema }
                        },
                        "required": ["terms"]
                    }
                }]
            }],
            "toolConfig": {
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": [FUNCTION_NAME]
                }
            },
            "generationConfig": {
                "temperature": 0.1,
                "topK": 1,
                "topP": 1,
                "maxOutputTokens": 2048
            },
            "safetySettings": safety_settings
        })
    }
}

/// Arguments of the `return_terms` call in a response, if any
fn function_call_args(response: &Value) -> Result<Option<Value>, ModelError> {
    let candidate = response
        .pointer("/candidates/0")
        .ok_or_else(|| ModelError::new(None, "No candidate returned"))?;

    let call = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .and_then(|parts| parts.iter().find_map(|p| p.get("functionCall")));

    let Some(call) = call else {
        return Ok(None);
    };

    let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
    if name != FUNCTION_NAME {
        return Err(ModelError::new(
            None,
            format!("Unexpected function call: {name}"),
        ));
    }
    Ok(Some(call.get("args").cloned().unwrap_or(Value::Null)))
}

#[async_trait]
impl TermModel for GeminiModel {
    async fn call(&self, model: &str, text: &str) -> Result<Option<Value>, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&Self::request_body(text))
            .send()
            .await
            .map_err(|e| {
                observe_upstream_call("gemini", false);
                // the URL carries the API key
                let e = e.without_url();
                if e.is_timeout() {
                    ModelError::new(None, format!("timeout calling {model}"))
                } else {
                    ModelError::new(e.status().map(|s| s.as_u16()), e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            observe_upstream_call("gemini", false);
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(ModelError::new(
                Some(status.as_u16()),
                format!("{model} returned {status}: {message}"),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            observe_upstream_call("gemini", false);
            ModelError::new(None, format!("invalid response from {model}: {e}"))
        })?;
        observe_upstream_call("gemini", true);

        if let Some(reason) = body.pointer("/promptFeedback/blockReason") {
            tracing::debug!(model = %model, reason = %reason, "Prompt feedback");
        }
        function_call_args(&body)
    }
}
