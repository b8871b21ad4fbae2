//! Google Gemini node
//!
//! Talks to the `generateContent` REST endpoint with function calling.

use crate::*;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Gemini REST client
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base,
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Bound every request by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match Client::builder().timeout(timeout).build() {
            Ok(client) => self.client = client,
            Err(e) => warn!("Could not build HTTP client with timeout: {}", e),
        }
        self
    }

    fn endpoint(&self, model: &str) -> String {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, params: &ChatParams) -> Value {
        let mut system_parts: Vec<String> = Vec::new();
        let mut contents: Vec<Value> = Vec::new();

        for m in &params.messages {
            let (role, parts) = match m.role.as_str() {
                ROLE_SYSTEM => {
                    system_parts.push(m.text().to_string());
                    continue;
                }
                ROLE_ASSISTANT => ("model", assistant_parts(m)),
                ROLE_TOOL => ("user", vec![function_response_part(m)]),
                _ => ("user", vec![json!({ "text": m.text() })]),
            };

            if parts.is_empty() {
                continue;
            }

            // Gemini expects alternating turns; fold same-role runs together
            let same_role = contents.last().map_or(false, |last| last["role"] == role);
            if same_role {
                if let Some(existing) = contents
                    .last_mut()
                    .and_then(|last| last["parts"].as_array_mut())
                {
                    existing.extend(parts);
                }
            } else {
                contents.push(json!({ "role": role, "parts": parts }));
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_tokens,
            },
        });

        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": system_parts.join("\n\n") }]
            });
        }

        if !params.tools.is_empty() {
            let declarations: Vec<Value> = params
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": &t.function.name,
                        "description": &t.function.description,
                        "parameters": &t.function.parameters
                    })
                })
                .collect();

            body["tools"] = json!([{ "functionDeclarations": declarations }]);
            body["toolConfig"] = match &params.tool_choice {
                ToolChoice::Auto => json!({ "functionCallingConfig": { "mode": "AUTO" } }),
                ToolChoice::Required(name) => json!({
                    "functionCallingConfig": { "mode": "ANY", "allowedFunctionNames": [name] }
                }),
                ToolChoice::None => json!({ "functionCallingConfig": { "mode": "NONE" } }),
            };
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<ChatResponse> {
        let candidate = match json["candidates"].get(0) {
            Some(candidate) => candidate,
            None => {
                if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
                    return Err(ProviderError::Blocked(reason.to_string()));
                }
                return Err(ProviderError::InvalidResponse(
                    "no candidates in response".to_string(),
                ));
            }
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(t) = part["text"].as_str() {
                    text.push_str(t);
                }
                if let Some(call) = part.get("functionCall") {
                    let name = call["name"].as_str().ok_or_else(|| {
                        ProviderError::InvalidResponse("functionCall without name".to_string())
                    })?;
                    let arguments = match &call["args"] {
                        Value::Null => json!({}),
                        args => args.clone(),
                    };
                    tool_calls.push(ToolCall {
                        id: format!("call_{}", Uuid::new_v4().simple()),
                        name: name.to_string(),
                        arguments,
                    });
                }
            }
        }

        let finish_reason = candidate["finishReason"]
            .as_str()
            .unwrap_or("STOP")
            .to_lowercase();

        let usage = if let Some(usage) = json["usageMetadata"].as_object() {
            let count = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("promptTokenCount"),
                completion_tokens: count("candidatesTokenCount"),
                total_tokens: count("totalTokenCount"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

fn assistant_parts(m: &Message) -> Vec<Value> {
    let mut parts = Vec::new();
    if let Some(text) = m.content.as_deref().filter(|t| !t.is_empty()) {
        parts.push(json!({ "text": text }));
    }
    for call in m.tool_calls.iter().flatten() {
        parts.push(json!({
            "functionCall": {
                "name": &call.function.name,
                "args": &call.function.arguments
            }
        }));
    }
    parts
}

/// Tool output as a `functionResponse`; the response field must be an object
fn function_response_part(m: &Message) -> Value {
    let raw = m.text();
    let response = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(value) => json!({ "result": value }),
        Err(_) => json!({ "result": raw }),
    };
    json!({
        "functionResponse": {
            "name": m.name.as_deref().unwrap_or_default(),
            "response": response
        }
    })
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if !self.is_configured() {
            return Err(ProviderError::NoApiKey);
        }
        trace_params(&params);

        let url = self.endpoint(&params.model);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = serde_json::from_str(&text)?;
        let response = self.parse_response(json)?;

        debug!(
            "gemini response: {} tool calls, finish={}",
            response.tool_calls.len(),
            response.finish_reason
        );

        Ok(response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
