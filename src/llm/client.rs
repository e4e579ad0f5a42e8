//! Async LLM client for turn decisions
//!
//! Model-agnostic HTTP client with function calling. Supports both Anthropic
//! (`tool_use` blocks) and OpenAI-compatible (`tool_calls`) APIs. The model
//! receives the rendered turn context and answers with one tool call or with
//! text; turning that into an action is the resolver's job.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::command::resolver::{DecisionResponse, FunctionCall};
use crate::core::config::LlmSettings;
use crate::core::error::{PilotError, Result};

/// Anything that can answer a turn prompt
pub trait DecisionMaker: Send + Sync {
    fn decide<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = Result<DecisionResponse>> + Send + 'a>>;
}

const SYSTEM_PROMPT: &str = "You are playing a tile-based RPG on an emulated handheld console. \
Each turn you receive the area around the player, which moves are legal, and the known exits. \
Call exactly one tool per turn. Tiles marked unknown have not been verified; do not plan through them. \
If you cannot call a tool, reply with a fenced ```json block holding {\"function\": <name>, \"arguments\": {...}}.";

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

struct ToolSpec {
    name: &'static str,
    description: &'static str,
    parameters: fn() -> Value,
}

const TOOLS: [ToolSpec; 3] = [
    ToolSpec {
        name: "press_keys",
        description: "Press console buttons one at a time, in order.",
        parameters: press_keys_schema,
    },
    ToolSpec {
        name: "compute_path",
        description: "Walk to a tile on the current map along the shortest known-walkable route.",
        parameters: compute_path_schema,
    },
    ToolSpec {
        name: "wait",
        description: "Let the game run for a number of frames without input.",
        parameters: wait_schema,
    },
];

fn press_keys_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keys": {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": ["up", "down", "left", "right", "a", "b", "start", "select"]
                }
            },
            "reasoning": { "type": "string" }
        },
        "required": ["keys"]
    })
}

fn compute_path_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "target_x": { "type": "integer" },
            "target_y": { "type": "integer" }
        },
        "required": ["target_x", "target_y"]
    })
}

fn wait_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "frames": { "type": "integer", "default": 60 }
        }
    })
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new LLM client with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String, max_tokens: u32) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            max_tokens,
            api_format,
        }
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// Create a client from environment variables, falling back to `settings`
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL, LLM_MODEL
    pub fn from_env(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| PilotError::LlmError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| settings.api_url.clone());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| settings.model.clone());

        Ok(Self::new(api_key, api_url, model, settings.max_tokens))
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    /// Send one turn prompt and collect the tool call and/or text
    pub async fn complete(&self, prompt: &str) -> Result<DecisionResponse> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(prompt).await,
            ApiFormat::OpenAI => self.complete_openai(prompt).await,
        }
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<DecisionResponse> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.into(),
            messages: vec![Message {
                role: "user".into(),
                content: prompt.into(),
            }],
            tools: TOOLS
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": (t.parameters)(),
                    })
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::LlmError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PilotError::LlmError(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| PilotError::LlmError(e.to_string()))?;

        Ok(completion.into_decision())
    }

    async fn complete_openai(&self, prompt: &str) -> Result<DecisionResponse> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: prompt.into(),
                },
            ],
            tools: TOOLS
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": (t.parameters)(),
                        }
                    })
                })
                .collect(),
            tool_choice: "auto".into(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PilotError::LlmError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PilotError::LlmError(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| PilotError::LlmError(e.to_string()))?;

        completion.into_decision()
    }
}

impl DecisionMaker for LlmClient {
    fn decide<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = Result<DecisionResponse>> + Send + 'a>> {
        Box::pin(async move { self.complete(&prompt).await })
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    tools: Vec<Value>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl AnthropicResponse {
    fn into_decision(self) -> DecisionResponse {
        let mut decision = DecisionResponse::default();
        let mut texts = Vec::new();
        for block in self.content {
            match block {
                ContentBlock::Text { text } => texts.push(text),
                ContentBlock::ToolUse { name, input } => {
                    if decision.function_call.is_none() {
                        decision.function_call = Some(FunctionCall {
                            name,
                            arguments: input,
                        });
                    }
                }
                ContentBlock::Other => {}
            }
        }
        if !texts.is_empty() {
            decision.text = Some(texts.join("\n"));
        }
        decision
    }
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    tools: Vec<Value>,
    tool_choice: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallEntry>,
}

#[derive(Deserialize)]
struct ToolCallEntry {
    function: ToolCallFunction,
}

#[derive(Deserialize)]
struct ToolCallFunction {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

impl OpenAIResponse {
    fn into_decision(self) -> Result<DecisionResponse> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| PilotError::LlmError("Empty response".into()))?;

        let function_call = message.tool_calls.into_iter().next().map(|tc| {
            // Undecodable argument strings are kept verbatim; validation rejects them
            let arguments = if tc.function.arguments.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments))
            };
            FunctionCall {
                name: tc.function.name,
                arguments,
            }
        });

        Ok(DecisionResponse {
            function_call,
            text: message.content.filter(|t| !t.trim().is_empty()),
        })
    }
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
