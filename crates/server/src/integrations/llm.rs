//! OpenAI-compatible chat completions client.
//!
//! Groq, OpenAI, and Ollama all speak the same `/chat/completions` dialect,
//! so one client covers every configured provider.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use switchboard_agent::{
    ChatMessage, Completion, CompletionClient, CompletionError, ToolCallRequest, ToolSpec,
};
use switchboard_core::config::LlmConfig;

pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| config.provider.default_base_url().to_string());

        Ok(Self { client, base_url, model: config.model.clone(), api_key: config.api_key.clone() })
    }
}

fn request_body(model: &str, system: &str, messages: &[ChatMessage], tools: &[ToolSpec]) -> Value {
    let mut wire_messages = vec![json!({ "role": "system", "content": system })];
    wire_messages.extend(messages.iter().map(|message| {
        json!({ "role": message.role.as_str(), "content": message.content })
    }));

    let mut body = json!({ "model": model, "messages": wire_messages });
    if !tools.is_empty() {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|spec| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": spec.name,
                            "description": spec.description,
                            "parameters": spec.parameters,
                        }
                    })
                })
                .collect(),
        );
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    // The wire format carries arguments as a JSON-encoded string.
    arguments: String,
}

fn decode_completion(response: ChatCompletionResponse) -> Result<Completion, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Malformed("response carried no choices".to_string()))?;

    let mut tool_calls = Vec::with_capacity(choice.message.tool_calls.len());
    for call in choice.message.tool_calls {
        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|error| {
            CompletionError::Malformed(format!(
                "tool call `{}` carried invalid arguments: {error}",
                call.function.name
            ))
        })?;
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => {
                return Err(CompletionError::Malformed(format!(
                    "tool call `{}` arguments were not an object",
                    call.function.name
                )))
            }
        };
        tool_calls.push(ToolCallRequest { name: call.function.name, arguments });
    }

    Ok(Completion { content: choice.message.content.unwrap_or_default(), tool_calls })
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<Completion, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = request_body(&self.model, system, messages, tools);

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| CompletionError::Unavailable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompletionError::Unavailable(format!(
                "provider returned {status}: {detail}"
            )));
        }

        debug!(event_name = "llm.completion.received", model = %self.model, "completion received");

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| CompletionError::Malformed(error.to_string()))?;
        decode_completion(parsed)
    }
}

#[cfg(test)]
mod tests {
    use switchboard_agent::{ChatMessage, CompletionError, ToolKind, ToolSpec};

    use super::{decode_completion, request_body, ChatCompletionResponse};

    #[test]
    fn request_body_places_system_prompt_first() {
        let body = request_body(
            "llama-3.1-8b-instant",
            "You are a router.",
            &[ChatMessage::user("what are the fees?")],
            &[],
        );

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "what are the fees?");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn request_body_declares_tools_in_function_envelope() {
        let specs = [ToolSpec::for_kind(ToolKind::KnowledgeSearch)];
        let body = request_body("m", "s", &[], &specs);

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "knowledge_search");
        assert_eq!(body["tools"][0]["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn decode_extracts_content_and_tool_calls() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "function": { "name": "web_search", "arguments": "{\"query\":\"pix\"}" }
                    }]
                }
            }]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).expect("parse");
        let completion = decode_completion(parsed).expect("decode");

        assert!(completion.content.is_empty());
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "web_search");
        assert_eq!(completion.tool_calls[0].argument_str("query"), Some("pix"));
    }

    #[test]
    fn decode_rejects_empty_choice_list() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{ "choices": [] }"#).expect("parse");
        assert!(matches!(decode_completion(parsed), Err(CompletionError::Malformed(_))));
    }

    #[test]
    fn decode_rejects_non_object_tool_arguments() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "function": { "name": "web_search", "arguments": "\"pix\"" }
                    }]
                }
            }]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).expect("parse");
        assert!(matches!(decode_completion(parsed), Err(CompletionError::Malformed(_))));
    }
}
