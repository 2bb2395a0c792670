//! Text generators: the trait the collaborator calls, and the HTTP backends.
//!
//! [`TextGenerator`] is the seam between the simulation and whatever
//! produces text. The production implementation is [`LlmBackend`], an enum
//! over the two wire formats (enum dispatch keeps it usable without boxing
//! futures). Tests substitute a scripted generator.

use std::future::Future;

use serde_json::{Value, json};

use crate::config::{BackendType, CollaboratorConfig};
use crate::error::CollaboratorError;
use crate::request::{CompletionRequest, Message, Role};

/// Header value the Messages API is pinned to.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Opening user turn for Messages API requests whose history starts with
/// the assistant.
const SCENE_OPENER: &str = "(The scene begins.)";

/// Something that turns a rendered request into response text.
pub trait TextGenerator: Send + Sync {
    /// Produce the response text for `request`.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// An HTTP text-generation backend.
pub enum LlmBackend {
    /// Chat completions (`OpenAI`, `DeepSeek`, Ollama, and other compatible servers).
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl TextGenerator for LlmBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request).await,
            Self::Anthropic(backend) => backend.complete(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// Build the backend selected by `config.backend`.
pub fn create_backend(config: &CollaboratorConfig) -> LlmBackend {
    let endpoint = Endpoint::from_config(config);
    match config.backend {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend { endpoint }),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend { endpoint }),
    }
}

/// Connection settings shared by both wire formats.
struct Endpoint {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl Endpoint {
    fn from_config(config: &CollaboratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_url)
    }
}

/// POST `body` through `request` and decode the JSON answer.
///
/// Transport failures and non-2xx statuses are `Unavailable`; a body that
/// is not JSON is `Malformed`.
async fn send_json(
    label: &str,
    path: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, CollaboratorError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| CollaboratorError::Unavailable(format!("{label} {path}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<body unreadable: {e}>"));
        return Err(CollaboratorError::Unavailable(format!(
            "{label} {path} answered {status}: {detail}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| CollaboratorError::Malformed(format!("{label} {path}: body is not JSON: {e}")))
}

/// Chat completions backend, posting to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    endpoint: Endpoint,
}

impl OpenAiBackend {
    const PATH: &str = "chat/completions";

    fn body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = std::iter::once(json!({"role": "system", "content": request.system}))
            .chain(
                request
                    .messages
                    .iter()
                    .map(|m| json!({"role": m.role, "content": m.content})),
            )
            .collect();
        let mut body = json!({
            "model": self.endpoint.model,
            "messages": messages,
            "temperature": self.endpoint.temperature,
            "max_tokens": request.task.max_tokens(),
        });
        if request.task.json_object()
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert("response_format".to_owned(), json!({"type": "json_object"}));
        }
        body
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let endpoint = &self.endpoint;
        let builder = endpoint
            .client
            .post(endpoint.url(Self::PATH))
            .bearer_auth(&endpoint.api_key);
        let answer = send_json("openai", Self::PATH, builder, &self.body(request)).await?;
        chat_completion_text(&answer)
    }
}

/// `choices[0].message.content` of a chat completions answer.
fn chat_completion_text(answer: &Value) -> Result<String, CollaboratorError> {
    answer
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            CollaboratorError::Malformed("chat completion has no choices[0].message.content".to_owned())
        })
}

/// Messages API backend, posting to `{api_url}/messages`.
///
/// The system prompt is a top-level field, authentication is the
/// `x-api-key` header, and the history must alternate roles starting with
/// a user turn.
pub struct AnthropicBackend {
    endpoint: Endpoint,
}

impl AnthropicBackend {
    const PATH: &str = "messages";

    fn body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.endpoint.model,
            "max_tokens": request.task.max_tokens(),
            "temperature": self.endpoint.temperature,
            "system": request.system,
            "messages": alternate_roles(&request.messages),
        })
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let endpoint = &self.endpoint;
        let builder = endpoint
            .client
            .post(endpoint.url(Self::PATH))
            .header("x-api-key", &endpoint.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let answer = send_json("anthropic", Self::PATH, builder, &self.body(request)).await?;
        message_text(&answer)
    }
}

/// Merge consecutive same-role messages and open with a user turn.
fn alternate_roles(messages: &[Message]) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len().saturating_add(1));
    for message in messages {
        match merged.last_mut() {
            Some(last) if last.role == message.role => {
                last.content.push('\n');
                last.content.push_str(&message.content);
            }
            _ => merged.push(message.clone()),
        }
    }
    if merged.first().is_none_or(|m| m.role != Role::User) {
        merged.insert(0, Message::user(SCENE_OPENER));
    }
    merged
}

/// `content[0].text` of a Messages API answer.
fn message_text(answer: &Value) -> Result<String, CollaboratorError> {
    answer
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| CollaboratorError::Malformed("message has no content[0].text".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Task;

    fn request(task: Task) -> CompletionRequest {
        CompletionRequest {
            task,
            system: "You are the World AI.".to_owned(),
            messages: vec![Message::user("Current world state: {}")],
        }
    }

    fn openai() -> OpenAiBackend {
        OpenAiBackend {
            endpoint: Endpoint::from_config(&CollaboratorConfig::default()),
        }
    }

    #[test]
    fn chat_completion_text_reads_first_choice() {
        let answer = json!({"choices": [{"message": {"content": "park"}}]});
        assert_eq!(chat_completion_text(&answer).unwrap_or_default(), "park");
    }

    #[test]
    fn chat_completion_without_choices_is_malformed() {
        let answer = json!({"error": "rate_limit"});
        assert!(matches!(
            chat_completion_text(&answer),
            Err(CollaboratorError::Malformed(_))
        ));
    }

    #[test]
    fn message_text_reads_first_block() {
        let answer = json!({"content": [{"type": "text", "text": "Hey Truman!"}]});
        assert_eq!(message_text(&answer).unwrap_or_default(), "Hey Truman!");
        assert!(message_text(&json!({"content": []})).is_err());
    }

    #[test]
    fn json_mode_only_for_object_tasks() {
        let backend = openai();
        let event = backend.body(&request(Task::WorldEvent));
        assert!(event.get("response_format").is_some());
        assert_eq!(event["messages"][0]["role"], "system");
        assert_eq!(event["messages"][1]["role"], "user");

        let resolution = backend.body(&request(Task::BetResolution));
        assert!(resolution.get("response_format").is_none());
        assert_eq!(resolution["max_tokens"], 300);
    }

    #[test]
    fn messages_api_body_carries_system_separately() {
        let backend = AnthropicBackend {
            endpoint: Endpoint::from_config(&CollaboratorConfig::default()),
        };
        let body = backend.body(&request(Task::NextLocation));
        assert_eq!(body["system"], "You are the World AI.");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn history_alternates_and_opens_with_user() {
        let messages = vec![
            Message::assistant("Meryl: Morning!"),
            Message::user("Truman: Hi"),
            Message::user("Marlon: Hey"),
        ];
        let merged = alternate_roles(&messages);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].role, Role::User);
        assert_eq!(merged[0].content, SCENE_OPENER);
        assert_eq!(merged[1].role, Role::Assistant);
        assert_eq!(merged[2].content, "Truman: Hi\nMarlon: Hey");
    }

    #[test]
    fn backend_follows_configured_type() {
        assert_eq!(create_backend(&CollaboratorConfig::default()).name(), "openai-compatible");

        let anthropic = create_backend(&CollaboratorConfig {
            backend: BackendType::Anthropic,
            ..CollaboratorConfig::default()
        });
        assert_eq!(anthropic.name(), "anthropic");
    }
}
