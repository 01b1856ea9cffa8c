//! Google Gemini `generateContent` backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTools<'a>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

/// One content part; exactly one field is set.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<ApiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<ApiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTools<'a> {
    function_declarations: Vec<ApiFunctionDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Google Gemini backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the API host, e.g. for a proxy or a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bound each request; the default is two minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::Assistant => "model",
            Role::User | Role::System | Role::Tool => "user",
        }
    }

    fn message_to_api(msg: &Message) -> ApiContent {
        let parts = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiPart {
                    text: Some(text.clone()),
                    ..Default::default()
                },
                Part::ToolCall(call) => ApiPart {
                    function_call: Some(ApiFunctionCall {
                        name: call.name.clone(),
                        args: call.input.clone(),
                    }),
                    ..Default::default()
                },
                Part::ToolResult(result) => ApiPart {
                    function_response: Some(Self::result_to_api(result)),
                    ..Default::default()
                },
            })
            .collect();

        ApiContent {
            role: Some(Self::role_to_api(msg.role).to_string()),
            parts,
        }
    }

    /// `functionResponse.response` must be an object.
    fn result_to_api(result: &ToolResult) -> ApiFunctionResponse {
        let response = match result.payload() {
            object @ Value::Object(_) => object,
            other => json!({ "result": other }),
        };
        ApiFunctionResponse {
            name: result.name().to_string(),
            response,
        }
    }

    fn tools_to_api(specs: &[ToolSpec]) -> Vec<ApiTools<'_>> {
        if specs.is_empty() {
            return Vec::new();
        }
        vec![ApiTools {
            function_declarations: specs
                .iter()
                .map(|spec| ApiFunctionDeclaration {
                    name: &spec.name,
                    description: &spec.description,
                    parameters: &spec.schema,
                })
                .collect(),
        }]
    }

    /// Gemini does not issue call ids, so each call gets a fresh one.
    fn response_to_message(content: ApiContent) -> Message {
        let parts = content
            .parts
            .into_iter()
            .filter_map(|part| {
                if let Some(call) = part.function_call {
                    let input = match call.args {
                        Value::Null => Value::Object(Default::default()),
                        args => args,
                    };
                    Some(Part::ToolCall(ToolCall {
                        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                        name: call.name,
                        input,
                    }))
                } else {
                    part.text.map(Part::Text)
                }
            })
            .collect();

        Message {
            role: Role::Assistant,
            parts,
        }
    }
}

impl Backend for GeminiBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let system_instruction = (!request.system.is_empty()).then(|| ApiContent {
            role: None,
            parts: vec![ApiPart {
                text: Some(request.system.to_string()),
                ..Default::default()
            }],
        });

        let api_request = ApiRequest {
            system_instruction,
            contents: request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(Self::message_to_api)
                .collect(),
            tools: Self::tools_to_api(request.tools),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::from_transport(e, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let content = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| ModelError::InvalidResponse("no candidates in response".into()))?;

        let usage = api_response
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(ModelResponse {
            message: Self::response_to_message(content),
            usage,
        })
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn tool_results_become_function_responses() {
        let msg = Message::tool_results(vec![
            ToolResult::Success {
                tool_call_id: "call_1".into(),
                name: "get_fx_daily".into(),
                output: json!({"series": [1]}),
            },
            ToolResult::Success {
                tool_call_id: "call_2".into(),
                name: "get_rsi".into(),
                output: json!("Thank you for using Alpha Vantage!"),
            },
        ]);

        let api = serde_json::to_value(GeminiBackend::message_to_api(&msg)).unwrap();
        assert_eq!(
            api,
            json!({
                "role": "user",
                "parts": [
                    {"functionResponse": {"name": "get_fx_daily", "response": {"series": [1]}}},
                    {"functionResponse": {"name": "get_rsi",
                                          "response": {"result": "Thank you for using Alpha Vantage!"}}},
                ]
            })
        );
    }

    #[test]
    fn assistant_role_maps_to_model() {
        let api = serde_json::to_value(GeminiBackend::message_to_api(&Message::assistant("ok")))
            .unwrap();
        assert_eq!(api, json!({"role": "model", "parts": [{"text": "ok"}]}));
    }

    #[tokio::test]
    async fn parses_function_calls_with_fresh_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "contents": [{"role": "user", "parts": [{"text": "GBP/JPY?"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            {"functionCall": {"name": "get_fx_daily",
                                              "args": {"from_symbol": "GBP", "to_symbol": "JPY"}}},
                            {"functionCall": {"name": "get_rsi", "args": {"symbol": "GBPJPY"}}}
                        ]
                    }
                }],
                "usageMetadata": {"promptTokenCount": 21, "candidatesTokenCount": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key", "gemini-test").with_base_url(server.uri());
        let messages = [Message::user("GBP/JPY?")];
        let response = backend
            .call(ModelRequest {
                system: "be brief",
                messages: &messages,
                tools: &[],
            })
            .await
            .unwrap();

        let calls = response.message.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "get_fx_daily");
        assert_eq!(calls[1].input, json!({"symbol": "GBPJPY"}));
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(response.usage.total_tokens(), 25);
    }

    #[tokio::test]
    async fn empty_candidates_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("k", "gemini-test").with_base_url(server.uri());
        let err = backend
            .call(ModelRequest {
                system: "",
                messages: &[Message::user("hi")],
                tools: &[],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
