use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    prompt, response, ConditionOracle, ConditionRequest, JudgmentRequest, LevelJudgment,
    OracleError, PrioritizationRequest, RankedAction,
};
use crate::config::OracleConfig;
use crate::evaluation::ConditionVerification;

/// OpenAI-compatible chat-completions oracle.
#[derive(Debug, Clone)]
pub struct HttpOracleClient {
    identity: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    http_client: reqwest::Client,
}

impl HttpOracleClient {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Configuration {
                reason: err.to_string(),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            identity: format!("{}@{}", config.model, base_url),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: json!({ "type": "json_object" }),
        };

        let mut builder = self.http_client.post(self.endpoint()).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| OracleError::malformed(format!("completion envelope: {err}")))?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens.unwrap_or(0),
                completion_tokens = usage.completion_tokens.unwrap_or(0),
                total_tokens = usage.total_tokens.unwrap_or(0),
                "oracle completion"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| OracleError::malformed("completion without content"))
    }
}

fn transport_error(err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::unavailable("request timed out")
    } else if err.is_connect() {
        OracleError::unavailable(format!("connection failed: {err}"))
    } else if err.is_builder() {
        OracleError::Configuration {
            reason: err.to_string(),
        }
    } else {
        OracleError::unavailable(err.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> OracleError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        OracleError::unavailable(format!("status {status}"))
    } else {
        OracleError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ConditionOracle for HttpOracleClient {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn verify_condition(
        &self,
        request: &ConditionRequest,
    ) -> Result<ConditionVerification, OracleError> {
        let content = self
            .complete(
                prompt::VERIFIER_SYSTEM_PROMPT,
                &prompt::condition_prompt(request),
            )
            .await?;
        response::parse_verification(&content, &request.condition_id)
    }

    async fn judge_indicator(
        &self,
        request: &JudgmentRequest,
    ) -> Result<LevelJudgment, OracleError> {
        let content = self
            .complete(
                prompt::VERIFIER_SYSTEM_PROMPT,
                &prompt::judgment_prompt(request),
            )
            .await?;
        response::parse_judgment(&content)
    }

    async fn prioritize(
        &self,
        request: &PrioritizationRequest,
    ) -> Result<Vec<RankedAction>, OracleError> {
        let user_prompt = prompt::prioritization_prompt(request).map_err(|err| {
            OracleError::Configuration {
                reason: format!("prioritization payload: {err}"),
            }
        })?;
        let content = self
            .complete(prompt::ANALYST_SYSTEM_PROMPT, &user_prompt)
            .await?;
        response::parse_prioritization(&content)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageInfo {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}
