//! Gemini `generateContent` client

use super::{AiReply, AnalysisCapability, AnalysisRequest, ConversationSession};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

/// Connection settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// `None` leaves the request unbounded
    pub timeout: Option<Duration>,
    /// Exchanges (user turn + model turn) a session keeps as context
    pub session_exchanges: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: Some("model".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Shared HTTP plumbing for client and session
#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl Endpoint {
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String> {
        let resp = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| Error::AnalysisTransport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::AnalysisTransport(format!(
                "model request failed: {} - {}",
                status, body
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::MalformedAnalysisResponse(e.to_string()))?;

        body.text().ok_or_else(|| {
            Error::MalformedAnalysisResponse("reply contained no text".to_string())
        })
    }
}

/// Gemini analysis client
pub struct GeminiClient {
    endpoint: Endpoint,
    model: String,
    session_exchanges: usize,
}

impl GeminiClient {
    /// Create new client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            endpoint: Endpoint {
                client,
                url,
                api_key: config.api_key,
            },
            model: config.model,
            session_exchanges: config.session_exchanges.max(1),
        })
    }

    /// Open a conversational session sharing this client's connection pool
    pub fn start_session(&self, system_instruction: &str) -> GeminiSession {
        tracing::info!(
            model = %self.model,
            max_exchanges = self.session_exchanges,
            "Conversation session started"
        );
        GeminiSession {
            endpoint: self.endpoint.clone(),
            system_instruction: Content {
                role: None,
                parts: vec![Part::text(system_instruction)],
            },
            history: Mutex::new(VecDeque::new()),
            max_exchanges: self.session_exchanges,
        }
    }
}

fn user_content(request: &AnalysisRequest) -> Content {
    let mut parts = vec![Part::text(&request.prompt)];
    if let Some(image) = &request.image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            }),
        });
    }
    Content::user(parts)
}

#[async_trait]
impl AnalysisCapability for GeminiClient {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AiReply> {
        let contents = [user_content(&request)];
        let generation_config = request.schema.clone().map(|schema| GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        let structured = generation_config.is_some();

        let body = GenerateRequest {
            system_instruction: None,
            contents: &contents,
            generation_config,
        };
        let text = self.endpoint.generate(&body).await?;

        if structured {
            let value = serde_json::from_str(&text)
                .map_err(|e| Error::MalformedAnalysisResponse(format!("invalid JSON: {}", e)))?;
            Ok(AiReply::Structured(value))
        } else {
            Ok(AiReply::Text(text))
        }
    }
}

/// Conversational session with a bounded rolling history
///
/// The history lock is only held to copy or extend the context, never
/// across the model round trip. Exchanges are appended as user/model pairs
/// in completion order, and only when the call succeeds.
pub struct GeminiSession {
    endpoint: Endpoint,
    system_instruction: Content,
    history: Mutex<VecDeque<(Content, Content)>>,
    max_exchanges: usize,
}

#[async_trait]
impl ConversationSession for GeminiSession {
    async fn send(&self, message: &str) -> Result<String> {
        let question = Content::user(vec![Part::text(message)]);
        let mut contents: Vec<Content> = {
            let history = self.history.lock().await;
            history
                .iter()
                .flat_map(|(user, model)| [user.clone(), model.clone()])
                .collect()
        };
        contents.push(question.clone());

        let body = GenerateRequest {
            system_instruction: Some(self.system_instruction.clone()),
            contents: &contents,
            generation_config: None,
        };
        let reply = self.endpoint.generate(&body).await?;

        let mut history = self.history.lock().await;
        history.push_back((question, Content::model(&reply)));
        while history.len() > self.max_exchanges {
            history.pop_front();
        }
        tracing::debug!(exchanges = history.len(), "Session history updated");
        Ok(reply)
    }
}
