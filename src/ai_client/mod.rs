//! AIClient - External Analysis Capability Adapter
//!
//! ## Responsibilities
//!
//! - Define the analysis and conversation capabilities the station consumes
//! - Provide the Gemini `generateContent` implementation of both
//!
//! The station never looks past these traits, so tests and alternative
//! backends plug in by implementing them.

mod gemini;

pub use gemini::{GeminiClient, GeminiConfig, GeminiSession};

use crate::error::Result;
use crate::snapshot_service::ImagePayload;
use async_trait::async_trait;

/// One analysis request
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Optional still image
    pub image: Option<ImagePayload>,
    /// Instruction text
    pub prompt: String,
    /// JSON schema hint; when present the reply must be structured
    pub schema: Option<serde_json::Value>,
}

impl AnalysisRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            image: None,
            prompt: prompt.into(),
            schema: None,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Reply from the analysis capability
#[derive(Debug, Clone, PartialEq)]
pub enum AiReply {
    /// JSON payload (requested via schema)
    Structured(serde_json::Value),
    /// Free text
    Text(String),
}

/// Single-shot analysis capability
#[async_trait]
pub trait AnalysisCapability: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AiReply>;
}

/// Long-lived conversational session; context accumulates across turns
#[async_trait]
pub trait ConversationSession: Send + Sync {
    async fn send(&self, message: &str) -> Result<String>;
}
