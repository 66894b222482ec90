//! HTTP client for the conversation-session API

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::base::{
    ConversationApi, ConversationHandle, CreateConversationRequest, SessionError, SessionResult,
};
use async_trait::async_trait;
use learncheck_core::config::schema::Config;

/// Error body returned by the remote API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP implementation of [`ConversationApi`]
pub struct HttpConversationClient {
    client: Client,
    base_url: String,
    api_key: String,
    default_persona_id: Option<String>,
    default_time_limit_secs: Option<u32>,
}

impl HttpConversationClient {
    /// Create a new client against the given API base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .http1_only() // Force HTTP/1.1 to avoid issues with some local servers
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_persona_id: None,
            default_time_limit_secs: None,
        }
    }

    /// Build a client from the resolved configuration
    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(&config.session.base_url, &config.session.api_key);
        if !config.session.persona_id.trim().is_empty() {
            client.default_persona_id = Some(config.session.persona_id.clone());
        }
        client.default_time_limit_secs = Some(config.learning_check.default_time_limit_secs);
        client
    }

    /// Set the persona applied to requests that do not carry one
    pub fn with_default_persona(mut self, persona_id: impl Into<String>) -> Self {
        self.default_persona_id = Some(persona_id.into());
        self
    }

    /// Set the time limit applied to requests that do not carry one
    pub fn with_default_time_limit(mut self, seconds: u32) -> Self {
        self.default_time_limit_secs = Some(seconds);
        self
    }

    fn apply_defaults(&self, mut request: CreateConversationRequest) -> CreateConversationRequest {
        if request.persona_id.is_none() {
            request.persona_id = self.default_persona_id.clone();
        }
        if request.time_limit.is_none() {
            request.time_limit = self.default_time_limit_secs;
        }
        request
    }

    fn apply_headers(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req_builder.header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Extract the server-reported error message, falling back to a generic
    /// message when the error body is absent or malformed.
    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) => match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) if !parsed.error.trim().is_empty() => parsed.error,
                _ => format!("conversation session request failed with HTTP {}", status),
            },
            Err(_) => format!("conversation session request failed with HTTP {}", status),
        }
    }
}

#[async_trait]
impl ConversationApi for HttpConversationClient {
    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> SessionResult<ConversationHandle> {
        let request = self.apply_defaults(request);
        let url = format!("{}/conversation-sessions", self.base_url);

        debug!(
            chapter_id = %request.chapter_id,
            "Creating conversation session at {}", url
        );

        let response = self
            .apply_headers(self.client.post(&url).json(&request))
            .send()
            .await
            .map_err(|e| SessionError::Creation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Creation(Self::error_message(response).await));
        }

        let handle: ConversationHandle = response
            .json()
            .await
            .map_err(|e| SessionError::Creation(format!("invalid response body: {}", e)))?;

        debug!(
            conversation_id = %handle.conversation_id,
            "Conversation session created"
        );
        Ok(handle)
    }

    async fn end_conversation(&self, conversation_id: &str) -> SessionResult<()> {
        let url = format!(
            "{}/conversation-sessions/{}/end",
            self.base_url, conversation_id
        );

        debug!(conversation_id, "Ending conversation session at {}", url);

        let response = self
            .apply_headers(self.client.post(&url))
            .send()
            .await
            .map_err(|e| SessionError::Teardown(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SessionError::Teardown(Self::error_message(response).await));
        }

        Ok(())
    }
}
