//! Base trait and wire types for conversation session backends

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for session lifecycle operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// The remote API rejected or was unreachable during session creation
    #[error("Failed to create conversation session: {0}")]
    Creation(String),

    /// The remote "end" call failed; callers treat teardown as best-effort
    #[error("Failed to end conversation session: {0}")]
    Teardown(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Chapter scope supplied by the caller, passed through to the remote API
/// to pin the conversation's subject matter. Never mutated by the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContext {
    pub chapter_id: String,
    pub chapter_title: String,
    pub course_id: Option<String>,
}

impl ChapterContext {
    pub fn new(chapter_id: impl Into<String>, chapter_title: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            chapter_title: chapter_title.into(),
            course_id: None,
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }
}

/// Handle to an active remote conversation.
///
/// Issued by the remote API on successful creation; held by the
/// orchestrator for the lifetime of the call and discarded on leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHandle {
    /// URL the conversation renderer embeds
    pub conversation_url: String,
    /// Server-issued conversation id
    pub conversation_id: String,
    /// Server-side expiry, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /conversation-sessions`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub chapter_id: String,
    pub chapter_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    /// Session time limit in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_id: Option<String>,
}

impl CreateConversationRequest {
    /// Build a request from chapter context; limit and persona fall back to
    /// client defaults when left unset.
    pub fn from_chapter(chapter: &ChapterContext) -> Self {
        Self {
            chapter_id: chapter.chapter_id.clone(),
            chapter_title: chapter.chapter_title.clone(),
            course_id: chapter.course_id.clone(),
            time_limit: None,
            persona_id: None,
        }
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_persona(mut self, persona_id: impl Into<String>) -> Self {
        self.persona_id = Some(persona_id.into());
        self
    }
}

/// Trait for conversation session backends.
///
/// The sole boundary between the learning-check flow and the remote
/// conversational-AI API. Implementations normalize every transport or
/// protocol failure into [`SessionError`] before it reaches a caller.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Create a remote conversation scoped to the request's chapter.
    ///
    /// A single attempt per call; callers do not retry automatically.
    async fn create_conversation(
        &self,
        request: CreateConversationRequest,
    ) -> SessionResult<ConversationHandle>;

    /// End a remote conversation.
    ///
    /// Failures are reported but callers treat this call as best-effort
    /// cleanup and never let it block their own teardown.
    async fn end_conversation(&self, conversation_id: &str) -> SessionResult<()>;
}
