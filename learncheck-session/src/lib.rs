//! Conversation session client for learncheck
//!
//! This crate provides the boundary to the remote conversational-AI API:
//! the [`ConversationApi`] trait and its HTTP implementation.

pub mod base;
pub mod http;

pub use base::{
    ChapterContext, ConversationApi, ConversationHandle, CreateConversationRequest, SessionError,
    SessionResult,
};
pub use http::HttpConversationClient;
