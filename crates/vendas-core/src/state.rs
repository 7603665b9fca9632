//! UI-agnostic wire and transcript types
//!
//! This module contains the data structures shared between the server and
//! the chat client and doesn't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// A chat message in the analytics conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique per transcript, assigned from a monotonic counter
    pub id: String,
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Body of `POST /api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Success body of `POST /api/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub response: String,
    #[serde(rename = "dataSource")]
    pub data_source: String,
}

/// Failure body for every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of `POST /api/drive/reload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
}

/// One entry of `GET /api/drive/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    /// Rounded to whole kilobytes, or "N/A" when the drive reports no size
    pub size: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
}
