//! JSON request and response bodies exchanged with callers.
//!
//! These mirror the chat, execute, status and results endpoints of the web
//! layer. Results are returned as [`TestResult`] directly and push
//! notifications as [`JobEvent`](crate::scheduler::JobEvent).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::{JobId, TestOptions, TestType};
use crate::runner::JobStatus;

/// Reply sent when a chat message started a test
pub const TEST_STARTED_REPLY: &str = "I'll help you test that. Starting test execution...";

/// Incoming chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub content: String,
}

/// Job reference attached to a chat reply that started a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub test_id: JobId,
    pub status: JobStatus,
}

/// Assistant reply to a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
}

impl ChatReply {
    /// A plain conversational reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: "assistant".to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// The reply for a prompt that queued a test
    pub fn test_started(test_id: JobId) -> Self {
        Self {
            metadata: Some(ChatMetadata {
                test_id,
                status: JobStatus::Pending,
            }),
            ..Self::assistant(TEST_STARTED_REPLY)
        }
    }

    /// Id of the job this reply started, if any
    pub fn test_id(&self) -> Option<&JobId> {
        self.metadata.as_ref().map(|m| &m.test_id)
    }
}

/// Explicit test request; unset fields are derived from the prompt
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub prompt: String,
    #[serde(default)]
    pub test_type: Option<TestType>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub options: Option<TestOptions>,
}

impl ExecuteRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// Status lookup response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub test_id: JobId,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_reply_carries_metadata() {
        let reply = ChatReply::test_started(JobId::from("job-1"));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "assistant");
        assert_eq!(json["content"], TEST_STARTED_REPLY);
        assert_eq!(json["metadata"]["test_id"], "job-1");
        assert_eq!(json["metadata"]["status"], "pending");
    }

    #[test]
    fn test_conversation_reply_has_no_metadata() {
        let json = serde_json::to_value(ChatReply::assistant("Hello!")).unwrap();
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_execute_request_defaults() {
        let request: ExecuteRequest =
            serde_json::from_str(r#"{"prompt":"test the api","test_type":"api"}"#).unwrap();
        assert_eq!(request.test_type, Some(TestType::Api));
        assert!(request.target_url.is_none());
        assert!(request.options.is_none());
    }
}
