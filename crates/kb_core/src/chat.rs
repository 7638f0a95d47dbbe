use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::reason::ReasonChunk;

pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reason: Vec<ReasonChunk>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(iso_timestamp(now)),
            reason: Vec::new(),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        reason: Vec<ReasonChunk>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(iso_timestamp(now)),
            reason,
        }
    }

    /// Assistant-visible message injected when a question could not be answered.
    pub fn apology(now: DateTime<Utc>) -> Self {
        Self::assistant(APOLOGY_MESSAGE, Vec::new(), now)
    }

    pub fn fill_missing_timestamp(&mut self, now: DateTime<Utc>) {
        let missing = self
            .timestamp
            .as_deref()
            .map_or(true, |ts| ts.trim().is_empty());
        if missing {
            self.timestamp = Some(iso_timestamp(now));
        }
    }

    pub fn has_evidence(&self) -> bool {
        !self.reason.is_empty()
    }
}

/// Trimmed title, or the default when blank.
pub fn normalize_session_title(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_SESSION_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ReasonChunk>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ReasonChunk>>::deserialize(deserializer)?.unwrap_or_default())
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
