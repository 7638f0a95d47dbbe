use chrono::Utc;
use kb_core::{normalize_session_title, ChatMessage, HistoryRecord, ReasonChunk, Session};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::history::parse_history;
use crate::settings::ApiSettings;
use crate::types::{backend_message, ApiError};

pub(crate) const UPLOAD_PATH: &str = "/api/upload-pdf";
const HISTORY_PATH: &str = "/api/upload-history";

#[derive(Debug, Deserialize)]
struct CreatedSession {
    session_id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
    #[serde(default)]
    reason: Option<Vec<ReasonChunk>>,
}

/// Request/response access to the assistant backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    settings: ApiSettings,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let http = settings
            .build_client()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let response = send(self.http.get(self.settings.endpoint("/sessions"))).await?;
        read_json(response).await
    }

    /// Creates a session; a blank title becomes the default title.
    pub async fn create_session(&self, title: &str) -> Result<Session, ApiError> {
        let title = normalize_session_title(title);
        let request = self
            .http
            .post(self.settings.endpoint("/new-session"))
            .json(&json!({ "title": title }));
        let created: CreatedSession = read_json(send(request).await?).await?;
        Ok(Session {
            session_id: created.session_id,
            title: created.title.unwrap_or(title),
            created_at: None,
        })
    }

    /// Messages of one session; missing timestamps are stamped with the current time.
    pub async fn chat_history(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.segment_url("/chat", session_id)?;
        let mut messages: Vec<ChatMessage> = read_json(send(self.http.get(url)).await?).await?;
        let now = Utc::now();
        for message in &mut messages {
            message.fill_missing_timestamp(now);
        }
        Ok(messages)
    }

    /// Asks a question and returns the assistant reply with its evidence.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<ChatMessage, ApiError> {
        if question.trim().is_empty() {
            return Err(ApiError::InvalidInput("question is empty".to_string()));
        }
        let request = self
            .http
            .post(self.settings.endpoint("/ask"))
            .json(&json!({ "session_id": session_id, "question": question }));
        let reply: AskResponse = read_json(send(request).await?).await?;
        Ok(ChatMessage::assistant(
            reply.answer,
            reply.reason.unwrap_or_default(),
            Utc::now(),
        ))
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let url = self.segment_url("/session", session_id)?;
        send(self.http.delete(url)).await.map(drop)
    }

    pub async fn rename_session(&self, session_id: &str, new_title: &str) -> Result<(), ApiError> {
        if new_title.trim().is_empty() {
            return Err(ApiError::InvalidInput("title is empty".to_string()));
        }
        let url = self.segment_url("/session", session_id)?;
        let request = self.http.put(url).json(&json!({ "new_title": new_title }));
        send(request).await.map(drop)
    }

    /// Previously persisted uploads, as reported by the backend.
    pub async fn upload_history(&self) -> Result<Vec<HistoryRecord>, ApiError> {
        let response = send(self.http.get(self.settings.endpoint(HISTORY_PATH))).await?;
        let value: Value = read_json(response).await?;
        parse_history(value)
    }

    fn segment_url(&self, path: &str, segment: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.settings.endpoint(path))
            .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidInput("base url cannot take a path".to_string()))?
            .push(segment);
        Ok(url)
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::Transport(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ApiError::Backend {
        status: status.as_u16(),
        message: backend_message(&body),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response
        .bytes()
        .await
        .map_err(|err| ApiError::Transport(err.to_string()))?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
}
