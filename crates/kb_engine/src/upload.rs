use std::sync::Arc;

use chrono::Utc;
use kb_core::fields::{self, Record};
use kb_core::{FileRef, ItemId, Provenance};
use kb_logging::{kb_debug, kb_info, kb_warn};
use reqwest::multipart::{Form, Part};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{BackendClient, UPLOAD_PATH};
use crate::settings::UploadSettings;
use crate::types::{
    backend_message, EngineEvent, UploadError, UploadReceipt, GENERIC_UPLOAD_FAILURE,
};

const CHUNK_KEYS: &[&str] = &["chunks_created", "uploaded_chunks"];

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sends one document to the ingestion backend.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, file: &FileRef) -> Result<UploadReceipt, UploadError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    client: BackendClient,
}

impl ReqwestUploader {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(&self, file: &FileRef) -> Result<UploadReceipt, UploadError> {
        let part = Part::bytes(file.payload.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|err| UploadError::InvalidRequest(err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .http()
            .post(self.client.settings().endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        // Once a status line arrives the request was dispatched.
        let status = response.status();
        let body = response.bytes().await;
        if !status.is_success() {
            let message = body.ok().and_then(|body| backend_message(&body));
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| GENERIC_UPLOAD_FAILURE.to_string()),
            });
        }

        match body {
            Ok(body) => Ok(read_receipt(&body)),
            Err(err) => {
                kb_warn!("Upload of {} accepted but its body was unreadable: {}", file.name, err);
                Ok(UploadReceipt::default())
            }
        }
    }
}

/// An accepted upload whose body cannot be read still counts, just without a chunk count.
fn read_receipt(body: &[u8]) -> UploadReceipt {
    let Ok(record) = serde_json::from_slice::<Record>(body) else {
        return UploadReceipt::default();
    };
    UploadReceipt {
        chunks_created: fields::first_u64(&record, CHUNK_KEYS)
            .and_then(|n| u32::try_from(n).ok()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    // Connect timeouts also report `is_timeout`; they never reached the backend.
    if err.is_connect() {
        return UploadError::Unreachable(err.to_string());
    }
    if err.is_timeout() {
        return UploadError::TimedOut(err.to_string());
    }
    if err.is_builder() {
        return UploadError::InvalidRequest(err.to_string());
    }
    UploadError::Unreachable(err.to_string())
}

/// Perceived-progress ticker for one attempt; stops when stopped or dropped.
pub(crate) struct Heartbeat {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub(crate) fn start(
        item_id: ItemId,
        settings: &UploadSettings,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let settings = settings.clone();
        let task = tokio::spawn(async move {
            let mut progress = 0.0_f32;
            let mut ticker = tokio::time::interval(settings.heartbeat_interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let next = (progress + settings.random_step()).min(settings.heartbeat_ceiling);
                        if next > progress {
                            progress = next;
                            sink.emit(EngineEvent::Progress { item_id: item_id.clone(), progress });
                        }
                    }
                }
            }
        });
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Cancels the ticker and waits until it can no longer emit.
    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Drives one attempt from `Uploading` to a terminal event.
pub async fn run_upload(
    item_id: ItemId,
    file: FileRef,
    uploader: &dyn Uploader,
    settings: &UploadSettings,
    sink: Arc<dyn ProgressSink>,
) {
    kb_info!("Uploading {} ({} bytes) as {}", file.name, file.size(), item_id);
    let heartbeat = Heartbeat::start(item_id.clone(), settings, sink.clone());
    let outcome = uploader.upload(&file).await;
    heartbeat.stop().await;

    let (chunks, provenance) = match outcome {
        Ok(receipt) => {
            let chunks = receipt
                .chunks_created
                .unwrap_or_else(|| settings.random_chunk_count());
            (chunks, Provenance::Backend)
        }
        Err(UploadError::Unreachable(reason)) => {
            kb_warn!(
                "Backend unreachable for {} ({}); simulating ingestion",
                file.name,
                reason
            );
            (settings.random_chunk_count(), Provenance::Simulated)
        }
        Err(err) => {
            kb_warn!("Upload of {} failed: {}", file.name, err);
            sink.emit(EngineEvent::Failed {
                item_id,
                message: err.item_message(),
            });
            return;
        }
    };

    sink.emit(EngineEvent::Processing {
        item_id: item_id.clone(),
        progress: settings.processing_progress,
    });
    tokio::time::sleep(settings.processing_delay).await;
    kb_debug!("{} completed with {} chunks ({:?})", item_id, chunks, provenance);
    sink.emit(EngineEvent::Completed {
        item_id,
        chunks,
        uploaded_at: Utc::now(),
        provenance,
    });
}
