//! Knowledge-base client engine: backend requests and upload attempt execution.
mod client;
mod engine;
mod history;
mod settings;
mod types;
mod upload;

pub use client::BackendClient;
pub use engine::EngineHandle;
pub use history::{fallback_history, load_history};
pub use settings::{ApiSettings, EngineConfig, UploadSettings, DEFAULT_API_BASE_URL};
pub use types::{
    ApiError, EngineError, EngineEvent, UploadError, UploadReceipt, GENERIC_UPLOAD_FAILURE,
};
pub use upload::{run_upload, ChannelProgressSink, ProgressSink, ReqwestUploader, Uploader};
