//! Knowledge-base client core: pure ingestion state machine, projections and
//! the loosely shaped chat/evidence records.
mod chat;
mod effect;
pub mod fields;
pub mod format;
mod msg;
mod reason;
mod state;
mod update;
mod view_model;

pub use chat::{
    normalize_session_title, ChatMessage, Role, Session, APOLOGY_MESSAGE, DEFAULT_SESSION_TITLE,
};
pub use effect::Effect;
pub use msg::Msg;
pub use reason::{EvidencePager, ReasonChunk, Relevance, UNKNOWN_DOCUMENT, UNKNOWN_PAGE};
pub use state::{
    AppState, FileRef, HistoryRecord, HistorySource, ItemId, Provenance, UploadItem,
    UploadStatus, COMPLETE_PROGRESS, PDF_MEDIA_TYPE, PROCESSING_PROGRESS,
};
pub use update::update;
pub use view_model::{
    compute_stats, filter_items, AppViewModel, ItemRowView, StatusFilter, UploadStats,
    COLLAPSED_ROW_LIMIT,
};
