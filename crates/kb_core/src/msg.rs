use chrono::{DateTime, Utc};

use crate::{FileRef, HistoryRecord, HistorySource, ItemId, Provenance, StatusFilter};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The upload screen was opened; history should be loaded once.
    Started,
    /// User picked files for staging.
    FilesSelected(Vec<FileRef>),
    /// User asked to upload (or retry) a single item.
    UploadRequested { item_id: ItemId },
    /// User clicked "Upload all".
    UploadAllClicked,
    /// User clicked "Retry failed".
    RetryFailedClicked,
    /// User removed an in-flight item.
    RemoveClicked { item_id: ItemId },
    /// User clicked "Clear completed".
    ClearCompletedClicked,
    /// User edited the search box.
    SearchChanged(String),
    /// User picked a status in the filter selector.
    StatusFilterChanged(StatusFilter),
    /// User toggled "Show all" / "Show less".
    ShowAllToggled,
    /// Engine finished loading upload history.
    HistoryLoaded {
        records: Vec<HistoryRecord>,
        source: HistorySource,
    },
    /// Engine heartbeat for an upload attempt.
    UploadProgress { item_id: ItemId, progress: f32 },
    /// Engine moved an attempt into server-side processing.
    UploadProcessing { item_id: ItemId, progress: f32 },
    /// Engine completion for an attempt.
    UploadCompleted {
        item_id: ItemId,
        chunks: u32,
        uploaded_at: DateTime<Utc>,
        provenance: Provenance,
    },
    /// Engine failure for an attempt.
    UploadFailed { item_id: ItemId, message: String },
    /// Render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
