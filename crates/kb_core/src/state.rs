use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::view_model::{self, AppViewModel, StatusFilter};

/// Media type accepted by file intake unless overridden.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Progress at which an attempt enters `Processing`.
pub const PROCESSING_PROGRESS: f32 = 95.0;

/// Progress of a `Completed` item.
pub const COMPLETE_PROGRESS: f32 = 100.0;

/// Upper bound for progress reported while `Uploading` or `Processing`.
const IN_FLIGHT_PROGRESS_CAP: f32 = 99.0;

/// Identifier of an upload item.
///
/// Items staged in this session and items reconciled from the backend live in
/// separate id spaces, so the two sets can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemId {
    Local(u64),
    History(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Local(n) => write!(f, "local-{n}"),
            ItemId::History(id) => f.write_str(id),
        }
    }
}

impl FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.strip_prefix("local-").and_then(|n| n.parse().ok()) {
            Some(n) => ItemId::Local(n),
            None => ItemId::History(s.to_string()),
        })
    }
}

/// The payload of a document plus its declared name and media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub name: String,
    pub media_type: String,
    pub payload: Bytes,
}

impl FileRef {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            payload: payload.into(),
        }
    }

    /// A PDF reference whose payload is not resident (history items).
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, PDF_MEDIA_TYPE, Bytes::new())
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl UploadStatus {
    pub const ALL: [UploadStatus; 5] = [
        UploadStatus::Pending,
        UploadStatus::Uploading,
        UploadStatus::Processing,
        UploadStatus::Completed,
        UploadStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Error => "error",
        }
    }

    /// Still has work outstanding (not yet `Completed` or `Error`).
    pub fn is_unsettled(self) -> bool {
        matches!(
            self,
            UploadStatus::Pending | UploadStatus::Uploading | UploadStatus::Processing
        )
    }

    /// Edges of the upload lifecycle.
    pub fn can_transition_to(self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Error, Uploading)
                | (Uploading, Processing)
                | (Uploading, Error)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        UploadStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown upload status `{needle}`"))
    }
}

/// Where a completion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Acknowledged by the backend.
    Backend,
    /// Produced locally because the backend could not be reached.
    Simulated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: ItemId,
    pub file: FileRef,
    pub status: UploadStatus,
    pub progress: f32,
    pub error: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub chunks: Option<u32>,
    pub size: Option<u64>,
    pub provenance: Option<Provenance>,
}

impl UploadItem {
    fn staged(id: u64, file: FileRef) -> Self {
        let size = Some(file.size());
        Self {
            id: ItemId::Local(id),
            file,
            status: UploadStatus::Pending,
            progress: 0.0,
            error: None,
            uploaded_at: None,
            chunks: None,
            size,
            provenance: None,
        }
    }

    fn from_history(record: HistoryRecord, source: HistorySource) -> Self {
        Self {
            id: ItemId::History(record.id),
            file: FileRef::detached(record.file_name),
            status: UploadStatus::Completed,
            progress: COMPLETE_PROGRESS,
            error: None,
            uploaded_at: record.uploaded_at,
            chunks: record.chunks,
            size: record.size,
            provenance: Some(match source {
                HistorySource::Backend => Provenance::Backend,
                HistorySource::Fallback => Provenance::Simulated,
            }),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.file.name
    }

    /// Explicit size when known, else the resident payload length.
    pub fn byte_size(&self) -> u64 {
        self.size.unwrap_or_else(|| self.file.size())
    }
}

/// A previously completed upload as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: String,
    pub file_name: String,
    pub size: Option<u64>,
    pub chunks: Option<u32>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Backend,
    Fallback,
}

/// Owned store for the in-flight set, the history set and the view filters.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    accepted_media_type: String,
    items: BTreeMap<u64, UploadItem>,
    next_item_id: u64,
    history: Vec<UploadItem>,
    history_requested: bool,
    history_source: Option<HistorySource>,
    search_query: String,
    status_filter: StatusFilter,
    show_all: bool,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_accepted_media_type(PDF_MEDIA_TYPE)
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accepted_media_type(media_type: impl Into<String>) -> Self {
        Self {
            accepted_media_type: media_type.into(),
            items: BTreeMap::new(),
            next_item_id: 1,
            history: Vec::new(),
            history_requested: false,
            history_source: None,
            search_query: String::new(),
            status_filter: StatusFilter::All,
            show_all: false,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        view_model::project(self)
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn item(&self, id: &ItemId) -> Option<&UploadItem> {
        match id {
            ItemId::Local(n) => self.items.get(n),
            ItemId::History(_) => self.history.iter().find(|item| &item.id == id),
        }
    }

    /// Items staged in this session, in intake order.
    pub fn in_flight(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.values()
    }

    pub fn history(&self) -> &[UploadItem] {
        &self.history
    }

    pub fn history_source(&self) -> Option<HistorySource> {
        self.history_source
    }

    /// In-flight items followed by history items.
    pub fn all_items(&self) -> impl Iterator<Item = &UploadItem> {
        self.items.values().chain(self.history.iter())
    }

    pub fn has_unsettled_items(&self) -> bool {
        self.items.values().any(|item| item.status.is_unsettled())
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub(crate) fn stage_files(&mut self, files: Vec<FileRef>) -> Vec<ItemId> {
        let mut staged = Vec::new();
        for file in files {
            if file.media_type != self.accepted_media_type {
                continue;
            }
            let id = self.next_item_id;
            self.next_item_id += 1;
            self.items.insert(id, UploadItem::staged(id, file));
            staged.push(ItemId::Local(id));
        }
        if !staged.is_empty() {
            self.mark_dirty();
        }
        staged
    }

    pub(crate) fn ids_with_status(&self, status: UploadStatus) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| item.status == status)
            .map(|item| item.id.clone())
            .collect()
    }

    /// Moves a `Pending` or `Error` item into `Uploading` and hands back its payload.
    pub(crate) fn begin_upload(&mut self, id: &ItemId) -> Option<FileRef> {
        let item = self.local_mut(id)?;
        if !item.status.can_transition_to(UploadStatus::Uploading) {
            return None;
        }
        item.status = UploadStatus::Uploading;
        item.progress = 0.0;
        item.error = None;
        let file = item.file.clone();
        self.mark_dirty();
        Some(file)
    }

    pub(crate) fn apply_progress(&mut self, id: &ItemId, progress: f32) -> bool {
        let Some(item) = self.local_mut(id) else {
            return false;
        };
        if item.status != UploadStatus::Uploading {
            return false;
        }
        let next = clamp_in_flight(progress).max(item.progress);
        if next == item.progress {
            return false;
        }
        item.progress = next;
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_processing(&mut self, id: &ItemId, progress: f32) -> bool {
        let Some(item) = self.local_mut(id) else {
            return false;
        };
        if !item.status.can_transition_to(UploadStatus::Processing) {
            return false;
        }
        item.status = UploadStatus::Processing;
        item.progress = clamp_in_flight(progress).max(item.progress);
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_completed(
        &mut self,
        id: &ItemId,
        chunks: u32,
        uploaded_at: DateTime<Utc>,
        provenance: Provenance,
    ) -> bool {
        let Some(item) = self.local_mut(id) else {
            return false;
        };
        if !item.status.can_transition_to(UploadStatus::Completed) {
            return false;
        }
        item.status = UploadStatus::Completed;
        item.progress = COMPLETE_PROGRESS;
        item.chunks = Some(chunks);
        item.uploaded_at = Some(uploaded_at);
        item.provenance = Some(provenance);
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_failed(&mut self, id: &ItemId, message: String) -> bool {
        let Some(item) = self.local_mut(id) else {
            return false;
        };
        if !item.status.can_transition_to(UploadStatus::Error) {
            return false;
        }
        item.status = UploadStatus::Error;
        item.error = Some(message);
        self.mark_dirty();
        true
    }

    pub(crate) fn remove_item(&mut self, id: &ItemId) -> Option<UploadItem> {
        let ItemId::Local(n) = id else {
            return None;
        };
        let removed = self.items.remove(n);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items
            .retain(|_, item| item.status != UploadStatus::Completed);
        let removed = before - self.items.len();
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Returns `true` when this call is the one that should trigger the fetch.
    pub(crate) fn request_history(&mut self) -> bool {
        !std::mem::replace(&mut self.history_requested, true)
    }

    pub(crate) fn install_history(
        &mut self,
        records: Vec<HistoryRecord>,
        source: HistorySource,
    ) -> bool {
        if self.history_source.is_some() {
            return false;
        }
        self.history_requested = true;
        self.history_source = Some(source);
        self.history = records
            .into_iter()
            .map(|record| UploadItem::from_history(record, source))
            .collect();
        self.mark_dirty();
        true
    }

    pub(crate) fn set_search_query(&mut self, query: String) {
        if self.search_query != query {
            self.search_query = query;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_status_filter(&mut self, filter: StatusFilter) {
        if self.status_filter != filter {
            self.status_filter = filter;
            self.mark_dirty();
        }
    }

    pub(crate) fn toggle_show_all(&mut self) {
        self.show_all = !self.show_all;
        self.mark_dirty();
    }

    fn local_mut(&mut self, id: &ItemId) -> Option<&mut UploadItem> {
        match id {
            ItemId::Local(n) => self.items.get_mut(n),
            ItemId::History(_) => None,
        }
    }
}

fn clamp_in_flight(progress: f32) -> f32 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, IN_FLIGHT_PROGRESS_CAP)
}
