use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::format::format_file_size;
use crate::{AppState, HistorySource, ItemId, Provenance, UploadItem, UploadStatus};

/// Rows shown while the list is collapsed.
pub const COLLAPSED_ROW_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadStats {
    pub total_files: usize,
    pub total_size: u64,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub total_chunks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(UploadStatus),
}

impl StatusFilter {
    pub fn matches(self, status: UploadStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRowView {
    pub item_id: ItemId,
    pub name: String,
    pub status: UploadStatus,
    /// Whole percent, for progress bars.
    pub progress: u8,
    pub size_label: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub chunks: Option<u32>,
    pub error: Option<String>,
    pub provenance: Option<Provenance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub stats: UploadStats,
    /// Rows after filtering and the collapsed-list limit.
    pub rows: Vec<ItemRowView>,
    /// Rows matching the filter before the collapsed-list limit.
    pub matching_count: usize,
    pub search_query: String,
    pub status_filter: StatusFilter,
    pub show_all: bool,
    pub history_source: Option<HistorySource>,
    pub unsettled_count: usize,
}

impl AppViewModel {
    /// More matching rows exist than are currently shown.
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.matching_count
    }
}

pub fn compute_stats<'a>(items: impl IntoIterator<Item = &'a UploadItem>) -> UploadStats {
    items
        .into_iter()
        .fold(UploadStats::default(), |mut stats, item| {
            stats.total_files += 1;
            stats.total_size += item.byte_size();
            match item.status {
                UploadStatus::Completed => stats.successful_uploads += 1,
                UploadStatus::Error => stats.failed_uploads += 1,
                _ => {}
            }
            stats.total_chunks += u64::from(item.chunks.unwrap_or(0));
            stats
        })
}

/// Items whose name contains `query` (case-insensitive) and whose status matches `filter`.
pub fn filter_items<'a>(
    items: impl IntoIterator<Item = &'a UploadItem>,
    query: &str,
    filter: StatusFilter,
) -> Vec<&'a UploadItem> {
    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.display_name().to_lowercase().contains(&needle))
        .filter(|item| filter.matches(item.status))
        .collect()
}

pub(crate) fn project(state: &AppState) -> AppViewModel {
    let matching = filter_items(state.all_items(), state.search_query(), state.status_filter());
    let matching_count = matching.len();
    let limit = if state.show_all() {
        matching_count
    } else {
        COLLAPSED_ROW_LIMIT
    };

    AppViewModel {
        stats: compute_stats(state.all_items()),
        rows: matching.into_iter().take(limit).map(row_view).collect(),
        matching_count,
        search_query: state.search_query().to_string(),
        status_filter: state.status_filter(),
        show_all: state.show_all(),
        history_source: state.history_source(),
        unsettled_count: state
            .in_flight()
            .filter(|item| item.status.is_unsettled())
            .count(),
    }
}

fn row_view(item: &UploadItem) -> ItemRowView {
    ItemRowView {
        item_id: item.id.clone(),
        name: item.display_name().to_string(),
        status: item.status,
        progress: item.progress.round().clamp(0.0, 100.0) as u8,
        size_label: format_file_size(item.byte_size()),
        uploaded_at: item.uploaded_at,
        chunks: item.chunks,
        error: item.error.clone(),
        provenance: item.provenance,
    }
}
