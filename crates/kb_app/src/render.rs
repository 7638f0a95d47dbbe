use chrono::{DateTime, Utc};
use kb_core::format::{format_clock_time, format_file_size, format_relative_time, format_short_date};
use kb_core::{
    AppViewModel, ChatMessage, EvidencePager, HistorySource, ItemRowView, Provenance, Role,
    Session, UploadStats, UploadStatus,
};

/// Text lines for the upload screen: stats, filter summary and rows.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![format_stats(&view.stats)];

    let source = match view.history_source {
        Some(HistorySource::Backend) => "backend",
        Some(HistorySource::Fallback) => "offline sample",
        None => "loading",
    };
    lines.push(format!(
        "Filter: status={} query={:?} | History: {}",
        view.status_filter, view.search_query, source
    ));

    if view.rows.is_empty() {
        lines.push("No uploads match the current filter.".to_string());
    }
    lines.extend(view.rows.iter().map(format_item_row));
    if view.is_truncated() {
        lines.push(format!(
            "... {} more (use --all to show everything)",
            view.matching_count - view.rows.len()
        ));
    }
    lines
}

pub fn format_stats(stats: &UploadStats) -> String {
    format!(
        "Files: {} | Size: {} | Uploaded: {} | Failed: {} | Chunks: {}",
        stats.total_files,
        format_file_size(stats.total_size),
        stats.successful_uploads,
        stats.failed_uploads,
        format_with_commas(stats.total_chunks)
    )
}

pub fn format_item_row(row: &ItemRowView) -> String {
    let status = match row.status {
        UploadStatus::Pending => "PENDING".to_string(),
        UploadStatus::Uploading => format!("UPLOADING {:>3}%", row.progress),
        UploadStatus::Processing => "PROCESSING".to_string(),
        UploadStatus::Completed => "OK".to_string(),
        UploadStatus::Error => "ERR".to_string(),
    };

    let mut details = vec![row.size_label.clone()];
    if let Some(chunks) = row.chunks {
        details.push(format!("{chunks} chunks"));
    }
    if let Some(at) = row.uploaded_at {
        details.push(format_short_date(at));
    }
    if row.provenance == Some(Provenance::Simulated) {
        details.push("simulated".to_string());
    }

    let mut line = format!(
        "[{id}] {status} {name} ({details})",
        id = row.item_id,
        name = row.name,
        details = details.join(", ")
    );
    if let Some(error) = &row.error {
        line.push_str(&format!(": {error}"));
    }
    line
}

pub fn format_session_row(session: &Session, now: DateTime<Utc>) -> String {
    format!(
        "{id}  {title}  ({age})",
        id = session.session_id,
        title = session.title,
        age = format_relative_time(session.created_at.as_deref(), now)
    )
}

/// A chat message followed by its evidence, one source per line.
pub fn format_message(message: &ChatMessage) -> Vec<String> {
    let speaker = match message.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    let mut lines = vec![format!(
        "{} [{}]: {}",
        speaker,
        format_clock_time(message.timestamp.as_deref()),
        message.content
    )];
    for (index, chunk) in message.reason.iter().enumerate() {
        lines.push(format!(
            "  Source {}: {} | {} | {} ({:.1}%)",
            index + 1,
            chunk.document_name(),
            chunk.page_label(),
            chunk.relevance().label(),
            chunk.score() * 100.0
        ));
    }
    lines
}

/// Full evidence of one answer, paged source by source.
pub fn format_evidence_details(message: &ChatMessage) -> Vec<String> {
    let mut pager = EvidencePager::new(message.reason.clone());
    let mut lines = Vec::new();
    for _ in 0..pager.len() {
        let Some(chunk) = pager.current() else {
            break;
        };
        let relevance = chunk.relevance();
        lines.push(format!(
            "--- {} of {} ({}, {}) ---",
            pager.title(),
            pager.len(),
            relevance.label(),
            relevance.color()
        ));
        if let Some(date) = chunk.date_label() {
            lines.push(format!("Uploaded: {date}"));
        }
        if let Some(summary) = chunk.summary() {
            lines.push(format!("Summary: {summary}"));
        }
        let tags = chunk.tags();
        if !tags.is_empty() {
            lines.push(format!("Tags: {}", tags.join(", ")));
        }
        lines.push(format!(
            "Length: {} words, {} characters",
            chunk.word_count(),
            chunk.char_count()
        ));
        lines.extend(chunk.source_summary().lines().map(str::to_string));
        pager.next();
    }
    lines
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
