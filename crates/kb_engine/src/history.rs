use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use kb_core::fields::{self, Record};
use kb_core::format::parse_timestamp;
use kb_core::{HistoryRecord, HistorySource, UNKNOWN_DOCUMENT};
use kb_logging::{kb_info, kb_warn};
use serde_json::Value;

use crate::client::BackendClient;
use crate::types::ApiError;

const ID_KEYS: &[&str] = &["id", "_id", "file_id"];
const NAME_KEYS: &[&str] = &["file_name", "filename", "name", "document_name", "source"];
const SIZE_KEYS: &[&str] = &["size", "file_size"];
const CHUNK_KEYS: &[&str] = &["chunks", "chunks_created", "uploaded_chunks"];
const UPLOADED_AT_KEYS: &[&str] = &["uploadedAt", "uploaded_at", "upload_date", "created_at"];

/// Documents shown when the backend cannot report its history: (name, chunks, size, age in days).
const FALLBACK_DOCUMENTS: &[(&str, u32, u64, i64)] = &[
    ("T24 Teller.pdf", 45, 2_048_000, 1),
    ("T24 Money Market.pdf", 23, 1_024_000, 2),
    ("T24 Limits.pdf", 45, 2_048_000, 1),
    ("T24 Funds and Transfer.pdf", 23, 1_024_000, 2),
    ("T24 Customer.pdf", 65, 2_048_000, 1),
    ("T24 Collateral.pdf", 40, 1_024_000, 2),
    ("T24 Accounts.pdf", 65, 2_048_000, 1),
    ("T3TAAL-ArrangementArchitecture-Loans-R18.pdf", 23, 1_024_000, 2),
    ("T3TAAD-ArrangementArchitecture-Deposits-R18.pdf", 45, 2_048_000, 1),
    ("T3TAAC-Core-Arrangement Architecture Core-R18.pdf", 23, 1_024_000, 2),
];

/// Loads upload history, substituting the fallback dataset on any failure.
pub async fn load_history(client: &BackendClient) -> (Vec<HistoryRecord>, HistorySource) {
    match client.upload_history().await {
        Ok(records) => {
            kb_info!("Loaded {} upload history records", records.len());
            (records, HistorySource::Backend)
        }
        Err(err) => {
            kb_warn!("Upload history unavailable ({}); using fallback dataset", err);
            (fallback_history(Utc::now()), HistorySource::Fallback)
        }
    }
}

pub fn fallback_history(now: DateTime<Utc>) -> Vec<HistoryRecord> {
    FALLBACK_DOCUMENTS
        .iter()
        .enumerate()
        .map(|(index, (name, chunks, size, age_days))| HistoryRecord {
            id: format!("hist{}", index + 1),
            file_name: (*name).to_string(),
            size: Some(*size),
            chunks: Some(*chunks),
            uploaded_at: Some(now - Duration::days(*age_days)),
        })
        .collect()
}

/// Reads the history payload: a JSON array of loosely shaped records.
///
/// Ids come out unique: a repeated backend id drops the later record, and records
/// without one get a `hist<n>` id no backend record uses.
pub(crate) fn parse_history(value: Value) -> Result<Vec<HistoryRecord>, ApiError> {
    let Value::Array(entries) = value else {
        return Err(ApiError::Decode("upload history is not a list".to_string()));
    };

    let mut taken = HashSet::new();
    let mut parsed = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(record) = entry else {
            continue;
        };
        let id = fields::first_text(&record, ID_KEYS);
        if let Some(id) = &id {
            if !taken.insert(id.clone()) {
                kb_warn!("Dropping upload history record with duplicate id {}", id);
                continue;
            }
        }
        parsed.push((index, id, record));
    }

    Ok(parsed
        .into_iter()
        .map(|(index, id, record)| {
            let id = id.unwrap_or_else(|| unused_id(index, &mut taken));
            history_record(id, &record)
        })
        .collect())
}

fn unused_id(index: usize, taken: &mut HashSet<String>) -> String {
    let mut n = index + 1;
    loop {
        let candidate = format!("hist{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn history_record(id: String, record: &Record) -> HistoryRecord {
    HistoryRecord {
        id,
        file_name: fields::first_text(record, NAME_KEYS)
            .unwrap_or_else(|| UNKNOWN_DOCUMENT.to_string()),
        size: fields::first_u64(record, SIZE_KEYS),
        chunks: fields::first_u64(record, CHUNK_KEYS).and_then(|n| u32::try_from(n).ok()),
        uploaded_at: fields::first_text(record, UPLOADED_AT_KEYS)
            .and_then(|raw| parse_timestamp(&raw)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn fallback_has_ten_completed_documents() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let records = fallback_history(now);
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, "hist1");
        assert_eq!(records[0].file_name, "T24 Teller.pdf");
        assert_eq!(records[1].uploaded_at, Some(now - Duration::days(2)));
        assert_eq!(records[9].id, "hist10");
    }

    #[test]
    fn records_resolve_field_aliases() {
        let value = json!([
            {
                "id": "abc",
                "filename": "Loans.pdf",
                "file_size": "4096",
                "uploaded_chunks": 12,
                "created_at": "2026-10-01T08:00:00"
            },
            { "name": "NoId.pdf" },
            "skipped",
        ]);

        let records = parse_history(value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "abc");
        assert_eq!(records[0].file_name, "Loans.pdf");
        assert_eq!(records[0].size, Some(4096));
        assert_eq!(records[0].chunks, Some(12));
        assert!(records[0].uploaded_at.is_some());
        assert_eq!(records[1].id, "hist2");
        assert_eq!(records[1].size, None);
        assert_eq!(records[1].uploaded_at, None);
    }

    #[test]
    fn history_ids_stay_unique() {
        let value = json!([
            { "id": "hist2", "name": "Explicit.pdf" },
            { "name": "NoId.pdf" },
            { "id": "hist2", "name": "Repeat.pdf" },
            { "_id": "hist3", "name": "Later.pdf" },
        ]);

        let records = parse_history(value).unwrap();
        let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["hist2", "hist4", "hist3"]);
        assert_eq!(records[0].file_name, "Explicit.pdf");
        assert_eq!(records[1].file_name, "NoId.pdf");
    }

    #[test]
    fn non_list_payload_is_a_decode_error() {
        let err = parse_history(json!({ "items": [] })).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
