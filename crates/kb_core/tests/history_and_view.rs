use chrono::{TimeZone, Utc};
use kb_core::{
    compute_stats, filter_items, update, AppState, Effect, FileRef, HistoryRecord, HistorySource,
    ItemId, Msg, Provenance, StatusFilter, UploadStatus, COLLAPSED_ROW_LIMIT, PDF_MEDIA_TYPE,
    PROCESSING_PROGRESS,
};
use pretty_assertions::assert_eq;

fn record(id: &str, name: &str, size: u64, chunks: u32) -> HistoryRecord {
    HistoryRecord {
        id: id.to_string(),
        file_name: name.to_string(),
        size: Some(size),
        chunks: Some(chunks),
        uploaded_at: Some(Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap()),
    }
}

fn with_history(state: AppState, source: HistorySource) -> AppState {
    let (state, _) = update(
        state,
        Msg::HistoryLoaded {
            records: vec![
                record("hist1", "T24 Teller.pdf", 2_048_000, 45),
                record("hist2", "T24 Money Market.pdf", 1_024_000, 23),
            ],
            source,
        },
    );
    state
}

fn with_local(names: &[&str]) -> AppState {
    let files = names
        .iter()
        .map(|name| FileRef::new(*name, PDF_MEDIA_TYPE, vec![0u8; 100]))
        .collect();
    update(AppState::new(), Msg::FilesSelected(files)).0
}

#[test]
fn started_requests_history_once() {
    let (state, effects) = update(AppState::new(), Msg::Started);
    assert_eq!(effects, vec![Effect::LoadHistory]);

    let (_state, effects) = update(state, Msg::Started);
    assert!(effects.is_empty());
}

#[test]
fn history_items_are_completed_and_immutable() {
    let state = with_history(AppState::new(), HistorySource::Backend);
    let id = ItemId::History("hist1".to_string());

    let item = state.item(&id).expect("history item");
    assert_eq!(item.status, UploadStatus::Completed);
    assert_eq!(item.progress, 100.0);
    assert_eq!(item.provenance, Some(Provenance::Backend));

    let before = state.clone();
    let (state, effects) = update(state, Msg::RemoveClicked { item_id: id.clone() });
    assert!(effects.is_empty());
    let (state, _) = update(
        state,
        Msg::UploadFailed {
            item_id: id.clone(),
            message: "nope".into(),
        },
    );
    let (state, effects) = update(state, Msg::UploadRequested { item_id: id });
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn history_is_installed_only_once() {
    let state = with_history(AppState::new(), HistorySource::Fallback);
    let (state, _) = update(
        state,
        Msg::HistoryLoaded {
            records: vec![record("other", "Other.pdf", 1, 1)],
            source: HistorySource::Backend,
        },
    );

    assert_eq!(state.history().len(), 2);
    assert_eq!(state.history_source(), Some(HistorySource::Fallback));
    assert!(state
        .history()
        .iter()
        .all(|item| item.provenance == Some(Provenance::Simulated)));
}

#[test]
fn stats_cover_union_of_in_flight_and_history() {
    let state = with_history(with_local(&["a.pdf", "b.pdf"]), HistorySource::Backend);
    let (state, _) = update(state, Msg::UploadAllClicked);
    let (state, _) = update(
        state,
        Msg::UploadFailed {
            item_id: ItemId::Local(1),
            message: "Upload failed".into(),
        },
    );

    let stats = state.view().stats;
    assert_eq!(stats.total_files, 4);
    assert_eq!(stats.total_size, 100 + 100 + 2_048_000 + 1_024_000);
    assert_eq!(stats.successful_uploads, 2);
    assert_eq!(stats.failed_uploads, 1);
    assert_eq!(stats.total_chunks, 45 + 23);
    assert!(stats.successful_uploads + stats.failed_uploads < stats.total_files);
}

#[test]
fn settled_counts_equal_total_only_when_nothing_in_flight() {
    let state = with_local(&["a.pdf", "b.pdf"]);
    let (state, _) = update(state, Msg::UploadAllClicked);
    let (state, _) = update(
        state,
        Msg::UploadFailed {
            item_id: ItemId::Local(1),
            message: "x".into(),
        },
    );
    let stats = compute_stats(state.all_items());
    assert!(stats.successful_uploads + stats.failed_uploads < stats.total_files);
    assert!(state.has_unsettled_items());

    let (state, _) = update(
        state,
        Msg::UploadProcessing {
            item_id: ItemId::Local(2),
            progress: PROCESSING_PROGRESS,
        },
    );
    let (state, _) = update(
        state,
        Msg::UploadCompleted {
            item_id: ItemId::Local(2),
            chunks: 11,
            uploaded_at: Utc::now(),
            provenance: Provenance::Simulated,
        },
    );
    let stats = compute_stats(state.all_items());
    assert_eq!(stats.successful_uploads + stats.failed_uploads, stats.total_files);
    assert!(!state.has_unsettled_items());
}

#[test]
fn explicit_size_wins_over_payload() {
    let state = with_history(AppState::new(), HistorySource::Fallback);
    let item = &state.history()[0];
    assert_eq!(item.file.size(), 0);
    assert_eq!(item.byte_size(), 2_048_000);
}

#[test]
fn filter_matches_name_case_insensitively_and_status() {
    let state = with_history(with_local(&["Loans Guide.pdf", "deposits.pdf"]), HistorySource::Backend);

    let by_name: Vec<_> = filter_items(state.all_items(), "t24", StatusFilter::All)
        .into_iter()
        .map(|item| item.display_name())
        .collect();
    assert_eq!(by_name, vec!["T24 Teller.pdf", "T24 Money Market.pdf"]);

    let pending: Vec<_> = filter_items(
        state.all_items(),
        "",
        StatusFilter::Only(UploadStatus::Pending),
    )
    .into_iter()
    .map(|item| item.display_name())
    .collect();
    assert_eq!(pending, vec!["Loans Guide.pdf", "deposits.pdf"]);

    let none = filter_items(
        state.all_items(),
        "loans",
        StatusFilter::Only(UploadStatus::Completed),
    );
    assert!(none.is_empty());
}

#[test]
fn filtering_is_deterministic() {
    let state = with_history(with_local(&["b.pdf", "a.pdf"]), HistorySource::Backend);
    let first: Vec<_> = filter_items(state.all_items(), ".PDF", StatusFilter::All)
        .into_iter()
        .map(|item| item.id.clone())
        .collect();
    let second: Vec<_> = filter_items(state.all_items(), ".PDF", StatusFilter::All)
        .into_iter()
        .map(|item| item.id.clone())
        .collect();
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            ItemId::Local(1),
            ItemId::Local(2),
            ItemId::History("hist1".into()),
            ItemId::History("hist2".into()),
        ]
    );
}

#[test]
fn view_collapses_to_prefix_until_expanded() {
    let state = with_history(with_local(&["a.pdf", "b.pdf"]), HistorySource::Backend);

    let view = state.view();
    assert_eq!(view.rows.len(), COLLAPSED_ROW_LIMIT);
    assert_eq!(view.matching_count, 4);
    assert!(view.is_truncated());

    let (state, _) = update(state, Msg::ShowAllToggled);
    let view = state.view();
    assert_eq!(view.rows.len(), 4);
    assert!(!view.is_truncated());
    // The display limit never changes the aggregates.
    assert_eq!(view.stats.total_files, 4);
}

#[test]
fn search_and_status_filter_flow_through_messages() {
    let state = with_history(with_local(&["a.pdf"]), HistorySource::Backend);
    let (state, _) = update(state, Msg::ShowAllToggled);
    let (state, _) = update(state, Msg::SearchChanged("money".into()));
    let view = state.view();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].name, "T24 Money Market.pdf");
    assert_eq!(view.rows[0].size_label, "1000 KB");

    let (state, _) = update(state, Msg::SearchChanged(String::new()));
    let (state, _) = update(
        state,
        Msg::StatusFilterChanged(StatusFilter::Only(UploadStatus::Pending)),
    );
    let view = state.view();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].item_id, ItemId::Local(1));
    assert_eq!(view.unsettled_count, 1);
}

#[test]
fn status_filter_parses_from_text() {
    assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
    assert_eq!(
        "Completed".parse::<StatusFilter>(),
        Ok(StatusFilter::Only(UploadStatus::Completed))
    );
    assert!("done".parse::<StatusFilter>().is_err());
}
