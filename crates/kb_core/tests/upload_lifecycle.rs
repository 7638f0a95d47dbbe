use chrono::{TimeZone, Utc};
use kb_core::{
    update, AppState, Effect, FileRef, ItemId, Msg, Provenance, UploadStatus, PDF_MEDIA_TYPE,
    PROCESSING_PROGRESS,
};
use pretty_assertions::assert_eq;

fn pdf(name: &str) -> FileRef {
    FileRef::new(name, PDF_MEDIA_TYPE, b"%PDF-1.7".to_vec())
}

fn staged(names: &[&str]) -> AppState {
    let files = names.iter().map(|name| pdf(name)).collect();
    let (state, _) = update(AppState::new(), Msg::FilesSelected(files));
    state
}

fn status_of(state: &AppState, id: u64) -> UploadStatus {
    state.item(&ItemId::Local(id)).expect("item exists").status
}

fn processing(id: u64) -> Msg {
    Msg::UploadProcessing {
        item_id: ItemId::Local(id),
        progress: PROCESSING_PROGRESS,
    }
}

fn completed(id: u64, chunks: u32) -> Msg {
    Msg::UploadCompleted {
        item_id: ItemId::Local(id),
        chunks,
        uploaded_at: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        provenance: Provenance::Backend,
    }
}

fn failed(id: u64, message: &str) -> Msg {
    Msg::UploadFailed {
        item_id: ItemId::Local(id),
        message: message.to_string(),
    }
}

#[test]
fn single_upload_walks_the_happy_path() {
    let state = staged(&["a.pdf"]);

    let (state, effects) = update(
        state,
        Msg::UploadRequested {
            item_id: ItemId::Local(1),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartUpload {
            item_id: ItemId::Local(1),
            file: pdf("a.pdf"),
        }]
    );
    assert_eq!(status_of(&state, 1), UploadStatus::Uploading);

    let (state, _) = update(
        state,
        Msg::UploadProgress {
            item_id: ItemId::Local(1),
            progress: 42.0,
        },
    );
    assert_eq!(state.item(&ItemId::Local(1)).unwrap().progress, 42.0);

    let (state, _) = update(state, processing(1));
    assert_eq!(status_of(&state, 1), UploadStatus::Processing);
    assert_eq!(
        state.item(&ItemId::Local(1)).unwrap().progress,
        PROCESSING_PROGRESS
    );

    let (state, _) = update(state, completed(1, 17));
    let item = state.item(&ItemId::Local(1)).unwrap();
    assert_eq!(item.status, UploadStatus::Completed);
    assert_eq!(item.progress, 100.0);
    assert_eq!(item.chunks, Some(17));
    assert!(item.uploaded_at.is_some());
    assert_eq!(item.provenance, Some(Provenance::Backend));
}

#[test]
fn progress_never_moves_backwards_or_reaches_complete() {
    let (state, _) = update(
        staged(&["a.pdf"]),
        Msg::UploadRequested {
            item_id: ItemId::Local(1),
        },
    );
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            item_id: ItemId::Local(1),
            progress: 60.0,
        },
    );
    let (state, _) = update(
        state,
        Msg::UploadProgress {
            item_id: ItemId::Local(1),
            progress: 30.0,
        },
    );
    assert_eq!(state.item(&ItemId::Local(1)).unwrap().progress, 60.0);

    let (state, _) = update(
        state,
        Msg::UploadProgress {
            item_id: ItemId::Local(1),
            progress: 250.0,
        },
    );
    let progress = state.item(&ItemId::Local(1)).unwrap().progress;
    assert!(progress < 100.0, "progress {progress} must stay below 100");
}

#[test]
fn out_of_order_events_are_ignored() {
    let state = staged(&["a.pdf"]);

    // Completion straight from pending is not an edge.
    let (state, _) = update(state, completed(1, 3));
    assert_eq!(status_of(&state, 1), UploadStatus::Pending);

    // Processing from pending is not an edge either.
    let (state, _) = update(state, processing(1));
    assert_eq!(status_of(&state, 1), UploadStatus::Pending);

    // Failure needs an attempt in flight.
    let (state, _) = update(state, failed(1, "boom"));
    assert_eq!(status_of(&state, 1), UploadStatus::Pending);

    // Completion directly from uploading skips processing.
    let (state, _) = update(
        state,
        Msg::UploadRequested {
            item_id: ItemId::Local(1),
        },
    );
    let (state, _) = update(state, completed(1, 3));
    assert_eq!(status_of(&state, 1), UploadStatus::Uploading);
}

#[test]
fn completed_items_cannot_be_restarted() {
    let (state, _) = update(
        staged(&["a.pdf"]),
        Msg::UploadRequested {
            item_id: ItemId::Local(1),
        },
    );
    let (state, _) = update(state, processing(1));
    let (state, _) = update(state, completed(1, 5));

    let (state, effects) = update(
        state,
        Msg::UploadRequested {
            item_id: ItemId::Local(1),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(status_of(&state, 1), UploadStatus::Completed);

    let (state, _) = update(state, failed(1, "late failure"));
    assert_eq!(status_of(&state, 1), UploadStatus::Completed);
}

#[test]
fn upload_all_starts_only_pending_items() {
    let state = staged(&["a.pdf", "b.pdf", "c.pdf"]);
    let (state, _) = update(
        state,
        Msg::UploadRequested {
            item_id: ItemId::Local(2),
        },
    );

    let (state, effects) = update(state, Msg::UploadAllClicked);

    let started: Vec<_> = effects
        .iter()
        .map(|effect| match effect {
            Effect::StartUpload { item_id, .. } => item_id.clone(),
            other => panic!("unexpected effect {other:?}"),
        })
        .collect();
    assert_eq!(started, vec![ItemId::Local(1), ItemId::Local(3)]);
    for id in 1..=3 {
        assert_eq!(status_of(&state, id), UploadStatus::Uploading);
    }
}

#[test]
fn error_carries_message_and_retry_reenters_uploading() {
    let (state, _) = update(staged(&["a.pdf", "b.pdf"]), Msg::UploadAllClicked);
    let (state, _) = update(state, failed(1, "Internal Server Error"));
    let (state, _) = update(state, processing(2));
    let (state, _) = update(state, completed(2, 9));

    let item = state.item(&ItemId::Local(1)).unwrap();
    assert_eq!(item.status, UploadStatus::Error);
    assert_eq!(item.error.as_deref(), Some("Internal Server Error"));
    assert!(item.chunks.is_none());
    assert!(item.uploaded_at.is_none());

    let (state, effects) = update(state, Msg::RetryFailedClicked);
    assert_eq!(effects.len(), 1);
    let item = state.item(&ItemId::Local(1)).unwrap();
    assert_eq!(item.status, UploadStatus::Uploading);
    assert_eq!(item.progress, 0.0);
    assert!(item.error.is_none());
    assert_eq!(status_of(&state, 2), UploadStatus::Completed);
}

#[test]
fn retry_failed_without_failures_is_noop() {
    let (state, _) = update(staged(&["a.pdf"]), Msg::UploadAllClicked);
    let mut before = state.clone();
    before.consume_dirty();

    let (mut next, effects) = update(before.clone(), Msg::RetryFailedClicked);

    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
    assert_eq!(next, before);
}

#[test]
fn removing_an_active_upload_cancels_it_and_drops_stale_events() {
    let (state, _) = update(staged(&["a.pdf", "b.pdf"]), Msg::UploadAllClicked);

    let (state, effects) = update(
        state,
        Msg::RemoveClicked {
            item_id: ItemId::Local(1),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::CancelUpload {
            item_id: ItemId::Local(1)
        }]
    );
    assert!(state.item(&ItemId::Local(1)).is_none());

    let before = state.clone();
    let (state, _) = update(state, processing(1));
    let (state, _) = update(state, completed(1, 4));
    assert_eq!(state, before);
}

#[test]
fn removing_a_pending_item_emits_nothing() {
    let (state, effects) = update(
        staged(&["a.pdf"]),
        Msg::RemoveClicked {
            item_id: ItemId::Local(1),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.in_flight().count(), 0);
}

#[test]
fn clear_completed_keeps_everything_else() {
    let (state, _) = update(staged(&["a.pdf", "b.pdf", "c.pdf"]), Msg::UploadAllClicked);
    let (state, _) = update(state, processing(1));
    let (state, _) = update(state, completed(1, 2));
    let (state, _) = update(state, failed(2, "nope"));

    let (state, effects) = update(state, Msg::ClearCompletedClicked);

    assert!(effects.is_empty());
    let remaining: Vec<_> = state
        .in_flight()
        .map(|item| (item.id.clone(), item.status))
        .collect();
    assert_eq!(
        remaining,
        vec![
            (ItemId::Local(2), UploadStatus::Error),
            (ItemId::Local(3), UploadStatus::Uploading),
        ]
    );
}

#[test]
fn transitions_follow_lifecycle_edges() {
    use UploadStatus::*;
    assert!(Pending.can_transition_to(Uploading));
    assert!(Error.can_transition_to(Uploading));
    assert!(Uploading.can_transition_to(Processing));
    assert!(Uploading.can_transition_to(Error));
    assert!(Processing.can_transition_to(Completed));
    assert!(Processing.can_transition_to(Error));

    assert!(!Pending.can_transition_to(Completed));
    assert!(!Pending.can_transition_to(Error));
    assert!(!Completed.can_transition_to(Uploading));
    assert!(!Completed.can_transition_to(Error));
    assert!(!Uploading.can_transition_to(Completed));
}
