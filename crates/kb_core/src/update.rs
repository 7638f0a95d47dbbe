use crate::{AppState, Effect, ItemId, Msg, UploadStatus};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => {
            if state.request_history() {
                vec![Effect::LoadHistory]
            } else {
                Vec::new()
            }
        }
        Msg::FilesSelected(files) => {
            state.stage_files(files);
            Vec::new()
        }
        Msg::UploadRequested { item_id } => start_uploads(&mut state, vec![item_id]),
        Msg::UploadAllClicked => {
            let pending = state.ids_with_status(UploadStatus::Pending);
            start_uploads(&mut state, pending)
        }
        Msg::RetryFailedClicked => {
            let failed = state.ids_with_status(UploadStatus::Error);
            start_uploads(&mut state, failed)
        }
        Msg::RemoveClicked { item_id } => match state.remove_item(&item_id) {
            Some(removed)
                if matches!(
                    removed.status,
                    UploadStatus::Uploading | UploadStatus::Processing
                ) =>
            {
                vec![Effect::CancelUpload { item_id }]
            }
            _ => Vec::new(),
        },
        Msg::ClearCompletedClicked => {
            state.clear_completed();
            Vec::new()
        }
        Msg::SearchChanged(query) => {
            state.set_search_query(query);
            Vec::new()
        }
        Msg::StatusFilterChanged(filter) => {
            state.set_status_filter(filter);
            Vec::new()
        }
        Msg::ShowAllToggled => {
            state.toggle_show_all();
            Vec::new()
        }
        Msg::HistoryLoaded { records, source } => {
            state.install_history(records, source);
            Vec::new()
        }
        Msg::UploadProgress { item_id, progress } => {
            state.apply_progress(&item_id, progress);
            Vec::new()
        }
        Msg::UploadProcessing { item_id, progress } => {
            state.apply_processing(&item_id, progress);
            Vec::new()
        }
        Msg::UploadCompleted {
            item_id,
            chunks,
            uploaded_at,
            provenance,
        } => {
            state.apply_completed(&item_id, chunks, uploaded_at, provenance);
            Vec::new()
        }
        Msg::UploadFailed { item_id, message } => {
            state.apply_failed(&item_id, message);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_uploads(state: &mut AppState, ids: Vec<ItemId>) -> Vec<Effect> {
    ids.into_iter()
        .filter_map(|item_id| {
            state
                .begin_upload(&item_id)
                .map(|file| Effect::StartUpload { item_id, file })
        })
        .collect()
}
