use std::time::Duration;

use kb_core::{Effect, Msg};
use kb_engine::{EngineEvent, EngineHandle};
use kb_logging::{kb_info, kb_warn};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LoadHistory => {
                    kb_info!("LoadHistory");
                    self.engine.load_history();
                }
                Effect::StartUpload { item_id, file } => {
                    kb_info!(
                        "StartUpload item_id={} name={} bytes={}",
                        item_id,
                        file.name,
                        file.size()
                    );
                    self.engine.start_upload(item_id, file);
                }
                Effect::CancelUpload { item_id } => {
                    kb_info!("CancelUpload item_id={}", item_id);
                    self.engine.cancel_upload(item_id);
                }
            }
        }
    }

    /// Next engine event as a message, waiting at most `timeout`.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress { item_id, progress } => Msg::UploadProgress { item_id, progress },
        EngineEvent::Processing { item_id, progress } => {
            Msg::UploadProcessing { item_id, progress }
        }
        EngineEvent::Completed {
            item_id,
            chunks,
            uploaded_at,
            provenance,
        } => Msg::UploadCompleted {
            item_id,
            chunks,
            uploaded_at,
            provenance,
        },
        EngineEvent::Failed { item_id, message } => {
            kb_warn!("Upload {} failed: {}", item_id, message);
            Msg::UploadFailed { item_id, message }
        }
        EngineEvent::HistoryLoaded { records, source } => {
            kb_info!("History loaded: {} records from {:?}", records.len(), source);
            Msg::HistoryLoaded { records, source }
        }
    }
}
