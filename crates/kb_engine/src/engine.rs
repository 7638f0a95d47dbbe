use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use kb_core::{FileRef, ItemId};
use kb_logging::{kb_debug, kb_info};
use tokio::task::AbortHandle;

use crate::client::BackendClient;
use crate::history::load_history;
use crate::settings::{EngineConfig, UploadSettings};
use crate::types::{EngineError, EngineEvent};
use crate::upload::{run_upload, ChannelProgressSink, ProgressSink, ReqwestUploader, Uploader};

enum EngineCommand {
    Upload { item_id: ItemId, file: FileRef },
    Cancel { item_id: ItemId },
    LoadHistory,
}

/// Owns the async runtime that executes effects; results come back as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = BackendClient::new(config.api)?;
        let uploader = Arc::new(ReqwestUploader::new(client.clone()));
        Self::spawn(client, uploader, config.upload)
    }

    /// Starts the engine with a caller-supplied uploader.
    pub fn spawn(
        client: BackendClient,
        uploader: Arc<dyn Uploader>,
        settings: UploadSettings,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("kb-engine")
            .build()
            .map_err(EngineError::Runtime)?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let sink: Arc<dyn ProgressSink> = Arc::new(ChannelProgressSink::new(event_tx));
            let mut attempts: HashMap<ItemId, AbortHandle> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                attempts.retain(|_, handle| !handle.is_finished());
                match command {
                    EngineCommand::Upload { item_id, file } => {
                        let uploader = uploader.clone();
                        let settings = settings.clone();
                        let sink = sink.clone();
                        let id = item_id.clone();
                        let task = runtime.spawn(async move {
                            run_upload(id, file, uploader.as_ref(), &settings, sink).await;
                        });
                        if let Some(previous) = attempts.insert(item_id, task.abort_handle()) {
                            previous.abort();
                        }
                    }
                    EngineCommand::Cancel { item_id } => {
                        if let Some(handle) = attempts.remove(&item_id) {
                            kb_info!("Cancelling upload attempt for {}", item_id);
                            handle.abort();
                        }
                    }
                    EngineCommand::LoadHistory => {
                        let client = client.clone();
                        let sink = sink.clone();
                        runtime.spawn(async move {
                            let (records, source) = load_history(&client).await;
                            sink.emit(EngineEvent::HistoryLoaded { records, source });
                        });
                    }
                }
            }
            kb_debug!("Engine command channel closed; shutting down runtime");
            runtime.shutdown_background();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start_upload(&self, item_id: ItemId, file: FileRef) {
        let _ = self.cmd_tx.send(EngineCommand::Upload { item_id, file });
    }

    pub fn cancel_upload(&self, item_id: ItemId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { item_id });
    }

    pub fn load_history(&self) {
        let _ = self.cmd_tx.send(EngineCommand::LoadHistory);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
