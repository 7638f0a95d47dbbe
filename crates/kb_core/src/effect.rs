use crate::{FileRef, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadHistory,
    StartUpload { item_id: ItemId, file: FileRef },
    CancelUpload { item_id: ItemId },
}
