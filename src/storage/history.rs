use shared::{AlertSaveEntry, SaveLogEntry};
use std::collections::VecDeque;

pub const MAX_SAVE_LOG: usize = 50;
pub const MAX_ALERT_SAVES: usize = 100;

/// Newest-first records of batch saves and alert snapshots.
#[derive(Debug, Default)]
pub struct SaveHistory {
    log: VecDeque<SaveLogEntry>,
    alert_saves: VecDeque<AlertSaveEntry>,
    last_save: Option<String>,
    last_error: Option<String>,
}

impl SaveHistory {
    pub fn record_batch(&mut self, entry: SaveLogEntry) {
        if entry.ok {
            self.last_save = Some(entry.ts.clone());
        } else {
            self.last_error = entry.error.clone();
        }
        self.log.push_front(entry);
        self.log.truncate(MAX_SAVE_LOG);
    }

    pub fn record_alert_save(&mut self, entry: AlertSaveEntry) {
        self.alert_saves.push_front(entry);
        self.alert_saves.truncate(MAX_ALERT_SAVES);
    }

    pub fn log(&self) -> Vec<SaveLogEntry> {
        self.log.iter().cloned().collect()
    }

    pub fn alert_saves(&self) -> Vec<AlertSaveEntry> {
        self.alert_saves.iter().cloned().collect()
    }

    pub fn last_save(&self) -> Option<&str> {
        self.last_save.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
