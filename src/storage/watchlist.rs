use crate::error::Result;
use crate::utils::mac::normalize_mac;
use shared::WatchedDevice;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const WATCHLIST_FILE: &str = "watchlist.json";

/// Watched devices keyed by upper-case MAC, optionally backed by a JSON file.
#[derive(Debug, Default)]
pub struct Watchlist {
    entries: HashMap<String, WatchedDevice>,
    path: Option<PathBuf>,
}

impl Watchlist {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the list from `path`. A missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let mut list = Self {
            entries: HashMap::new(),
            path: Some(path.to_path_buf()),
        };

        if !path.exists() {
            return list;
        }

        match fs::read_to_string(path)
            .map_err(crate::error::SentinelError::from)
            .and_then(|c| serde_json::from_str::<Vec<WatchedDevice>>(&c).map_err(Into::into))
        {
            Ok(devices) => {
                for mut device in devices {
                    device.mac = normalize_mac(&device.mac);
                    list.entries.insert(device.mac.clone(), device);
                }
                log::info!("Loaded {} watched devices from {}", list.len(), path.display());
            }
            Err(e) => log::warn!("Failed to load watchlist {}: {}", path.display(), e),
        }
        list
    }

    pub fn contains(&self, mac: &str) -> bool {
        self.entries.contains_key(&normalize_mac(mac))
    }

    /// Adds or replaces an entry. Returns the resulting list size.
    pub fn insert(&mut self, mut device: WatchedDevice) -> usize {
        device.mac = normalize_mac(&device.mac);
        self.entries.insert(device.mac.clone(), device);
        self.entries.len()
    }

    pub fn remove(&mut self, mac: &str) -> Option<WatchedDevice> {
        self.entries.remove(&normalize_mac(mac))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were added.
    pub fn list(&self) -> Vec<WatchedDevice> {
        let mut devices: Vec<WatchedDevice> = self.entries.values().cloned().collect();
        devices.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.mac.cmp(&b.mac)));
        devices
    }

    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.list())?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn entry(mac: &str, offset_secs: i64) -> WatchedDevice {
        WatchedDevice {
            mac: mac.to_string(),
            name: String::new(),
            phyname: String::new(),
            reason: "manual".to_string(),
            added_at: Local::now() + Duration::seconds(offset_secs),
            auto: false,
        }
    }

    #[test]
    fn lookups_ignore_case() {
        let mut list = Watchlist::in_memory();
        assert_eq!(list.insert(entry("aa:bb:cc:11:22:33", 0)), 1);
        assert!(list.contains("AA:BB:CC:11:22:33"));
        assert!(list.remove("Aa:Bb:Cc:11:22:33").is_some());
        assert!(list.is_empty());
    }

    #[test]
    fn list_is_in_insertion_order() {
        let mut list = Watchlist::in_memory();
        list.insert(entry("FF:00:00:00:00:01", 10));
        list.insert(entry("00:00:00:00:00:02", 20));
        list.insert(entry("88:00:00:00:00:03", 0));
        let macs: Vec<String> = list.list().into_iter().map(|d| d.mac).collect();
        assert_eq!(
            macs,
            vec!["88:00:00:00:00:03", "FF:00:00:00:00:01", "00:00:00:00:00:02"]
        );
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WATCHLIST_FILE);

        let mut list = Watchlist::load(&path);
        assert!(list.is_empty());
        list.insert(entry("aa:bb:cc:11:22:33", 0));
        list.persist().unwrap();

        let reloaded = Watchlist::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("AA:BB:CC:11:22:33"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WATCHLIST_FILE);
        fs::write(&path, "[{").unwrap();
        assert!(Watchlist::load(&path).is_empty());
    }
}
