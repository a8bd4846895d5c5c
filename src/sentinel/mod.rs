pub mod alerts;
pub mod cooldown;

pub use alerts::{AlertLog, AlertQuery};
pub use cooldown::Cooldowns;

use crate::config::rules::save_config;
use crate::config::{Config, DetectionRules, KismetSettings};
use crate::error::{Result, SentinelError};
use crate::events::{Device, KismetAlert};
use crate::kismet::{KismetSource, demo};
use crate::monitoring::automation::{self, SavePlan};
use crate::monitoring::classifier;
use crate::monitoring::scheduler::ScheduleBook;
use crate::storage::history::SaveHistory;
use crate::storage::snapshot;
use crate::storage::watchlist::{WATCHLIST_FILE, Watchlist};
use crate::storage::worker::SaveJob;
use crate::utils::mac::{is_valid_mac, normalize_mac};
use chrono::{DateTime, Local, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use shared::{
    Alert, AlertCategory, AlertSaveEntry, AlertSeverity, AutomationSettings, SaveLogEntry,
    Schedule, Stats, WatchedDevice,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upstream alerts mirrored per poll, newest last.
const MAX_MIRRORED_PER_POLL: usize = 20;

/// Fields accepted by `POST /api/config`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ConfigUpdate {
    pub kismet_url: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Dashboard state shared by the HTTP API, the poller, the scheduler and the
/// save worker.
pub struct Sentinel {
    config_path: PathBuf,
    config: Mutex<Config>,
    save_dir: PathBuf,
    demo_mode: bool,
    rules: DetectionRules,
    kismet_settings: Arc<RwLock<KismetSettings>>,
    source: Box<dyn KismetSource>,
    alerts: Mutex<AlertLog>,
    cooldowns: Mutex<Cooldowns>,
    watchlist: Mutex<Watchlist>,
    automations: RwLock<AutomationSettings>,
    schedules: Mutex<ScheduleBook>,
    history: Mutex<SaveHistory>,
    /// Latest known record per MAC; last poll wins.
    devices: Mutex<HashMap<String, Device>>,
    last_device_poll: Mutex<Option<i64>>,
    kismet_alert_mark: Mutex<f64>,
    save_tx: Sender<SaveJob>,
}

impl Sentinel {
    /// Builds the dashboard state. The returned receiver feeds the save worker.
    pub fn new(
        config: Config,
        config_path: PathBuf,
        source: Box<dyn KismetSource>,
        kismet_settings: Arc<RwLock<KismetSettings>>,
    ) -> (Self, Receiver<SaveJob>) {
        let (save_tx, save_rx) = crossbeam_channel::unbounded();
        let watchlist = Watchlist::load(&config.save_dir.join(WATCHLIST_FILE));
        let schedules = ScheduleBook::restore(config.schedules.clone(), Local::now());

        let sentinel = Self {
            config_path,
            save_dir: config.save_dir.clone(),
            demo_mode: config.demo_mode,
            rules: config.detection.clone(),
            alerts: Mutex::new(AlertLog::new(config.detection.max_alerts)),
            cooldowns: Mutex::new(Cooldowns::new(Duration::from_secs(
                config.detection.realert_cooldown_secs,
            ))),
            automations: RwLock::new(config.automations.clone()),
            kismet_settings,
            source,
            watchlist: Mutex::new(watchlist),
            schedules: Mutex::new(schedules),
            history: Mutex::new(SaveHistory::default()),
            devices: Mutex::new(HashMap::new()),
            last_device_poll: Mutex::new(None),
            kismet_alert_mark: Mutex::new(0.0),
            save_tx,
            config: Mutex::new(config),
        };
        (sentinel, save_rx)
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    // ---- alerts ---------------------------------------------------------

    /// Records an alert and, when it came from a device, runs the
    /// auto-watch and alert-save automations for it.
    pub fn push_alert(&self, mut alert: Alert, device: Option<&Device>) -> Alert {
        alert.id = uuid::Uuid::new_v4().to_string();
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::Error => log::warn!("🚨 ALERT: {}", alert),
            _ => log::info!("ALERT: {}", alert),
        }
        self.alerts.lock().push(alert.clone());

        if let Some(device) = device {
            self.run_automations(&alert, device);
        }
        alert
    }

    fn run_automations(&self, alert: &Alert, device: &Device) {
        let settings = self.automations.read().clone();

        let decision = {
            let mut watchlist = self.watchlist.lock();
            let decision =
                automation::evaluate(alert.category, device, &settings, watchlist.contains(&device.mac));

            if let Some(rule) = decision.watch {
                watchlist.insert(WatchedDevice {
                    mac: device.mac.clone(),
                    name: device.label().to_string(),
                    phyname: device.phyname.clone(),
                    reason: rule.to_string(),
                    added_at: Local::now(),
                    auto: true,
                });
                log::info!(
                    "Auto-watched device: {} ({}), triggered by {} alert",
                    device.label(),
                    device.mac,
                    alert.category
                );
                if let Err(e) = watchlist.persist() {
                    log::warn!("Failed to persist watchlist: {}", e);
                }
            }
            decision
        };

        if let Some(plan) = decision.save {
            self.queue(SaveJob::AlertSnapshot {
                alert: alert.clone(),
                device: Box::new(device.clone()),
                plan,
            });
        }
    }

    pub fn alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        self.alerts.lock().query(query)
    }

    pub fn clear_alerts(&self) {
        self.alerts.lock().clear();
    }

    /// Classifies `devices` and raises an alert per detection outside its
    /// cooldown. Returns the number of alerts raised.
    pub fn analyze_devices(&self, devices: &[Device]) -> usize {
        self.raise_detections(devices, true)
    }

    /// Raises alerts for demo devices without attaching them, so nothing
    /// fake reaches the watchlist or the save directory.
    pub fn seed_demo_alerts(&self, devices: &[Device]) -> usize {
        self.raise_detections(devices, false)
    }

    fn raise_detections(&self, devices: &[Device], automate: bool) -> usize {
        let mut raised = 0;
        for device in devices {
            let key = cooldown_key(device);
            for detection in classifier::classify(device, &self.rules) {
                if !self.cooldowns.lock().allow(&key, detection.rule, Instant::now()) {
                    continue;
                }
                let attached = if automate { Some(device) } else { None };
                self.push_alert(detection.into_alert(&device.mac), attached);
                raised += 1;
            }
        }
        raised
    }

    /// Mirrors upstream alerts newer than the last mirrored one.
    fn mirror_kismet_alerts(&self, mut upstream: Vec<KismetAlert>) -> usize {
        upstream.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let fresh: Vec<KismetAlert> = {
            let mut mark = self.kismet_alert_mark.lock();
            let fresh: Vec<KismetAlert> =
                upstream.into_iter().filter(|a| a.timestamp > *mark).collect();
            if let Some(last) = fresh.last() {
                *mark = last.timestamp;
            }
            fresh
        };

        let start = fresh.len().saturating_sub(MAX_MIRRORED_PER_POLL);
        for upstream_alert in &fresh[start..] {
            let alert = classifier::classify_kismet_alert(upstream_alert);
            let device = self.known_device(&upstream_alert.transmitter_mac);
            self.push_alert(alert, device.as_ref());
        }
        fresh.len() - start
    }

    /// Pulls Kismet's alert feed once; a failure becomes an error alert.
    pub fn poll_kismet_alerts(&self) -> usize {
        match self.source.alerts() {
            Ok(upstream) => self.mirror_kismet_alerts(upstream),
            Err(e) => {
                self.push_alert(
                    Alert::new(
                        AlertCategory::Error,
                        AlertSeverity::Error,
                        "Kismet alert poll failed",
                        &e.to_string(),
                    ),
                    None,
                );
                0
            }
        }
    }

    // ---- devices --------------------------------------------------------

    fn remember(&self, devices: &[Device]) {
        let mut known = self.devices.lock();
        for device in devices.iter().filter(|d| !d.mac.is_empty()) {
            known.insert(normalize_mac(&device.mac), device.clone());
        }
    }

    fn known_device(&self, mac: &str) -> Option<Device> {
        if mac.is_empty() {
            return None;
        }
        self.devices.lock().get(&normalize_mac(mac)).cloned()
    }

    fn fetch_live(&self, since: Option<i64>) -> Result<Vec<Device>> {
        let devices = self.source.devices(since)?;
        self.remember(&devices);
        Ok(devices)
    }

    /// Device list for the dashboard. Live devices are classified; in demo
    /// mode an unreachable Kismet yields the demo set, unclassified.
    pub fn browse_devices(&self, since: Option<i64>) -> Result<Vec<Device>> {
        match self.fetch_live(since) {
            Ok(devices) => {
                self.analyze_devices(&devices);
                Ok(devices)
            }
            Err(e) if self.demo_mode => {
                log::debug!("Kismet unavailable ({}), serving demo devices", e);
                Ok(demo::demo_devices(Utc::now().timestamp()))
            }
            Err(e) => Err(e),
        }
    }

    /// One poller cycle: incremental device fetch, classification, and
    /// upstream alert mirroring. Returns the number of alerts raised.
    pub fn poll_once(&self) -> Result<usize> {
        let started = Utc::now().timestamp();
        let since = *self.last_device_poll.lock();

        let devices = self.fetch_live(since)?;
        *self.last_device_poll.lock() = Some(started);
        let raised = self.analyze_devices(&devices);

        let mirrored = self.mirror_kismet_alerts(self.source.alerts()?);
        Ok(raised + mirrored)
    }

    pub fn status(&self) -> Result<Value> {
        match self.source.status() {
            Ok(status) => Ok(status),
            Err(_) if self.demo_mode => Ok(demo::demo_status()),
            Err(e) => Err(e),
        }
    }

    pub fn ssids(&self) -> Result<Value> {
        self.source.ssids()
    }

    // ---- saves ----------------------------------------------------------

    fn queue(&self, job: SaveJob) {
        if self.save_tx.send(job).is_err() {
            log::warn!("Save worker unavailable, dropping save job");
        }
    }

    pub fn queue_batch_save(&self, label: &str) {
        self.queue(SaveJob::Batch {
            label: label.to_string(),
        });
    }

    pub fn handle_save_job(&self, job: SaveJob) {
        match job {
            SaveJob::Batch { label } => {
                self.run_batch_save(&label);
            }
            SaveJob::AlertSnapshot { alert, device, plan } => {
                self.write_alert_snapshot(&alert, &device, plan);
            }
        }
    }

    /// Fetches every device, classifies it, and writes a batch snapshot.
    /// Demo devices are never saved.
    pub fn run_batch_save(&self, label: &str) -> SaveLogEntry {
        let stamp = snapshot::file_stamp(Local::now());
        let file_name = snapshot::batch_file_name(label, &stamp);
        let target = self.save_dir.join(&file_name);

        let result = self.fetch_live(None).and_then(|devices| {
            self.analyze_devices(&devices);
            let payload = snapshot::batch_payload(&stamp, &devices);
            snapshot::write_json(&self.save_dir, &file_name, &payload).map(|_| devices.len())
        });

        let entry = match result {
            Ok(count) => {
                log::info!("Saved {} devices to {}", count, target.display());
                self.push_alert(
                    Alert::new(
                        AlertCategory::Save,
                        AlertSeverity::Info,
                        &format!("💾 Batch save complete: {} devices", count),
                        &target.display().to_string(),
                    ),
                    None,
                );
                SaveLogEntry {
                    ts: stamp,
                    file: target.display().to_string(),
                    count,
                    ok: true,
                    error: None,
                }
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                self.push_alert(
                    Alert::new(
                        AlertCategory::Error,
                        AlertSeverity::Error,
                        "Batch save failed",
                        &e.to_string(),
                    ),
                    None,
                );
                SaveLogEntry {
                    ts: stamp,
                    file: target.display().to_string(),
                    count: 0,
                    ok: false,
                    error: Some(e.to_string()),
                }
            }
        };

        self.history.lock().record_batch(entry.clone());
        entry
    }

    pub fn write_alert_snapshot(&self, alert: &Alert, device: &Device, plan: SavePlan) -> AlertSaveEntry {
        let stamp = snapshot::file_stamp(Local::now());
        let label = if device.label().is_empty() { "unknown" } else { device.label() };
        let file_name = snapshot::alert_file_name(alert, label, &stamp);
        let payload = snapshot::alert_payload(&stamp, alert, device, plan);

        let (file, ok, error) = match snapshot::write_json(&self.save_dir, &file_name, &payload) {
            Ok(path) => {
                log::info!("Alert save: {}", file_name);
                (path.display().to_string(), true, None)
            }
            Err(e) => {
                log::error!("Alert save failed: {}", e);
                (self.save_dir.join(&file_name).display().to_string(), false, Some(e.to_string()))
            }
        };

        let entry = AlertSaveEntry {
            ts: stamp,
            file,
            alert_type: alert.category,
            device: label.to_string(),
            ok,
            error,
        };
        self.history.lock().record_alert_save(entry.clone());
        entry
    }

    pub fn save_log(&self) -> Vec<SaveLogEntry> {
        self.history.lock().log()
    }

    pub fn alert_saves(&self) -> Vec<AlertSaveEntry> {
        self.history.lock().alert_saves()
    }

    // ---- schedules ------------------------------------------------------

    pub fn schedules(&self) -> Vec<Schedule> {
        self.schedules.lock().list()
    }

    pub fn add_schedule(&self, name: &str, interval_min: u64) -> Result<Schedule> {
        let schedule = self.schedules.lock().add(name, interval_min, Local::now())?;
        log::info!("Added schedule '{}' every {} min", schedule.name, schedule.interval_min);
        self.persist_config();
        Ok(schedule)
    }

    pub fn remove_schedule(&self, id: &str) -> bool {
        let removed = self.schedules.lock().remove(id).is_some();
        if removed {
            self.persist_config();
        }
        removed
    }

    pub fn set_schedule_enabled(&self, id: &str, enabled: bool) -> Result<Schedule> {
        let schedule = self
            .schedules
            .lock()
            .set_enabled(id, enabled, Local::now())
            .ok_or_else(|| SentinelError::NotFound(format!("schedule {}", id)))?;
        self.persist_config();
        Ok(schedule)
    }

    pub fn take_due_schedules(&self, now: DateTime<Local>) -> Vec<Schedule> {
        let due = self.schedules.lock().take_due(now);
        if !due.is_empty() {
            self.persist_config();
        }
        due
    }

    // ---- automations & watchlist ----------------------------------------

    pub fn automations(&self) -> AutomationSettings {
        self.automations.read().clone()
    }

    /// Applies the recognized boolean toggles in `update`; other keys are
    /// ignored.
    pub fn update_automations(&self, update: &Value) -> AutomationSettings {
        let updated = {
            let mut guard = self.automations.write();
            let settings = &mut *guard;
            let toggles: [(&str, &mut bool); 4] = [
                ("alert_save_enabled", &mut settings.alert_save_enabled),
                ("save_device_details", &mut settings.save_device_details),
                ("save_device_traffic", &mut settings.save_device_traffic),
                ("save_watched_only", &mut settings.save_watched_only),
            ];
            for (key, slot) in toggles {
                if let Some(value) = update.get(key) {
                    *slot = truthy(value);
                }
            }

            if let Some(rules) = update.get("auto_watch_rules").filter(|v| v.is_object()) {
                let rule_toggles: [(&str, &mut bool); 3] = [
                    ("drone_alerts", &mut settings.auto_watch_rules.drone_alerts),
                    ("btle_alerts", &mut settings.auto_watch_rules.btle_alerts),
                    ("strong_signal", &mut settings.auto_watch_rules.strong_signal),
                ];
                for (key, slot) in rule_toggles {
                    if let Some(value) = rules.get(key) {
                        *slot = truthy(value);
                    }
                }
            }
            settings.clone()
        };
        self.persist_config();
        updated
    }

    pub fn watched_devices(&self) -> Vec<WatchedDevice> {
        self.watchlist.lock().list()
    }

    /// Manually watches a device. Returns the watchlist size.
    pub fn watch(&self, mac: &str, name: &str, phyname: &str) -> Result<usize> {
        if mac.trim().is_empty() {
            return Err(SentinelError::bad_request("MAC required"));
        }
        if !is_valid_mac(mac) {
            return Err(SentinelError::bad_request(format!("invalid MAC '{}'", mac)));
        }

        let mut watchlist = self.watchlist.lock();
        let size = watchlist.insert(WatchedDevice {
            mac: normalize_mac(mac),
            name: name.to_string(),
            phyname: phyname.to_string(),
            reason: "manual".to_string(),
            added_at: Local::now(),
            auto: false,
        });
        watchlist.persist()?;
        Ok(size)
    }

    /// Removes a device from the watchlist. Returns the watchlist size.
    pub fn unwatch(&self, mac: &str) -> Result<usize> {
        let mut watchlist = self.watchlist.lock();
        if watchlist.remove(mac).is_some() {
            watchlist.persist()?;
        }
        Ok(watchlist.len())
    }

    // ---- config & stats -------------------------------------------------

    /// Connection settings as exposed to the browser; secrets are masked.
    pub fn public_config(&self) -> Value {
        let settings = self.kismet_settings.read();
        let api_key = if settings.api_key.is_empty() { "" } else { "***" };
        json!({
            "kismet_url": settings.url,
            "api_key": api_key,
            "username": settings.username,
        })
    }

    pub fn update_config(&self, update: ConfigUpdate) {
        {
            let mut settings = self.kismet_settings.write();
            if let Some(url) = update.kismet_url {
                settings.url = url.trim_end_matches('/').to_string();
            }
            if let Some(key) = update.api_key {
                settings.api_key = key;
            }
            if let Some(user) = update.username {
                settings.username = user;
            }
            if let Some(pass) = update.password {
                settings.password = pass;
            }
            log::info!("Kismet connection set to {}", settings.url);
        }
        self.persist_config();
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();
        self.alerts.lock().count_into(&mut stats);
        stats.watched = self.watchlist.lock().len();
        stats.schedules = self.schedules.lock().len();
        let history = self.history.lock();
        stats.last_save = history.last_save().map(str::to_string);
        stats.last_error = history.last_error().map(str::to_string);
        stats
    }

    fn persist_config(&self) {
        let mut config = self.config.lock();
        config.kismet = self.kismet_settings.read().clone();
        config.automations = self.automations.read().clone();
        config.schedules = self.schedules.lock().list();
        if let Err(e) = save_config(&self.config_path, &config) {
            log::warn!("Failed to persist config to {}: {}", self.config_path.display(), e);
        }
    }
}

/// Cooldowns are per device: the normalized MAC, or the label when Kismet
/// reported no address.
fn cooldown_key(device: &Device) -> String {
    if device.mac.is_empty() {
        device.label().to_string()
    } else {
        normalize_mac(&device.mac)
    }
}

/// Loose truthiness for toggles posted by the browser.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
