use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Drone,
    Signal,
    Kismet,
    Save,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    Error,
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 5] = [
        AlertCategory::Drone,
        AlertCategory::Signal,
        AlertCategory::Kismet,
        AlertCategory::Save,
        AlertCategory::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Drone => "drone",
            AlertCategory::Signal => "signal",
            AlertCategory::Kismet => "kismet",
            AlertCategory::Save => "save",
            AlertCategory::Error => "error",
        }
    }
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 4] = [
        AlertSeverity::Info,
        AlertSeverity::Warning,
        AlertSeverity::Critical,
        AlertSeverity::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
            AlertSeverity::Error => "error",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for AlertCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for AlertSeverity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertSeverity::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// A dashboard alert. `mac` links the alert to the device that raised it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub ts: DateTime<Local>,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl Alert {
    pub fn new(category: AlertCategory, severity: AlertSeverity, title: &str, body: &str) -> Self {
        Self {
            id: String::new(),
            ts: Local::now(),
            category,
            severity,
            title: title.to_string(),
            body: body.to_string(),
            mac: None,
        }
    }

    pub fn with_mac(mut self, mac: &str) -> Self {
        if !mac.is_empty() {
            self.mac = Some(mac.to_string());
        }
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {} - {}",
            self.category, self.severity, self.title, self.body
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedDevice {
    pub mac: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phyname: String,
    /// `manual` or the name of the auto-watch rule that added the device.
    #[serde(default = "manual_reason")]
    pub reason: String,
    pub added_at: DateTime<Local>,
    #[serde(default)]
    pub auto: bool,
}

fn manual_reason() -> String {
    "manual".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutoWatchRules {
    pub drone_alerts: bool,
    pub btle_alerts: bool,
    pub strong_signal: bool,
}

impl Default for AutoWatchRules {
    fn default() -> Self {
        Self {
            drone_alerts: true,
            btle_alerts: true,
            strong_signal: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutomationSettings {
    pub alert_save_enabled: bool,
    pub save_device_details: bool,
    pub save_device_traffic: bool,
    pub save_watched_only: bool,
    pub auto_watch_rules: AutoWatchRules,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            alert_save_enabled: true,
            save_device_details: true,
            save_device_traffic: true,
            save_watched_only: false,
            auto_watch_rules: AutoWatchRules::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    pub interval_min: u64,
    pub enabled: bool,
    pub created: DateTime<Local>,
    #[serde(default)]
    pub last_run: Option<DateTime<Local>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Local>>,
}

/// Entry of the batch save log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveLogEntry {
    pub ts: String,
    pub file: String,
    pub count: usize,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Entry of the alert-triggered snapshot log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSaveEntry {
    pub ts: String,
    pub file: String,
    pub alert_type: AlertCategory,
    pub device: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_alerts: usize,
    pub by_category: std::collections::BTreeMap<String, usize>,
    pub by_severity: std::collections::BTreeMap<String, usize>,
    pub watched: usize,
    pub schedules: usize,
    pub last_save: Option<String>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_serializes_category_as_type() {
        let alert = Alert::new(AlertCategory::Drone, AlertSeverity::Critical, "t", "b")
            .with_mac("60:60:1F:AA:BB:CC");
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["type"], "drone");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["mac"], "60:60:1F:AA:BB:CC");
    }

    #[test]
    fn empty_mac_is_not_attached() {
        let alert = Alert::new(AlertCategory::Save, AlertSeverity::Info, "t", "b").with_mac("");
        assert!(alert.mac.is_none());
        let value = serde_json::to_value(&alert).unwrap();
        assert!(value.get("mac").is_none());
    }

    #[test]
    fn parse_category_and_severity_case_insensitively() {
        assert_eq!("SIGNAL".parse::<AlertCategory>(), Ok(AlertCategory::Signal));
        assert_eq!(" warning ".parse::<AlertSeverity>(), Ok(AlertSeverity::Warning));
        assert!("bogus".parse::<AlertCategory>().is_err());
    }

    #[test]
    fn partial_automation_settings_fill_defaults() {
        let settings: AutomationSettings =
            serde_json::from_str(r#"{"save_watched_only": true, "auto_watch_rules": {"strong_signal": true}}"#)
                .unwrap();
        assert!(settings.save_watched_only);
        assert!(settings.alert_save_enabled);
        assert!(settings.auto_watch_rules.drone_alerts);
        assert!(settings.auto_watch_rules.strong_signal);
    }
}
