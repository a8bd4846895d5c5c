use crate::error::Result;
use serde::{Deserialize, Serialize};
use shared::{AutomationSettings, Schedule};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "sentinel.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kismet: KismetSettings,
    pub server: ServerSettings,
    pub save_dir: PathBuf,
    pub poll_interval_secs: u64,
    pub demo_mode: bool,
    pub detection: DetectionRules,
    pub automations: AutomationSettings,
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KismetSettings {
    pub url: String,
    pub api_key: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    pub drone_keywords: Vec<String>,
    pub uav_phy: String,
    /// Signals strictly above this many dBm count as strong.
    pub strong_signal_dbm: i32,
    pub realert_cooldown_secs: u64,
    pub max_alerts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kismet: KismetSettings::default(),
            server: ServerSettings::default(),
            save_dir: PathBuf::from("./kismet_saves"),
            poll_interval_secs: 10,
            demo_mode: true,
            detection: DetectionRules::default(),
            automations: AutomationSettings::default(),
            schedules: Vec::new(),
        }
    }
}

impl Default for KismetSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:2501".to_string(),
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            drone_keywords: [
                "dji", "parrot", "yuneec", "autel", "skydio", "bebop", "phantom", "mavic",
                "inspire", "matrice", "tello", "fpv", "drone", "uav", "ardupilot", "pixhawk",
                "droneid",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            uav_phy: "UAV".to_string(),
            strong_signal_dbm: -60,
            realert_cooldown_secs: 300,
            max_alerts: 500,
        }
    }
}

impl Config {
    /// Overlay `KISMET_*` environment variables on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KISMET_URL") {
            self.kismet.url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("KISMET_API_KEY") {
            self.kismet.api_key = key;
        }
        if let Some(user) = lookup("KISMET_USER") {
            self.kismet.username = user;
        }
        if let Some(pass) = lookup("KISMET_PASS") {
            self.kismet.password = pass;
        }
        if let Some(dir) = lookup("KISMET_SAVE_DIR") {
            self.save_dir = PathBuf::from(dir);
        }
        if let Some(demo) = lookup("KISMET_DEMO") {
            self.demo_mode = demo.trim() == "1";
        }
    }
}

pub fn load_config(config_path: &Path) -> Config {
    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}. Using defaults.", e);
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file: {}. Using defaults.", e);
            }
        }
    }

    log::info!("Using default configuration");
    Config::default()
}

pub fn save_config(config_path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content)?;
    Ok(())
}
