use super::KismetSource;
use crate::config::KismetSettings;
use crate::error::{Result, SentinelError};
use crate::events::{Device, KismetAlert};
use parking_lot::RwLock;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const ALL_DEVICES: &str = "/devices/all_devices.ekjson";
const SSIDS: &str = "/phy/phy80211/ssids/views/ssids.json";
const ALL_ALERTS: &str = "/alerts/all_alerts.json";
const STATUS: &str = "/system/status.json";

/// Blocking HTTP client for the Kismet REST API.
///
/// Connection settings are read on every request so changes made through
/// the dashboard apply to the next poll.
pub struct KismetClient {
    settings: Arc<RwLock<KismetSettings>>,
    http: Client,
}

impl KismetClient {
    pub fn new(settings: Arc<RwLock<KismetSettings>>) -> Result<Self> {
        let timeout = Duration::from_secs(settings.read().timeout_secs.max(1));
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentinelError::upstream("client", e))?;
        Ok(Self { settings, http })
    }

    /// Basic auth when a username is configured, else the `KISMET` API key
    /// header when a key is configured, else no credentials.
    fn authorize(&self, request: RequestBuilder, settings: &KismetSettings) -> RequestBuilder {
        if !settings.username.is_empty() {
            request.basic_auth(&settings.username, Some(&settings.password))
        } else if !settings.api_key.is_empty() {
            request.header("KISMET", &settings.api_key)
        } else {
            request
        }
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let settings = self.settings.read().clone();
        let url = format!("{}{}", settings.url.trim_end_matches('/'), path);
        log::debug!("GET {}", url);

        let response = self
            .authorize(self.http.get(&url), &settings)
            .send()
            .map_err(|e| SentinelError::upstream(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SentinelError::UpstreamStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(|e| SentinelError::upstream(path, e))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_text(path)?;
        serde_json::from_str(&body).map_err(|e| SentinelError::UpstreamFormat {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

impl KismetSource for KismetClient {
    fn devices(&self, since: Option<i64>) -> Result<Vec<Device>> {
        let path = match since {
            Some(ts) if ts != 0 => format!("/devices/last-time/{}/devices.ekjson", ts),
            _ => ALL_DEVICES.to_string(),
        };
        let body = self.get_text(&path)?;
        parse_ekjson(&path, &body)
    }

    fn ssids(&self) -> Result<Value> {
        self.get_json(SSIDS)
    }

    fn alerts(&self) -> Result<Vec<KismetAlert>> {
        self.get_json(ALL_ALERTS)
    }

    fn status(&self) -> Result<Value> {
        self.get_json(STATUS)
    }
}

/// Parses an `.ekjson` body: one JSON object per line, blank lines ignored.
/// Objects that are valid JSON but not device-shaped are skipped.
pub fn parse_ekjson(path: &str, body: &str) -> Result<Vec<Device>> {
    let mut devices = Vec::new();
    for (index, line) in body.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
        let value: Value = serde_json::from_str(line).map_err(|e| SentinelError::UpstreamFormat {
            path: path.to_string(),
            reason: format!("record {}: {}", index + 1, e),
        })?;
        match serde_json::from_value::<Device>(value) {
            Ok(device) => devices.push(device),
            Err(e) => log::debug!("Skipping record {} from {}: {}", index + 1, path, e),
        }
    }
    Ok(devices)
}
