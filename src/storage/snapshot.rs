use crate::error::Result;
use crate::events::Device;
use crate::monitoring::automation::SavePlan;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{json, Value};
use shared::Alert;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_NAME_COMPONENT: usize = 80;

/// Timestamp used in snapshot file names, e.g. `20260224_140000`.
pub fn file_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Replaces anything but ASCII alphanumerics, `-` and `_` with `_`.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_NAME_COMPONENT)
        .collect()
}

pub fn batch_file_name(label: &str, stamp: &str) -> String {
    format!("kismet_{}_{}.json", sanitize_filename(label), stamp)
}

pub fn alert_file_name(alert: &Alert, device_label: &str, stamp: &str) -> String {
    format!(
        "alert_{}_{}_{}.json",
        sanitize_filename(alert.category.as_str()),
        sanitize_filename(device_label),
        stamp
    )
}

pub fn batch_payload(stamp: &str, devices: &[Device]) -> Value {
    json!({
        "ts": stamp,
        "devices": devices,
    })
}

pub fn alert_payload(stamp: &str, alert: &Alert, device: &Device, plan: SavePlan) -> Value {
    let mut payload = json!({
        "saved_at": stamp,
        "alert": alert,
    });

    if plan.details {
        payload["device"] = json!({
            "mac": device.mac,
            "name": device.name,
            "phyname": device.phyname,
            "manuf": device.manuf,
            "type": device.device_type,
            "channel": device.channel,
            "frequency": device.frequency,
            "signal": device.signal,
            "encrypted": device.is_encrypted(),
            "first_time": device.first_time,
            "last_time": device.last_time,
            "packets_total": device.packets_total,
        });
    }

    if plan.traffic {
        payload["traffic"] = json!({
            "packets_total": device.packets_total,
            "packets_data": device.packets_data,
            "packets_crypt": device.crypt,
            "datasize": device.datasize,
            "raw": device.traffic_fields(),
        });
    }

    payload
}

/// Writes `data` as pretty JSON to `dir/filename`, creating `dir` if needed.
pub fn write_json<T: Serialize>(dir: &Path, filename: &str, data: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&path, json)?;
    Ok(path)
}
