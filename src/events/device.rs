use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reported when a device carries no usable signal reading.
pub const NO_SIGNAL_DBM: i32 = -100;

/// A device record as exported by Kismet's `.ekjson` views.
///
/// Fields the dashboard does not interpret are kept in `extra` so a device
/// can be served back and snapshotted without losing upstream data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "kismet_device_base_macaddr", default)]
    pub mac: String,
    #[serde(rename = "kismet_device_base_name", default)]
    pub name: String,
    #[serde(rename = "kismet_device_base_phyname", default)]
    pub phyname: String,
    #[serde(rename = "kismet_device_base_manuf", default)]
    pub manuf: String,
    #[serde(rename = "kismet_device_base_type", default)]
    pub device_type: String,
    #[serde(rename = "kismet_device_base_channel", default)]
    pub channel: String,
    #[serde(
        rename = "kismet_device_base_frequency",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<f64>,
    #[serde(
        rename = "kismet_device_base_signal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub signal: Option<Signal>,
    #[serde(
        rename = "kismet_device_base_first_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub first_time: Option<u64>,
    #[serde(
        rename = "kismet_device_base_last_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_time: Option<u64>,
    /// Kismet encryption bitfield; zero means open.
    #[serde(
        rename = "kismet_device_base_crypt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub crypt: Option<u64>,
    #[serde(
        rename = "kismet_device_base_packets_total",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub packets_total: Option<u64>,
    #[serde(
        rename = "kismet_device_base_packets_data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub packets_data: Option<u64>,
    #[serde(
        rename = "kismet_device_base_datasize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub datasize: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    #[serde(
        rename = "kismet_common_signal_last_signal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last: Option<i32>,
    #[serde(
        rename = "kismet_common_signal_max_signal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<i32>,
    #[serde(
        rename = "kismet_common_signal_min_signal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Last signal in dBm. Kismet reports 0 when nothing was measured.
    pub fn last_signal(&self) -> i32 {
        match self.signal.as_ref().and_then(|s| s.last) {
            Some(0) | None => NO_SIGNAL_DBM,
            Some(dbm) => dbm,
        }
    }

    /// Name for display and file naming, falling back to the MAC.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.mac } else { &self.name }
    }

    pub fn is_bluetooth(&self) -> bool {
        matches!(self.phyname.as_str(), "BTLE" | "Bluetooth")
    }

    pub fn is_encrypted(&self) -> bool {
        self.crypt.unwrap_or(0) != 0
    }

    /// Upstream fields whose key mentions packets, data or crypt.
    pub fn traffic_fields(&self) -> Map<String, Value> {
        let Ok(Value::Object(all)) = serde_json::to_value(self) else {
            return Map::new();
        };
        all.into_iter()
            .filter(|(key, _)| {
                let key = key.to_lowercase();
                key.contains("packet") || key.contains("data") || key.contains("crypt")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Device {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_kismet_fields_and_keeps_unknown_ones() {
        let device = parse(json!({
            "kismet_device_base_macaddr": "AA:BB:CC:11:22:33",
            "kismet_device_base_name": "HomeNetwork_5G",
            "kismet_device_base_phyname": "IEEE802.11",
            "kismet_device_base_frequency": 5180,
            "kismet_device_base_signal": {
                "kismet_common_signal_last_signal": -42,
                "kismet_common_signal_type": "dbm"
            },
            "kismet_device_base_seenby": []
        }));
        assert_eq!(device.mac, "AA:BB:CC:11:22:33");
        assert_eq!(device.frequency, Some(5180.0));
        assert_eq!(device.last_signal(), -42);
        assert!(device.extra.contains_key("kismet_device_base_seenby"));
        assert!(device.signal.unwrap().extra.contains_key("kismet_common_signal_type"));
    }

    #[test]
    fn missing_or_zero_signal_reads_as_no_signal() {
        assert_eq!(Device::default().last_signal(), NO_SIGNAL_DBM);
        let zero = parse(json!({
            "kismet_device_base_signal": {"kismet_common_signal_last_signal": 0}
        }));
        assert_eq!(zero.last_signal(), NO_SIGNAL_DBM);
    }

    #[test]
    fn label_falls_back_to_mac() {
        let device = parse(json!({"kismet_device_base_macaddr": "77:88:99:00:11:22"}));
        assert_eq!(device.label(), "77:88:99:00:11:22");
    }

    #[test]
    fn traffic_fields_pick_packet_data_and_crypt_keys() {
        let device = parse(json!({
            "kismet_device_base_macaddr": "AA:BB:CC:11:22:33",
            "kismet_device_base_packets_total": 10,
            "kismet_device_base_packets_data": 4,
            "kismet_device_base_datasize": 2048,
            "kismet_device_base_crypt": 2,
            "kismet_device_base_packets_rx_total": 6
        }));
        let traffic = device.traffic_fields();
        assert_eq!(traffic.len(), 5);
        assert!(!traffic.contains_key("kismet_device_base_macaddr"));
        assert!(device.is_encrypted());
    }
}
