use serde::{Deserialize, Serialize};

/// Alert record from Kismet's `/alerts/all_alerts.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KismetAlert {
    #[serde(rename = "kismet.alert.header", default)]
    pub header: String,
    #[serde(rename = "kismet.alert.text", default)]
    pub text: String,
    #[serde(rename = "kismet.alert.severity", default = "default_severity")]
    pub severity: i64,
    #[serde(rename = "kismet.alert.timestamp", default)]
    pub timestamp: f64,
    #[serde(rename = "kismet.alert.transmitter_mac", default)]
    pub transmitter_mac: String,
}

fn default_severity() -> i64 {
    5
}
