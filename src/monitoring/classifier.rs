use crate::config::DetectionRules;
use crate::events::{Detection, Device, KismetAlert, Rule};
use shared::{Alert, AlertCategory, AlertSeverity};

/// Kismet severities below this are mirrored as warnings, the rest as info.
const KISMET_WARNING_BELOW: i64 = 10;

/// Detects drone vendor/model keywords in the device name or manufacturer.
/// Only the first matching keyword is reported.
pub fn detect_drone_keyword(device: &Device, rules: &DetectionRules) -> Option<Detection> {
    let combined = format!("{} {}", device.name, device.manuf).to_lowercase();

    let keyword = rules
        .drone_keywords
        .iter()
        .find(|kw| !kw.is_empty() && combined.contains(&kw.to_lowercase()))?;

    Some(Detection::new(
        Rule::DroneKeyword,
        AlertCategory::Drone,
        AlertSeverity::Critical,
        format!("🚁 Drone detected: {}", device.label()),
        format!(
            "MAC: {} | PHY: {} | Manuf: {} | Signal: {} dBm | Keyword matched: '{}'",
            device.mac,
            device.phyname,
            device.manuf,
            device.last_signal(),
            keyword
        ),
    ))
}

/// Detects devices reported on the UAV physical layer (Remote ID and friends).
pub fn detect_uav_phy(device: &Device, rules: &DetectionRules) -> Option<Detection> {
    if device.phyname != rules.uav_phy {
        return None;
    }

    Some(Detection::new(
        Rule::UavPhy,
        AlertCategory::Drone,
        AlertSeverity::Critical,
        format!("🚁 UAV PHY device: {}", device.label()),
        format!(
            "MAC: {} | Manuf: {} | Signal: {} dBm",
            device.mac,
            device.manuf,
            device.last_signal()
        ),
    ))
}

pub fn detect_strong_signal(device: &Device, rules: &DetectionRules) -> Option<Detection> {
    let signal = device.last_signal();
    if signal <= rules.strong_signal_dbm {
        return None;
    }

    Some(Detection::new(
        Rule::StrongSignal,
        AlertCategory::Signal,
        AlertSeverity::Warning,
        format!("📶 Strong signal: {}", device.label()),
        format!(
            "MAC: {} | Signal: {} dBm | PHY: {}",
            device.mac, signal, device.phyname
        ),
    ))
}

/// Runs every device rule, in rule order.
pub fn classify(device: &Device, rules: &DetectionRules) -> Vec<Detection> {
    [
        detect_drone_keyword(device, rules),
        detect_uav_phy(device, rules),
        detect_strong_signal(device, rules),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn classify_kismet_alert(alert: &KismetAlert) -> Alert {
    let severity = if alert.severity < KISMET_WARNING_BELOW {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    };
    let title = if alert.header.is_empty() {
        "Kismet Alert"
    } else {
        alert.header.as_str()
    };

    Alert::new(AlertCategory::Kismet, severity, title, &alert.text)
        .with_mac(&alert.transmitter_mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Signal;

    fn device(name: &str, manuf: &str, phy: &str, signal: i32) -> Device {
        Device {
            mac: "60:60:1F:AA:BB:CC".to_string(),
            name: name.to_string(),
            manuf: manuf.to_string(),
            phyname: phy.to_string(),
            signal: Some(Signal {
                last: Some(signal),
                ..Signal::default()
            }),
            ..Device::default()
        }
    }

    #[test]
    fn drone_keyword_in_name_or_manufacturer() {
        let rules = DetectionRules::default();

        let by_name = detect_drone_keyword(&device("Mavic-Air", "", "IEEE802.11", -70), &rules)
            .expect("name keyword");
        assert_eq!(by_name.category, AlertCategory::Drone);
        assert_eq!(by_name.severity, AlertSeverity::Critical);
        assert!(by_name.body.contains("'mavic'"));

        let by_manuf =
            detect_drone_keyword(&device("", "DJI Technology", "IEEE802.11", -70), &rules)
                .expect("manufacturer keyword");
        assert!(by_manuf.title.ends_with("60:60:1F:AA:BB:CC"));
        assert!(by_manuf.body.contains("'dji'"));

        assert!(detect_drone_keyword(&device("iPad", "Apple", "IEEE802.11", -70), &rules).is_none());
    }

    #[test]
    fn first_keyword_in_rule_order_wins() {
        let rules = DetectionRules::default();
        // "dji" precedes "mavic" in the keyword list.
        let detection =
            detect_drone_keyword(&device("DJI-Mavic-3-Pro", "", "IEEE802.11", -70), &rules).unwrap();
        assert!(detection.body.contains("'dji'"));
    }

    #[test]
    fn uav_phy_is_flagged_independently_of_keywords() {
        let rules = DetectionRules::default();
        let uav = device("UAV-RemoteID-0x4F2A", "DJI Technology", "UAV", -41);
        let detections = classify(&uav, &rules);
        let found: Vec<Rule> = detections.iter().map(|d| d.rule).collect();
        assert_eq!(
            found,
            vec![Rule::DroneKeyword, Rule::UavPhy, Rule::StrongSignal]
        );
    }

    #[test]
    fn strong_signal_threshold_is_exclusive() {
        let rules = DetectionRules::default();
        assert!(detect_strong_signal(&device("a", "", "IEEE802.11", -60), &rules).is_none());
        let hit = detect_strong_signal(&device("a", "", "IEEE802.11", -59), &rules).unwrap();
        assert_eq!(hit.category, AlertCategory::Signal);
        assert_eq!(hit.severity, AlertSeverity::Warning);
    }

    #[test]
    fn threshold_comes_from_rules() {
        let rules = DetectionRules {
            strong_signal_dbm: -80,
            ..DetectionRules::default()
        };
        assert!(detect_strong_signal(&device("a", "", "IEEE802.11", -75), &rules).is_some());
    }

    #[test]
    fn quiet_ordinary_device_yields_nothing() {
        let rules = DetectionRules::default();
        assert!(classify(&device("Galaxy-S24", "Samsung", "IEEE802.11", -67), &rules).is_empty());
        assert!(classify(&Device::default(), &rules).is_empty());
    }

    #[test]
    fn kismet_severity_mapping() {
        let low = KismetAlert {
            header: "DEAUTHFLOOD".to_string(),
            text: "Deauth flood".to_string(),
            severity: 5,
            ..KismetAlert::default()
        };
        let alert = classify_kismet_alert(&low);
        assert_eq!(alert.category, AlertCategory::Kismet);
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.title, "DEAUTHFLOOD");

        let high = KismetAlert {
            severity: 15,
            ..KismetAlert::default()
        };
        let alert = classify_kismet_alert(&high);
        assert_eq!(alert.severity, AlertSeverity::Info);
        assert_eq!(alert.title, "Kismet Alert");
    }
}
