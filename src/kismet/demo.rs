use crate::events::{Device, Signal};
use lazy_static::lazy_static;
use serde_json::{json, Value};

struct DemoDevice {
    mac: &'static str,
    name: &'static str,
    phy: &'static str,
    manuf: &'static str,
    kind: &'static str,
    channel: &'static str,
    frequency: f64,
    packets: u64,
    /// last, max, min dBm
    signal: (i32, i32, i32),
}

lazy_static! {
    static ref DEMO_DEVICES: Vec<DemoDevice> = vec![
        DemoDevice { mac: "AA:BB:CC:11:22:33", name: "HomeNetwork_5G", phy: "IEEE802.11", manuf: "Netgear", kind: "Wi-Fi AP", channel: "36", frequency: 5180.0, packets: 48210, signal: (-42, -38, -65) },
        DemoDevice { mac: "AA:BB:CC:44:55:66", name: "ASUS_RT-AX86U", phy: "IEEE802.11", manuf: "ASUSTek", kind: "Wi-Fi AP", channel: "1", frequency: 2412.0, packets: 102847, signal: (-55, -40, -72) },
        DemoDevice { mac: "11:22:33:AA:BB:CC", name: "iPhone-Sarah", phy: "IEEE802.11", manuf: "Apple", kind: "Wi-Fi Client", channel: "6", frequency: 2437.0, packets: 8921, signal: (-58, -45, -78) },
        DemoDevice { mac: "22:33:44:BB:CC:DD", name: "Galaxy-S24", phy: "IEEE802.11", manuf: "Samsung", kind: "Wi-Fi Client", channel: "11", frequency: 2462.0, packets: 5432, signal: (-67, -52, -85) },
        DemoDevice { mac: "33:44:55:CC:DD:EE", name: "Ring-Doorbell", phy: "IEEE802.11", manuf: "Amazon", kind: "Wi-Fi Client", channel: "6", frequency: 2437.0, packets: 12890, signal: (-71, -60, -88) },
        DemoDevice { mac: "77:88:99:00:11:22", name: "", phy: "IEEE802.11", manuf: "Intel", kind: "Wi-Fi Client", channel: "6", frequency: 2437.0, packets: 1572, signal: (-79, -65, -90) },
        DemoDevice { mac: "88:99:AA:11:22:33", name: "Xfinity-WiFi", phy: "IEEE802.11", manuf: "Comcast", kind: "Wi-Fi AP", channel: "11", frequency: 2462.0, packets: 89410, signal: (-75, -62, -91) },
        DemoDevice { mac: "55:EE:66:FF:77:00", name: "UniFi-AP-Pro", phy: "IEEE802.11", manuf: "Ubiquiti", kind: "Wi-Fi AP", channel: "48", frequency: 5240.0, packets: 156000, signal: (-35, -25, -52) },
        DemoDevice { mac: "BB:CC:DD:44:55:66", name: "AirPods-Pro", phy: "Bluetooth", manuf: "Apple", kind: "BR/EDR", channel: "", frequency: 2402.0, packets: 3401, signal: (-45, -32, -60) },
        DemoDevice { mac: "CC:DD:EE:55:66:77", name: "Tile-Tracker", phy: "BTLE", manuf: "Tile", kind: "BLE", channel: "", frequency: 2426.0, packets: 890, signal: (-72, -58, -85) },
        DemoDevice { mac: "FF:00:11:88:99:AA", name: "Apple-Watch-7", phy: "BTLE", manuf: "Apple", kind: "BLE", channel: "", frequency: 2426.0, packets: 7812, signal: (-47, -35, -62) },
        DemoDevice { mac: "60:60:1F:AA:BB:CC", name: "DJI-Mavic-3-Pro", phy: "IEEE802.11", manuf: "DJI Technology", kind: "Wi-Fi AP", channel: "149", frequency: 5745.0, packets: 34100, signal: (-38, -28, -55) },
        DemoDevice { mac: "90:3A:E6:DD:EE:FF", name: "Parrot-ANAFI", phy: "IEEE802.11", manuf: "Parrot SA", kind: "Wi-Fi AP", channel: "44", frequency: 5220.0, packets: 12450, signal: (-52, -40, -68) },
        DemoDevice { mac: "A0:B1:C2:D3:E4:F5", name: "UAV-RemoteID-0x4F2A", phy: "UAV", manuf: "DJI Technology", kind: "UAV", channel: "6", frequency: 2437.0, packets: 8901, signal: (-41, -30, -58) },
        DemoDevice { mac: "44:DD:55:EE:66:FF", name: "ESP32-Sensor-01", phy: "IEEE802.11", manuf: "Espressif", kind: "Wi-Fi Client", channel: "1", frequency: 2412.0, packets: 430, signal: (-69, -55, -83) },
    ];
}

/// Fixed device set served when Kismet is unreachable in demo mode.
/// Seen-times are spread over the hour before `now` (unix seconds).
pub fn demo_devices(now: i64) -> Vec<Device> {
    DEMO_DEVICES
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let i = i as u64;
            let now = now.max(0) as u64;
            Device {
                mac: d.mac.to_string(),
                name: d.name.to_string(),
                phyname: d.phy.to_string(),
                manuf: d.manuf.to_string(),
                device_type: d.kind.to_string(),
                channel: d.channel.to_string(),
                frequency: Some(d.frequency),
                signal: Some(Signal {
                    last: Some(d.signal.0),
                    max: Some(d.signal.1),
                    min: Some(d.signal.2),
                    ..Signal::default()
                }),
                first_time: Some(now.saturating_sub(3600 + i * 1200)),
                last_time: Some(now.saturating_sub((i * 37) % 600)),
                packets_total: Some(d.packets),
                ..Device::default()
            }
        })
        .collect()
}

pub fn demo_status() -> Value {
    json!({
        "kismet.system.version": "demo",
        "kismet.system.devices.count": DEMO_DEVICES.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionRules;
    use crate::monitoring::classifier;

    #[test]
    fn demo_set_contains_drones_and_bluetooth() {
        let devices = demo_devices(1_771_942_800);
        let rules = DetectionRules::default();
        let drones = devices
            .iter()
            .filter(|d| classifier::detect_drone_keyword(d, &rules).is_some())
            .count();
        assert_eq!(drones, 3);
        assert!(devices.iter().any(|d| d.is_bluetooth()));
        assert!(devices.iter().all(|d| d.last_time <= Some(1_771_942_800)));
    }

    #[test]
    fn status_reports_device_count() {
        assert_eq!(demo_status()["kismet.system.devices.count"], DEMO_DEVICES.len());
    }
}
