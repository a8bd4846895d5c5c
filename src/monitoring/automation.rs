use crate::events::Device;
use shared::{AlertCategory, AutoWatchRules, AutomationSettings};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchRule {
    DroneAlerts,
    BtleAlerts,
    StrongSignal,
}

impl WatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchRule::DroneAlerts => "drone_alerts",
            WatchRule::BtleAlerts => "btle_alerts",
            WatchRule::StrongSignal => "strong_signal",
        }
    }
}

impl fmt::Display for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sections an alert snapshot should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePlan {
    pub details: bool,
    pub traffic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub watch: Option<WatchRule>,
    pub save: Option<SavePlan>,
}

/// Highest-priority enabled rule matching the alert: drone, then BTLE, then
/// strong signal.
pub fn matching_watch_rule(
    category: AlertCategory,
    device: &Device,
    rules: &AutoWatchRules,
) -> Option<WatchRule> {
    if rules.drone_alerts && category == AlertCategory::Drone {
        return Some(WatchRule::DroneAlerts);
    }
    if rules.btle_alerts
        && matches!(category, AlertCategory::Signal | AlertCategory::Kismet)
        && device.is_bluetooth()
    {
        return Some(WatchRule::BtleAlerts);
    }
    if rules.strong_signal && category == AlertCategory::Signal {
        return Some(WatchRule::StrongSignal);
    }
    None
}

pub fn plan_save(settings: &AutomationSettings, is_watched: bool) -> Option<SavePlan> {
    if !settings.alert_save_enabled {
        return None;
    }
    if !settings.save_device_details && !settings.save_device_traffic {
        return None;
    }
    if settings.save_watched_only && !is_watched {
        return None;
    }
    Some(SavePlan {
        details: settings.save_device_details,
        traffic: settings.save_device_traffic,
    })
}

/// Decides auto-watch and snapshot for one alert raised by `device`.
///
/// The watch decision is taken first, so a device watched by this very alert
/// already passes the watched-only save filter.
pub fn evaluate(
    category: AlertCategory,
    device: &Device,
    settings: &AutomationSettings,
    already_watched: bool,
) -> Decision {
    let watch = if device.mac.is_empty() || already_watched {
        None
    } else {
        matching_watch_rule(category, device, &settings.auto_watch_rules)
    };

    let save = plan_save(settings, already_watched || watch.is_some());

    Decision { watch, save }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(phy: &str) -> Device {
        Device {
            mac: "CC:DD:EE:55:66:77".to_string(),
            name: "Tile-Tracker".to_string(),
            phyname: phy.to_string(),
            ..Device::default()
        }
    }

    fn all_rules() -> AutoWatchRules {
        AutoWatchRules {
            drone_alerts: true,
            btle_alerts: true,
            strong_signal: true,
        }
    }

    #[test]
    fn drone_rule_outranks_btle() {
        let rule = matching_watch_rule(AlertCategory::Drone, &device("BTLE"), &all_rules());
        assert_eq!(rule, Some(WatchRule::DroneAlerts));
    }

    #[test]
    fn btle_rule_outranks_strong_signal() {
        let rule = matching_watch_rule(AlertCategory::Signal, &device("BTLE"), &all_rules());
        assert_eq!(rule, Some(WatchRule::BtleAlerts));

        let rule = matching_watch_rule(AlertCategory::Signal, &device("IEEE802.11"), &all_rules());
        assert_eq!(rule, Some(WatchRule::StrongSignal));
    }

    #[test]
    fn btle_rule_covers_kismet_alerts_on_classic_bluetooth() {
        let rule = matching_watch_rule(AlertCategory::Kismet, &device("Bluetooth"), &all_rules());
        assert_eq!(rule, Some(WatchRule::BtleAlerts));
    }

    #[test]
    fn disabled_rules_fall_through() {
        let rules = AutoWatchRules {
            drone_alerts: false,
            btle_alerts: false,
            strong_signal: true,
        };
        assert_eq!(matching_watch_rule(AlertCategory::Drone, &device("UAV"), &rules), None);
        assert_eq!(
            matching_watch_rule(AlertCategory::Signal, &device("BTLE"), &rules),
            Some(WatchRule::StrongSignal)
        );
    }

    #[test]
    fn save_and_error_alerts_never_watch() {
        for category in [AlertCategory::Save, AlertCategory::Error] {
            assert_eq!(matching_watch_rule(category, &device("BTLE"), &all_rules()), None);
        }
    }

    #[test]
    fn no_save_when_disabled_or_nothing_selected() {
        let off = AutomationSettings {
            alert_save_enabled: false,
            ..AutomationSettings::default()
        };
        assert_eq!(plan_save(&off, true), None);

        let empty = AutomationSettings {
            save_device_details: false,
            save_device_traffic: false,
            ..AutomationSettings::default()
        };
        assert_eq!(plan_save(&empty, true), None);
    }

    #[test]
    fn save_plan_mirrors_selected_sections() {
        let details_only = AutomationSettings {
            save_device_traffic: false,
            ..AutomationSettings::default()
        };
        assert_eq!(
            plan_save(&details_only, false),
            Some(SavePlan {
                details: true,
                traffic: false
            })
        );
    }

    #[test]
    fn watched_only_filter_accepts_device_watched_by_same_alert() {
        let settings = AutomationSettings {
            save_watched_only: true,
            ..AutomationSettings::default()
        };
        let decision = evaluate(AlertCategory::Drone, &device("UAV"), &settings, false);
        assert_eq!(decision.watch, Some(WatchRule::DroneAlerts));
        assert!(decision.save.is_some());

        // Default rules do not auto-watch strong Wi-Fi signals.
        let decision = evaluate(AlertCategory::Signal, &device("IEEE802.11"), &settings, false);
        assert_eq!(decision.watch, None);
        assert_eq!(decision.save, None);
    }

    #[test]
    fn already_watched_devices_are_not_rewatched_but_still_saved() {
        let settings = AutomationSettings {
            save_watched_only: true,
            ..AutomationSettings::default()
        };
        let decision = evaluate(AlertCategory::Drone, &device("UAV"), &settings, true);
        assert_eq!(decision.watch, None);
        assert!(decision.save.is_some());
    }

    #[test]
    fn device_without_mac_is_never_watched() {
        let mut anonymous = device("BTLE");
        anonymous.mac.clear();
        let decision = evaluate(
            AlertCategory::Drone,
            &anonymous,
            &AutomationSettings::default(),
            false,
        );
        assert_eq!(decision.watch, None);
        assert!(decision.save.is_some());
    }
}
