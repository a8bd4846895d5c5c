use shared::{Alert, AlertCategory, AlertSeverity};
use std::fmt;

/// Classifier rule that produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    DroneKeyword,
    UavPhy,
    StrongSignal,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::DroneKeyword => "drone_keyword",
            Rule::UavPhy => "uav_phy",
            Rule::StrongSignal => "strong_signal",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub rule: Rule,
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub title: String,
    pub body: String,
}

impl Detection {
    pub fn new(
        rule: Rule,
        category: AlertCategory,
        severity: AlertSeverity,
        title: String,
        body: String,
    ) -> Self {
        Self {
            rule,
            category,
            severity,
            title,
            body,
        }
    }

    pub fn into_alert(self, mac: &str) -> Alert {
        Alert::new(self.category, self.severity, &self.title, &self.body).with_mac(mac)
    }
}
