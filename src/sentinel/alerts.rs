use shared::{Alert, AlertCategory, AlertSeverity, Stats};
use std::collections::VecDeque;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub severity: Option<AlertSeverity>,
    pub category: Option<AlertCategory>,
    pub limit: Option<usize>,
}

/// Bounded newest-first alert list.
#[derive(Debug)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, alert: Alert) {
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn query(&self, query: &AlertQuery) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| query.severity.is_none_or(|s| a.severity == s))
            .filter(|a| query.category.is_none_or(|c| a.category == c))
            .take(query.limit.unwrap_or(DEFAULT_LIMIT))
            .cloned()
            .collect()
    }

    /// Fills the alert counters of `stats`.
    pub fn count_into(&self, stats: &mut Stats) {
        stats.total_alerts = self.alerts.len();
        for alert in &self.alerts {
            *stats
                .by_category
                .entry(alert.category.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_severity
                .entry(alert.severity.as_str().to_string())
                .or_insert(0) += 1;
        }
    }
}
