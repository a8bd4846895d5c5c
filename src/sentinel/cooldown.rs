use crate::events::Rule;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const PRUNE_ABOVE: usize = 4096;

/// Suppresses repeat alerts for the same device and rule inside a window.
#[derive(Debug)]
pub struct Cooldowns {
    window: Duration,
    last_fired: HashMap<(String, Rule), Instant>,
}

impl Cooldowns {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: HashMap::new(),
        }
    }

    /// Returns true and arms the window when `key`/`rule` may alert at `now`.
    pub fn allow(&mut self, key: &str, rule: Rule, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }

        let slot = (key.to_string(), rule);
        if let Some(last) = self.last_fired.get(&slot) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        if self.last_fired.len() > PRUNE_ABOVE {
            let window = self.window;
            self.last_fired
                .retain(|_, last| now.saturating_duration_since(*last) < window);
        }
        self.last_fired.insert(slot, now);
        true
    }
}
