use crate::sentinel::Sentinel;
use shared::{Alert, AlertCategory, AlertSeverity};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const SLICE: Duration = Duration::from_millis(200);

/// Tracks upstream reachability so only the transition to failing raises an
/// alert, not every failed cycle.
#[derive(Debug, Default)]
pub struct PollHealth {
    failing: bool,
}

impl PollHealth {
    /// Records a failed cycle; returns true when this is the first failure
    /// after a healthy run.
    pub fn fail(&mut self) -> bool {
        !std::mem::replace(&mut self.failing, true)
    }

    /// Records a successful cycle; returns true when upstream just recovered.
    pub fn succeed(&mut self) -> bool {
        std::mem::replace(&mut self.failing, false)
    }
}

pub fn start_device_poller(
    sentinel: Arc<Sentinel>,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        log::info!("Device poller started (every {}s)", interval.as_secs());
        let mut health = PollHealth::default();

        while running.load(Ordering::Relaxed) {
            match sentinel.poll_once() {
                Ok(raised) => {
                    if health.succeed() {
                        log::info!("✅ Kismet reachable again");
                    }
                    if raised > 0 {
                        log::debug!("Poll raised {} alerts", raised);
                    }
                }
                Err(e) => {
                    if health.fail() {
                        log::warn!("Device poll failed: {}", e);
                        sentinel.push_alert(
                            Alert::new(
                                AlertCategory::Error,
                                AlertSeverity::Error,
                                "Device poll failed",
                                &e.to_string(),
                            ),
                            None,
                        );
                    } else {
                        log::debug!("Device poll still failing: {}", e);
                    }
                }
            }

            let wake = Instant::now() + interval;
            while running.load(Ordering::Relaxed) && Instant::now() < wake {
                std::thread::sleep(SLICE);
            }
        }
        log::info!("Device poller stopped");
    })
}
