use crate::events::Device;
use crate::monitoring::automation::SavePlan;
use crate::sentinel::Sentinel;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use shared::Alert;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Disk writes handed off the request and poll paths.
#[derive(Debug, Clone)]
pub enum SaveJob {
    Batch {
        label: String,
    },
    AlertSnapshot {
        alert: Alert,
        device: Box<Device>,
        plan: SavePlan,
    },
}

pub fn start_save_worker(
    rx: Receiver<SaveJob>,
    sentinel: Arc<Sentinel>,
    running: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        log::info!("Save worker started");
        while running.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(job) => sentinel.handle_save_job(job),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("Save channel disconnected");
                    break;
                }
            }
        }

        // Flush what was queued before shutdown.
        for job in rx.try_iter() {
            sentinel.handle_save_job(job);
        }
        log::info!("Save worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::testing::{FakeSource, device, sentinel_with};

    #[test]
    fn worker_drains_queue_on_shutdown() {
        let drone = device("60:60:1F:AA:BB:CC", "DJI-Mavic-3-Pro", "DJI Technology", "IEEE802.11", -38);
        let (_dir, sentinel, rx) = sentinel_with(FakeSource::with_devices(vec![drone]), |_| {});
        let sentinel = Arc::new(sentinel);

        sentinel.queue_batch_save("manual");
        let running = Arc::new(AtomicBool::new(false));
        start_save_worker(rx, Arc::clone(&sentinel), running).join().unwrap();

        let log = sentinel.save_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].ok);
    }
}
