pub mod automation;
pub mod classifier;
pub mod poller;
pub mod scheduler;

pub use poller::start_device_poller;
pub use scheduler::start_scheduler;
