pub mod client;
pub mod demo;

pub use client::KismetClient;

use crate::error::Result;
use crate::events::{Device, KismetAlert};
use serde_json::Value;

/// Read side of the Kismet REST API used by the dashboard.
pub trait KismetSource: Send + Sync {
    /// All devices, or only those active since the unix timestamp `since`.
    fn devices(&self, since: Option<i64>) -> Result<Vec<Device>>;

    fn ssids(&self) -> Result<Value>;

    fn alerts(&self) -> Result<Vec<KismetAlert>>;

    fn status(&self) -> Result<Value>;
}
