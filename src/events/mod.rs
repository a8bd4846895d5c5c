pub mod alert;
pub mod device;
pub mod kismet;

pub use alert::{Detection, Rule};
pub use device::{Device, Signal};
pub use kismet::KismetAlert;
