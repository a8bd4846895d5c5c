pub mod rules;

pub use rules::{Config, DetectionRules, KismetSettings, ServerSettings};
