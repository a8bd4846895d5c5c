pub mod history;
pub mod snapshot;
pub mod watchlist;
pub mod worker;

pub use worker::{SaveJob, start_save_worker};
