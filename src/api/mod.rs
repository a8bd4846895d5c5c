pub mod http;
pub mod routes;
pub mod server;

pub use server::{bind, start_http_server};
