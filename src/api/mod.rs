//! HTTP API exposing the chunk service.

mod chunks;
mod server;
mod state;

pub use server::start_http_server;
pub use state::ApiState;
