//! HTTP API module.
//!
//! Server, wire types and the live log broadcaster of the development
//! report service.

pub mod logs;
pub mod server;
pub mod types;

pub use server::{router, start_server, AppState};
pub use types::*;
