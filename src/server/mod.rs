//! Network surface
//!
//! - `config` - Listener, limiter and deadline settings
//! - `session` - Per-connection command loop
//! - `listener` - Accept loop and graceful shutdown

pub mod config;
pub mod listener;
pub mod session;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use listener::BankServer;
pub use session::{Session, SessionContext};
