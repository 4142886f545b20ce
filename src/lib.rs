pub mod codec;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod endpoint;
pub mod error;
pub mod event_loop;
pub mod handshake;
pub mod logging;
pub mod platform;
pub mod session;
pub mod signals;
pub mod transport;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
