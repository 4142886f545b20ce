//! Error taxonomy and loop-signal propagation.
//!
//! Mirrors the teacher's lightweight error style (plain enum, manual
//! `Display`, no macro-derived error crate) rather than introducing
//! `thiserror`, since the crate already uses `crate::Error = Box<dyn
//! std::error::Error + Send + Sync>` as its catch-all alias.

use std::fmt;
use std::fmt::Display;

/// The five error kinds the event loop and startup code distinguish.
#[derive(Debug)]
pub enum VpnError {
    /// Bad CLI, unreadable key, unknown platform for firewall rules.
    ConfigError(String),
    /// TUN read returned `<= 0`, or the TUN handle reported HUP/ERR.
    TunFatal(String),
    /// Handshake MAC mismatch, timestamp skew, or handshake timeout.
    AuthFailed(String),
    /// Peer TCP error/HUP, frame parse error, AEAD verification failure.
    Transient(String),
    /// A failing `tun_write` — reported, frame dropped, loop continues.
    NonFatal(String),
}

impl std::error::Error for VpnError {}

impl Display for VpnError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VpnError::ConfigError(e) => write!(fmt, "config error: {}", e),
            VpnError::TunFatal(e) => write!(fmt, "tun fatal: {}", e),
            VpnError::AuthFailed(e) => write!(fmt, "auth failed: {}", e),
            VpnError::Transient(e) => write!(fmt, "transient: {}", e),
            VpnError::NonFatal(e) => write!(fmt, "non-fatal: {}", e),
        }
    }
}

impl From<std::io::Error> for VpnError {
    fn from(e: std::io::Error) -> Self {
        VpnError::Transient(e.to_string())
    }
}

/// What the event loop should do after a branch completes. Errors never
/// unwind out of an iteration — every branch collapses into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// Keep running, nothing to do.
    Continue,
    /// Tear down the current session and (client only) start reconnecting.
    Reconnect,
    /// Stop the loop entirely.
    Terminal,
}
