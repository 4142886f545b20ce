//! Build-time constants shared by both binaries.

use std::time::Duration;

/// MTU applied to the TUN interface on startup.
pub const DEFAULT_MTU: u16 = 1400;

/// Port used when the CLI is given `"auto"` for the port argument.
pub const DEFAULT_PORT: u16 = 9090;

/// Tunnel-side IPv4 used when the server is given `"auto"` for its local tunnel IP.
pub const DEFAULT_SERVER_IP: &str = "10.0.0.1";

/// Tunnel-side IPv4 used when the client is given `"auto"` for its local tunnel IP.
pub const DEFAULT_CLIENT_IP: &str = "10.0.0.2";

/// Upper bound on a frame's plaintext length. Must stay ahead of `DEFAULT_MTU`
/// plus IP/transport headers so a full-size datagram never gets rejected by I4.
pub const MAX_PACKET_LEN: usize = 8192;

/// Length in bytes of the truncated authentication tag carried on the wire.
/// Both peers must agree on this at build time — there is no version byte
/// to negotiate it (see spec's wire format section).
pub const TAG_LEN: usize = 6;

/// Timeout applied to every blocking socket operation (handshake, frame I/O).
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Wake cadence of the event loop's idle tick, used to observe the exit flag
/// promptly even with no other readiness.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Acceptable clock skew between a handshake timestamp and the receiver's clock.
pub const TS_TOLERANCE: u64 = 10;

/// Number of reconnection attempts the client makes before giving up entirely.
pub const RECONNECT_ATTEMPTS: u32 = 10;

/// Domain separation tag absorbed into the long-term handshake state. Part of
/// the on-wire compatibility surface — exactly 16 bytes, no terminator.
pub const DOMAIN_TAG: &[u8; 16] = b"VPN Key Exchange";

/// NAT64-style prefix used to derive a tunnel IPv6 address from a dotted IPv4.
pub const IPV6_PREFIX: &str = "64:ff9b::";
