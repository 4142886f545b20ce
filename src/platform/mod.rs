//! Platform collaborators: TUN device, default-route detection, and
//! firewall/NAT rule management. Each is reached through a narrow
//! interface so the core transport and event loop never shell out or
//! touch the `tun` crate directly.

pub mod firewall;
pub mod net_info;
pub mod tun;
