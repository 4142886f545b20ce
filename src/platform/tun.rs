//! TUN interface adapter.
//!
//! Built on the `tun` crate's async device, the same one the teacher's
//! `utils::device` module uses, generalized here to one blocking-shaped
//! read/write of a single IP datagram per call rather than a channel-fed
//! background task — the event loop drives this handle directly.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tun::{AbstractDevice, AsyncDevice};

use crate::error::VpnError;

/// Opens (or creates) the TUN interface named `name` (or lets the OS pick
/// a name if `name` is `None`), assigns `local`/`remote` tunnel addresses,
/// and sets its MTU.
pub fn open(name: Option<&str>, local: &str, remote: &str, mtu: u16) -> Result<AsyncDevice, VpnError> {
    let mut config = tun::Configuration::default();
    config.address(local).destination(remote).mtu(mtu).up();
    if let Some(name) = name {
        config.tun_name(name);
    }

    #[cfg(target_os = "linux")]
    config.platform_config(|p| {
        p.ensure_root_privileges(true);
    });

    tun::create_as_async(&config).map_err(|e| VpnError::TunFatal(format!("tun_create failed: {}", e)))
}

/// Returns the kernel-assigned (or requested) interface name.
pub fn interface_name(dev: &AsyncDevice) -> Result<String, VpnError> {
    dev.tun_name()
        .map_err(|e| VpnError::TunFatal(format!("tun_name failed: {}", e)))
}

/// Reads one IP datagram into `buf`, returning its length. A `0`-length
/// or erroring read is a terminal TUN failure per the spec's error
/// taxonomy — the caller should not retry.
pub async fn read(dev: &mut AsyncDevice, buf: &mut [u8]) -> Result<usize, VpnError> {
    let n = dev
        .read(buf)
        .await
        .map_err(|e| VpnError::TunFatal(format!("tun read failed: {}", e)))?;
    if n == 0 {
        return Err(VpnError::TunFatal("tun read returned 0".into()));
    }
    Ok(n)
}

/// Writes one decrypted IP datagram to the interface. A failing or
/// partial write here is logged and dropped by the caller, not fatal.
pub async fn write(dev: &mut AsyncDevice, buf: &[u8]) -> Result<(), VpnError> {
    dev.write_all(buf)
        .await
        .map_err(|e| VpnError::NonFatal(format!("tun write failed: {}", e)))
}
