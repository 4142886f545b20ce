//! Pre-shared key loading.
//!
//! The original `load_key_file` in `dsvpn.c` returns early on a short read
//! before reaching its own `memset`, leaving the key buffer un-zeroed on
//! that error path. This loader zeroes the read buffer on every exit,
//! success or failure, via `zeroize::Zeroizing`.

use std::io::Read;
use zeroize::Zeroizing;

use crate::error::VpnError;

/// Reads exactly 32 raw bytes from `path` and returns them. The scratch
/// buffer used to read the file is zeroed regardless of outcome.
pub fn load_key_file(path: &str) -> Result<[u8; 32], VpnError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| VpnError::ConfigError(format!("cannot open key file {}: {}", path, e)))?;

    let mut buf = Zeroizing::new([0u8; 32]);
    file.read_exact(&mut *buf).map_err(|e| {
        VpnError::ConfigError(format!("key file {} is not exactly 32 bytes: {}", path, e))
    })?;

    Ok(*buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_exactly_32_bytes() {
        let mut path = std::env::temp_dir();
        path.push(format!("duotun-psk-test-{}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[9u8; 32]).unwrap();
        drop(f);

        let key = load_key_file(path.to_str().unwrap()).unwrap();
        assert_eq!(key, [9u8; 32]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_short_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("duotun-psk-short-{}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[1u8; 16]).unwrap();
        drop(f);

        assert!(load_key_file(path.to_str().unwrap()).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
