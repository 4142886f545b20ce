//! Per-direction AEAD state.
//!
//! Built on the `chacha20` stream cipher and `poly1305` universal hash
//! directly — the same two primitives the all-in-one `chacha20poly1305`
//! crate composes — because the wire format (see `crate::codec`) carries
//! no nonce field and truncates the tag to `TAG_LEN` bytes, neither of
//! which the high-level `aead::Aead` trait can express. The construction
//! below is the standard IETF ChaCha20-Poly1305 one-time-key derivation:
//! block 0 of the keystream is the Poly1305 key, encryption starts at
//! block 1.

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::{ChaCha20, Key as ChaChaKey, Nonce as ChaChaNonce};
use poly1305::universal_hash::{KeyInit as PolyKeyInit, UniversalHash};
use poly1305::{Block as PolyBlock, Poly1305};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::consts::TAG_LEN;
use crate::error::VpnError;

/// One direction's AEAD state: a fixed key plus a frame counter. The
/// counter is never put on the wire — both ends advance it once per
/// frame in lockstep, which is what stands in for the reference sponge's
/// implicit internal state advance (see the design note on frame nonces).
pub struct CipherState {
    key: [u8; 32],
    counter: u64,
}

impl CipherState {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key, counter: 0 }
    }

    fn nonce(&self) -> ChaChaNonce {
        let mut n = ChaChaNonce::default();
        n[4..].copy_from_slice(&self.counter.to_le_bytes());
        n
    }

    fn derive_mac(cipher: &mut ChaCha20) -> Poly1305 {
        let mut mac_key = poly1305::Key::default();
        cipher.apply_keystream(&mut mac_key);
        let mac = Poly1305::new(&mac_key);
        mac_key.zeroize();
        cipher.seek(64u32);
        mac
    }

    fn len_block(len: usize) -> PolyBlock {
        let mut block = PolyBlock::default();
        block[8..].copy_from_slice(&(len as u64).to_le_bytes());
        block
    }

    /// Encrypts `buf` in place and returns the tag, truncated to `TAG_LEN`
    /// bytes. Advances the frame counter by one.
    pub fn encrypt(&mut self, buf: &mut [u8]) -> [u8; TAG_LEN] {
        let nonce = self.nonce();
        let key = ChaChaKey::from(self.key);
        let mut cipher = ChaCha20::new(&key, &nonce);
        let mut mac = Self::derive_mac(&mut cipher);

        cipher.apply_keystream(buf);
        mac.update_padded(buf);
        mac.update(&[Self::len_block(buf.len())]);
        let tag = mac.finalize();

        self.counter += 1;
        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(&tag[..TAG_LEN]);
        out
    }

    /// Verifies a `TAG_LEN`-byte tag in constant time and, on success,
    /// decrypts `buf` in place and advances the frame counter. On
    /// failure `buf` is left untouched and the caller must treat the
    /// state as desynchronized (reconnect).
    pub fn decrypt(&mut self, buf: &mut [u8], tag: &[u8]) -> Result<(), VpnError> {
        if tag.len() != TAG_LEN {
            return Err(VpnError::Transient("short authentication tag".into()));
        }

        let nonce = self.nonce();
        let key = ChaChaKey::from(self.key);
        let mut cipher = ChaCha20::new(&key, &nonce);
        let mut mac = Self::derive_mac(&mut cipher);

        mac.update_padded(buf);
        mac.update(&[Self::len_block(buf.len())]);
        let computed = mac.finalize();

        if computed[..TAG_LEN].ct_eq(tag).unwrap_u8() != 1 {
            return Err(VpnError::Transient("authentication tag mismatch".into()));
        }

        cipher.apply_keystream(buf);
        self.counter += 1;
        Ok(())
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Both directions' AEAD state for one connected peer. Non-null iff the
/// peer socket is live (I2); `Drop` zeroes both halves.
pub struct SessionKeys {
    pub send: CipherState,
    pub recv: CipherState,
}

impl SessionKeys {
    /// Derives `send`/`recv` keys from the common handshake secret `k`
    /// and this endpoint's role byte, per the swapped-IV construction:
    /// role 0 (server) sends under iv-byte 0 and receives under iv-byte 1,
    /// role 1 (client) does the opposite, so the two peers' states are
    /// swapped end to end (I3).
    pub fn derive(k: &[u8; 32], role: u8) -> Self {
        let send_key = derive_direction_key(k, role);
        let recv_key = derive_direction_key(k, role ^ 1);
        Self {
            send: CipherState::new(send_key),
            recv: CipherState::new(recv_key),
        }
    }
}

fn derive_direction_key(k: &[u8; 32], role_byte: u8) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_keyed(k);
    hasher.update(&[role_byte]);
    let mut out = [0u8; 32];
    hasher.finalize_xof().fill(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = [3u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);

        let original = b"hello over the tunnel".to_vec();
        let mut buf = original.clone();
        let tag = send.encrypt(&mut buf);
        recv.decrypt(&mut buf, &tag).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let key = [5u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);

        let mut buf = b"packet".to_vec();
        let mut tag = send.encrypt(&mut buf);
        tag[0] ^= 0xff;
        assert!(recv.decrypt(&mut buf, &tag).is_err());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = [5u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);

        let mut buf = b"packet".to_vec();
        let tag = send.encrypt(&mut buf);
        buf[0] ^= 0xff;
        assert!(recv.decrypt(&mut buf, &tag).is_err());
    }

    #[test]
    fn states_advance_in_lockstep_across_frames() {
        let key = [1u8; 32];
        let mut send = CipherState::new(key);
        let mut recv = CipherState::new(key);

        for i in 0..5u8 {
            let mut buf = vec![i; 10];
            let tag = send.encrypt(&mut buf);
            recv.decrypt(&mut buf, &tag).unwrap();
            assert_eq!(buf, vec![i; 10]);
        }
        assert_eq!(send.counter, recv.counter);
    }

    #[test]
    fn session_keys_are_swapped_between_peers() {
        let k = [42u8; 32];
        let server = SessionKeys::derive(&k, 0);
        let client = SessionKeys::derive(&k, 1);

        let mut buf = b"server to client".to_vec();
        let mut server_send = server.send;
        let tag = server_send.encrypt(&mut buf);
        let mut client_recv = client.recv;
        client_recv.decrypt(&mut buf, &tag).unwrap();
        assert_eq!(buf, b"server to client");
    }
}
