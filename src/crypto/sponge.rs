//! Handshake MAC/KDF primitive.
//!
//! Grounded on `blake3::Hasher`'s incremental mode: `update()` absorbs,
//! `finalize_xof()` squeezes, and the hasher is never reset between calls,
//! so two `hash()` calls with identical input do not produce identical
//! output — exactly the non-idempotence the handshake's absorb/squeeze
//! contract requires.

use crate::consts::DOMAIN_TAG;

/// Long-term handshake state, seeded once from the PSK and the domain tag.
/// Both peers clone it fresh at the start of every handshake attempt so a
/// failed exchange never leaks partial state into the next one.
#[derive(Clone)]
pub struct HandshakeState {
    hasher: blake3::Hasher,
}

impl HandshakeState {
    /// Seeds the state from a 32-byte PSK, absorbing the domain tag
    /// immediately so both peers' states start identical.
    pub fn from_psk(psk: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new_keyed(psk);
        hasher.update(DOMAIN_TAG);
        Self { hasher }
    }

    /// Absorbs `data`, then squeezes 32 bytes out. Mutates `self` so a
    /// subsequent call continues from the post-absorb state.
    pub fn hash(&mut self, data: &[u8]) -> [u8; 32] {
        self.hasher.update(data);
        let mut out = [0u8; 32];
        self.hasher.finalize_xof().fill(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_hash_is_not_idempotent() {
        let mut state = HandshakeState::from_psk(&[7u8; 32]);
        let a = state.hash(b"same input");
        let b = state.hash(b"same input");
        assert_ne!(a, b, "absorbing twice must advance the state");
    }

    #[test]
    fn two_states_from_same_psk_agree_before_diverging() {
        let mut a = HandshakeState::from_psk(&[9u8; 32]);
        let mut b = HandshakeState::from_psk(&[9u8; 32]);
        assert_eq!(a.hash(b"nonce"), b.hash(b"nonce"));
    }
}
