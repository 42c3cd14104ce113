// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Exchange Material
//!
//! X25519 key pairs for the relay handshake, plus the provider trait that
//! decides where a handshake's key pair comes from. Whether a client uses a
//! fresh ephemeral pair per session or a stable identity derived from a seed
//! is caller policy, injected rather than hardwired.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// An X25519 key pair for the end-to-end key exchange.
pub struct ExchangeKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl std::fmt::Debug for ExchangeKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeKeyPair")
            .field("secret", &"[REDACTED]")
            .field("public", &self.public.as_bytes())
            .finish()
    }
}

impl ExchangeKeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        ExchangeKeyPair { secret, public }
    }

    /// Derives a key pair deterministically from a 32-byte seed.
    ///
    /// The same seed always yields the same pair, giving the client a stable
    /// key-exchange identity across reconnects.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        ExchangeKeyPair { secret, public }
    }

    /// Returns our public key bytes.
    pub fn public_key(&self) -> &[u8; 32] {
        self.public.as_bytes()
    }

    /// Computes the shared secret with a peer's public key.
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        let their_public = PublicKey::from(*their_public);
        self.secret.diffie_hellman(&their_public).to_bytes()
    }
}

/// Source of key pairs for the handshake.
pub trait KeyProvider: Send {
    /// Produces the key pair to use for one handshake.
    fn exchange_keypair(&self) -> ExchangeKeyPair;
}

/// Fresh random key pair per handshake. The default policy.
#[derive(Debug, Default)]
pub struct EphemeralKeyProvider;

impl KeyProvider for EphemeralKeyProvider {
    fn exchange_keypair(&self) -> ExchangeKeyPair {
        ExchangeKeyPair::generate()
    }
}

/// Deterministic key pair from a caller-held seed.
pub struct SeededKeyProvider {
    seed: [u8; 32],
}

impl std::fmt::Debug for SeededKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededKeyProvider")
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SeededKeyProvider {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

impl SeededKeyProvider {
    /// Creates a provider that always derives from `seed`.
    pub fn new(seed: [u8; 32]) -> Self {
        SeededKeyProvider { seed }
    }
}

impl KeyProvider for SeededKeyProvider {
    fn exchange_keypair(&self) -> ExchangeKeyPair {
        ExchangeKeyPair::from_seed(self.seed)
    }
}
