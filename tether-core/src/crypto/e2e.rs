// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! End-to-End Session (ChaCha20-Poly1305)
//!
//! Encrypts relay-routed traffic so the relay only ever forwards opaque
//! bytes. A session holds two independent keys derived from the handshake's
//! shared secret with direction-specific HKDF context strings; a frame
//! sealed in one direction can never be replayed back at its sender because
//! the reflected bytes were made under the wrong key.
//!
//! Nonces are not random: each direction counts frames with a `u64` and
//! builds the 96-bit nonce from it (little-endian counter in the low 8
//! bytes, zero elsewhere). The receiver computes the nonce it expects next
//! and rejects anything else, which makes the channel strict-order and
//! replay-proof. The counters never reset for the lifetime of the session.
//!
//! Sealed output is `base64url_no_pad(nonce || ciphertext || tag)`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use thiserror::Error;
use zeroize::Zeroize;

use super::kdf::HKDF;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;
/// Authentication tag size.
const TAG_SIZE: usize = 16;

/// KDF info constants for direction separation.
const CLIENT_TO_HOST_INFO: &[u8] = b"Tether_E2E_Client_To_Host";
const HOST_TO_CLIENT_INFO: &[u8] = b"Tether_E2E_Host_To_Client";

/// Session encryption error types.
///
/// `NonceMismatch` and `AuthenticationFailed` mean the frame is dropped and
/// the session keeps going; tampering is not a reason to tear down
/// otherwise-valid state.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Authentication failed: frame corrupted or tampered")]
    AuthenticationFailed,
    #[error("Nonce mismatch: frame replayed or out of order")]
    NonceMismatch,
    #[error("Malformed sealed payload")]
    MalformedPayload,
}

/// 256-bit directional session key.
struct SessionKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("SessionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SessionKey {
    fn from_bytes(bytes: [u8; 32]) -> Self {
        SessionKey { bytes }
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// An established end-to-end session.
///
/// Created once per successful handshake and dropped on disconnect. There
/// is no key persistence across reconnects; a stable identity comes from
/// re-deriving the same shared secret, not from keeping session state.
pub struct E2eSession {
    send_key: SessionKey,
    recv_key: SessionKey,
    send_counter: u64,
    recv_counter: u64,
}

impl std::fmt::Debug for E2eSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("E2eSession")
            .field("send_counter", &self.send_counter)
            .field("recv_counter", &self.recv_counter)
            .finish()
    }
}

impl E2eSession {
    /// Session for the side that initiated the handshake (the client).
    pub fn initiator(shared_secret: &[u8; 32]) -> Self {
        E2eSession {
            send_key: SessionKey::from_bytes(HKDF::derive_key(
                None,
                shared_secret,
                CLIENT_TO_HOST_INFO,
            )),
            recv_key: SessionKey::from_bytes(HKDF::derive_key(
                None,
                shared_secret,
                HOST_TO_CLIENT_INFO,
            )),
            send_counter: 0,
            recv_counter: 0,
        }
    }

    /// Session for the side that answered the handshake (the host).
    pub fn responder(shared_secret: &[u8; 32]) -> Self {
        E2eSession {
            send_key: SessionKey::from_bytes(HKDF::derive_key(
                None,
                shared_secret,
                HOST_TO_CLIENT_INFO,
            )),
            recv_key: SessionKey::from_bytes(HKDF::derive_key(
                None,
                shared_secret,
                CLIENT_TO_HOST_INFO,
            )),
            send_counter: 0,
            recv_counter: 0,
        }
    }

    /// Encrypts a plaintext under the send key and advances the counter.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let nonce_bytes = counter_nonce(self.send_counter);
        let cipher = ChaCha20Poly1305::new(self.send_key.as_bytes().into());
        let nonce = chacha20poly1305::Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        self.send_counter += 1;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypts a sealed payload, enforcing strict frame order.
    ///
    /// The embedded nonce must equal the one computed from our receive
    /// counter; the counter only advances on successful decryption, so a
    /// rejected frame does not desynchronize the session.
    pub fn open(&mut self, payload: &str) -> Result<Vec<u8>, CryptoError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CryptoError::MalformedPayload)?;
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::MalformedPayload);
        }

        let expected = counter_nonce(self.recv_counter);
        if sealed[..NONCE_SIZE] != expected[..] {
            return Err(CryptoError::NonceMismatch);
        }

        let cipher = ChaCha20Poly1305::new(self.recv_key.as_bytes().into());
        let nonce = chacha20poly1305::Nonce::from_slice(&expected);
        let plaintext = cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        self.recv_counter += 1;
        Ok(plaintext)
    }

    /// Number of frames sealed so far.
    pub fn frames_sent(&self) -> u64 {
        self.send_counter
    }

    /// Number of frames accepted so far.
    pub fn frames_received(&self) -> u64 {
        self.recv_counter
    }
}

/// 96-bit nonce: little-endian counter in the low 8 bytes, zero elsewhere.
fn counter_nonce(counter: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..8].copy_from_slice(&counter.to_le_bytes());
    nonce
}
