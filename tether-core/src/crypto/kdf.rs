// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key Derivation (HKDF-SHA256)
//!
//! Thin wrapper around ring's HKDF. Context info strings give each derived
//! key its own domain; two calls with distinct info never yield related keys.

use ring::hkdf;

/// Output length marker for ring's HKDF expand.
struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// HKDF-SHA256 key derivation.
pub struct HKDF;

impl HKDF {
    /// Derives a single 256-bit key.
    ///
    /// `salt` may be `None` (HKDF then uses a zero salt per RFC 5869).
    pub fn derive_key(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> [u8; 32] {
        let mut okm = [0u8; 32];
        Self::expand(salt, ikm, info, &mut okm);
        okm
    }

    fn expand(salt: Option<&[u8]>, ikm: &[u8], info: &[u8], out: &mut [u8]) {
        let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, salt.unwrap_or(&[]));
        let prk = salt.extract(ikm);
        prk.expand(&[info], OkmLen(out.len()))
            .expect("HKDF-SHA256 output length is within bounds")
            .fill(out)
            .expect("HKDF output buffer matches requested length");
    }
}
