// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod e2e;
pub mod kdf;
pub mod keys;

pub use e2e::{CryptoError, E2eSession};
pub use kdf::HKDF;
pub use keys::{EphemeralKeyProvider, ExchangeKeyPair, KeyProvider, SeededKeyProvider};
