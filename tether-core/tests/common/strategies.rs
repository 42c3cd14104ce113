// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.
//! Import these in property test files to avoid duplication.

use proptest::prelude::*;

/// Strategy for generating 32-byte arrays (shared secrets, key seeds).
pub fn bytes32_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Strategy for generating frame payloads (empty through a few KiB).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Strategy for generating call method names.
pub fn method_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,30}"
}

/// Strategy for generating request ids within the interoperable range.
pub fn request_id_strategy() -> impl Strategy<Value = u64> {
    1u64..=((1 << 53) - 1)
}
