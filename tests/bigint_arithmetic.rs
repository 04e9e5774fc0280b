// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Round-trip and wraparound properties of the 512-bit integer types
//! (testable property 1): `(a + b) - b == a` modulo 2^512, for both the
//! unsigned and signed variants.

use prinbee_storage::bigint::{I512, U512};

#[test]
fn unsigned_add_then_sub_recovers_original() {
    let a = U512::from_u64(123_456_789);
    let b = U512::from_u64(987_654_321);
    assert_eq!((a + b) - b, a);
}

#[test]
fn unsigned_add_wraps_at_the_top() {
    let max = U512::MAX;
    let one = U512::ONE;
    assert_eq!(max + one, U512::ZERO);
    assert_eq!(U512::ZERO - one, max);
}

#[test]
fn signed_add_then_sub_recovers_original_including_negatives() {
    let a = I512::from_i64(-42);
    let b = I512::from_i64(1000);
    assert_eq!((a + b) - b, a);

    let c = I512::from_i64(i64::MIN);
    let d = I512::from_i64(7);
    assert_eq!((c + d) - d, c);
}

#[test]
fn signed_negation_and_sign_queries_agree() {
    let value = I512::from_i64(-5);
    assert!(value.is_negative());
    assert!(value.wrapping_neg().is_positive());
    assert!(I512::from_i64(0).is_zero());
}

#[test]
fn radix_formatting_round_trips_through_every_supported_base() {
    let value = U512::from_u64(0xdead_beef_1234);
    for base in [2, 8, 10, 16] {
        let text = value.to_string_radix(base, false, false);
        let parsed = U512::from_str_radix(&text, base).unwrap();
        assert_eq!(parsed, value);
    }
}
