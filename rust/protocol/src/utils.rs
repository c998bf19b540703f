//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::cmp::Ordering;

// 0xFF if the top bit of `a` is set, else 0.
fn expand_top_bit(a: u8) -> u8 {
    0u8.wrapping_sub(a >> 7)
}

// 0xFF if a == b, else 0.
fn ct_is_eq(a: u8, b: u8) -> u8 {
    let x = a ^ b;
    expand_top_bit(!x & x.wrapping_sub(1))
}

// 0xFF if a < b, else 0.
fn ct_is_lt(a: u8, b: u8) -> u8 {
    expand_top_bit(a ^ ((a ^ b) | ((a.wrapping_sub(b)) ^ a)))
}

// mask must be 0 or 0xFF; picks a when set, b otherwise.
fn ct_select(mask: u8, a: u8, b: u8) -> u8 {
    debug_assert!(mask == 0 || mask == 0xFF);
    b ^ (mask & (a ^ b))
}

/// Lexicographic comparison of equal-length byte strings without an early
/// exit on the first differing byte. Lengths (and the final Ordering itself)
/// are not hidden; only which bytes differ is.
pub(crate) fn constant_time_cmp(x: &[u8], y: &[u8]) -> Ordering {
    match x.len().cmp(&y.len()) {
        Ordering::Equal => {}
        o => return o,
    }

    // Walk from the least significant byte; the most significant differing
    // byte decides, so later (more significant) iterations overwrite.
    let mut result: u8 = 0;
    for (a, b) in x.iter().rev().zip(y.iter().rev()) {
        let is_eq = ct_is_eq(*a, *b);
        let is_lt = ct_is_lt(*a, *b);
        result = ct_select(is_eq, result, ct_select(is_lt, 1, 255));
    }

    debug_assert!(result == 0 || result == 1 || result == 255);

    match result {
        0 => Ordering::Equal,
        1 => Ordering::Less,
        _ => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_cmp() {
        use rand::Rng;

        assert_eq!(constant_time_cmp(&[1], &[1]), Ordering::Equal);
        assert_eq!(constant_time_cmp(&[0, 1], &[1]), Ordering::Greater);
        assert_eq!(constant_time_cmp(&[1], &[0, 1]), Ordering::Less);
        assert_eq!(constant_time_cmp(&[2], &[1, 0, 1]), Ordering::Less);

        let mut rng = rand::rngs::OsRng;
        for len in 1..320 {
            let x: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let y: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            assert_eq!(constant_time_cmp(&x, &y), x.cmp(&y));
            assert_eq!(constant_time_cmp(&y, &x), y.cmp(&x));
        }
    }

    #[test]
    fn test_ct_is_lt() {
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                let expected = if x < y { 0xFF } else { 0 };
                assert_eq!(ct_is_lt(x, y), expected);
            }
        }
    }

    #[test]
    fn test_ct_is_eq() {
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                let expected = if x == y { 0xFF } else { 0 };
                assert_eq!(ct_is_eq(x, y), expected);
            }
        }
    }
}
