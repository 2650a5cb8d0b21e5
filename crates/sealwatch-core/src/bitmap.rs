//! Aggregated-seal bitmap decoding

use num_bigint::BigUint;

/// Decode a seal bitmap into one signed/missed flag per validator index.
///
/// Bit `k` of the bitmap (least significant first) carries the flag for
/// validator `k` of the epoch's ordered set. A bitmap shorter than the
/// validator count reads as zero for the high indices: a set that grew
/// relative to what this bitmap covers yields missed for the new tail,
/// not an error.
pub fn decode(bitmap: &BigUint, validator_count: usize) -> Vec<bool> {
    (0..validator_count as u64).map(|k| bitmap.bit(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_length_matches_count() {
        let bitmap = BigUint::from(0b1011u8);
        for n in 0..12 {
            assert_eq!(decode(&bitmap, n).len(), n);
        }
    }

    #[test]
    fn test_decode_zero_is_all_missed() {
        assert_eq!(decode(&BigUint::default(), 5), vec![false; 5]);
    }

    #[test]
    fn test_decode_full_mask_is_all_signed() {
        let n = 7;
        let full = (BigUint::from(1u8) << n) - 1u8;
        assert_eq!(decode(&full, n), vec![true; n]);
    }

    #[test]
    fn test_padding_does_not_disturb_low_bits() {
        let bitmap = BigUint::from(0b101u8);
        let short = decode(&bitmap, 3);
        let long = decode(&bitmap, 4);
        assert_eq!(&long[..3], &short[..]);
        assert!(!long[3]);
    }

    #[test]
    fn test_three_validator_scenario() {
        // Set [A, B, C] with bitmap 0b101: A and C signed, B missed.
        let decoded = decode(&BigUint::from(0b101u8), 3);
        assert_eq!(decoded, vec![true, false, true]);
    }

    #[test]
    fn test_empty_set_decodes_empty() {
        assert!(decode(&BigUint::from(0b1111u8), 0).is_empty());
    }
}
