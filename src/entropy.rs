// 📏 Entropy Accounting
// Coarse character-space estimate plus the fixed deltas credited by each rule.
// All values are rounded to 2 decimals when computed, never at display time.

/// Delta credited by the simple leet table when anything in range changed
pub const SIMPLE_LEET_DELTA: f64 = 1.0;

/// Delta credited by the advanced leet table when anything in range changed
pub const ADVANCED_LEET_DELTA: f64 = 2.0;

/// Delta credited by a case transform that changed its slice
pub const CASE_CHANGE_DELTA: f64 = 1.0;

/// Random letter written at index 0
pub const FIRST_LETTER_DELTA: f64 = 4.5;

/// Random letter written anywhere else
pub const INNER_LETTER_DELTA: f64 = 7.5;

/// Cardinality used when the password has an uppercase letter or a digit
pub const MIXED_CARDINALITY: f64 = 62.0;

/// Cardinality used for everything else
pub const LOWER_CARDINALITY: f64 = 26.0;

/// Round to two decimal digits
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seed entropy of a freshly loaded password: `length * log2(cardinality)`
///
/// Cardinality is binary: 62 as soon as one uppercase letter (any script,
/// matching `CharClass::Upper`) or digit appears, 26 otherwise. Special
/// characters do not widen it.
pub fn seed_entropy(password: &str) -> f64 {
    let length = password.chars().count() as f64;
    let cardinality = if password
        .chars()
        .any(|c| c.is_uppercase() || c.is_ascii_digit())
    {
        MIXED_CARDINALITY
    } else {
        LOWER_CARDINALITY
    };

    round2(length * cardinality.log2())
}

/// Entropy credited for two digits prepended as `first` then `second`
///
/// Tiers, checked in this order:
/// 1. second digit is 0 → 3.5
/// 2. ascending by one → 1.0 when starting at 1, else 3.5
/// 3. both digits equal → 3.5
/// 4. anything else → 6.5
///
/// Following this order strictly, "10" lands in tier 1 (3.5) and "19" in
/// tier 4 (6.5), even though some worked examples quote 1.0 and 3.5 for them.
pub fn two_digit_prefix_delta(first: u8, second: u8) -> f64 {
    if second == 0 {
        3.5
    } else if second as i16 - first as i16 == 1 {
        if first == 1 {
            1.0
        } else {
            3.5
        }
    } else if first == second {
        3.5
    } else {
        6.5
    }
}

/// Entropy credited for a random letter written at `index`
pub fn random_letter_delta(index: usize) -> f64 {
    if index == 0 {
        FIRST_LETTER_DELTA
    } else {
        INNER_LETTER_DELTA
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_entropy_lowercase_uses_26() {
        assert_eq!(seed_entropy("password"), 37.60);
        assert_eq!(seed_entropy("abc"), round2(3.0 * 26f64.log2()));
    }

    #[test]
    fn test_seed_entropy_upper_or_digit_uses_62() {
        assert_eq!(seed_entropy("Password"), round2(8.0 * 62f64.log2()));
        assert_eq!(seed_entropy("pass1"), round2(5.0 * 62f64.log2()));
    }

    #[test]
    fn test_seed_entropy_non_ascii_uppercase_uses_62() {
        assert_eq!(seed_entropy("Ñandú"), round2(5.0 * 62f64.log2()));
        assert_eq!(seed_entropy("ñandú"), round2(5.0 * 26f64.log2()));
    }

    #[test]
    fn test_seed_entropy_specials_do_not_widen_cardinality() {
        assert_eq!(seed_entropy("pa$$"), round2(4.0 * 26f64.log2()));
    }

    #[test]
    fn test_seed_entropy_empty_password() {
        assert_eq!(seed_entropy(""), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(37.6035), 37.6);
        assert_eq!(round2(1.005 * 1000.0), 1005.0);
        assert_eq!(round2(-0.126), -0.13);
    }

    #[test]
    fn test_two_digit_tiers() {
        assert_eq!(two_digit_prefix_delta(3, 0), 3.5);
        assert_eq!(two_digit_prefix_delta(1, 0), 3.5);
        assert_eq!(two_digit_prefix_delta(1, 2), 1.0);
        assert_eq!(two_digit_prefix_delta(2, 3), 3.5);
        assert_eq!(two_digit_prefix_delta(0, 1), 3.5);
        assert_eq!(two_digit_prefix_delta(5, 5), 3.5);
        assert_eq!(two_digit_prefix_delta(2, 7), 6.5);
        assert_eq!(two_digit_prefix_delta(1, 9), 6.5);
    }

    #[test]
    fn test_zero_check_precedes_equal_check() {
        assert_eq!(two_digit_prefix_delta(0, 0), 3.5);
    }

    #[test]
    fn test_random_letter_delta() {
        assert_eq!(random_letter_delta(0), 4.5);
        assert_eq!(random_letter_delta(3), 7.5);
    }
}
