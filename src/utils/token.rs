//! Random token generation.
//!
//! Tokens are short pronounceable strings rather than opaque base64: letters
//! are drawn by English frequency with vowels and consonants alternating, so
//! `nerasilo` comes out instead of `xq3_Zf9w`. Easier to read over the phone,
//! at a small cost in entropy that the length makes up for.

use rand::Rng;

/// Default length of generated tokens.
pub const TOKEN_LENGTH: usize = 8;

/// English letter frequencies (per 100k words of text), vowels only.
const VOWELS: &[(u8, u32)] = &[
    (b'e', 21912),
    (b'a', 14810),
    (b'o', 14003),
    (b'i', 13318),
    (b'u', 5246),
];

/// English letter frequencies, consonants only.
const CONSONANTS: &[(u8, u32)] = &[
    (b't', 16587),
    (b'n', 12666),
    (b's', 11450),
    (b'r', 10977),
    (b'h', 10795),
    (b'd', 7874),
    (b'l', 7253),
    (b'c', 4943),
    (b'm', 4761),
    (b'f', 4200),
    (b'y', 3853),
    (b'w', 3819),
    (b'g', 3693),
    (b'p', 3316),
    (b'b', 2715),
    (b'v', 2019),
    (b'k', 1257),
    (b'x', 315),
    (b'q', 205),
    (b'j', 188),
    (b'z', 128),
];

/// Generates a random token of the default length.
pub fn generate_token() -> String {
    pronounceable(TOKEN_LENGTH)
}

/// Generates a pronounceable lowercase ASCII string of the given length.
///
/// Roughly every other position is a vowel; the rest are
/// frequency-weighted consonants (with a 1-in-100 chance of any letter).
/// No letter repeats immediately or with a one-letter gap, which rules out
/// runs like `lll` and `lol`-style bouncing.
///
/// # Examples
///
/// ```ignore
/// let token = pronounceable(8);
/// assert_eq!(token.len(), 8);
/// assert!(token.bytes().all(|b| b.is_ascii_lowercase()));
/// ```
pub fn pronounceable(length: usize) -> String {
    let mut rng = rand::rng();
    let vowel_offset = rng.random_range(0..2usize);
    let mut vowel_distribution = 2usize;
    let mut out: Vec<u8> = Vec::with_capacity(length);

    for i in 0..length {
        loop {
            let candidate = if (i + vowel_offset) % vowel_distribution == 0 {
                pick_weighted(&mut rng, VOWELS)
            } else if rng.random_range(0..100) > 0 {
                pick_weighted(&mut rng, CONSONANTS)
            } else {
                pick_any_letter(&mut rng)
            };

            // On an immediate repeat, retry with vowels at every position.
            if i >= 1 && out[i - 1] == candidate {
                vowel_distribution = 1;
                continue;
            }
            if i >= 2 && out[i - 2] == candidate {
                continue;
            }

            out.push(candidate);
            break;
        }
    }

    out.into_iter().map(char::from).collect()
}

/// Picks a letter from a frequency table, weighted by its counts.
fn pick_weighted(rng: &mut impl Rng, table: &[(u8, u32)]) -> u8 {
    let total: u32 = table.iter().map(|&(_, weight)| weight).sum();
    let target = rng.random_range(0..total);

    let mut acc = 0;
    for &(letter, weight) in table {
        acc += weight;
        if acc > target {
            return letter;
        }
    }

    // Unreachable: the loop always crosses `target` before the table ends.
    table[table.len() - 1].0
}

/// Picks from the combined vowel and consonant tables.
fn pick_any_letter(rng: &mut impl Rng) -> u8 {
    let vowel_total: u32 = VOWELS.iter().map(|&(_, weight)| weight).sum();
    let cons_total: u32 = CONSONANTS.iter().map(|&(_, weight)| weight).sum();
    let target = rng.random_range(0..vowel_total + cons_total);

    if target < vowel_total {
        pick_weighted(rng, VOWELS)
    } else {
        pick_weighted(rng, CONSONANTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_vowel(b: u8) -> bool {
        matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
    }

    #[test]
    fn test_generate_token_has_default_length() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_pronounceable_exact_length() {
        for length in [1, 2, 5, 8, 16, 32] {
            assert_eq!(pronounceable(length).len(), length);
        }
    }

    #[test]
    fn test_pronounceable_zero_length() {
        assert_eq!(pronounceable(0), "");
    }

    #[test]
    fn test_pronounceable_lowercase_ascii_only() {
        for _ in 0..100 {
            let token = pronounceable(12);
            assert!(token.bytes().all(|b| b.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_pronounceable_no_immediate_repeats() {
        for _ in 0..200 {
            let token = pronounceable(16);
            let bytes = token.as_bytes();
            for window in bytes.windows(2) {
                assert_ne!(window[0], window[1], "repeat in {token}");
            }
        }
    }

    #[test]
    fn test_pronounceable_no_gap_repeats() {
        for _ in 0..200 {
            let token = pronounceable(16);
            let bytes = token.as_bytes();
            for window in bytes.windows(3) {
                assert_ne!(window[0], window[2], "gap repeat in {token}");
            }
        }
    }

    #[test]
    fn test_pronounceable_contains_vowels() {
        for _ in 0..100 {
            let token = pronounceable(8);
            assert!(
                token.bytes().any(is_vowel),
                "no vowel in {token}"
            );
        }
    }

    #[test]
    fn test_generate_token_mostly_unique() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            seen.insert(generate_token());
        }
        // Pronounceable strings collide more than uniform ones but
        // collisions should stay rare at this sample size.
        assert!(seen.len() > 990, "only {} unique tokens", seen.len());
    }

    #[test]
    fn test_pick_weighted_returns_table_letter() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let letter = pick_weighted(&mut rng, VOWELS);
            assert!(is_vowel(letter));
        }
    }
}
