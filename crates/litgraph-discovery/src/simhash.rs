//! Near-duplicate detection over paper abstracts via 64-bit SimHash
//! (spec supplement: `duplicate_of` on `Paper`). Two abstracts whose
//! fingerprints differ by a small Hamming distance are treated as
//! probable duplicates rather than distinct frontier nodes.

/// Hamming distance at or below this is treated as a probable duplicate.
pub const DUPLICATE_HAMMING_THRESHOLD: u32 = 12;

/// 64-bit SimHash fingerprint of `text`, stop-word filtered and
/// case-insensitive, suitable for storage as a signed 64-bit integer.
pub fn abstract_simhash(text: &str) -> i64 {
    let normalised = text.to_lowercase();
    let words: Vec<&str> = normalised.split_whitespace().collect();

    let mut v: [i64; 64] = [0; 64];
    for word in &words {
        if STOP_WORDS.contains(word) {
            continue;
        }
        let hash = fnv64(word.as_bytes());
        for (i, slot) in v.iter_mut().enumerate() {
            if (hash >> i) & 1 == 1 {
                *slot += 1;
            } else {
                *slot -= 1;
            }
        }
    }

    let mut fingerprint: u64 = 0;
    for (i, &weight) in v.iter().enumerate() {
        if weight > 0 {
            fingerprint |= 1u64 << i;
        }
    }
    clamp_u64_to_i64(fingerprint)
}

fn clamp_u64_to_i64(value: u64) -> i64 {
    if value > i64::MAX as u64 {
        i64::MAX
    } else {
        value as i64
    }
}

fn fnv64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 14695981039346656037;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

/// Hamming distance between two fingerprints.
pub fn hamming_distance(a: i64, b: i64) -> u32 {
    ((a as u64) ^ (b as u64)).count_ones()
}

/// Whether `a` and `b` should be treated as probable duplicates.
pub fn is_probable_duplicate(a: i64, b: i64) -> bool {
    hamming_distance(a, b) <= DUPLICATE_HAMMING_THRESHOLD
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "in", "of", "to", "is", "was", "for", "on", "with", "this",
    "that", "are", "were", "be", "been", "by", "from", "we", "our", "their", "which", "also",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_have_identical_fingerprints() {
        let text = "A new approach to quantum field theory renormalisation";
        assert_eq!(abstract_simhash(text), abstract_simhash(text));
    }

    #[test]
    fn similar_texts_have_small_hamming_distance() {
        let t1 = "A new approach to quantum field theory renormalisation in curved spacetime";
        let t2 = "A new approach to quantum field theory renormalization in curved spacetimes";
        let dist = hamming_distance(abstract_simhash(t1), abstract_simhash(t2));
        assert!(dist <= DUPLICATE_HAMMING_THRESHOLD, "distance was {dist}");
        assert!(is_probable_duplicate(abstract_simhash(t1), abstract_simhash(t2)));
    }

    #[test]
    fn unrelated_texts_have_large_hamming_distance() {
        let t1 = "A new approach to quantum field theory renormalisation";
        let t2 = "Polynomial time algorithms for graph isomorphism testing";
        let dist = hamming_distance(abstract_simhash(t1), abstract_simhash(t2));
        assert!(dist > DUPLICATE_HAMMING_THRESHOLD, "distance was {dist}");
        assert!(!is_probable_duplicate(abstract_simhash(t1), abstract_simhash(t2)));
    }

    #[test]
    fn fingerprint_is_always_within_i64_range() {
        for text in ["", "short", "a much longer abstract with many distinct technical words repeated over and over"] {
            let h = abstract_simhash(text);
            assert!(h >= i64::MIN && h <= i64::MAX);
        }
    }
}
