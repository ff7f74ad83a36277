//! Unsynchronisation: the `0xFF` byte-stuffing transform.
//!
//! Insertion is the conservative rule: a `0x00` follows *every* `0xFF`.
//! Some taggers only stuff when the next byte would form a false MPEG sync
//! (`>= 0xE0`) or is already `0x00`; both outputs are legal and decode to the
//! same bytes, but they differ on the wire.
//!
//! Removal drops the `0x00` that immediately follows each `0xFF`.  Under the
//! conservative insertion rule the two operations are exact inverses.

/// Stuff a `0x00` after every `0xFF`.
pub fn insert(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|&&b| b == 0xFF).count();
    let mut out = Vec::with_capacity(data.len() + extra);
    for &byte in data {
        out.push(byte);
        if byte == 0xFF {
            out.push(0x00);
        }
    }
    out
}

/// Remove stuffing.  Pass 1 counts `FF 00` pairs so the output is allocated
/// exactly once; pass 2 copies while skipping each stuffed zero.
pub fn remove(data: &[u8]) -> Vec<u8> {
    let stuffed = data.windows(2).filter(|w| w[0] == 0xFF && w[1] == 0x00).count();
    if stuffed == 0 {
        return data.to_vec();
    }

    let mut out = Vec::with_capacity(data.len() - stuffed);
    let mut skip_next_zero = false;
    for &byte in data {
        if skip_next_zero && byte == 0x00 {
            skip_next_zero = false;
            continue;
        }
        skip_next_zero = byte == 0xFF;
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input() {
        assert!(insert(&[]).is_empty());
        assert!(remove(&[]).is_empty());
    }

    #[test]
    fn lone_trailing_ff() {
        assert_eq!(insert(&[0x41, 0xFF]), vec![0x41, 0xFF, 0x00]);
        assert_eq!(remove(&[0x41, 0xFF, 0x00]), vec![0x41, 0xFF]);
        // An unstuffed trailing 0xFF (from a lenient writer) survives removal.
        assert_eq!(remove(&[0x41, 0xFF]), vec![0x41, 0xFF]);
    }

    #[test]
    fn ff_ff_00_runs() {
        let plain = [0xFF, 0xFF, 0x00];
        let stuffed = insert(&plain);
        assert_eq!(stuffed, vec![0xFF, 0x00, 0xFF, 0x00, 0x00]);
        assert_eq!(remove(&stuffed), plain.to_vec());
    }

    #[test]
    fn literal_ff_00_is_stuffed() {
        let stuffed = insert(&[0xFF, 0x00]);
        assert_eq!(stuffed, vec![0xFF, 0x00, 0x00]);
        assert_eq!(remove(&stuffed), vec![0xFF, 0x00]);
    }

    #[test]
    fn sync_pattern_never_survives_insertion() {
        let stuffed = insert(&[0xFF, 0xE0, 0xFF, 0xFB]);
        assert!(!stuffed.windows(2).any(|w| w[0] == 0xFF && w[1] >= 0xE0));
    }

    proptest! {
        #[test]
        fn remove_inverts_insert(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(remove(&insert(&data)), data);
        }

        #[test]
        fn ff_heavy_roundtrip(data in proptest::collection::vec(prop_oneof![Just(0xFFu8), Just(0x00u8), any::<u8>()], 0..256)) {
            prop_assert_eq!(remove(&insert(&data)), data);
        }
    }
}
