//! Golomb and Rice code-word generators and their decoders (C2).
//!
//! A code word is represented as `(word, len)`: the low `len` bits of
//! `word` are the bits to emit, MSB first. Callers write it via
//! [`crate::bitio::BitWriter`]. Both generators are only ever invoked on
//! values already known (by the caller, via the escape framer) to fit in at
//! most 32 bits; `len > 32` signals that this invariant was violated
//! upstream.
//!
//! Decoding is driven bit-by-bit against a [`crate::bitio::BitReader`]
//! rather than against a pre-sliced word, since both code words are
//! variable-length and self-delimiting.

use crate::bitio::BitReader;
use crate::{Error, Result};

/// `true` if `x` is a power of two (`x != 0`).
pub fn is_pow2(x: u32) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// `floor(log2(x))`. `x == 0` never reaches this (cmp_par is validated to be
/// `>= 1` before any code generator runs); returns 0 in that case.
pub fn ilog2(x: u32) -> u32 {
    if x == 0 {
        0
    } else {
        31 - x.leading_zeros()
    }
}

/// Rice-encodes `v` with parameter `cmp_par = 2^k`. Returns `(word, len)`.
pub fn rice_encode(v: u32, k: u32) -> (u32, u32) {
    let q = v >> k;
    let len = q + k + 1;
    if len > 32 {
        return (0, len);
    }
    let remainder = if k == 0 { 0 } else { v & ((1u32 << k) - 1) };
    let unary_and_term = if q == 32 { 0 } else { ((1u32 << q) - 1) << (k + 1) };
    (unary_and_term | remainder, len)
}

/// Inverse of [`rice_encode`]: counts the unary quotient prefix, reads the
/// `k`-bit remainder, and recombines.
pub fn rice_decode(reader: &mut BitReader, k: u32) -> Result<u32> {
    let mut q: u32 = 0;
    loop {
        if reader.get_bits(1)? == 0 {
            break;
        }
        q += 1;
        if q > 32 {
            return Err(Error::IntDecoder);
        }
    }
    let remainder = if k == 0 { 0 } else { reader.get_bits(k)? };
    Ok((q << k) + remainder)
}

/// `cutoff = 2^(k+1) - m` where `k = floor(log2(m))`. Shared by the Golomb
/// generator and [`crate::field::best_zero_spill`]'s optimal-spill
/// estimate.
pub fn cutoff(m: u32) -> u32 {
    let k = ilog2(m);
    (2u32 << k).wrapping_sub(m)
}

/// Golomb-encodes `v` with parameter `cmp_par = m`. Returns `(word, len)`.
///
/// `v < cutoff` is the plain `k`-bit-or-less case written directly as a
/// `k+1`-bit value (its top bit is always 0, since `v < cutoff <= 2^k`).
/// Otherwise `q = v/m`, `r = v%m` are the true Golomb quotient and
/// remainder: the word is `q` unary ones, a terminating zero, then `r` in
/// truncated binary — `k` bits if `r < cutoff`, else `r + cutoff` in `k+1`
/// bits. This is the textbook Golomb code the `q == 0, r < cutoff` case of
/// which degenerates exactly to the `v < cutoff` shortcut above.
pub fn golomb_encode(v: u32, m: u32) -> (u32, u32) {
    let k = ilog2(m);
    let cutoff = self::cutoff(m);
    if v < cutoff {
        return (v, k + 1);
    }
    let q = v / m;
    let r = v % m;
    let (field, field_bits) = if r < cutoff { (r, k) } else { (r + cutoff, k + 1) };
    let len = q + 1 + field_bits;
    if len > 32 {
        return (0, len);
    }
    let word = if q == 0 {
        field
    } else {
        (((1u32 << q) - 1) << (field_bits + 1)) | field
    };
    (word, len)
}

/// Inverse of [`golomb_encode`]. Counts the unary quotient prefix, reads
/// the `k`-bit field, and conditionally reads one more bit if that field
/// turned out to be `>= cutoff` — mirroring the encoder's truncated-binary
/// split on `r` rather than on `v`.
pub fn golomb_decode(reader: &mut BitReader, m: u32) -> Result<u32> {
    let k = ilog2(m);
    let cutoff = self::cutoff(m);
    let mut q: u32 = 0;
    loop {
        if reader.get_bits(1)? == 0 {
            break;
        }
        q += 1;
        if q > 32 {
            return Err(Error::IntDecoder);
        }
    }
    let field = if k == 0 { 0 } else { reader.get_bits(k)? };
    let r = if field < cutoff {
        field
    } else {
        let extra = reader.get_bits(1)?;
        (field << 1 | extra) - cutoff
    };
    Ok(q * m + r)
}

/// Dispatches to [`rice_encode`] when `cmp_par` is a power of two, else
/// [`golomb_encode`]. This is the "normal code word" every escape framer
/// discipline (C4) emits for non-outlier values.
pub fn encode_codeword(v: u32, cmp_par: u32) -> (u32, u32) {
    if is_pow2(cmp_par) {
        rice_encode(v, ilog2(cmp_par))
    } else {
        golomb_encode(v, cmp_par)
    }
}

/// Inverse of [`encode_codeword`].
pub fn decode_codeword(reader: &mut BitReader, cmp_par: u32) -> Result<u32> {
    if is_pow2(cmp_par) {
        rice_decode(reader, ilog2(cmp_par))
    } else {
        golomb_decode(reader, cmp_par)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::BitWriter;

    #[test]
    fn pow2_check() {
        assert!(is_pow2(1));
        assert!(is_pow2(2));
        assert!(is_pow2(1024));
        assert!(!is_pow2(0));
        assert!(!is_pow2(3));
        assert!(!is_pow2(6));
    }

    #[test]
    fn ilog2_values() {
        assert_eq!(ilog2(1), 0);
        assert_eq!(ilog2(2), 1);
        assert_eq!(ilog2(3), 1);
        assert_eq!(ilog2(8), 3);
        assert_eq!(ilog2(1 << 30), 30);
    }

    #[test]
    fn rice_k0_is_unary() {
        let (word, len) = rice_encode(3, 0);
        assert_eq!(len, 4);
        assert_eq!(word, 0b1110);
    }

    #[test]
    fn rice_with_remainder() {
        let (word, len) = rice_encode(10, 2);
        assert_eq!(len, 5);
        assert_eq!(word, 0b11010);
    }

    #[test]
    fn rice_round_trip() {
        let mut buf = [0u8; 16];
        let values = [0u32, 1, 2, 5, 37, 255, 1000];
        let k = 4;
        {
            let mut w = BitWriter::new(&mut buf);
            for &v in &values {
                let (word, len) = rice_encode(v, k);
                assert!(len <= 32);
                w.put_bits(word, len).unwrap();
            }
        }
        let mut r = BitReader::new(&buf);
        for &v in &values {
            assert_eq!(rice_decode(&mut r, k).unwrap(), v);
        }
    }

    #[test]
    fn golomb_group_zero() {
        let (word, len) = golomb_encode(0, 3);
        assert_eq!(len, 2);
        assert_eq!(word, 0);
    }

    #[test]
    fn golomb_group_nonzero() {
        // m=3, k=1, cutoff=1: v=4 -> q=1, r=1 (>= cutoff), field=r+cutoff=2
        // in k+1=2 bits, one unary one plus terminator, four bits total.
        let (word, len) = golomb_encode(4, 3);
        assert_eq!(len, 4);
        assert_eq!(word, 0b1010);
    }

    #[test]
    fn golomb_decode_inverts_encode_across_groups() {
        let mut buf = [0u8; 8];
        let m = 3;
        let values = [0u32, 1, 2, 3, 4, 5, 6, 10, 20];
        {
            let mut w = BitWriter::new(&mut buf);
            for &v in &values {
                let (word, len) = golomb_encode(v, m);
                w.put_bits(word, len).unwrap();
            }
        }
        let mut r = BitReader::new(&buf);
        for &v in &values {
            assert_eq!(golomb_decode(&mut r, m).unwrap(), v);
        }
    }

    #[test]
    fn codeword_dispatch_picks_rice_for_power_of_two() {
        let mut buf = [0u8; 8];
        {
            let mut w = BitWriter::new(&mut buf);
            let (word, len) = encode_codeword(13, 8);
            w.put_bits(word, len).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(decode_codeword(&mut r, 8).unwrap(), 13);
    }

    #[test]
    fn codeword_dispatch_picks_golomb_for_non_power_of_two() {
        let mut buf = [0u8; 8];
        {
            let mut w = BitWriter::new(&mut buf);
            let (word, len) = encode_codeword(13, 5);
            w.put_bits(word, len).unwrap();
        }
        let mut r = BitReader::new(&buf);
        assert_eq!(decode_codeword(&mut r, 5).unwrap(), 13);
    }

    #[test]
    fn golomb_round_trip() {
        let mut buf = [0u8; 32];
        let values = [0u32, 1, 2, 3, 4, 7, 13, 50, 100];
        let m = 5;
        {
            let mut w = BitWriter::new(&mut buf);
            for &v in &values {
                let (word, len) = golomb_encode(v, m);
                assert!(len <= 32);
                w.put_bits(word, len).unwrap();
            }
        }
        let mut r = BitReader::new(&buf);
        for &v in &values {
            assert_eq!(golomb_decode(&mut r, m).unwrap(), v);
        }
    }
}
