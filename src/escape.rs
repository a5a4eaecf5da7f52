//! Escape-symbol framing disciplines (C4).
//!
//! Both disciplines wrap a mapped (unsigned, zig-zagged) value so that
//! outliers above a spillover threshold don't blow up the code word
//! length: non-outliers get the plain code word, outliers get a short
//! sentinel code word followed by a raw payload.

use crate::bitio::{BitReader, BitWriter};
use crate::code::{decode_codeword, encode_codeword};
use crate::{Error, Result};

/// Zero-escape (C4): reserves code-word symbol 0 for "outlier follows".
/// Every mapped value is offset by +1 before framing, so the reserved
/// symbol never collides with a legitimate non-outlier value of 0.
pub fn encode_zero(
    writer: &mut BitWriter,
    mapped: u32,
    cmp_par: u32,
    spill: u32,
    max_data_bits: u32,
) -> Result<()> {
    let offset = mapped.wrapping_add(1);
    if offset < spill {
        let (word, len) = encode_codeword(offset, cmp_par);
        writer.put_bits(word, len)
    } else {
        let (word, len) = encode_codeword(0, cmp_par);
        writer.put_bits(word, len)?;
        writer.put_bits(offset, max_data_bits)
    }
}

/// Inverse of [`encode_zero`]. After the reserved symbol 0 signals an
/// escape, the raw payload is the `offset` the encoder wrote — always
/// `>= spill`, since that's the only condition under which `encode_zero`
/// takes the escape path. A payload of 0 or `< spill` is malformed.
pub fn decode_zero(
    reader: &mut BitReader,
    cmp_par: u32,
    spill: u32,
    max_data_bits: u32,
) -> Result<u32> {
    let decoded = decode_codeword(reader, cmp_par)?;
    if decoded >= spill {
        return Err(Error::IntDecoder);
    }
    if decoded != 0 {
        return Ok(decoded - 1);
    }
    let raw = reader.get_bits(max_data_bits)?;
    if raw == 0 || raw < spill {
        return Err(Error::IntDecoder);
    }
    Ok(raw - 1)
}

/// Multi-escape (C4): no offset. Values `< spill` get the plain code word;
/// values `>= spill` get the code word for `spill + offset` (where `offset`
/// is derived from the bit length of `mapped - spill`) followed by the raw
/// `mapped - spill` value in `2 * (offset + 1)` bits.
pub fn encode_multi(
    writer: &mut BitWriter,
    mapped: u32,
    cmp_par: u32,
    spill: u32,
    max_data_bits: u32,
) -> Result<()> {
    if mapped < spill {
        let (word, len) = encode_codeword(mapped, cmp_par);
        return writer.put_bits(word, len);
    }
    let unencoded = mapped - spill;
    let offset = if unencoded == 0 {
        0
    } else {
        (31 - unencoded.leading_zeros()) / 2
    };
    let payload_bits = 2 * (offset + 1);
    if payload_bits > max_data_bits {
        return Err(Error::DataValueTooLarge);
    }
    let (word, len) = encode_codeword(spill + offset, cmp_par);
    writer.put_bits(word, len)?;
    writer.put_bits(unencoded, payload_bits)
}

/// Inverse of [`encode_multi`].
pub fn decode_multi(
    reader: &mut BitReader,
    cmp_par: u32,
    spill: u32,
    max_data_bits: u32,
) -> Result<u32> {
    let decoded = decode_codeword(reader, cmp_par)?;
    if decoded < spill {
        return Ok(decoded);
    }
    let offset = decoded - spill;
    let payload_bits = 2 * (offset + 1);
    if payload_bits > max_data_bits {
        return Err(Error::DataValueTooLarge);
    }
    let unencoded = reader.get_bits(payload_bits)?;
    Ok(spill + unencoded)
}
