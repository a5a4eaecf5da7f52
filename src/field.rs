//! Per-field encode/decode driver (C5).
//!
//! Drives a single value through rounding, model subtraction, mapping,
//! escape framing, and the code generator — or the mirror sequence on
//! decode. Diff modes call this the same way model modes do: the caller
//! passes the previous sample as `model` instead of a learned model value,
//! since the arithmetic (round, subtract, map) is identical either way and
//! only the downstream model-update recursion differs (§4.5, §4.6).

use crate::bitio::{BitReader, BitWriter};
use crate::code::cutoff;
use crate::escape::{decode_multi, decode_zero, encode_multi, encode_zero};
use crate::mapper::{map_from_pos, map_to_pos};
use crate::model::{round_fwd, round_inv};
use crate::types::CmpMode;
use crate::{Error, Result};

/// Everything the per-field driver needs to encode or decode one field's
/// worth of values (§3 "Encoder/decoder setup").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSetup {
    pub cmp_par: u32,
    pub spill: u32,
    pub lossy_par: u8,
    pub max_data_bits: u32,
    pub zero_escape: bool,
}

impl FieldSetup {
    pub fn new(mode: CmpMode, cmp_par: u32, spill: u32, lossy_par: u8, max_data_bits: u32) -> Self {
        Self {
            cmp_par,
            spill,
            lossy_par,
            max_data_bits,
            zero_escape: mode.is_zero_escape(),
        }
    }

    fn data_mask(&self) -> u64 {
        if self.max_data_bits >= 32 {
            u32::MAX as u64
        } else {
            (1u64 << self.max_data_bits) - 1
        }
    }
}

/// Encodes one value against `model` (zero for non-model, non-diff
/// fields), writing its code word via `writer`.
pub fn encode_value(writer: &mut BitWriter, data: u32, model: u32, setup: &FieldSetup) -> Result<()> {
    let rd = round_fwd(data, setup.lossy_par);
    let rm = round_fwd(model, setup.lossy_par);
    if rd as u64 > setup.data_mask() || rm as u64 > setup.data_mask() {
        return Err(Error::DataValueTooLarge);
    }
    let residual = rd.wrapping_sub(rm);
    let mapped = map_to_pos(residual, setup.max_data_bits);

    if setup.zero_escape {
        encode_zero(writer, mapped, setup.cmp_par, setup.spill, setup.max_data_bits)
    } else {
        encode_multi(writer, mapped, setup.cmp_par, setup.spill, setup.max_data_bits)
    }
}

/// Decodes one value against `model`, returning the reconstructed
/// full-precision sample.
pub fn decode_value(reader: &mut BitReader, model: u32, setup: &FieldSetup) -> Result<u32> {
    let mapped = if setup.zero_escape {
        decode_zero(reader, setup.cmp_par, setup.spill, setup.max_data_bits)?
    } else {
        decode_multi(reader, setup.cmp_par, setup.spill, setup.max_data_bits)?
    };
    let residual = map_from_pos(mapped, setup.max_data_bits);
    let rm = round_fwd(model, setup.lossy_par);
    let rd = residual.wrapping_add(rm);
    if rd as u64 > setup.data_mask() {
        return Err(Error::DataValueTooLarge);
    }
    Ok(round_inv(rd, setup.lossy_par))
}

/// Optimal spillover threshold for zero-escape mode: the largest spill that
/// still keeps every escaped code word within bounds, capped at
/// `max_spill` (§4.10's bound, supplied by the caller so this stays
/// independent of the validator module).
pub fn best_zero_spill(cmp_par: u32, max_data_bits: u32, max_spill: u32) -> u32 {
    let estimate = max_data_bits.saturating_mul(cmp_par).saturating_add(cutoff(cmp_par));
    estimate.min(max_spill)
}
