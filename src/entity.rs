//! Entity header (C10) and parameter validator (C11).
//!
//! The entity header is the fixed-layout container wrapping a compressed
//! chunk (§4.9, §6 "Entity on-wire format"). The parameter validator
//! (§4.10) rejects invalid `(mode, cmp_par, spill, max_data_bits)` tuples
//! before any encode, and computes the maximum allowable spill for a given
//! `cmp_par`.

use crate::code::{cutoff, ilog2};
use crate::types::{ChunkType, CmpMode};
use crate::{Error, Result};

/// Generic entity header size (RAW mode): bytes 0..22 of §6's table —
/// through `model_value`, with no model/version/pars fields since RAW
/// entities carry no model.
pub const GENERIC_HEADER_SIZE: usize = 22;
/// Mode-specific block for non-RAW entities: `model_counter`, `reserved`,
/// `model_id`, `version_id`, `lossy_par` (bytes 22..32 of §6's table).
const MODE_SPECIFIC_SIZE: usize = 10;
/// Six `(spill, cmp_par)` pairs (bytes 32..62 of §6's table).
pub const NON_IMAGETTE_PAR_SIZE: usize = 6 * (3 + 2);
/// Full header size for a non-RAW entity.
pub const NON_IMAGETTE_HEADER_SIZE: usize = GENERIC_HEADER_SIZE + MODE_SPECIFIC_SIZE + NON_IMAGETTE_PAR_SIZE;

const MAX_CW_BITS: u32 = 32;

/// `cmp_par` validation profile: the general-purpose ICU range, or the
/// narrower RDCU-hardware-compatible imagette legacy range (§4.10,
/// SPEC_FULL.md §C.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamProfile {
    Icu,
    RdcuImagette,
}

impl ParamProfile {
    fn cmp_par_range(self) -> (u32, u32) {
        match self {
            ParamProfile::Icu => (1, 1u32 << 31),
            ParamProfile::RdcuImagette => (1, 63),
        }
    }
}

/// The largest `spill` that keeps every escaped code word within
/// `MAX_CW_BITS` for a given `cmp_par` (§4.10).
pub fn max_spill(cmp_par: u32) -> u32 {
    if cmp_par == 0 {
        return 0;
    }
    let k = ilog2(cmp_par);
    let cut = cutoff(cmp_par);
    let term1 = (MAX_CW_BITS - 1 - k) * cmp_par;
    term1 + cut - (MAX_CW_BITS / 2 - 1) - 1
}

/// One `(cmp_par, spill)` pair with its own `max_data_bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldParam {
    pub cmp_par: u32,
    pub spill: u32,
}

impl FieldParam {
    pub fn new(cmp_par: u32, spill: u32) -> Self {
        Self { cmp_par, spill }
    }
}

/// Validates one field's `(cmp_par, spill, max_data_bits)` (§4.10). The
/// `spill_exp_flags`/`MAX_NON_IMA_SPILL` Open Question (SPEC_FULL.md §D.1)
/// is resolved by additionally rejecting any spill above `extra_cap` when
/// the caller supplies one (used only for the affected L_FX exp_flags
/// field; `None` elsewhere).
pub fn validate_field(
    param: FieldParam,
    max_data_bits: u32,
    profile: ParamProfile,
    extra_cap: Option<u32>,
) -> Result<()> {
    let (lo, hi) = profile.cmp_par_range();
    if param.cmp_par < lo || param.cmp_par > hi {
        return Err(Error::ParSpecific);
    }
    if param.spill < 2 {
        return Err(Error::ParSpecific);
    }
    let cap = max_spill(param.cmp_par);
    if param.spill > cap {
        return Err(Error::ParSpecific);
    }
    if let Some(extra) = extra_cap {
        if param.spill > extra {
            return Err(Error::ParSpecific);
        }
    }
    if max_data_bits == 0 || max_data_bits > 32 {
        return Err(Error::ParMaxUsedBits);
    }
    Ok(())
}

/// Strict byte-range overlap check for the four buffers `compress_chunk`
/// touches (§4.10, §3 "Ownership & lifecycle"). `None` means "not
/// supplied" and never overlaps anything.
pub fn buffers_overlap(a: Option<&[u8]>, b: Option<&[u8]>) -> bool {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a_start = a.as_ptr() as usize;
    let a_end = a_start + a.len();
    let b_start = b.as_ptr() as usize;
    let b_end = b_start + b.len();
    a_start < b_end && b_start < a_end
}

/// Checks all pairwise overlaps among source, model, updated-model, and
/// destination (§3 "Ownership & lifecycle"). The only permitted overlap is
/// `updated_model` aliasing `model` itself (the in-place update case);
/// every other pair is rejected. `dst`/`updated_model` are taken as
/// immutable byte views purely for the range check.
pub fn check_compression_buffers(
    src: &[u8],
    model: Option<&[u8]>,
    updated_model: Option<&[u8]>,
    dst: Option<&[u8]>,
) -> Result<()> {
    if buffers_overlap(Some(src), dst) {
        return Err(Error::ParBuffers);
    }
    if buffers_overlap(Some(src), updated_model) {
        return Err(Error::ParBuffers);
    }
    if buffers_overlap(Some(src), model) {
        return Err(Error::ParBuffers);
    }
    if buffers_overlap(model, dst) {
        return Err(Error::ParBuffers);
    }
    if buffers_overlap(updated_model, dst) {
        return Err(Error::ParBuffers);
    }
    let aliases_model = match (model, updated_model) {
        (Some(m), Some(u)) => m.as_ptr() == u.as_ptr() && m.len() == u.len(),
        _ => false,
    };
    if !aliases_model && buffers_overlap(model, updated_model) {
        return Err(Error::ParBuffers);
    }
    if model.is_none() && updated_model.is_some() {
        return Err(Error::ParNoModel);
    }
    Ok(())
}

/// Fixed-layout entity header (§4.9, §6). `spills`/`cmp_pars` are the six
/// generic `(spill, cmp_par)` pairs; empty (RAW) entities use none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHeader {
    pub entity_size: u32,
    pub original_size: u32,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub chunk_type: ChunkType,
    pub raw: bool,
    pub cmp_mode: CmpMode,
    pub model_value: u8,
    pub model_counter: u8,
    /// Max-used-bits table version (§3 "Max-used-bits table", C13). The
    /// on-wire layout (§6) only spares one reserved byte for this; that
    /// byte is repurposed here rather than left at a fixed zero, since a
    /// decoder otherwise has no way to recover which table the encoder
    /// used.
    pub mb_version: u8,
    pub model_id: u16,
    pub version_id: u32,
    pub lossy_par: u16,
    pub pars: [FieldParam; 6],
}

impl EntityHeader {
    pub fn header_size(&self) -> usize {
        if self.raw {
            GENERIC_HEADER_SIZE
        } else {
            NON_IMAGETTE_HEADER_SIZE
        }
    }

    pub fn write(&self, buf: &mut [u8]) -> Result<()> {
        let size = self.header_size();
        if buf.len() < size {
            return Err(Error::SmallBuffer);
        }
        if self.entity_size > 0xFF_FFFF || self.original_size > 0xFF_FFFF {
            return Err(Error::EntityHeader);
        }
        write_uint(buf, 0, 3, self.entity_size as u64);
        write_uint(buf, 3, 3, self.original_size as u64);
        write_uint(buf, 6, 6, self.start_timestamp);
        write_uint(buf, 12, 6, self.end_timestamp);
        let data_type = self.chunk_type.as_u16() | if self.raw { 0x8000 } else { 0 };
        write_uint(buf, 18, 2, data_type as u64);
        buf[20] = self.cmp_mode.as_u8();
        buf[21] = self.model_value;
        if !self.raw {
            write_uint(buf, 22, 1, self.model_counter as u64);
            buf[23] = self.mb_version;
            write_uint(buf, 24, 2, self.model_id as u64);
            write_uint(buf, 26, 4, self.version_id as u64);
            write_uint(buf, 30, 2, self.lossy_par as u64);
            let mut off = 32;
            for p in &self.pars {
                write_uint(buf, off, 3, p.spill as u64);
                write_uint(buf, off + 3, 2, p.cmp_par as u64);
                off += 5;
            }
        }
        Ok(())
    }

    pub fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < GENERIC_HEADER_SIZE {
            return Err(Error::EntityTooSmall);
        }
        let entity_size = read_uint(buf, 0, 3) as u32;
        let original_size = read_uint(buf, 3, 3) as u32;
        let start_timestamp = read_uint(buf, 6, 6);
        let end_timestamp = read_uint(buf, 12, 6);
        let data_type = read_uint(buf, 18, 2) as u16;
        let raw = data_type & 0x8000 != 0;
        let chunk_type = ChunkType::from_u16(data_type & 0x7FFF).ok_or(Error::EntityHeader)?;
        let cmp_mode = CmpMode::from_u8(buf[20]).ok_or(Error::EntityHeader)?;
        if raw != cmp_mode.is_raw() {
            return Err(Error::EntityHeader);
        }
        let model_value = buf[21];

        let (model_counter, mb_version, model_id, version_id, lossy_par, pars) = if raw {
            // RAW entities carry no compressed fields, so there is no
            // max-used-bits table to record a version for.
            (0, 0, 0, 0, 0, [FieldParam::default(); 6])
        } else {
            if buf.len() < NON_IMAGETTE_HEADER_SIZE {
                return Err(Error::EntityTooSmall);
            }
            let model_counter = read_uint(buf, 22, 1) as u8;
            let mb_version = buf[23];
            let model_id = read_uint(buf, 24, 2) as u16;
            let version_id = read_uint(buf, 26, 4) as u32;
            let lossy_par = read_uint(buf, 30, 2) as u16;
            let mut pars = [FieldParam::default(); 6];
            let mut off = 32;
            for p in pars.iter_mut() {
                let spill = read_uint(buf, off, 3) as u32;
                let cmp_par = read_uint(buf, off + 3, 2) as u32;
                *p = FieldParam::new(cmp_par, spill);
                off += 5;
            }
            (model_counter, mb_version, model_id, version_id, lossy_par, pars)
        };

        Ok(EntityHeader {
            entity_size,
            original_size,
            start_timestamp,
            end_timestamp,
            chunk_type,
            raw,
            cmp_mode,
            model_value,
            model_counter,
            mb_version,
            model_id,
            version_id,
            lossy_par,
            pars,
        })
    }

    /// Patches `model_id`/`model_counter` in an already-produced header in
    /// place, without touching the compressed payload (§6 "Model-id
    /// setter").
    pub fn set_model_id_and_counter(buf: &mut [u8], model_id: u16, model_counter: u8) -> Result<()> {
        if buf.len() < GENERIC_HEADER_SIZE {
            return Err(Error::EntityTooSmall);
        }
        buf[22] = model_counter;
        if buf.len() >= 26 {
            write_uint(buf, 24, 2, model_id as u64);
        }
        Ok(())
    }
}

fn write_uint(buf: &mut [u8], byte_off: usize, n_bytes: usize, value: u64) {
    for i in 0..n_bytes {
        buf[byte_off + i] = ((value >> ((n_bytes - 1 - i) * 8)) & 0xFF) as u8;
    }
}

fn read_uint(buf: &[u8], byte_off: usize, n_bytes: usize) -> u64 {
    let mut v = 0u64;
    for i in 0..n_bytes {
        v = (v << 8) | buf[byte_off + i] as u64;
    }
    v
}

/// Caller-supplied `(cmp_par, spill)` for every field group any chunk type
/// might need (§6 "a `CmpPar` record ... one compression/spill pair per
/// field group"). Named after `init_cmp_cfg_from_cmp_par`'s per-chunk-type
/// mapping in the original; `mode`, `model_value`, and `lossy_par` sit
/// alongside since they too are per-chunk (not per-field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmpPar {
    pub mode: Option<CmpMode>,
    pub model_value: u8,
    pub lossy_par: u8,

    pub nc_imagette: FieldParam,
    pub sat_imagette: FieldParam,
    pub fc_imagette: FieldParam,

    pub s_exp_flags: FieldParam,
    pub s_fx: FieldParam,
    pub s_ncob: FieldParam,
    pub s_efx: FieldParam,
    pub s_ecob: FieldParam,

    pub l_exp_flags: FieldParam,
    pub l_fx: FieldParam,
    pub l_ncob: FieldParam,
    pub l_efx: FieldParam,
    pub l_ecob: FieldParam,
    pub l_fx_cob_variance: FieldParam,

    pub f_fx: FieldParam,
    pub f_ncob: FieldParam,
    pub f_efx: FieldParam,
    pub f_ecob: FieldParam,

    pub nc_offset_mean: FieldParam,
    pub nc_offset_variance: FieldParam,
    pub nc_background_mean: FieldParam,
    pub nc_background_variance: FieldParam,
    pub nc_background_outlier_pixels: FieldParam,

    pub smearing_mean: FieldParam,
    pub smearing_variance_mean: FieldParam,
    pub smearing_outlier_pixels: FieldParam,

    pub fc_offset_mean: FieldParam,
    pub fc_offset_variance: FieldParam,
    pub fc_background_mean: FieldParam,
    pub fc_background_variance: FieldParam,
    pub fc_background_outlier_pixels: FieldParam,
}

impl CmpPar {
    /// The up to six `(spill, cmp_par)` pairs that get packed into the
    /// entity header's generic slots for a given chunk type, in
    /// `init_cmp_cfg_from_cmp_par`'s field order. Unused slots are zeroed.
    pub fn header_slots(&self, chunk_type: ChunkType) -> [FieldParam; 6] {
        let mut slots = [FieldParam::default(); 6];
        let fields: &[FieldParam] = match chunk_type {
            ChunkType::NcamImagette => &[self.nc_imagette],
            ChunkType::SatImagette => &[self.sat_imagette],
            ChunkType::ShortCadence => &[
                self.s_exp_flags,
                self.s_fx,
                self.s_ncob,
                self.s_efx,
                self.s_ecob,
            ],
            ChunkType::LongCadence => &[
                self.l_exp_flags,
                self.l_fx,
                self.l_ncob,
                self.l_efx,
                self.l_ecob,
                self.l_fx_cob_variance,
            ],
            ChunkType::FastCadence => &[self.f_fx, self.f_ncob, self.f_efx, self.f_ecob],
            ChunkType::OffsetBackground => &[
                self.nc_offset_mean,
                self.nc_offset_variance,
                self.nc_background_mean,
                self.nc_background_variance,
                self.nc_background_outlier_pixels,
            ],
            ChunkType::Smearing => &[
                self.smearing_mean,
                self.smearing_variance_mean,
                self.smearing_outlier_pixels,
            ],
            ChunkType::FChain => &[
                self.fc_imagette,
                self.fc_offset_mean,
                self.fc_offset_variance,
                self.fc_background_mean,
                self.fc_background_variance,
                self.fc_background_outlier_pixels,
            ],
        };
        slots[..fields.len()].copy_from_slice(fields);
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_spill_matches_legacy_formula_examples() {
        // cmp_par = 1: k=0, cutoff = 2-1 = 1.
        // max_spill = (32-1-0)*1 + 1 - (16-1) - 1 = 31 + 1 - 15 - 1 = 16.
        assert_eq!(max_spill(1), 16);
    }

    #[test]
    fn validate_field_rejects_small_spill() {
        let err = validate_field(FieldParam::new(1, 1), 16, ParamProfile::Icu, None).unwrap_err();
        assert_eq!(err, Error::ParSpecific);
    }

    #[test]
    fn validate_field_rejects_spill_above_cap() {
        let cap = max_spill(1);
        let err = validate_field(FieldParam::new(1, cap + 1), 16, ParamProfile::Icu, None).unwrap_err();
        assert_eq!(err, Error::ParSpecific);
    }

    #[test]
    fn validate_field_rejects_rdcu_par_out_of_range() {
        let err = validate_field(FieldParam::new(64, 2), 16, ParamProfile::RdcuImagette, None).unwrap_err();
        assert_eq!(err, Error::ParSpecific);
    }

    #[test]
    fn validate_field_accepts_in_range() {
        validate_field(FieldParam::new(1, 8), 16, ParamProfile::Icu, None).unwrap();
    }

    #[test]
    fn validate_field_rejects_zero_max_data_bits() {
        let err = validate_field(FieldParam::new(1, 8), 0, ParamProfile::Icu, None).unwrap_err();
        assert_eq!(err, Error::ParMaxUsedBits);
    }

    #[test]
    fn overlap_detects_true_overlap() {
        let buf = vec![0u8; 16];
        let a = &buf[0..10];
        let b = &buf[5..16];
        assert!(buffers_overlap(Some(a), Some(b)));
    }

    #[test]
    fn overlap_rejects_false_positive_on_disjoint_ranges() {
        let buf = vec![0u8; 16];
        let a = &buf[0..4];
        let b = &buf[4..8];
        assert!(!buffers_overlap(Some(a), Some(b)));
    }

    #[test]
    fn buffers_overlap_rejects_model_and_updated_model_aliasing_distinct_buffers() {
        let buf = vec![0u8; 16];
        let model = &buf[0..8];
        let updated = &buf[4..12];
        let err = check_compression_buffers(&[0u8; 4], Some(model), Some(updated), None).unwrap_err();
        assert_eq!(err, Error::ParBuffers);
    }

    #[test]
    fn buffers_overlap_allows_updated_model_aliasing_model_in_place() {
        let buf = vec![0u8; 8];
        check_compression_buffers(&[0u8; 4], Some(&buf), Some(&buf), None).unwrap();
    }

    #[test]
    fn buffers_overlap_rejects_updated_model_without_model() {
        let buf = vec![0u8; 8];
        let err = check_compression_buffers(&[0u8; 4], None, Some(&buf), None).unwrap_err();
        assert_eq!(err, Error::ParNoModel);
    }

    #[test]
    fn raw_entity_header_round_trip() {
        let hdr = EntityHeader {
            entity_size: 36,
            original_size: 14,
            start_timestamp: 0x1122_3344_5566,
            end_timestamp: 0x0000_0000_0001,
            chunk_type: ChunkType::NcamImagette,
            raw: true,
            cmp_mode: CmpMode::Raw,
            model_value: 0,
            model_counter: 0,
            mb_version: 0,
            model_id: 0,
            version_id: 0,
            lossy_par: 0,
            pars: [FieldParam::default(); 6],
        };
        let mut buf = [0u8; GENERIC_HEADER_SIZE];
        hdr.write(&mut buf).unwrap();
        let back = EntityHeader::read(&buf).unwrap();
        assert_eq!(back.entity_size, hdr.entity_size);
        assert_eq!(back.original_size, hdr.original_size);
        assert_eq!(back.start_timestamp, hdr.start_timestamp);
        assert!(back.raw);
    }

    #[test]
    fn non_raw_entity_header_round_trip_with_pars() {
        let mut pars = [FieldParam::default(); 6];
        pars[0] = FieldParam::new(1, 8);
        pars[1] = FieldParam::new(3, 35);
        let hdr = EntityHeader {
            entity_size: 1000,
            original_size: 2000,
            start_timestamp: 5,
            end_timestamp: 9,
            chunk_type: ChunkType::ShortCadence,
            raw: false,
            cmp_mode: CmpMode::ModelMulti,
            model_value: 11,
            model_counter: 3,
            mb_version: 1,
            model_id: 77,
            version_id: 0xDEAD_BEEF,
            lossy_par: 0,
            pars,
        };
        let mut buf = [0u8; NON_IMAGETTE_HEADER_SIZE];
        hdr.write(&mut buf).unwrap();
        let back = EntityHeader::read(&buf).unwrap();
        assert_eq!(back, hdr);
    }

    #[test]
    fn header_slots_pack_short_cadence_fields_in_order() {
        let mut par = CmpPar::default();
        par.s_exp_flags = FieldParam::new(1, 8);
        par.s_fx = FieldParam::new(3, 35);
        let slots = par.header_slots(ChunkType::ShortCadence);
        assert_eq!(slots[0], FieldParam::new(1, 8));
        assert_eq!(slots[1], FieldParam::new(3, 35));
        assert_eq!(slots[5], FieldParam::default());
    }

    #[test]
    fn model_id_setter_patches_in_place() {
        let hdr = EntityHeader {
            entity_size: 100,
            original_size: 100,
            start_timestamp: 0,
            end_timestamp: 0,
            chunk_type: ChunkType::NcamImagette,
            raw: true,
            cmp_mode: CmpMode::Raw,
            model_value: 0,
            model_counter: 0,
            mb_version: 0,
            model_id: 0,
            version_id: 0,
            lossy_par: 0,
            pars: [FieldParam::default(); 6],
        };
        let mut buf = [0u8; GENERIC_HEADER_SIZE];
        hdr.write(&mut buf).unwrap();
        EntityHeader::set_model_id_and_counter(&mut buf, 42, 7).unwrap();
        assert_eq!(buf[22], 7);
        assert_eq!(read_uint(&buf, 24, 2), 42);
    }
}
