//! Collection dispatcher (C8): the 12-byte collection header, the
//! per-subservice field schedule, and the field-by-field encode/decode
//! drive.
//!
//! Model-mode fields are paired against the caller-supplied model array
//! **by index**, not chained within the call (§4.5, confirmed against
//! seed scenario C: `updated_model[i]` is a function of `(data[i],
//! model[i])` alone). Diff-mode fields instead chain against the
//! *previous row's data* within this call, since there is no external
//! model buffer for 1D-diff.

use crate::bitio::{BitReader, BitWriter};
use crate::entity::{validate_field, CmpPar, FieldParam, ParamProfile};
use crate::field::{decode_value, encode_value, FieldSetup};
use crate::maxbits::MaxUsedBits;
use crate::model::update_model;
use crate::types::{ChunkType, CmpMode, Record, RecordType};
use crate::{Error, Result};

/// Fixed 12-byte collection header (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionHeader {
    pub timestamp: u64,
    pub config_id: u16,
    pub collection_id: u16,
    pub data_length: u16,
}

pub const COLLECTION_HEADER_SIZE: usize = 12;

impl CollectionHeader {
    pub fn subservice(&self) -> Option<RecordType> {
        RecordType::from_u8((self.collection_id & 0xFF) as u8)
    }

    pub fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < COLLECTION_HEADER_SIZE {
            return Err(Error::ColSizeInconsistent);
        }
        let mut timestamp: u64 = 0;
        for &b in &buf[0..6] {
            timestamp = (timestamp << 8) | b as u64;
        }
        let config_id = u16::from_be_bytes([buf[6], buf[7]]);
        let collection_id = u16::from_be_bytes([buf[8], buf[9]]);
        let data_length = u16::from_be_bytes([buf[10], buf[11]]);
        Ok(CollectionHeader {
            timestamp,
            config_id,
            collection_id,
            data_length,
        })
    }

    pub fn write(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < COLLECTION_HEADER_SIZE {
            return Err(Error::SmallBuffer);
        }
        for i in 0..6 {
            buf[i] = ((self.timestamp >> ((5 - i) * 8)) & 0xFF) as u8;
        }
        buf[6..8].copy_from_slice(&self.config_id.to_be_bytes());
        buf[8..10].copy_from_slice(&self.collection_id.to_be_bytes());
        buf[10..12].copy_from_slice(&self.data_length.to_be_bytes());
        Ok(())
    }
}

/// Per-field `(cmp_par, spill, max_data_bits)` for one record type under
/// one chunk type, in the same column order as [`Record::to_columns`]
/// (§4.7).
pub(crate) fn schedule_for(chunk_type: ChunkType, record_type: RecordType, par: &CmpPar, mb: &MaxUsedBits) -> Result<Vec<(FieldParam, u32)>> {
    use ChunkType::*;
    use RecordType::*;

    let sched = match (chunk_type, record_type) {
        (NcamImagette, Imagette) => vec![(par.nc_imagette, mb.nc_imagette)],
        (SatImagette, Imagette) => vec![(par.sat_imagette, mb.sat_imagette)],
        (FChain, Imagette) => vec![(par.fc_imagette, mb.fc_imagette)],

        (ShortCadence, SFx) => vec![(par.s_exp_flags, mb.s_exp_flags), (par.s_fx, mb.s_fx)],
        (ShortCadence, SFxEfx) => vec![
            (par.s_exp_flags, mb.s_exp_flags),
            (par.s_fx, mb.s_fx),
            (par.s_efx, mb.s_efx),
        ],
        (ShortCadence, SFxNcob) => vec![
            (par.s_exp_flags, mb.s_exp_flags),
            (par.s_fx, mb.s_fx),
            (par.s_ncob, mb.s_ncob),
            (par.s_ncob, mb.s_ncob),
        ],
        (ShortCadence, SFxEfxNcobEcob) => vec![
            (par.s_exp_flags, mb.s_exp_flags),
            (par.s_fx, mb.s_fx),
            (par.s_ncob, mb.s_ncob),
            (par.s_ncob, mb.s_ncob),
            (par.s_efx, mb.s_efx),
            (par.s_ecob, mb.s_ecob),
            (par.s_ecob, mb.s_ecob),
        ],

        (LongCadence, LFx) => vec![
            (par.l_exp_flags, mb.l_exp_flags),
            (par.l_fx, mb.l_fx),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
        ],
        (LongCadence, LFxEfx) => vec![
            (par.l_exp_flags, mb.l_exp_flags),
            (par.l_fx, mb.l_fx),
            (par.l_efx, mb.l_efx),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
        ],
        (LongCadence, LFxNcob) => vec![
            (par.l_exp_flags, mb.l_exp_flags),
            (par.l_fx, mb.l_fx),
            (par.l_ncob, mb.l_ncob),
            (par.l_ncob, mb.l_ncob),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
        ],
        (LongCadence, LFxEfxNcobEcob) => vec![
            (par.l_exp_flags, mb.l_exp_flags),
            (par.l_fx, mb.l_fx),
            (par.l_ncob, mb.l_ncob),
            (par.l_ncob, mb.l_ncob),
            (par.l_efx, mb.l_efx),
            (par.l_ecob, mb.l_ecob),
            (par.l_ecob, mb.l_ecob),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
            (par.l_fx_cob_variance, mb.l_fx_cob_variance),
        ],

        (FastCadence, FFx) => vec![(par.f_fx, mb.f_fx)],
        (FastCadence, FFxEfx) => vec![(par.f_fx, mb.f_fx), (par.f_efx, mb.f_efx)],
        (FastCadence, FFxNcob) => vec![
            (par.f_fx, mb.f_fx),
            (par.f_ncob, mb.f_ncob),
            (par.f_ncob, mb.f_ncob),
        ],
        (FastCadence, FFxEfxNcobEcob) => vec![
            (par.f_fx, mb.f_fx),
            (par.f_ncob, mb.f_ncob),
            (par.f_ncob, mb.f_ncob),
            (par.f_efx, mb.f_efx),
            (par.f_ecob, mb.f_ecob),
            (par.f_ecob, mb.f_ecob),
        ],

        (OffsetBackground, Offset) => vec![(par.nc_offset_mean, mb.nc_offset_mean), (par.nc_offset_variance, mb.nc_offset_variance)],
        (OffsetBackground, Background) => vec![
            (par.nc_background_mean, mb.nc_background_mean),
            (par.nc_background_variance, mb.nc_background_variance),
            (par.nc_background_outlier_pixels, mb.nc_background_outlier_pixels),
        ],
        (FChain, Offset) => vec![(par.fc_offset_mean, mb.nc_offset_mean), (par.fc_offset_variance, mb.nc_offset_variance)],
        (FChain, Background) => vec![
            (par.fc_background_mean, mb.nc_background_mean),
            (par.fc_background_variance, mb.nc_background_variance),
            (par.fc_background_outlier_pixels, mb.nc_background_outlier_pixels),
        ],

        (Smearing, Smearing) => vec![
            (par.smearing_mean, mb.smearing_mean),
            (par.smearing_variance_mean, mb.smearing_variance_mean),
            (par.smearing_outlier_pixels, mb.smearing_outlier_pixels),
        ],

        _ => return Err(Error::ColSubserviceUnsupported),
    };
    Ok(sched)
}

/// Stricter-of-two-bounds cap recorded for the L_FX `exp_flags` slot
/// (SPEC_FULL.md §D.1, Open Question 1): the legacy source validates that
/// one field against `MAX_NON_IMA_SPILL` rather than the derived
/// `cmp_icu_max_spill`. Both bounds are enforced here; this is the fixed
/// legacy constant, sized to the entity header's 3-byte spill field.
const MAX_NON_IMA_SPILL: u32 = (1 << 24) - 1;

/// Validates every field `(chunk_type, record_type)` uses against the ICU
/// parameter profile (§4.10), including the extra cap noted above for the
/// affected L_FX field.
pub fn validate_schedule(chunk_type: ChunkType, record_type: RecordType, par: &CmpPar, mb: &MaxUsedBits) -> Result<()> {
    let schedule = schedule_for(chunk_type, record_type, par, mb)?;
    let l_fx_exp_flags_slot = chunk_type == ChunkType::LongCadence;
    for (idx, (field_param, max_bits)) in schedule.iter().enumerate() {
        let extra_cap = if l_fx_exp_flags_slot && idx == 0 {
            Some(MAX_NON_IMA_SPILL)
        } else {
            None
        };
        validate_field(*field_param, *max_bits, ParamProfile::Icu, extra_cap)?;
    }
    Ok(())
}

/// Raw per-field byte width (ceil to a whole byte), matching raw mode's
/// "copy byte-exactly ... converting to big-endian per field width"
/// (§4.5).
fn raw_field_bytes(max_data_bits: u32) -> usize {
    ((max_data_bits as usize) + 7) / 8
}

fn write_be_field(writer: &mut BitWriter, value: u32, max_data_bits: u32) -> Result<()> {
    let bytes = raw_field_bytes(max_data_bits);
    writer.put_bits(value, (bytes * 8) as u32)
}

fn read_be_field(reader: &mut BitReader, max_data_bits: u32) -> Result<u32> {
    let bytes = raw_field_bytes(max_data_bits);
    reader.get_bits((bytes * 8) as u32)
}

/// Encodes `data` (and, for model modes, pairs it with `model`) into
/// `writer`, driving every field of every record through [`FieldSetup`].
/// Returns the per-sample updated-model sequence for model modes (empty
/// for raw/diff modes, which have no externally meaningful model output).
#[allow(clippy::too_many_arguments)]
pub fn encode_records(
    writer: &mut BitWriter,
    chunk_type: ChunkType,
    mode: CmpMode,
    lossy_par: u8,
    model_value: u8,
    data: &[Record],
    model: Option<&[Record]>,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<Vec<Record>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let record_type = data[0].record_type();
    let schedule = schedule_for(chunk_type, record_type, par, mb)?;

    if mode.is_raw() {
        for rec in data {
            let cols = rec.to_columns();
            for (col, &(_, max_bits)) in cols.iter().zip(schedule.iter()) {
                write_be_field(writer, *col, max_bits)?;
            }
        }
        return Ok(Vec::new());
    }

    if mode.is_model() && model.is_none() {
        return Err(Error::ParNoModel);
    }
    if let Some(m) = model {
        if m.len() != data.len() {
            return Err(Error::CollectionSizeInconsistent);
        }
    }

    let n_cols = schedule.len();
    let mut updated_model_cols = vec![vec![0u32; data.len()]; n_cols];

    for (i, rec) in data.iter().enumerate() {
        if rec.record_type() != record_type {
            return Err(Error::DataTypeUnsupported);
        }
        let cols = rec.to_columns();
        for (col_idx, (&value, &(field_param, max_bits))) in cols.iter().zip(schedule.iter()).enumerate() {
            let model_for_row = if mode.is_model() {
                model.unwrap()[i].to_columns()[col_idx]
            } else if i == 0 {
                0
            } else {
                data[i - 1].to_columns()[col_idx]
            };
            let setup = FieldSetup::new(mode, field_param.cmp_par, field_param.spill, lossy_par, max_bits);
            encode_value(writer, value, model_for_row, &setup)?;
            if mode.is_model() {
                updated_model_cols[col_idx][i] = update_model(value, model_for_row, model_value);
            }
        }
    }

    if !mode.is_model() {
        return Ok(Vec::new());
    }
    let mut updated = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        let cols: Vec<u32> = (0..n_cols).map(|c| updated_model_cols[c][i]).collect();
        updated.push(Record::from_columns(record_type, &cols).ok_or(Error::DataTypeUnsupported)?);
    }
    Ok(updated)
}

/// Inverse of [`encode_records`]. `n_records` must be supplied by the
/// caller (or derived from the collection header's declared payload
/// length, see [`record_count_for_payload_len`]) since a compressed
/// payload carries no explicit record count.
#[allow(clippy::too_many_arguments)]
pub fn decode_records(
    reader: &mut BitReader,
    chunk_type: ChunkType,
    mode: CmpMode,
    lossy_par: u8,
    model_value: u8,
    n_records: usize,
    record_type: RecordType,
    model: Option<&[Record]>,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<(Vec<Record>, Vec<Record>)> {
    if n_records == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let schedule = schedule_for(chunk_type, record_type, par, mb)?;
    let n_cols = schedule.len();

    if mode.is_raw() {
        let mut out = Vec::with_capacity(n_records);
        for _ in 0..n_records {
            let mut cols = Vec::with_capacity(n_cols);
            for &(_, max_bits) in &schedule {
                cols.push(read_be_field(reader, max_bits)?);
            }
            out.push(Record::from_columns(record_type, &cols).ok_or(Error::DataTypeUnsupported)?);
        }
        return Ok((out, Vec::new()));
    }

    if mode.is_model() && model.is_none() {
        return Err(Error::ParNoModel);
    }
    if let Some(m) = model {
        if m.len() != n_records {
            return Err(Error::CollectionSizeInconsistent);
        }
    }

    let mut data_cols = vec![vec![0u32; n_records]; n_cols];
    let mut updated_model_cols = vec![vec![0u32; n_records]; n_cols];

    for i in 0..n_records {
        for col_idx in 0..n_cols {
            let (field_param, max_bits) = schedule[col_idx];
            let model_for_row = if mode.is_model() {
                model.unwrap()[i].to_columns()[col_idx]
            } else if i == 0 {
                0
            } else {
                data_cols[col_idx][i - 1]
            };
            let setup = FieldSetup::new(mode, field_param.cmp_par, field_param.spill, lossy_par, max_bits);
            let value = decode_value(reader, model_for_row, &setup)?;
            data_cols[col_idx][i] = value;
            if mode.is_model() {
                updated_model_cols[col_idx][i] = update_model(value, model_for_row, model_value);
            }
        }
    }

    let mut data = Vec::with_capacity(n_records);
    let mut updated = Vec::with_capacity(n_records);
    for i in 0..n_records {
        let cols: Vec<u32> = (0..n_cols).map(|c| data_cols[c][i]).collect();
        data.push(Record::from_columns(record_type, &cols).ok_or(Error::DataTypeUnsupported)?);
        if mode.is_model() {
            let ucols: Vec<u32> = (0..n_cols).map(|c| updated_model_cols[c][i]).collect();
            updated.push(Record::from_columns(record_type, &ucols).ok_or(Error::DataTypeUnsupported)?);
        }
    }
    Ok((data, updated))
}

/// Derives the record count from a collection header's declared
/// (uncompressed) payload length, using the schedule's raw byte width
/// (§4.10 "`data_length` not a multiple of record size" -> `Error`).
pub fn record_count_for_payload_len(
    data_length: u16,
    chunk_type: ChunkType,
    record_type: RecordType,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<usize> {
    let schedule = schedule_for(chunk_type, record_type, par, mb)?;
    let record_bytes: usize = schedule.iter().map(|&(_, max_bits)| raw_field_bytes(max_bits)).sum();
    if record_bytes == 0 {
        return Err(Error::CollectionSizeInconsistent);
    }
    let len = data_length as usize;
    if len % record_bytes != 0 {
        return Err(Error::CollectionSizeInconsistent);
    }
    Ok(len / record_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maxbits::VERSION_1;
    use crate::types::SFx;

    #[test]
    fn header_round_trip() {
        let hdr = CollectionHeader {
            timestamp: 0x0102_0304_0506,
            config_id: 7,
            collection_id: 0x0100 | RecordType::SFx.as_u8() as u16,
            data_length: 12,
        };
        let mut buf = [0u8; COLLECTION_HEADER_SIZE];
        hdr.write(&mut buf).unwrap();
        let back = CollectionHeader::read(&buf).unwrap();
        assert_eq!(back, hdr);
        assert_eq!(back.subservice(), Some(RecordType::SFx));
    }

    #[test]
    fn raw_round_trip_imagette() {
        let par = CmpPar::default();
        let mb = VERSION_1;
        let data: Vec<Record> = [0x0000u32, 0x0001, 0x0023, 0x0042, 0x8000, 0x7FFF, 0xFFFF]
            .into_iter()
            .map(Record::Imagette)
            .collect();
        let mut buf = [0u8; 32];
        {
            let mut w = BitWriter::new(&mut buf);
            encode_records(&mut w, ChunkType::NcamImagette, CmpMode::Raw, 0, 0, &data, None, &par, &mb).unwrap();
        }
        let mut r = BitReader::new(&buf);
        let (decoded, _) = decode_records(
            &mut r,
            ChunkType::NcamImagette,
            CmpMode::Raw,
            0,
            0,
            data.len(),
            RecordType::Imagette,
            None,
            &par,
            &mb,
        )
        .unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn model_multi_round_trip_s_fx() {
        let mut par = CmpPar::default();
        par.s_exp_flags = FieldParam::new(1, 8);
        par.s_fx = FieldParam::new(3, 35);
        let mb = VERSION_1;

        let data = vec![
            Record::SFx(SFx { exp_flags: 0, fx: 0 }),
            Record::SFx(SFx { exp_flags: 1, fx: 1 }),
            Record::SFx(SFx { exp_flags: 2, fx: 0x23 }),
            Record::SFx(SFx { exp_flags: 3, fx: 0x42 }),
            Record::SFx(SFx {
                exp_flags: 0,
                fx: 0x001F_FFFF,
            }),
            Record::SFx(SFx { exp_flags: 0, fx: 0 }),
        ];
        let model = vec![
            Record::SFx(SFx { exp_flags: 0, fx: 0 }),
            Record::SFx(SFx { exp_flags: 3, fx: 1 }),
            Record::SFx(SFx { exp_flags: 0, fx: 0x42 }),
            Record::SFx(SFx { exp_flags: 0, fx: 0x23 }),
            Record::SFx(SFx { exp_flags: 3, fx: 0 }),
            Record::SFx(SFx {
                exp_flags: 2,
                fx: 0x001F_FFFF,
            }),
        ];

        let mut buf = [0u8; 64];
        let updated = {
            let mut w = BitWriter::new(&mut buf);
            encode_records(
                &mut w,
                ChunkType::ShortCadence,
                CmpMode::ModelMulti,
                0,
                11,
                &data,
                Some(&model),
                &par,
                &mb,
            )
            .unwrap()
        };
        assert_eq!(
            updated[..3],
            [
                Record::SFx(SFx { exp_flags: 0, fx: 0 }),
                Record::SFx(SFx { exp_flags: 2, fx: 1 }),
                Record::SFx(SFx { exp_flags: 0, fx: 0x38 }),
            ]
        );

        let mut r = BitReader::new(&buf);
        let (decoded, redecoded_updated) = decode_records(
            &mut r,
            ChunkType::ShortCadence,
            CmpMode::ModelMulti,
            0,
            11,
            data.len(),
            RecordType::SFx,
            Some(&model),
            &par,
            &mb,
        )
        .unwrap();
        assert_eq!(decoded, data);
        assert_eq!(redecoded_updated, updated);
    }

    #[test]
    fn validate_schedule_accepts_valid_pars() {
        let mut par = CmpPar::default();
        par.s_exp_flags = FieldParam::new(1, 8);
        par.s_fx = FieldParam::new(3, 35);
        let mb = VERSION_1;
        validate_schedule(ChunkType::ShortCadence, RecordType::SFx, &par, &mb).unwrap();
    }

    #[test]
    fn validate_schedule_rejects_spill_too_small() {
        let mut par = CmpPar::default();
        par.nc_imagette = FieldParam::new(1, 1);
        let mb = VERSION_1;
        let err = validate_schedule(ChunkType::NcamImagette, RecordType::Imagette, &par, &mb).unwrap_err();
        assert_eq!(err, Error::ParSpecific);
    }

    #[test]
    fn unsupported_chunk_record_combo_is_rejected() {
        let par = CmpPar::default();
        let mb = VERSION_1;
        let err = schedule_for(ChunkType::Smearing, RecordType::SFx, &par, &mb).unwrap_err();
        assert_eq!(err, Error::ColSubserviceUnsupported);
    }

    #[test]
    fn record_count_rejects_non_multiple_length() {
        let par = CmpPar::default();
        let mb = VERSION_1;
        let err = record_count_for_payload_len(15, ChunkType::NcamImagette, RecordType::Imagette, &par, &mb).unwrap_err();
        assert_eq!(err, Error::CollectionSizeInconsistent);
    }

    #[test]
    fn record_count_computes_from_payload_length() {
        let par = CmpPar::default();
        let mb = VERSION_1;
        let n = record_count_for_payload_len(14, ChunkType::NcamImagette, RecordType::Imagette, &par, &mb).unwrap();
        assert_eq!(n, 7);
    }
}
