//! Bit-exact Golomb/Rice entropy codec for instrument telemetry chunks.
//!
//! Layers one of four pre-processing transforms (raw, 1-D difference,
//! model-zero, model-multi) over Golomb/Rice entropy coding with two
//! escape-symbol disciplines, packs the result into length-prefixed
//! collections, and wraps those in a versioned entity header. See the
//! module list below for the component breakdown; [`compress_chunk`] and
//! [`decompress_entity`] are the two public entry points most callers
//! need.
//!
//! ```text
//! compress_chunk: parse natural chunk layout -> validate pars -> encode
//!                 collections -> entity header -> entity bytes
//! decompress_entity: entity header -> decode collections -> natural
//!                    chunk layout
//! ```

pub mod bitio;
pub mod chunk;
pub mod code;
pub mod collection;
pub mod entity;
pub mod error;
pub mod escape;
pub mod field;
pub mod mapper;
pub mod maxbits;
pub mod model;
pub mod preprocess;
pub mod types;

pub use chunk::ChunkCollection;
pub use entity::{CmpPar, EntityHeader, FieldParam, ParamProfile};
pub use error::{Error, Result};
pub use maxbits::MaxUsedBits;
pub use types::{ChunkType, CmpMode, Record, RecordType};

use bitio::{BitReader, BitWriter};
use collection::COLLECTION_HEADER_SIZE;
use entity::{check_compression_buffers, GENERIC_HEADER_SIZE, NON_IMAGETTE_HEADER_SIZE};
use std::sync::OnceLock;

/// Process-wide timestamp/version hook (§5 "Shared state", §6 "Timestamp &
/// version hook"). Set once via [`init`]; read by every [`compress_chunk`]
/// call that produces a non-RAW-only... actually every call, RAW entities
/// also carry start/end timestamps.
struct ProcessConfig {
    timestamp_fn: fn() -> u64,
    version_id: u32,
}

static PROCESS_CONFIG: OnceLock<ProcessConfig> = OnceLock::new();

/// Configures the process-wide timestamp source and codec version id
/// stamped into every entity header (§5, §6). Must be called once before
/// the first [`compress_chunk`]; later calls are ignored (first writer
/// wins), matching the legacy source's file-scope statics being set once
/// at process init.
pub fn init(timestamp_fn: fn() -> u64, version_id: u32) {
    let _ = PROCESS_CONFIG.set(ProcessConfig { timestamp_fn, version_id });
}

fn process_config() -> Result<&'static ProcessConfig> {
    PROCESS_CONFIG.get().ok_or(Error::EntityTimestamp)
}

/// Upper bound on the compressed size of a chunk with `num_collections`
/// collections and `chunk_size` natural bytes (§6 "Compressed-size
/// bound"). Sizing `dst` to at least this guarantees [`compress_chunk`]
/// never returns [`Error::SmallBuffer`] (§8 Invariant 4).
pub fn compress_chunk_cmp_size_bound(chunk_size: usize, num_collections: usize) -> usize {
    let raw = NON_IMAGETTE_HEADER_SIZE + num_collections * chunk::CMP_COLLECTION_FIELD_SIZE + chunk_size;
    (raw + 3) & !3
}

/// Patches `model_id`/`model_counter` into an already-produced,
/// non-RAW entity header without touching the compressed payload (§6
/// "Model-id setter").
pub fn set_model_id_and_counter(entity: &mut [u8], model_id: u16, model_counter: u8) -> Result<()> {
    EntityHeader::set_model_id_and_counter(entity, model_id, model_counter)
}

/// Compresses one chunk of collections (all sharing `chunk_type`) into
/// `dst`, producing a complete entity (§6 "Compression entry point").
///
/// `chunk` is the natural (uncompressed) byte layout described in §3
/// "Chunk": a sequence of 12-byte collection headers each followed by
/// `header.data_length` bytes of big-endian fields at their natural
/// widths. `chunk_model`, if present, must be the same natural layout and
/// the same length as `chunk` (model modes only). `updated_chunk_model`,
/// if present, receives the updated-model sequence in that same layout
/// and may alias `chunk_model` (in-place update, §3 "Ownership &
/// lifecycle").
///
/// Returns the number of bytes written to `dst` (the entity size).
pub fn compress_chunk(
    chunk: &[u8],
    chunk_type: ChunkType,
    chunk_model: Option<&[u8]>,
    mut updated_chunk_model: Option<&mut [u8]>,
    dst: &mut [u8],
    cmp_par: &CmpPar,
    max_used_bits: &MaxUsedBits,
) -> Result<usize> {
    if chunk.is_empty() {
        return Err(Error::ChunkNull);
    }
    if chunk.len() < COLLECTION_HEADER_SIZE {
        return Err(Error::ChunkSizeInconsistent);
    }
    if chunk.len() > (1 << 24) - 1 - NON_IMAGETTE_HEADER_SIZE {
        return Err(Error::ChunkTooLarge);
    }
    check_compression_buffers(chunk, chunk_model, updated_chunk_model.as_deref(), Some(&dst[..]))?;

    let mode = cmp_par.mode.ok_or(Error::ParGeneric)?;
    if mode.is_model() && chunk_model.is_none() {
        return Err(Error::ParNoModel);
    }
    if let Some(model_bytes) = chunk_model {
        if model_bytes.len() != chunk.len() {
            return Err(Error::CollectionSizeInconsistent);
        }
    }
    if let Some(updated) = updated_chunk_model.as_deref() {
        if updated.len() != chunk.len() {
            return Err(Error::CollectionSizeInconsistent);
        }
        if !mode.is_model() {
            return Err(Error::ParNoModel);
        }
    }

    let collections = chunk::parse_chunk(chunk, chunk_type, cmp_par, max_used_bits)?;
    if !mode.is_raw() {
        for c in &collections {
            collection::validate_schedule(chunk_type, c.record_type, cmp_par, max_used_bits)?;
        }
    }

    let model_collections = match chunk_model {
        Some(model_bytes) => {
            let parsed = chunk::parse_chunk(model_bytes, chunk_type, cmp_par, max_used_bits)?;
            if parsed.len() != collections.len() {
                return Err(Error::CollectionSizeInconsistent);
            }
            Some(parsed)
        }
        None => None,
    };

    let header_size = if mode.is_raw() { GENERIC_HEADER_SIZE } else { NON_IMAGETTE_HEADER_SIZE };
    if dst.len() < header_size {
        return Err(Error::SmallBuffer);
    }

    let (body_bits, updated_records) = {
        let mut writer = BitWriter::new(&mut dst[header_size..]);
        let updated = chunk::encode_chunk(
            &mut writer,
            chunk_type,
            mode,
            cmp_par.lossy_par,
            cmp_par.model_value,
            &collections,
            model_collections.as_deref(),
            cmp_par,
            max_used_bits,
        )?;
        if !mode.is_raw() {
            writer.pad_to_word()?;
        }
        (writer.position(), updated)
    };

    let body_bytes = (body_bits + 7) / 8;
    let entity_size = header_size + body_bytes;
    if entity_size > dst.len() {
        return Err(Error::SmallBuffer);
    }

    let config = process_config()?;
    let header = EntityHeader {
        entity_size: entity_size as u32,
        original_size: chunk.len() as u32,
        start_timestamp: (config.timestamp_fn)(),
        end_timestamp: (config.timestamp_fn)(),
        chunk_type,
        raw: mode.is_raw(),
        cmp_mode: mode,
        model_value: cmp_par.model_value,
        model_counter: 0,
        mb_version: max_used_bits.version as u8,
        model_id: 0,
        version_id: config.version_id,
        lossy_par: cmp_par.lossy_par as u16,
        pars: cmp_par.header_slots(chunk_type),
    };
    header.write(&mut dst[..header_size])?;

    if let Some(updated_buf) = updated_chunk_model.as_deref_mut() {
        let updated_collections: Vec<ChunkCollection> = collections
            .iter()
            .zip(updated_records.into_iter())
            .map(|(c, records)| ChunkCollection {
                header: c.header,
                record_type: c.record_type,
                records,
            })
            .collect();
        let serialized = chunk::serialize_chunk(&updated_collections, chunk_type, cmp_par, max_used_bits)?;
        updated_buf[..serialized.len()].copy_from_slice(&serialized);
    }

    Ok(entity_size)
}

/// Decompresses an entity produced by [`compress_chunk`] (§6
/// "Decompression entry point"). `model_of_data`, if present, must carry
/// the natural chunk layout for the entity's collections (model modes
/// only). If `decompressed_data` is `None`, only the required size is
/// computed (no bytes are written). `updated_model` may alias
/// `model_of_data`.
///
/// Returns the decompressed byte count.
pub fn decompress_entity(
    entity: &[u8],
    model_of_data: Option<&[u8]>,
    mut updated_model: Option<&mut [u8]>,
    mut decompressed_data: Option<&mut [u8]>,
    max_used_bits: &MaxUsedBits,
) -> Result<usize> {
    if entity.is_empty() {
        return Err(Error::EntityNull);
    }
    if entity.len() < GENERIC_HEADER_SIZE {
        return Err(Error::EntityTooSmall);
    }
    check_compression_buffers(entity, model_of_data, updated_model.as_deref(), decompressed_data.as_deref())?;

    let header = EntityHeader::read(entity)?;
    let header_size = header.header_size();
    if entity.len() < header.entity_size as usize || (header.entity_size as usize) < header_size {
        return Err(Error::EntityHeader);
    }
    let mode = header.cmp_mode;

    if mode.is_model() && model_of_data.is_none() {
        return Err(Error::ParNoModel);
    }

    let cmp_par = par_from_header(&header);
    let model_collections = match model_of_data {
        Some(model_bytes) => Some(chunk::parse_chunk(model_bytes, header.chunk_type, &cmp_par, max_used_bits)?),
        None => None,
    };

    let body = &entity[header_size..header.entity_size as usize];
    let mut reader = BitReader::new(body);
    let (collections, updated_records) = chunk::decode_chunk(
        &mut reader,
        header.chunk_type,
        mode,
        header.lossy_par as u8,
        header.model_value,
        body.len() * 8,
        model_collections.as_deref(),
        &cmp_par,
        max_used_bits,
    )?;

    let out_bytes = chunk::serialize_chunk(&collections, header.chunk_type, &cmp_par, max_used_bits)?;
    if out_bytes.len() != header.original_size as usize {
        return Err(Error::ChunkSizeInconsistent);
    }

    if let Some(dst) = decompressed_data.as_deref_mut() {
        if dst.len() < out_bytes.len() {
            return Err(Error::SmallBuffer);
        }
        dst[..out_bytes.len()].copy_from_slice(&out_bytes);
    }

    if let Some(updated_buf) = updated_model.as_deref_mut() {
        if !mode.is_model() {
            return Err(Error::ParNoModel);
        }
        let updated_collections: Vec<ChunkCollection> = collections
            .iter()
            .zip(updated_records.into_iter())
            .map(|(c, records)| ChunkCollection {
                header: c.header,
                record_type: c.record_type,
                records,
            })
            .collect();
        let serialized = chunk::serialize_chunk(&updated_collections, header.chunk_type, &cmp_par, max_used_bits)?;
        if updated_buf.len() < serialized.len() {
            return Err(Error::SmallBuffer);
        }
        updated_buf[..serialized.len()].copy_from_slice(&serialized);
    }

    Ok(out_bytes.len())
}

/// Rebuilds a [`CmpPar`] shell carrying only the six generic
/// `(cmp_par, spill)` pairs embedded in `header`, slotted back into the
/// same per-field positions [`CmpPar::header_slots`] would have packed
/// them from (inverse of that mapping). `mode`/`model_value`/`lossy_par`
/// are also copied, since downstream decode helpers read them off the
/// same struct.
fn par_from_header(header: &EntityHeader) -> CmpPar {
    let mut par = CmpPar {
        mode: Some(header.cmp_mode),
        model_value: header.model_value,
        lossy_par: header.lossy_par as u8,
        ..CmpPar::default()
    };
    let slots = header.pars;
    match header.chunk_type {
        ChunkType::NcamImagette => par.nc_imagette = slots[0],
        ChunkType::SatImagette => par.sat_imagette = slots[0],
        ChunkType::ShortCadence => {
            par.s_exp_flags = slots[0];
            par.s_fx = slots[1];
            par.s_ncob = slots[2];
            par.s_efx = slots[3];
            par.s_ecob = slots[4];
        }
        ChunkType::LongCadence => {
            par.l_exp_flags = slots[0];
            par.l_fx = slots[1];
            par.l_ncob = slots[2];
            par.l_efx = slots[3];
            par.l_ecob = slots[4];
            par.l_fx_cob_variance = slots[5];
        }
        ChunkType::FastCadence => {
            par.f_fx = slots[0];
            par.f_ncob = slots[1];
            par.f_efx = slots[2];
            par.f_ecob = slots[3];
        }
        ChunkType::OffsetBackground => {
            par.nc_offset_mean = slots[0];
            par.nc_offset_variance = slots[1];
            par.nc_background_mean = slots[2];
            par.nc_background_variance = slots[3];
            par.nc_background_outlier_pixels = slots[4];
        }
        ChunkType::Smearing => {
            par.smearing_mean = slots[0];
            par.smearing_variance_mean = slots[1];
            par.smearing_outlier_pixels = slots[2];
        }
        ChunkType::FChain => {
            par.fc_imagette = slots[0];
            par.fc_offset_mean = slots[1];
            par.fc_offset_variance = slots[2];
            par.fc_background_mean = slots[3];
            par.fc_background_variance = slots[4];
            par.fc_background_outlier_pixels = slots[5];
        }
    }
    par
}
