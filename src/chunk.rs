//! Chunk walker (C9): iterates collections sharing one chunk-type family,
//! copies each 12-byte collection header verbatim, and reserves/fills the
//! 16-bit compressed-collection-length field that lets the decoder find
//! collection boundaries without re-parsing codewords (§4.8).
//!
//! **Resolved interpretive decision** (no test vector pins this, see
//! DESIGN.md): the per-collection raw fallback of §4.8(c) is recorded by
//! reserving the top bit of the 16-bit length field as a raw flag, rather
//! than by the decoder re-deriving the choice from the byte count alone —
//! a compressed collection can coincidentally land on the same byte count
//! as its raw form, which would make the length field ambiguous on its
//! own.

use crate::bitio::{BitReader, BitWriter};
use crate::collection::{self, CollectionHeader, COLLECTION_HEADER_SIZE};
use crate::entity::CmpPar;
use crate::maxbits::MaxUsedBits;
use crate::types::{ChunkType, CmpMode, Record, RecordType};
use crate::{Error, Result};

/// Size of the per-collection compressed-length prefix written by the
/// chunk walker (§6 "`num_collections * CMP_COLLECTION_FIELD_SIZE`").
pub const CMP_COLLECTION_FIELD_SIZE: usize = 2;

const RAW_FLAG: u16 = 0x8000;
const LENGTH_MASK: u16 = 0x7FFF;

/// One parsed collection: its header, subservice, and decoded records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCollection {
    pub header: CollectionHeader,
    pub record_type: RecordType,
    pub records: Vec<Record>,
}

/// Parses `chunk`'s natural (uncompressed) byte layout into a sequence of
/// collections: 12-byte header, then `header.data_length` bytes of
/// big-endian fields at their natural widths (the same layout RAW mode
/// produces). This is the source format `compress_chunk` consumes and
/// `decompress_entity` reconstructs (§3 "Chunk", §6).
pub fn parse_chunk(chunk: &[u8], chunk_type: ChunkType, par: &CmpPar, mb: &MaxUsedBits) -> Result<Vec<ChunkCollection>> {
    let mut collections = Vec::new();
    let mut offset = 0usize;
    while offset < chunk.len() {
        if chunk.len() - offset < COLLECTION_HEADER_SIZE {
            return Err(Error::ChunkSizeInconsistent);
        }
        let header = CollectionHeader::read(&chunk[offset..])?;
        let record_type = header.subservice().ok_or(Error::ChunkSubserviceInconsistent)?;
        let n_records = collection::record_count_for_payload_len(header.data_length, chunk_type, record_type, par, mb)
            .map_err(|_| Error::ChunkSubserviceInconsistent)?;

        let body_start = offset + COLLECTION_HEADER_SIZE;
        let body_end = body_start + header.data_length as usize;
        if body_end > chunk.len() {
            return Err(Error::ChunkSizeInconsistent);
        }

        let mut reader = BitReader::new(&chunk[body_start..body_end]);
        let (records, _) = collection::decode_records(
            &mut reader,
            chunk_type,
            CmpMode::Raw,
            0,
            0,
            n_records,
            record_type,
            None,
            par,
            mb,
        )?;

        collections.push(ChunkCollection { header, record_type, records });
        offset = body_end;
    }
    Ok(collections)
}

/// Re-serializes parsed collections back into the natural byte layout
/// `parse_chunk` reads, for the decoder's final chunk reconstruction.
pub fn serialize_chunk(collections: &[ChunkCollection], chunk_type: ChunkType, par: &CmpPar, mb: &MaxUsedBits) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for c in collections {
        let mut hdr_buf = [0u8; COLLECTION_HEADER_SIZE];
        c.header.write(&mut hdr_buf)?;
        out.extend_from_slice(&hdr_buf);

        let mut scratch = vec![0u8; raw_scratch_len(c.records.len(), c.record_type)?];
        let written_bits = {
            let mut w = BitWriter::new(&mut scratch);
            collection::encode_records(&mut w, chunk_type, CmpMode::Raw, 0, 0, &c.records, None, par, mb)?;
            w.position()
        };
        let written_bytes = (written_bits + 7) / 8;
        out.extend_from_slice(&scratch[..written_bytes]);
    }
    Ok(out)
}

/// A generous upper bound on a collection's raw-encoded byte size: one
/// 32-bit word per field per record, plus slack. Raw fields never exceed
/// 32 bits, and this is just a scratch-buffer size, not a wire constant.
fn raw_scratch_len(n_records: usize, record_type: RecordType) -> Result<usize> {
    Ok(n_records * record_type.field_count() * 4 + 16)
}

/// Compresses `collections` (all sharing `chunk_type`) into `writer`,
/// reserving and filling each collection's length prefix and falling back
/// to a raw re-emission for any collection that doesn't fit the attempted
/// compressed encoding (§4.8, §4.11's `RawFallback` state). Returns the
/// per-collection updated-model sequence (empty entries for non-model
/// collections).
#[allow(clippy::too_many_arguments)]
pub fn encode_chunk(
    writer: &mut BitWriter,
    chunk_type: ChunkType,
    mode: CmpMode,
    lossy_par: u8,
    model_value: u8,
    collections: &[ChunkCollection],
    chunk_model: Option<&[ChunkCollection]>,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<Vec<Vec<Record>>> {
    if let Some(model) = chunk_model {
        if model.len() != collections.len() {
            return Err(Error::CollectionSizeInconsistent);
        }
    }

    let mut updated = Vec::with_capacity(collections.len());
    for (i, c) in collections.iter().enumerate() {
        let model_records = chunk_model.map(|m| &m[i]);
        if let Some(m) = model_records {
            if m.header.collection_id != c.header.collection_id || m.records.len() != c.records.len() {
                return Err(Error::CollectionSizeInconsistent);
            }
        }

        let (payload, is_raw, updated_model) = if mode.is_raw() {
            let mut scratch = vec![0u8; raw_scratch_len(c.records.len(), c.record_type)?];
            let bits = {
                let mut w = BitWriter::new(&mut scratch);
                collection::encode_records(&mut w, chunk_type, CmpMode::Raw, 0, 0, &c.records, None, par, mb)?;
                w.position()
            };
            (scratch[..(bits + 7) / 8].to_vec(), true, Vec::new())
        } else {
            try_compress_one(
                chunk_type,
                mode,
                lossy_par,
                model_value,
                c,
                model_records.map(|m| m.records.as_slice()),
                par,
                mb,
            )?
        };

        let mut hdr_buf = [0u8; COLLECTION_HEADER_SIZE];
        c.header.write(&mut hdr_buf)?;

        let len = payload.len();
        if len > LENGTH_MASK as usize {
            return Err(Error::ChunkTooLarge);
        }
        let len_field = len as u16 | if is_raw { RAW_FLAG } else { 0 };
        writer.put_bits(len_field as u32, 16)?;
        for &b in &hdr_buf {
            writer.put_bits(b as u32, 8)?;
        }
        for &b in &payload {
            writer.put_bits(b as u32, 8)?;
        }

        updated.push(updated_model);
    }
    Ok(updated)
}

#[allow(clippy::too_many_arguments)]
fn try_compress_one(
    chunk_type: ChunkType,
    mode: CmpMode,
    lossy_par: u8,
    model_value: u8,
    c: &ChunkCollection,
    model: Option<&[Record]>,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<(Vec<u8>, bool, Vec<Record>)> {
    let budget_bytes = raw_scratch_len(c.records.len(), c.record_type)?;
    let mut scratch = vec![0u8; budget_bytes];
    let attempt = {
        let mut w = BitWriter::new(&mut scratch);
        let updated = collection::encode_records(&mut w, chunk_type, mode, lossy_par, model_value, &c.records, model, par, mb);
        updated.map(|u| (w.position(), u))
    };

    match attempt {
        Ok((bits, updated_model)) => {
            let bytes = (bits + 7) / 8;
            Ok((scratch[..bytes].to_vec(), false, updated_model))
        }
        Err(Error::SmallBuffer) => {
            let mut raw_scratch = vec![0u8; raw_scratch_len(c.records.len(), c.record_type)?];
            let bits = {
                let mut w = BitWriter::new(&mut raw_scratch);
                collection::encode_records(&mut w, chunk_type, CmpMode::Raw, 0, 0, &c.records, None, par, mb)?;
                w.position()
            };
            Ok((raw_scratch[..(bits + 7) / 8].to_vec(), true, Vec::new()))
        }
        Err(e) => Err(e),
    }
}

/// Decodes a compressed chunk payload back into collections (§4.8
/// "Decode mirrors"). Unlike [`encode_chunk`], the decoder needs no
/// out-of-band list of expected headers: each collection is
/// self-describing on the wire (length prefix, then the collection header
/// copied verbatim, whose `collection_id`/`data_length` give the
/// subservice and record count via
/// [`collection::record_count_for_payload_len`]). The walk stops once
/// `compressed_bits` bits have been consumed, mirroring the chunk-level
/// byte budget the caller derives from the entity header's sizes.
#[allow(clippy::too_many_arguments)]
pub fn decode_chunk(
    reader: &mut BitReader,
    chunk_type: ChunkType,
    mode: CmpMode,
    lossy_par: u8,
    model_value: u8,
    compressed_bits: usize,
    chunk_model: Option<&[ChunkCollection]>,
    par: &CmpPar,
    mb: &MaxUsedBits,
) -> Result<(Vec<ChunkCollection>, Vec<Vec<Record>>)> {
    let start = reader.position();
    let mut out = Vec::new();
    let mut updated_all = Vec::new();
    let mut i = 0usize;

    while reader.position() - start < compressed_bits {
        let len_field = reader.get_bits(16)?;
        let is_raw = len_field & RAW_FLAG != 0;
        let len = (len_field & LENGTH_MASK) as usize;

        let mut hdr_bytes = [0u8; COLLECTION_HEADER_SIZE];
        for b in hdr_bytes.iter_mut() {
            *b = reader.get_bits(8)? as u8;
        }
        let header = CollectionHeader::read(&hdr_bytes)?;
        let record_type = header.subservice().ok_or(Error::ChunkSubserviceInconsistent)?;
        let n_records = collection::record_count_for_payload_len(header.data_length, chunk_type, record_type, par, mb)?;

        let mut payload = vec![0u8; len];
        for b in payload.iter_mut() {
            *b = reader.get_bits(8)? as u8;
        }

        let model_records = chunk_model.and_then(|m| m.get(i)).map(|c| c.records.as_slice());
        if chunk_model.is_some() && model_records.is_none() {
            return Err(Error::CollectionSizeInconsistent);
        }

        let mut body_reader = BitReader::new(&payload);
        let (records, updated_model) = if is_raw {
            let (r, _) = collection::decode_records(
                &mut body_reader,
                chunk_type,
                CmpMode::Raw,
                0,
                0,
                n_records,
                record_type,
                None,
                par,
                mb,
            )?;
            (r, Vec::new())
        } else {
            collection::decode_records(
                &mut body_reader,
                chunk_type,
                mode,
                lossy_par,
                model_value,
                n_records,
                record_type,
                model_records,
                par,
                mb,
            )?
        };

        out.push(ChunkCollection {
            header,
            record_type,
            records,
        });
        updated_all.push(updated_model);
        i += 1;
    }

    if let Some(model) = chunk_model {
        if model.len() != out.len() {
            return Err(Error::CollectionSizeInconsistent);
        }
    }

    Ok((out, updated_all))
}
