//! Compresses and decompresses a single imagette chunk end to end, printing
//! the entity size achieved for each compression mode. Mirrors the shape of
//! the seed scenarios in spec.md §8 without pinning their exact bit output.

use plato_cmp::{
    collection::CollectionHeader, compress_chunk, compress_chunk_cmp_size_bound, decompress_entity, init, maxbits::VERSION_1,
    types::RecordType, ChunkType, CmpMode, CmpPar, FieldParam,
};

fn imagette_chunk_bytes(samples: &[u16]) -> Vec<u8> {
    let hdr = CollectionHeader {
        timestamp: 0,
        config_id: 0,
        collection_id: RecordType::Imagette.as_u8() as u16,
        data_length: (samples.len() * 2) as u16,
    };
    let mut out = vec![0u8; 12];
    hdr.write(&mut out).unwrap();
    for &s in samples {
        out.extend_from_slice(&s.to_be_bytes());
    }
    out
}

fn timestamp() -> u64 {
    0
}

fn main() {
    init(timestamp, 1);

    let samples: [u16; 7] = [0x0000, 0x0001, 0x0023, 0x0042, 0x8000, 0x7FFF, 0xFFFF];
    let chunk = imagette_chunk_bytes(&samples);
    let mb = VERSION_1;

    for (label, mode, nc_imagette) in [
        ("raw", CmpMode::Raw, FieldParam::default()),
        ("1D-diff, zero-escape", CmpMode::DiffZero, FieldParam::new(1, 8)),
        ("1D-diff, multi-escape", CmpMode::DiffMulti, FieldParam::new(1, 8)),
    ] {
        let mut par = CmpPar::default();
        par.mode = Some(mode);
        par.nc_imagette = nc_imagette;

        let bound = compress_chunk_cmp_size_bound(chunk.len(), 1);
        let mut dst = vec![0u8; bound];
        let written = compress_chunk(&chunk, ChunkType::NcamImagette, None, None, &mut dst, &par, &mb)
            .expect("compression failed");

        let mut out = vec![0u8; chunk.len()];
        let decompressed_len = decompress_entity(&dst[..written], None, None, Some(&mut out), &mb)
            .expect("decompression failed");
        assert_eq!(out[..decompressed_len], chunk[..]);

        println!("{label}: {} bytes natural -> {written} bytes compressed", chunk.len());
    }
}
