//! Error taxonomy (C12).
//!
//! The legacy C implementation smuggles these tags through the top of an
//! otherwise-unsigned bit-length return value. This crate uses an ordinary
//! `Result` instead; every fallible operation in the crate returns
//! [`Result<T>`] and the caller matches on [`Error`] rather than inspecting
//! a sentinel prefix.

/// Everything that can go wrong while validating, compressing, or
/// decompressing a chunk or entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("destination buffer exhausted during write")]
    SmallBuffer,

    #[error("internal decoder invariant violated")]
    IntDecoder,

    #[error("sample or residual exceeds max_data_bits")]
    DataValueTooLarge,

    #[error("unsupported collection subservice/data type")]
    DataTypeUnsupported,

    #[error("collection payload length is not a multiple of the record size")]
    CollectionSizeInconsistent,

    #[error("chunk size is inconsistent with its declared collections")]
    ChunkSizeInconsistent,

    #[error("chunk exceeds the maximum allowed size")]
    ChunkTooLarge,

    #[error("chunk buffer is null/empty")]
    ChunkNull,

    #[error("a collection's chunk type does not match the chunk's family")]
    ChunkSubserviceInconsistent,

    #[error("generic compression parameter is invalid")]
    ParGeneric,

    #[error("a field-specific compression parameter is invalid")]
    ParSpecific,

    #[error("source/model/updated-model/destination buffers overlap")]
    ParBuffers,

    #[error("model mode requested without a model buffer")]
    ParNoModel,

    #[error("max_data_bits is zero or exceeds 32")]
    ParMaxUsedBits,

    #[error("entity buffer is null/empty")]
    EntityNull,

    #[error("entity buffer is too small to hold a header")]
    EntityTooSmall,

    #[error("entity header is malformed")]
    EntityHeader,

    #[error("entity timestamp hook is not configured")]
    EntityTimestamp,

    #[error("collection subservice is not supported by this chunk type")]
    ColSubserviceUnsupported,

    #[error("collection size is inconsistent with its header")]
    ColSizeInconsistent,

    #[error("compressed collection length exceeds the 16-bit length field")]
    CmpColTooLarge,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
