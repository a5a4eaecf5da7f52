//! Data model (§3): compression mode, chunk-type families, the ~20
//! collection record shapes, and their plain Rust field structs.
//!
//! Record structs are deliberately flat, public-field structs (no
//! getters/setters) — [`crate::collection`] drives their fields
//! one-at-a-time through [`crate::field`], so there is no behavior to hide
//! behind an API; this mirrors the legacy `struct S_FX`-style packed
//! structs in `cmp_data_types.h`, translated to plain (un-packed) Rust
//! fields since the wire layout is produced explicitly by the bit writer,
//! not by `#[repr(packed)]` struct layout.

/// Compression mode (§3, §4.5). `Raw` bypasses the code generator and
/// escape framer entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpMode {
    Raw,
    ModelZero,
    DiffZero,
    ModelMulti,
    DiffMulti,
}

impl CmpMode {
    pub fn as_u8(self) -> u8 {
        match self {
            CmpMode::Raw => 0,
            CmpMode::ModelZero => 1,
            CmpMode::DiffZero => 2,
            CmpMode::ModelMulti => 3,
            CmpMode::DiffMulti => 4,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CmpMode::Raw),
            1 => Some(CmpMode::ModelZero),
            2 => Some(CmpMode::DiffZero),
            3 => Some(CmpMode::ModelMulti),
            4 => Some(CmpMode::DiffMulti),
            _ => None,
        }
    }

    pub fn is_raw(self) -> bool {
        matches!(self, CmpMode::Raw)
    }

    pub fn is_model(self) -> bool {
        matches!(self, CmpMode::ModelZero | CmpMode::ModelMulti)
    }

    /// `true` for the zero-escape family (`*_ZERO`), `false` for
    /// multi-escape (`*_MULTI`). Meaningless (never consulted) for `Raw`.
    pub fn is_zero_escape(self) -> bool {
        matches!(self, CmpMode::ModelZero | CmpMode::DiffZero)
    }
}

/// The chunk-type family a chunk's collections must all agree on (§3, C9).
/// This is also what the entity header's `data_type` field (minus its raw
/// bit) encodes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ChunkType {
    NcamImagette = 1,
    SatImagette = 2,
    ShortCadence = 3,
    LongCadence = 4,
    FastCadence = 5,
    OffsetBackground = 6,
    Smearing = 7,
    FChain = 8,
}

impl ChunkType {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(ChunkType::NcamImagette),
            2 => Some(ChunkType::SatImagette),
            3 => Some(ChunkType::ShortCadence),
            4 => Some(ChunkType::LongCadence),
            5 => Some(ChunkType::FastCadence),
            6 => Some(ChunkType::OffsetBackground),
            7 => Some(ChunkType::Smearing),
            8 => Some(ChunkType::FChain),
            _ => None,
        }
    }
}

/// The record shape carried by a collection's payload, selected by the
/// subservice tag embedded in the collection id (§3, §4.7). ~20 shapes in
/// the original; grouped here by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Imagette,
    SFx,
    SFxEfx,
    SFxNcob,
    SFxEfxNcobEcob,
    LFx,
    LFxEfx,
    LFxNcob,
    LFxEfxNcobEcob,
    FFx,
    FFxEfx,
    FFxNcob,
    FFxEfxNcobEcob,
    Offset,
    Background,
    Smearing,
}

/// `exp_flags` + `fx` (short-cadence flux, no centre-of-brightness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SFx {
    pub exp_flags: u8,
    pub fx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SFxEfx {
    pub exp_flags: u8,
    pub fx: u32,
    pub efx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SFxNcob {
    pub exp_flags: u8,
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SFxEfxNcobEcob {
    pub exp_flags: u8,
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
    pub efx: u32,
    pub ecob_x: u32,
    pub ecob_y: u32,
}

/// Long-cadence variants add a variance tail governed by the
/// `fx_cob_variance` parameter (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LFx {
    pub exp_flags: u8,
    pub fx: u32,
    pub fx_variance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LFxEfx {
    pub exp_flags: u8,
    pub fx: u32,
    pub efx: u32,
    pub fx_variance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LFxNcob {
    pub exp_flags: u8,
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
    pub fx_variance: u32,
    pub cob_x_variance: u32,
    pub cob_y_variance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LFxEfxNcobEcob {
    pub exp_flags: u8,
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
    pub efx: u32,
    pub ecob_x: u32,
    pub ecob_y: u32,
    pub fx_variance: u32,
    pub cob_x_variance: u32,
    pub cob_y_variance: u32,
}

/// Fast-cadence variants drop `exp_flags` entirely (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FFx {
    pub fx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FFxEfx {
    pub fx: u32,
    pub efx: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FFxNcob {
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FFxEfxNcobEcob {
    pub fx: u32,
    pub ncob_x: u32,
    pub ncob_y: u32,
    pub efx: u32,
    pub ecob_x: u32,
    pub ecob_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub mean: u32,
    pub variance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Background {
    pub mean: u32,
    pub variance: u32,
    pub outlier_pixels: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Smearing {
    pub mean: u32,
    pub variance_mean: u32,
    pub outlier_pixels: u32,
}

/// One decoded/pre-encode record, tagged by its [`RecordType`]. Exists so
/// [`crate::collection`] can drive any record shape through the same
/// row-major field loop without one hand-written loop per shape: each
/// variant knows how to flatten itself to/from an ordered `u32` column
/// list matching its [`RecordType`]'s field order (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Imagette(u32),
    SFx(SFx),
    SFxEfx(SFxEfx),
    SFxNcob(SFxNcob),
    SFxEfxNcobEcob(SFxEfxNcobEcob),
    LFx(LFx),
    LFxEfx(LFxEfx),
    LFxNcob(LFxNcob),
    LFxEfxNcobEcob(LFxEfxNcobEcob),
    FFx(FFx),
    FFxEfx(FFxEfx),
    FFxNcob(FFxNcob),
    FFxEfxNcobEcob(FFxEfxNcobEcob),
    Offset(Offset),
    Background(Background),
    Smearing(Smearing),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::Imagette(_) => RecordType::Imagette,
            Record::SFx(_) => RecordType::SFx,
            Record::SFxEfx(_) => RecordType::SFxEfx,
            Record::SFxNcob(_) => RecordType::SFxNcob,
            Record::SFxEfxNcobEcob(_) => RecordType::SFxEfxNcobEcob,
            Record::LFx(_) => RecordType::LFx,
            Record::LFxEfx(_) => RecordType::LFxEfx,
            Record::LFxNcob(_) => RecordType::LFxNcob,
            Record::LFxEfxNcobEcob(_) => RecordType::LFxEfxNcobEcob,
            Record::FFx(_) => RecordType::FFx,
            Record::FFxEfx(_) => RecordType::FFxEfx,
            Record::FFxNcob(_) => RecordType::FFxNcob,
            Record::FFxEfxNcobEcob(_) => RecordType::FFxEfxNcobEcob,
            Record::Offset(_) => RecordType::Offset,
            Record::Background(_) => RecordType::Background,
            Record::Smearing(_) => RecordType::Smearing,
        }
    }

    /// Flattens the record to its ordered field columns, matching the
    /// schedules in §4.7's table (`exp_flags` first when present, then
    /// `fx`, then COB, then variance tail).
    pub fn to_columns(&self) -> Vec<u32> {
        match self {
            Record::Imagette(v) => vec![*v],
            Record::SFx(r) => vec![r.exp_flags as u32, r.fx],
            Record::SFxEfx(r) => vec![r.exp_flags as u32, r.fx, r.efx],
            Record::SFxNcob(r) => vec![r.exp_flags as u32, r.fx, r.ncob_x, r.ncob_y],
            Record::SFxEfxNcobEcob(r) => vec![
                r.exp_flags as u32,
                r.fx,
                r.ncob_x,
                r.ncob_y,
                r.efx,
                r.ecob_x,
                r.ecob_y,
            ],
            Record::LFx(r) => vec![r.exp_flags as u32, r.fx, r.fx_variance],
            Record::LFxEfx(r) => vec![r.exp_flags as u32, r.fx, r.efx, r.fx_variance],
            Record::LFxNcob(r) => vec![
                r.exp_flags as u32,
                r.fx,
                r.ncob_x,
                r.ncob_y,
                r.fx_variance,
                r.cob_x_variance,
                r.cob_y_variance,
            ],
            Record::LFxEfxNcobEcob(r) => vec![
                r.exp_flags as u32,
                r.fx,
                r.ncob_x,
                r.ncob_y,
                r.efx,
                r.ecob_x,
                r.ecob_y,
                r.fx_variance,
                r.cob_x_variance,
                r.cob_y_variance,
            ],
            Record::FFx(r) => vec![r.fx],
            Record::FFxEfx(r) => vec![r.fx, r.efx],
            Record::FFxNcob(r) => vec![r.fx, r.ncob_x, r.ncob_y],
            Record::FFxEfxNcobEcob(r) => vec![r.fx, r.ncob_x, r.ncob_y, r.efx, r.ecob_x, r.ecob_y],
            Record::Offset(r) => vec![r.mean, r.variance],
            Record::Background(r) => vec![r.mean, r.variance, r.outlier_pixels],
            Record::Smearing(r) => vec![r.mean, r.variance_mean, r.outlier_pixels],
        }
    }

    /// Inverse of [`Record::to_columns`]: rebuilds a record of `record_type`
    /// from its ordered column values. `columns.len()` must match the
    /// record type's field count.
    pub fn from_columns(record_type: RecordType, columns: &[u32]) -> Option<Record> {
        let get = |i: usize| columns.get(i).copied();
        Some(match record_type {
            RecordType::Imagette => Record::Imagette(get(0)?),
            RecordType::SFx => Record::SFx(SFx {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
            }),
            RecordType::SFxEfx => Record::SFxEfx(SFxEfx {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                efx: get(2)?,
            }),
            RecordType::SFxNcob => Record::SFxNcob(SFxNcob {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                ncob_x: get(2)?,
                ncob_y: get(3)?,
            }),
            RecordType::SFxEfxNcobEcob => Record::SFxEfxNcobEcob(SFxEfxNcobEcob {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                ncob_x: get(2)?,
                ncob_y: get(3)?,
                efx: get(4)?,
                ecob_x: get(5)?,
                ecob_y: get(6)?,
            }),
            RecordType::LFx => Record::LFx(LFx {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                fx_variance: get(2)?,
            }),
            RecordType::LFxEfx => Record::LFxEfx(LFxEfx {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                efx: get(2)?,
                fx_variance: get(3)?,
            }),
            RecordType::LFxNcob => Record::LFxNcob(LFxNcob {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                ncob_x: get(2)?,
                ncob_y: get(3)?,
                fx_variance: get(4)?,
                cob_x_variance: get(5)?,
                cob_y_variance: get(6)?,
            }),
            RecordType::LFxEfxNcobEcob => Record::LFxEfxNcobEcob(LFxEfxNcobEcob {
                exp_flags: get(0)? as u8,
                fx: get(1)?,
                ncob_x: get(2)?,
                ncob_y: get(3)?,
                efx: get(4)?,
                ecob_x: get(5)?,
                ecob_y: get(6)?,
                fx_variance: get(7)?,
                cob_x_variance: get(8)?,
                cob_y_variance: get(9)?,
            }),
            RecordType::FFx => Record::FFx(FFx { fx: get(0)? }),
            RecordType::FFxEfx => Record::FFxEfx(FFxEfx {
                fx: get(0)?,
                efx: get(1)?,
            }),
            RecordType::FFxNcob => Record::FFxNcob(FFxNcob {
                fx: get(0)?,
                ncob_x: get(1)?,
                ncob_y: get(2)?,
            }),
            RecordType::FFxEfxNcobEcob => Record::FFxEfxNcobEcob(FFxEfxNcobEcob {
                fx: get(0)?,
                ncob_x: get(1)?,
                ncob_y: get(2)?,
                efx: get(3)?,
                ecob_x: get(4)?,
                ecob_y: get(5)?,
            }),
            RecordType::Offset => Record::Offset(Offset {
                mean: get(0)?,
                variance: get(1)?,
            }),
            RecordType::Background => Record::Background(Background {
                mean: get(0)?,
                variance: get(1)?,
                outlier_pixels: get(2)?,
            }),
            RecordType::Smearing => Record::Smearing(Smearing {
                mean: get(0)?,
                variance_mean: get(1)?,
                outlier_pixels: get(2)?,
            }),
        })
    }
}

impl RecordType {
    /// Number of `u32` columns (fields) this record type carries.
    pub fn field_count(self) -> usize {
        match self {
            RecordType::Imagette => 1,
            RecordType::SFx => 2,
            RecordType::SFxEfx => 3,
            RecordType::SFxNcob => 4,
            RecordType::SFxEfxNcobEcob => 7,
            RecordType::LFx => 3,
            RecordType::LFxEfx => 4,
            RecordType::LFxNcob => 7,
            RecordType::LFxEfxNcobEcob => 10,
            RecordType::FFx => 1,
            RecordType::FFxEfx => 2,
            RecordType::FFxNcob => 3,
            RecordType::FFxEfxNcobEcob => 6,
            RecordType::Offset => 2,
            RecordType::Background => 3,
            RecordType::Smearing => 3,
        }
    }

    /// Wire discriminant embedded in a collection id's low byte.
    pub fn as_u8(self) -> u8 {
        match self {
            RecordType::Imagette => 0,
            RecordType::SFx => 1,
            RecordType::SFxEfx => 2,
            RecordType::SFxNcob => 3,
            RecordType::SFxEfxNcobEcob => 4,
            RecordType::LFx => 5,
            RecordType::LFxEfx => 6,
            RecordType::LFxNcob => 7,
            RecordType::LFxEfxNcobEcob => 8,
            RecordType::FFx => 9,
            RecordType::FFxEfx => 10,
            RecordType::FFxNcob => 11,
            RecordType::FFxEfxNcobEcob => 12,
            RecordType::Offset => 13,
            RecordType::Background => 14,
            RecordType::Smearing => 15,
        }
    }

    pub fn from_u8(v: u8) -> Option<RecordType> {
        Some(match v {
            0 => RecordType::Imagette,
            1 => RecordType::SFx,
            2 => RecordType::SFxEfx,
            3 => RecordType::SFxNcob,
            4 => RecordType::SFxEfxNcobEcob,
            5 => RecordType::LFx,
            6 => RecordType::LFxEfx,
            7 => RecordType::LFxNcob,
            8 => RecordType::LFxEfxNcobEcob,
            9 => RecordType::FFx,
            10 => RecordType::FFxEfx,
            11 => RecordType::FFxNcob,
            12 => RecordType::FFxEfxNcobEcob,
            13 => RecordType::Offset,
            14 => RecordType::Background,
            15 => RecordType::Smearing,
            _ => return None,
        })
    }
}
