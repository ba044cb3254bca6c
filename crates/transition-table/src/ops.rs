//! Encoded transition operations.
//!
//! A [`StateOp`] is a single byte meaning "apply field X of the target state to the device". The
//! top bit selects a per-stage/per-sampler op; the rest is either a [`RenderFunc`] code or a
//! [`StageFunc`] code packed above a 4-bit stage index.

use std::fmt;
use std::ops::Range;

use crate::error::{Result, TransitionTableError};

pub const STAGE_INDEX_BITS: u32 = 4;

/// Upper bound on texture stages and samplers addressable by a [`StateOp`].
pub const MAX_STAGES: usize = 1 << STAGE_INDEX_BITS;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderFunc {
    DepthTest = 0,
    ZWriteEnable,
    ColorWriteEnable,
    AlphaTest,
    FillMode,
    Lighting,
    SpecularEnable,
    SrgbWriteEnable,
    AlphaBlend,
    SeparateAlphaBlend,
    CullEnable,
    VertexBlendEnable,
    FogMode,
    ActivateFixedFunction,
    /// Applies texture enables for every sampler at once.
    TextureEnable,
    DiffuseMaterialSource,
    DisableFogGammaCorrection,
    AlphaToCoverage,
}

impl RenderFunc {
    pub const COUNT: usize = 18;

    /// Indexed by code.
    pub const ALL: [Self; Self::COUNT] = [
        Self::DepthTest,
        Self::ZWriteEnable,
        Self::ColorWriteEnable,
        Self::AlphaTest,
        Self::FillMode,
        Self::Lighting,
        Self::SpecularEnable,
        Self::SrgbWriteEnable,
        Self::AlphaBlend,
        Self::SeparateAlphaBlend,
        Self::CullEnable,
        Self::VertexBlendEnable,
        Self::FogMode,
        Self::ActivateFixedFunction,
        Self::TextureEnable,
        Self::DiffuseMaterialSource,
        Self::DisableFogGammaCorrection,
        Self::AlphaToCoverage,
    ];
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageFunc {
    TexCoordIndex = 0,
    SrgbReadEnable,
    Fetch4Enable,
    ShadowFilterEnable,
    ColorTextureStage,
    AlphaTextureStage,
}

impl StageFunc {
    pub const COUNT: usize = 6;

    /// Indexed by code.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TexCoordIndex,
        Self::SrgbReadEnable,
        Self::Fetch4Enable,
        Self::ShadowFilterEnable,
        Self::ColorTextureStage,
        Self::AlphaTextureStage,
    ];
}

// Three bits of function code sit above the stage index.
const _: () = assert!(StageFunc::COUNT <= 1 << (7 - STAGE_INDEX_BITS));
const _: () = assert!(RenderFunc::COUNT <= 1 << 7);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodedOp {
    Render(RenderFunc),
    Stage(StageFunc, usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateOp(u8);

impl StateOp {
    const STAGE_FLAG: u8 = 0x80;
    const STAGE_MASK: u8 = (1 << STAGE_INDEX_BITS) - 1;

    pub const fn render(func: RenderFunc) -> Self {
        Self(func as u8)
    }

    pub fn stage(func: StageFunc, index: usize) -> Self {
        debug_assert!(index < MAX_STAGES, "stage index {index} out of range");
        Self(Self::STAGE_FLAG | ((func as u8) << STAGE_INDEX_BITS) | (index as u8 & Self::STAGE_MASK))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn decode(self) -> DecodedOp {
        if self.0 & Self::STAGE_FLAG == 0 {
            DecodedOp::Render(RenderFunc::ALL[usize::from(self.0)])
        } else {
            let code = (self.0 & !Self::STAGE_FLAG) >> STAGE_INDEX_BITS;
            DecodedOp::Stage(
                StageFunc::ALL[usize::from(code)],
                usize::from(self.0 & Self::STAGE_MASK),
            )
        }
    }
}

impl fmt::Debug for StateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            DecodedOp::Render(func) => write!(f, "{func:?}"),
            DecodedOp::Stage(func, index) => write!(f, "{func:?}[{index}]"),
        }
    }
}

/// A run of ops in the flat op array, packed as a 24-bit first index and an 8-bit count.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpRange(u32);

impl OpRange {
    pub const FIRST_BITS: u32 = 24;
    pub const MAX_COUNT: usize = u8::MAX as usize;
    /// One past the last op index a range may cover.
    pub const OP_LIMIT: usize = (1 << Self::FIRST_BITS) - 1;

    pub const EMPTY: Self = Self(0);

    pub(crate) fn new(first: usize, count: usize) -> Result<Self> {
        if count > Self::MAX_COUNT || first + count >= Self::OP_LIMIT {
            return Err(TransitionTableError::OpTableOverflow { first, count });
        }
        Ok(Self(((count as u32) << Self::FIRST_BITS) | first as u32))
    }

    pub fn first(self) -> usize {
        (self.0 & ((1 << Self::FIRST_BITS) - 1)) as usize
    }

    pub fn count(self) -> usize {
        (self.0 >> Self::FIRST_BITS) as usize
    }

    pub fn is_empty(self) -> bool {
        self.count() == 0
    }

    pub fn as_range(self) -> Range<usize> {
        self.first()..self.first() + self.count()
    }
}

impl fmt::Debug for OpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpRange({}+{})", self.first(), self.count())
    }
}
