//! Shadowed device configuration.
//!
//! [`PipelineState`] is the value the transition table dedups and diffs. It holds every device
//! field the table is responsible for, typed the way the rest of the renderer sees them (these are
//! "semantic" enums; the discriminants happen to match the D3D9 constants so a D3D9-backed
//! [`crate::StateDevice`] can forward them without a lookup table).
//!
//! Equality and hashing are defined over a canonical byte image (see [`PipelineState::byte_image`]).
//! The image is assembled from `#[repr(C)]` plain-old-data records that contain only `u8` fields,
//! so it never carries uninitialized padding.

mod binding;
mod shadow;

pub use binding::{ShaderBinding, ShaderHandle};
pub use shadow::StateShadow;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use xxhash_rust::xxh32::Xxh32;

/// Identity of a unique [`PipelineState`] registered with a transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a unique `(StateId, ShaderBinding)` pair; the handle clients hold on to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(u32);

impl SnapshotId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never = 1,
    Less = 2,
    Equal = 3,
    LessEqual = 4,
    Greater = 5,
    NotEqual = 6,
    GreaterEqual = 7,
    Always = 8,
}

impl CompareFunc {
    pub const ALL: [Self; 8] = [
        Self::Never,
        Self::Less,
        Self::Equal,
        Self::LessEqual,
        Self::Greater,
        Self::NotEqual,
        Self::GreaterEqual,
        Self::Always,
    ];
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero = 1,
    One = 2,
    SrcColor = 3,
    InvSrcColor = 4,
    SrcAlpha = 5,
    InvSrcAlpha = 6,
    DestAlpha = 7,
    InvDestAlpha = 8,
    DestColor = 9,
    InvDestColor = 10,
    SrcAlphaSat = 11,
}

impl BlendFactor {
    pub const ALL: [Self; 11] = [
        Self::Zero,
        Self::One,
        Self::SrcColor,
        Self::InvSrcColor,
        Self::SrcAlpha,
        Self::InvSrcAlpha,
        Self::DestAlpha,
        Self::InvDestAlpha,
        Self::DestColor,
        Self::InvDestColor,
        Self::SrcAlphaSat,
    ];
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add = 1,
    Subtract = 2,
    RevSubtract = 3,
    Min = 4,
    Max = 5,
}

impl BlendOp {
    pub const ALL: [Self; 5] = [
        Self::Add,
        Self::Subtract,
        Self::RevSubtract,
        Self::Min,
        Self::Max,
    ];
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillMode {
    Point = 1,
    Wireframe = 2,
    Solid = 3,
}

/// Where fixed-function lighting takes the diffuse material color from.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialSource {
    Material = 0,
    Color1 = 1,
    Color2 = 2,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FogMode {
    Disabled = 0,
    /// Fog toward `1 / overbright`.
    OneOverOverbright = 1,
    Black = 2,
    Grey = 3,
    FogColor = 4,
    White = 5,
}

impl FogMode {
    pub const ALL: [Self; 6] = [
        Self::Disabled,
        Self::OneOverOverbright,
        Self::Black,
        Self::Grey,
        Self::FogColor,
        Self::White,
    ];
}

/// Depth bias mode.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolygonOffset {
    Disabled = 0,
    Decal = 1,
    ShadowBias = 2,
}

/// Fixed-function texture stage combine operator.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombineOp {
    Disable = 1,
    SelectArg1 = 2,
    SelectArg2 = 3,
    Modulate = 4,
    Modulate2x = 5,
    Modulate4x = 6,
    Add = 7,
    AddSigned = 8,
    AddSigned2x = 9,
    Subtract = 10,
    AddSmooth = 11,
    BlendDiffuseAlpha = 12,
    BlendTextureAlpha = 13,
    BlendFactorAlpha = 14,
    BlendCurrentAlpha = 16,
    DotProduct3 = 24,
    MultiplyAdd = 25,
    Lerp = 26,
}

impl CombineOp {
    pub const ALL: [Self; 18] = [
        Self::Disable,
        Self::SelectArg1,
        Self::SelectArg2,
        Self::Modulate,
        Self::Modulate2x,
        Self::Modulate4x,
        Self::Add,
        Self::AddSigned,
        Self::AddSigned2x,
        Self::Subtract,
        Self::AddSmooth,
        Self::BlendDiffuseAlpha,
        Self::BlendTextureAlpha,
        Self::BlendFactorAlpha,
        Self::BlendCurrentAlpha,
        Self::DotProduct3,
        Self::MultiplyAdd,
        Self::Lerp,
    ];
}

/// Operand selector for a texture stage combine.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombineArg {
    Diffuse = 0,
    Current = 1,
    Texture = 2,
    TFactor = 3,
    Specular = 4,
    Temp = 5,
    Constant = 6,
}

impl CombineArg {
    pub const ALL: [Self; 7] = [
        Self::Diffuse,
        Self::Current,
        Self::Texture,
        Self::TFactor,
        Self::Specular,
        Self::Temp,
        Self::Constant,
    ];
}

bitflags! {
    /// Render target channel write mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const RGB = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureStageState {
    pub color_op: CombineOp,
    pub color_arg1: CombineArg,
    pub color_arg2: CombineArg,
    pub alpha_op: CombineOp,
    pub alpha_arg1: CombineArg,
    pub alpha_arg2: CombineArg,
    pub tex_coord_index: u8,
}

impl TextureStageState {
    /// Startup values for `stage`: both combiners disabled, stage 0 reads diffuse and later stages
    /// read the running result.
    pub fn default_for(stage: usize) -> Self {
        let arg2 = default_arg2(stage);
        Self {
            color_op: CombineOp::Disable,
            color_arg1: CombineArg::Texture,
            color_arg2: arg2,
            alpha_op: CombineOp::Disable,
            alpha_arg1: CombineArg::Texture,
            alpha_arg2: arg2,
            tex_coord_index: stage as u8,
        }
    }

    fn image(&self) -> StageImage {
        StageImage {
            color_op: self.color_op as u8,
            color_arg1: self.color_arg1 as u8,
            color_arg2: self.color_arg2 as u8,
            alpha_op: self.alpha_op as u8,
            alpha_arg1: self.alpha_arg1 as u8,
            alpha_arg2: self.alpha_arg2 as u8,
            tex_coord_index: self.tex_coord_index,
            reserved: 0,
        }
    }
}

pub(crate) fn default_arg2(stage: usize) -> CombineArg {
    if stage == 0 {
        CombineArg::Diffuse
    } else {
        CombineArg::Current
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub texture_enable: bool,
    pub srgb_read_enable: bool,
    /// Vendor four-sample gather fetch.
    pub fetch4_enable: bool,
    pub shadow_filter_enable: bool,
}

impl SamplerState {
    fn image(&self) -> SamplerImage {
        SamplerImage {
            texture_enable: self.texture_enable as u8,
            srgb_read_enable: self.srgb_read_enable as u8,
            fetch4_enable: self.fetch4_enable as u8,
            shadow_filter_enable: self.shadow_filter_enable as u8,
        }
    }
}

/// Every device configuration field the transition table shadows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub z_enable: bool,
    pub z_func: CompareFunc,
    pub z_bias: PolygonOffset,
    pub z_write_enable: bool,
    pub color_write: ColorWriteMask,

    pub alpha_test_enable: bool,
    pub alpha_func: CompareFunc,
    pub alpha_ref: u8,

    pub alpha_blend_enable: bool,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
    pub blend_op: BlendOp,

    pub separate_alpha_blend_enable: bool,
    pub src_blend_alpha: BlendFactor,
    pub dst_blend_alpha: BlendFactor,
    pub blend_op_alpha: BlendOp,

    pub fill_mode: FillMode,
    pub lighting: bool,
    pub specular_enable: bool,
    pub srgb_write_enable: bool,
    pub diffuse_material_source: MaterialSource,
    pub cull_enable: bool,
    pub alpha_to_coverage: bool,
    pub vertex_blend_enable: bool,
    pub fog_mode: FogMode,
    pub using_fixed_function: bool,
    pub disable_fog_gamma_correction: bool,

    pub texture_stages: Vec<TextureStageState>,
    pub samplers: Vec<SamplerState>,
}

impl PipelineState {
    /// The startup configuration for a device with the given stage and sampler counts.
    pub fn new_default(stage_count: usize, sampler_count: usize) -> Self {
        Self {
            z_enable: true,
            z_func: CompareFunc::LessEqual,
            z_bias: PolygonOffset::Disabled,
            z_write_enable: true,
            color_write: ColorWriteMask::RGB,

            alpha_test_enable: false,
            alpha_func: CompareFunc::GreaterEqual,
            alpha_ref: 0,

            alpha_blend_enable: false,
            src_blend: BlendFactor::One,
            dst_blend: BlendFactor::Zero,
            blend_op: BlendOp::Add,

            separate_alpha_blend_enable: false,
            src_blend_alpha: BlendFactor::One,
            dst_blend_alpha: BlendFactor::Zero,
            blend_op_alpha: BlendOp::Add,

            fill_mode: FillMode::Solid,
            lighting: false,
            specular_enable: false,
            srgb_write_enable: false,
            diffuse_material_source: MaterialSource::Material,
            cull_enable: true,
            alpha_to_coverage: false,
            vertex_blend_enable: false,
            fog_mode: FogMode::Disabled,
            using_fixed_function: true,
            disable_fog_gamma_correction: false,

            texture_stages: (0..stage_count).map(TextureStageState::default_for).collect(),
            samplers: vec![SamplerState::default(); sampler_count],
        }
    }

    pub fn stage_count(&self) -> usize {
        self.texture_stages.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    fn scalar_image(&self) -> ScalarImage {
        ScalarImage {
            stage_count: self.texture_stages.len() as u8,
            sampler_count: self.samplers.len() as u8,
            z_enable: self.z_enable as u8,
            z_func: self.z_func as u8,
            z_bias: self.z_bias as u8,
            z_write_enable: self.z_write_enable as u8,
            color_write: self.color_write.bits(),
            alpha_test_enable: self.alpha_test_enable as u8,
            alpha_func: self.alpha_func as u8,
            alpha_ref: self.alpha_ref,
            alpha_blend_enable: self.alpha_blend_enable as u8,
            src_blend: self.src_blend as u8,
            dst_blend: self.dst_blend as u8,
            blend_op: self.blend_op as u8,
            separate_alpha_blend_enable: self.separate_alpha_blend_enable as u8,
            src_blend_alpha: self.src_blend_alpha as u8,
            dst_blend_alpha: self.dst_blend_alpha as u8,
            blend_op_alpha: self.blend_op_alpha as u8,
            fill_mode: self.fill_mode as u8,
            lighting: self.lighting as u8,
            specular_enable: self.specular_enable as u8,
            srgb_write_enable: self.srgb_write_enable as u8,
            diffuse_material_source: self.diffuse_material_source as u8,
            cull_enable: self.cull_enable as u8,
            alpha_to_coverage: self.alpha_to_coverage as u8,
            vertex_blend_enable: self.vertex_blend_enable as u8,
            fog_mode: self.fog_mode as u8,
            using_fixed_function: self.using_fixed_function as u8,
            disable_fog_gamma_correction: self.disable_fog_gamma_correction as u8,
        }
    }

    fn write_image(&self, mut sink: impl FnMut(&[u8])) {
        sink(bytemuck::bytes_of(&self.scalar_image()));
        for stage in &self.texture_stages {
            sink(bytemuck::bytes_of(&stage.image()));
        }
        for sampler in &self.samplers {
            sink(bytemuck::bytes_of(&sampler.image()));
        }
    }

    /// Canonical byte image. Two states compare equal iff their images are byte-identical.
    ///
    /// Stage and sampler counts are part of the image (as single bytes; the table never accepts more
    /// than 16 of either).
    pub fn byte_image(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            std::mem::size_of::<ScalarImage>()
                + self.texture_stages.len() * std::mem::size_of::<StageImage>()
                + self.samplers.len() * std::mem::size_of::<SamplerImage>(),
        );
        self.write_image(|bytes| out.extend_from_slice(bytes));
        out
    }

    /// 32-bit xxHash of [`Self::byte_image`].
    pub fn checksum(&self) -> u32 {
        let mut hasher = Xxh32::new(0);
        self.write_image(|bytes| hasher.update(bytes));
        hasher.digest()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ScalarImage {
    stage_count: u8,
    sampler_count: u8,
    z_enable: u8,
    z_func: u8,
    z_bias: u8,
    z_write_enable: u8,
    color_write: u8,
    alpha_test_enable: u8,
    alpha_func: u8,
    alpha_ref: u8,
    alpha_blend_enable: u8,
    src_blend: u8,
    dst_blend: u8,
    blend_op: u8,
    separate_alpha_blend_enable: u8,
    src_blend_alpha: u8,
    dst_blend_alpha: u8,
    blend_op_alpha: u8,
    fill_mode: u8,
    lighting: u8,
    specular_enable: u8,
    srgb_write_enable: u8,
    diffuse_material_source: u8,
    cull_enable: u8,
    alpha_to_coverage: u8,
    vertex_blend_enable: u8,
    fog_mode: u8,
    using_fixed_function: u8,
    disable_fog_gamma_correction: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct StageImage {
    color_op: u8,
    color_arg1: u8,
    color_arg2: u8,
    alpha_op: u8,
    alpha_arg1: u8,
    alpha_arg2: u8,
    tex_coord_index: u8,
    // Always zero.
    reserved: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SamplerImage {
    texture_enable: u8,
    srgb_read_enable: u8,
    fetch4_enable: u8,
    shadow_filter_enable: u8,
}
