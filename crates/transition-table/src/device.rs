//! The device the transition table drives.
//!
//! [`StateDevice`] mirrors the D3D9 entry points the table needs: render states, texture stage
//! states and sampler states are each set through one call carrying a typed value, so a backend
//! can forward them to `SetRenderState` / `SetTextureStageState` / `SetSamplerState` directly.

use crate::state::{
    BlendFactor, BlendOp, ColorWriteMask, CombineArg, CombineOp, CompareFunc, FillMode, FogMode,
    MaterialSource, PolygonOffset, ShaderHandle,
};

/// Device capabilities consulted when sizing states and deciding which optional fields to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceCaps {
    pub texture_stage_count: usize,
    pub sampler_count: usize,
    pub supports_fetch4: bool,
    pub supports_shadow_filter: bool,
    /// sRGB conversion on write happens in the pixel shader; the render state is always left off.
    pub shader_srgb_conversion: bool,
    /// Fog color is specified in linear space, so fog depends on the sRGB write state.
    pub fog_color_in_linear_space: bool,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            texture_stage_count: 8,
            sampler_count: 16,
            supports_fetch4: false,
            supports_shadow_filter: false,
            shader_srgb_conversion: false,
            fog_color_in_linear_space: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderState {
    ZEnable(bool),
    ZFunc(CompareFunc),
    ZWriteEnable(bool),
    DepthBias(PolygonOffset),
    ColorWriteEnable(ColorWriteMask),
    AlphaTestEnable(bool),
    AlphaFunc(CompareFunc),
    AlphaRef(u8),
    AlphaBlendEnable(bool),
    SrcBlend(BlendFactor),
    DestBlend(BlendFactor),
    BlendOp(BlendOp),
    SeparateAlphaBlendEnable(bool),
    SrcBlendAlpha(BlendFactor),
    DestBlendAlpha(BlendFactor),
    BlendOpAlpha(BlendOp),
    FillMode(FillMode),
    Lighting(bool),
    SpecularEnable(bool),
    SrgbWriteEnable(bool),
    DiffuseMaterialSource(MaterialSource),
    CullEnable(bool),
    AlphaToCoverage(bool),
    VertexBlendEnable(bool),
}

impl RenderState {
    pub fn is_depth_test(&self) -> bool {
        matches!(self, Self::ZEnable(_) | Self::ZFunc(_) | Self::DepthBias(_))
    }

    pub fn is_alpha_blend(&self) -> bool {
        matches!(
            self,
            Self::AlphaBlendEnable(_) | Self::SrcBlend(_) | Self::DestBlend(_) | Self::BlendOp(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureStageValue {
    ColorOp(CombineOp),
    ColorArg1(CombineArg),
    ColorArg2(CombineArg),
    AlphaOp(CombineOp),
    AlphaArg1(CombineArg),
    AlphaArg2(CombineArg),
    TexCoordIndex(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerValue {
    TextureEnable(bool),
    SrgbTexture(bool),
    Fetch4(bool),
    ShadowFilter(bool),
}

/// Everything the device needs to configure fog.
///
/// Fog setup differs between the fixed-function and programmable paths, and between gamma and
/// linear render targets, so all of it travels together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FogParams {
    pub mode: FogMode,
    pub srgb_write: bool,
    pub disable_gamma_correction: bool,
    pub fixed_function: bool,
}

pub trait StateDevice {
    /// `false` while the device is lost or deactivated; every apply path is skipped.
    fn is_usable(&self) -> bool {
        true
    }

    fn set_render_state(&mut self, state: RenderState);

    fn set_texture_stage_state(&mut self, stage: usize, value: TextureStageValue);

    fn set_sampler_state(&mut self, sampler: usize, value: SamplerValue);

    fn apply_fog(&mut self, fog: FogParams);

    fn set_vertex_shader(&mut self, shader: ShaderHandle);

    fn set_pixel_shader(&mut self, shader: ShaderHandle);

    /// Asks the driver whether the currently applied configuration can be rendered.
    fn validate(&mut self) -> bool {
        true
    }

    /// Called before an override changes state mid-frame.
    fn flush_buffered_primitives(&mut self) {}
}
