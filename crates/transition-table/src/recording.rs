//! A [`StateDevice`] that records every call and tracks the configuration those calls produce.

use crate::device::{
    DeviceCaps, FogParams, RenderState, SamplerValue, StateDevice, TextureStageValue,
};
use crate::state::{PipelineState, ShaderHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceCall {
    Render(RenderState),
    TextureStage { stage: usize, value: TextureStageValue },
    Sampler { sampler: usize, value: SamplerValue },
    Fog(FogParams),
    VertexShader(ShaderHandle),
    PixelShader(ShaderHandle),
    Validate,
    Flush,
}

impl DeviceCall {
    pub fn is_shader_bind(&self) -> bool {
        matches!(self, Self::VertexShader(_) | Self::PixelShader(_))
    }
}

#[derive(Clone, Debug)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    /// Device-side values, as last set.
    board: PipelineState,
    fog: Option<FogParams>,
    vertex_shader: ShaderHandle,
    pixel_shader: ShaderHandle,
    usable: bool,
    validation_result: bool,
}

impl RecordingDevice {
    pub fn new(caps: &DeviceCaps) -> Self {
        Self {
            calls: Vec::new(),
            board: PipelineState::new_default(caps.texture_stage_count, caps.sampler_count),
            fog: None,
            vertex_shader: ShaderHandle::NONE,
            pixel_shader: ShaderHandle::NONE,
            usable: true,
            validation_result: true,
        }
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The configuration the recorded calls left on the device.
    ///
    /// Fog fields and `using_fixed_function` follow the last [`StateDevice::apply_fog`] call;
    /// `srgb_write_enable` is the render state, not the value fog was configured for.
    pub fn board(&self) -> &PipelineState {
        &self.board
    }

    pub fn fog(&self) -> Option<FogParams> {
        self.fog
    }

    /// `(vertex, pixel)`.
    pub fn bound_shaders(&self) -> (ShaderHandle, ShaderHandle) {
        (self.vertex_shader, self.pixel_shader)
    }

    /// Simulates a lost device.
    pub fn set_usable(&mut self, usable: bool) {
        self.usable = usable;
    }

    pub fn set_validation_result(&mut self, result: bool) {
        self.validation_result = result;
    }
}

impl StateDevice for RecordingDevice {
    fn is_usable(&self) -> bool {
        self.usable
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.calls.push(DeviceCall::Render(state));

        let board = &mut self.board;
        match state {
            RenderState::ZEnable(v) => board.z_enable = v,
            RenderState::ZFunc(v) => board.z_func = v,
            RenderState::ZWriteEnable(v) => board.z_write_enable = v,
            RenderState::DepthBias(v) => board.z_bias = v,
            RenderState::ColorWriteEnable(v) => board.color_write = v,
            RenderState::AlphaTestEnable(v) => board.alpha_test_enable = v,
            RenderState::AlphaFunc(v) => board.alpha_func = v,
            RenderState::AlphaRef(v) => board.alpha_ref = v,
            RenderState::AlphaBlendEnable(v) => board.alpha_blend_enable = v,
            RenderState::SrcBlend(v) => board.src_blend = v,
            RenderState::DestBlend(v) => board.dst_blend = v,
            RenderState::BlendOp(v) => board.blend_op = v,
            RenderState::SeparateAlphaBlendEnable(v) => board.separate_alpha_blend_enable = v,
            RenderState::SrcBlendAlpha(v) => board.src_blend_alpha = v,
            RenderState::DestBlendAlpha(v) => board.dst_blend_alpha = v,
            RenderState::BlendOpAlpha(v) => board.blend_op_alpha = v,
            RenderState::FillMode(v) => board.fill_mode = v,
            RenderState::Lighting(v) => board.lighting = v,
            RenderState::SpecularEnable(v) => board.specular_enable = v,
            RenderState::SrgbWriteEnable(v) => board.srgb_write_enable = v,
            RenderState::DiffuseMaterialSource(v) => board.diffuse_material_source = v,
            RenderState::CullEnable(v) => board.cull_enable = v,
            RenderState::AlphaToCoverage(v) => board.alpha_to_coverage = v,
            RenderState::VertexBlendEnable(v) => board.vertex_blend_enable = v,
        }
    }

    fn set_texture_stage_state(&mut self, stage: usize, value: TextureStageValue) {
        self.calls.push(DeviceCall::TextureStage { stage, value });

        let stage = &mut self.board.texture_stages[stage];
        match value {
            TextureStageValue::ColorOp(v) => stage.color_op = v,
            TextureStageValue::ColorArg1(v) => stage.color_arg1 = v,
            TextureStageValue::ColorArg2(v) => stage.color_arg2 = v,
            TextureStageValue::AlphaOp(v) => stage.alpha_op = v,
            TextureStageValue::AlphaArg1(v) => stage.alpha_arg1 = v,
            TextureStageValue::AlphaArg2(v) => stage.alpha_arg2 = v,
            TextureStageValue::TexCoordIndex(v) => stage.tex_coord_index = v,
        }
    }

    fn set_sampler_state(&mut self, sampler: usize, value: SamplerValue) {
        self.calls.push(DeviceCall::Sampler { sampler, value });

        let sampler = &mut self.board.samplers[sampler];
        match value {
            SamplerValue::TextureEnable(v) => sampler.texture_enable = v,
            SamplerValue::SrgbTexture(v) => sampler.srgb_read_enable = v,
            SamplerValue::Fetch4(v) => sampler.fetch4_enable = v,
            SamplerValue::ShadowFilter(v) => sampler.shadow_filter_enable = v,
        }
    }

    fn apply_fog(&mut self, fog: FogParams) {
        self.calls.push(DeviceCall::Fog(fog));
        self.fog = Some(fog);
        self.board.fog_mode = fog.mode;
        self.board.disable_fog_gamma_correction = fog.disable_gamma_correction;
        self.board.using_fixed_function = fog.fixed_function;
    }

    fn set_vertex_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(DeviceCall::VertexShader(shader));
        self.vertex_shader = shader;
    }

    fn set_pixel_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(DeviceCall::PixelShader(shader));
        self.pixel_shader = shader;
    }

    fn validate(&mut self) -> bool {
        self.calls.push(DeviceCall::Validate);
        self.validation_result
    }

    fn flush_buffered_primitives(&mut self) {
        self.calls.push(DeviceCall::Flush);
    }
}
