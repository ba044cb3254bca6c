//! Executes op lists against a [`StateDevice`].

use tracing::trace;

use crate::device::{DeviceCaps, FogParams, RenderState, SamplerValue, StateDevice, TextureStageValue};
use crate::live::{Blend, Combiner, LiveStage, LiveState, Overrides, PendingRestore};
use crate::ops::{DecodedOp, RenderFunc, StageFunc, StateOp};
use crate::state::{
    default_arg2, BlendFactor, BlendOp, ColorWriteMask, CombineArg, CombineOp, CompareFunc,
    PipelineState, PolygonOffset, ShaderBinding, ShaderHandle, TextureStageState,
};
use crate::stats::TransitionStats;

#[derive(Clone, Copy, Debug)]
enum Channel {
    Color,
    Alpha,
}

impl Channel {
    fn live(self, stage: &mut LiveStage) -> &mut Combiner {
        match self {
            Self::Color => &mut stage.color,
            Self::Alpha => &mut stage.alpha,
        }
    }

    fn target(self, stage: &TextureStageState) -> Combiner {
        match self {
            Self::Color => Combiner {
                op: stage.color_op,
                arg1: stage.color_arg1,
                arg2: stage.color_arg2,
            },
            Self::Alpha => Combiner {
                op: stage.alpha_op,
                arg1: stage.alpha_arg1,
                arg2: stage.alpha_arg2,
            },
        }
    }

    fn op(self, op: CombineOp) -> TextureStageValue {
        match self {
            Self::Color => TextureStageValue::ColorOp(op),
            Self::Alpha => TextureStageValue::AlphaOp(op),
        }
    }

    fn arg1(self, arg: CombineArg) -> TextureStageValue {
        match self {
            Self::Color => TextureStageValue::ColorArg1(arg),
            Self::Alpha => TextureStageValue::AlphaArg1(arg),
        }
    }

    fn arg2(self, arg: CombineArg) -> TextureStageValue {
        match self {
            Self::Color => TextureStageValue::ColorArg2(arg),
            Self::Alpha => TextureStageValue::AlphaArg2(arg),
        }
    }
}

/// Blend render states for either the main or the separate-alpha equation.
#[derive(Clone, Copy, Debug)]
struct BlendStates {
    separate: bool,
    enable: fn(bool) -> RenderState,
    src: fn(BlendFactor) -> RenderState,
    dst: fn(BlendFactor) -> RenderState,
    op: fn(BlendOp) -> RenderState,
}

const MAIN_BLEND: BlendStates = BlendStates {
    separate: false,
    enable: RenderState::AlphaBlendEnable,
    src: RenderState::SrcBlend,
    dst: RenderState::DestBlend,
    op: RenderState::BlendOp,
};

const SEPARATE_BLEND: BlendStates = BlendStates {
    separate: true,
    enable: RenderState::SeparateAlphaBlendEnable,
    src: RenderState::SrcBlendAlpha,
    dst: RenderState::DestBlendAlpha,
    op: RenderState::BlendOpAlpha,
};

/// Borrows everything an op needs for the duration of one transition.
pub(crate) struct Applicator<'a, D: StateDevice + ?Sized> {
    device: &'a mut D,
    live: &'a mut LiveState,
    caps: &'a DeviceCaps,
    stats: &'a mut TransitionStats,
    trace_ops: bool,
}

impl<'a, D: StateDevice + ?Sized> Applicator<'a, D> {
    pub fn new(
        device: &'a mut D,
        live: &'a mut LiveState,
        caps: &'a DeviceCaps,
        stats: &'a mut TransitionStats,
        trace_ops: bool,
    ) -> Self {
        Self {
            device,
            live,
            caps,
            stats,
            trace_ops,
        }
    }

    /// Applies each op in `ops`, reading values from `state`.
    pub fn run(&mut self, state: &PipelineState, ops: &[StateOp]) {
        for &op in ops {
            let op = op.decode();
            if self.trace_ops {
                trace!(?op, "apply op");
            }
            self.stats.record_op(op);
            match op {
                DecodedOp::Render(func) => self.apply_render(state, func),
                DecodedOp::Stage(func, index) => self.apply_stage(state, func, index),
            }
        }
    }

    fn apply_render(&mut self, state: &PipelineState, func: RenderFunc) {
        match func {
            RenderFunc::DepthTest => self.apply_depth_test(state),
            RenderFunc::ZWriteEnable => self
                .device
                .set_render_state(RenderState::ZWriteEnable(state.z_write_enable)),
            RenderFunc::ColorWriteEnable => {
                let mask = self.live.overrides.mask_color_write(state.color_write);
                self.live.color_write = mask;
                self.device.set_render_state(RenderState::ColorWriteEnable(mask));
            }
            RenderFunc::AlphaTest => self.apply_alpha_test(state),
            RenderFunc::FillMode => self
                .device
                .set_render_state(RenderState::FillMode(state.fill_mode)),
            RenderFunc::Lighting => self
                .device
                .set_render_state(RenderState::Lighting(state.lighting)),
            RenderFunc::SpecularEnable => self
                .device
                .set_render_state(RenderState::SpecularEnable(state.specular_enable)),
            RenderFunc::SrgbWriteEnable => self.apply_srgb_write(state),
            RenderFunc::AlphaBlend => self.apply_blend(
                MAIN_BLEND,
                Blend {
                    enable: state.alpha_blend_enable,
                    src: state.src_blend,
                    dst: state.dst_blend,
                    op: state.blend_op,
                },
            ),
            RenderFunc::SeparateAlphaBlend => self.apply_blend(
                SEPARATE_BLEND,
                Blend {
                    enable: state.separate_alpha_blend_enable,
                    src: state.src_blend_alpha,
                    dst: state.dst_blend_alpha,
                    op: state.blend_op_alpha,
                },
            ),
            RenderFunc::CullEnable => self
                .device
                .set_render_state(RenderState::CullEnable(state.cull_enable)),
            RenderFunc::VertexBlendEnable => self
                .device
                .set_render_state(RenderState::VertexBlendEnable(state.vertex_blend_enable)),
            RenderFunc::FogMode | RenderFunc::DisableFogGammaCorrection => self.apply_fog(state),
            RenderFunc::ActivateFixedFunction => {
                for (i, stage) in state.texture_stages.iter().enumerate() {
                    self.apply_combiner(i, Channel::Color, stage);
                    self.apply_combiner(i, Channel::Alpha, stage);
                }
            }
            RenderFunc::TextureEnable => {
                for (i, sampler) in state.samplers.iter().enumerate() {
                    self.device
                        .set_sampler_state(i, SamplerValue::TextureEnable(sampler.texture_enable));
                }
            }
            RenderFunc::DiffuseMaterialSource => self.device.set_render_state(
                RenderState::DiffuseMaterialSource(state.diffuse_material_source),
            ),
            RenderFunc::AlphaToCoverage => self
                .device
                .set_render_state(RenderState::AlphaToCoverage(state.alpha_to_coverage)),
        }
    }

    fn apply_stage(&mut self, state: &PipelineState, func: StageFunc, index: usize) {
        match func {
            StageFunc::TexCoordIndex => self.device.set_texture_stage_state(
                index,
                TextureStageValue::TexCoordIndex(state.texture_stages[index].tex_coord_index),
            ),
            StageFunc::SrgbReadEnable => self.device.set_sampler_state(
                index,
                SamplerValue::SrgbTexture(state.samplers[index].srgb_read_enable),
            ),
            StageFunc::Fetch4Enable => {
                if self.caps.supports_fetch4 {
                    self.device.set_sampler_state(
                        index,
                        SamplerValue::Fetch4(state.samplers[index].fetch4_enable),
                    );
                }
            }
            StageFunc::ShadowFilterEnable => self.device.set_sampler_state(
                index,
                SamplerValue::ShadowFilter(state.samplers[index].shadow_filter_enable),
            ),
            StageFunc::ColorTextureStage => {
                self.apply_combiner(index, Channel::Color, &state.texture_stages[index])
            }
            StageFunc::AlphaTextureStage => {
                self.apply_combiner(index, Channel::Alpha, &state.texture_stages[index])
            }
        }
    }

    pub fn set_z_enable(&mut self, enable: bool) {
        if self.live.z_enable != enable {
            self.live.z_enable = enable;
            self.device.set_render_state(RenderState::ZEnable(enable));
        }
    }

    pub fn set_z_func(&mut self, func: CompareFunc) {
        if self.live.z_func != func {
            self.live.z_func = func;
            self.device.set_render_state(RenderState::ZFunc(func));
        }
    }

    fn set_z_bias(&mut self, bias: PolygonOffset) {
        if self.live.z_bias != bias {
            self.live.z_bias = bias;
            self.device.set_render_state(RenderState::DepthBias(bias));
        }
    }

    pub fn set_z_write(&mut self, enable: bool) {
        self.device.set_render_state(RenderState::ZWriteEnable(enable));
    }

    fn apply_depth_test(&mut self, state: &PipelineState) {
        self.set_z_enable(state.z_enable);
        if state.z_enable {
            self.set_z_func(state.z_func);
        }
        self.set_z_bias(state.z_bias);
    }

    fn apply_alpha_test(&mut self, state: &PipelineState) {
        if self.live.alpha_test_enable != state.alpha_test_enable {
            self.live.alpha_test_enable = state.alpha_test_enable;
            self.device
                .set_render_state(RenderState::AlphaTestEnable(state.alpha_test_enable));
        }
        if !state.alpha_test_enable {
            return;
        }
        if self.live.alpha_func != state.alpha_func {
            self.live.alpha_func = state.alpha_func;
            self.device
                .set_render_state(RenderState::AlphaFunc(state.alpha_func));
        }
        if self.live.alpha_ref != state.alpha_ref {
            self.live.alpha_ref = state.alpha_ref;
            self.device.set_render_state(RenderState::AlphaRef(state.alpha_ref));
        }
    }

    fn apply_blend(&mut self, states: BlendStates, target: Blend) {
        let slot = if states.separate {
            &mut self.live.separate_blend
        } else {
            &mut self.live.blend
        };

        if slot.enable != target.enable {
            slot.enable = target.enable;
            self.device.set_render_state((states.enable)(target.enable));
        }
        if !target.enable {
            return;
        }
        if slot.src != target.src {
            slot.src = target.src;
            self.device.set_render_state((states.src)(target.src));
        }
        if slot.dst != target.dst {
            slot.dst = target.dst;
            self.device.set_render_state((states.dst)(target.dst));
        }
        if slot.op != target.op {
            slot.op = target.op;
            self.device.set_render_state((states.op)(target.op));
        }
    }

    fn apply_combiner(&mut self, index: usize, channel: Channel, stage: &TextureStageState) {
        let target = channel.target(stage);
        let live = channel.live(&mut self.live.stages[index]);

        if live.op != target.op {
            live.op = target.op;
            self.device
                .set_texture_stage_state(index, channel.op(target.op));
        }
        if target.op == CombineOp::Disable {
            return;
        }
        if live.arg1 != target.arg1 {
            live.arg1 = target.arg1;
            self.device
                .set_texture_stage_state(index, channel.arg1(target.arg1));
        }
        if live.arg2 != target.arg2 {
            live.arg2 = target.arg2;
            self.device
                .set_texture_stage_state(index, channel.arg2(target.arg2));
        }
    }

    /// Issues `mask` with the write overrides applied, if that changes the device.
    pub fn set_color_write(&mut self, mask: ColorWriteMask) {
        let mask = self.live.overrides.mask_color_write(mask);
        if self.live.color_write != mask {
            self.live.color_write = mask;
            self.device.set_render_state(RenderState::ColorWriteEnable(mask));
        }
    }

    pub fn apply_srgb_write(&mut self, state: &PipelineState) {
        if self.live.linear_frame_buffer {
            // Linear render targets take linear values straight from the shader.
            self.device
                .set_render_state(RenderState::SrgbWriteEnable(false));
            return;
        }

        let enable = state.srgb_write_enable && !self.caps.shader_srgb_conversion;
        self.device
            .set_render_state(RenderState::SrgbWriteEnable(enable));
        if self.caps.fog_color_in_linear_space {
            self.apply_fog(state);
        }
    }

    fn apply_fog(&mut self, state: &PipelineState) {
        self.device.apply_fog(FogParams {
            mode: state.fog_mode,
            srgb_write: state.srgb_write_enable,
            disable_gamma_correction: state.disable_fog_gamma_correction,
            fixed_function: state.using_fixed_function,
        });
    }

    /// Reasserts every active override on top of what the last transition applied to reach
    /// `state`, and puts back the fields of overrides that were switched off without a restore.
    pub fn perform_overrides(&mut self, state: &PipelineState) {
        let overrides = self.live.overrides;
        let pending = std::mem::take(&mut self.live.overrides.pending_restore);

        if overrides.force_depth_func_equals {
            self.set_z_func(CompareFunc::Equal);
        } else if pending.contains(PendingRestore::DEPTH_FUNC) {
            self.set_z_func(state.z_func);
        }
        if overrides.depth_enable {
            self.set_z_enable(true);
            self.set_z_write(overrides.depth_write_value);
        } else if pending.contains(PendingRestore::DEPTH_ENABLE) {
            self.set_z_enable(state.z_enable);
            self.set_z_write(state.z_write_enable);
        }
        if overrides.alpha_write
            || overrides.color_write
            || pending.contains(PendingRestore::COLOR_WRITE)
        {
            self.set_color_write(state.color_write);
        }
    }

    /// Binds the shaders `state` draws with, skipping slots that already hold them.
    pub fn bind_shaders(&mut self, state: &PipelineState, binding: &ShaderBinding) {
        let (vertex, pixel) = if state.using_fixed_function {
            (ShaderHandle::NONE, ShaderHandle::NONE)
        } else {
            (binding.vertex_shader, binding.pixel_shader)
        };

        if self.live.vertex_shader != Some(vertex) {
            self.live.vertex_shader = Some(vertex);
            self.device.set_vertex_shader(vertex);
            self.stats.shader_binds += 1;
        }
        if self.live.pixel_shader != Some(pixel) {
            self.live.pixel_shader = Some(pixel);
            self.device.set_pixel_shader(pixel);
            self.stats.shader_binds += 1;
        }
    }

    /// Resets the mirror to startup values and pushes them to the device without diffing.
    ///
    /// Clears the linear framebuffer flag and installs `overrides` in place of the active ones.
    /// Shader slots become unknown.
    pub fn reset_to_startup(&mut self, overrides: Overrides) {
        *self.live = LiveState::startup(self.caps.texture_stage_count);
        self.live.overrides = overrides;

        for states in [MAIN_BLEND, SEPARATE_BLEND] {
            self.device.set_render_state((states.enable)(false));
            self.device.set_render_state((states.src)(BlendFactor::One));
            self.device.set_render_state((states.dst)(BlendFactor::Zero));
            self.device.set_render_state((states.op)(BlendOp::Add));
        }

        self.device.set_render_state(RenderState::ZEnable(true));
        self.device
            .set_render_state(RenderState::ZFunc(CompareFunc::LessEqual));
        self.device
            .set_render_state(RenderState::DepthBias(PolygonOffset::Disabled));

        self.device.set_render_state(RenderState::AlphaTestEnable(false));
        self.device
            .set_render_state(RenderState::AlphaFunc(CompareFunc::GreaterEqual));
        self.device.set_render_state(RenderState::AlphaRef(0));

        for i in 0..self.caps.texture_stage_count {
            let arg2 = default_arg2(i);
            for channel in [Channel::Color, Channel::Alpha] {
                self.device
                    .set_texture_stage_state(i, channel.op(CombineOp::Disable));
                self.device
                    .set_texture_stage_state(i, channel.arg1(CombineArg::Texture));
                self.device.set_texture_stage_state(i, channel.arg2(arg2));
            }
        }

        for i in 0..self.caps.sampler_count {
            self.device.set_sampler_state(i, SamplerValue::SrgbTexture(false));
            if self.caps.supports_fetch4 {
                self.device.set_sampler_state(i, SamplerValue::Fetch4(false));
            }
            if self.caps.supports_shadow_filter {
                self.device.set_sampler_state(i, SamplerValue::ShadowFilter(false));
            }
        }
    }
}
