use super::{
    default_arg2, BlendFactor, BlendOp, ColorWriteMask, CombineArg, CombineOp, CompareFunc,
    FillMode, FogMode, MaterialSource, PipelineState, PolygonOffset, ShaderBinding, ShaderHandle,
};
use crate::device::DeviceCaps;

/// The caller's intended state, filled in field by field before taking a snapshot.
///
/// Setters record exactly what was asked for. [`StateShadow::compute_aggregate`] then folds away
/// values that cannot affect rendering (blend factors while blending is off, combine operands on the
/// programmable path, ...) so that configurations which draw the same way dedup to the same
/// [`PipelineState`].
#[derive(Clone, Debug)]
pub struct StateShadow {
    state: PipelineState,
    binding: ShaderBinding,
}

impl StateShadow {
    pub fn new(stage_count: usize, sampler_count: usize) -> Self {
        Self {
            state: PipelineState::new_default(stage_count, sampler_count),
            binding: ShaderBinding::default(),
        }
    }

    pub fn for_caps(caps: &DeviceCaps) -> Self {
        Self::new(caps.texture_stage_count, caps.sampler_count)
    }

    pub fn binding(&self) -> &ShaderBinding {
        &self.binding
    }

    // Depth.

    pub fn enable_depth_test(&mut self, enable: bool) {
        self.state.z_enable = enable;
    }

    pub fn depth_func(&mut self, func: CompareFunc) {
        self.state.z_func = func;
    }

    pub fn enable_depth_writes(&mut self, enable: bool) {
        self.state.z_write_enable = enable;
    }

    pub fn enable_polygon_offset(&mut self, offset: PolygonOffset) {
        self.state.z_bias = offset;
    }

    // Color writes.

    pub fn enable_color_writes(&mut self, enable: bool) {
        self.state.color_write.set(ColorWriteMask::RGB, enable);
    }

    pub fn enable_alpha_writes(&mut self, enable: bool) {
        self.state.color_write.set(ColorWriteMask::ALPHA, enable);
    }

    // Alpha test and blending.

    pub fn enable_alpha_test(&mut self, enable: bool) {
        self.state.alpha_test_enable = enable;
    }

    pub fn alpha_func(&mut self, func: CompareFunc, reference: u8) {
        self.state.alpha_func = func;
        self.state.alpha_ref = reference;
    }

    pub fn enable_blending(&mut self, enable: bool) {
        self.state.alpha_blend_enable = enable;
    }

    pub fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.src_blend = src;
        self.state.dst_blend = dst;
    }

    pub fn blend_op(&mut self, op: BlendOp) {
        self.state.blend_op = op;
    }

    pub fn enable_blending_separate_alpha(&mut self, enable: bool) {
        self.state.separate_alpha_blend_enable = enable;
    }

    pub fn blend_func_separate_alpha(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.src_blend_alpha = src;
        self.state.dst_blend_alpha = dst;
    }

    pub fn blend_op_separate_alpha(&mut self, op: BlendOp) {
        self.state.blend_op_alpha = op;
    }

    pub fn enable_alpha_to_coverage(&mut self, enable: bool) {
        self.state.alpha_to_coverage = enable;
    }

    // Rasterizer and fixed-function lighting.

    pub fn fill_mode(&mut self, mode: FillMode) {
        self.state.fill_mode = mode;
    }

    pub fn enable_culling(&mut self, enable: bool) {
        self.state.cull_enable = enable;
    }

    pub fn enable_lighting(&mut self, enable: bool) {
        self.state.lighting = enable;
    }

    pub fn enable_specular(&mut self, enable: bool) {
        self.state.specular_enable = enable;
    }

    pub fn enable_vertex_blend(&mut self, enable: bool) {
        self.state.vertex_blend_enable = enable;
    }

    pub fn diffuse_material_source(&mut self, source: MaterialSource) {
        self.state.diffuse_material_source = source;
    }

    pub fn enable_srgb_write(&mut self, enable: bool) {
        self.state.srgb_write_enable = enable;
    }

    pub fn fog_mode(&mut self, mode: FogMode) {
        self.state.fog_mode = mode;
    }

    pub fn disable_fog_gamma_correction(&mut self, disable: bool) {
        self.state.disable_fog_gamma_correction = disable;
    }

    // Texture stages and samplers. Out-of-range indices panic.

    pub fn color_combine(&mut self, stage: usize, op: CombineOp, arg1: CombineArg, arg2: CombineArg) {
        let stage = &mut self.state.texture_stages[stage];
        stage.color_op = op;
        stage.color_arg1 = arg1;
        stage.color_arg2 = arg2;
    }

    pub fn alpha_combine(&mut self, stage: usize, op: CombineOp, arg1: CombineArg, arg2: CombineArg) {
        let stage = &mut self.state.texture_stages[stage];
        stage.alpha_op = op;
        stage.alpha_arg1 = arg1;
        stage.alpha_arg2 = arg2;
    }

    pub fn tex_coord_index(&mut self, stage: usize, index: u8) {
        self.state.texture_stages[stage].tex_coord_index = index;
    }

    pub fn enable_texture(&mut self, sampler: usize, enable: bool) {
        self.state.samplers[sampler].texture_enable = enable;
    }

    pub fn enable_srgb_read(&mut self, sampler: usize, enable: bool) {
        self.state.samplers[sampler].srgb_read_enable = enable;
    }

    pub fn enable_fetch4(&mut self, sampler: usize, enable: bool) {
        self.state.samplers[sampler].fetch4_enable = enable;
    }

    pub fn enable_shadow_filter(&mut self, sampler: usize, enable: bool) {
        self.state.samplers[sampler].shadow_filter_enable = enable;
    }

    // Pipeline selection.

    /// Selects the programmable path and records the vertex shader.
    pub fn set_vertex_shader(&mut self, shader: ShaderHandle, static_index: u32) {
        self.state.using_fixed_function = false;
        self.binding.vertex_shader = shader;
        self.binding.static_vsh_index = static_index;
    }

    /// Selects the programmable path and records the pixel shader.
    pub fn set_pixel_shader(&mut self, shader: ShaderHandle, static_index: u32) {
        self.state.using_fixed_function = false;
        self.binding.pixel_shader = shader;
        self.binding.static_psh_index = static_index;
    }

    /// Selects the fixed-function path. Recorded shaders are kept but never bound.
    pub fn use_fixed_function(&mut self) {
        self.state.using_fixed_function = true;
    }

    /// The normalized state a snapshot is taken of.
    pub fn compute_aggregate(&self) -> PipelineState {
        let mut state = self.state.clone();

        if !state.alpha_blend_enable {
            state.src_blend = BlendFactor::One;
            state.dst_blend = BlendFactor::Zero;
            state.blend_op = BlendOp::Add;
            state.separate_alpha_blend_enable = false;
        }

        if !state.separate_alpha_blend_enable {
            state.src_blend_alpha = BlendFactor::One;
            state.dst_blend_alpha = BlendFactor::Zero;
            state.blend_op_alpha = BlendOp::Add;
        }

        if !state.alpha_test_enable {
            state.alpha_func = CompareFunc::GreaterEqual;
            state.alpha_ref = 0;

            // A standard alpha blend never needs fully transparent texels.
            if state.alpha_blend_enable
                && state.src_blend == BlendFactor::SrcAlpha
                && state.dst_blend == BlendFactor::InvSrcAlpha
            {
                state.alpha_ref = 1;
            }
        }

        if !state.using_fixed_function {
            for (i, stage) in state.texture_stages.iter_mut().enumerate() {
                let arg2 = default_arg2(i);
                stage.color_op = CombineOp::Disable;
                stage.color_arg1 = CombineArg::Texture;
                stage.color_arg2 = arg2;
                stage.alpha_op = CombineOp::Disable;
                stage.alpha_arg1 = CombineArg::Texture;
                stage.alpha_arg2 = arg2;
                stage.tex_coord_index = i as u8;
            }
            state.lighting = false;
            state.specular_enable = false;
            state.vertex_blend_enable = false;
        }

        if state.alpha_to_coverage && (state.alpha_blend_enable || !state.alpha_test_enable) {
            state.alpha_to_coverage = false;
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blend_factors_are_canonical_while_blending_is_off() {
        let mut a = StateShadow::new(2, 2);
        a.blend_func(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha);
        a.blend_op(BlendOp::Max);

        let b = StateShadow::new(2, 2);
        assert_eq!(a.compute_aggregate(), b.compute_aggregate());

        a.enable_blending(true);
        let aggregate = a.compute_aggregate();
        assert_eq!(aggregate.src_blend, BlendFactor::SrcAlpha);
        assert_eq!(aggregate.blend_op, BlendOp::Max);
    }

    #[test]
    fn standard_alpha_blend_skips_transparent_texels() {
        let mut shadow = StateShadow::new(1, 1);
        shadow.enable_blending(true);
        shadow.blend_func(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha);

        let state = shadow.compute_aggregate();
        assert!(!state.alpha_test_enable);
        assert_eq!(state.alpha_func, CompareFunc::GreaterEqual);
        assert_eq!(state.alpha_ref, 1);
    }

    #[test]
    fn alpha_test_values_are_kept_when_enabled() {
        let mut shadow = StateShadow::new(1, 1);
        shadow.enable_alpha_test(true);
        shadow.alpha_func(CompareFunc::Greater, 128);

        let state = shadow.compute_aggregate();
        assert_eq!(state.alpha_func, CompareFunc::Greater);
        assert_eq!(state.alpha_ref, 128);
    }

    #[test]
    fn programmable_path_resets_fixed_function_fields() {
        let mut shadow = StateShadow::new(2, 2);
        shadow.color_combine(1, CombineOp::Modulate, CombineArg::Texture, CombineArg::Current);
        shadow.tex_coord_index(1, 0);
        shadow.enable_lighting(true);
        shadow.set_vertex_shader(ShaderHandle(3), 1);
        shadow.set_pixel_shader(ShaderHandle(4), 0);

        let state = shadow.compute_aggregate();
        assert!(!state.using_fixed_function);
        assert!(!state.lighting);
        assert_eq!(state.texture_stages, PipelineState::new_default(2, 2).texture_stages);
        assert_eq!(shadow.binding().vertex_shader, ShaderHandle(3));
    }

    #[test]
    fn alpha_to_coverage_needs_alpha_test_without_blending() {
        let mut shadow = StateShadow::new(1, 1);
        shadow.enable_alpha_to_coverage(true);
        assert!(!shadow.compute_aggregate().alpha_to_coverage);

        shadow.enable_alpha_test(true);
        assert!(shadow.compute_aggregate().alpha_to_coverage);

        shadow.enable_blending(true);
        assert!(!shadow.compute_aggregate().alpha_to_coverage);
    }

    #[test]
    fn separate_alpha_blend_requires_blending() {
        let mut shadow = StateShadow::new(1, 1);
        shadow.enable_blending_separate_alpha(true);
        shadow.blend_func_separate_alpha(BlendFactor::Zero, BlendFactor::One);
        let state = shadow.compute_aggregate();
        assert!(!state.separate_alpha_blend_enable);
        assert_eq!(state.src_blend_alpha, BlendFactor::One);
    }
}
