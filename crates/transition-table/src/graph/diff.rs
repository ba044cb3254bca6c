//! Op emission for one edge of the transition graph.

use crate::device::DeviceCaps;
use crate::ops::{RenderFunc, StageFunc, StateOp};
use crate::state::{CombineOp, PipelineState};

/// Appends the ops that move the device from `from` to `to`.
///
/// With `force` set every field is emitted regardless of `from` (the default edge). Emission order
/// is fixed: callers observe it as the order of device calls within a transition.
pub(crate) fn push_transition_ops(
    from: &PipelineState,
    to: &PipelineState,
    force: bool,
    caps: &DeviceCaps,
    out: &mut Vec<StateOp>,
) {
    let render = |out: &mut Vec<StateOp>, func: RenderFunc, differs: bool| {
        if force || differs {
            out.push(StateOp::render(func));
        }
    };

    render(out, RenderFunc::ZWriteEnable, to.z_write_enable != from.z_write_enable);
    render(out, RenderFunc::ColorWriteEnable, to.color_write != from.color_write);
    render(out, RenderFunc::FillMode, to.fill_mode != from.fill_mode);
    render(out, RenderFunc::Lighting, to.lighting != from.lighting);
    render(out, RenderFunc::SpecularEnable, to.specular_enable != from.specular_enable);
    render(out, RenderFunc::SrgbWriteEnable, to.srgb_write_enable != from.srgb_write_enable);
    render(
        out,
        RenderFunc::DiffuseMaterialSource,
        to.diffuse_material_source != from.diffuse_material_source,
    );

    push_folded_ops(from, to, force, caps, out);

    render(out, RenderFunc::CullEnable, to.cull_enable != from.cull_enable);
    render(out, RenderFunc::AlphaToCoverage, to.alpha_to_coverage != from.alpha_to_coverage);
    render(
        out,
        RenderFunc::VertexBlendEnable,
        to.vertex_blend_enable != from.vertex_blend_enable,
    );

    // Fog is set up differently on the fixed-function and programmable paths.
    render(
        out,
        RenderFunc::FogMode,
        to.fog_mode != from.fog_mode || to.using_fixed_function != from.using_fixed_function,
    );

    let textures_differ = to
        .samplers
        .iter()
        .zip(&from.samplers)
        .any(|(t, f)| t.texture_enable != f.texture_enable);
    render(out, RenderFunc::TextureEnable, textures_differ);
}

/// Fields whose ops cover several device values, plus per-stage and per-sampler fields.
fn push_folded_ops(
    from: &PipelineState,
    to: &PipelineState,
    force: bool,
    caps: &DeviceCaps,
    out: &mut Vec<StateOp>,
) {
    // Blend factors only matter while the target blends.
    let blend_differs = to.alpha_blend_enable != from.alpha_blend_enable
        || (to.alpha_blend_enable
            && (to.src_blend != from.src_blend
                || to.dst_blend != from.dst_blend
                || to.blend_op != from.blend_op));
    if force || blend_differs {
        out.push(StateOp::render(RenderFunc::AlphaBlend));
    }

    let separate_differs = to.separate_alpha_blend_enable != from.separate_alpha_blend_enable
        || (to.separate_alpha_blend_enable
            && (to.src_blend_alpha != from.src_blend_alpha
                || to.dst_blend_alpha != from.dst_blend_alpha
                || to.blend_op_alpha != from.blend_op_alpha));
    if force || separate_differs {
        out.push(StateOp::render(RenderFunc::SeparateAlphaBlend));
    }

    let alpha_test_differs = to.alpha_test_enable != from.alpha_test_enable
        || (to.alpha_test_enable
            && (to.alpha_func != from.alpha_func || to.alpha_ref != from.alpha_ref));
    if force || alpha_test_differs {
        out.push(StateOp::render(RenderFunc::AlphaTest));
    }

    let depth_differs = to.z_enable != from.z_enable
        || (to.z_enable && to.z_func != from.z_func)
        || to.z_bias != from.z_bias;
    if force || depth_differs {
        out.push(StateOp::render(RenderFunc::DepthTest));
    }

    // Entering fixed function re-applies every stage combiner.
    if force || (to.using_fixed_function && !from.using_fixed_function) {
        out.push(StateOp::render(RenderFunc::ActivateFixedFunction));
    }

    if force || to.disable_fog_gamma_correction != from.disable_fog_gamma_correction {
        out.push(StateOp::render(RenderFunc::DisableFogGammaCorrection));
    }

    let diff_combiners = !force && to.using_fixed_function && from.using_fixed_function;
    for (i, (t, f)) in to.texture_stages.iter().zip(&from.texture_stages).enumerate() {
        if diff_combiners {
            let color_live = t.color_op != CombineOp::Disable || f.color_op != CombineOp::Disable;
            if color_live
                && (t.color_op != f.color_op
                    || t.color_arg1 != f.color_arg1
                    || t.color_arg2 != f.color_arg2)
            {
                out.push(StateOp::stage(StageFunc::ColorTextureStage, i));
            }

            let alpha_live = t.alpha_op != CombineOp::Disable || f.alpha_op != CombineOp::Disable;
            if alpha_live
                && (t.alpha_op != f.alpha_op
                    || t.alpha_arg1 != f.alpha_arg1
                    || t.alpha_arg2 != f.alpha_arg2)
            {
                out.push(StateOp::stage(StageFunc::AlphaTextureStage, i));
            }
        }

        if force || t.tex_coord_index != f.tex_coord_index {
            out.push(StateOp::stage(StageFunc::TexCoordIndex, i));
        }
    }

    for (i, (t, f)) in to.samplers.iter().zip(&from.samplers).enumerate() {
        if force || t.srgb_read_enable != f.srgb_read_enable {
            out.push(StateOp::stage(StageFunc::SrgbReadEnable, i));
        }
        if force || t.fetch4_enable != f.fetch4_enable {
            out.push(StateOp::stage(StageFunc::Fetch4Enable, i));
        }
        if caps.supports_shadow_filter && (force || t.shadow_filter_enable != f.shadow_filter_enable)
        {
            out.push(StateOp::stage(StageFunc::ShadowFilterEnable, i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::DecodedOp;
    use crate::state::{BlendFactor, CombineArg, CompareFunc, FogMode, PolygonOffset};
    use pretty_assertions::assert_eq;

    fn caps() -> DeviceCaps {
        DeviceCaps {
            texture_stage_count: 2,
            sampler_count: 2,
            ..DeviceCaps::default()
        }
    }

    fn base() -> PipelineState {
        PipelineState::new_default(2, 2)
    }

    fn diff(from: &PipelineState, to: &PipelineState) -> Vec<DecodedOp> {
        let mut out = Vec::new();
        push_transition_ops(from, to, false, &caps(), &mut out);
        out.into_iter().map(StateOp::decode).collect()
    }

    #[test]
    fn identical_states_emit_nothing() {
        assert_eq!(diff(&base(), &base()), vec![]);
    }

    #[test]
    fn blend_factors_are_ignored_while_blending_stays_off() {
        let mut to = base();
        to.src_blend = BlendFactor::SrcAlpha;
        to.dst_blend = BlendFactor::InvSrcAlpha;
        assert_eq!(diff(&base(), &to), vec![]);

        to.alpha_blend_enable = true;
        assert_eq!(diff(&base(), &to), vec![DecodedOp::Render(RenderFunc::AlphaBlend)]);
    }

    #[test]
    fn blend_disable_ignores_source_factors() {
        let mut from = base();
        from.alpha_blend_enable = true;
        from.src_blend = BlendFactor::SrcAlpha;
        assert_eq!(diff(&from, &base()), vec![DecodedOp::Render(RenderFunc::AlphaBlend)]);
    }

    #[test]
    fn depth_folds_enable_func_and_bias() {
        let mut to = base();
        to.z_func = CompareFunc::Always;
        to.z_bias = PolygonOffset::Decal;
        assert_eq!(diff(&base(), &to), vec![DecodedOp::Render(RenderFunc::DepthTest)]);

        // Compare function is irrelevant while the target has depth off.
        let mut from = base();
        from.z_enable = false;
        let mut to = from.clone();
        to.z_func = CompareFunc::Never;
        assert_eq!(diff(&from, &to), vec![]);
    }

    #[test]
    fn alpha_test_reference_only_matters_when_enabled() {
        let mut to = base();
        to.alpha_ref = 10;
        assert_eq!(diff(&base(), &to), vec![]);

        let mut from = base();
        from.alpha_test_enable = true;
        let mut to = from.clone();
        to.alpha_ref = 10;
        assert_eq!(diff(&from, &to), vec![DecodedOp::Render(RenderFunc::AlphaTest)]);
    }

    #[test]
    fn entering_fixed_function_replaces_per_stage_combiner_ops() {
        let mut from = base();
        from.using_fixed_function = false;
        let mut to = base();
        to.texture_stages[0].color_op = CombineOp::Modulate;

        assert_eq!(
            diff(&from, &to),
            vec![
                DecodedOp::Render(RenderFunc::ActivateFixedFunction),
                DecodedOp::Render(RenderFunc::FogMode),
            ]
        );

        // Leaving fixed function emits nothing for the stages.
        assert_eq!(diff(&to, &from), vec![DecodedOp::Render(RenderFunc::FogMode)]);
    }

    #[test]
    fn disabled_stages_ignore_operands() {
        let mut to = base();
        to.texture_stages[1].color_arg1 = CombineArg::Diffuse;
        to.texture_stages[1].alpha_arg2 = CombineArg::Texture;
        assert_eq!(diff(&base(), &to), vec![]);

        to.texture_stages[1].alpha_op = CombineOp::SelectArg1;
        assert_eq!(
            diff(&base(), &to),
            vec![DecodedOp::Stage(StageFunc::AlphaTextureStage, 1)]
        );
    }

    #[test]
    fn per_stage_and_sampler_fields_are_independent() {
        let mut to = base();
        to.texture_stages[1].tex_coord_index = 0;
        to.samplers[0].srgb_read_enable = true;
        to.samplers[1].fetch4_enable = true;
        to.samplers[1].shadow_filter_enable = true;

        // Shadow filtering is not diffed on devices without it.
        assert_eq!(
            diff(&base(), &to),
            vec![
                DecodedOp::Stage(StageFunc::TexCoordIndex, 1),
                DecodedOp::Stage(StageFunc::SrgbReadEnable, 0),
                DecodedOp::Stage(StageFunc::Fetch4Enable, 1),
            ]
        );
    }

    #[test]
    fn texture_enables_collapse_into_one_op() {
        let mut to = base();
        to.samplers[0].texture_enable = true;
        to.samplers[1].texture_enable = true;
        assert_eq!(diff(&base(), &to), vec![DecodedOp::Render(RenderFunc::TextureEnable)]);
    }

    #[test]
    fn fog_follows_pipeline_selection() {
        let mut to = base();
        to.fog_mode = FogMode::FogColor;
        assert_eq!(diff(&base(), &to), vec![DecodedOp::Render(RenderFunc::FogMode)]);
    }

    #[test]
    fn forced_edge_covers_every_field_once() {
        let caps = DeviceCaps {
            supports_shadow_filter: true,
            ..caps()
        };
        let state = base();
        let mut out = Vec::new();
        push_transition_ops(&state, &state, true, &caps, &mut out);

        let stage_ops = 2;
        let sampler_ops = 2 * 3;
        assert_eq!(out.len(), RenderFunc::COUNT + stage_ops + sampler_ops);
        assert_eq!(out[0].decode(), DecodedOp::Render(RenderFunc::ZWriteEnable));
        assert_eq!(
            out.last().map(|op| op.decode()),
            Some(DecodedOp::Render(RenderFunc::TextureEnable))
        );
    }
}
