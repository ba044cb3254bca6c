#![cfg(not(target_arch = "wasm32"))]

mod common;

use common::{effective, full_caps, SAMPLERS, STAGES};
use proptest::prelude::*;
use proptest::sample::{select, Index};
use transition_table::{
    BlendFactor, BlendOp, CombineArg, CombineOp, CompareFunc, DecodedOp, DeviceCaps, FillMode,
    FogMode, OpRange, PipelineState, PolygonOffset, RecordingDevice, RenderFunc, ShaderHandle,
    SnapshotId, StageFunc, StateShadow, TableConfig, TransitionTable,
};

/// One setter call on a [`StateShadow`].
#[derive(Clone, Debug)]
enum Edit {
    DepthTest(bool),
    DepthFunc(CompareFunc),
    DepthWrites(bool),
    PolygonOffset(PolygonOffset),
    ColorWrites(bool),
    AlphaWrites(bool),
    AlphaTest(bool),
    AlphaFunc(CompareFunc, u8),
    Blending(bool),
    BlendFunc(BlendFactor, BlendFactor),
    BlendOp(BlendOp),
    SeparateAlpha(bool),
    SeparateAlphaFunc(BlendFactor, BlendFactor),
    AlphaToCoverage(bool),
    FillMode(FillMode),
    Culling(bool),
    Lighting(bool),
    SrgbWrite(bool),
    Fog(FogMode),
    FogGamma(bool),
    ColorCombine(usize, CombineOp, CombineArg, CombineArg),
    AlphaCombine(usize, CombineOp, CombineArg, CombineArg),
    TexCoordIndex(usize, u8),
    Texture(usize, bool),
    SrgbRead(usize, bool),
    Fetch4(usize, bool),
    ShadowFilter(usize, bool),
    Shaders(u32, u32),
    FixedFunction,
}

impl Edit {
    fn apply(&self, shadow: &mut StateShadow) {
        match *self {
            Self::DepthTest(v) => shadow.enable_depth_test(v),
            Self::DepthFunc(f) => shadow.depth_func(f),
            Self::DepthWrites(v) => shadow.enable_depth_writes(v),
            Self::PolygonOffset(o) => shadow.enable_polygon_offset(o),
            Self::ColorWrites(v) => shadow.enable_color_writes(v),
            Self::AlphaWrites(v) => shadow.enable_alpha_writes(v),
            Self::AlphaTest(v) => shadow.enable_alpha_test(v),
            Self::AlphaFunc(f, r) => shadow.alpha_func(f, r),
            Self::Blending(v) => shadow.enable_blending(v),
            Self::BlendFunc(s, d) => shadow.blend_func(s, d),
            Self::BlendOp(op) => shadow.blend_op(op),
            Self::SeparateAlpha(v) => shadow.enable_blending_separate_alpha(v),
            Self::SeparateAlphaFunc(s, d) => shadow.blend_func_separate_alpha(s, d),
            Self::AlphaToCoverage(v) => shadow.enable_alpha_to_coverage(v),
            Self::FillMode(m) => shadow.fill_mode(m),
            Self::Culling(v) => shadow.enable_culling(v),
            Self::Lighting(v) => shadow.enable_lighting(v),
            Self::SrgbWrite(v) => shadow.enable_srgb_write(v),
            Self::Fog(m) => shadow.fog_mode(m),
            Self::FogGamma(v) => shadow.disable_fog_gamma_correction(v),
            Self::ColorCombine(i, op, a, b) => shadow.color_combine(i, op, a, b),
            Self::AlphaCombine(i, op, a, b) => shadow.alpha_combine(i, op, a, b),
            Self::TexCoordIndex(i, index) => shadow.tex_coord_index(i, index),
            Self::Texture(i, v) => shadow.enable_texture(i, v),
            Self::SrgbRead(i, v) => shadow.enable_srgb_read(i, v),
            Self::Fetch4(i, v) => shadow.enable_fetch4(i, v),
            Self::ShadowFilter(i, v) => shadow.enable_shadow_filter(i, v),
            Self::Shaders(vs, ps) => {
                shadow.set_vertex_shader(ShaderHandle(vs), 0);
                shadow.set_pixel_shader(ShaderHandle(ps), 0);
            }
            Self::FixedFunction => shadow.use_fixed_function(),
        }
    }
}

// Value pools are kept small so generated shadows collide often.

fn compare_func() -> impl Strategy<Value = CompareFunc> {
    select(vec![CompareFunc::LessEqual, CompareFunc::Equal, CompareFunc::Always])
}

fn blend_factor() -> impl Strategy<Value = BlendFactor> {
    select(vec![
        BlendFactor::One,
        BlendFactor::Zero,
        BlendFactor::SrcAlpha,
        BlendFactor::InvSrcAlpha,
    ])
}

fn combine_op() -> impl Strategy<Value = CombineOp> {
    select(vec![CombineOp::Disable, CombineOp::SelectArg1, CombineOp::Modulate])
}

fn combine_arg() -> impl Strategy<Value = CombineArg> {
    select(vec![CombineArg::Texture, CombineArg::Diffuse, CombineArg::Current])
}

fn depth_edit() -> BoxedStrategy<Edit> {
    prop_oneof![
        any::<bool>().prop_map(Edit::DepthTest),
        compare_func().prop_map(Edit::DepthFunc),
        any::<bool>().prop_map(Edit::DepthWrites),
        select(vec![PolygonOffset::Disabled, PolygonOffset::Decal]).prop_map(Edit::PolygonOffset),
        any::<bool>().prop_map(Edit::ColorWrites),
        any::<bool>().prop_map(Edit::AlphaWrites),
    ]
    .boxed()
}

fn blend_edit() -> BoxedStrategy<Edit> {
    prop_oneof![
        any::<bool>().prop_map(Edit::AlphaTest),
        (compare_func(), select(vec![0u8, 1, 128])).prop_map(|(f, r)| Edit::AlphaFunc(f, r)),
        any::<bool>().prop_map(Edit::Blending),
        (blend_factor(), blend_factor()).prop_map(|(s, d)| Edit::BlendFunc(s, d)),
        select(vec![BlendOp::Add, BlendOp::Max]).prop_map(Edit::BlendOp),
        any::<bool>().prop_map(Edit::SeparateAlpha),
        (blend_factor(), blend_factor()).prop_map(|(s, d)| Edit::SeparateAlphaFunc(s, d)),
        any::<bool>().prop_map(Edit::AlphaToCoverage),
    ]
    .boxed()
}

fn raster_edit() -> BoxedStrategy<Edit> {
    prop_oneof![
        select(vec![FillMode::Solid, FillMode::Wireframe]).prop_map(Edit::FillMode),
        any::<bool>().prop_map(Edit::Culling),
        any::<bool>().prop_map(Edit::Lighting),
        any::<bool>().prop_map(Edit::SrgbWrite),
        select(vec![FogMode::Disabled, FogMode::FogColor, FogMode::Black]).prop_map(Edit::Fog),
        any::<bool>().prop_map(Edit::FogGamma),
    ]
    .boxed()
}

fn stage_edit() -> BoxedStrategy<Edit> {
    prop_oneof![
        (0..STAGES, combine_op(), combine_arg(), combine_arg())
            .prop_map(|(i, op, a, b)| Edit::ColorCombine(i, op, a, b)),
        (0..STAGES, combine_op(), combine_arg(), combine_arg())
            .prop_map(|(i, op, a, b)| Edit::AlphaCombine(i, op, a, b)),
        (0..STAGES, 0u8..2).prop_map(|(i, index)| Edit::TexCoordIndex(i, index)),
        (0..SAMPLERS, any::<bool>()).prop_map(|(i, v)| Edit::Texture(i, v)),
        (0..SAMPLERS, any::<bool>()).prop_map(|(i, v)| Edit::SrgbRead(i, v)),
        (0..SAMPLERS, any::<bool>()).prop_map(|(i, v)| Edit::Fetch4(i, v)),
        (0..SAMPLERS, any::<bool>()).prop_map(|(i, v)| Edit::ShadowFilter(i, v)),
    ]
    .boxed()
}

fn pipeline_edit() -> BoxedStrategy<Edit> {
    prop_oneof![
        2 => (0u32..3, 0u32..3).prop_map(|(vs, ps)| Edit::Shaders(vs, ps)),
        1 => Just(Edit::FixedFunction),
    ]
    .boxed()
}

fn arb_shadow() -> impl Strategy<Value = StateShadow> {
    let edit = prop_oneof![
        3 => depth_edit(),
        3 => blend_edit(),
        2 => raster_edit(),
        3 => stage_edit(),
        1 => pipeline_edit(),
    ];
    prop::collection::vec(edit, 0..8).prop_map(|edits| {
        let mut shadow = StateShadow::new(STAGES, SAMPLERS);
        for edit in &edits {
            edit.apply(&mut shadow);
        }
        shadow
    })
}

fn build(caps: DeviceCaps, shadows: &[StateShadow]) -> (TransitionTable, Vec<SnapshotId>) {
    let mut table = TransitionTable::new(caps, TableConfig::default()).unwrap();
    let ids = shadows
        .iter()
        .map(|shadow| table.take_snapshot(shadow).unwrap())
        .collect();
    (table, ids)
}

/// Whether `op` writes at least one device value that differs between `from` and `to`.
fn touches_difference(from: &PipelineState, to: &PipelineState, op: DecodedOp) -> bool {
    match op {
        DecodedOp::Render(func) => match func {
            RenderFunc::DepthTest => {
                (from.z_enable, from.z_func, from.z_bias) != (to.z_enable, to.z_func, to.z_bias)
            }
            RenderFunc::ZWriteEnable => from.z_write_enable != to.z_write_enable,
            RenderFunc::ColorWriteEnable => from.color_write != to.color_write,
            RenderFunc::AlphaTest => {
                (from.alpha_test_enable, from.alpha_func, from.alpha_ref)
                    != (to.alpha_test_enable, to.alpha_func, to.alpha_ref)
            }
            RenderFunc::FillMode => from.fill_mode != to.fill_mode,
            RenderFunc::Lighting => from.lighting != to.lighting,
            RenderFunc::SpecularEnable => from.specular_enable != to.specular_enable,
            RenderFunc::SrgbWriteEnable => from.srgb_write_enable != to.srgb_write_enable,
            RenderFunc::AlphaBlend => {
                (from.alpha_blend_enable, from.src_blend, from.dst_blend, from.blend_op)
                    != (to.alpha_blend_enable, to.src_blend, to.dst_blend, to.blend_op)
            }
            RenderFunc::SeparateAlphaBlend => {
                (
                    from.separate_alpha_blend_enable,
                    from.src_blend_alpha,
                    from.dst_blend_alpha,
                    from.blend_op_alpha,
                ) != (
                    to.separate_alpha_blend_enable,
                    to.src_blend_alpha,
                    to.dst_blend_alpha,
                    to.blend_op_alpha,
                )
            }
            RenderFunc::CullEnable => from.cull_enable != to.cull_enable,
            RenderFunc::VertexBlendEnable => from.vertex_blend_enable != to.vertex_blend_enable,
            RenderFunc::FogMode => {
                from.fog_mode != to.fog_mode || from.using_fixed_function != to.using_fixed_function
            }
            RenderFunc::ActivateFixedFunction => {
                from.using_fixed_function != to.using_fixed_function
            }
            RenderFunc::TextureEnable => from
                .samplers
                .iter()
                .zip(&to.samplers)
                .any(|(f, t)| f.texture_enable != t.texture_enable),
            RenderFunc::DiffuseMaterialSource => {
                from.diffuse_material_source != to.diffuse_material_source
            }
            RenderFunc::DisableFogGammaCorrection => {
                from.disable_fog_gamma_correction != to.disable_fog_gamma_correction
            }
            RenderFunc::AlphaToCoverage => from.alpha_to_coverage != to.alpha_to_coverage,
        },
        DecodedOp::Stage(func, i) => match func {
            StageFunc::TexCoordIndex => {
                from.texture_stages[i].tex_coord_index != to.texture_stages[i].tex_coord_index
            }
            StageFunc::SrgbReadEnable => {
                from.samplers[i].srgb_read_enable != to.samplers[i].srgb_read_enable
            }
            StageFunc::Fetch4Enable => from.samplers[i].fetch4_enable != to.samplers[i].fetch4_enable,
            StageFunc::ShadowFilterEnable => {
                from.samplers[i].shadow_filter_enable != to.samplers[i].shadow_filter_enable
            }
            StageFunc::ColorTextureStage => {
                let (f, t) = (&from.texture_stages[i], &to.texture_stages[i]);
                (f.color_op, f.color_arg1, f.color_arg2) != (t.color_op, t.color_arg1, t.color_arg2)
            }
            StageFunc::AlphaTextureStage => {
                let (f, t) = (&from.texture_stages[i], &to.texture_stages[i]);
                (f.alpha_op, f.alpha_arg1, f.alpha_arg2) != (t.alpha_op, t.alpha_arg1, t.alpha_arg2)
            }
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        rng_algorithm: proptest::test_runner::RngAlgorithm::ChaCha,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0x7A_B1_E5),
        .. ProptestConfig::default()
    })]

    #[test]
    fn same_history_builds_the_same_table(shadows in prop::collection::vec(arb_shadow(), 1..12)) {
        let (a, a_ids) = build(full_caps(), &shadows);
        let (b, b_ids) = build(full_caps(), &shadows);

        prop_assert_eq!(a_ids, b_ids);
        prop_assert_eq!(a.state_count(), b.state_count());
        prop_assert_eq!(a.op_count(), b.op_count());
        for to in a.state_ids() {
            for from in a.state_ids() {
                prop_assert_eq!(a.edge(to, from), b.edge(to, from));
            }
        }
    }

    #[test]
    fn equal_aggregates_share_one_state(shadows in prop::collection::vec(arb_shadow(), 1..12)) {
        let (table, ids) = build(full_caps(), &shadows);

        for (shadow, &id) in shadows.iter().zip(&ids) {
            let state = table.snapshot_state_id(id);
            prop_assert_eq!(table.state(state), &shadow.compute_aggregate());
            prop_assert_eq!(table.find_state(&shadow.compute_aggregate()), Some(state));
            prop_assert_eq!(table.shader_binding(id), shadow.binding());
        }
        for a in table.state_ids() {
            for b in table.state_ids().skip(a.index() + 1) {
                prop_assert_ne!(table.state(a), table.state(b));
            }
        }
    }

    #[test]
    fn applied_snapshots_reach_their_state(
        shadows in prop::collection::vec(arb_shadow(), 1..10),
        order in prop::collection::vec(any::<Index>(), 1..24),
        fog_color_in_linear_space in any::<bool>(),
    ) {
        let caps = DeviceCaps {
            fog_color_in_linear_space,
            ..full_caps()
        };
        let (mut table, ids) = build(caps, &shadows);
        let mut device = RecordingDevice::new(&caps);

        for index in order {
            let id = ids[index.index(ids.len())];
            table.use_snapshot(&mut device, id);

            let state = table.state(table.snapshot_state_id(id));
            prop_assert_eq!(effective(device.board()), effective(state));

            let fog = device.fog().unwrap();
            prop_assert_eq!(fog.mode, state.fog_mode);
            prop_assert_eq!(fog.disable_gamma_correction, state.disable_fog_gamma_correction);
            prop_assert_eq!(fog.fixed_function, state.using_fixed_function);
            if fog_color_in_linear_space {
                prop_assert_eq!(fog.srgb_write, state.srgb_write_enable);
            }

            let binding = table.shader_binding(id);
            let expected = if state.using_fixed_function {
                (ShaderHandle::NONE, ShaderHandle::NONE)
            } else {
                (binding.vertex_shader, binding.pixel_shader)
            };
            prop_assert_eq!(device.bound_shaders(), expected);
        }
    }

    #[test]
    fn edges_only_touch_differing_fields(shadows in prop::collection::vec(arb_shadow(), 1..12)) {
        let (table, _) = build(full_caps(), &shadows);

        for to in table.state_ids() {
            prop_assert!(table.edge(to, to).is_empty());
            for from in table.state_ids() {
                let ops = table.edge_ops(table.edge(to, from));
                for op in ops {
                    prop_assert!(
                        touches_difference(table.state(from), table.state(to), op.decode()),
                        "{:?} in edge {} -> {}",
                        op,
                        from.index(),
                        to.index()
                    );
                }
            }
        }
    }

    #[test]
    fn equal_op_lists_share_one_range(shadows in prop::collection::vec(arb_shadow(), 1..12)) {
        let (table, _) = build(full_caps(), &shadows);

        let mut ranges: Vec<OpRange> = vec![table.default_edge()];
        for to in table.state_ids() {
            for from in table.state_ids() {
                ranges.push(table.edge(to, from));
            }
        }

        for (i, &a) in ranges.iter().enumerate() {
            for &b in &ranges[i + 1..] {
                if table.edge_ops(a) == table.edge_ops(b) {
                    prop_assert_eq!(a, b);
                }
            }
        }
    }
}
