//! What the table believes the device currently holds.
//!
//! Only fields whose apply paths skip redundant calls are mirrored here. Everything else is set
//! unconditionally when its op runs.

use bitflags::bitflags;

use crate::state::{
    default_arg2, BlendFactor, BlendOp, ColorWriteMask, CombineArg, CombineOp, CompareFunc,
    PolygonOffset, ShaderHandle,
};

/// One fixed-function combiner (color or alpha) of a texture stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Combiner {
    pub op: CombineOp,
    pub arg1: CombineArg,
    pub arg2: CombineArg,
}

impl Combiner {
    pub fn startup(stage: usize) -> Self {
        Self {
            op: CombineOp::Disable,
            arg1: CombineArg::Texture,
            arg2: default_arg2(stage),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LiveStage {
    pub color: Combiner,
    pub alpha: Combiner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Blend {
    pub enable: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
}

impl Blend {
    const STARTUP: Self = Self {
        enable: false,
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
        op: BlendOp::Add,
    };
}

bitflags! {
    /// Overrides switched off while the device could not take calls. Their fields still hold the
    /// forced values until the next transition puts the active state's values back.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct PendingRestore: u8 {
        const DEPTH_FUNC = 1 << 0;
        const DEPTH_ENABLE = 1 << 1;
        const COLOR_WRITE = 1 << 2;
    }
}

/// Adjustments layered over whatever state is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub force_depth_func_equals: bool,
    pub depth_enable: bool,
    pub depth_write_value: bool,
    pub alpha_write: bool,
    pub alpha_write_value: bool,
    pub color_write: bool,
    pub color_write_value: bool,
    pub pending_restore: PendingRestore,
}

impl Overrides {
    /// `mask` with the write overrides applied.
    pub fn mask_color_write(&self, mut mask: ColorWriteMask) -> ColorWriteMask {
        if self.alpha_write {
            mask.set(ColorWriteMask::ALPHA, self.alpha_write_value);
        }
        if self.color_write {
            mask.set(ColorWriteMask::RGB, self.color_write_value);
        }
        mask
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LiveState {
    pub z_enable: bool,
    pub z_func: CompareFunc,
    pub z_bias: PolygonOffset,

    pub alpha_test_enable: bool,
    pub alpha_func: CompareFunc,
    pub alpha_ref: u8,

    pub blend: Blend,
    pub separate_blend: Blend,

    /// Includes the effect of the write overrides.
    pub color_write: ColorWriteMask,

    pub stages: Vec<LiveStage>,

    pub overrides: Overrides,
    pub linear_frame_buffer: bool,

    /// `None` until the table binds a shader itself.
    pub vertex_shader: Option<ShaderHandle>,
    pub pixel_shader: Option<ShaderHandle>,
}

impl LiveState {
    /// The values `use_default_state` pushes to the device before running the default edge.
    pub fn startup(stage_count: usize) -> Self {
        Self {
            z_enable: true,
            z_func: CompareFunc::LessEqual,
            z_bias: PolygonOffset::Disabled,

            alpha_test_enable: false,
            alpha_func: CompareFunc::GreaterEqual,
            alpha_ref: 0,

            blend: Blend::STARTUP,
            separate_blend: Blend::STARTUP,

            color_write: ColorWriteMask::RGB,

            stages: (0..stage_count)
                .map(|i| LiveStage {
                    color: Combiner::startup(i),
                    alpha: Combiner::startup(i),
                })
                .collect(),

            overrides: Overrides::default(),
            linear_frame_buffer: false,

            vertex_shader: None,
            pixel_shader: None,
        }
    }
}
