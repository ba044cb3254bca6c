#![allow(dead_code)]

use transition_table::{
    BlendFactor, BlendOp, CombineArg, CombineOp, CompareFunc, DeviceCaps, PipelineState,
    RecordingDevice, TableConfig, TransitionTable,
};

pub const STAGES: usize = 2;
pub const SAMPLERS: usize = 3;

pub fn caps() -> DeviceCaps {
    DeviceCaps {
        texture_stage_count: STAGES,
        sampler_count: SAMPLERS,
        ..DeviceCaps::default()
    }
}

pub fn full_caps() -> DeviceCaps {
    DeviceCaps {
        supports_fetch4: true,
        supports_shadow_filter: true,
        ..caps()
    }
}

/// Sends the crate's `tracing` output to the test harness's captured writer.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn table_and_device(caps: DeviceCaps) -> (TransitionTable, RecordingDevice) {
    let table = TransitionTable::new(caps, TableConfig::default()).unwrap();
    let device = RecordingDevice::new(&caps);
    (table, device)
}

/// `state` with every field the device may legitimately leave stale replaced by a fixed value.
///
/// Sub-fields of a disabled feature are never pushed to the device, and the combiners are left
/// alone while the programmable path is active.
pub fn effective(state: &PipelineState) -> PipelineState {
    let mut state = state.clone();

    if !state.z_enable {
        state.z_func = CompareFunc::LessEqual;
    }
    if !state.alpha_test_enable {
        state.alpha_func = CompareFunc::GreaterEqual;
        state.alpha_ref = 0;
    }
    if !state.alpha_blend_enable {
        state.src_blend = BlendFactor::One;
        state.dst_blend = BlendFactor::Zero;
        state.blend_op = BlendOp::Add;
    }
    if !state.separate_alpha_blend_enable {
        state.src_blend_alpha = BlendFactor::One;
        state.dst_blend_alpha = BlendFactor::Zero;
        state.blend_op_alpha = BlendOp::Add;
    }

    for stage in &mut state.texture_stages {
        if !state.using_fixed_function {
            stage.color_op = CombineOp::Disable;
            stage.alpha_op = CombineOp::Disable;
        }
        if stage.color_op == CombineOp::Disable {
            stage.color_arg1 = CombineArg::Texture;
            stage.color_arg2 = CombineArg::Texture;
        }
        if stage.alpha_op == CombineOp::Disable {
            stage.alpha_arg1 = CombineArg::Texture;
            stage.alpha_arg2 = CombineArg::Texture;
        }
    }

    state
}
