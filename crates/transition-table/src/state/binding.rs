use bytemuck::{Pod, Zeroable};
use xxhash_rust::xxh32::xxh32;

use super::StateId;

/// Opaque handle to a compiled shader owned by the shader manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

impl ShaderHandle {
    /// "No shader bound" (fixed-function rendering).
    pub const NONE: Self = Self(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for ShaderHandle {
    fn default() -> Self {
        Self::NONE
    }
}

/// Vertex/pixel shader pair plus their static variant indices.
///
/// Not part of [`super::PipelineState`]: two snapshots can share a state and differ only here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderBinding {
    pub vertex_shader: ShaderHandle,
    pub pixel_shader: ShaderHandle,
    pub static_vsh_index: u32,
    pub static_psh_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SnapshotKeyImage {
    state: u32,
    vertex_shader: u32,
    pixel_shader: u32,
    static_vsh_index: u32,
    static_psh_index: u32,
}

impl ShaderBinding {
    /// Checksum of the `(state, binding)` snapshot key.
    pub(crate) fn snapshot_checksum(&self, state: StateId) -> u32 {
        let image = SnapshotKeyImage {
            state: state.index() as u32,
            vertex_shader: self.vertex_shader.0,
            pixel_shader: self.pixel_shader.0,
            static_vsh_index: self.static_vsh_index,
            static_psh_index: self.static_psh_index,
        };
        xxh32(bytemuck::bytes_of(&image), 0)
    }
}
