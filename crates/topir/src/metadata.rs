//! Side-channel metadata.
//!
//! The SSA form cannot express linkage facts such as which globals are
//! uniforms or pipeline inputs, their layouts, or the stage-wide execution
//! modes. Those live here as a table of nodes plus a set of named lists
//! and named integer modes, all owned by the module.

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use bitflags::bitflags;

use crate::{
    entity::{GlobalVar, MdNode, TypeProxy},
    entity_map::PrimaryMap,
};

/// What kind of linkage object an I/O node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoCategory {
    None,
    DefaultUniform,
    UniformBlockMember,
    BufferBlockMember,
    /// Buffer block whose last member is a runtime-sized array
    BufferBlockMemberArrayed,
    PipeIn,
    PipeOut,
    PipeInBlock,
    PipeOutBlock,
    VertexId,
    InstanceId,
    FragmentFace,
    PointCoord,
    FragmentCoord,
    VertexPosition,
    PointSize,
    ClipVertex,
    FragmentDepth,
}

/// Memory layout of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeLayout {
    None,
    RowMajorMatrix,
    ColMajorMatrix,
    Sampler,
    Aggregate,
    Unsigned,
    AtomicUint,
    Std140,
    Std430,
    Shared,
    Packed,
}

/// Precision qualifier carried by metadata and instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Precision {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Precision::None => "none",
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        };
        f.write_str(s)
    }
}

/// Image storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Format left unspecified
    Unspecified,
    Rgba32f,
    Rgba16f,
    R32f,
    Rgba8,
    Rgba8Snorm,
    Rg32f,
    Rg16f,
    R11fG11fB10f,
    R16f,
    Rgba16,
    Rgb10A2,
    Rg16,
    Rg8,
    R16,
    R8,
    Rgba16Snorm,
    Rg16Snorm,
    Rg8Snorm,
    R16Snorm,
    R8Snorm,
    Rgba32i,
    Rgba16i,
    Rgba8i,
    R32i,
    Rg32i,
    Rg16i,
    Rg8i,
    R16i,
    R8i,
    Rgba32ui,
    Rgba16ui,
    Rgba8ui,
    R32ui,
    Rg32ui,
    Rg16ui,
    Rg8ui,
    R16ui,
    R8ui,
}

/// Texture or image, with the image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Texture,
    Image(ImageFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
    Rect,
    Buffer,
    Dim2DMS,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerBaseType {
    Float,
    Int,
    Uint,
}

/// Interpolation method of a pipeline input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMethod {
    #[default]
    None,
    Smooth,
    Noperspective,
    Patch,
}

/// Interpolation location of a pipeline input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationLocation {
    #[default]
    Fragment,
    Sample,
    Centroid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterpolationMode {
    pub method: InterpolationMethod,
    pub location: InterpolationLocation,
}

/// Built-in variable semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuiltIn {
    #[default]
    None,
    NumWorkGroups,
    WorkGroupSize,
    WorkGroupId,
    LocalInvocationId,
    GlobalInvocationId,
    LocalInvocationIndex,
    VertexId,
    InstanceId,
    VertexIndex,
    InstanceIndex,
    Position,
    PointSize,
    ClipVertex,
    ClipDistance,
    CullDistance,
    Normal,
    Vertex,
    MultiTexCoord0,
    MultiTexCoord1,
    MultiTexCoord2,
    MultiTexCoord3,
    MultiTexCoord4,
    MultiTexCoord5,
    MultiTexCoord6,
    MultiTexCoord7,
    FrontColor,
    BackColor,
    FrontSecondaryColor,
    BackSecondaryColor,
    TexCoord,
    FogFragCoord,
    InvocationId,
    PrimitiveId,
    Layer,
    ViewportIndex,
    PatchVertices,
    TessLevelOuter,
    TessLevelInner,
    TessCoord,
    Color,
    SecondaryColor,
    Face,
    FragCoord,
    PointCoord,
    FragColor,
    FragData,
    FragDepth,
    SampleId,
    SamplePosition,
    SampleMask,
    HelperInvocation,
    BoundingBox,
}

bitflags! {
    /// Memory qualifiers of a buffer, image, or shared variable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryQualifiers: u32 {
        const VOLATILE = 1 << 0;
        /// `readonly`
        const NONWRITABLE = 1 << 1;
        /// `writeonly`
        const NONREADABLE = 1 << 2;
        const RESTRICT = 1 << 3;
        const COHERENT = 1 << 4;
    }
}

bitflags! {
    /// Advanced blend equations enabled for a fragment shader.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlendEquations: u32 {
        const MULTIPLY = 1 << 0;
        const SCREEN = 1 << 1;
        const OVERLAY = 1 << 2;
        const DARKEN = 1 << 3;
        const LIGHTEN = 1 << 4;
        const COLORDODGE = 1 << 5;
        const COLORBURN = 1 << 6;
        const HARDLIGHT = 1 << 7;
        const SOFTLIGHT = 1 << 8;
        const DIFFERENCE = 1 << 9;
        const EXCLUSION = 1 << 10;
        const HSL_HUE = 1 << 11;
        const HSL_SATURATION = 1 << 12;
        const HSL_COLOR = 1 << 13;
        const HSL_LUMINOSITY = 1 << 14;
        const ALL_EQUATIONS = 1 << 15;
    }
}

/// Location sentinel for variables with no user-assigned location.
pub const MAX_USER_LAYOUT_LOCATION: i32 = 4096;

/// Layout record shared by I/O, aggregate, and member nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRecord {
    pub type_layout: TypeLayout,
    pub precision: Precision,
    /// Slot for pipeline variables, location for uniforms
    pub location: i32,
    pub sampler: Option<MdNode>,
    pub interpolation: Option<InterpolationMode>,
    pub builtin: BuiltIn,
    /// `-1` when unbound
    pub binding: i32,
    pub qualifiers: MemoryQualifiers,
    /// `-1` when no explicit offset is recorded
    pub offset: i32,
}

impl LayoutRecord {
    pub fn new(type_layout: TypeLayout, precision: Precision) -> Self {
        Self {
            type_layout,
            precision,
            location: MAX_USER_LAYOUT_LOCATION,
            sampler: None,
            interpolation: None,
            builtin: BuiltIn::None,
            binding: -1,
            qualifiers: MemoryQualifiers::empty(),
            offset: -1,
        }
    }
}

/// Sampler or image shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub kind: SamplerKind,
    pub dim: SamplerDim,
    pub arrayed: bool,
    pub shadow: bool,
    pub base_type: SamplerBaseType,
    pub proxy: TypeProxy,
}

/// One linkage object: a uniform, buffer, input, or output.
#[derive(Debug, Clone, PartialEq)]
pub struct IoNode {
    pub name: String,
    pub category: IoCategory,
    pub proxy: Option<TypeProxy>,
    pub layout: LayoutRecord,
    /// Recursive type descriptor (non-single-type-tree mode)
    pub aggregate: Option<MdNode>,
}

/// Recursive description of a struct or block type.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDescriptor {
    pub type_name: String,
    pub layout: LayoutRecord,
    pub members: Vec<(String, MdNode)>,
}

/// Single-type-tree I/O node: type name and child nodes inline.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTreeIo {
    pub name: String,
    pub type_name: String,
    pub category: IoCategory,
    pub proxy: Option<TypeProxy>,
    pub layout: LayoutRecord,
    pub members: Vec<MdNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MdNodeData {
    Io(IoNode),
    Sampler(SamplerDescriptor),
    Aggregate(AggregateDescriptor),
    TypeTree(TypeTreeIo),
}

/// Named lists of linkage nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MdList {
    Uniforms,
    Inputs,
    Outputs,
    Invariant,
    NoStaticUse,
}

impl MdList {
    pub fn name(self) -> &'static str {
        match self {
            MdList::Uniforms => "gla.uniforms",
            MdList::Inputs => "gla.inputs",
            MdList::Outputs => "gla.outputs",
            MdList::Invariant => "gla.invariant",
            MdList::NoStaticUse => "gla.noStaticUse",
        }
    }
}

/// Stage-wide named integer modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageMode {
    Xfb,
    NumVertices,
    InputPrimitive,
    OutputPrimitive,
    VertexSpacing,
    VertexOrder,
    PointMode,
    Invocations,
    PixelCenterInteger,
    OriginUpperLeft,
    BlendEquation,
    LocalSize,
}

impl StageMode {
    pub fn name(self) -> &'static str {
        match self {
            StageMode::Xfb => "gla.xfb",
            StageMode::NumVertices => "gla.numVertices",
            StageMode::InputPrimitive => "gla.inputPrimitive",
            StageMode::OutputPrimitive => "gla.outputPrimitive",
            StageMode::VertexSpacing => "gla.vertexSpacing",
            StageMode::VertexOrder => "gla.vertexOrder",
            StageMode::PointMode => "gla.pointMode",
            StageMode::Invocations => "gla.invocations",
            StageMode::PixelCenterInteger => "gla.pixelCenterInteger",
            StageMode::OriginUpperLeft => "gla.originUpperLeft",
            StageMode::BlendEquation => "gla.blendEquations",
            StageMode::LocalSize => "gla.localSize",
        }
    }
}

/// Metadata store.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    nodes: PrimaryMap<MdNode, MdNodeData>,
    lists: BTreeMap<MdList, Vec<MdNode>>,
    modes: BTreeMap<StageMode, Vec<i32>>,
    shared: Vec<GlobalVar>,
    entry_points: Vec<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its handle.
    pub fn add(&mut self, data: MdNodeData) -> MdNode {
        self.nodes.push(data)
    }

    pub fn node(&self, node: MdNode) -> &MdNodeData {
        &self.nodes[node]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (MdNode, &MdNodeData)> {
        self.nodes.iter()
    }

    /// Append a node to a named list.
    pub fn add_to_list(&mut self, list: MdList, node: MdNode) {
        self.lists.entry(list).or_default().push(node);
    }

    /// Members of a named list (empty if never created).
    pub fn list(&self, list: MdList) -> &[MdNode] {
        self.lists.get(&list).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lists(&self) -> impl Iterator<Item = (MdList, &[MdNode])> {
        self.lists.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Record a stage-wide integer mode.
    pub fn set_mode(&mut self, mode: StageMode, values: Vec<i32>) {
        self.modes.insert(mode, values);
    }

    pub fn mode(&self, mode: StageMode) -> Option<&[i32]> {
        self.modes.get(&mode).map(Vec::as_slice)
    }

    pub fn modes(&self) -> impl Iterator<Item = (StageMode, &[i32])> {
        self.modes.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Mark a global as workgroup shared.
    pub fn add_shared(&mut self, global: GlobalVar) {
        self.shared.push(global);
    }

    pub fn shared(&self) -> &[GlobalVar] {
        &self.shared
    }

    pub fn add_entry_point(&mut self, name: impl Into<String>) {
        self.entry_points.push(name.into());
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Instance name of an I/O or type-tree node.
    pub fn io_name(&self, node: MdNode) -> Option<&str> {
        match self.node(node) {
            MdNodeData::Io(io) => Some(&io.name),
            MdNodeData::TypeTree(tree) => Some(&tree.name),
            _ => None,
        }
    }

    /// Layout record of any node that carries one.
    pub fn layout(&self, node: MdNode) -> Option<&LayoutRecord> {
        match self.node(node) {
            MdNodeData::Io(io) => Some(&io.layout),
            MdNodeData::TypeTree(tree) => Some(&tree.layout),
            MdNodeData::Aggregate(agg) => Some(&agg.layout),
            MdNodeData::Sampler(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;

    fn io(name: &str) -> MdNodeData {
        MdNodeData::Io(IoNode {
            name: name.to_string(),
            category: IoCategory::DefaultUniform,
            proxy: None,
            layout: LayoutRecord::new(TypeLayout::None, Precision::High),
            aggregate: None,
        })
    }

    #[test]
    fn test_named_lists() {
        let mut md = Metadata::new();
        let a = md.add(io("a"));
        let b = md.add(io("b"));
        md.add_to_list(MdList::Uniforms, a);
        md.add_to_list(MdList::Uniforms, b);
        assert_eq!(md.list(MdList::Uniforms), &[a, b]);
        assert!(md.list(MdList::Inputs).is_empty());
        assert_eq!(md.io_name(b), Some("b"));
    }

    #[test]
    fn test_modes() {
        let mut md = Metadata::new();
        md.set_mode(StageMode::LocalSize, vec![8, 8, 1]);
        assert_eq!(md.mode(StageMode::LocalSize), Some(&[8, 8, 1][..]));
        assert_eq!(StageMode::LocalSize.name(), "gla.localSize");
    }

    #[test]
    fn test_layout_defaults() {
        let layout = LayoutRecord::new(TypeLayout::Std140, Precision::None);
        assert_eq!(layout.binding, -1);
        assert_eq!(layout.offset, -1);
        assert_eq!(layout.location, MAX_USER_LAYOUT_LOCATION);
    }
}
