//! Typed GLSL syntax tree handed over by the front end.
//!
//! The front end parses and type-checks; lowering only reads what is here.
//! Every node carries its full [`AstType`], blocks list their members in
//! declaration order with hidden members flagged, and the unit carries the
//! stage-wide layout modes.

mod location;
mod node;
mod qualifier;
mod texture;
mod types;

use alloc::vec::Vec;

pub use location::{compute_type_location_size, is_arrayed_io};
pub use node::{ConstValue, FlowOp, Node, NodeKind, Operator, SymbolId};
pub use qualifier::{
    Interpolation, LayoutQualifier, MatrixLayout, Packing, PrecisionQualifier, Qualifier,
    StorageQualifier,
};
pub use texture::{crack_texture, CrackedTextureOp};
pub use types::{AstType, BasicType, SamplerDesc, SamplerDim, TypeList};

use crate::{config::ResourceLimits, stage::ShaderStage};

/// Primitive kind of a geometry or tessellation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutGeometry {
    #[default]
    None = 0,
    Points,
    Lines,
    LinesAdjacency,
    LineStrip,
    Triangles,
    TrianglesAdjacency,
    TriangleStrip,
    Quads,
    Isolines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexSpacing {
    #[default]
    None = 0,
    Equal,
    FractionalEven,
    FractionalOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexOrder {
    #[default]
    None = 0,
    Cw,
    Ccw,
}

/// Advanced blend equation named by `layout(blend_support_*)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    HslHue,
    HslSaturation,
    HslColor,
    HslLuminosity,
    AllEquations,
}

/// Stage-wide layout modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageModes {
    /// Transform feedback enabled
    pub xfb: bool,
    /// Output vertices (tessellation control, geometry)
    pub vertices: i32,
    pub input_primitive: LayoutGeometry,
    pub output_primitive: LayoutGeometry,
    pub vertex_spacing: VertexSpacing,
    pub vertex_order: VertexOrder,
    pub point_mode: bool,
    pub invocations: i32,
    pub pixel_center_integer: bool,
    pub origin_upper_left: bool,
    pub blend_equations: Vec<BlendEquation>,
    pub local_size: [u32; 3],
}

/// One stage's typed tree and its unit-wide facts.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub stage: ShaderStage,
    pub version: u32,
    /// ES profile
    pub es: bool,
    pub modes: StageModes,
    pub root: Node,
    /// The front end can size variables in locations; when false, slot
    /// counts fall back to an estimate.
    pub location_sizes: bool,
    /// Resource limits the front end compiled against.
    pub limits: ResourceLimits,
}

impl TranslationUnit {
    /// Desktop 4.50 unit with default modes.
    pub fn new(stage: ShaderStage, root: Node) -> Self {
        Self {
            stage,
            version: 450,
            es: false,
            modes: StageModes::default(),
            root,
            location_sizes: true,
            limits: ResourceLimits::default(),
        }
    }
}
