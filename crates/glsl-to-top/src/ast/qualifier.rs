//! Type qualifiers.

use bitflags::bitflags;
use topir::metadata::{BuiltIn, ImageFormat, MemoryQualifiers};

/// Storage qualifier, including the built-in pipeline variables that the
/// front end tags with their own storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageQualifier {
    /// Function-local
    #[default]
    Temporary,
    /// Module scope, not linked
    Global,
    Const,
    /// Read-only function parameter
    ConstReadOnly,
    VaryingIn,
    VaryingOut,
    Uniform,
    Buffer,
    Shared,
    /// `in` parameter
    In,
    /// `out` parameter
    Out,
    /// `inout` parameter
    InOut,
    FragCoord,
    PointCoord,
    Face,
    VertexId,
    InstanceId,
    Position,
    PointSize,
    ClipVertex,
    FragColor,
    FragDepth,
}

impl StorageQualifier {
    pub fn is_pipe_input(self) -> bool {
        matches!(
            self,
            StorageQualifier::VaryingIn
                | StorageQualifier::FragCoord
                | StorageQualifier::PointCoord
                | StorageQualifier::Face
                | StorageQualifier::VertexId
                | StorageQualifier::InstanceId
        )
    }

    pub fn is_pipe_output(self) -> bool {
        matches!(
            self,
            StorageQualifier::VaryingOut
                | StorageQualifier::Position
                | StorageQualifier::PointSize
                | StorageQualifier::ClipVertex
                | StorageQualifier::FragColor
                | StorageQualifier::FragDepth
        )
    }

    pub fn is_uniform_or_buffer(self) -> bool {
        matches!(self, StorageQualifier::Uniform | StorageQualifier::Buffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrecisionQualifier {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixLayout {
    #[default]
    None,
    RowMajor,
    ColumnMajor,
}

/// Block packing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Packing {
    #[default]
    None,
    Shared,
    Std140,
    Std430,
    Packed,
}

/// `layout(...)` contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutQualifier {
    pub location: Option<i32>,
    pub binding: Option<i32>,
    pub offset: Option<i32>,
    pub matrix: MatrixLayout,
    pub packing: Packing,
    pub format: Option<ImageFormat>,
}

bitflags! {
    /// Interpolation and auxiliary storage modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interpolation: u8 {
        const FLAT = 1 << 0;
        const NOPERSPECTIVE = 1 << 1;
        const SMOOTH = 1 << 2;
        const PATCH = 1 << 3;
        const CENTROID = 1 << 4;
        const SAMPLE = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifier {
    pub storage: StorageQualifier,
    pub precision: PrecisionQualifier,
    pub layout: LayoutQualifier,
    pub interpolation: Interpolation,
    pub memory: MemoryQualifiers,
    pub builtin: BuiltIn,
    pub invariant: bool,
}

impl Qualifier {
    pub fn new(storage: StorageQualifier) -> Self {
        Self {
            storage,
            ..Self::default()
        }
    }
}
