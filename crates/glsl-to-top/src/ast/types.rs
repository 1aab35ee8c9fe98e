//! Front-end types.


use alloc::{rc::Rc, string::{String, ToString}, vec::Vec};

use crate::ast::qualifier::{PrecisionQualifier, Qualifier, StorageQualifier};

/// Basic kind of a type, before vector/matrix/array shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Void,
    Float,
    Double,
    Int,
    Uint,
    Bool,
    AtomicUint,
    Sampler,
    Struct,
    Block,
}

/// Sampler dimensionality as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
    Rect,
    Buffer,
}

/// Shape of a sampler or image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    /// Sampled type: `Float`, `Int` or `Uint`
    pub basic: BasicType,
    pub dim: SamplerDim,
    pub arrayed: bool,
    pub shadow: bool,
    /// Multisample
    pub ms: bool,
    /// Image rather than texture
    pub image: bool,
}

impl SamplerDesc {
    pub fn texture(dim: SamplerDim) -> Self {
        Self {
            basic: BasicType::Float,
            dim,
            arrayed: false,
            shadow: false,
            ms: false,
            image: false,
        }
    }

    pub fn image(basic: BasicType, dim: SamplerDim) -> Self {
        Self {
            basic,
            dim,
            image: true,
            ..Self::texture(dim)
        }
    }

    pub fn shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    pub fn arrayed(mut self) -> Self {
        self.arrayed = true;
        self
    }

    pub fn multisample(mut self) -> Self {
        self.ms = true;
        self
    }
}

/// Shared member list of a struct or block. Pointer identity of the list
/// identifies the struct type.
pub type TypeList = Rc<Vec<AstType>>;

/// A fully shaped front-end type with its qualifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct AstType {
    pub basic: BasicType,
    /// Component count, 1 for scalars
    pub vector_size: u32,
    /// 0 unless this is a matrix
    pub matrix_cols: u32,
    pub matrix_rows: u32,
    /// Array dimensions, outermost first; 0 marks an unsized dimension
    pub array_sizes: Option<Vec<u32>>,
    pub struct_type: Option<TypeList>,
    /// Struct or block name
    pub type_name: String,
    /// Name of this type as a member of an enclosing struct or block
    pub field_name: String,
    /// Present in the member list but not in the lowered layout
    pub hidden: bool,
    pub qualifier: Qualifier,
    pub sampler: Option<SamplerDesc>,
}

impl AstType {
    pub fn new(basic: BasicType) -> Self {
        Self {
            basic,
            vector_size: 1,
            matrix_cols: 0,
            matrix_rows: 0,
            array_sizes: None,
            struct_type: None,
            type_name: String::new(),
            field_name: String::new(),
            hidden: false,
            qualifier: Qualifier::default(),
            sampler: None,
        }
    }

    pub fn void() -> Self {
        Self::new(BasicType::Void)
    }

    pub fn float() -> Self {
        Self::new(BasicType::Float)
    }

    pub fn double() -> Self {
        Self::new(BasicType::Double)
    }

    pub fn int() -> Self {
        Self::new(BasicType::Int)
    }

    pub fn uint() -> Self {
        Self::new(BasicType::Uint)
    }

    pub fn bool() -> Self {
        Self::new(BasicType::Bool)
    }

    pub fn atomic_uint() -> Self {
        Self::new(BasicType::AtomicUint)
    }

    /// Vector of `size` components of `basic`.
    pub fn vector(basic: BasicType, size: u32) -> Self {
        Self {
            vector_size: size,
            ..Self::new(basic)
        }
    }

    pub fn vec(size: u32) -> Self {
        Self::vector(BasicType::Float, size)
    }

    pub fn ivec(size: u32) -> Self {
        Self::vector(BasicType::Int, size)
    }

    pub fn uvec(size: u32) -> Self {
        Self::vector(BasicType::Uint, size)
    }

    pub fn bvec(size: u32) -> Self {
        Self::vector(BasicType::Bool, size)
    }

    /// Float matrix with `cols` columns of `rows` components.
    pub fn mat(cols: u32, rows: u32) -> Self {
        Self {
            vector_size: rows,
            matrix_cols: cols,
            matrix_rows: rows,
            ..Self::new(BasicType::Float)
        }
    }

    pub fn sampler(desc: SamplerDesc) -> Self {
        Self {
            sampler: Some(desc),
            ..Self::new(BasicType::Sampler)
        }
    }

    /// Struct with the given members.
    pub fn structure(name: &str, members: Vec<AstType>) -> Self {
        Self {
            struct_type: Some(Rc::new(members)),
            type_name: name.to_string(),
            ..Self::new(BasicType::Struct)
        }
    }

    /// Interface block of the given storage.
    pub fn block(name: &str, storage: StorageQualifier, members: Vec<AstType>) -> Self {
        let mut ty = Self {
            struct_type: Some(Rc::new(members)),
            type_name: name.to_string(),
            ..Self::new(BasicType::Block)
        };
        ty.qualifier.storage = storage;
        ty
    }

    /// Wrap in a new outermost array dimension; `0` for unsized.
    pub fn array(mut self, size: u32) -> Self {
        self.array_sizes.get_or_insert_with(Vec::new).insert(0, size);
        self
    }

    /// Name as a struct or block member.
    pub fn field(mut self, name: &str) -> Self {
        self.field_name = name.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn storage(mut self, storage: StorageQualifier) -> Self {
        self.qualifier.storage = storage;
        self
    }

    pub fn precision(mut self, precision: PrecisionQualifier) -> Self {
        self.qualifier.precision = precision;
        self
    }

    pub fn location(mut self, location: i32) -> Self {
        self.qualifier.layout.location = Some(location);
        self
    }

    pub fn binding(mut self, binding: i32) -> Self {
        self.qualifier.layout.binding = Some(binding);
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_sizes.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Outermost array size; 0 for unsized or non-arrays.
    pub fn outer_array_size(&self) -> u32 {
        self.array_sizes
            .as_ref()
            .and_then(|s| s.first().copied())
            .unwrap_or(0)
    }

    pub fn is_unsized_array(&self) -> bool {
        self.is_array() && self.outer_array_size() == 0
    }

    pub fn is_matrix(&self) -> bool {
        self.matrix_cols > 0
    }

    pub fn is_vector(&self) -> bool {
        self.vector_size > 1 && !self.is_matrix()
    }

    pub fn is_scalar(&self) -> bool {
        !self.is_array() && !self.is_matrix() && !self.is_struct() && self.vector_size == 1
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.basic, BasicType::Struct | BasicType::Block)
    }

    /// Arrays, matrices and structs.
    pub fn is_aggregate(&self) -> bool {
        self.is_array() || self.is_matrix() || self.is_struct()
    }

    pub fn is_float(&self) -> bool {
        matches!(self.basic, BasicType::Float | BasicType::Double)
    }

    /// Type with the outermost array dimension removed.
    pub fn element_type(&self) -> AstType {
        let mut ty = self.clone();
        if let Some(sizes) = ty.array_sizes.as_mut() {
            if !sizes.is_empty() {
                sizes.remove(0);
            }
            if sizes.is_empty() {
                ty.array_sizes = None;
            }
        }
        ty
    }

    /// Column vector type of a matrix.
    pub fn column_type(&self) -> AstType {
        let mut ty = self.element_type();
        if ty.array_sizes.is_none() {
            ty.matrix_cols = 0;
            ty.matrix_rows = 0;
            ty.vector_size = self.matrix_rows;
        }
        ty
    }

    /// Members of a struct or block.
    pub fn members(&self) -> &[AstType] {
        self.struct_type.as_deref().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of scalar components of a scalar, vector or matrix.
    pub fn component_count(&self) -> u32 {
        if self.is_matrix() {
            self.matrix_cols * self.matrix_rows
        } else {
            self.vector_size
        }
    }
}
