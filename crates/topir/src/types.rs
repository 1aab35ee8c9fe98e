//! Type system for the IR.
//!
//! Types are interned in a [`TypeStore`] owned by the module. Structural
//! types (scalars, vectors, arrays, pointers) are uniqued, so equal shapes
//! share one [`TypeId`]. Struct types are nominal: each
//! [`TypeStore::declare_struct`] call yields a fresh type whose body is set
//! once afterwards.

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt;

use crate::{entity::TypeId, entity_map::PrimaryMap, error::IrError};

/// The shape of an interned type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeData {
    /// No value
    Void,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// Fixed-width vector of scalars
    Vector { elem: TypeId, len: u32 },
    /// Fixed-size array
    Array { elem: TypeId, len: u32 },
    /// Named struct; `fields` is `None` while the struct is still opaque
    Struct {
        name: String,
        fields: Option<Vec<TypeId>>,
    },
    /// Pointer to a value of the pointee type
    Pointer { pointee: TypeId },
}

/// Type interner.
#[derive(Debug, Clone)]
pub struct TypeStore {
    types: PrimaryMap<TypeId, TypeData>,
    interned: BTreeMap<TypeData, TypeId>,
}

impl TypeStore {
    /// Create a store with no types.
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            interned: BTreeMap::new(),
        }
    }

    fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.interned.get(&data) {
            return id;
        }
        let id = self.types.push(data.clone());
        self.interned.insert(data, id);
        id
    }

    pub fn void(&mut self) -> TypeId {
        self.intern(TypeData::Void)
    }

    pub fn bool(&mut self) -> TypeId {
        self.intern(TypeData::Bool)
    }

    pub fn i32(&mut self) -> TypeId {
        self.intern(TypeData::I32)
    }

    pub fn u32(&mut self) -> TypeId {
        self.intern(TypeData::U32)
    }

    pub fn f32(&mut self) -> TypeId {
        self.intern(TypeData::F32)
    }

    pub fn f64(&mut self) -> TypeId {
        self.intern(TypeData::F64)
    }

    /// Vector of `len` elements. A one-element vector is the scalar itself.
    pub fn vector(&mut self, elem: TypeId, len: u32) -> TypeId {
        if len <= 1 {
            return elem;
        }
        self.intern(TypeData::Vector { elem, len })
    }

    pub fn array(&mut self, elem: TypeId, len: u32) -> TypeId {
        self.intern(TypeData::Array { elem, len })
    }

    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeData::Pointer { pointee })
    }

    /// Matrix type: an array of `cols` column vectors of `rows` floats.
    pub fn matrix(&mut self, cols: u32, rows: u32) -> TypeId {
        let f32 = self.f32();
        let column = self.vector(f32, rows);
        self.array(column, cols)
    }

    /// Declare a new opaque struct type.
    pub fn declare_struct(&mut self, name: impl Into<String>) -> TypeId {
        self.types.push(TypeData::Struct {
            name: name.into(),
            fields: None,
        })
    }

    /// Set the body of a struct declared with [`declare_struct`](Self::declare_struct).
    pub fn set_struct_body(&mut self, id: TypeId, body: Vec<TypeId>) -> Result<(), IrError> {
        match self.types.get_mut(id) {
            Some(TypeData::Struct { fields, name }) => {
                if fields.is_some() {
                    return Err(IrError::StructBodyAlreadySet(name.clone()));
                }
                *fields = Some(body);
                Ok(())
            }
            Some(_) => Err(IrError::NotAStruct(id)),
            None => Err(IrError::UnknownType(id)),
        }
    }

    /// Get the shape of a type.
    pub fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id]
    }

    /// Number of types in the store.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all declared struct types.
    pub fn structs(&self) -> impl Iterator<Item = (TypeId, &TypeData)> {
        self.types
            .iter()
            .filter(|(_, data)| matches!(data, TypeData::Struct { .. }))
    }

    /// The scalar type of a scalar or vector (the type itself for anything else).
    pub fn scalar_of(&self, id: TypeId) -> TypeId {
        match self.data(id) {
            TypeData::Vector { elem, .. } => *elem,
            _ => id,
        }
    }

    /// Number of components of a scalar (1) or vector.
    pub fn component_count(&self, id: TypeId) -> u32 {
        match self.data(id) {
            TypeData::Vector { len, .. } => *len,
            _ => 1,
        }
    }

    pub fn is_vector(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Vector { .. })
    }

    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(
            self.data(id),
            TypeData::Bool | TypeData::I32 | TypeData::U32 | TypeData::F32 | TypeData::F64
        )
    }

    /// Arrays and structs (matrices included).
    pub fn is_aggregate(&self, id: TypeId) -> bool {
        matches!(
            self.data(id),
            TypeData::Array { .. } | TypeData::Struct { .. }
        )
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Pointer { .. })
    }

    /// True if the scalar of this type is a float.
    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            self.data(self.scalar_of(id)),
            TypeData::F32 | TypeData::F64
        )
    }

    /// True if the scalar of this type is an integer (signed or unsigned).
    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.data(self.scalar_of(id)), TypeData::I32 | TypeData::U32)
    }

    pub fn is_unsigned(&self, id: TypeId) -> bool {
        matches!(self.data(self.scalar_of(id)), TypeData::U32)
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.data(self.scalar_of(id)), TypeData::Bool)
    }

    /// Pointee of a pointer type.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.data(id) {
            TypeData::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    /// Type reached by stepping into member `index` of an aggregate or vector.
    ///
    /// Arrays and vectors ignore the index; structs select the field.
    pub fn member_type(&self, id: TypeId, index: Option<u32>) -> Option<TypeId> {
        match self.data(id) {
            TypeData::Array { elem, .. } | TypeData::Vector { elem, .. } => Some(*elem),
            TypeData::Struct {
                fields: Some(fields),
                ..
            } => index.and_then(|i| fields.get(i as usize).copied()),
            _ => None,
        }
    }

    /// Number of members of an aggregate (array length, struct field count).
    pub fn member_count(&self, id: TypeId) -> u32 {
        match self.data(id) {
            TypeData::Array { len, .. } | TypeData::Vector { len, .. } => *len,
            TypeData::Struct {
                fields: Some(fields),
                ..
            } => fields.len() as u32,
            _ => 0,
        }
    }

    /// Struct name, if this is a struct.
    pub fn struct_name(&self, id: TypeId) -> Option<&str> {
        match self.data(id) {
            TypeData::Struct { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Display adapter for a type.
    pub fn display(&self, id: TypeId) -> DisplayType<'_> {
        DisplayType { store: self, id }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a type by recursively expanding its shape.
pub struct DisplayType<'a> {
    store: &'a TypeStore,
    id: TypeId,
}

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.data(self.id) {
            TypeData::Void => write!(f, "void"),
            TypeData::Bool => write!(f, "bool"),
            TypeData::I32 => write!(f, "i32"),
            TypeData::U32 => write!(f, "u32"),
            TypeData::F32 => write!(f, "f32"),
            TypeData::F64 => write!(f, "f64"),
            TypeData::Vector { elem, len } => {
                write!(f, "<{} x {}>", len, self.store.display(*elem))
            }
            TypeData::Array { elem, len } => {
                write!(f, "[{} x {}]", len, self.store.display(*elem))
            }
            TypeData::Struct { name, .. } => write!(f, "%{}", name),
            TypeData::Pointer { pointee } => write!(f, "{}*", self.store.display(*pointee)),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, vec};

    use super::*;

    #[test]
    fn test_structural_interning() {
        let mut store = TypeStore::new();
        let f32 = store.f32();
        let a = store.vector(f32, 4);
        let b = store.vector(f32, 4);
        assert_eq!(a, b);
        assert_eq!(store.vector(f32, 1), f32);
    }

    #[test]
    fn test_structs_are_nominal() {
        let mut store = TypeStore::new();
        let f32 = store.f32();
        let s1 = store.declare_struct("S");
        let s2 = store.declare_struct("S");
        assert_ne!(s1, s2);

        store.set_struct_body(s1, vec![f32, f32]).unwrap();
        assert_eq!(store.member_count(s1), 2);
        assert!(matches!(
            store.set_struct_body(s1, vec![f32]),
            Err(IrError::StructBodyAlreadySet(_))
        ));
    }

    #[test]
    fn test_matrix_shape() {
        let mut store = TypeStore::new();
        let m = store.matrix(3, 2);
        assert_eq!(format!("{}", store.display(m)), "[3 x <2 x f32>]");
        assert!(store.is_aggregate(m));
        let column = store.member_type(m, None).unwrap();
        assert_eq!(store.component_count(column), 2);
    }

    #[test]
    fn test_type_kinds() {
        let mut store = TypeStore::new();
        let u = store.u32();
        let uv = store.vector(u, 3);
        assert!(store.is_unsigned(uv));
        assert!(store.is_integer(uv));
        assert!(!store.is_float(uv));
        let b = store.bool();
        assert!(store.is_bool(b));
    }
}
