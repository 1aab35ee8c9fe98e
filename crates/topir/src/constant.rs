//! Constant pool.

use alloc::{collections::BTreeMap, vec::Vec};
use core::fmt;

use crate::{
    entity::{Constant, TypeId},
    entity_map::PrimaryMap,
};

/// The value of a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstantData {
    /// Signed 32-bit integer
    Int(i32),
    /// Unsigned 32-bit integer
    Uint(u32),
    /// 32-bit float, stored as bits so constants are totally ordered
    Float(u32),
    /// Boolean
    Bool(bool),
    /// Vector, array, or struct built from member constants
    Aggregate(Vec<Constant>),
    /// All-zero value of the constant's type
    Zero,
}

impl ConstantData {
    /// Float constant from an `f32`.
    pub fn float(value: f32) -> Self {
        ConstantData::Float(value.to_bits())
    }

    /// True for scalar zero, or the explicit zero aggregate.
    pub fn is_zero(&self) -> bool {
        match self {
            ConstantData::Int(v) => *v == 0,
            ConstantData::Uint(v) => *v == 0,
            ConstantData::Float(bits) => f32::from_bits(*bits) == 0.0,
            ConstantData::Bool(b) => !*b,
            ConstantData::Aggregate(_) => false,
            ConstantData::Zero => true,
        }
    }
}

/// Interning pool of typed constants.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: PrimaryMap<Constant, (ConstantData, TypeId)>,
    interned: BTreeMap<(ConstantData, TypeId), Constant>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constant of the given type, reusing an identical one.
    pub fn insert(&mut self, data: ConstantData, ty: TypeId) -> Constant {
        let key = (data, ty);
        if let Some(&c) = self.interned.get(&key) {
            return c;
        }
        let c = self.constants.push(key.clone());
        self.interned.insert(key, c);
        c
    }

    pub fn data(&self, c: Constant) -> &ConstantData {
        &self.constants[c].0
    }

    pub fn ty(&self, c: Constant) -> TypeId {
        self.constants[c].1
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Display adapter for a constant's value.
    pub fn display(&self, c: Constant) -> DisplayConstant<'_> {
        DisplayConstant { pool: self, c }
    }
}

pub struct DisplayConstant<'a> {
    pool: &'a ConstantPool,
    c: Constant,
}

impl fmt::Display for DisplayConstant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pool.data(self.c) {
            ConstantData::Int(v) => write!(f, "{}", v),
            ConstantData::Uint(v) => write!(f, "{}u", v),
            ConstantData::Float(bits) => write!(f, "{:?}", f32::from_bits(*bits)),
            ConstantData::Bool(b) => write!(f, "{}", b),
            ConstantData::Zero => write!(f, "zeroinitializer"),
            ConstantData::Aggregate(elems) => {
                write!(f, "{{")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.pool.display(*e))?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, vec};

    use super::*;
    use crate::types::TypeStore;

    #[test]
    fn test_constants_are_interned() {
        let mut types = TypeStore::new();
        let i32 = types.i32();
        let mut pool = ConstantPool::new();
        let a = pool.insert(ConstantData::Int(3), i32);
        let b = pool.insert(ConstantData::Int(3), i32);
        let c = pool.insert(ConstantData::Int(4), i32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_aggregate_display() {
        let mut types = TypeStore::new();
        let f32 = types.f32();
        let v2 = types.vector(f32, 2);
        let mut pool = ConstantPool::new();
        let x = pool.insert(ConstantData::float(1.0), f32);
        let y = pool.insert(ConstantData::float(2.5), f32);
        let v = pool.insert(ConstantData::Aggregate(vec![x, y]), v2);
        assert_eq!(format!("{}", pool.display(v)), "{1.0, 2.5}");
        let z = pool.insert(ConstantData::Zero, v2);
        assert!(pool.data(z).is_zero());
    }
}
