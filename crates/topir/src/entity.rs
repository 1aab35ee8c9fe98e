//! Typed indices for everything a module or function stores.
//!
//! Entities (blocks, instructions, values, types, constants, globals, ...)
//! are small copyable handles into dense tables. Each entity type is a
//! distinct newtype so handles of different kinds cannot be mixed.

use core::fmt;

/// Conversion between a typed handle and its table index.
pub trait EntityRef: Copy + Clone + PartialEq + Eq + core::hash::Hash + fmt::Debug {
    fn index(self) -> usize;

    fn from_index(index: usize) -> Self;

    fn next_index(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

macro_rules! entity {
    ($(#[$attr:meta])* $name:ident, $prefix:expr) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn new(index: u32) -> Self {
                $name(index)
            }

            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl EntityRef for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

entity!(
    /// A basic block in a function.
    Block,
    "block"
);
entity!(
    /// An instruction in a function's data flow graph.
    Inst,
    "inst"
);
entity!(
    /// An SSA value. Assigned exactly once, either as a function parameter
    /// or as an instruction result.
    Value,
    "v"
);
entity!(
    /// An interned type in the module's type store.
    TypeId,
    "t"
);
entity!(
    /// A constant in the module's constant pool.
    Constant,
    "const"
);
entity!(
    /// A module-level variable.
    GlobalVar,
    "@g"
);
entity!(
    /// A function in the module.
    FuncRef,
    "fn"
);
entity!(
    /// A metadata node.
    MdNode,
    "!"
);
entity!(
    /// A type proxy kept alive on the module's free list.
    TypeProxy,
    "proxy"
);

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;

    #[test]
    fn test_entity_ref_trait() {
        let block = Block::from_index(5);
        assert_eq!(EntityRef::index(block), 5);

        let next = block.next_index();
        assert_eq!(EntityRef::index(next), 6);
    }

    #[test]
    fn test_entity_ordering() {
        let b1 = Block::new(1);
        let b2 = Block::new(2);
        let b3 = Block::new(1);

        assert!(b1 < b2);
        assert!(b1 == b3);
        assert!(b2 > b1);
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(format!("{}", Block::new(3)), "block3");
        assert_eq!(format!("{}", Value::new(7)), "v7");
        assert_eq!(format!("{}", GlobalVar::new(0)), "@g0");
        assert_eq!(format!("{}", MdNode::new(12)), "!12");
    }
}
