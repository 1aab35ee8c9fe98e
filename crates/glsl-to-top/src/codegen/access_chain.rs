//! Access chains.
//!
//! An access chain accumulates a base and a list of index operations while
//! an l-value or r-value expression is visited left to right. Nothing is
//! materialized until the chain is loaded from, stored to, or asked for its
//! address, so `a.b[i].xz = rhs` becomes one address computation, one load
//! of the old vector, one lane insert and one store.

use alloc::vec::Vec;

use topir::{FunctionBuilder, GepStep, GlobalVar, MdNode, Precision, TypeId, Value};

use crate::error::{LowerError, LowerResult};

/// Root of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainBase {
    /// Pointer to storage
    LValue(Value),
    /// An SSA value with no storage behind it
    RValue(Value),
}

/// One index step: a struct field or array element known at compile time,
/// or an array element selected at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainIndex {
    Const(u32),
    Value(Value),
}

/// Trailing fixed swizzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swizzle {
    pub components: Vec<u32>,
    /// Type of the swizzled value
    pub result_ty: TypeId,
    /// Component count of the vector being swizzled
    pub source_width: u32,
}

impl Swizzle {
    /// True when the swizzle selects every component in order.
    pub fn is_identity(&self) -> bool {
        self.components.len() as u32 == self.source_width
            && self.components.iter().enumerate().all(|(i, c)| *c == i as u32)
    }
}

/// Left-to-right accumulator of an access path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessChain {
    base: Option<ChainBase>,
    indices: Vec<ChainIndex>,
    /// Dynamic vector lane selected after all indices
    component: Option<Value>,
    swizzle: Option<Swizzle>,
    /// The base points at element zero of a runtime-sized array; the first
    /// index offsets from it.
    runtime_array: bool,
    md: Option<MdNode>,
    /// Output shadow whose writes should mark it active
    track: Option<GlobalVar>,
}

impl AccessChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set_l(&mut self, ptr: Value) {
        self.base = Some(ChainBase::LValue(ptr));
    }

    pub fn set_r(&mut self, value: Value) {
        self.base = Some(ChainBase::RValue(value));
    }

    pub fn base(&self) -> Option<ChainBase> {
        self.base
    }

    pub fn indices(&self) -> &[ChainIndex] {
        &self.indices
    }

    pub fn swizzle(&self) -> Option<&Swizzle> {
        self.swizzle.as_ref()
    }

    pub fn component(&self) -> Option<Value> {
        self.component
    }

    pub fn is_runtime_array(&self) -> bool {
        self.runtime_array
    }

    pub fn push_field(&mut self, index: u32) -> LowerResult<()> {
        self.push_index(ChainIndex::Const(index))
    }

    pub fn push_index(&mut self, index: ChainIndex) -> LowerResult<()> {
        if self.component.is_some() || self.swizzle.is_some() {
            return Err(LowerError::invariant(
                "access chain index after a vector component selection",
            ));
        }
        self.indices.push(index);
        Ok(())
    }

    /// Select a lane of the vector the chain currently names.
    pub fn push_component(&mut self, component: Value) -> LowerResult<()> {
        if self.component.is_some() {
            return Err(LowerError::invariant("access chain selects two components"));
        }
        if self.swizzle.is_some() {
            return Err(LowerError::unsupported("dynamic index of a swizzle"));
        }
        self.component = Some(component);
        Ok(())
    }

    /// Apply a swizzle on the right, composing with an earlier one.
    pub fn push_swizzle(
        &mut self,
        components: &[u32],
        result_ty: TypeId,
        source_width: u32,
    ) -> LowerResult<()> {
        if self.component.is_some() {
            return Err(LowerError::invariant("swizzle after a dynamic component"));
        }
        let swizzle = match self.swizzle.take() {
            Some(prev) => {
                let composed = components
                    .iter()
                    .map(|c| prev.components.get(*c as usize).copied())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| LowerError::invariant("swizzle component out of range"))?;
                Swizzle {
                    components: composed,
                    result_ty,
                    source_width: prev.source_width,
                }
            }
            None => Swizzle {
                components: components.to_vec(),
                result_ty,
                source_width,
            },
        };
        self.swizzle = Some(swizzle);
        Ok(())
    }

    pub fn set_md(&mut self, md: MdNode) {
        self.md = Some(md);
    }

    pub fn md(&self) -> Option<MdNode> {
        self.md
    }

    /// Mark writes through this chain as making `output` active.
    pub fn track_active(&mut self, output: GlobalVar) {
        self.track = Some(output);
    }

    pub fn tracked(&self) -> Option<GlobalVar> {
        self.track
    }

    /// Rebase the chain on the address it currently names, which is the
    /// first element of a runtime-sized array. Later indices offset from
    /// that element.
    pub fn evolve_to_runtime_array_base(&mut self, b: &mut FunctionBuilder) -> LowerResult<()> {
        let ptr = self.address(b)?;
        self.base = Some(ChainBase::LValue(ptr));
        self.indices.clear();
        self.runtime_array = true;
        Ok(())
    }

    /// Address the chain names. Fails for r-values and for chains ending in
    /// a component or swizzle.
    pub fn get_l(&self, b: &mut FunctionBuilder) -> LowerResult<Value> {
        if self.component.is_some() || self.swizzle.is_some() {
            return Err(LowerError::invariant("address of a vector component"));
        }
        self.address(b)
    }

    fn address(&self, b: &mut FunctionBuilder) -> LowerResult<Value> {
        let mut ptr = match self.base {
            Some(ChainBase::LValue(ptr)) => ptr,
            Some(ChainBase::RValue(_)) => {
                return Err(LowerError::invariant("address of an r-value"))
            }
            None => return Err(LowerError::invariant("empty access chain")),
        };
        let mut rest = &self.indices[..];
        if self.runtime_array {
            if let Some((first, tail)) = rest.split_first() {
                let index = match *first {
                    ChainIndex::Const(c) => b.iconst(c as i32),
                    ChainIndex::Value(v) => v,
                };
                ptr = b.element_addr(ptr, index);
                rest = tail;
            }
        }
        if !rest.is_empty() {
            let steps: Vec<GepStep> = rest
                .iter()
                .map(|index| match *index {
                    ChainIndex::Const(c) => GepStep::Const(c),
                    ChainIndex::Value(v) => GepStep::Value(v),
                })
                .collect();
            ptr = b.gep(ptr, &steps)?;
        }
        Ok(ptr)
    }

    /// Materialize the value the chain names.
    pub fn load(&self, b: &mut FunctionBuilder, precision: Precision) -> LowerResult<Value> {
        let (mut value, mut emitted) = match self.base {
            Some(ChainBase::RValue(v)) => {
                let all_const = self
                    .indices
                    .iter()
                    .all(|i| matches!(i, ChainIndex::Const(_)));
                if !all_const {
                    // Dynamic indexing needs memory to index into.
                    let ty = b.value_type(v);
                    let spill = b.alloca("indexable", ty);
                    b.store(v, spill);
                    let mut chain = self.clone();
                    chain.base = Some(ChainBase::LValue(spill));
                    return chain.load(b, precision);
                }
                let mut v = v;
                for index in &self.indices {
                    if let ChainIndex::Const(c) = index {
                        v = b.extract_value(v, *c)?;
                    }
                }
                (v, !self.indices.is_empty())
            }
            Some(ChainBase::LValue(_)) => {
                let ptr = self.address(b)?;
                let v = b.load(ptr)?;
                if let Some(md) = self.md {
                    b.attach_md(v, md);
                }
                (v, true)
            }
            None => return Err(LowerError::invariant("load from an empty access chain")),
        };

        if let Some(component) = self.component {
            value = b.extract_element(value, component);
            emitted = true;
        } else if let Some(swizzle) = &self.swizzle {
            if !swizzle.is_identity() {
                value = b.swizzle(value, &swizzle.components);
                emitted = true;
            }
        }
        if emitted {
            b.set_precision(value, precision);
        }
        Ok(value)
    }

    /// Store `value` to the place the chain names.
    pub fn store(&self, b: &mut FunctionBuilder, value: Value) -> LowerResult<()> {
        let ptr = self.address(b)?;
        let value = if let Some(component) = self.component {
            let old = b.load(ptr)?;
            b.insert_element(old, value, component)
        } else if let Some(swizzle) = self.swizzle.as_ref().filter(|s| !s.is_identity()) {
            let old = b.load(ptr)?;
            if let [lane] = swizzle.components[..] {
                let lane = b.iconst(lane as i32);
                b.insert_element(old, value, lane)
            } else {
                b.insert_lanes(old, value, &swizzle.components)
            }
        } else {
            value
        };
        b.store(value, ptr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use topir::{Cursor, Module, Opcode, Signature, StorageClass};

    use super::*;

    fn setup() -> (Module, Cursor) {
        let mut module = Module::new();
        let void = module.types.void();
        let func = module.declare_function("f", Signature::new(vec![], void));
        let block = module.function_mut(func).create_block("entry");
        (module, Cursor { func, block })
    }

    fn opcodes(module: &Module, cursor: &Cursor) -> Vec<Opcode> {
        let func = module.function(cursor.func);
        func.insts()
            .filter_map(|i| func.dfg.inst_data(i).map(|d| d.opcode.clone()))
            .collect()
    }

    #[test]
    fn test_swizzle_store_is_one_store_without_gep() {
        let (mut module, mut cursor) = setup();
        let f32 = module.types.f32();
        let vec4 = module.types.vector(f32, 4);
        let vec2 = module.types.vector(f32, 2);
        let g = module.add_global("v", vec4, StorageClass::Global, None);
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let ptr = b.global_addr(g);
        let rhs = b.zero(vec2);

        let mut chain = AccessChain::new();
        chain.set_l(ptr);
        chain.push_swizzle(&[0, 2], vec2, 4).unwrap();
        chain.store(&mut b, rhs).unwrap();

        let ops = opcodes(&module, &cursor);
        assert_eq!(ops.iter().filter(|o| matches!(o, Opcode::Store)).count(), 1);
        assert!(!ops.iter().any(|o| matches!(o, Opcode::Gep { .. })));
        assert!(ops
            .iter()
            .any(|o| matches!(o, Opcode::InsertLanes { lanes } if lanes == &[0, 2])));
    }

    #[test]
    fn test_swizzles_compose() {
        let mut types = topir::TypeStore::new();
        let f32 = types.f32();
        let vec3 = types.vector(f32, 3);
        let vec2 = types.vector(f32, 2);
        let mut chain = AccessChain::new();
        chain.push_swizzle(&[3, 2, 1], vec3, 4).unwrap();
        chain.push_swizzle(&[2, 0], vec2, 3).unwrap();
        let swizzle = chain.swizzle().unwrap();
        assert_eq!(swizzle.components, vec![1, 3]);
        assert_eq!(swizzle.source_width, 4);
    }

    #[test]
    fn test_index_after_component_is_rejected() {
        let (mut module, mut cursor) = setup();
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let lane = b.iconst(1);
        let mut chain = AccessChain::new();
        chain.push_component(lane).unwrap();
        assert!(matches!(
            chain.push_field(0),
            Err(LowerError::InternalInvariant(_))
        ));
    }

    #[test]
    fn test_rvalue_constant_indices_extract() {
        let (mut module, mut cursor) = setup();
        let f32 = module.types.f32();
        let arr = module.types.array(f32, 3);
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let agg = b.zero(arr);
        let mut chain = AccessChain::new();
        chain.set_r(agg);
        chain.push_field(2).unwrap();
        let v = chain.load(&mut b, Precision::None).unwrap();
        assert_eq!(b.value_type(v), f32);
        assert!(chain.get_l(&mut b).is_err());
    }

    #[test]
    fn test_runtime_array_base_uses_element_addr() {
        let (mut module, mut cursor) = setup();
        let i32 = module.types.i32();
        let f32 = module.types.f32();
        let block = module.types.declare_struct("B");
        module.types.set_struct_body(block, vec![i32, f32]).unwrap();
        let g = module.add_global("b", block, StorageClass::Buffer, None);
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let ptr = b.global_addr(g);
        let i = b.iconst(5);

        let mut chain = AccessChain::new();
        chain.set_l(ptr);
        chain.push_field(1).unwrap();
        chain.evolve_to_runtime_array_base(&mut b).unwrap();
        assert!(chain.is_runtime_array());
        chain.push_index(ChainIndex::Value(i)).unwrap();
        let v = chain.load(&mut b, Precision::High).unwrap();
        assert_eq!(b.value_type(v), f32);

        let text = module.display_function(cursor.func).to_string();
        assert!(text.contains("element_addr"), "{}", text);
    }
}
