//! Modules: the unit of lowering output.

use alloc::{format, string::String, vec::Vec};
use core::fmt;

use crate::{
    constant::{ConstantData, ConstantPool},
    entity::{Constant, FuncRef, GlobalVar, TypeId, TypeProxy},
    entity_map::PrimaryMap,
    function::{Function, Signature},
    metadata::Metadata,
    types::TypeStore,
};

/// Storage class of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Function-local
    Local,
    /// Module-private global
    Global,
    /// Workgroup shared
    Shared,
    /// Shadow of a pipeline input
    Input,
    /// Shadow of a pipeline output
    Output,
    Uniform,
    Buffer,
    /// Sampler or image handle
    Resource,
    /// Read-only constant data
    Const,
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageClass::Local => "local",
            StorageClass::Global => "global",
            StorageClass::Shared => "shared",
            StorageClass::Input => "input",
            StorageClass::Output => "output",
            StorageClass::Uniform => "uniform",
            StorageClass::Buffer => "buffer",
            StorageClass::Resource => "resource",
            StorageClass::Const => "const",
        };
        f.write_str(s)
    }
}

/// A module-level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalData {
    pub name: String,
    /// Type of the stored value (the global's address is a pointer to it)
    pub ty: TypeId,
    pub storage: StorageClass,
    pub initializer: Option<Constant>,
}

/// A global kept off the module's global list so its type survives
/// optimization while only metadata refers to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyData {
    pub name: String,
    pub ty: TypeId,
}

/// An IR module: types, constants, globals, functions, and metadata.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: TypeStore,
    pub constants: ConstantPool,
    pub globals: PrimaryMap<GlobalVar, GlobalData>,
    pub functions: PrimaryMap<FuncRef, Function>,
    pub metadata: Metadata,
    /// Type-proxy free list, released with the module
    pub proxies: PrimaryMap<TypeProxy, ProxyData>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn const_i32(&mut self, value: i32) -> Constant {
        let ty = self.types.i32();
        self.constants.insert(ConstantData::Int(value), ty)
    }

    pub fn const_u32(&mut self, value: u32) -> Constant {
        let ty = self.types.u32();
        self.constants.insert(ConstantData::Uint(value), ty)
    }

    pub fn const_f32(&mut self, value: f32) -> Constant {
        let ty = self.types.f32();
        self.constants.insert(ConstantData::float(value), ty)
    }

    pub fn const_bool(&mut self, value: bool) -> Constant {
        let ty = self.types.bool();
        self.constants.insert(ConstantData::Bool(value), ty)
    }

    /// Zero of any type.
    pub fn const_zero(&mut self, ty: TypeId) -> Constant {
        if self.types.is_scalar(ty) {
            let data = match self.types.data(ty) {
                crate::types::TypeData::Bool => ConstantData::Bool(false),
                crate::types::TypeData::U32 => ConstantData::Uint(0),
                crate::types::TypeData::F32 | crate::types::TypeData::F64 => {
                    ConstantData::float(0.0)
                }
                _ => ConstantData::Int(0),
            };
            return self.constants.insert(data, ty);
        }
        self.constants.insert(ConstantData::Zero, ty)
    }

    /// Structured constant of an aggregate or vector type.
    pub fn const_aggregate(&mut self, ty: TypeId, elems: Vec<Constant>) -> Constant {
        self.constants.insert(ConstantData::Aggregate(elems), ty)
    }

    /// Add a global variable.
    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        ty: TypeId,
        storage: StorageClass,
        initializer: Option<Constant>,
    ) -> GlobalVar {
        self.globals.push(GlobalData {
            name: name.into(),
            ty,
            storage,
            initializer,
        })
    }

    pub fn global(&self, global: GlobalVar) -> &GlobalData {
        &self.globals[global]
    }

    /// First global with the given name.
    pub fn find_global(&self, name: &str) -> Option<GlobalVar> {
        self.globals
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(k, _)| k)
    }

    /// Declare a function. Its entry block is created by the caller.
    pub fn declare_function(&mut self, name: impl Into<String>, signature: Signature) -> FuncRef {
        self.functions.push(Function::new(name, signature))
    }

    pub fn function(&self, func: FuncRef) -> &Function {
        &self.functions[func]
    }

    pub fn function_mut(&mut self, func: FuncRef) -> &mut Function {
        &mut self.functions[func]
    }

    pub fn find_function(&self, name: &str) -> Option<FuncRef> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(k, _)| k)
    }

    /// Create a type proxy named `<name>_typeProxy` for a type.
    ///
    /// Pointer types are peeled so the proxy names the value type.
    pub fn make_type_proxy(&mut self, ty: TypeId, name: &str) -> TypeProxy {
        let mut ty = ty;
        while let Some(pointee) = self.types.pointee(ty) {
            ty = pointee;
        }
        self.proxies.push(ProxyData {
            name: format!("{}_typeProxy", name),
            ty,
        })
    }

    pub fn proxy(&self, proxy: TypeProxy) -> &ProxyData {
        &self.proxies[proxy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals() {
        let mut module = Module::new();
        let f32 = module.types.f32();
        let g = module.add_global("x", f32, StorageClass::Uniform, None);
        assert_eq!(module.find_global("x"), Some(g));
        assert_eq!(module.global(g).storage, StorageClass::Uniform);
    }

    #[test]
    fn test_type_proxy_peels_pointers() {
        let mut module = Module::new();
        let f32 = module.types.f32();
        let ptr = module.types.pointer(f32);
        let proxy = module.make_type_proxy(ptr, "color");
        assert_eq!(module.proxy(proxy).ty, f32);
        assert_eq!(module.proxy(proxy).name, "color_typeProxy");
        assert!(module.globals.is_empty());
    }

    #[test]
    fn test_zero_constants() {
        let mut module = Module::new();
        let u = module.types.u32();
        let z = module.const_zero(u);
        assert_eq!(module.const_u32(0), z);
    }
}
