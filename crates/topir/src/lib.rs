//! Top-tier SSA intermediate representation for shader lowering.
//!
//! This crate defines the IR a GLSL lowering produces:
//! - Types (scalars, vectors, arrays, structs, pointers), interned per module
//! - Constants, pooled per module
//! - Globals tagged with a storage class
//! - Functions made of blocks of instructions
//! - Metadata describing shader linkage that the SSA form cannot express
//! - A positioned builder, a textual writer, and a verifier

#![no_std]

extern crate alloc;

mod builder;
mod condcodes;
mod constant;
mod dfg;
mod entity;
mod entity_map;
mod error;
mod function;
mod intrinsic;
pub mod metadata;
mod module;
mod texture;
mod types;
mod verifier;
mod write;

pub use builder::{Cursor, FunctionBuilder, GepStep};
pub use condcodes::{FloatCC, IntCC};
pub use constant::{ConstantData, ConstantPool};
pub use dfg::{
    BinaryOp, CastOp, GepIndex, InstData, Opcode, PipelineRead, UnaryOp, ValueData, ValueDef, DFG,
};
pub use entity::{Block, Constant, EntityRef, FuncRef, GlobalVar, Inst, MdNode, TypeId, TypeProxy, Value};
pub use entity_map::PrimaryMap;
pub use error::IrError;
pub use function::{BlockData, Function, FunctionAttrs, Signature};
pub use intrinsic::Intrinsic;
pub use metadata::{Metadata, Precision};
pub use module::{GlobalData, Module, ProxyData, StorageClass};
pub use texture::{ImageOp, QueryOp, SamplerType, TextureFlags, TextureParams};
pub use types::{TypeData, TypeStore};
pub use verifier::{verify, VerifierError};
pub use write::{format_inst, DisplayFunction};
