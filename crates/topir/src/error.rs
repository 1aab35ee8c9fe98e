//! Errors raised by IR construction.

use alloc::string::String;

use thiserror::Error;

use crate::entity::{FuncRef, TypeId};

/// Error from an IR construction call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("unknown type {0}")]
    UnknownType(TypeId),
    #[error("type {0} is not a struct")]
    NotAStruct(TypeId),
    #[error("struct %{0} already has a body")]
    StructBodyAlreadySet(String),
    #[error("unknown function {0}")]
    UnknownFunction(FuncRef),
    #[error("{0}")]
    Malformed(String),
}
