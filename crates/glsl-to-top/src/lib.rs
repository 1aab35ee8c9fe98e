//! Lowering of typed GLSL syntax trees into TopIR.
//!
//! A front end hands over a [`TranslationUnit`] per shader stage; [`lower`]
//! walks it once and produces a [`topir::Module`] holding the entry point,
//! the user functions, the globals and the metadata describing every
//! uniform, input and output, together with the [`Diagnostics`] collected
//! along the way.
//!
//! ```
//! use glsl_to_top::{ast::{Node, TranslationUnit}, lower, LowerOptions, ShaderStage};
//!
//! let unit = TranslationUnit::new(ShaderStage::Fragment, Node::sequence(Vec::new()));
//! let out = lower(&unit, &LowerOptions::for_unit(&unit));
//! assert!(out.diagnostics.is_empty());
//! assert!(out.module.find_function("main").is_some());
//! ```

#![no_std]

extern crate alloc;

pub mod ast;
mod codegen;
mod config;
mod constants;
mod context;
mod control;
mod diagnostics;
mod error;
mod expr;
mod function;
mod lower;
mod metadata;
mod pipeline;
mod slots;
mod stage;
mod texture;
mod types;

pub use ast::TranslationUnit;
pub use config::{LowerOptions, ResourceLimits};
pub use context::LowerContext;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{LowerError, LowerResult, Severity};
pub use lower::{lower, lower_node, LowerOutput};
pub use stage::{info_log, lower_stages, ShaderStage, StageOutput};
