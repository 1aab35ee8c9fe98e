//! IR construction helpers sitting between the traversal and the raw
//! function builder.

pub mod access_chain;
pub mod builder;
pub mod r#loop;

pub use access_chain::{AccessChain, ChainBase, ChainIndex};
pub use builder::{IfBuilder, OutputShadow, SwitchBuilder, TopBuilder};
