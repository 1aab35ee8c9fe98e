//! Texture, image and query operation descriptors.

use alloc::{vec, vec::Vec};
use core::fmt;

use bitflags::bitflags;

use crate::entity::Value;

/// Sampler shape as seen by texture instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    Sampler2DRect,
    SamplerBuffer,
    Sampler2DMS,
}

impl SamplerType {
    /// Sampler types whose size query takes no level-of-detail argument.
    pub fn has_no_lod(self) -> bool {
        matches!(
            self,
            SamplerType::Sampler2DMS | SamplerType::SamplerBuffer | SamplerType::Sampler2DRect
        )
    }
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SamplerType::Sampler1D => "1D",
            SamplerType::Sampler2D => "2D",
            SamplerType::Sampler3D => "3D",
            SamplerType::SamplerCube => "Cube",
            SamplerType::Sampler2DRect => "2DRect",
            SamplerType::SamplerBuffer => "Buffer",
            SamplerType::Sampler2DMS => "2DMS",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Texture access flags. The set selects the texture instruction's
    /// identity and which parameter slots are meaningful.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        const PROJECTED = 0x0001;
        const BIAS = 0x0002;
        const LOD = 0x0004;
        const SHADOW = 0x0008;
        const ARRAYED = 0x0010;
        const FETCH = 0x0020;
        const GATHER = 0x0040;
        /// The bias-or-lod parameter slot is populated
        const BIAS_LOD_ARG = 0x0080;
        const OFFSET_ARG = 0x0100;
        const SAMPLE_ARG = 0x0200;
        const COMPONENT_ARG = 0x0400;
        const REF_Z_ARG = 0x0800;
        /// Offset argument is an array of four offsets
        const OFFSETS = 0x1000;
    }
}

/// Canonical argument record for texture and image instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureParams {
    pub sampler: Value,
    pub coords: Value,
    /// Bias, explicit lod, sample index, or gather component
    pub bias_lod: Option<Value>,
    pub grad_x: Option<Value>,
    pub grad_y: Option<Value>,
    pub shadow_ref: Option<Value>,
    pub offset: Option<Value>,
    /// Comparison value of an image compare-and-swap
    pub compare: Option<Value>,
    /// Data operand of an image store or atomic
    pub data: Option<Value>,
}

impl TextureParams {
    /// Record with only the sampler and coordinates set.
    pub fn new(sampler: Value, coords: Value) -> Self {
        Self {
            sampler,
            coords,
            bias_lod: None,
            grad_x: None,
            grad_y: None,
            shadow_ref: None,
            offset: None,
            compare: None,
            data: None,
        }
    }

    /// Populated slots in canonical order with their names.
    pub fn named_operands(&self) -> Vec<(&'static str, Value)> {
        let mut out = vec![("sampler", self.sampler), ("coords", self.coords)];
        let optional = [
            ("biasLod", self.bias_lod),
            ("gradX", self.grad_x),
            ("gradY", self.grad_y),
            ("shadowRef", self.shadow_ref),
            ("offset", self.offset),
            ("compare", self.compare),
            ("data", self.data),
        ];
        out.extend(optional.into_iter().filter_map(|(n, v)| v.map(|v| (n, v))));
        out
    }

    /// Populated slots in canonical order.
    pub fn operands(&self) -> Vec<Value> {
        self.named_operands().into_iter().map(|(_, v)| v).collect()
    }
}

/// Image access operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOp {
    Load,
    Store,
    AtomicAdd,
    AtomicSMin,
    AtomicUMin,
    AtomicSMax,
    AtomicUMax,
    AtomicAnd,
    AtomicOr,
    AtomicXor,
    AtomicExchange,
    AtomicCompSwap,
}

impl fmt::Display for ImageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageOp::Load => "load",
            ImageOp::Store => "store",
            ImageOp::AtomicAdd => "atomicAdd",
            ImageOp::AtomicSMin => "atomicSMin",
            ImageOp::AtomicUMin => "atomicUMin",
            ImageOp::AtomicSMax => "atomicSMax",
            ImageOp::AtomicUMax => "atomicUMax",
            ImageOp::AtomicAnd => "atomicAnd",
            ImageOp::AtomicOr => "atomicOr",
            ImageOp::AtomicXor => "atomicXor",
            ImageOp::AtomicExchange => "atomicExchange",
            ImageOp::AtomicCompSwap => "atomicCompSwap",
        };
        f.write_str(s)
    }
}

/// Texture and image query operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    /// `textureSize` with a level-of-detail operand
    TextureSize,
    /// `textureSize` on multisample, buffer, or rectangle samplers
    TextureSizeNoLod,
    ImageSize,
    TextureLod,
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryOp::TextureSize => "queryTextureSize",
            QueryOp::TextureSizeNoLod => "queryTextureSizeNoLod",
            QueryOp::ImageSize => "queryImageSize",
            QueryOp::TextureLod => "fQueryTextureLod",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert_eq!(TextureFlags::BIAS_LOD_ARG.bits(), 0x80);
        let flags = TextureFlags::OFFSET_ARG | TextureFlags::BIAS | TextureFlags::BIAS_LOD_ARG;
        assert_eq!(flags.bits(), 0x182);
    }

    #[test]
    fn test_params_order() {
        let mut p = TextureParams::new(Value::new(0), Value::new(1));
        p.offset = Some(Value::new(2));
        p.bias_lod = Some(Value::new(3));
        let names: Vec<_> = p.named_operands().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sampler", "coords", "biasLod", "offset"]);
    }
}
