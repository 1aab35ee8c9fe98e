//! Decomposition of texture built-ins into independent flags.

use crate::ast::{
    node::Operator,
    types::{SamplerDesc, SamplerDim},
};

/// Independent dimensions of a texture built-in call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrackedTextureOp {
    pub query: bool,
    pub fetch: bool,
    pub proj: bool,
    pub offset: bool,
    pub offsets: bool,
    pub gather: bool,
    pub lod: bool,
    pub grad: bool,
}

/// Crack a texture or image operator. Returns `None` for anything else.
pub fn crack_texture(op: Operator, sampler: &SamplerDesc) -> Option<CrackedTextureOp> {
    let mut cracked = CrackedTextureOp::default();
    let fetch_has_lod = !matches!(sampler.dim, SamplerDim::Rect | SamplerDim::Buffer) && !sampler.ms;
    match op {
        Operator::TextureQuerySize
        | Operator::TextureQueryLod
        | Operator::TextureQueryLevels
        | Operator::TextureQuerySamples
        | Operator::ImageQuerySize
        | Operator::ImageQuerySamples => cracked.query = true,
        Operator::Texture => {}
        Operator::TextureProj => cracked.proj = true,
        Operator::TextureLod => cracked.lod = true,
        Operator::TextureOffset => cracked.offset = true,
        Operator::TextureFetch => {
            cracked.fetch = true;
            cracked.lod = fetch_has_lod;
        }
        Operator::TextureFetchOffset => {
            cracked.fetch = true;
            cracked.offset = true;
            cracked.lod = fetch_has_lod;
        }
        Operator::TextureProjOffset => {
            cracked.offset = true;
            cracked.proj = true;
        }
        Operator::TextureLodOffset => {
            cracked.offset = true;
            cracked.lod = true;
        }
        Operator::TextureProjLod => {
            cracked.lod = true;
            cracked.proj = true;
        }
        Operator::TextureProjLodOffset => {
            cracked.offset = true;
            cracked.lod = true;
            cracked.proj = true;
        }
        Operator::TextureGrad => cracked.grad = true,
        Operator::TextureGradOffset => {
            cracked.grad = true;
            cracked.offset = true;
        }
        Operator::TextureProjGrad => {
            cracked.grad = true;
            cracked.proj = true;
        }
        Operator::TextureProjGradOffset => {
            cracked.grad = true;
            cracked.offset = true;
            cracked.proj = true;
        }
        Operator::TextureGather => cracked.gather = true,
        Operator::TextureGatherOffset => {
            cracked.gather = true;
            cracked.offset = true;
        }
        Operator::TextureGatherOffsets => {
            cracked.gather = true;
            cracked.offsets = true;
        }
        op if op.is_image() => {}
        _ => return None,
    }
    Some(cracked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_lod_depends_on_dim() {
        let tex2d = SamplerDesc::texture(SamplerDim::Dim2D);
        let fetch = crack_texture(Operator::TextureFetch, &tex2d).unwrap();
        assert!(fetch.fetch && fetch.lod);

        let rect = SamplerDesc::texture(SamplerDim::Rect);
        assert!(!crack_texture(Operator::TextureFetch, &rect).unwrap().lod);

        let ms = SamplerDesc::texture(SamplerDim::Dim2D).multisample();
        assert!(!crack_texture(Operator::TextureFetchOffset, &ms).unwrap().lod);
    }

    #[test]
    fn test_proj_grad_offset() {
        let tex = SamplerDesc::texture(SamplerDim::Dim3D);
        let cracked = crack_texture(Operator::TextureProjGradOffset, &tex).unwrap();
        assert!(cracked.proj && cracked.grad && cracked.offset);
        assert!(!cracked.lod && !cracked.gather);
    }

    #[test]
    fn test_non_texture() {
        let tex = SamplerDesc::texture(SamplerDim::Dim2D);
        assert_eq!(crack_texture(Operator::Add, &tex), None);
        assert_eq!(
            crack_texture(Operator::ImageLoad, &tex),
            Some(CrackedTextureOp::default())
        );
        assert!(crack_texture(Operator::ImageQuerySize, &tex).unwrap().query);
    }
}
