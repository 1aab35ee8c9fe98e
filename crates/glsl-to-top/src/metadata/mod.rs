//! Metadata vocabulary derived from front-end types.
//!
//! These are the pure mappings from an [`AstType`] to the enums the
//! metadata store speaks. Node construction lives in [`emitter`].

pub mod emitter;

use topir::{
    metadata::{
        BlendEquations, BuiltIn, ImageFormat, InterpolationLocation, InterpolationMethod,
        InterpolationMode, IoCategory, MemoryQualifiers, SamplerBaseType, SamplerDim as MdSamplerDim,
        SamplerKind, TypeLayout, MAX_USER_LAYOUT_LOCATION,
    },
    Precision,
};

use crate::{
    ast::{
        AstType, BasicType, BlendEquation, Interpolation, MatrixLayout, Packing,
        PrecisionQualifier, SamplerDim, StorageQualifier,
    },
    diagnostics::Diagnostics,
};

pub use emitter::{
    declare_md_io, declare_md_type, declare_uniform_metadata, make_input_metadata,
    make_md_sampler, set_output_metadata,
};

/// Linkage category of a uniform, buffer, input or output.
pub fn io_category(ty: &AstType) -> IoCategory {
    let storage = ty.qualifier.storage;
    if ty.basic == BasicType::Block {
        return match storage {
            StorageQualifier::VaryingIn => IoCategory::PipeInBlock,
            StorageQualifier::VaryingOut => IoCategory::PipeOutBlock,
            StorageQualifier::Uniform => IoCategory::UniformBlockMember,
            StorageQualifier::Buffer => {
                if ty.members().last().is_some_and(AstType::is_unsized_array) {
                    IoCategory::BufferBlockMemberArrayed
                } else {
                    IoCategory::BufferBlockMember
                }
            }
            _ => IoCategory::None,
        };
    }

    match storage {
        StorageQualifier::VaryingIn => IoCategory::PipeIn,
        StorageQualifier::VertexId => IoCategory::VertexId,
        StorageQualifier::InstanceId => IoCategory::InstanceId,
        StorageQualifier::Face => IoCategory::FragmentFace,
        StorageQualifier::PointCoord => IoCategory::PointCoord,
        StorageQualifier::FragCoord => IoCategory::FragmentCoord,

        StorageQualifier::VaryingOut | StorageQualifier::FragColor => IoCategory::PipeOut,
        StorageQualifier::Position => IoCategory::VertexPosition,
        StorageQualifier::PointSize => IoCategory::PointSize,
        StorageQualifier::ClipVertex => IoCategory::ClipVertex,
        StorageQualifier::FragDepth => IoCategory::FragmentDepth,

        StorageQualifier::Uniform => IoCategory::DefaultUniform,
        _ => IoCategory::None,
    }
}

/// True for the categories whose layout location is a uniform location
/// rather than a pipeline slot.
pub fn is_uniform_category(category: IoCategory) -> bool {
    matches!(
        category,
        IoCategory::DefaultUniform
            | IoCategory::UniformBlockMember
            | IoCategory::BufferBlockMember
            | IoCategory::BufferBlockMemberArrayed
    )
}

/// Memory layout of `ty`.
///
/// A non-matrix with an explicit majorness sets `inherit`, which later
/// matrix members without their own majorness pick up.
pub fn type_layout(ty: &AstType, inherit: &mut TypeLayout, diags: &mut Diagnostics) -> TypeLayout {
    let matrix = ty.qualifier.layout.matrix;
    if ty.is_matrix() {
        return match matrix {
            MatrixLayout::RowMajor => TypeLayout::RowMajorMatrix,
            MatrixLayout::ColumnMajor => TypeLayout::ColMajorMatrix,
            MatrixLayout::None if *inherit != TypeLayout::None => *inherit,
            MatrixLayout::None => TypeLayout::ColMajorMatrix,
        };
    }

    match matrix {
        MatrixLayout::RowMajor => *inherit = TypeLayout::RowMajorMatrix,
        MatrixLayout::ColumnMajor => *inherit = TypeLayout::ColMajorMatrix,
        MatrixLayout::None => {}
    }

    match ty.basic {
        BasicType::Sampler => TypeLayout::Sampler,
        BasicType::Struct => TypeLayout::Aggregate,
        BasicType::Uint => TypeLayout::Unsigned,
        BasicType::AtomicUint => TypeLayout::AtomicUint,
        BasicType::Block => block_layout(ty, diags),
        _ => TypeLayout::None,
    }
}

fn block_layout(ty: &AstType, diags: &mut Diagnostics) -> TypeLayout {
    let packing = ty.qualifier.layout.packing;
    match ty.qualifier.storage {
        StorageQualifier::Uniform | StorageQualifier::Buffer => match packing {
            Packing::Shared => TypeLayout::Shared,
            Packing::Std140 => TypeLayout::Std140,
            Packing::Std430 => TypeLayout::Std430,
            Packing::Packed => TypeLayout::Packed,
            Packing::None => {
                diags.unsupported("uniform block layout");
                TypeLayout::Shared
            }
        },
        StorageQualifier::VaryingIn | StorageQualifier::VaryingOut => {
            if packing != Packing::None {
                diags.unsupported("in/out block layout");
            }
            TypeLayout::None
        }
        _ => {
            diags.unsupported("block storage qualification");
            TypeLayout::None
        }
    }
}

/// Texture, or image with its format.
pub fn sampler_kind(ty: &AstType) -> SamplerKind {
    match ty.sampler {
        Some(desc) if desc.image => {
            SamplerKind::Image(ty.qualifier.layout.format.unwrap_or(ImageFormat::Unspecified))
        }
        _ => SamplerKind::Texture,
    }
}

pub fn sampler_dim(ty: &AstType) -> MdSamplerDim {
    let Some(desc) = ty.sampler else {
        return MdSamplerDim::Dim2D;
    };
    match desc.dim {
        SamplerDim::Dim1D => MdSamplerDim::Dim1D,
        SamplerDim::Dim2D if desc.ms => MdSamplerDim::Dim2DMS,
        SamplerDim::Dim2D => MdSamplerDim::Dim2D,
        SamplerDim::Dim3D => MdSamplerDim::Dim3D,
        SamplerDim::Cube => MdSamplerDim::Cube,
        SamplerDim::Rect => MdSamplerDim::Rect,
        SamplerDim::Buffer => MdSamplerDim::Buffer,
    }
}

pub fn sampler_base_type(basic: BasicType, diags: &mut Diagnostics) -> SamplerBaseType {
    match basic {
        BasicType::Float => SamplerBaseType::Float,
        BasicType::Int => SamplerBaseType::Int,
        BasicType::Uint => SamplerBaseType::Uint,
        _ => {
            diags.unsupported("base type of sampler return type");
            SamplerBaseType::Float
        }
    }
}

/// Explicit location, or the first non-user slot.
pub fn slot_location(ty: &AstType) -> i32 {
    ty.qualifier.layout.location.unwrap_or(MAX_USER_LAYOUT_LOCATION)
}

pub fn binding(ty: &AstType) -> i32 {
    ty.qualifier.layout.binding.unwrap_or(-1)
}

pub fn memory_qualifiers(ty: &AstType) -> MemoryQualifiers {
    ty.qualifier.memory
}

/// Explicit member offset. Atomic counters always record theirs; other
/// members only when uniform offsets are in use.
pub fn offset(ty: &AstType, uniform_offsets: bool) -> i32 {
    if ty.basic != BasicType::AtomicUint && !uniform_offsets {
        return -1;
    }
    ty.qualifier.layout.offset.unwrap_or(-1)
}

pub fn precision_of(ty: &AstType) -> Precision {
    match ty.qualifier.precision {
        PrecisionQualifier::None => Precision::None,
        PrecisionQualifier::Low => Precision::Low,
        PrecisionQualifier::Medium => Precision::Medium,
        PrecisionQualifier::High => Precision::High,
    }
}

pub fn builtin(ty: &AstType) -> BuiltIn {
    ty.qualifier.builtin
}

/// Interpolation method and location of a pipeline variable.
pub fn interpolation(ty: &AstType) -> InterpolationMode {
    let flags = ty.qualifier.interpolation;
    let method = if flags.contains(Interpolation::NOPERSPECTIVE) {
        InterpolationMethod::Noperspective
    } else if flags.contains(Interpolation::SMOOTH) {
        InterpolationMethod::Smooth
    } else if flags.contains(Interpolation::PATCH) {
        InterpolationMethod::Patch
    } else {
        InterpolationMethod::None
    };
    let location = if flags.contains(Interpolation::SAMPLE) {
        InterpolationLocation::Sample
    } else if flags.contains(Interpolation::CENTROID) {
        InterpolationLocation::Centroid
    } else {
        InterpolationLocation::Fragment
    };
    InterpolationMode { method, location }
}

/// Names the front end gave to anonymous declarations are not exported.
pub fn md_name(name: &str) -> &str {
    if name.starts_with("anon@") {
        ""
    } else {
        name
    }
}

/// Mask of the advanced blend equations a fragment shader supports.
pub fn blend_equation_mask(equations: &[BlendEquation]) -> BlendEquations {
    equations
        .iter()
        .map(|eq| match eq {
            BlendEquation::Multiply => BlendEquations::MULTIPLY,
            BlendEquation::Screen => BlendEquations::SCREEN,
            BlendEquation::Overlay => BlendEquations::OVERLAY,
            BlendEquation::Darken => BlendEquations::DARKEN,
            BlendEquation::Lighten => BlendEquations::LIGHTEN,
            BlendEquation::ColorDodge => BlendEquations::COLORDODGE,
            BlendEquation::ColorBurn => BlendEquations::COLORBURN,
            BlendEquation::HardLight => BlendEquations::HARDLIGHT,
            BlendEquation::SoftLight => BlendEquations::SOFTLIGHT,
            BlendEquation::Difference => BlendEquations::DIFFERENCE,
            BlendEquation::Exclusion => BlendEquations::EXCLUSION,
            BlendEquation::HslHue => BlendEquations::HSL_HUE,
            BlendEquation::HslSaturation => BlendEquations::HSL_SATURATION,
            BlendEquation::HslColor => BlendEquations::HSL_COLOR,
            BlendEquation::HslLuminosity => BlendEquations::HSL_LUMINOSITY,
            BlendEquation::AllEquations => BlendEquations::ALL_EQUATIONS,
        })
        .fold(BlendEquations::empty(), |mask, eq| mask | eq)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::ast::SamplerDesc;

    #[test]
    fn test_io_categories() {
        let input = AstType::vec(4).storage(StorageQualifier::VaryingIn);
        assert_eq!(io_category(&input), IoCategory::PipeIn);
        let color = AstType::vec(4).storage(StorageQualifier::FragColor);
        assert_eq!(io_category(&color), IoCategory::PipeOut);
        let local = AstType::float();
        assert_eq!(io_category(&local), IoCategory::None);

        let arrayed = AstType::block(
            "B",
            StorageQualifier::Buffer,
            vec![AstType::int().field("n"), AstType::float().array(0).field("d")],
        );
        assert_eq!(io_category(&arrayed), IoCategory::BufferBlockMemberArrayed);
        let plain = AstType::block("C", StorageQualifier::Buffer, vec![AstType::int().field("n")]);
        assert_eq!(io_category(&plain), IoCategory::BufferBlockMember);
    }

    #[test]
    fn test_matrix_layout_inherits() {
        let mut diags = Diagnostics::new();
        let mut inherit = TypeLayout::None;
        assert_eq!(
            type_layout(&AstType::mat(4, 4), &mut inherit, &mut diags),
            TypeLayout::ColMajorMatrix
        );

        let mut row_major = AstType::vec(4);
        row_major.qualifier.layout.matrix = MatrixLayout::RowMajor;
        assert_eq!(type_layout(&row_major, &mut inherit, &mut diags), TypeLayout::None);
        assert_eq!(inherit, TypeLayout::RowMajorMatrix);
        assert_eq!(
            type_layout(&AstType::mat(3, 3), &mut inherit, &mut diags),
            TypeLayout::RowMajorMatrix
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_block_packing() {
        let mut diags = Diagnostics::new();
        let mut inherit = TypeLayout::None;
        let mut block = AstType::block("U", StorageQualifier::Uniform, vec![AstType::float()]);
        block.qualifier.layout.packing = Packing::Std140;
        assert_eq!(type_layout(&block, &mut inherit, &mut diags), TypeLayout::Std140);

        block.qualifier.layout.packing = Packing::None;
        assert_eq!(type_layout(&block, &mut inherit, &mut diags), TypeLayout::Shared);
        assert_eq!(diags.entries().len(), 1);
    }

    #[test]
    fn test_sampler_shape() {
        let ms = AstType::sampler(SamplerDesc::texture(SamplerDim::Dim2D).multisample());
        assert_eq!(sampler_dim(&ms), MdSamplerDim::Dim2DMS);
        assert_eq!(sampler_kind(&ms), SamplerKind::Texture);

        let mut image = AstType::sampler(SamplerDesc::image(BasicType::Uint, SamplerDim::Dim3D));
        assert_eq!(sampler_kind(&image), SamplerKind::Image(ImageFormat::Unspecified));
        image.qualifier.layout.format = Some(ImageFormat::R32ui);
        assert_eq!(sampler_kind(&image), SamplerKind::Image(ImageFormat::R32ui));
    }

    #[test]
    fn test_offsets() {
        let mut counter = AstType::atomic_uint();
        counter.qualifier.layout.offset = Some(4);
        assert_eq!(offset(&counter, false), 4);

        let mut member = AstType::float();
        member.qualifier.layout.offset = Some(16);
        assert_eq!(offset(&member, false), -1);
        assert_eq!(offset(&member, true), 16);
        assert_eq!(offset(&AstType::float(), true), -1);
    }

    #[test]
    fn test_interpolation() {
        let mut ty = AstType::vec(2);
        assert_eq!(interpolation(&ty), InterpolationMode::default());
        ty.qualifier.interpolation = Interpolation::NOPERSPECTIVE | Interpolation::SMOOTH | Interpolation::CENTROID;
        let mode = interpolation(&ty);
        assert_eq!(mode.method, InterpolationMethod::Noperspective);
        assert_eq!(mode.location, InterpolationLocation::Centroid);
    }

    #[test]
    fn test_blend_mask() {
        let mask = blend_equation_mask(&[BlendEquation::Screen, BlendEquation::HslColor]);
        assert_eq!(mask, BlendEquations::SCREEN | BlendEquations::HSL_COLOR);
        assert!(blend_equation_mask(&[]).is_empty());
    }

    #[test]
    fn test_anonymous_names_filtered() {
        assert_eq!(md_name("anon@0"), "");
        assert_eq!(md_name("color"), "color");
    }
}
