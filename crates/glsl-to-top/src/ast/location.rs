//! Location accounting the front end performs for pipeline variables.

use crate::{
    ast::{
        qualifier::Interpolation,
        types::{AstType, BasicType},
    },
    stage::ShaderStage,
};

/// Number of locations a variable of type `ty` occupies.
pub fn compute_type_location_size(ty: &AstType) -> u32 {
    if ty.is_array() {
        let element = compute_type_location_size(&ty.element_type());
        if ty.is_unsized_array() {
            return element;
        }
        return ty.outer_array_size() * element;
    }
    if ty.is_struct() {
        return ty.members().iter().map(compute_type_location_size).sum();
    }
    if ty.is_matrix() {
        return ty.matrix_cols * compute_type_location_size(&ty.column_type());
    }
    if ty.basic == BasicType::Double && ty.vector_size > 2 {
        2
    } else {
        1
    }
}

/// True if the outer array dimension of a variable is per-vertex rather
/// than part of its declared shape.
pub fn is_arrayed_io(ty: &AstType, stage: ShaderStage) -> bool {
    let storage = ty.qualifier.storage;
    let patch = ty.qualifier.interpolation.contains(Interpolation::PATCH);
    match stage {
        ShaderStage::Geometry => storage.is_pipe_input(),
        ShaderStage::TessControl => !patch && (storage.is_pipe_input() || storage.is_pipe_output()),
        ShaderStage::TessEvaluation => !patch && storage.is_pipe_input(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::ast::qualifier::StorageQualifier;

    #[test]
    fn test_location_sizes() {
        assert_eq!(compute_type_location_size(&AstType::vec(4)), 1);
        assert_eq!(compute_type_location_size(&AstType::mat(4, 4)), 4);
        assert_eq!(compute_type_location_size(&AstType::vec(3).array(5)), 5);
        assert_eq!(
            compute_type_location_size(&AstType::vector(BasicType::Double, 4)),
            2
        );
        let s = AstType::structure(
            "S",
            vec![AstType::float().field("a"), AstType::mat(2, 2).field("m")],
        );
        assert_eq!(compute_type_location_size(&s.array(2)), 6);
    }

    #[test]
    fn test_arrayed_io() {
        let input = AstType::vec(4).array(3).storage(StorageQualifier::VaryingIn);
        assert!(is_arrayed_io(&input, ShaderStage::Geometry));
        assert!(!is_arrayed_io(&input, ShaderStage::Fragment));
        let output = AstType::vec(4).array(3).storage(StorageQualifier::VaryingOut);
        assert!(is_arrayed_io(&output, ShaderStage::TessControl));
        assert!(!is_arrayed_io(&output, ShaderStage::TessEvaluation));
    }
}
