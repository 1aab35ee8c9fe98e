//! Lowering options and resource limits.

use alloc::format;

use nom::{
    character::complete::{alphanumeric1, char, digit1, space0, space1},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use crate::{
    ast::TranslationUnit,
    error::{LowerError, LowerResult},
};

/// Switches that change the shape of the lowered module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LowerOptions {
    /// Leave pipeline inputs as structured globals for the back end
    /// instead of expanding per-slot reads.
    pub use_logical_io: bool,
    /// Emit one recursive metadata tree per I/O symbol instead of a
    /// separate aggregate descriptor.
    pub use_single_type_tree: bool,
    /// Record explicit `offset=` layouts on uniform members.
    pub use_uniform_offsets: bool,
}

impl LowerOptions {
    /// Options derived from the unit's language version and profile.
    pub fn for_unit(unit: &TranslationUnit) -> Self {
        Self {
            use_uniform_offsets: !unit.es && unit.version >= 420,
            ..Self::default()
        }
    }
}

macro_rules! resource_limits {
    (
        ints { $($field:ident = $key:literal => $default:expr,)* }
        flags { $($flag:ident = $fkey:literal,)* }
    ) => {
        /// Built-in resource limits handed to the front end.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct ResourceLimits {
            $(pub $field: i32,)*
            $(pub $flag: bool,)*
        }

        impl Default for ResourceLimits {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                    $($flag: true,)*
                }
            }
        }

        impl ResourceLimits {
            fn set(&mut self, key: &str, value: i32) -> bool {
                match key {
                    $($key => self.$field = value,)*
                    $($fkey => self.$flag = value != 0,)*
                    _ => return false,
                }
                true
            }
        }
    };
}

resource_limits! {
    ints {
        max_lights = "MaxLights" => 32,
        max_clip_planes = "MaxClipPlanes" => 6,
        max_texture_units = "MaxTextureUnits" => 32,
        max_texture_coords = "MaxTextureCoords" => 32,
        max_vertex_attribs = "MaxVertexAttribs" => 64,
        max_vertex_uniform_components = "MaxVertexUniformComponents" => 4096,
        max_varying_floats = "MaxVaryingFloats" => 64,
        max_vertex_texture_image_units = "MaxVertexTextureImageUnits" => 32,
        max_combined_texture_image_units = "MaxCombinedTextureImageUnits" => 80,
        max_texture_image_units = "MaxTextureImageUnits" => 32,
        max_fragment_uniform_components = "MaxFragmentUniformComponents" => 4096,
        max_draw_buffers = "MaxDrawBuffers" => 32,
        max_vertex_uniform_vectors = "MaxVertexUniformVectors" => 128,
        max_varying_vectors = "MaxVaryingVectors" => 8,
        max_fragment_uniform_vectors = "MaxFragmentUniformVectors" => 16,
        max_vertex_output_vectors = "MaxVertexOutputVectors" => 16,
        max_fragment_input_vectors = "MaxFragmentInputVectors" => 15,
        min_program_texel_offset = "MinProgramTexelOffset" => -8,
        max_program_texel_offset = "MaxProgramTexelOffset" => 7,
        max_clip_distances = "MaxClipDistances" => 8,
        max_compute_work_group_count_x = "MaxComputeWorkGroupCountX" => 65535,
        max_compute_work_group_count_y = "MaxComputeWorkGroupCountY" => 65535,
        max_compute_work_group_count_z = "MaxComputeWorkGroupCountZ" => 65535,
        max_compute_work_group_size_x = "MaxComputeWorkGroupSizeX" => 1024,
        max_compute_work_group_size_y = "MaxComputeWorkGroupSizeY" => 1024,
        max_compute_work_group_size_z = "MaxComputeWorkGroupSizeZ" => 64,
        max_compute_uniform_components = "MaxComputeUniformComponents" => 1024,
        max_compute_texture_image_units = "MaxComputeTextureImageUnits" => 16,
        max_compute_image_uniforms = "MaxComputeImageUniforms" => 8,
        max_compute_atomic_counters = "MaxComputeAtomicCounters" => 8,
        max_compute_atomic_counter_buffers = "MaxComputeAtomicCounterBuffers" => 1,
        max_varying_components = "MaxVaryingComponents" => 60,
        max_vertex_output_components = "MaxVertexOutputComponents" => 64,
        max_geometry_input_components = "MaxGeometryInputComponents" => 64,
        max_geometry_output_components = "MaxGeometryOutputComponents" => 128,
        max_fragment_input_components = "MaxFragmentInputComponents" => 128,
        max_image_units = "MaxImageUnits" => 8,
        max_combined_image_units_and_fragment_outputs = "MaxCombinedImageUnitsAndFragmentOutputs" => 8,
        max_image_samples = "MaxImageSamples" => 0,
        max_vertex_image_uniforms = "MaxVertexImageUniforms" => 0,
        max_tess_control_image_uniforms = "MaxTessControlImageUniforms" => 0,
        max_tess_evaluation_image_uniforms = "MaxTessEvaluationImageUniforms" => 0,
        max_geometry_image_uniforms = "MaxGeometryImageUniforms" => 0,
        max_fragment_image_uniforms = "MaxFragmentImageUniforms" => 8,
        max_combined_image_uniforms = "MaxCombinedImageUniforms" => 8,
        max_geometry_texture_image_units = "MaxGeometryTextureImageUnits" => 16,
        max_geometry_output_vertices = "MaxGeometryOutputVertices" => 256,
        max_geometry_total_output_components = "MaxGeometryTotalOutputComponents" => 1024,
        max_geometry_uniform_components = "MaxGeometryUniformComponents" => 1024,
        max_geometry_varying_components = "MaxGeometryVaryingComponents" => 64,
        max_tess_control_input_components = "MaxTessControlInputComponents" => 128,
        max_tess_control_output_components = "MaxTessControlOutputComponents" => 128,
        max_tess_control_texture_image_units = "MaxTessControlTextureImageUnits" => 16,
        max_tess_control_uniform_components = "MaxTessControlUniformComponents" => 1024,
        max_tess_control_total_output_components = "MaxTessControlTotalOutputComponents" => 4096,
        max_tess_evaluation_input_components = "MaxTessEvaluationInputComponents" => 128,
        max_tess_evaluation_output_components = "MaxTessEvaluationOutputComponents" => 128,
        max_tess_evaluation_texture_image_units = "MaxTessEvaluationTextureImageUnits" => 16,
        max_tess_evaluation_uniform_components = "MaxTessEvaluationUniformComponents" => 1024,
        max_tess_patch_components = "MaxTessPatchComponents" => 120,
        max_patch_vertices = "MaxPatchVertices" => 32,
        max_tess_gen_level = "MaxTessGenLevel" => 64,
        max_viewports = "MaxViewports" => 16,
        max_vertex_atomic_counters = "MaxVertexAtomicCounters" => 0,
        max_tess_control_atomic_counters = "MaxTessControlAtomicCounters" => 0,
        max_tess_evaluation_atomic_counters = "MaxTessEvaluationAtomicCounters" => 0,
        max_geometry_atomic_counters = "MaxGeometryAtomicCounters" => 0,
        max_fragment_atomic_counters = "MaxFragmentAtomicCounters" => 8,
        max_combined_atomic_counters = "MaxCombinedAtomicCounters" => 8,
        max_atomic_counter_bindings = "MaxAtomicCounterBindings" => 1,
        max_vertex_atomic_counter_buffers = "MaxVertexAtomicCounterBuffers" => 0,
        max_tess_control_atomic_counter_buffers = "MaxTessControlAtomicCounterBuffers" => 0,
        max_tess_evaluation_atomic_counter_buffers = "MaxTessEvaluationAtomicCounterBuffers" => 0,
        max_geometry_atomic_counter_buffers = "MaxGeometryAtomicCounterBuffers" => 0,
        max_fragment_atomic_counter_buffers = "MaxFragmentAtomicCounterBuffers" => 1,
        max_combined_atomic_counter_buffers = "MaxCombinedAtomicCounterBuffers" => 1,
        max_atomic_counter_buffer_size = "MaxAtomicCounterBufferSize" => 16384,
        max_transform_feedback_buffers = "MaxTransformFeedbackBuffers" => 4,
        max_transform_feedback_interleaved_components = "MaxTransformFeedbackInterleavedComponents" => 64,
        max_cull_distances = "MaxCullDistances" => 8,
        max_combined_clip_and_cull_distances = "MaxCombinedClipAndCullDistances" => 8,
        max_samples = "MaxSamples" => 4,
    }
    flags {
        non_inductive_for_loops = "nonInductiveForLoops",
        while_loops = "whileLoops",
        do_while_loops = "doWhileLoops",
        general_uniform_indexing = "generalUniformIndexing",
        general_attribute_matrix_vector_indexing = "generalAttributeMatrixVectorIndexing",
        general_varying_indexing = "generalVaryingIndexing",
        general_sampler_indexing = "generalSamplerIndexing",
        general_variable_indexing = "generalVariableIndexing",
        general_constant_matrix_vector_indexing = "generalConstantMatrixVectorIndexing",
    }
}

/// Parse a signed decimal integer.
fn parse_int(input: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i32>)(input)
}

/// Parse one setting: `MaxLights 32`
fn parse_setting(input: &str) -> IResult<&str, (&str, i32)> {
    let (input, (key, _, value)) = preceded(
        space0,
        terminated(tuple((alphanumeric1, space1, parse_int)), space0),
    )(input)?;
    Ok((input, (key, value)))
}

impl ResourceLimits {
    /// Apply settings from configuration text, one `Name value` per line,
    /// on top of the defaults. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> LowerResult<Self> {
        let mut limits = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default();
            if line.trim().is_empty() {
                continue;
            }
            let (_, (key, value)) =
                all_consuming(parse_setting)(line).map_err(|_| LowerError::Config {
                    line: index + 1,
                    message: format!("expected `Name value`, found `{}`", line.trim()),
                })?;
            if !limits.set(key, value) {
                return Err(LowerError::Config {
                    line: index + 1,
                    message: format!("unknown resource `{}`", key),
                });
            }
        }
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::{ast::Node, stage::ShaderStage};

    fn options(version: u32, es: bool) -> LowerOptions {
        let mut unit = TranslationUnit::new(ShaderStage::Fragment, Node::sequence(Vec::new()));
        unit.version = version;
        unit.es = es;
        LowerOptions::for_unit(&unit)
    }

    #[test]
    fn test_uniform_offsets_from_version_420() {
        assert!(!options(410, false).use_uniform_offsets);
        assert!(options(420, false).use_uniform_offsets);
        assert!(options(450, false).use_uniform_offsets);
    }

    #[test]
    fn test_no_uniform_offsets_for_es() {
        assert!(!options(310, true).use_uniform_offsets);
        assert!(!options(450, true).use_uniform_offsets);
        let derived = options(450, false);
        assert!(!derived.use_logical_io);
        assert!(!derived.use_single_type_tree);
    }

    #[test]
    fn test_defaults() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.max_lights, 32);
        assert_eq!(limits.min_program_texel_offset, -8);
        assert_eq!(limits.max_samples, 4);
        assert!(limits.general_variable_indexing);
    }

    #[test]
    fn test_parse_overrides() {
        let limits = ResourceLimits::parse(
            "MaxLights 8\n\n  MinProgramTexelOffset -4 # comment\nwhileLoops 0\n",
        )
        .unwrap();
        assert_eq!(limits.max_lights, 8);
        assert_eq!(limits.min_program_texel_offset, -4);
        assert!(!limits.while_loops);
        assert_eq!(limits.max_clip_planes, 6);
    }

    #[test]
    fn test_parse_unknown_key() {
        let err = ResourceLimits::parse("MaxLights 1\nMaxUnicorns 3").unwrap_err();
        assert!(matches!(err, LowerError::Config { line: 2, .. }));
    }

    #[test]
    fn test_parse_malformed_value() {
        let err = ResourceLimits::parse("MaxLights many").unwrap_err();
        assert!(matches!(err, LowerError::Config { line: 1, .. }));
    }
}
