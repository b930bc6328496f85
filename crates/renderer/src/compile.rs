use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the pixelate filter fragment shader.
pub(crate) fn compile_pixelate_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pixelate fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(PIXELATE_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Block-sampling pixelate filter.
///
/// The uniform block layout must match `PixelateUniforms`. Each fragment
/// snaps its texture coordinate to the centre of a square block whose edge
/// is `floor(fraction * width)` source pixels, never less than one; the
/// vertical divisor is corrected by the image's height/width ratio. A
/// one-pixel block reproduces the source.
const PIXELATE_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PixelateParams {
    vec2 fill_scale;
    float fraction;
    float aspect_ratio;
    float texel_width;
    float source_width;
} params;

layout(set = 1, binding = 0) uniform texture2D source_texture;
layout(set = 1, binding = 1) uniform sampler source_sampler;

void main() {
    // v_uv has a bottom-left origin; bitmaps are uploaded top row first.
    vec2 uv = (vec2(v_uv.x, 1.0 - v_uv.y) - 0.5) * params.fill_scale + 0.5;

    float block_pixels = max(floor(params.fraction * params.source_width), 1.0);
    float block_width = block_pixels * params.texel_width;
    vec2 divisor = vec2(block_width, block_width / params.aspect_ratio);
    vec2 block_uv = uv - mod(uv, divisor) + 0.5 * divisor;

    vec4 color = textureLod(
        sampler2D(source_texture, source_sampler),
        clamp(block_uv, vec2(0.0), vec2(1.0)),
        0.0
    );
    float inside = float(all(greaterThanEqual(uv, vec2(0.0))) && all(lessThanEqual(uv, vec2(1.0))));
    outColor = mix(vec4(0.0, 0.0, 0.0, 1.0), color, inside);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga;

    fn parse_and_validate(source: &str, stage: ShaderStage) {
        let mut frontend = naga::front::glsl::Frontend::default();
        let module = frontend
            .parse(&naga::front::glsl::Options::from(stage), source)
            .unwrap_or_else(|err| panic!("{stage:?} shader failed to parse: {err:?}"));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|err| panic!("{stage:?} shader failed validation: {err:?}"));
    }

    #[test]
    fn vertex_shader_is_valid_glsl() {
        parse_and_validate(VERTEX_SHADER_GLSL, ShaderStage::Vertex);
    }

    #[test]
    fn pixelate_shader_is_valid_glsl() {
        parse_and_validate(PIXELATE_SHADER_GLSL, ShaderStage::Fragment);
    }

    #[test]
    fn pixelate_shader_declares_uniform_fields_in_buffer_order() {
        let fields = [
            "vec2 fill_scale",
            "float fraction",
            "float aspect_ratio",
            "float texel_width",
            "float source_width",
        ];
        let mut cursor = 0;
        for field in fields {
            let offset = PIXELATE_SHADER_GLSL[cursor..]
                .find(field)
                .unwrap_or_else(|| panic!("missing uniform field `{field}`"));
            cursor += offset + field.len();
        }
    }

    #[test]
    fn pixelate_shader_floors_block_edge_to_whole_pixels() {
        assert!(PIXELATE_SHADER_GLSL
            .contains("max(floor(params.fraction * params.source_width), 1.0)"));
    }
}
