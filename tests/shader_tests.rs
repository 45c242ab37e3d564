// SPDX-License-Identifier: GPL-3.0-only

//! WGSL validation for the display shader

use edge_viewer::render::QUAD_SHADER;

/// Validate that a WGSL shader compiles successfully using naga
fn validate_shader(name: &str, source: &str) -> naga::Module {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("Shader '{}' parse failed: {:?}", name, e),
    };

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module);
    if let Err(e) = info {
        panic!("Shader '{}' validation failed: {:?}", name, e);
    }
    module
}

#[test]
fn test_quad_shader_validates() {
    validate_shader("quad", QUAD_SHADER);
}

#[test]
fn test_quad_shader_entry_points() {
    let module = validate_shader("quad", QUAD_SHADER);
    let names: Vec<&str> = module
        .entry_points
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert!(names.contains(&"vs_main"));
    assert!(names.contains(&"fs_main"));
}

#[test]
fn test_quad_shader_bindings() {
    let module = validate_shader("quad", QUAD_SHADER);
    let mut bindings: Vec<u32> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| var.binding.as_ref())
        .filter(|b| b.group == 0)
        .map(|b| b.binding)
        .collect();
    bindings.sort_unstable();
    assert_eq!(bindings, vec![0, 1]);
}
