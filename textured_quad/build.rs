// build.rs
// Compiles the GLSL shaders under <workspace>/resources/shaders to SPIR-V in
// <workspace>/target/shaders, named <source file name>.spv

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

fn needs_compile(source: &Path, output: &Path) -> bool {
    match (
        std::fs::metadata(source).and_then(|m| m.modified()),
        std::fs::metadata(output).and_then(|m| m.modified()),
    ) {
        (Ok(src), Ok(dst)) => src > dst,
        _ => true,
    }
}

fn compile_shaders(shader_dir: &Path, target_dir: &Path, glslc: &Path) -> usize {
    let entries = match std::fs::read_dir(shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at: {:?}", shader_dir);
            return 0;
        }
    };

    let mut compiled = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_shader = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SHADER_EXTENSIONS.contains(&ext));
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_shader {
            continue;
        }

        let out_file = target_dir.join(format!("{file_name}.spv"));
        if !needs_compile(&path, &out_file) {
            eprintln!("info: Shader {file_name} is up to date");
            continue;
        }

        let status = Command::new(glslc).arg(&path).arg("-o").arg(&out_file).status();
        match status {
            Ok(s) if s.success() => {
                eprintln!("info: Compiled {file_name} -> {:?}", out_file);
                compiled += 1;
            }
            Ok(s) => panic!("glslc failed for {file_name} with exit code {}", s.code().unwrap_or(-1)),
            Err(e) => panic!("Failed to run glslc for {file_name}: {e}"),
        }
    }
    compiled
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string()));
    let workspace_root = manifest_dir.parent().unwrap_or(&manifest_dir).to_path_buf();
    let shader_dir = workspace_root.join("resources").join("shaders");
    let target_dir = workspace_root.join("target").join("shaders");

    println!("cargo:rerun-if-changed={}", shader_dir.display());
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    // Prefer the SDK's compiler, fall back to one on PATH.
    let glslc = match env::var("VULKAN_SDK") {
        Ok(sdk) if cfg!(target_os = "windows") => PathBuf::from(sdk).join("Bin").join("glslc.exe"),
        Ok(sdk) => PathBuf::from(sdk).join("bin").join("glslc"),
        Err(_) => PathBuf::from("glslc"),
    };

    if Command::new(&glslc).arg("--version").output().is_err() {
        eprintln!("warning: glslc not found ({:?}), shader compilation skipped", glslc);
        eprintln!("hint: Install the Vulkan SDK and set VULKAN_SDK");
        return;
    }

    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: Failed to create {:?}: {}", target_dir, e);
        return;
    }

    let compiled = compile_shaders(&shader_dir, &target_dir, &glslc);
    if compiled > 0 {
        eprintln!("info: Successfully compiled {compiled} shader(s)");
    } else {
        eprintln!("info: All shaders are up to date");
    }
}
