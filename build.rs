use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_TFLITE").is_none() {
        return;
    }
    let target = env::var("TARGET").unwrap_or_default();
    if !(target.starts_with("aarch64") && target.contains("linux")) {
        return;
    }

    // Prebuilt TensorFlow Lite for the board; without it tflitec builds its own
    let Some(root) = env::var_os("CARGO_MANIFEST_DIR").map(PathBuf::from) else {
        return;
    };
    let lib_dir = root.join("libs/linux-aarch64");
    println!("cargo:rerun-if-changed={}", lib_dir.display());
    if !lib_dir.join("libtensorflowlite_c.so").exists() {
        println!(
            "cargo:warning=no prebuilt libtensorflowlite_c.so in {}, using the tflitec build",
            lib_dir.display()
        );
        return;
    }

    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib=tensorflowlite_c");
    // edge-ml is deployed with the libs/ directory next to it
    println!("cargo:rustc-link-arg-bins=-Wl,-rpath,$ORIGIN/libs/linux-aarch64");
}
