use std::{env, path::PathBuf};

fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // ffmpeg-sys-next finds FFmpeg through pkg-config everywhere but Windows.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=framelabel needs FFmpeg: set FFMPEG_DIR or VCPKG_ROOT.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if install.is_dir() {
        println!(
            "cargo:warning=Using vcpkg FFmpeg at {}; set FFMPEG_DIR to make this explicit.",
            install.display()
        );
    } else {
        println!("cargo:warning=No vcpkg FFmpeg install at {}.", install.display());
    }
}
