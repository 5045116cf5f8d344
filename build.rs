use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 5] = [
    "FFMPEG_DIR",
    "PKG_CONFIG_PATH",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

const DEFAULT_TRIPLET: &str = "x64-windows";

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

/// Where vcpkg would have installed FFmpeg, if `VCPKG_ROOT` is set.
fn vcpkg_install_dir() -> Option<PathBuf> {
    let root = env::var_os("VCPKG_ROOT")?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| DEFAULT_TRIPLET.to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Elsewhere ffmpeg-sys-next finds FFmpeg through pkg-config on its own.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_install_dir() {
        None => warn(
            "vidgrab needs FFmpeg development libraries. On Windows install them with vcpkg and set FFMPEG_DIR (or VCPKG_ROOT).",
        ),
        Some(directory) if directory.is_dir() => {
            warn(format!(
                "Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly.",
                directory.display()
            ));
            if env::var_os("VCPKGRS_DYNAMIC").is_none() {
                warn("Set VCPKGRS_DYNAMIC=1 if your vcpkg FFmpeg is a dynamic build.");
            }
        }
        Some(directory) => warn(format!(
            "VCPKG_ROOT is set but {} does not exist; is FFmpeg installed for this triplet?",
            directory.display()
        )),
    }
}
