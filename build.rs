// Copies the demo site in `static/` to `dist/`.
use std::path::Path;

use fs_extra::dir::{copy, CopyOptions};

fn main() {
    println!("cargo:rerun-if-changed=static");

    let static_dir = Path::new("static");
    if !static_dir.exists() {
        return;
    }
    let out_dir = Path::new("dist");
    if let Err(err) = fs_extra::dir::create_all(out_dir, true) {
        println!("cargo:warning=failed to prepare dist/: {err}");
        return;
    }

    let options = CopyOptions::new().content_only(true);
    if let Err(err) = copy(static_dir, out_dir, &options) {
        println!("cargo:warning=failed to copy static/ to dist/: {err}");
    }
}
